//! Loads a pet's behavior tree from YAML and drives its frames by hand.
//!
//! Usage: `cargo run --example from_file -- [tree.yaml] [frames]`

use ::pet_ai::{
    behaviors, boxify_action, boxify_selector, load_yaml, BlackboardKeyManager,
    CreatePetRequest, ExitSignal, Gender, Host, PetManager, PetResult, PetSpawn,
    RuntimeConfig,
};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

struct QuietHost;

impl Host for QuietHost {
    fn create_app(&mut self, _exit: ExitSignal) -> PetResult<()> {
        Ok(())
    }

    fn destroy_app(&mut self) -> PetResult<()> {
        Ok(())
    }

    fn create_pet(&mut self, _request: &CreatePetRequest) -> PetResult<PetSpawn> {
        Ok(PetSpawn {
            state: vec![],
            gender: Gender::Female,
        })
    }

    fn sleep(&mut self, ms: u32) -> PetResult<u32> {
        std::thread::sleep(Duration::from_millis(ms as u64));
        Ok(ms)
    }
}

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "demos/pet.yaml".to_string());
    let frames: u32 = match args.next() {
        Some(arg) => arg.parse()?,
        None => 40,
    };

    let mut registry = behaviors::registry();
    registry.register_action("Wag", |_: &mut BlackboardKeyManager| {
        boxify_action(|_, _, _, _, _| {
            println!("*wags tail*");
            true
        })
    });
    // Wags after an odd number of barks, naps after an even one.
    registry.register_selector("MoodSwing", |keys: &mut BlackboardKeyManager| {
        let bark_count = keys.calculate_key(behaviors::BARK_COUNT_KEY, 4);
        boxify_selector(move |_, _, _, blackboard| {
            let barks = blackboard.read::<u32>(bark_count).unwrap_or(0);
            Some(if barks % 2 == 1 { 0 } else { 1 })
        })
    });

    let mut keys = BlackboardKeyManager::new();
    let tree = load_yaml(&fs::read_to_string(&path)?, &registry, &mut keys)?;
    println!("Loaded {} nodes from {}", tree.len(), path);

    let config = RuntimeConfig {
        persist_keys: false,
        persist_state: false,
        ..RuntimeConfig::default()
    };
    let mut manager = PetManager::with_tree(Box::new(QuietHost), config, keys, Arc::new(tree));
    manager.start()?;
    for frame in 0..frames {
        manager.tick(0.1);
        if let Some(pet) = manager.pets().first() {
            let current = pet.executor().current();
            let name = current.and_then(|id| manager.tree().node(id).name());
            println!("frame {:3}: {}", frame, name.unwrap_or("-"));
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    manager.finish()?;
    Ok(())
}
