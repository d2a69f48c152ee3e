//! A terminal pet: barks, naps, and keeps its files next to the binary's
//! working directory.
//!
//! Usage: `cargo run --example main -- [seconds] [config.yaml]`

use ::pet_ai::{
    CreatePetRequest, ExitSignal, FileId, Gender, Host, PetError, PetManager, PetResult,
    PetSpawn, RuntimeConfig,
};
use log::{LevelFilter, Log, Metadata, Record};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

struct StdoutLogger;

impl Log for StdoutLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("[{:<5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StdoutLogger = StdoutLogger;

struct CliPet {
    started: Instant,
    run_for: Duration,
    exit: Option<ExitSignal>,
}

impl CliPet {
    fn path(file: FileId) -> PathBuf {
        PathBuf::from(format!("{}.petdata", file))
    }
}

impl Host for CliPet {
    fn create_app(&mut self, exit: ExitSignal) -> PetResult<()> {
        self.exit = Some(exit);
        Ok(())
    }

    fn destroy_app(&mut self) -> PetResult<()> {
        println!("Goodbye!");
        Ok(())
    }

    fn create_pet(&mut self, request: &CreatePetRequest) -> PetResult<PetSpawn> {
        Ok(PetSpawn {
            state: request
                .saved_state
                .clone()
                .unwrap_or_else(|| b"a good dog".to_vec()),
            gender: Gender::Male,
        })
    }

    fn save_state(&mut self, file: FileId, offset: usize, data: &[u8]) -> PetResult<()> {
        let path = Self::path(file);
        let mut contents = fs::read(&path).unwrap_or_default();
        let end = offset.checked_add(data.len()).ok_or(PetError::InvalidArgument)?;
        if contents.len() < end {
            contents.resize(end, 0);
        }
        contents[offset..end].copy_from_slice(data);
        fs::write(&path, contents).map_err(|_| PetError::Fail)
    }

    fn load_state(
        &mut self,
        file: FileId,
        offset: usize,
        data: Option<&mut [u8]>,
    ) -> PetResult<usize> {
        let contents = fs::read(Self::path(file)).map_err(|_| PetError::Fail)?;
        let available = contents.get(offset..).ok_or(PetError::InvalidArgument)?;
        match data {
            None => Ok(available.len()),
            Some(buf) => {
                let len = buf.len().min(available.len());
                buf[..len].copy_from_slice(&available[..len]);
                Ok(len)
            }
        }
    }

    fn sleep(&mut self, ms: u32) -> PetResult<u32> {
        if ms == 0 {
            return Err(PetError::InvalidArgument);
        }
        std::thread::sleep(Duration::from_millis(ms as u64));
        Ok(ms)
    }

    fn yield_now(&mut self) -> PetResult<()> {
        std::thread::yield_now();
        Ok(())
    }

    fn update(&mut self, _delta_time: f32) -> PetResult<()> {
        if self.started.elapsed() >= self.run_for {
            if let Some(exit) = &self.exit {
                exit.request();
            }
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    log::set_logger(&LOGGER).map_err(|e| anyhow::anyhow!("{}", e))?;
    log::set_max_level(LevelFilter::Info);

    let mut args = std::env::args().skip(1);
    let seconds = match args.next() {
        Some(arg) => arg.parse()?,
        None => 12,
    };
    let config = match args.next() {
        Some(path) => RuntimeConfig::from_yaml(&fs::read_to_string(path)?)?,
        None => RuntimeConfig::default(),
    };

    let host = CliPet {
        started: Instant::now(),
        run_for: Duration::from_secs(seconds),
        exit: None,
    };
    let mut manager = PetManager::new(Box::new(host), config)?;
    manager.run()?;

    for pet in manager.pets() {
        println!(
            "Pet {} ({:?}) ends as {:?}",
            pet.id(),
            pet.gender(),
            String::from_utf8_lossy(pet.state())
        );
    }
    Ok(())
}
