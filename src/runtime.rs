//! The pet main loop.
//!
//! [`PetManager`] owns the host, the shared behavior tree and every pet.
//! [`PetManager::run`] drives a whole session; hosts with their own frame
//! loop call [`PetManager::start`], [`PetManager::tick`] and
//! [`PetManager::finish`] instead.

use crate::behaviors;
use crate::config::RuntimeConfig;
use crate::error::{PetError, PetResult};
use crate::host::{CreatePetRequest, ExitSignal, FileId, Host, PetId};
use crate::key::BlackboardKeyManager;
use crate::keyfile;
use crate::pet::Pet;
use crate::tree::BehaviorTree;
use log::{debug, error, info, warn};
use std::sync::Arc;

pub struct PetManager {
    host: Box<dyn Host>,
    config: RuntimeConfig,
    keys: BlackboardKeyManager,
    tree: Arc<BehaviorTree<dyn Host>>,
    pets: Vec<Pet>,
    exit: ExitSignal,
}

/// Logs a failed optional host call and carries on.
fn tolerate<T>(what: &str, result: PetResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(PetError::NotImplemented) => {
            debug!("Host does not implement {}", what);
            None
        }
        Err(e) => {
            warn!("Host {} failed: {}", what, e);
            None
        }
    }
}

impl PetManager {
    /// A manager running the stock pet behaviors.
    pub fn new(host: Box<dyn Host>, config: RuntimeConfig) -> PetResult<Self> {
        let mut keys = BlackboardKeyManager::new();
        let tree = behaviors::default_tree(&mut keys).map_err(|e| {
            error!("Could not build the pet behavior tree: {}", e);
            PetError::Fail
        })?;
        Ok(Self::with_tree(host, config, keys, Arc::new(tree)))
    }

    /// A manager running `tree`, whose blackboard keys are in `keys`.
    pub fn with_tree(
        host: Box<dyn Host>,
        config: RuntimeConfig,
        keys: BlackboardKeyManager,
        tree: Arc<BehaviorTree<dyn Host>>,
    ) -> Self {
        Self {
            host,
            config,
            keys,
            tree,
            pets: vec![],
            exit: ExitSignal::new(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn keys(&self) -> &BlackboardKeyManager {
        &self.keys
    }

    pub fn tree(&self) -> &Arc<BehaviorTree<dyn Host>> {
        &self.tree
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut dyn Host {
        self.host.as_mut()
    }

    pub fn pets(&self) -> &[Pet] {
        &self.pets
    }

    pub fn exit_signal(&self) -> ExitSignal {
        self.exit.clone()
    }

    pub fn notify_exit(&self) {
        self.exit.request();
    }

    /// Runs a whole session: start up, tick until the host asks to exit, then
    /// persist and shut down.
    pub fn run(&mut self) -> PetResult<()> {
        self.start()?;

        let mut last = self.host.now_ms();
        loop {
            let now = self.host.now_ms();
            let delta_time = now.saturating_sub(last) as f32 / 1000.0;
            last = now;

            tolerate("update", self.host.update(delta_time));
            if self.exit.is_requested() {
                break;
            }
            self.tick(delta_time);

            match self.host.sleep(self.config.idle_sleep_ms) {
                Ok(_) => {}
                Err(PetError::NotImplemented) => {
                    tolerate("yield", self.host.yield_now());
                }
                Err(e) => warn!("Host sleep failed: {}", e),
            }
        }

        self.finish()
    }

    /// Creates the app, restores persisted data and spawns the initial pets.
    pub fn start(&mut self) -> PetResult<()> {
        self.host.create_app(self.exit.clone()).map_err(|e| {
            error!("Host could not create the app: {}", e);
            e
        })?;
        info!("Pet runtime started");

        let mut saved_state = self.load_saved_state();
        self.load_keys();

        for _ in 0..self.config.initial_pets {
            let request = CreatePetRequest {
                saved_state: saved_state.take(),
                ..CreatePetRequest::default()
            };
            self.create_pet(request).map_err(|e| {
                error!("Could not create a pet: {}", e);
                e
            })?;
        }
        Ok(())
    }

    /// Persists what the config asks for and destroys the app.
    pub fn finish(&mut self) -> PetResult<()> {
        if self.config.persist_keys {
            match keyfile::encode(&self.keys.export()) {
                Ok(bytes) => {
                    tolerate(
                        "save_state",
                        self.host.save_state(self.config.key_file, 0, &bytes),
                    );
                }
                Err(e) => warn!("Could not encode the key table: {}", e),
            }
        }
        if self.config.persist_state {
            if let Some(pet) = self.pets.first() {
                tolerate(
                    "save_state",
                    self.host.save_state(self.config.state_file, 0, pet.state()),
                );
            }
        }

        info!("Pet runtime stopped");
        self.host.destroy_app()
    }

    /// Advances every pet by one frame of `delta_time` seconds.
    pub fn tick(&mut self, delta_time: f32) {
        for pet in &mut self.pets {
            pet.tick(delta_time, self.host.as_mut());
        }
    }

    /// Asks the host for a new pet and adds it, returning its id.
    pub fn create_pet(&mut self, request: CreatePetRequest) -> PetResult<PetId> {
        for parent in [request.parent_male, request.parent_female]
            .into_iter()
            .flatten()
        {
            if parent >= self.pets.len() {
                return Err(PetError::InvalidArgument);
            }
        }

        let spawn = self.host.create_pet(&request)?;
        let id = self.pets.len();
        let pet = Pet::new(
            id,
            (request.parent_male, request.parent_female),
            spawn.gender,
            spawn.state,
            &self.keys,
            self.tree.clone(),
        )?;
        debug!("Spawned pet {} ({:?})", id, pet.gender());
        self.pets.push(pet);
        Ok(id)
    }

    /// The opaque state blob of pet `id`.
    pub fn pet_state(&self, id: PetId) -> PetResult<&[u8]> {
        self.pets
            .get(id)
            .map(Pet::state)
            .ok_or(PetError::InvalidArgument)
    }

    fn load_saved_state(&mut self) -> Option<Vec<u8>> {
        match self.read_file(self.config.state_file) {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => None,
            Err(e) => {
                debug!("No saved pet state, starting fresh: {}", e);
                None
            }
        }
    }

    fn load_keys(&mut self) {
        let bytes = match self.read_file(self.config.key_file) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => return,
            Err(e) => {
                debug!("No saved key table: {}", e);
                return;
            }
        };
        let restored = keyfile::decode(&bytes)
            .map_err(PetError::from)
            .and_then(|records| self.keys.import(records));
        if let Err(e) = restored {
            warn!("Ignoring saved key table: {}", e);
        }
    }

    /// Reads a whole host file: a size query followed by the read itself.
    fn read_file(&mut self, file: FileId) -> PetResult<Vec<u8>> {
        let size = self.host.load_state(file, 0, None)?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|_| PetError::OutOfMemory)?;
        buf.resize(size, 0);
        if size > 0 && self.host.load_state(file, 0, Some(&mut buf))? != size {
            return Err(PetError::Fail);
        }
        Ok(buf)
    }
}

impl std::fmt::Debug for PetManager {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("PetManager")
            .field("config", &self.config)
            .field("keys", &self.keys)
            .field("pets", &self.pets)
            .field("exit", &self.exit)
            .finish()
    }
}
