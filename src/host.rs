//! The boundary between the runtime and the application embedding it.
//!
//! A host owns everything platform specific: where state files live, how to
//! sleep, how pets are presented and when to shut down. Optional
//! capabilities default to [`PetError::NotImplemented`], which the runtime
//! treats as "feature unavailable".

use crate::error::{PetError, PetResult};
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Identifies a persisted file; where it is stored is up to the host.
pub type FileId = u16;

/// Index of a pet in its [`PetManager`](crate::PetManager).
pub type PetId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatePetRequest {
    pub parent_male: Option<PetId>,
    pub parent_female: Option<PetId>,
    /// Blob restored from the state file, handed to the first pet spawned.
    pub saved_state: Option<Vec<u8>>,
}

/// What the host decided about a new pet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetSpawn {
    /// Opaque per-pet state owned by the host's format.
    pub state: Vec<u8>,
    pub gender: Gender,
}

/// Shutdown flag shared between the runtime and the host.
///
/// Cloning is cheap and every clone observes the same flag, so a clone can be
/// moved into a Ctrl-C handler or another thread.
#[derive(Debug, Clone, Default)]
pub struct ExitSignal(Arc<AtomicBool>);

impl ExitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

static CLOCK_START: Lazy<Instant> = Lazy::new(Instant::now);

/// Milliseconds on a process-wide monotonic clock.
pub fn monotonic_ms() -> u64 {
    CLOCK_START.elapsed().as_millis() as u64
}

pub trait Host {
    /// Called once before anything else. `exit` lets the host request a
    /// shutdown at any time.
    fn create_app(&mut self, exit: ExitSignal) -> PetResult<()>;

    fn destroy_app(&mut self) -> PetResult<()>;

    fn create_pet(&mut self, request: &CreatePetRequest) -> PetResult<PetSpawn>;

    fn save_state(&mut self, _file: FileId, _offset: usize, _data: &[u8]) -> PetResult<()> {
        Err(PetError::NotImplemented)
    }

    /// Copies stored bytes into `data` and returns how many were copied.
    /// With `data` set to `None` only the available size is returned.
    fn load_state(
        &mut self,
        _file: FileId,
        _offset: usize,
        _data: Option<&mut [u8]>,
    ) -> PetResult<usize> {
        Err(PetError::NotImplemented)
    }

    /// Sleeps for up to `ms` milliseconds and returns how long it slept.
    fn sleep(&mut self, _ms: u32) -> PetResult<u32> {
        Err(PetError::NotImplemented)
    }

    fn yield_now(&mut self) -> PetResult<()> {
        Err(PetError::NotImplemented)
    }

    /// Per-frame hook, called before the pets are ticked.
    fn update(&mut self, _delta_time: f32) -> PetResult<()> {
        Err(PetError::NotImplemented)
    }

    fn now_ms(&self) -> u64 {
        monotonic_ms()
    }
}
