use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Global pause switch shared by every worker of a run.
///
/// Resuming wakes every blocked worker at once. Each pause→resume cycle bumps
/// a generation counter; a waiter leaves as soon as the generation it started
/// in has ended, so a pause that lands right after a resume cannot strand a
/// worker that has not been scheduled yet.
#[derive(Debug, Default)]
pub struct PauseController {
    paused: AtomicBool,
    gate: Mutex<Gate>,
    resumed: Condvar,
}

#[derive(Debug, Default)]
struct Gate {
    paused: bool,
    generation: u64,
    waiters: usize,
}

impl PauseController {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Gate> {
        // Gate holds plain data, a panicking holder cannot leave it torn
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pauses or resumes the run. Repeating the current state is a no-op.
    pub fn set_paused(&self, paused: bool) {
        let mut gate = self.lock();
        if gate.paused == paused {
            return;
        }
        gate.paused = paused;
        self.paused.store(paused, Ordering::Release);

        if !paused {
            gate.generation += 1;
            trace!(
                generation = gate.generation,
                waiters = gate.waiters,
                "resuming workers"
            );
            self.resumed.notify_all();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Blocks while the run is paused. Returns `true` if the caller had to wait.
    pub fn wait_if_paused(&self) -> bool {
        if !self.is_paused() {
            return false;
        }

        let mut gate = self.lock();
        if !gate.paused {
            return false;
        }

        let generation = gate.generation;
        gate.waiters += 1;
        while gate.paused && gate.generation == generation {
            gate = self
                .resumed
                .wait(gate)
                .unwrap_or_else(PoisonError::into_inner);
        }
        gate.waiters -= 1;
        true
    }

    /// Number of workers currently blocked in [`wait_if_paused`](Self::wait_if_paused)
    pub fn waiting(&self) -> usize {
        self.lock().waiters
    }
}
