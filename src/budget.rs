//! Back-pressure: the open-file and in-flight-byte semaphores that bound
//! how much work the planner can have outstanding at once.
//!
//! Neither budget maps cleanly onto a single pack dependency (rayon has no
//! blocking counting semaphore, and pulling in a whole async runtime for two
//! `wait`/`post` primitives would fight the thread-based design elsewhere in
//! this crate), so it's a small hand-rolled blocking semaphore over
//! `Mutex`/`Condvar` — the same primitives the standard library itself uses
//! to build one.

use std::sync::{Arc, Condvar, Mutex};

struct SemaphoreState {
    available: u64,
}

/// A blocking counting semaphore. `acquire` blocks the calling thread until
/// enough units are available; `release` always succeeds.
pub struct Semaphore {
    state: Mutex<SemaphoreState>,
    condvar: Condvar,
}

impl Semaphore {
    pub fn new(capacity: u64) -> Self {
        Self {
            state: Mutex::new(SemaphoreState { available: capacity }),
            condvar: Condvar::new(),
        }
    }

    /// Blocks until `units` are available, then reserves them.
    pub fn acquire(&self, units: u64) {
        let mut state = self.state.lock().unwrap();
        while state.available < units {
            state = self.condvar.wait(state).unwrap();
        }
        state.available -= units;
    }

    /// Releases `units` back to the pool, waking any waiters.
    pub fn release(&self, units: u64) {
        let mut state = self.state.lock().unwrap();
        state.available += units;
        self.condvar.notify_all();
    }
}

/// The two budgets the planner acquires against: how many source files may
/// be memory-mapped concurrently, and how many bytes of dispatched-but-not-
/// yet-flushed chunk data may be outstanding.
pub struct Budgets {
    pub open_files: Arc<Semaphore>,
    pub in_flight_bytes: Arc<Semaphore>,
}

impl Budgets {
    pub fn new(open_file_budget: u64, byte_budget: u64) -> Self {
        Self {
            open_files: Arc::new(Semaphore::new(open_file_budget)),
            in_flight_bytes: Arc::new(Semaphore::new(byte_budget)),
        }
    }
}

/// RAII guard releasing one unit of a semaphore on drop. Held inside
/// in-flight entry/chunk state so a budget reservation survives until the
/// Writer has actually flushed the corresponding bytes, per the resource
/// model's release-on-flush rule.
pub struct BudgetGuard {
    semaphore: Arc<Semaphore>,
    units: u64,
    released: bool,
}

impl BudgetGuard {
    pub fn acquire(semaphore: Arc<Semaphore>, units: u64) -> Self {
        semaphore.acquire(units);
        Self {
            semaphore,
            units,
            released: false,
        }
    }

    /// Releases early, e.g. when the Writer has just flushed the bytes this
    /// guard was holding a reservation for. Idempotent: a later `Drop` is a
    /// no-op.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.semaphore.release(self.units);
            self.released = true;
        }
    }
}

impl Drop for BudgetGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn acquire_release_roundtrip() {
        let sem = Semaphore::new(2);
        sem.acquire(2);
        sem.release(2);
        sem.acquire(2);
    }

    #[test]
    fn guard_release_wakes_waiter() {
        let sem = Arc::new(Semaphore::new(1));
        let guard = BudgetGuard::acquire(sem.clone(), 1);

        let sem2 = sem.clone();
        let handle = thread::spawn(move || {
            sem2.acquire(1);
            sem2.release(1);
        });

        thread::sleep(Duration::from_millis(20));
        guard.release();
        handle.join().unwrap();
    }

    #[test]
    fn drop_releases_without_explicit_call() {
        let sem = Arc::new(Semaphore::new(1));
        {
            let _guard = BudgetGuard::acquire(sem.clone(), 1);
        }
        sem.acquire(1);
        sem.release(1);
    }
}
