use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Flags {
    running: bool,
    joined: bool,
}

/// Lifecycle flags shared between the controlling thread and the reactor.
///
/// | running | joined | state    |
/// |---------|--------|----------|
/// | false   | true   | idle     |
/// | true    | false  | active   |
/// | false   | false  | stopping |
///
/// The reactor holds a clone and polls [`should_run`](Self::should_run) once
/// per tick. The lock is never held across I/O.
#[derive(Debug, Clone)]
pub(crate) struct RunState {
    flags: Arc<Mutex<Flags>>,
}

impl RunState {
    pub(crate) fn new() -> Self {
        Self {
            flags: Arc::new(Mutex::new(Flags {
                running: false,
                joined: true,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_idle(&self) -> bool {
        let flags = self.lock();
        !flags.running && flags.joined
    }

    /// True from activation until the reactor thread has been joined.
    pub(crate) fn is_running(&self) -> bool {
        let flags = self.lock();
        flags.running || !flags.joined
    }

    /// Polled by the reactor at the top of every tick.
    pub(crate) fn should_run(&self) -> bool {
        self.lock().running
    }

    pub(crate) fn activate(&self) {
        *self.lock() = Flags {
            running: true,
            joined: false,
        };
    }

    /// Clears `running`. Returns false if there is no thread to reap.
    pub(crate) fn begin_stop(&self) -> bool {
        let mut flags = self.lock();
        if flags.joined {
            return false;
        }
        flags.running = false;
        true
    }

    /// Called by the reactor when it exits on its own.
    pub(crate) fn halt(&self) {
        self.lock().running = false;
    }

    pub(crate) fn mark_joined(&self) {
        *self.lock() = Flags {
            running: false,
            joined: true,
        };
    }
}
