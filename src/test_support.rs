use std::{
    env,
    ffi::OsString,
    sync::{Mutex, MutexGuard},
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Sets an environment variable for the lifetime of the guard.
///
/// Holds a process-wide lock so tests touching the environment run one at a
/// time; the previous value is restored on drop.
pub struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvOverride {
    pub fn set(key: &'static str, value: impl Into<OsString>) -> Self {
        let lock = ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = env::var_os(key);
        // SAFETY: env is only mutated while ENV_LOCK is held.
        unsafe { env::set_var(key, value.into()) };

        Self {
            key,
            previous,
            _lock: lock,
        }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        // SAFETY: restoring env while the lock is still held.
        match self.previous.take() {
            Some(value) => unsafe { env::set_var(self.key, value) },
            None => unsafe { env::remove_var(self.key) },
        }
    }
}
