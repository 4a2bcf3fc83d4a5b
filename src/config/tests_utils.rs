//! Shared test utilities for config module tests.

use std::sync::Mutex;

use super::overrides::ENV_VARS;

/// Mutex to serialize environment variable tests and prevent race conditions.
pub static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clean up every environment variable memoria config reads.
pub fn cleanup_env_vars() {
    for var in ENV_VARS {
        // SAFETY: callers hold ENV_MUTEX, so no other test touches the environment.
        unsafe { std::env::remove_var(var) };
    }
}

/// Set one variable; callers must hold `ENV_MUTEX`.
pub fn set_env(name: &str, value: &str) {
    // SAFETY: callers hold ENV_MUTEX, so no other test touches the environment.
    unsafe { std::env::set_var(name, value) };
}
