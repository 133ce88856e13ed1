//! Coach Configuration Module
//!
//! Provides deployment configuration loaded from TOML files, replacing all
//! hardcoded verification thresholds and timing constants with tunable values.
//!
//! ## Loading Order
//!
//! 1. `POSECOACH_CONFIG` environment variable (path to TOML file)
//! 2. `posecoach.toml` in the current working directory
//! 3. Built-in defaults (matching original hardcoded values)
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(CoachConfig::load());
//!
//! // Anywhere in the codebase:
//! let threshold = config::get().verifier.shoulder_level_max_diff;
//! ```

mod coach_config;

pub use coach_config::*;

use std::sync::OnceLock;

/// Global coach configuration, initialized once at startup.
static COACH_CONFIG: OnceLock<CoachConfig> = OnceLock::new();

/// Initialize the global coach configuration.
///
/// Must be called exactly once before any calls to `get()`.
pub fn init(config: CoachConfig) {
    if COACH_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global coach configuration.
///
/// Panics if `init()` has not been called. A missing config is a fatal
/// startup error, not a recoverable condition.
pub fn get() -> &'static CoachConfig {
    COACH_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

/// Check whether the config has been initialized.
///
/// Useful for tests and optional config paths.
pub fn is_initialized() -> bool {
    COACH_CONFIG.get().is_some()
}
