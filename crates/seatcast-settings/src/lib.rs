//! # seatcast-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`SeatcastSettings::default()`]
//! 2. **User file**: `~/.seatcast/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `SEATCAST_*` overrides (highest priority)
//!
//! The binary applies its CLI flags on top of the loaded value.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = SeatcastSettings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 3001);
        assert_eq!(settings.dispatch.strategy, "observer");
        assert_eq!(settings.logging.level, "info");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn settings_path_points_at_home_dir() {
        let path = settings_path();
        assert!(path.ends_with(".seatcast/settings.json"));
    }
}
