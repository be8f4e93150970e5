//! Configuration and settings management.
//!
//! Settings are stored as JSON; see [`Settings::load`] for the lookup order.

mod settings;

pub use settings::{
    AccountSettings, HttpSettings, SearchSettings, Settings, SettingsError, CONFIG_ENV_VAR,
    DEFAULT_KEYWORD, DEFAULT_LINK_PATTERN,
};
