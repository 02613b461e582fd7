#[macro_use]
extern crate log;

pub mod config;
pub mod macros;
pub mod settings;
pub mod theme;
pub mod utils;

pub use crate::config::Config;
pub use crate::settings::{DisplayHint, SettingRecord, SettingsStore, Shortcut};
pub use crate::theme::{ApplyMode, ResourceSet, Theme, ThemeAdapter};
