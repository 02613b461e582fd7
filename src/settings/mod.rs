mod document;
mod record;
mod shortcut;
mod store;

pub use document::{
    locate_keyed_item, locate_shortcut_field, parse_path, Document, Element, Node, PathStep,
};
pub use record::{DisplayHint, SettingRecord, MASKED_VALUE};
pub use shortcut::{decode_glyph, Shortcut, DEFAULT_GLYPH, DEFAULT_TOOLTIP};
pub use store::SettingsStore;

/// Root element of the settings file.
pub const ROOT: &str = "Settings";
/// Section holding the quick-launch blocks.
pub const QUICK_SHORTCUTS: &str = "QuickShortcuts";
/// One quick-launch block.
pub const SHORTCUT: &str = "Shortcut";
/// Category label prefix of a flattened shortcut block, e.g. `QuickShortcut 2`.
pub const SHORTCUT_CATEGORY: &str = "QuickShortcut";
/// Settings file location relative to the executable folder.
pub const SETTINGS_FILE: &str = "Config/settings.xml";
