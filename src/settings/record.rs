use std::fmt;

/// Placeholder shown instead of secret values.
pub const MASKED_VALUE: &str = "********";

/// How a settings UI should render and edit a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayHint {
    #[default]
    String,
    Bool,
    Glyph,
    Secret,
}

impl DisplayHint {
    /// Parses an `IsType` attribute value. Unknown values are `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "string" => Some(Self::String),
            "bool" => Some(Self::Bool),
            "glyph" => Some(Self::Glyph),
            "secret" => Some(Self::Secret),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Glyph => "glyph",
            Self::Secret => "secret",
        }
    }
}

impl fmt::Display for DisplayHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type OnChange = Box<dyn Fn(&SettingRecord) + Send + Sync>;

/// One editable (category, key) value surfaced to the settings editor.
pub struct SettingRecord {
    category: String,
    key: String,
    value: String,
    accepted: String,
    hint: DisplayHint,
    read_only: bool,
    dirty: bool,
    tooltip: Option<String>,
    on_change: Option<OnChange>,
}

impl SettingRecord {
    pub fn new(category: &str, key: &str, value: &str, hint: DisplayHint, read_only: bool) -> Self {
        let (value, read_only) = match hint {
            DisplayHint::Secret => (MASKED_VALUE, true),
            _ => (value, read_only),
        };
        Self {
            category: category.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            accepted: value.to_string(),
            hint,
            read_only,
            dirty: false,
            tooltip: None,
            on_change: None,
        }
    }

    /// A read-only record explaining why the real records are unavailable.
    pub fn diagnostic(key: &str, message: &str) -> Self {
        Self::new("Error", key, message, DisplayHint::String, true)
    }

    pub fn with_tooltip(mut self, tooltip: Option<&str>) -> Self {
        self.tooltip = tooltip.map(|v| v.to_string());
        self
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The value as of load or the last accepted persist.
    pub fn original_value(&self) -> &str {
        &self.accepted
    }

    pub fn display_hint(&self) -> DisplayHint {
        self.hint
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }

    /// Setting the current value is a no-op; any other value marks the record dirty,
    /// even when it equals the original.
    pub fn set_value(&mut self, value: &str) {
        if self.value == value {
            return;
        }
        self.value = value.to_string();
        self.dirty = true;
        self.notify();
    }

    /// Makes the current value the new baseline.
    pub fn accept(&mut self) {
        self.accepted = self.value.clone();
        self.dirty = false;
    }

    /// Restores the last accepted value.
    pub fn revert(&mut self) {
        let changed = self.value != self.accepted;
        self.value = self.accepted.clone();
        self.dirty = false;
        if changed {
            self.notify();
        }
    }

    pub fn set_on_change<F>(&mut self, callback: F)
    where
        F: Fn(&SettingRecord) + Send + Sync + 'static,
    {
        self.on_change = Some(Box::new(callback));
    }

    /// The 1-based block index of a `QuickShortcut N` category.
    pub(crate) fn shortcut_index(&self) -> Option<usize> {
        self.category
            .strip_prefix(super::SHORTCUT_CATEGORY)?
            .trim()
            .parse()
            .ok()
    }

    fn notify(&self) {
        if let Some(callback) = &self.on_change {
            callback(self);
        }
    }
}

impl fmt::Debug for SettingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingRecord")
            .field("category", &self.category)
            .field("key", &self.key)
            .field("value", &self.value)
            .field("hint", &self.hint)
            .field("read_only", &self.read_only)
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_display_hint() {
        assert_eq!(DisplayHint::parse("Bool"), Some(DisplayHint::Bool));
        assert_eq!(DisplayHint::parse(" secret "), Some(DisplayHint::Secret));
        assert_eq!(DisplayHint::parse("boolean"), None);
        assert_eq!(DisplayHint::Glyph.to_string(), "glyph");
    }

    #[test]
    fn test_dirty_tracking() {
        let mut record = SettingRecord::new("Popup", "Delay", "30", DisplayHint::String, false);
        assert!(!record.is_dirty());
        record.set_value("30");
        assert!(!record.is_dirty());
        record.set_value("45");
        assert!(record.is_dirty());
        record.set_value("30");
        assert!(record.is_dirty());
        assert_eq!(record.original_value(), "30");

        record.set_value("60");
        record.accept();
        assert!(!record.is_dirty());
        assert_eq!(record.original_value(), "60");

        record.set_value("90");
        record.revert();
        assert!(!record.is_dirty());
        assert_eq!(record.value(), "60");
    }

    #[test]
    fn test_secret_is_masked() {
        let record = SettingRecord::new("Api", "Token", "hunter2", DisplayHint::Secret, false);
        assert_eq!(record.value(), MASKED_VALUE);
        assert!(record.is_read_only());
    }

    #[test]
    fn test_on_change() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut record = SettingRecord::new("Popup", "Delay", "30", DisplayHint::String, false);
        let counter = count.clone();
        record.set_on_change(move |record| {
            assert_eq!(record.key(), "Delay");
            counter.fetch_add(1, Ordering::SeqCst);
        });
        record.set_value("30");
        record.set_value("31");
        record.revert();
        record.revert();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_shortcut_index() {
        let record = SettingRecord::new("QuickShortcut 3", "URL", "", DisplayHint::String, false);
        assert_eq!(record.shortcut_index(), Some(3));
        let record = SettingRecord::new("QuickShortcuts", "URL", "", DisplayHint::String, false);
        assert_eq!(record.shortcut_index(), None);
        let record = SettingRecord::new("Popup", "URL", "", DisplayHint::String, false);
        assert_eq!(record.shortcut_index(), None);
    }
}
