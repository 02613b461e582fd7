use super::document::{locate_keyed_item, locate_shortcut_field, Document, Element};
use super::record::{DisplayHint, SettingRecord};
use super::shortcut::Shortcut;
use super::{QUICK_SHORTCUTS, ROOT, SETTINGS_FILE, SHORTCUT, SHORTCUT_CATEGORY};
use crate::utils::get_exe_folder;

use anyhow::{bail, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// Owns the settings document: typed reads, flattening for the editor, and write-back.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    document: Mutex<Option<Document>>,
}

impl SettingsStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            document: Mutex::new(None),
        }
    }

    /// `<exe folder>/Config/settings.xml`
    pub fn default_path() -> Result<PathBuf> {
        Ok(get_exe_folder()?.join(SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.document.lock().is_some()
    }

    /// Loads the document once. Failures leave the store unloaded.
    pub fn load(&self) {
        let mut document = self.document.lock();
        if document.is_some() {
            debug!("settings already loaded");
            return;
        }
        match Document::load(&self.path) {
            Ok(doc) => {
                info!("settings loaded from {}", self.path.display());
                *document = Some(doc);
            }
            Err(err) => warn!("{err}, settings stay unloaded"),
        }
    }

    pub fn get_string(&self, path: &str, default: &str) -> String {
        self.lookup(path).unwrap_or_else(|| default.to_string())
    }

    pub fn get_bool(&self, path: &str, default: bool) -> bool {
        self.lookup(path)
            .and_then(|v| parse_bool(&v))
            .unwrap_or(default)
    }

    pub fn get_int(&self, path: &str, default: i64) -> i64 {
        self.lookup(path)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn get_shortcuts(&self) -> Vec<Shortcut> {
        let document = self.document.lock();
        let Some(doc) = document.as_ref() else {
            return vec![];
        };
        match doc.select(&format!("{ROOT}/{QUICK_SHORTCUTS}/{SHORTCUT}")) {
            Ok(list) => list.into_iter().map(Shortcut::from_element).collect(),
            Err(err) => {
                warn!("{err}");
                vec![]
            }
        }
    }

    /// Flattens the document into editable records.
    ///
    /// Never fails: problems are reported as records in the `Error` category.
    pub fn describe(&self) -> Vec<SettingRecord> {
        let document = self.document.lock();
        let Some(doc) = document.as_ref() else {
            return vec![
                SettingRecord::diagnostic("Status", "Settings file is not loaded"),
                SettingRecord::diagnostic("Path", &self.path.display().to_string()),
            ];
        };
        match flatten(doc.root()) {
            Ok(records) => records,
            Err(err) => {
                warn!("Failed to describe settings, {err}");
                vec![SettingRecord::diagnostic("Status", &err.to_string())]
            }
        }
    }

    /// Writes dirty, editable records back to the settings file.
    ///
    /// Returns `false` when the file could not be written; records are left untouched then.
    pub fn persist(&self, records: &mut [SettingRecord]) -> bool {
        let changed: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.is_dirty() && !record.is_read_only())
            .map(|(i, _)| i)
            .collect();
        if changed.is_empty() {
            debug!("no settings changed");
            return true;
        }

        let mut document = self.document.lock();
        let Some(doc) = document.as_ref() else {
            error!("Failed to persist settings, settings file is not loaded");
            return false;
        };
        let mut updated = doc.clone();
        let written = apply_records(&mut updated, records, &changed);
        if written.is_empty() {
            debug!("no writable settings changed");
            return true;
        }
        if let Err(err) = updated.save(&self.path) {
            error!("Failed to persist settings, {err}");
            return false;
        }
        *document = Some(updated);
        for i in &written {
            records[*i].accept();
        }
        info!(
            "persisted {} setting(s) to {}",
            written.len(),
            self.path.display()
        );
        true
    }

    fn lookup(&self, path: &str) -> Option<String> {
        let document = self.document.lock();
        match document.as_ref()?.select_first(path) {
            Ok(el) => el.map(|v| v.text()),
            Err(err) => {
                warn!("{err}");
                None
            }
        }
    }
}

/// Case-insensitive `true`/`false`.
fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn flatten(root: &Element) -> Result<Vec<SettingRecord>> {
    if root.name != ROOT {
        bail!("Root element <{ROOT}> not found, got <{}>", root.name);
    }
    let mut records = vec![];
    for section in root.elements() {
        if section.name == QUICK_SHORTCUTS {
            let blocks = section.elements().filter(|el| el.name == SHORTCUT);
            for (i, block) in blocks.enumerate() {
                let category = format!("{SHORTCUT_CATEGORY} {}", i + 1);
                for field in block.elements() {
                    let hint = match field.name.as_str() {
                        "Glyph" => DisplayHint::Glyph,
                        _ => DisplayHint::String,
                    };
                    records.push(SettingRecord::new(
                        &category,
                        &field.name,
                        &field.text(),
                        hint,
                        false,
                    ));
                }
            }
            continue;
        }
        if !section.has_elements() {
            records.push(element_record(&root.name, section));
            continue;
        }
        for item in section.elements() {
            match item.attr("Key") {
                Some(key) => records.push(keyed_record(section, item, key)?),
                None if item.has_elements() => {
                    debug!("skip nested element <{}> in <{}>", item.name, section.name)
                }
                None => records.push(element_record(&section.name, item)),
            }
        }
    }
    Ok(records)
}

fn keyed_record(section: &Element, item: &Element, key: &str) -> Result<SettingRecord> {
    if key.trim().is_empty() {
        bail!(
            "<{}> in section '{}' has an empty Key attribute",
            item.name,
            section.name
        );
    }
    let category = item
        .attr("Category")
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(&section.name);
    let read_only = item
        .attr("IsReadOnly")
        .and_then(parse_bool)
        .unwrap_or(false);
    let hint = match item.attr("IsType") {
        None => DisplayHint::String,
        Some(v) => DisplayHint::parse(v).unwrap_or_else(|| {
            warn!("Unknown IsType '{v}' on '{key}', showing as string");
            DisplayHint::String
        }),
    };
    Ok(
        SettingRecord::new(category, key, &item.text(), hint, read_only)
            .with_tooltip(item.attr("ToolTip")),
    )
}

/// A record keyed by the element's own name.
fn element_record(category: &str, el: &Element) -> SettingRecord {
    let value = el.text();
    let hint = if el.name.eq_ignore_ascii_case("apikey") {
        DisplayHint::Secret
    } else if parse_bool(&value).is_some() {
        DisplayHint::Bool
    } else {
        DisplayHint::String
    };
    SettingRecord::new(category, &el.name, &value, hint, false)
}

/// Applies `changed` records to `doc` and returns the indexes actually written.
fn apply_records(doc: &mut Document, records: &[SettingRecord], changed: &[usize]) -> Vec<usize> {
    let mut written = vec![];
    for i in changed {
        let record = &records[*i];
        if record.display_hint() == DisplayHint::Secret {
            debug!("skip secret setting '{}'", record.key());
            continue;
        }
        let position = match record.shortcut_index() {
            Some(index) => {
                locate_shortcut_field(doc.root(), QUICK_SHORTCUTS, SHORTCUT, index, record.key())
            }
            None => locate_keyed_item(doc.root(), record.category(), record.key()),
        };
        let el = match position {
            Some(position) => doc.element_at_mut(&position),
            None => None,
        };
        let Some(el) = el else {
            warn!(
                "Setting '{}' in '{}' not found, skipped",
                record.key(),
                record.category()
            );
            continue;
        };
        let value = match record.display_hint() {
            DisplayHint::Bool => record.value().to_lowercase(),
            _ => record.value().to_string(),
        };
        el.set_text(&value);
        written.push(*i);
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DEFAULT_GLYPH, MASKED_VALUE};
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Settings>
  <QuickShortcuts>
    <Shortcut>
      <Glyph>E8F2</Glyph>
      <ToolTip>Portal</ToolTip>
      <URL>https://portal.example.com</URL>
    </Shortcut>
  </QuickShortcuts>
  <Popup>
    <Item Key="ShowOnStartup" IsType="bool">True</Item>
    <Item Key="Interval" ToolTip="Minutes between checks">15</Item>
    <Item Key="Mode" IsType="whatever">notabool</Item>
    <Item Key="Server" Category="Connection" IsReadOnly="true">helpdesk</Item>
    <Item Key="ApiToken" IsType="secret" IsReadOnly="false">s3cr3t</Item>
  </Popup>
</Settings>"#;

    fn setup(content: &str) -> (TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Config").join("settings.xml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        let store = SettingsStore::new(path);
        store.load();
        (dir, store)
    }

    fn find<'a>(records: &'a mut [SettingRecord], key: &str) -> &'a mut SettingRecord {
        records.iter_mut().find(|v| v.key() == key).unwrap()
    }

    #[test]
    fn test_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("missing.xml"));
        store.load();
        assert!(!store.is_loaded());
        assert_eq!(store.get_string("Settings/Popup", "x"), "x");
        assert!(store.get_bool("Settings/Popup", true));
        assert_eq!(store.get_int("Settings/Popup", 7), 7);
        assert!(store.get_shortcuts().is_empty());
        let records = store.describe();
        assert!(!records.is_empty());
        assert!(records.iter().all(|v| v.category() == "Error"));
        assert!(store.persist(&mut []));
    }

    #[test]
    fn test_malformed_file_stays_unloaded() {
        let (_dir, store) = setup("<Settings><Popup></Settings>");
        assert!(!store.is_loaded());
        assert_eq!(store.describe()[0].category(), "Error");
    }

    #[test]
    fn test_load_is_idempotent() {
        let (_dir, store) = setup(SAMPLE);
        assert!(store.is_loaded());
        fs::write(store.path(), "<Settings />").unwrap();
        store.load();
        assert_eq!(store.get_shortcuts().len(), 1);
    }

    #[test]
    fn test_typed_accessors() {
        let (_dir, store) = setup(SAMPLE);
        let item = |key: &str| format!("Settings/Popup/Item[@Key='{key}']");
        assert_eq!(store.get_string(&item("Server"), ""), "helpdesk");
        assert_eq!(store.get_string("Settings/Absent", "fallback"), "fallback");
        assert_eq!(store.get_string("Settings/[bad", "fallback"), "fallback");
        assert!(store.get_bool(&item("ShowOnStartup"), false));
        assert!(store.get_bool(&item("Mode"), true));
        assert!(!store.get_bool(&item("Mode"), false));
        assert_eq!(store.get_int(&item("Interval"), 0), 15);
        assert_eq!(store.get_int(&item("Mode"), -1), -1);
    }

    #[test]
    fn test_get_shortcuts() {
        let (_dir, store) = setup(
            r#"<Settings><QuickShortcuts>
                <Shortcut><Glyph>E713</Glyph><ToolTip>A</ToolTip><URL>https://a</URL></Shortcut>
                <Shortcut><Glyph>zzzz</Glyph></Shortcut>
            </QuickShortcuts></Settings>"#,
        );
        let shortcuts = store.get_shortcuts();
        assert_eq!(shortcuts.len(), 2);
        assert_eq!(shortcuts[0].glyph, '\u{E713}');
        assert_eq!(shortcuts[0].url, "https://a");
        assert_eq!(shortcuts[1].glyph, DEFAULT_GLYPH);
        assert_eq!(shortcuts[1].tooltip, "Link");
        assert_eq!(shortcuts[1].url, "");
    }

    #[test]
    fn test_describe() {
        let (_dir, store) = setup(SAMPLE);
        let records = store.describe();
        let summary: Vec<(&str, &str)> = records
            .iter()
            .map(|v| (v.category(), v.key()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("QuickShortcut 1", "Glyph"),
                ("QuickShortcut 1", "ToolTip"),
                ("QuickShortcut 1", "URL"),
                ("Popup", "ShowOnStartup"),
                ("Popup", "Interval"),
                ("Popup", "Mode"),
                ("Connection", "Server"),
                ("Popup", "ApiToken"),
            ]
        );
        assert_eq!(records[0].display_hint(), DisplayHint::Glyph);
        assert_eq!(records[0].value(), "E8F2");
        assert_eq!(records[1].display_hint(), DisplayHint::String);
        assert!(!records[2].is_read_only());
        assert_eq!(records[3].display_hint(), DisplayHint::Bool);
        assert_eq!(records[4].tooltip(), Some("Minutes between checks"));
        assert_eq!(records[5].display_hint(), DisplayHint::String);
        assert!(records[6].is_read_only());

        let secret = &records[7];
        assert_eq!(secret.display_hint(), DisplayHint::Secret);
        assert_eq!(secret.value(), MASKED_VALUE);
        assert!(secret.is_read_only());
    }

    #[test]
    fn test_describe_fallback_shape() {
        let (_dir, store) = setup(
            r#"<Settings>
                <Api><ApiKey>abc</ApiKey><Endpoint>https://api</Endpoint></Api>
                <Flags><Beep>FALSE</Beep></Flags>
                <Language>en</Language>
            </Settings>"#,
        );
        let records = store.describe();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].key(), "ApiKey");
        assert_eq!(records[0].value(), MASKED_VALUE);
        assert!(records[0].is_read_only());
        assert_eq!(records[1].value(), "https://api");
        assert_eq!(records[2].display_hint(), DisplayHint::Bool);
        assert_eq!(records[3].category(), "Settings");
        assert_eq!(records[3].key(), "Language");
    }

    #[test]
    fn test_describe_errors() {
        let (_dir, store) = setup("<Config><Popup /></Config>");
        let records = store.describe();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category(), "Error");

        let (_dir, store) = setup(r#"<Settings><Popup><Item Key=" ">1</Item></Popup></Settings>"#);
        let records = store.describe();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category(), "Error");
        assert!(records[0].is_read_only());
    }

    #[test]
    fn test_persist_nothing_changed() {
        let (_dir, store) = setup(SAMPLE);
        let mut records = store.describe();
        fs::remove_file(store.path()).unwrap();
        assert!(store.persist(&mut records));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_persist() {
        let (_dir, store) = setup(SAMPLE);
        let mut records = store.describe();
        find(&mut records, "ShowOnStartup").set_value("FALSE");
        find(&mut records, "Interval").set_value("30");
        find(&mut records, "URL").set_value("https://new.example.com");
        find(&mut records, "Server").set_value("ignored");
        find(&mut records, "ApiToken").set_value("ignored");
        assert!(store.persist(&mut records));

        assert!(!find(&mut records, "Interval").is_dirty());
        assert_eq!(find(&mut records, "Interval").original_value(), "30");
        assert!(!find(&mut records, "URL").is_dirty());
        assert!(find(&mut records, "Server").is_dirty());

        let item = |key: &str| format!("Settings/Popup/Item[@Key='{key}']");
        assert_eq!(store.get_int(&item("Interval"), 0), 30);

        let reloaded = SettingsStore::new(store.path());
        reloaded.load();
        assert_eq!(reloaded.get_string(&item("ShowOnStartup"), ""), "false");
        assert_eq!(reloaded.get_string(&item("Interval"), ""), "30");
        assert_eq!(reloaded.get_string(&item("Server"), ""), "helpdesk");
        assert_eq!(reloaded.get_string(&item("ApiToken"), ""), "s3cr3t");
        assert_eq!(
            reloaded.get_shortcuts()[0].url,
            "https://new.example.com"
        );
    }

    #[test]
    fn test_persist_custom_category() {
        let (_dir, store) = setup(
            r#"<Settings><Popup><Item Key="Delay" Category="Timing">5</Item></Popup></Settings>"#,
        );
        let mut records = store.describe();
        assert_eq!(records[0].category(), "Timing");
        records[0].set_value("10");
        assert!(store.persist(&mut records));
        assert_eq!(
            store.get_int("Settings/Popup/Item[@Key='Delay']", 0),
            10
        );
    }

    #[test]
    fn test_persist_category_of_existing_section() {
        let (_dir, store) = setup(
            r#"<Settings>
                <Connection><Item Key="Port">8080</Item></Connection>
                <Popup><Item Key="Server" Category="Connection">helpdesk</Item></Popup>
            </Settings>"#,
        );
        let mut records = store.describe();
        let server = find(&mut records, "Server");
        assert_eq!(server.category(), "Connection");
        server.set_value("newhost");
        assert!(store.persist(&mut records));
        assert!(!find(&mut records, "Server").is_dirty());

        let reloaded = SettingsStore::new(store.path());
        reloaded.load();
        assert_eq!(
            reloaded.get_string("Settings/Popup/Item[@Key='Server']", ""),
            "newhost"
        );
        assert_eq!(
            reloaded.get_string("Settings/Connection/Item[@Key='Port']", ""),
            "8080"
        );
    }

    #[test]
    fn test_persist_unwritable_changes_skip_file() {
        let (_dir, store) = setup(SAMPLE);
        let mut records = store.describe();
        records.push(SettingRecord::new("Popup", "Gone", "a", DisplayHint::String, false));
        records.last_mut().unwrap().set_value("b");
        fs::remove_file(store.path()).unwrap();
        assert!(store.persist(&mut records));
        assert!(!store.path().exists());
        assert!(find(&mut records, "Gone").is_dirty());
    }

    #[test]
    fn test_concurrent_persist() {
        let (_dir, store) = setup(SAMPLE);
        let mut first = store.describe();
        let mut second = store.describe();
        find(&mut first, "Interval").set_value("45");
        find(&mut second, "ShowOnStartup").set_value("false");

        std::thread::scope(|s| {
            let a = s.spawn(|| store.persist(&mut first));
            let b = s.spawn(|| store.persist(&mut second));
            assert!(a.join().unwrap());
            assert!(b.join().unwrap());
        });

        let reloaded = SettingsStore::new(store.path());
        reloaded.load();
        let item = |key: &str| format!("Settings/Popup/Item[@Key='{key}']");
        assert_eq!(reloaded.get_int(&item("Interval"), 0), 45);
        assert!(!reloaded.get_bool(&item("ShowOnStartup"), true));
        assert!(!find(&mut first, "Interval").is_dirty());
        assert!(!find(&mut second, "ShowOnStartup").is_dirty());
    }

    #[test]
    fn test_persist_skips_missing_node() {
        let (_dir, store) = setup(SAMPLE);
        let mut records = store.describe();
        records.push(SettingRecord::new("Popup", "Gone", "a", DisplayHint::String, false));
        records.last_mut().unwrap().set_value("b");
        find(&mut records, "Interval").set_value("45");
        assert!(store.persist(&mut records));
        assert!(find(&mut records, "Gone").is_dirty());
        assert!(!find(&mut records, "Interval").is_dirty());
    }

    #[test]
    fn test_persist_write_failure() {
        let (dir, store) = setup(SAMPLE);
        let mut records = store.describe();
        find(&mut records, "Interval").set_value("45");
        find(&mut records, "URL").set_value("https://x");
        fs::remove_dir_all(dir.path().join("Config")).unwrap();

        assert!(!store.persist(&mut records));
        assert!(find(&mut records, "Interval").is_dirty());
        assert_eq!(find(&mut records, "Interval").original_value(), "15");
        assert!(find(&mut records, "URL").is_dirty());
        let item = "Settings/Popup/Item[@Key='Interval']";
        assert_eq!(store.get_int(item, 0), 15);

        fs::create_dir_all(dir.path().join("Config")).unwrap();
        assert!(store.persist(&mut records));
        assert!(!find(&mut records, "Interval").is_dirty());
        assert_eq!(store.get_int(item, 0), 45);
    }
}
