#![windows_subsystem = "windows"]

#[macro_use]
extern crate log;

use anyhow::{anyhow, Result};
use it_beacon::alert;
use it_beacon::config::{Config, CONFIG_FILE};
use it_beacon::theme::ChannelDispatcher;
use it_beacon::utils::get_exe_folder;
use it_beacon::{ResourceSet, SettingsStore, ThemeAdapter};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn main() {
    if let Err(err) = run() {
        alert!("{err}");
    }
}

fn run() -> Result<()> {
    let folder = get_exe_folder()?;
    let config = Config::load(&folder.join(CONFIG_FILE))?;
    match config.log_path(&folder) {
        Some(path) => simple_logging::log_to_file(&path, config.log_level)
            .map_err(|err| anyhow!("Failed to init logger at '{}', {err}", path.display()))?,
        None => simple_logging::log_to_stderr(config.log_level),
    }
    info!("start config={:?}", config);

    let store = SettingsStore::new(config.settings_path(&folder));
    store.load();
    for shortcut in store.get_shortcuts() {
        info!(
            "shortcut {} '{}' {}",
            shortcut.glyph_code(),
            shortcut.tooltip,
            shortcut.url
        );
    }
    for record in store.describe() {
        debug!("setting {:?}", record);
    }

    let adapter = Arc::new(ThemeAdapter::new(config.apply_mode()));
    let resources = Arc::new(Mutex::new(ResourceSet::new()));
    adapter.apply(&mut resources.lock());
    if !config.watch_theme {
        return Ok(());
    }

    let (dispatcher, queue) = ChannelDispatcher::new();
    let watcher = adapter.clone();
    adapter.on_theme_changed(dispatcher, move |theme| {
        watcher.apply_theme(theme, &mut resources.lock());
    });
    loop {
        queue.run_next(Duration::from_secs(60));
    }
}
