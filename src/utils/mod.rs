#[cfg(windows)]
mod regedit;
mod windows_theme;

#[cfg(windows)]
pub use regedit::*;
pub use windows_theme::*;

use anyhow::{anyhow, Result};
use std::path::PathBuf;

pub fn get_exe_folder() -> Result<PathBuf> {
    let path =
        std::env::current_exe().map_err(|err| anyhow!("Failed to get binary path, {err}"))?;
    path.parent()
        .ok_or_else(|| anyhow!("Failed to get binary folder"))
        .map(|v| v.to_path_buf())
}

#[cfg(windows)]
pub fn to_wstring(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(Some(0)).collect::<Vec<u16>>()
}
