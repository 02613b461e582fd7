use anyhow::Result;

/// Maps the `AppsUseLightTheme` registry value to "is light".
///
/// Only an explicit `0` means dark; absent or unreadable values count as light.
pub fn light_from_preference(value: Result<Option<u32>>) -> bool {
    match value {
        Ok(Some(0)) => false,
        Ok(_) => true,
        Err(err) => {
            warn!("Fail to get system theme, {err}");
            true
        }
    }
}

#[cfg(windows)]
pub fn is_light_theme() -> bool {
    use super::RegKey;
    use windows::core::w;

    let value = RegKey::open_hkcu(
        w!("Software\\Microsoft\\Windows\\CurrentVersion\\Themes\\Personalize"),
        w!("AppsUseLightTheme"),
    )
    .and_then(|key| match key {
        Some(key) => key.get_int(),
        None => Ok(None),
    });
    light_from_preference(value)
}

#[cfg(not(windows))]
pub fn is_light_theme() -> bool {
    light_from_preference(Ok(None))
}
