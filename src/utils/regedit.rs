use anyhow::{anyhow, bail, Result};
use windows::core::PCWSTR;
use windows::Win32::Foundation::ERROR_FILE_NOT_FOUND;
use windows::Win32::System::Registry::{
    RegCloseKey, RegGetValueW, RegOpenKeyExW, HKEY, HKEY_CURRENT_USER, KEY_READ,
    REG_DWORD_BIG_ENDIAN, REG_VALUE_TYPE, RRF_RT_REG_DWORD,
};

/// A read-only handle to one value under `HKEY_CURRENT_USER`.
#[derive(Debug)]
pub struct RegKey {
    hkey: HKEY,
    name: PCWSTR,
}

impl RegKey {
    /// Opens `subkey`. Returns `Ok(None)` when the key does not exist.
    pub fn open_hkcu(subkey: PCWSTR, name: PCWSTR) -> Result<Option<RegKey>> {
        let mut hkey = HKEY::default();
        let ret = unsafe { RegOpenKeyExW(HKEY_CURRENT_USER, subkey, 0, KEY_READ, &mut hkey) };
        if ret == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        ret.ok()
            .map_err(|err| anyhow!("Fail to open reg key, {:?}", err))?;
        Ok(Some(RegKey { hkey, name }))
    }

    /// Reads a DWORD value. Returns `Ok(None)` when the value is absent.
    pub fn get_int(&self) -> Result<Option<u32>> {
        let mut value: [u8; 4] = Default::default();
        let mut size: u32 = std::mem::size_of_val(&value) as u32;
        let mut kind: REG_VALUE_TYPE = Default::default();
        let ret = unsafe {
            RegGetValueW(
                self.hkey,
                None,
                self.name,
                RRF_RT_REG_DWORD,
                Some(&mut kind),
                Some(value.as_mut_ptr() as *mut _),
                Some(&mut size),
            )
        };
        if ret == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        if ret.is_err() {
            bail!(
                "Fail to get reg value, {:?}",
                windows::core::Error::from(ret)
            );
        }
        let value = if kind == REG_DWORD_BIG_ENDIAN {
            u32::from_be_bytes(value)
        } else {
            u32::from_le_bytes(value)
        };
        Ok(Some(value))
    }
}

impl Drop for RegKey {
    fn drop(&mut self) {
        let _ = unsafe { RegCloseKey(self.hkey) };
    }
}
