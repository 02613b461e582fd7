use super::notify_setting_change;

use anyhow::{anyhow, bail, Result};
use once_cell::sync::OnceCell;
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{GetLastError, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DispatchMessageW, GetMessageW, RegisterClassW,
    TranslateMessage, MSG, WINDOW_STYLE, WM_SETTINGCHANGE, WNDCLASSW, WS_EX_TOOLWINDOW,
};

const NAME: PCWSTR = w!("IT Beacon Theme Watcher");

static STARTED: OnceCell<()> = OnceCell::new();

/// Starts the watcher thread the first time it is called.
pub fn ensure_started() {
    STARTED.get_or_init(|| {
        let ret = std::thread::Builder::new()
            .name("theme-watcher".into())
            .spawn(|| {
                if let Err(err) = run() {
                    error!("theme watcher stopped, {err}");
                }
            });
        match ret {
            Ok(_) => info!("theme watcher start"),
            Err(err) => error!("Failed to spawn theme watcher, {err}"),
        }
    });
}

// A hidden top-level window; message-only windows miss broadcasts.
fn run() -> Result<()> {
    let hinstance = unsafe { GetModuleHandleW(None) }
        .map_err(|err| anyhow!("Failed to get current module handle, {err}"))?;

    let window_class = WNDCLASSW {
        hInstance: HINSTANCE(hinstance.0),
        lpszClassName: NAME,
        lpfnWndProc: Some(window_proc),
        ..Default::default()
    };
    let atom = unsafe { RegisterClassW(&window_class) };
    if atom == 0 {
        bail!(
            "Failed to register class, {}",
            windows::core::Error::from_win32()
        );
    }

    unsafe {
        CreateWindowExW(
            WS_EX_TOOLWINDOW,
            PCWSTR(atom as _),
            NAME,
            WINDOW_STYLE(0),
            0,
            0,
            0,
            0,
            None,
            None,
            Some(HINSTANCE(hinstance.0)),
            None,
        )
    }
    .map_err(|err| anyhow!("Failed to create watcher window, {err}"))?;

    let mut message = MSG::default();
    loop {
        let ret = unsafe { GetMessageW(&mut message, None, 0, 0) };
        match ret.0 {
            -1 => {
                unsafe { GetLastError() }.ok()?;
            }
            0 => break,
            _ => unsafe {
                let _ = TranslateMessage(&message);
                DispatchMessageW(&message);
            },
        }
    }
    Ok(())
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_SETTINGCHANGE && lparam.0 != 0 {
        let area = PCWSTR(lparam.0 as *const u16).to_string().unwrap_or_default();
        notify_setting_change(&area);
    }
    DefWindowProcW(hwnd, msg, wparam, lparam)
}
