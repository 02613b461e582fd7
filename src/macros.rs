#[cfg(windows)]
pub fn message_box(text: &str) {
    use windows::core::{w, PCWSTR};
    use windows::Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONERROR, MB_OK};

    let text = crate::utils::to_wstring(text);
    unsafe {
        MessageBoxW(
            None,
            PCWSTR(text.as_ptr() as _),
            w!("IT Beacon Error"),
            MB_OK | MB_ICONERROR,
        )
    };
}

#[cfg(not(windows))]
pub fn message_box(text: &str) {
    eprintln!("IT Beacon Error: {text}");
}

/// Reports a fatal error to the user, there may be no console to print to.
#[macro_export]
macro_rules! alert {
    ($($arg:tt)*) => {
        $crate::macros::message_box(&format!($($arg)*))
    };
}
