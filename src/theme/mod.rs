mod color;
mod listener;
mod resources;
#[cfg(windows)]
mod watcher;

pub use color::Color;
pub use listener::{
    notify_setting_change, ChannelDispatcher, Task, TaskQueue, UiDispatcher, THEME_CHANGE_AREA,
};
pub use resources::{ResourceBundle, ResourceSet};

use crate::utils::is_light_theme;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn from_light(light: bool) -> Self {
        if light {
            Self::Light
        } else {
            Self::Dark
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => f.write_str("light"),
            Self::Dark => f.write_str("dark"),
        }
    }
}

pub const BACKGROUND: &str = "Background";
pub const FOREGROUND: &str = "Foreground";
pub const FOOTER: &str = "Footer";
pub const ACCENT: &str = "Accent";
pub const ACCENT_HOVER: &str = "AccentHover";
pub const ACCENT_PRESSED: &str = "AccentPressed";

// hover/pressed accent shift, in percent
const ACCENT_SHIFT: u8 = 15;

/// The fixed colors published for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
    pub footer: Color,
    pub accent: Color,
}

impl Palette {
    pub const LIGHT: Palette = Palette {
        background: Color::rgb(0xf2, 0xf2, 0xf2),
        foreground: Color::rgb(0x1b, 0x1b, 0x1b),
        footer: Color::rgb(0xe0, 0xe0, 0xe0),
        accent: Color::rgb(0x00, 0x67, 0xc0),
    };

    pub const DARK: Palette = Palette {
        background: Color::rgb(0x3b, 0x3b, 0x3b),
        foreground: Color::rgb(0xff, 0xff, 0xff),
        footer: Color::rgb(0x4c, 0x4c, 0x4c),
        accent: Color::rgb(0x4c, 0xc2, 0xff),
    };

    pub fn of(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self::LIGHT,
            Theme::Dark => Self::DARK,
        }
    }

    pub fn accent_hover(&self) -> Color {
        self.accent.lighten(ACCENT_SHIFT)
    }

    pub fn accent_pressed(&self) -> Color {
        self.accent.darken(ACCENT_SHIFT)
    }

    /// Named resources in publishing order.
    pub fn entries(&self) -> [(&'static str, Color); 6] {
        [
            (BACKGROUND, self.background),
            (FOREGROUND, self.foreground),
            (FOOTER, self.footer),
            (ACCENT, self.accent),
            (ACCENT_HOVER, self.accent_hover()),
            (ACCENT_PRESSED, self.accent_pressed()),
        ]
    }
}

/// How [`ThemeAdapter::apply`] publishes a theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyMode {
    /// Set the named palette colors directly.
    Palette,
    /// Swap in one of two pre-built bundles.
    Bundles {
        light: ResourceBundle,
        dark: ResourceBundle,
    },
}

/// Follows the OS light/dark preference.
pub struct ThemeAdapter {
    mode: ApplyMode,
    detect: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl ThemeAdapter {
    pub fn new(mode: ApplyMode) -> Self {
        Self::with_detector(mode, is_light_theme)
    }

    /// Uses `detect` instead of the OS preference; `detect` returns "is light".
    pub fn with_detector<F>(mode: ApplyMode, detect: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            mode,
            detect: Arc::new(detect),
        }
    }

    pub fn mode(&self) -> &ApplyMode {
        &self.mode
    }

    pub fn is_light_theme(&self) -> bool {
        (self.detect)()
    }

    pub fn current_theme(&self) -> Theme {
        Theme::from_light(self.is_light_theme())
    }

    /// Publishes the current theme into `resources` and returns it.
    pub fn apply(&self, resources: &mut ResourceSet) -> Theme {
        let theme = self.current_theme();
        self.apply_theme(theme, resources);
        theme
    }

    pub fn apply_theme(&self, theme: Theme, resources: &mut ResourceSet) {
        match &self.mode {
            ApplyMode::Palette => {
                for (name, color) in Palette::of(theme).entries() {
                    resources.set_color(name, color);
                }
            }
            ApplyMode::Bundles { light, dark } => {
                let removed = resources
                    .remove_bundles(|v| v.source() == light.source() || v.source() == dark.source());
                let bundle = match theme {
                    Theme::Light => light,
                    Theme::Dark => dark,
                };
                debug!(
                    "swap theme bundle, removed {removed}, added {}",
                    bundle.source()
                );
                resources.add_bundle(bundle.clone());
            }
        }
        info!("applied {theme} theme");
    }

    /// Calls `callback` through `dispatcher` whenever the OS theme preference changes.
    ///
    /// The registration lasts for the rest of the process.
    pub fn on_theme_changed<D, F>(&self, dispatcher: D, callback: F)
    where
        D: UiDispatcher + 'static,
        F: Fn(Theme) + Send + Sync + 'static,
    {
        listener::register(
            self.detect.clone(),
            Arc::new(dispatcher),
            Arc::new(callback),
        );
    }
}

impl fmt::Debug for ThemeAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeAdapter")
            .field("mode", &self.mode)
            .finish()
    }
}
