use super::document::Element;

pub const DEFAULT_GLYPH_CODE: &str = "E713";
pub const DEFAULT_GLYPH: char = '\u{E713}';
pub const DEFAULT_TOOLTIP: &str = "Link";

/// A quick-launch entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    pub glyph: char,
    pub tooltip: String,
    pub url: String,
}

impl Shortcut {
    pub(crate) fn from_element(el: &Element) -> Self {
        let field = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| el.child(name))
                .map(|v| v.text())
        };
        let glyph = field(&["Glyph"]).unwrap_or_else(|| DEFAULT_GLYPH_CODE.to_string());
        Self {
            glyph: decode_glyph(&glyph),
            tooltip: field(&["ToolTip"]).unwrap_or_else(|| DEFAULT_TOOLTIP.to_string()),
            url: field(&["URL", "Url"]).unwrap_or_default(),
        }
    }

    /// The glyph as stored on disk, e.g. `E8F2`.
    pub fn glyph_code(&self) -> String {
        format!("{:04X}", self.glyph as u32)
    }
}

/// Decodes a bare hex code point such as `E8F2`, falling back to [`DEFAULT_GLYPH`].
pub fn decode_glyph(hex: &str) -> char {
    match u32::from_str_radix(hex.trim(), 16)
        .ok()
        .and_then(char::from_u32)
    {
        Some(c) => c,
        None => {
            warn!("Invalid glyph code '{hex}', using default");
            DEFAULT_GLYPH
        }
    }
}
