//! Visual style presets.

use std::fmt;
use std::str::FromStr;

use prism_api::pack_rgba;
use serde::{Deserialize, Serialize};

/// Named style preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleKind {
    #[default]
    Dark,
    Light,
    Classic,
}

impl FromStr for StyleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Ok(StyleKind::Dark),
            "light" => Ok(StyleKind::Light),
            "classic" => Ok(StyleKind::Classic),
            _ => Err(format!("unknown style: {s}")),
        }
    }
}

impl fmt::Display for StyleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StyleKind::Dark => "dark",
            StyleKind::Light => "light",
            StyleKind::Classic => "classic",
        };
        f.write_str(name)
    }
}

/// Packed RGBA colors for each drawn element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleColors {
    pub text: u32,
    pub window_bg: u32,
    pub title_bg: u32,
    pub border: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub kind: StyleKind,
    pub window_padding: [f32; 2],
    pub item_spacing: [f32; 2],
    /// Gap between consecutive windows.
    pub window_spacing: f32,
    pub border_size: f32,
    pub colors: StyleColors,
}

impl Style {
    pub fn new(kind: StyleKind) -> Self {
        match kind {
            StyleKind::Dark => Self::dark(),
            StyleKind::Light => Self::light(),
            StyleKind::Classic => Self::classic(),
        }
    }

    pub fn dark() -> Self {
        Self::with_colors(
            StyleKind::Dark,
            StyleColors {
                text: pack_rgba(255, 255, 255, 255),
                window_bg: pack_rgba(15, 15, 15, 240),
                title_bg: pack_rgba(41, 74, 122, 255),
                border: pack_rgba(110, 110, 128, 128),
            },
        )
    }

    pub fn light() -> Self {
        Self::with_colors(
            StyleKind::Light,
            StyleColors {
                text: pack_rgba(0, 0, 0, 255),
                window_bg: pack_rgba(240, 240, 240, 255),
                title_bg: pack_rgba(209, 209, 209, 255),
                border: pack_rgba(0, 0, 0, 77),
            },
        )
    }

    pub fn classic() -> Self {
        Self::with_colors(
            StyleKind::Classic,
            StyleColors {
                text: pack_rgba(230, 230, 230, 255),
                window_bg: pack_rgba(0, 0, 0, 217),
                title_bg: pack_rgba(69, 69, 138, 212),
                border: pack_rgba(127, 127, 127, 128),
            },
        )
    }

    fn with_colors(kind: StyleKind, colors: StyleColors) -> Self {
        Self {
            kind,
            window_padding: [8.0, 8.0],
            item_spacing: [8.0, 4.0],
            window_spacing: 10.0,
            border_size: 1.0,
            colors,
        }
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::dark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_differ() {
        assert_ne!(Style::dark().colors, Style::light().colors);
        assert_ne!(Style::dark().colors, Style::classic().colors);
        assert_eq!(Style::default().kind, StyleKind::Dark);
        assert_eq!(Style::new(StyleKind::Light).kind, StyleKind::Light);
    }

    #[test]
    fn test_parse_style_kind() {
        assert_eq!("Classic".parse::<StyleKind>(), Ok(StyleKind::Classic));
        assert!("neon".parse::<StyleKind>().is_err());
        assert_eq!(StyleKind::Light.to_string(), "light");
    }
}
