//! GUI settings - JSON configuration and descriptor overrides.

use std::path::{Path, PathBuf};

use prism_api::{Descriptor, TraitTag};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{AtlasError, Charset, MouseCursor, StyleKind, check_font_size};

pub const DEFAULT_FONT_NAME: &str = "default";
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("couldn't read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid {tag:?} trait: {reason}")]
    Trait { tag: TraitTag, reason: String },
}

/// The font every system requests for itself on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSettings {
    /// "default" for the built-in font, otherwise a font file path.
    pub name: String,
    pub size: f32,
    pub charset: Charset,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_FONT_NAME.to_string(),
            size: DEFAULT_FONT_SIZE,
            charset: Charset::Default,
        }
    }
}

impl FontSettings {
    pub fn to_descriptor(&self) -> Descriptor {
        Descriptor::new()
            .with(TraitTag::Name, self.name.as_str())
            .with(TraitTag::Size, self.size)
            .with(TraitTag::Charset, self.charset.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuiSettings {
    pub style: StyleKind,
    pub font: FontSettings,
    /// Cursor roles to look up on construction.
    pub cursors: Vec<MouseCursor>,
    /// Draw the framerate window every frame.
    pub stats_window: bool,
}

impl Default for GuiSettings {
    fn default() -> Self {
        Self {
            style: StyleKind::Dark,
            font: FontSettings::default(),
            cursors: MouseCursor::ALL.to_vec(),
            stats_window: true,
        }
    }
}

impl GuiSettings {
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(text)?;
        check_font_size(settings.font.size).map_err(font_size_error)?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// These settings with the overrides a descriptor carries:
    /// `Style` picks the preset, `Size` and `Charset` tune the default font.
    pub fn apply(&self, descriptor: &Descriptor) -> Result<Self, SettingsError> {
        let mut settings = self.clone();

        if let Some(style) = descriptor.text(TraitTag::Style) {
            settings.style = style.parse().map_err(|reason| SettingsError::Trait {
                tag: TraitTag::Style,
                reason,
            })?;
        }
        if let Some(size) = descriptor.real(TraitTag::Size) {
            settings.font.size = check_font_size(size).map_err(font_size_error)?;
        }
        if let Some(charset) = descriptor.text(TraitTag::Charset) {
            settings.font.charset = charset.parse().map_err(|error: AtlasError| {
                SettingsError::Trait {
                    tag: TraitTag::Charset,
                    reason: error.to_string(),
                }
            })?;
        }
        Ok(settings)
    }

    /// Descriptor carrying the overridable part of these settings.
    pub fn to_descriptor(&self) -> Descriptor {
        Descriptor::new()
            .with(TraitTag::Style, self.style.to_string())
            .with(TraitTag::Size, self.font.size)
            .with(TraitTag::Charset, self.font.charset.name())
    }
}

fn font_size_error(error: AtlasError) -> SettingsError {
    SettingsError::Trait {
        tag: TraitTag::Size,
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = GuiSettings::default();
        assert_eq!(settings.style, StyleKind::Dark);
        assert_eq!(settings.font.name, "default");
        assert_eq!(settings.font.size, 16.0);
        assert_eq!(settings.cursors.len(), 9);
        assert!(settings.stats_window);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings =
            GuiSettings::from_json(r#"{ "style": "light", "font": { "size": 20.0 } }"#).unwrap();
        assert_eq!(settings.style, StyleKind::Light);
        assert_eq!(settings.font.size, 20.0);
        assert_eq!(settings.font.name, "default");
        assert_eq!(settings.cursors.len(), 9);
    }

    #[test]
    fn test_cursor_roles_in_json() {
        let settings = GuiSettings::from_json(r#"{ "cursors": ["arrow", "ibeam", "nope"] }"#).unwrap();
        assert_eq!(
            settings.cursors,
            vec![MouseCursor::Arrow, MouseCursor::TextInput, MouseCursor::NotAllowed]
        );
        assert!(GuiSettings::from_json(r#"{ "cursors": ["spinner"] }"#).is_err());
    }

    #[test]
    fn test_descriptor_overrides() {
        let descriptor = Descriptor::new()
            .with(TraitTag::Style, "Classic")
            .with(TraitTag::Size, 12i64)
            .with(TraitTag::Charset, "greek");
        let settings = GuiSettings::default().apply(&descriptor).unwrap();
        assert_eq!(settings.style, StyleKind::Classic);
        assert_eq!(settings.font.size, 12.0);
        assert_eq!(settings.font.charset, Charset::Greek);

        // Round trip through a descriptor
        let again = GuiSettings::default().apply(&settings.to_descriptor()).unwrap();
        assert_eq!(again, settings);
    }

    #[test]
    fn test_invalid_overrides() {
        let bad_style = Descriptor::new().with(TraitTag::Style, "neon");
        assert!(matches!(
            GuiSettings::default().apply(&bad_style),
            Err(SettingsError::Trait { tag: TraitTag::Style, .. })
        ));

        for size in [-1.0f32, f32::INFINITY, f32::NAN, 1e6] {
            let bad_size = Descriptor::new().with(TraitTag::Size, size);
            assert!(matches!(
                GuiSettings::default().apply(&bad_size),
                Err(SettingsError::Trait { tag: TraitTag::Size, .. })
            ));
        }
        assert!(matches!(
            GuiSettings::from_json(r#"{ "font": { "size": 1000000.0 } }"#),
            Err(SettingsError::Trait { tag: TraitTag::Size, .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gui.json");
        std::fs::write(&path, r#"{ "stats_window": false }"#).unwrap();
        assert!(!GuiSettings::load(&path).unwrap().stats_window);

        let missing = GuiSettings::load(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(SettingsError::Io { .. })));
    }
}
