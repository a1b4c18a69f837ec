use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result, Theme, storage::atomic_write_utf8};

pub const MIN_FONT_SIZE: u32 = 12;
pub const MAX_FONT_SIZE: u32 = 24;
pub const MIN_LINE_HEIGHT: f32 = 1.2;
pub const MAX_LINE_HEIGHT: f32 = 2.0;

const SETTINGS_DIR: &str = ".marknote";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Editor,
    Preview,
    Split,
}

impl ViewMode {
    pub const fn cycle(self) -> Self {
        match self {
            Self::Editor => Self::Preview,
            Self::Preview => Self::Split,
            Self::Split => Self::Editor,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Editor => "Editor",
            Self::Preview => "Preview",
            Self::Split => "Split View",
        }
    }

    /// Parse the lowercase name used in the settings file.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "editor" => Some(Self::Editor),
            "preview" => Some(Self::Preview),
            "split" => Some(Self::Split),
            _ => None,
        }
    }

    pub const fn shows_editor(self) -> bool {
        matches!(self, Self::Editor | Self::Split)
    }

    pub const fn shows_preview(self) -> bool {
        matches!(self, Self::Preview | Self::Split)
    }
}

/// Persisted editor preferences.
///
/// Unknown keys are ignored and missing keys take their default, so older or
/// hand-edited files still load. Numeric fields are clamped into range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub font_family: String,
    pub font_size: u32,
    pub line_height: f32,
    pub theme: Theme,
    pub auto_save: bool,
    pub view_mode: ViewMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_family: "Georgia, serif".to_owned(),
            font_size: 16,
            line_height: 1.6,
            theme: Theme::Cream,
            auto_save: true,
            view_mode: ViewMode::Editor,
        }
    }
}

impl Settings {
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.font_size = self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self.line_height = if self.line_height.is_finite() {
            self.line_height.clamp(MIN_LINE_HEIGHT, MAX_LINE_HEIGHT)
        } else {
            Self::default().line_height
        };
        self
    }

    #[must_use]
    pub fn with_font_family(self, font_family: impl Into<String>) -> Self {
        Self {
            font_family: font_family.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_font_size(self, font_size: u32) -> Self {
        Self { font_size, ..self }.clamped()
    }

    #[must_use]
    pub fn with_line_height(self, line_height: f32) -> Self {
        Self {
            line_height,
            ..self
        }
        .clamped()
    }

    #[must_use]
    pub fn with_theme(self, theme: Theme) -> Self {
        Self { theme, ..self }
    }

    #[must_use]
    pub fn with_auto_save(self, auto_save: bool) -> Self {
        Self { auto_save, ..self }
    }

    #[must_use]
    pub fn with_view_mode(self, view_mode: ViewMode) -> Self {
        Self { view_mode, ..self }
    }

    pub fn from_json(path: &Path, json: &str) -> Result<Self> {
        serde_json::from_str::<Self>(json)
            .map(Self::clamped)
            .map_err(|source| Error::SettingsParse {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Location of the settings file in the user's home directory.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(SETTINGS_DIR).join(SETTINGS_FILE))
}

/// Reads and writes [`Settings`] at a fixed path.
#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at [`default_settings_path`], if a home directory is known.
    pub fn at_default_path() -> Option<Self> {
        default_settings_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to defaults when the file is missing or
    /// cannot be parsed.
    pub fn load(&self) -> Settings {
        match self.try_load() {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                debug!(path = %self.path.display(), "no settings file, using defaults");
                Settings::default()
            }
            Err(err) => {
                warn!(error = %err, "using default settings");
                Settings::default()
            }
        }
    }

    /// Like [`Self::load`] but reports why the stored settings were unusable.
    pub fn try_load(&self) -> Result<Option<Settings>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        Settings::from_json(&self.path, &json).map(Some)
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        let map_err = |source| Error::SettingsWrite {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).map_err(map_err)?;
        }
        atomic_write_utf8(&self.path, &settings.to_json()).map_err(map_err)?;
        debug!(path = %self.path.display(), "saved settings");
        Ok(())
    }
}
