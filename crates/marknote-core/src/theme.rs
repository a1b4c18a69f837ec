use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Cream,
    Dark,
    White,
}

/// Colours a theme applies to the editor chrome, as `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub text: &'static str,
    pub sidebar: &'static str,
    pub border: &'static str,
}

impl Theme {
    pub const ALL: [Self; 3] = [Self::Cream, Self::Dark, Self::White];

    pub const fn palette(self) -> Palette {
        match self {
            Self::Cream => Palette {
                background: "#faf8f5",
                text: "#2c2c2c",
                sidebar: "#f5f5f5",
                border: "#e0e0e0",
            },
            Self::Dark => Palette {
                background: "#1e1e1e",
                text: "#d4d4d4",
                sidebar: "#252526",
                border: "#3e3e3e",
            },
            Self::White => Palette {
                background: "#ffffff",
                text: "#333333",
                sidebar: "#f8f8f8",
                border: "#e1e1e1",
            },
        }
    }

    pub const fn label(self) -> &'static str {
        ["Cream", "Dark", "White"][self as usize]
    }

    /// Parse the lowercase name used in the settings file.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|theme| theme.label().eq_ignore_ascii_case(name))
    }

    pub const fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }
}
