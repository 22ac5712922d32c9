//! Color themes of the site.
//!
//! There's a fixed set of themes. The selected theme is persisted in a key/value storage; when
//! nothing has been selected yet, the theme depends on the time of day.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context};
use chrono::Timelike;
use itertools::Itertools;

/// Storage key of the selected theme
pub const STORAGE_KEY: &str = "selectedTheme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeName {
    Current,
    Earth,
    Water,
    Stone,
    Tea,
    Sakura,
    Moss,
}

impl ThemeName {
    pub const ALL: [ThemeName; 7] = [
        ThemeName::Current,
        ThemeName::Earth,
        ThemeName::Water,
        ThemeName::Stone,
        ThemeName::Tea,
        ThemeName::Sakura,
        ThemeName::Moss,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeName::Current => "current",
            ThemeName::Earth => "earth",
            ThemeName::Water => "water",
            ThemeName::Stone => "stone",
            ThemeName::Tea => "tea",
            ThemeName::Sakura => "sakura",
            ThemeName::Moss => "moss",
        }
    }

    pub fn theme(&self) -> &'static Theme {
        &THEMES[*self as usize]
    }
}

impl Display for ThemeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ThemeName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match ThemeName::ALL.iter().find(|name| name.as_str() == s) {
            Some(name) => Ok(*name),
            None => bail!("Unknown theme '{}'", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub bg_primary: &'static str,
    pub text_primary: &'static str,
    pub text_secondary: &'static str,
    pub accent_sage: &'static str,
    pub accent_light: &'static str,
    pub border_light: &'static str,
    pub shadow_soft: &'static str,
}

impl Palette {
    /// The style variables of this palette, as (name, value) pairs.
    pub fn style_variables(&self) -> [(&'static str, &'static str); 7] {
        [
            ("--bg-primary", self.bg_primary),
            ("--text-primary", self.text_primary),
            ("--text-secondary", self.text_secondary),
            ("--accent-sage", self.accent_sage),
            ("--accent-light", self.accent_light),
            ("--border-light", self.border_light),
            ("--shadow-soft", self.shadow_soft),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Display name
    pub name: &'static str,
    pub colors: Palette,
}

// Same order as ThemeName
static THEMES: [Theme; 7] = [
    Theme {
        name: "Current Theme",
        colors: Palette {
            bg_primary: "#FAFAF8",
            text_primary: "#2C3E50",
            text_secondary: "#5A6C7D",
            accent_sage: "#7C9885",
            accent_light: "#A8BFA8",
            border_light: "#E8E8E8",
            shadow_soft: "rgba(44, 62, 80, 0.08)",
        },
    },
    Theme {
        name: "Earth Tones",
        colors: Palette {
            bg_primary: "#F5F3EE",
            text_primary: "#3D3935",
            text_secondary: "#7C756D",
            accent_sage: "#9B8B7E",
            accent_light: "#C4B8A9",
            border_light: "#E6E1D8",
            shadow_soft: "rgba(61, 57, 53, 0.08)",
        },
    },
    Theme {
        name: "Muted Blues",
        colors: Palette {
            bg_primary: "#F8F9FA",
            text_primary: "#2E3E4E",
            text_secondary: "#5F6F7F",
            accent_sage: "#6B8E9E",
            accent_light: "#9FB8C3",
            border_light: "#E7ECEF",
            shadow_soft: "rgba(46, 62, 78, 0.08)",
        },
    },
    Theme {
        name: "Stone Garden",
        colors: Palette {
            bg_primary: "#FAFAFA",
            text_primary: "#2A2A2A",
            text_secondary: "#5C5C5C",
            accent_sage: "#7A7A7A",
            accent_light: "#A8A8A8",
            border_light: "#E5E5E5",
            shadow_soft: "rgba(42, 42, 42, 0.08)",
        },
    },
    Theme {
        name: "Tea Ceremony",
        colors: Palette {
            bg_primary: "#FAF7F2",
            text_primary: "#3A3530",
            text_secondary: "#6B6358",
            accent_sage: "#8B7E6A",
            accent_light: "#B8AB96",
            border_light: "#E9E4DC",
            shadow_soft: "rgba(58, 53, 48, 0.08)",
        },
    },
    Theme {
        name: "Cherry Blossom",
        colors: Palette {
            bg_primary: "#FBF9F7",
            text_primary: "#2D3436",
            text_secondary: "#636E72",
            accent_sage: "#C9A5A0",
            accent_light: "#E3CCC8",
            border_light: "#EFEAE7",
            shadow_soft: "rgba(45, 52, 54, 0.08)",
        },
    },
    Theme {
        name: "Moss & Stone",
        colors: Palette {
            bg_primary: "#F7F7F5",
            text_primary: "#2C3E50",
            text_secondary: "#5A6C7D",
            accent_sage: "#6B8270",
            accent_light: "#9CAA9A",
            border_light: "#E5E7E3",
            shadow_soft: "rgba(44, 62, 80, 0.08)",
        },
    },
];

/// Theme used when none has been selected: tea in the morning [6, 12), current in the
/// afternoon [12, 18), earth tones otherwise.
pub fn time_based_theme(hour: u32) -> ThemeName {
    match hour {
        6..=11 => ThemeName::Tea,
        12..=17 => ThemeName::Current,
        _ => ThemeName::Earth,
    }
}

//----- Collaborators

/// Key/value storage where the selected theme is persisted.
pub trait ThemeStorage {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// Where the style variables of the current theme are applied.
pub trait StyleSurface {
    fn set_property(&mut self, name: &str, value: &str);
}

pub trait Clock {
    /// Local hour, 0 to 23
    fn local_hour(&self) -> u32;
}

//----- Theme manager

///
/// Holds the current theme, applies it to a style surface and persists changes.
///
/// A manager only exists once its theme has been applied: `initialize` is the only way to create
/// one.
///
pub struct ThemeManager<S: ThemeStorage, V: StyleSurface> {
    current: ThemeName,
    storage: S,
    surface: V,
}

impl<S: ThemeStorage, V: StyleSurface> ThemeManager<S, V> {
    /// Adopt the persisted theme if there's a valid one, or the time-based theme otherwise, and
    /// apply it to the surface. Storage failures are logged and treated as "no selection".
    pub fn initialize(storage: S, surface: V, clock: &impl Clock) -> Self {
        let saved = match storage.get(STORAGE_KEY) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("Cannot read the selected theme: {:#}", err);
                None
            }
        };

        let current = saved
            .and_then(|name| match name.parse::<ThemeName>() {
                Ok(name) => Some(name),
                Err(err) => {
                    log::debug!("Ignoring saved theme: {}", err);
                    None
                }
            })
            .unwrap_or_else(|| time_based_theme(clock.local_hour()));

        let mut manager = ThemeManager { current, storage, surface };
        manager.apply();
        manager
    }

    pub fn current(&self) -> ThemeName {
        self.current
    }

    pub fn theme(&self) -> &'static Theme {
        self.current.theme()
    }

    /// Select a theme: it's applied to the surface and persisted. A persistence failure is
    /// logged, and the theme stays selected for this session.
    pub fn set_theme(&mut self, name: ThemeName) {
        self.current = name;
        self.apply();
        if let Err(err) = self.storage.set(STORAGE_KEY, name.as_str()) {
            log::warn!("Cannot save the selected theme: {:#}", err);
        }
    }

    pub fn surface(&self) -> &V {
        &self.surface
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_parts(self) -> (S, V) {
        (self.storage, self.surface)
    }

    fn apply(&mut self) {
        for (name, value) in self.current.theme().colors.style_variables() {
            self.surface.set_property(name, value);
        }
    }
}

//----- Storage implementations

/// Storage in a JSON file holding a string to string map.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStorage { path: path.into() }
    }

    fn read_all(&self) -> anyhow::Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {:?}", &self.path))?;
        let entries = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse {:?}", &self.path))?;
        Ok(entries)
    }
}

impl ThemeStorage for FileStorage {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut entries = self.read_all().unwrap_or_else(|err| {
            log::warn!("Overwriting unreadable storage: {:#}", err);
            BTreeMap::new()
        });
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("Cannot create directory {:?}", parent))?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)
            .with_context(|| format!("Cannot write to {:?}", &self.path))?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    pub entries: BTreeMap<String, String>,
}

impl ThemeStorage for MemoryStorage {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

//----- Surface and clock implementations

/// Style variables, in the order they were first set.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StyleVars {
    vars: Vec<(String, String)>,
}

impl StyleVars {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// CSS rule setting the variables on the document root.
    pub fn to_css(&self) -> String {
        let vars = self.vars.iter().map(|(name, value)| format!("  {}: {};\n", name, value)).join("");
        format!(":root {{\n{}}}\n", vars)
    }
}

impl StyleSurface for StyleVars {
    fn set_property(&mut self, name: &str, value: &str) {
        match self.vars.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.vars.push((name.to_string(), value.to_string())),
        }
    }
}

/// The system's local time.
pub struct LocalClock;

impl Clock for LocalClock {
    fn local_hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

/// A clock stuck at a given hour.
pub struct FixedClock(pub u32);

impl Clock for FixedClock {
    fn local_hour(&self) -> u32 {
        self.0
    }
}
