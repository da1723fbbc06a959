use crate::logging;
use crate::models::{FONT_KEY, THEME_KEY, Theme};
use crate::position::SharedStore;
use crate::restore::{CHAPTER_RESTORE_ATTEMPTS, CONTINUOUS_RESTORE_ATTEMPTS};
use crate::source::Novel;
use crate::tracker::DEFAULT_VISIBLE_FRACTION;
use serde::{Deserialize, Serialize};

pub const MIN_FONT_SIZE: u8 = 14;
pub const MAX_FONT_SIZE: u8 = 26;
pub const DEFAULT_FONT_SIZE: u8 = 18;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub restore_attempts: u32,
    pub chapter_restore_attempts: u32,
    pub visible_fraction: f32,
    /// Rows left above a heading after jumping to it.
    pub heading_scroll_margin: u32,
    pub show_status_bar: bool,
    pub novels: Vec<Novel>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            restore_attempts: CONTINUOUS_RESTORE_ATTEMPTS,
            chapter_restore_attempts: CHAPTER_RESTORE_ATTEMPTS,
            visible_fraction: DEFAULT_VISIBLE_FRACTION,
            heading_scroll_margin: 1,
            show_status_bar: true,
            novels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keymap {
    pub next_chapter: String,
    pub prev_chapter: String,
    pub enlarge: String,
    pub shrink: String,
    pub switch_color: String,
    pub table_of_contents: String,
    pub novels: String,
    pub jump_to_chapter: String,
    pub scroll_to_top: String,
    pub help: String,
    pub quit: String,
}

impl Default for Keymap {
    fn default() -> Self {
        Self {
            next_chapter: "j".to_string(),
            prev_chapter: "k".to_string(),
            enlarge: "+".to_string(),
            shrink: "-".to_string(),
            switch_color: "c".to_string(),
            table_of_contents: "t".to_string(),
            novels: "n".to_string(),
            jump_to_chapter: ":".to_string(),
            scroll_to_top: "g".to_string(),
            help: "?".to_string(),
            quit: "q".to_string(),
        }
    }
}

impl Keymap {
    /// Whether `binding` is bound to the typed character.
    pub fn matches(binding: &str, c: char) -> bool {
        let mut chars = binding.chars();
        chars.next() == Some(c) && chars.next().is_none()
    }
}

pub fn clamp_font_size(size: i64) -> u8 {
    size.clamp(MIN_FONT_SIZE as i64, MAX_FONT_SIZE as i64) as u8
}

/// Per-reader display preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderSettings {
    pub theme: Theme,
    pub font_size: u8,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl ReaderSettings {
    /// Build from raw stored values, falling back field by field.
    pub fn from_stored(theme: Option<&str>, font: Option<&str>) -> Self {
        let font_size = font
            .and_then(|f| f.trim().parse::<f64>().ok())
            .filter(|f| f.is_finite())
            .map(|f| clamp_font_size(f.round() as i64))
            .unwrap_or(DEFAULT_FONT_SIZE);
        Self {
            theme: Theme::from_stored(theme),
            font_size,
        }
    }

    pub fn increase_font(&mut self) -> bool {
        self.step_font(1)
    }

    pub fn decrease_font(&mut self) -> bool {
        self.step_font(-1)
    }

    fn step_font(&mut self, delta: i64) -> bool {
        let next = clamp_font_size(self.font_size as i64 + delta);
        let changed = next != self.font_size;
        self.font_size = next;
        changed
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
    }
}

/// Persistence port for [`ReaderSettings`]. Implementations swallow their own
/// storage failures.
pub trait SettingsPort {
    fn load(&self) -> ReaderSettings;
    fn save(&mut self, value: &ReaderSettings);
}

/// Keeps reader settings in a key/value store under `nr_theme` and `nr_font`.
pub struct StoreSettingsPort {
    store: SharedStore,
}

impl StoreSettingsPort {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.borrow().get(key) {
            Ok(value) => value,
            Err(err) => {
                logging::warn(format!("could not read {}: {}", key, err));
                None
            }
        }
    }
}

impl SettingsPort for StoreSettingsPort {
    fn load(&self) -> ReaderSettings {
        let theme = self.read(THEME_KEY);
        let font = self.read(FONT_KEY);
        ReaderSettings::from_stored(theme.as_deref(), font.as_deref())
    }

    fn save(&mut self, value: &ReaderSettings) {
        let mut store = self.store.borrow_mut();
        let font = value.font_size.to_string();
        for (key, stored) in [(THEME_KEY, value.theme.as_str()), (FONT_KEY, font.as_str())] {
            if let Err(err) = store.set(key, stored) {
                logging::warn(format!("could not save {}: {}", key, err));
            }
        }
    }
}
