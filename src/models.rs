use chrono::{DateTime, Utc};
use std::fmt;

/// Prefix shared by every scroll-offset key.
pub const POSITION_PREFIX: &str = "nr_pos_";
/// Extra prefix that moves a position key into the session tier.
pub const SESSION_PREFIX: &str = "ss_";
/// Single global record naming the most recently active novel.
pub const CURRENT_NOVEL_KEY: &str = "nr_current_novel";
pub const THEME_KEY: &str = "nr_theme";
pub const FONT_KEY: &str = "nr_font";

/// Label shown when the block list has no chapter headings at all.
pub const NO_CHAPTER_LABEL: &str = "（未检测到章节标题）";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Heading {
    /// Zero-padded chapter number, used as the anchor key.
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(Heading),
    Paragraph(String),
}

impl Block {
    pub fn heading(id: impl Into<String>, title: impl Into<String>) -> Self {
        Block::Heading(Heading {
            id: id.into(),
            title: title.into(),
        })
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph(text.into())
    }

    pub fn as_heading(&self) -> Option<&Heading> {
        match self {
            Block::Heading(heading) => Some(heading),
            Block::Paragraph(_) => None,
        }
    }

    /// The text a reader sees for this block.
    pub fn text(&self) -> &str {
        match self {
            Block::Heading(heading) => &heading.title,
            Block::Paragraph(text) => text,
        }
    }
}

/// Collect the heading subsequence of a block list, in reading order.
pub fn headings_of(blocks: &[Block]) -> Vec<Heading> {
    blocks
        .iter()
        .filter_map(Block::as_heading)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Parse a stored value. Anything unrecognised reads as the light theme.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Survives across sessions.
    Durable,
    /// Survives only within one session; consulted first on restore.
    Session,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub namespace: String,
    pub context: String,
}

impl PositionKey {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            namespace: POSITION_PREFIX.to_string(),
            context: context.into(),
        }
    }

    pub fn storage_key(&self, tier: Tier) -> String {
        match tier {
            Tier::Durable => format!("{}{}", self.namespace, self.context),
            Tier::Session => format!("{}{}{}", SESSION_PREFIX, self.namespace, self.context),
        }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.namespace, self.context)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionRecord {
    pub key: PositionKey,
    pub offset: u32,
    pub tier: Tier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveChapter {
    /// Index into the heading list.
    Heading(usize),
    NotDetected,
}

impl ActiveChapter {
    pub fn index(&self) -> Option<usize> {
        match self {
            ActiveChapter::Heading(index) => Some(*index),
            ActiveChapter::NotDetected => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryItem {
    pub last_read: DateTime<Utc>,
    pub context: String,
    pub title: Option<String>,
    pub offset: u32,
}
