//! Harvest settings: the JSON file listing every domain, its locators and the
//! novels it hosts, together with each novel's persisted cursor.
//!
//! Only structural checks happen at load time. Locators are compiled when a
//! domain's adapter is built, so a broken selector in one domain does not stop
//! the others from being harvested.

use std::collections::HashSet;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cursor::CursorUpdate;
use crate::fetch::FetchConfig;

pub const DEFAULT_TITLE: &str = "Novel";
pub const DEFAULT_LANGUAGE: &str = "zh-CN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read settings {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse settings {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid settings: {0}")]
    Validation(String),

    #[error("invalid css selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("invalid source reference {reference:?}: {message}")]
    InvalidReference { reference: String, message: String },

    #[error("url template {template:?} is missing {placeholder}")]
    MissingPlaceholder {
        template: String,
        placeholder: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_title")]
    pub title: String,

    /// `dc:language` of the produced bundle.
    #[serde(default = "default_language")]
    pub language: String,

    /// Image copied to `image/cover.jpg`; relative paths resolve against the
    /// settings file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<PathBuf>,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub domains: Vec<DomainConfig>,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_owned()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_owned()
}

/// A group of novels served by one site layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    #[serde(flatten)]
    pub layout: SourceLayout,

    #[serde(default)]
    pub novels: Vec<NovelConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceLayout {
    DirectLink(DirectLinkLayout),
    PaginatedIndex(PaginatedIndexLayout),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectLinkLayout {
    /// Selects the chapter anchors on the index page.
    pub chapter_selector: String,
    /// Selects the elements whose text nodes form the chapter body.
    pub content_selector: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedIndexLayout {
    /// Index page URL with `{id}` and `{shard}` (`id / 1000`) placeholders.
    pub index_url_template: String,
    /// Packed-text download URL with `{id}` and `{vid}` placeholders.
    pub pack_url_template: String,
    pub chapter_selector: String,
    /// Optional regex whose first capture group is the packed payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_pattern: Option<String>,
    /// Lines matching this regex start a new chapter inside a pack.
    #[serde(default = "default_title_pattern")]
    pub title_pattern: String,
}

pub fn default_title_pattern() -> String {
    r"^\s*(?:第[0-9０-９零〇一二三四五六七八九十百千两]+[章节節回卷]|[Cc]hapter\s+\d+)".to_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NovelConfig {
    pub title: String,
    /// Index URL (direct link) or opaque novel id (paginated index).
    pub index: String,
    /// Chapters harvested by earlier runs. Absent for a novel that was never
    /// harvested, whose first run then starts at its newest chapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_index: Option<usize>,
}

impl Settings {
    pub fn novels(&self) -> impl Iterator<Item = &NovelConfig> {
        self.domains.iter().flat_map(|domain| domain.novels.iter())
    }

    /// Writes the run's cursor values back into the matching novels.
    ///
    /// Returns how many novels changed.
    pub fn apply_cursor_updates(&mut self, updates: &[CursorUpdate]) -> usize {
        let mut changed = 0;
        for update in updates {
            for novel in self
                .domains
                .iter_mut()
                .flat_map(|domain| domain.novels.iter_mut())
                .filter(|novel| novel.title == update.source)
            {
                if novel.last_index != Some(update.last_index) {
                    novel.last_index = Some(update.last_index);
                    changed += 1;
                }
            }
        }
        changed
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.title.trim().is_empty() {
            return Err(ConfigError::Validation("title must not be empty".to_owned()));
        }
        self.fetch.validate()?;

        let mut seen = HashSet::new();
        for novel in self.novels() {
            if novel.title.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "novel title must not be empty (index {:?})",
                    novel.index
                )));
            }
            if novel.title.contains(['/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "novel title must not contain path separators: {:?}",
                    novel.title
                )));
            }
            if !seen.insert(novel.title.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate novel title: {:?}",
                    novel.title
                )));
            }
        }

        Ok(())
    }
}

pub fn load(path: &Path) -> Result<Settings, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    let settings: Settings =
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
    settings.validate()?;
    Ok(settings)
}

/// Replaces the settings file atomically (temp file in the same directory, then rename).
pub fn save(path: &Path, settings: &Settings) -> anyhow::Result<()> {
    use anyhow::Context as _;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp settings in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, settings).context("serialize settings")?;
    tmp.write_all(b"\n").context("write settings newline")?;
    tmp.flush().context("flush settings")?;
    tmp.persist(path)
        .with_context(|| format!("replace settings: {}", path.display()))?;
    Ok(())
}
