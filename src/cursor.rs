use crate::config::NovelConfig;

/// Resume point of one source: how many index entries earlier runs consumed.
///
/// A source that was never harvested has no position yet; its first run
/// starts at the newest entry instead of the whole back catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlCursor {
    last_index: Option<usize>,
}

impl CrawlCursor {
    pub fn new(last_index: usize) -> Self {
        Self {
            last_index: Some(last_index),
        }
    }

    pub fn unset() -> Self {
        Self { last_index: None }
    }

    pub fn for_novel(novel: &NovelConfig) -> Self {
        Self {
            last_index: novel.last_index,
        }
    }

    pub fn last_index(self) -> Option<usize> {
        self.last_index
    }

    /// Leading index entries to skip when the index shows `visible_total`.
    pub fn skip(self, visible_total: usize) -> usize {
        match self.last_index {
            Some(last_index) => last_index,
            None => visible_total.saturating_sub(1),
        }
    }

    /// Cursor for the next run once a batch has fully completed.
    ///
    /// `visible_total` is the number of entries the index showed this run, even
    /// when that is lower than the current position.
    #[must_use]
    pub fn advance(self, visible_total: usize) -> Self {
        Self::new(visible_total)
    }
}

/// A cursor value the caller should persist for `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorUpdate {
    pub source: String,
    pub last_index: usize,
}
