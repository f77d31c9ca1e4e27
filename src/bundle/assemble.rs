use super::PageWriter;
use super::model::Section;
use crate::config::{DomainConfig, NovelConfig};
use crate::cursor::{CrawlCursor, CursorUpdate};
use crate::fetch::Fetcher;
use crate::format::format_lines;
use crate::source::{SourceAdapter, SourceError};

/// Result of one source whose whole batch completed.
#[derive(Debug)]
pub struct SourceHarvest {
    /// May be empty when nothing new survived formatting.
    pub section: Section,
    pub cursor: CrawlCursor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: String,
    pub message: String,
}

/// Everything one pass over the configured sources produced.
#[derive(Debug, Default)]
pub struct Harvest {
    /// Non-empty sections, in configuration order.
    pub sections: Vec<Section>,
    /// One entry per source whose batch completed, even with nothing new.
    pub cursor_updates: Vec<CursorUpdate>,
    pub failures: Vec<SourceFailure>,
}

/// Drives adapters source by source and streams formatted pages to disk.
pub struct Assembler<'a> {
    fetcher: &'a Fetcher,
    pages: PageWriter,
}

impl<'a> Assembler<'a> {
    pub fn new(fetcher: &'a Fetcher, pages: PageWriter) -> Self {
        Self { fetcher, pages }
    }

    /// Harvests every chapter past the novel's cursor, in index order.
    ///
    /// Any error aborts the batch. Pages already written stay on disk, but no
    /// cursor is returned, so the next run retries the same chapters.
    pub async fn harvest_source(
        &self,
        adapter: &SourceAdapter,
        novel: &NovelConfig,
    ) -> Result<SourceHarvest, SourceError> {
        let cursor = CrawlCursor::for_novel(novel);
        let listing = adapter.list_chapters(self.fetcher, novel, cursor).await?;
        tracing::info!(
            source = %novel.title,
            total = listing.total,
            new = listing.chapters.len(),
            "index listed"
        );

        let mut section = Section::new(novel.title.clone());
        for chapter in &listing.chapters {
            let raw_chapters = adapter.read_chapter(self.fetcher, chapter).await?;
            for raw in raw_chapters {
                let Some(formatted) = format_lines(&raw.lines) else {
                    tracing::debug!(
                        source = %novel.title,
                        title = %raw.title,
                        "drop empty chapter"
                    );
                    continue;
                };

                let id = section.next_article_id();
                self.pages
                    .write_page(&id, &raw.title, &formatted.body_html)
                    .map_err(|source| SourceError::WritePage {
                        path: self.pages.page_path(&id),
                        source,
                    })?;
                tracing::debug!(%id, title = %raw.title, "page written");
                section.push(raw.title, formatted.description);
            }
        }

        Ok(SourceHarvest {
            section,
            cursor: cursor.advance(listing.total),
        })
    }

    /// Processes every domain's novels one after another.
    ///
    /// A failing source is recorded and skipped; its siblings still run.
    pub async fn harvest_all(&self, domains: &[DomainConfig]) -> Harvest {
        let mut harvest = Harvest::default();

        for domain in domains {
            let adapter = match SourceAdapter::from_layout(&domain.layout) {
                Ok(adapter) => adapter,
                Err(err) => {
                    tracing::warn!(error = %err, "skip domain with invalid layout");
                    for novel in &domain.novels {
                        harvest.failures.push(SourceFailure {
                            source: novel.title.clone(),
                            message: err.to_string(),
                        });
                    }
                    continue;
                }
            };

            for novel in &domain.novels {
                match self.harvest_source(&adapter, novel).await {
                    Ok(SourceHarvest { section, cursor }) => {
                        tracing::info!(
                            source = %novel.title,
                            kind = adapter.kind(),
                            articles = section.len(),
                            last_index = ?cursor.last_index(),
                            "source harvested"
                        );
                        if let Some(last_index) = cursor.last_index() {
                            harvest.cursor_updates.push(CursorUpdate {
                                source: novel.title.clone(),
                                last_index,
                            });
                        }
                        if !section.is_empty() {
                            harvest.sections.push(section);
                        }
                    }
                    Err(err) => {
                        tracing::warn!(source = %novel.title, error = %err, "source failed");
                        harvest.failures.push(SourceFailure {
                            source: novel.title.clone(),
                            message: err.to_string(),
                        });
                    }
                }
            }
        }

        harvest
    }
}
