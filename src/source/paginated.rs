use regex::Regex;
use scraper::Selector;
use url::Url;

use super::{
    ChapterListing, ChapterRef, PackedTextSplitter, RawChapter, SourceError, compile_selector,
    select_anchors,
};
use crate::config::{ConfigError, NovelConfig, PaginatedIndexLayout};
use crate::cursor::CrawlCursor;
use crate::fetch::Fetcher;

/// Layout whose index links volumes that are downloaded as packed text.
///
/// Chapter bodies are never fetched page by page; each index entry maps to one
/// packed export, which the splitter cuts into chapters.
#[derive(Debug)]
pub struct PaginatedIndexAdapter {
    index_url_template: String,
    pack_url_template: String,
    chapter_selector: Selector,
    content_pattern: Option<Regex>,
    splitter: PackedTextSplitter,
}

impl PaginatedIndexAdapter {
    pub fn new(layout: &PaginatedIndexLayout) -> Result<Self, ConfigError> {
        require_placeholders(&layout.index_url_template, &["{id}"])?;
        require_placeholders(&layout.pack_url_template, &["{id}", "{vid}"])?;

        let content_pattern = layout
            .content_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.to_owned(),
                    source,
                })
            })
            .transpose()?;

        Ok(Self {
            index_url_template: layout.index_url_template.clone(),
            pack_url_template: layout.pack_url_template.clone(),
            chapter_selector: compile_selector(&layout.chapter_selector)?,
            content_pattern,
            splitter: PackedTextSplitter::new(&layout.title_pattern)?,
        })
    }

    pub fn index_url(&self, novel: &NovelConfig) -> Result<Url, ConfigError> {
        let id = novel_id(novel)?;
        let url = self
            .index_url_template
            .replace("{shard}", &(id / 1000).to_string())
            .replace("{id}", &id.to_string());
        parse_template_url(&url)
    }

    fn pack_url(&self, id: u64, vid: &str) -> Result<Url, ConfigError> {
        let url = self
            .pack_url_template
            .replace("{id}", &id.to_string())
            .replace("{vid}", vid);
        parse_template_url(&url)
    }

    pub async fn list_chapters(
        &self,
        fetcher: &Fetcher,
        novel: &NovelConfig,
        cursor: CrawlCursor,
    ) -> Result<ChapterListing, SourceError> {
        let id = novel_id(novel)?;
        let url = self.index_url(novel)?;
        let page = fetcher.fetch(&url).await?;
        Ok(self.parse_index(&page.body, id, cursor)?)
    }

    pub fn parse_index(
        &self,
        html: &str,
        id: u64,
        cursor: CrawlCursor,
    ) -> Result<ChapterListing, ConfigError> {
        let anchors = select_anchors(html, &self.chapter_selector);
        let total = anchors.len();
        let skip = cursor.skip(total);

        let mut chapters = Vec::new();
        for anchor in anchors.into_iter().skip(skip) {
            let Some(vid) = anchor.href.as_deref().and_then(volume_id) else {
                tracing::debug!(title = %anchor.text, "skip index entry without volume link");
                continue;
            };
            if anchor.text.is_empty() {
                continue;
            }
            chapters.push(ChapterRef {
                title: anchor.text,
                url: self.pack_url(id, vid)?,
            });
        }

        Ok(ChapterListing { total, chapters })
    }

    pub async fn read_chapter(
        &self,
        fetcher: &Fetcher,
        chapter: &ChapterRef,
    ) -> Result<Vec<RawChapter>, SourceError> {
        let page = fetcher.fetch(&chapter.url).await?;
        Ok(self.unpack(&chapter.title, &page.body))
    }

    /// Cuts a packed export into chapters.
    ///
    /// A pack holding several blocks yields one chapter per block. A single
    /// block keeps its own title line when it has one, else the entry's title.
    pub fn unpack(&self, entry_title: &str, packed: &str) -> Vec<RawChapter> {
        let payload = match &self.content_pattern {
            Some(pattern) => match pattern.captures(packed).and_then(|caps| caps.get(1)) {
                Some(payload) => payload.as_str(),
                None => {
                    tracing::warn!(
                        title = %entry_title,
                        "packed text did not match content pattern"
                    );
                    return Vec::new();
                }
            },
            None => packed,
        };

        let blocks = self.splitter.split(payload);
        if blocks.is_empty() {
            return vec![RawChapter {
                title: entry_title.to_owned(),
                lines: Vec::new(),
            }];
        }

        blocks
            .into_iter()
            .map(|block| RawChapter {
                title: block.title.unwrap_or_else(|| entry_title.to_owned()),
                lines: block.lines,
            })
            .collect()
    }
}

fn require_placeholders(
    template: &str,
    placeholders: &[&'static str],
) -> Result<(), ConfigError> {
    for &placeholder in placeholders {
        if !template.contains(placeholder) {
            return Err(ConfigError::MissingPlaceholder {
                template: template.to_owned(),
                placeholder,
            });
        }
    }
    Ok(())
}

fn novel_id(novel: &NovelConfig) -> Result<u64, ConfigError> {
    novel
        .index
        .trim()
        .parse::<u64>()
        .map_err(|err| ConfigError::InvalidReference {
            reference: novel.index.clone(),
            message: format!("paginated index sources need a numeric id: {err}"),
        })
}

fn parse_template_url(url: &str) -> Result<Url, ConfigError> {
    Url::parse(url).map_err(|err| ConfigError::InvalidReference {
        reference: url.to_owned(),
        message: err.to_string(),
    })
}

/// File stem of the link target: `"../3/3057/114320.htm"` -> `"114320"`.
fn volume_id(href: &str) -> Option<&str> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let file = path.rsplit('/').next().unwrap_or(path);
    let stem = match file.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => file,
    };
    (!stem.is_empty()).then_some(stem)
}
