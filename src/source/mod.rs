//! Source adapters: one extraction contract over different site layouts.
//!
//! Every adapter lists the chapters an index exposes beyond the cursor and
//! reads a chapter into ordered `(title, lines)` tuples. The layout is a closed
//! set; adding one means adding a variant here and a match arm below.

mod direct;
mod paginated;
mod split;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

pub use direct::DirectLinkAdapter;
pub use paginated::PaginatedIndexAdapter;
pub use split::{PackedBlock, PackedTextSplitter};

use crate::config::{ConfigError, NovelConfig, SourceLayout};
use crate::cursor::CrawlCursor;
use crate::fetch::{FetchError, Fetcher};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("write page {}: {source}", path.display())]
    WritePage {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

/// A chapter the index exposes beyond the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRef {
    pub title: String,
    pub url: Url,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterListing {
    /// Entries visible in the whole index, including already harvested ones.
    pub total: usize,
    /// Entries after the cursor, in index order.
    pub chapters: Vec<ChapterRef>,
}

/// Text of one chapter before formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChapter {
    pub title: String,
    pub lines: Vec<String>,
}

#[derive(Debug)]
pub enum SourceAdapter {
    DirectLink(DirectLinkAdapter),
    PaginatedIndex(PaginatedIndexAdapter),
}

impl SourceAdapter {
    /// Compiles the layout's locators.
    pub fn from_layout(layout: &SourceLayout) -> Result<Self, ConfigError> {
        Ok(match layout {
            SourceLayout::DirectLink(layout) => Self::DirectLink(DirectLinkAdapter::new(layout)?),
            SourceLayout::PaginatedIndex(layout) => {
                Self::PaginatedIndex(PaginatedIndexAdapter::new(layout)?)
            }
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::DirectLink(_) => "direct_link",
            Self::PaginatedIndex(_) => "paginated_index",
        }
    }

    pub fn index_url(&self, novel: &NovelConfig) -> Result<Url, ConfigError> {
        match self {
            Self::DirectLink(adapter) => adapter.index_url(novel),
            Self::PaginatedIndex(adapter) => adapter.index_url(novel),
        }
    }

    pub async fn list_chapters(
        &self,
        fetcher: &Fetcher,
        novel: &NovelConfig,
        cursor: CrawlCursor,
    ) -> Result<ChapterListing, SourceError> {
        match self {
            Self::DirectLink(adapter) => adapter.list_chapters(fetcher, novel, cursor).await,
            Self::PaginatedIndex(adapter) => adapter.list_chapters(fetcher, novel, cursor).await,
        }
    }

    pub async fn read_chapter(
        &self,
        fetcher: &Fetcher,
        chapter: &ChapterRef,
    ) -> Result<Vec<RawChapter>, SourceError> {
        match self {
            Self::DirectLink(adapter) => {
                let lines = adapter.read_chapter_body(fetcher, &chapter.url).await?;
                Ok(vec![RawChapter {
                    title: chapter.title.clone(),
                    lines,
                }])
            }
            Self::PaginatedIndex(adapter) => adapter.read_chapter(fetcher, chapter).await,
        }
    }
}

pub(crate) fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|err| ConfigError::InvalidSelector {
        selector: selector.to_owned(),
        message: err.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Anchor {
    pub text: String,
    pub href: Option<String>,
}

/// Every element matched by `selector`, in document order.
pub(crate) fn select_anchors(html: &str, selector: &Selector) -> Vec<Anchor> {
    let document = Html::parse_document(html);
    document
        .select(selector)
        .map(|element| Anchor {
            text: collapse_whitespace(&element.text().collect::<String>()),
            href: anchor_href(element),
        })
        .collect()
}

fn anchor_href(element: ElementRef<'_>) -> Option<String> {
    if let Some(href) = element.value().attr("href") {
        return Some(href.trim().to_owned());
    }
    // Locators sometimes match the cell around the link.
    let inner = Selector::parse("a[href]").ok()?;
    element
        .select(&inner)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.trim().to_owned())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DirectLinkLayout, PaginatedIndexLayout, default_title_pattern};

    #[test]
    fn from_layout_picks_matching_variant() {
        let direct = SourceAdapter::from_layout(&SourceLayout::DirectLink(DirectLinkLayout {
            chapter_selector: "#list a".to_owned(),
            content_selector: "#content".to_owned(),
        }))
        .unwrap();
        assert_eq!(direct.kind(), "direct_link");

        let paginated =
            SourceAdapter::from_layout(&SourceLayout::PaginatedIndex(PaginatedIndexLayout {
                index_url_template: "https://example.org/{shard}/{id}/index.htm".to_owned(),
                pack_url_template: "https://example.org/pack?aid={id}&vid={vid}".to_owned(),
                chapter_selector: "td a".to_owned(),
                content_pattern: None,
                title_pattern: default_title_pattern(),
            }))
            .unwrap();
        assert_eq!(paginated.kind(), "paginated_index");
    }

    #[test]
    fn invalid_selector_is_a_config_error() {
        let err = SourceAdapter::from_layout(&SourceLayout::DirectLink(DirectLinkLayout {
            chapter_selector: "a[".to_owned(),
            content_selector: "#content".to_owned(),
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSelector { .. }));
    }

    #[test]
    fn select_anchors_reads_text_and_nested_href() {
        let selector = compile_selector("td.ccss").unwrap();
        let anchors = select_anchors(
            r#"<table><tr>
                <td class="ccss"><a href="101.htm">  第一章
                    开端 </a></td>
                <td class="ccss">&nbsp;</td>
            </tr></table>"#,
            &selector,
        );
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].text, "第一章 开端");
        assert_eq!(anchors[0].href.as_deref(), Some("101.htm"));
        assert_eq!(anchors[1].href, None);
    }
}
