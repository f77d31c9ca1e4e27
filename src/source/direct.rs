use scraper::{Html, Node, Selector};
use url::Url;

use super::{ChapterListing, ChapterRef, SourceError, compile_selector, select_anchors};
use crate::config::{ConfigError, DirectLinkLayout, NovelConfig};
use crate::cursor::CrawlCursor;
use crate::fetch::Fetcher;

/// Elements that end a line of chapter text.
const LINE_BREAKING: &[&str] = &["br", "p", "div", "li", "h1", "h2", "h3", "h4", "h5", "h6"];

/// Layout where the index page links every chapter page directly.
#[derive(Debug)]
pub struct DirectLinkAdapter {
    chapter_selector: Selector,
    content_selector: Selector,
}

impl DirectLinkAdapter {
    pub fn new(layout: &DirectLinkLayout) -> Result<Self, ConfigError> {
        Ok(Self {
            chapter_selector: compile_selector(&layout.chapter_selector)?,
            content_selector: compile_selector(&layout.content_selector)?,
        })
    }

    pub fn index_url(&self, novel: &NovelConfig) -> Result<Url, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidReference {
            reference: novel.index.clone(),
            message,
        };
        let url = Url::parse(novel.index.trim()).map_err(|err| invalid(err.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid("index url must be http/https".to_owned()));
        }
        Ok(url)
    }

    pub async fn list_chapters(
        &self,
        fetcher: &Fetcher,
        novel: &NovelConfig,
        cursor: CrawlCursor,
    ) -> Result<ChapterListing, SourceError> {
        let url = self.index_url(novel)?;
        let page = fetcher.fetch(&url).await?;
        Ok(self.parse_index(&page.body, &page.url, cursor))
    }

    /// Chapters past the cursor, with hrefs made absolute.
    ///
    /// Anchors without text or a resolvable href still count toward the total.
    pub fn parse_index(
        &self,
        html: &str,
        base_url: &Url,
        cursor: CrawlCursor,
    ) -> ChapterListing {
        let anchors = select_anchors(html, &self.chapter_selector);
        let total = anchors.len();
        let skip = cursor.skip(total);

        let chapters = anchors
            .into_iter()
            .skip(skip)
            .filter_map(|anchor| {
                if anchor.text.is_empty() {
                    return None;
                }
                let href = anchor.href?;
                match base_url.join(&href) {
                    Ok(url) => Some(ChapterRef {
                        title: anchor.text,
                        url,
                    }),
                    Err(err) => {
                        tracing::debug!(%href, ?err, "skip unresolvable chapter link");
                        None
                    }
                }
            })
            .collect();

        ChapterListing { total, chapters }
    }

    pub async fn read_chapter_body(
        &self,
        fetcher: &Fetcher,
        url: &Url,
    ) -> Result<Vec<String>, SourceError> {
        let page = fetcher.fetch(url).await?;
        Ok(self.parse_content(&page.body))
    }

    /// Text of every element matched by the content locator, one entry per line.
    pub fn parse_content(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut lines = Vec::new();

        for element in document.select(&self.content_selector) {
            let mut current = String::new();
            for node in element.descendants() {
                match node.value() {
                    Node::Text(text) => current.push_str(text),
                    Node::Element(el) if LINE_BREAKING.contains(&el.name()) => {
                        flush_line(&mut current, &mut lines);
                    }
                    _ => {}
                }
            }
            flush_line(&mut current, &mut lines);
        }

        lines
    }
}

fn flush_line(current: &mut String, lines: &mut Vec<String>) {
    if current.is_empty() {
        return;
    }
    lines.extend(current.lines().map(str::to_owned));
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> DirectLinkAdapter {
        DirectLinkAdapter::new(&DirectLinkLayout {
            chapter_selector: "#list dd a".to_owned(),
            content_selector: "#content".to_owned(),
        })
        .unwrap()
    }

    const INDEX: &str = r#"<html><body><div id="list"><dl>
        <dd><a href="/book/1.html">Chapter 1</a></dd>
        <dd><a href="2.html">Chapter 2</a></dd>
        <dd><a>Broken</a></dd>
        <dd><a href="https://mirror.example.net/4.html">Chapter 4</a></dd>
    </dl></div></body></html>"#;

    #[test]
    fn parse_index_resolves_links_against_base() {
        let base = Url::parse("https://example.com/book/").unwrap();
        let listing = adapter().parse_index(INDEX, &base, CrawlCursor::new(0));

        assert_eq!(listing.total, 4);
        let urls: Vec<_> = listing.chapters.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "https://example.com/book/1.html",
                "https://example.com/book/2.html",
                "https://mirror.example.net/4.html",
            ]
        );
        assert_eq!(listing.chapters[0].title, "Chapter 1");
    }

    #[test]
    fn parse_index_slices_off_harvested_entries() {
        let base = Url::parse("https://example.com/book/").unwrap();
        let listing = adapter().parse_index(INDEX, &base, CrawlCursor::new(2));

        assert_eq!(listing.total, 4);
        assert_eq!(listing.chapters.len(), 1);
        assert_eq!(listing.chapters[0].title, "Chapter 4");
    }

    #[test]
    fn parse_index_with_cursor_past_end_is_empty() {
        let base = Url::parse("https://example.com/book/").unwrap();
        let listing = adapter().parse_index(INDEX, &base, CrawlCursor::new(9));
        assert_eq!(listing.total, 4);
        assert!(listing.chapters.is_empty());
    }

    #[test]
    fn parse_index_without_cursor_starts_at_newest_chapter() {
        let base = Url::parse("https://example.com/book/").unwrap();
        let listing = adapter().parse_index(INDEX, &base, CrawlCursor::unset());
        assert_eq!(listing.total, 4);
        let titles: Vec<_> = listing.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["Chapter 4"]);
    }

    #[test]
    fn parse_content_splits_on_line_breaks() {
        let html = r#"<div id="content">&nbsp;&nbsp;first line<br /><br />
            second <b>bold</b> line<br/>third</div><div id="footer">ads</div>"#;
        let lines: Vec<_> = adapter()
            .parse_content(html)
            .into_iter()
            .map(|l| l.trim().to_owned())
            .filter(|l| !l.is_empty())
            .collect();
        assert_eq!(lines, ["first line", "second bold line", "third"]);
    }

    #[test]
    fn parse_content_without_match_is_empty() {
        assert!(adapter().parse_content("<p>nothing here</p>").is_empty());
    }

    #[test]
    fn index_url_rejects_non_http_reference() {
        let novel = NovelConfig {
            title: "Alpha".to_owned(),
            index: "1234".to_owned(),
            last_index: Some(0),
        };
        assert!(matches!(
            adapter().index_url(&novel),
            Err(ConfigError::InvalidReference { .. })
        ));
    }
}
