//! Offline validation: compiles every domain's locators and resolves every
//! novel's index URL without touching the network.

use std::path::PathBuf;

use anyhow::Context as _;

use crate::cli::CheckArgs;
use crate::config::{self, Settings};
use crate::source::SourceAdapter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NovelCheck {
    pub kind: &'static str,
    pub title: String,
    /// `None` until the novel's first harvest.
    pub last_index: Option<usize>,
    /// Resolved index URL, or why it could not be built.
    pub index_url: Result<String, String>,
}

pub fn inspect(settings: &Settings) -> Vec<NovelCheck> {
    let mut checks = Vec::new();
    for domain in &settings.domains {
        let adapter = SourceAdapter::from_layout(&domain.layout);
        for novel in &domain.novels {
            let (kind, index_url) = match &adapter {
                Ok(adapter) => (
                    adapter.kind(),
                    adapter
                        .index_url(novel)
                        .map(|url| url.to_string())
                        .map_err(|err| err.to_string()),
                ),
                Err(err) => ("invalid", Err(err.to_string())),
            };
            checks.push(NovelCheck {
                kind,
                title: novel.title.clone(),
                last_index: novel.last_index,
                index_url,
            });
        }
    }
    checks
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let config_path = PathBuf::from(&args.config);
    let settings = config::load(&config_path).context("load settings")?;
    let checks = inspect(&settings);

    println!("{} ({} novel(s))", settings.title, checks.len());
    let mut invalid = 0;
    for check in &checks {
        match &check.index_url {
            Ok(url) => {
                let last_index = check
                    .last_index
                    .map_or_else(|| "new".to_owned(), |n| n.to_string());
                println!(
                    "ok\t{}\t{}\tlast_index={}\t{}",
                    check.kind, check.title, last_index, url
                );
            }
            Err(message) => {
                invalid += 1;
                println!("error\t{}\t{}\t{}", check.kind, check.title, message);
            }
        }
    }

    if invalid > 0 {
        anyhow::bail!("{invalid} novel(s) have invalid settings");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_reports_each_novel() {
        let settings: Settings = serde_json::from_str(
            r##"{
  "domains": [
    {
      "kind": "direct_link",
      "chapter_selector": "#list a",
      "content_selector": "#content",
      "novels": [
        { "title": "Alpha", "index": "https://example.com/alpha/", "last_index": 3 },
        { "title": "Gamma", "index": "ftp://example.com/gamma/" }
      ]
    },
    {
      "kind": "paginated_index",
      "index_url_template": "https://example.org/novel/{shard}/{id}/index.htm",
      "pack_url_template": "https://example.org/pack?aid={id}&vid={vid}",
      "chapter_selector": "td[",
      "novels": [ { "title": "Beta", "index": "2345" } ]
    }
  ]
}"##,
        )
        .unwrap();

        let checks = inspect(&settings);

        assert_eq!(checks.len(), 3);
        assert_eq!(checks[0].kind, "direct_link");
        assert_eq!(checks[0].last_index, Some(3));
        assert_eq!(checks[1].last_index, None);
        assert_eq!(checks[0].index_url.as_deref(), Ok("https://example.com/alpha/"));
        assert!(checks[1].index_url.as_ref().unwrap_err().contains("http/https"));
        assert_eq!(checks[2].kind, "invalid");
        assert!(checks[2].index_url.as_ref().unwrap_err().contains("selector"));
    }
}
