//! The periodical bundle: in-memory Section/Article tree, its three
//! cross-referencing artifacts and the per-article pages.
//!
//! Layout under the output directory:
//!
//! ```text
//! content.opf
//! toc.ncx
//! html/toc.html
//! html/{article id}.html
//! image/cover.jpg        (only when a cover is configured)
//! ```

mod assemble;
mod model;
mod render;

use std::path::{Path, PathBuf};

use anyhow::Context as _;

pub use assemble::{Assembler, Harvest, SourceFailure, SourceHarvest};
pub use model::{Article, Bundle, Section, article_id};
pub use render::{render_article_page, render_content_opf, render_toc_html, render_toc_ncx};

pub const CONTENT_OPF_PATH: &str = "content.opf";
pub const TOC_NCX_PATH: &str = "toc.ncx";
pub const TOC_HTML_PATH: &str = "html/toc.html";
pub const COVER_PATH: &str = "image/cover.jpg";
pub const PAGES_DIR: &str = "html";

/// Writes article pages into `{out_dir}/html` as soon as they are formatted.
#[derive(Debug, Clone)]
pub struct PageWriter {
    pages_dir: PathBuf,
}

impl PageWriter {
    pub fn new(out_dir: &Path) -> Self {
        Self {
            pages_dir: out_dir.join(PAGES_DIR),
        }
    }

    pub fn page_path(&self, id: &str) -> PathBuf {
        self.pages_dir.join(format!("{id}.html"))
    }

    /// Same `id`, title and body always produce the same file.
    pub fn write_page(&self, id: &str, title: &str, body_html: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.pages_dir)?;
        let path = self.page_path(id);
        std::fs::write(&path, render_article_page(title, body_html))?;
        Ok(path)
    }
}

/// Files written by [`write_bundle`], relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenBundle {
    pub files: Vec<PathBuf>,
}

/// Renders the manifest, navigation index and TOC page of an assembled bundle.
///
/// Article pages are already on disk at this point; only the artifacts that
/// reference them are produced here.
pub fn write_bundle(
    out_dir: &Path,
    bundle: &Bundle,
    cover: Option<&Path>,
) -> anyhow::Result<WrittenBundle> {
    std::fs::create_dir_all(out_dir.join(PAGES_DIR))
        .with_context(|| format!("create output dir: {}", out_dir.display()))?;

    let artifacts = [
        (CONTENT_OPF_PATH, render_content_opf(bundle)),
        (TOC_NCX_PATH, render_toc_ncx(bundle)),
        (TOC_HTML_PATH, render_toc_html(bundle)),
    ];

    let mut files = Vec::new();
    for (rel_path, contents) in artifacts {
        let path = out_dir.join(rel_path);
        std::fs::write(&path, contents)
            .with_context(|| format!("write {rel_path}: {}", path.display()))?;
        files.push(PathBuf::from(rel_path));
    }

    if let Some(cover) = cover {
        let dest = out_dir.join(COVER_PATH);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create image dir: {}", parent.display()))?;
        }
        std::fs::copy(cover, &dest)
            .with_context(|| format!("copy cover: {} -> {}", cover.display(), dest.display()))?;
        files.push(PathBuf::from(COVER_PATH));
    }

    tracing::info!(
        out_dir = %out_dir.display(),
        sections = bundle.sections().len(),
        articles = bundle.article_count(),
        "bundle written"
    );
    Ok(WrittenBundle { files })
}
