//! One harvest run: settings in, bundle and updated cursors out.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::bundle::{Assembler, Bundle, PageWriter, SourceFailure, write_bundle};
use crate::cli::RunArgs;
use crate::config::{self, Settings};
use crate::cursor::CursorUpdate;
use crate::fetch::Fetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A bundle with at least one section was written.
    Produced,
    /// No source yielded a surviving chapter; no artifacts were written.
    NothingNew,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub sections: usize,
    pub articles: usize,
    pub cursor_updates: Vec<CursorUpdate>,
    pub failures: Vec<SourceFailure>,
    /// Whether the settings file was rewritten with new cursors.
    pub cursors_saved: bool,
}

pub async fn run(args: RunArgs) -> anyhow::Result<RunReport> {
    let config_path = PathBuf::from(&args.config);
    let out_dir = PathBuf::from(&args.out);

    let mut settings = config::load(&config_path).context("load settings")?;
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create output dir: {}", out_dir.display()))?;

    let fetcher = Fetcher::new(settings.fetch.clone()).context("build http client")?;
    let assembler = Assembler::new(&fetcher, PageWriter::new(&out_dir));
    let harvest = assembler.harvest_all(&settings.domains).await;

    for failure in &harvest.failures {
        tracing::warn!(source = %failure.source, error = %failure.message, "source skipped");
    }

    let bundle = Bundle::assemble(
        settings.title.clone(),
        settings.language.clone(),
        harvest.sections,
    );
    let (outcome, sections, articles) = match &bundle {
        Some(bundle) => {
            let cover = settings
                .cover
                .as_deref()
                .map(|cover| resolve_against(&config_path, cover));
            write_bundle(&out_dir, bundle, cover.as_deref()).context("write bundle")?;
            (
                RunOutcome::Produced,
                bundle.sections().len(),
                bundle.article_count(),
            )
        }
        None => {
            tracing::info!("nothing new; no bundle written");
            (RunOutcome::NothingNew, 0, 0)
        }
    };

    let cursors_saved = if args.dry_run {
        tracing::info!(updates = harvest.cursor_updates.len(), "dry run; cursors not saved");
        false
    } else {
        persist_cursors(&config_path, &mut settings, &harvest.cursor_updates)?
    };

    Ok(RunReport {
        outcome,
        sections,
        articles,
        cursor_updates: harvest.cursor_updates,
        failures: harvest.failures,
        cursors_saved,
    })
}

fn persist_cursors(
    config_path: &Path,
    settings: &mut Settings,
    updates: &[CursorUpdate],
) -> anyhow::Result<bool> {
    let changed = settings.apply_cursor_updates(updates);
    if changed == 0 {
        return Ok(false);
    }
    config::save(config_path, settings).context("save cursors")?;
    tracing::info!(changed, path = %config_path.display(), "cursors saved");
    Ok(true)
}

/// Relative paths in the settings are relative to the settings file.
fn resolve_against(config_path: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_owned();
    }
    match config_path.parent() {
        Some(dir) => dir.join(path),
        None => path.to_owned(),
    }
}
