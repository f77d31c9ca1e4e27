use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use novelzine::run::RunOutcome;

/// Exit status when the run completed but no source had anything new.
const EXIT_NOTHING_NEW: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    match try_main().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn try_main() -> anyhow::Result<ExitCode> {
    let cli = novelzine::cli::Cli::parse();
    novelzine::logging::init(cli.verbose).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        novelzine::cli::Command::Run(args) => {
            let report = novelzine::run::run(args).await.context("run")?;
            for failure in &report.failures {
                eprintln!("skipped {}: {}", failure.source, failure.message);
            }
            match report.outcome {
                RunOutcome::Produced => {
                    println!(
                        "wrote {} article(s) in {} section(s)",
                        report.articles, report.sections
                    );
                    Ok(ExitCode::SUCCESS)
                }
                RunOutcome::NothingNew => {
                    println!("nothing new");
                    Ok(ExitCode::from(EXIT_NOTHING_NEW))
                }
            }
        }
        novelzine::cli::Command::Check(args) => {
            novelzine::check::run(args).context("check")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
