use super::Selection;
use crate::output::{display_path, print_json};
use actpin_core::cache::ResolutionCache;
use actpin_core::config::{Config, ResolverKind};
use actpin_core::progress::ProgressSink;
use actpin_core::rewrite::{Coordinator, FileOutcome};
use actpin_core::run::{Orchestrator, RunSummary};
use anyhow::Context;
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tag_resolver::Resolver;

#[derive(Args)]
pub struct PinArgs {
    #[command(flatten)]
    select: Selection,

    /// Compute the rewrites without writing any file
    #[arg(long)]
    dry_run: bool,

    /// How tags are resolved: api or git
    #[arg(long, value_name = "KIND")]
    resolver: Option<ResolverKind>,

    /// GitHub token for the API resolver
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// GitHub API base URL
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Maximum number of resolver calls in flight
    #[arg(long, value_name = "N")]
    max_concurrency: Option<usize>,
}

impl PinArgs {
    fn apply(&self, config: &mut Config) {
        self.select.apply(config);
        if let Some(kind) = self.resolver {
            config.resolver = kind;
        }
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        if self.max_concurrency.is_some() {
            config.max_concurrency = self.max_concurrency;
        }
    }
}

// ---------------------------------------------------------------------------
// JSON report
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PinReport {
    dry_run: bool,
    updated: usize,
    pinned: usize,
    skipped: usize,
    resolver_calls: usize,
    files: Vec<FileEntry>,
    failures: Vec<FailureEntry>,
}

#[derive(Serialize)]
struct FileEntry {
    path: String,
    outcome: FileOutcome,
}

#[derive(Serialize)]
struct FailureEntry {
    path: String,
    error: String,
}

impl PinReport {
    fn new(cwd: &Path, summary: &RunSummary, dry_run: bool) -> Self {
        Self {
            dry_run,
            updated: summary.updated(),
            pinned: summary.pinned(),
            skipped: summary.skipped(),
            resolver_calls: summary.resolver_calls,
            files: summary
                .files
                .iter()
                .map(|f| FileEntry {
                    path: display_path(cwd, &f.path),
                    outcome: f.outcome,
                })
                .collect(),
            failures: summary
                .failures
                .iter()
                .map(|f| FailureEntry {
                    path: display_path(cwd, &f.path),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(
    root: &Path,
    cwd: &Path,
    args: PinArgs,
    json: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut config = Config::load(root).context("failed to load config")?;
    args.apply(&mut config);

    let files = args.select.candidates(cwd, &config)?;
    if files.is_empty() {
        if json {
            print_json(&PinReport::new(cwd, &RunSummary::default(), args.dry_run))?;
        } else {
            println!(
                "No workflow files found under {}. Pass files explicitly or use --recursive.",
                cwd.display()
            );
        }
        return Ok(());
    }

    let resolver = config
        .build_resolver(args.token.clone())
        .context("failed to set up resolver")?;
    tracing::info!(
        resolver = %config.resolver,
        files = files.len(),
        dry_run = args.dry_run,
        "pinning"
    );

    let rt = tokio::runtime::Runtime::new()?;
    let summary = rt.block_on(pin_files(
        resolver,
        config.max_concurrency,
        files,
        args.dry_run,
        !(quiet || json),
    ));

    if json {
        print_json(&PinReport::new(cwd, &summary, args.dry_run))?;
    } else {
        print_summary(cwd, &summary, args.dry_run);
    }

    summary.into_result().context("pinning failed")?;
    Ok(())
}

async fn pin_files(
    resolver: Arc<dyn Resolver>,
    max_concurrency: Option<usize>,
    files: Vec<PathBuf>,
    dry_run: bool,
    show_progress: bool,
) -> RunSummary {
    let mut cache = ResolutionCache::new(resolver);
    if let Some(max) = max_concurrency {
        cache = cache.with_max_concurrency(max);
    }

    let (progress, printer) = if show_progress {
        let (sink, mut rx) = ProgressSink::channel();
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                eprintln!("{event}");
            }
        });
        (sink, Some(printer))
    } else {
        (ProgressSink::disabled(), None)
    };

    let coordinator = Coordinator::new(Arc::new(cache), progress).dry_run(dry_run);
    let orchestrator = Orchestrator::new(coordinator);
    let summary = orchestrator.run(files).await;

    // Dropping the last sink closes the channel and lets the printer drain.
    drop(orchestrator);
    if let Some(printer) = printer {
        let _ = printer.await;
    }
    summary
}

fn print_summary(cwd: &Path, summary: &RunSummary, dry_run: bool) {
    for report in &summary.files {
        let path = display_path(cwd, &report.path);
        match report.outcome {
            FileOutcome::Updated { pinned, skipped } => {
                let extra = if skipped > 0 {
                    format!(", {skipped} left on tag")
                } else {
                    String::new()
                };
                println!("{path}: pinned {pinned} reference(s){extra}");
            }
            FileOutcome::Unchanged { skipped } => {
                println!("{path}: unchanged, {skipped} reference(s) left on tag");
            }
            FileOutcome::NoReferences => {}
        }
    }
    for failure in &summary.failures {
        println!("{}: failed: {}", display_path(cwd, &failure.path), failure.error);
    }

    if dry_run {
        println!("Would update {} file(s)", summary.updated());
    } else {
        println!("Updated {} file(s)", summary.updated());
    }
}
