use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, info_span, warn};

use pharm_cli::pipeline::{
    Settings, build_engine, default_output_path, open_match_store, open_store,
};
use pharm_ingest::{load_corrections, load_invoice, write_results};
use pharm_learn::{StoreExport, StoreStats};
use pharm_map::{LearnSummary, RunSummary};
use pharm_model::MatchResult;

use crate::cli::{ExportArgs, ForgetArgs, LearnArgs, MatchArgs, StoreArgs};

pub struct MatchOutcome {
    pub output: PathBuf,
    pub results: Vec<MatchResult>,
    pub summary: RunSummary,
    pub elapsed: Duration,
}

pub fn run_match(settings: &Settings, args: &MatchArgs) -> Result<MatchOutcome> {
    let span = info_span!("match", invoice = %args.invoice.display());
    let _guard = span.enter();
    let started = Instant::now();

    let store = args
        .store
        .as_deref()
        .map(|path| open_match_store(path, settings));
    let engine = build_engine(settings, &args.catalog, args.purchases.as_deref(), store)?;
    let lines = load_invoice(&args.invoice).context("load invoice")?;

    let progress = if args.no_progress {
        ProgressBar::hidden()
    } else {
        progress_bar(lines.len())
    };
    let results = engine
        .match_all_with(&lines, |_| progress.inc(1))
        .context("match invoice")?;
    progress.finish_and_clear();

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.invoice));
    write_results(&output, &results).context("write match results")?;

    let summary = RunSummary::from_results(&results);
    info!(
        output = %output.display(),
        automation_rate = summary.automation_rate(),
        "match complete"
    );
    Ok(MatchOutcome {
        output,
        results,
        summary,
        elapsed: started.elapsed(),
    })
}

pub fn run_learn(settings: &Settings, args: &LearnArgs) -> Result<(LearnSummary, StoreStats)> {
    let span = info_span!("learn", corrections = %args.corrections.display());
    let _guard = span.enter();

    let store = open_store(&args.store, settings)?;
    let engine = build_engine(settings, &args.catalog, None, Some(store.clone()))?;
    let corrections = load_corrections(&args.corrections).context("load corrections")?;
    if corrections.is_empty() {
        warn!("corrections file has no reviewed rows");
    }

    let summary = engine.learn_from(&corrections);
    let stats = store
        .stats(settings.config.learning_threshold)
        .context("read learning store statistics")?;
    Ok((summary, stats))
}

pub fn run_export(settings: &Settings, args: &ExportArgs) -> Result<StoreExport> {
    let store = open_store(&args.store, settings)?;
    store
        .export_to(&args.output)
        .with_context(|| format!("export learning store to {}", args.output.display()))
}

pub fn run_stats(settings: &Settings, args: &StoreArgs) -> Result<StoreStats> {
    if !args.store.exists() {
        return Err(anyhow!("learning store not found: {}", args.store.display()));
    }
    let store = open_store(&args.store, settings)?;
    store
        .stats(settings.config.learning_threshold)
        .context("read learning store statistics")
}

pub fn run_forget(settings: &Settings, args: &ForgetArgs) -> Result<bool> {
    let key = settings
        .pattern_key(&args.item, &args.supplier)
        .ok_or_else(|| anyhow!("item text normalizes to nothing: {:?}", args.item))?;
    let store = open_store(&args.store, settings)?;
    let removed = store
        .delete(&key, args.reason.clone())
        .with_context(|| format!("delete learned mapping {key}"))?;
    if !removed {
        warn!(pattern_key = %key, "no learned mapping to delete");
    }
    Ok(removed)
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} matching [{bar:40}] {pos}/{len} lines ({eta})")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}
