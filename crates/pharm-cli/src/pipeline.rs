//! Assembling a matching engine from files on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, trace, warn};

use pharm_ingest::{load_catalog, load_purchases};
use pharm_learn::{LearningStore, MappingStore, UnavailableStore};
use pharm_map::{MatchConfig, MatchEngine, PurchaseHistory};
use pharm_model::{MatchResult, PatternKey, Tier};
use pharm_normalize::{Normalize, Normalizer, Vocabulary};

use crate::logging::redact_value;

/// Configuration shared by every command.
pub struct Settings {
    pub config: MatchConfig,
    pub normalizer: Arc<Normalizer>,
}

impl Settings {
    /// Load the match configuration and vocabulary, falling back to defaults.
    pub fn load(config: Option<&Path>, vocabulary: Option<&Path>) -> Result<Self> {
        let config = match config {
            Some(path) => MatchConfig::load(path)
                .with_context(|| format!("load match config {}", path.display()))?,
            None => MatchConfig::default(),
        };
        let vocabulary = match vocabulary {
            Some(path) => Vocabulary::load(path)
                .with_context(|| format!("load vocabulary {}", path.display()))?,
            None => Vocabulary::default(),
        };
        let normalizer = Normalizer::new(vocabulary).context("build normalizer")?;
        Ok(Self {
            config,
            normalizer: Arc::new(normalizer),
        })
    }

    /// Pattern key of an invoice text and supplier as the engine derives it.
    pub fn pattern_key(&self, item: &str, supplier: &str) -> Option<PatternKey> {
        let text = self.normalizer.normalize(item);
        let supplier = self.normalizer.normalize_supplier(supplier);
        PatternKey::derive(&text.full, &supplier).ok()
    }
}

/// Open (or create) a journaled learning store.
pub fn open_store(path: &Path, settings: &Settings) -> Result<Arc<LearningStore>> {
    let store = LearningStore::open(path, settings.config.learning)
        .with_context(|| format!("open learning store {}", path.display()))?;
    info!(
        path = %path.display(),
        events = store.event_count(),
        "opened learning store"
    );
    Ok(Arc::new(store))
}

/// Open a store for matching. A store that cannot be opened does not stop
/// the run: lines are scored instead and their breakdown says so.
pub fn open_match_store(path: &Path, settings: &Settings) -> Arc<dyn MappingStore> {
    match open_store(path, settings) {
        Ok(store) => store,
        Err(error) => {
            let reason = format!("{error:#}");
            warn!(
                path = %path.display(),
                error = %reason,
                "learning store unavailable, matching without it"
            );
            Arc::new(UnavailableStore::new(reason))
        }
    }
}

/// Build an engine over the catalog, with optional purchase history and store.
pub fn build_engine(
    settings: &Settings,
    catalog: &Path,
    purchases: Option<&Path>,
    store: Option<Arc<dyn MappingStore>>,
) -> Result<MatchEngine> {
    let items = load_catalog(catalog).context("load catalog")?;
    let mut engine = MatchEngine::new(items, settings.normalizer.clone(), settings.config.clone())
        .context("prepare catalog")?;

    if let Some(path) = purchases {
        let records = load_purchases(path).context("load purchase history")?;
        let history = PurchaseHistory::build(&records, engine.catalog(), engine.normalizer());
        if history.unresolved() > 0 {
            debug!(
                unresolved = history.unresolved(),
                "purchase records without a catalog item"
            );
        }
        engine = engine.with_history(Arc::new(history));
    }
    if let Some(store) = store {
        engine = engine.with_store(store);
    }
    Ok(engine)
}

/// Default output path: `<invoice stem>_matched.csv` beside the invoice.
pub fn default_output_path(invoice: &Path) -> PathBuf {
    let stem = invoice
        .file_stem()
        .map_or_else(|| "invoice".to_string(), |s| s.to_string_lossy().into_owned());
    invoice.with_file_name(format!("{stem}_matched.csv"))
}

/// Lines a reviewer should look at, lowest score first.
pub fn review_queue(results: &[MatchResult], limit: usize) -> Vec<&MatchResult> {
    let mut queue: Vec<&MatchResult> = results
        .iter()
        .filter(|result| result.tier != Tier::AutoOk)
        .collect();
    queue.sort_by(|a, b| a.final_score.total_cmp(&b.final_score));
    queue.truncate(limit);
    for result in &queue {
        trace!(
            item = redact_value(&result.invoice_line.raw_item_name),
            score = result.final_score,
            tier = result.tier.as_str(),
            "queued for review"
        );
    }
    queue
}
