//! The learning store: event log, projection and optional journal.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use pharm_model::{ItemId, LearnedMapping, PatternKey};
use serde::{Deserialize, Serialize};

use crate::error::{LearnError, Result};
use crate::event::{CorrectionAudit, EventKind, LearningEvent};
use crate::policy::LearningPolicy;
use crate::projection::{Applied, Projection};

/// Read/write contract the matching engine relies on.
///
/// Implementations must be safe to share across worker threads. Writes for
/// the same key must be serialized so that conflict resolution stays
/// deterministic.
pub trait MappingStore: Send + Sync {
    /// Active mapping for `key`, if any.
    fn lookup(&self, key: &PatternKey) -> Result<Option<LearnedMapping>>;

    /// Note that the active mapping for `key` answered a lookup.
    fn record_seen(&self, key: &PatternKey, item_id: &ItemId) -> Result<()>;

    /// Record a correction and return the active mapping afterwards.
    fn record_correction(
        &self,
        key: &PatternKey,
        item_id: &ItemId,
        confirmed_by_human: bool,
        audit: CorrectionAudit,
    ) -> Result<LearnedMapping>;

    /// Active mapping of every key.
    fn export_all(&self) -> Result<Vec<LearnedMapping>>;
}

/// Summary counters of a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_mappings: usize,
    /// Active mappings whose confidence reaches the given threshold.
    pub trusted_mappings: usize,
    pub total_corrections: usize,
    pub human_corrections: usize,
    pub total_events: usize,
    pub last_correction: Option<DateTime<Utc>>,
}

/// Full export: current mappings plus the audit history behind them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreExport {
    pub exported_at: DateTime<Utc>,
    pub policy: LearningPolicy,
    pub mappings: Vec<LearnedMapping>,
    pub history: Vec<LearningEvent>,
}

struct Journal {
    path: PathBuf,
    file: File,
    /// Bytes of complete lines; a failed append is cut back to this.
    len: u64,
}

impl Journal {
    /// One `write_all` per event so a crash can only tear the final line.
    fn append(&mut self, event: &LearningEvent) -> Result<()> {
        let mut line =
            serde_json::to_vec(event).map_err(|source| LearnError::Serialization { source })?;
        line.push(b'\n');
        if let Err(source) = self.file.write_all(&line).and_then(|()| self.file.flush()) {
            if let Err(error) = self.file.set_len(self.len) {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %error,
                    "failed to cut back partial journal line"
                );
            }
            return Err(LearnError::Io {
                operation: "append to",
                path: self.path.clone(),
                source,
            });
        }
        self.len += line.len() as u64;
        Ok(())
    }
}

struct State {
    events: Vec<LearningEvent>,
    projection: Projection,
    journal: Option<Journal>,
}

impl State {
    fn next_sequence(&self) -> u64 {
        self.events.last().map_or(1, |event| event.sequence + 1)
    }

    /// Journal first, then log and projection, so a failed write leaves the
    /// in-memory state untouched.
    fn append(&mut self, pattern_key: &PatternKey, kind: EventKind) -> Result<Applied> {
        let event = LearningEvent {
            sequence: self.next_sequence(),
            at: Utc::now(),
            pattern_key: pattern_key.clone(),
            kind,
        };
        if let Some(journal) = self.journal.as_mut() {
            journal.append(&event)?;
        }
        let applied = self.projection.apply(&event);
        self.events.push(event);
        Ok(applied)
    }
}

/// Append-only learning store with a single-writer lock.
pub struct LearningStore {
    policy: LearningPolicy,
    state: RwLock<State>,
}

impl LearningStore {
    /// Store that lives only for this process.
    pub fn in_memory(policy: LearningPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self::from_parts(policy, Vec::new(), None))
    }

    /// Rebuild a store from an existing event history.
    pub fn from_events(policy: LearningPolicy, events: Vec<LearningEvent>) -> Result<Self> {
        policy.validate()?;
        Ok(Self::from_parts(policy, events, None))
    }

    /// Open (or create) a JSON-lines journal and replay it.
    pub fn open(path: &Path, policy: LearningPolicy) -> Result<Self> {
        policy.validate()?;
        let replay = if path.exists() {
            read_journal(path)?
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|source| LearnError::Io {
                    operation: "create directory",
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            Replay::default()
        };
        let io_error = |operation: &'static str| {
            move |source| LearnError::Io {
                operation,
                path: path.to_path_buf(),
                source,
            }
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_error("open"))?;
        if replay.torn {
            file.set_len(replay.valid_len).map_err(io_error("truncate"))?;
        }
        if replay.needs_newline {
            file.write_all(b"\n").map_err(io_error("append to"))?;
        }
        let len = file.metadata().map_err(io_error("stat"))?.len();
        let store = Self::from_parts(
            policy,
            replay.events,
            Some(Journal {
                path: path.to_path_buf(),
                file,
                len,
            }),
        );
        tracing::info!(
            path = %path.display(),
            events = store.event_count(),
            "opened learning journal"
        );
        Ok(store)
    }

    fn from_parts(
        policy: LearningPolicy,
        events: Vec<LearningEvent>,
        journal: Option<Journal>,
    ) -> Self {
        let projection = Projection::replay(&events);
        Self {
            policy,
            state: RwLock::new(State {
                events,
                projection,
                journal,
            }),
        }
    }

    pub fn policy(&self) -> &LearningPolicy {
        &self.policy
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| LearnError::poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| LearnError::poisoned())
    }

    /// Number of events in the log (0 if the store is unavailable).
    pub fn event_count(&self) -> usize {
        self.read().map_or(0, |state| state.events.len())
    }

    /// Every event recorded for `key`, oldest first.
    pub fn history(&self, key: &PatternKey) -> Result<Vec<LearningEvent>> {
        let state = self.read()?;
        Ok(state
            .events
            .iter()
            .filter(|event| &event.pattern_key == key)
            .cloned()
            .collect())
    }

    /// The complete log, oldest first.
    pub fn events(&self) -> Result<Vec<LearningEvent>> {
        Ok(self.read()?.events.clone())
    }

    /// Remove the mapping for `key`. The history keeps the deletion.
    ///
    /// Returns whether a mapping existed.
    pub fn delete(&self, key: &PatternKey, reason: Option<String>) -> Result<bool> {
        let mut state = self.write()?;
        if state.projection.active(key, &self.policy).is_none() {
            return Ok(false);
        }
        state.append(key, EventKind::Deleted { reason })?;
        tracing::info!(pattern_key = %key, "deleted learned mapping");
        Ok(true)
    }

    pub fn stats(&self, learning_threshold: f64) -> Result<StoreStats> {
        let state = self.read()?;
        let mappings = state.projection.active_mappings(&self.policy);
        let corrections = state.events.iter().filter_map(|event| match &event.kind {
            EventKind::Correction {
                confirmed_by_human, ..
            } => Some((event.at, *confirmed_by_human)),
            _ => None,
        });
        let (mut total_corrections, mut human_corrections, mut last_correction) = (0, 0, None);
        for (at, human) in corrections {
            total_corrections += 1;
            human_corrections += usize::from(human);
            last_correction = Some(at);
        }
        Ok(StoreStats {
            total_mappings: mappings.len(),
            trusted_mappings: mappings
                .iter()
                .filter(|mapping| mapping.confidence >= learning_threshold)
                .count(),
            total_corrections,
            human_corrections,
            total_events: state.events.len(),
            last_correction,
        })
    }

    pub fn snapshot(&self) -> Result<StoreExport> {
        let state = self.read()?;
        Ok(StoreExport {
            exported_at: Utc::now(),
            policy: self.policy,
            mappings: state.projection.active_mappings(&self.policy),
            history: state.events.clone(),
        })
    }

    /// Write a full export as pretty JSON.
    ///
    /// Uses atomic write (temp file + rename) so a crash never leaves a
    /// half-written export behind.
    pub fn export_to(&self, path: &Path) -> Result<StoreExport> {
        let export = self.snapshot()?;
        let bytes = serde_json::to_vec_pretty(&export)
            .map_err(|source| LearnError::Serialization { source })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LearnError::Io {
                operation: "create directory",
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let temp_path = path.with_extension("json.tmp");
        let mut file = File::create(&temp_path).map_err(|source| LearnError::Io {
            operation: "create",
            path: temp_path.clone(),
            source,
        })?;
        file.write_all(&bytes).map_err(|source| LearnError::Io {
            operation: "write",
            path: temp_path.clone(),
            source,
        })?;
        file.sync_all().map_err(|source| LearnError::Io {
            operation: "sync",
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, path).map_err(|source| LearnError::AtomicWriteFailed {
            temp_path: temp_path.clone(),
            target_path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(
            path = %path.display(),
            mappings = export.mappings.len(),
            events = export.history.len(),
            "exported learning store"
        );
        Ok(export)
    }
}

impl MappingStore for LearningStore {
    fn lookup(&self, key: &PatternKey) -> Result<Option<LearnedMapping>> {
        Ok(self.read()?.projection.active(key, &self.policy))
    }

    fn record_seen(&self, key: &PatternKey, item_id: &ItemId) -> Result<()> {
        let mut state = self.write()?;
        state.append(
            key,
            EventKind::Seen {
                item_id: item_id.clone(),
            },
        )?;
        Ok(())
    }

    fn record_correction(
        &self,
        key: &PatternKey,
        item_id: &ItemId,
        confirmed_by_human: bool,
        audit: CorrectionAudit,
    ) -> Result<LearnedMapping> {
        let mut state = self.write()?;
        let applied = state.append(
            key,
            EventKind::Correction {
                item_id: item_id.clone(),
                confirmed_by_human,
                audit,
            },
        )?;
        match &applied {
            Applied::Conflict { active, corrected } => tracing::warn!(
                pattern_key = %key,
                active = %active,
                corrected = %corrected,
                "conflicting correction kept as inactive variant"
            ),
            Applied::Superseded { previous } => tracing::warn!(
                pattern_key = %key,
                previous = %previous,
                item_id = %item_id,
                "correction replaced the active mapping"
            ),
            _ => tracing::debug!(
                pattern_key = %key,
                item_id = %item_id,
                confirmed_by_human,
                "recorded correction"
            ),
        }
        state
            .projection
            .active(key, &self.policy)
            .ok_or_else(|| LearnError::Unavailable {
                reason: format!("no active mapping for {key} after correction"),
            })
    }

    fn export_all(&self) -> Result<Vec<LearnedMapping>> {
        Ok(self.read()?.projection.active_mappings(&self.policy))
    }
}

/// Stand-in for a store that could not be opened.
///
/// Every call fails with [`LearnError::Unavailable`], so matching falls back
/// to scoring and marks the learning step as skipped.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> LearnError {
        LearnError::Unavailable {
            reason: self.reason.clone(),
        }
    }
}

impl MappingStore for UnavailableStore {
    fn lookup(&self, _key: &PatternKey) -> Result<Option<LearnedMapping>> {
        Err(self.error())
    }

    fn record_seen(&self, _key: &PatternKey, _item_id: &ItemId) -> Result<()> {
        Err(self.error())
    }

    fn record_correction(
        &self,
        _key: &PatternKey,
        _item_id: &ItemId,
        _confirmed_by_human: bool,
        _audit: CorrectionAudit,
    ) -> Result<LearnedMapping> {
        Err(self.error())
    }

    fn export_all(&self) -> Result<Vec<LearnedMapping>> {
        Err(self.error())
    }
}

/// Events read back from a journal file.
#[derive(Default)]
struct Replay {
    events: Vec<LearningEvent>,
    /// Length of the intact prefix of the file.
    valid_len: u64,
    /// The last line was cut short by an interrupted write.
    torn: bool,
    /// The intact prefix ends without a line break.
    needs_newline: bool,
}

/// Every newline-terminated line must parse. An unterminated last line that
/// does not parse is an interrupted append and is dropped.
fn read_journal(path: &Path) -> Result<Replay> {
    let bytes = fs::read(path).map_err(|source| LearnError::Io {
        operation: "read",
        path: path.to_path_buf(),
        source,
    })?;
    let mut events = Vec::new();
    let mut offset = 0usize;
    for (idx, segment) in bytes.split_inclusive(|byte| *byte == b'\n').enumerate() {
        let start = offset;
        offset += segment.len();
        let text = segment.trim_ascii();
        if text.is_empty() {
            continue;
        }
        match serde_json::from_slice::<LearningEvent>(text) {
            Ok(event) => events.push(event),
            Err(source) if !segment.ends_with(b"\n") => {
                tracing::warn!(
                    path = %path.display(),
                    line = idx + 1,
                    dropped_bytes = segment.len(),
                    error = %source,
                    "dropping torn last journal line"
                );
                return Ok(Replay {
                    events,
                    valid_len: start as u64,
                    torn: true,
                    needs_newline: false,
                });
            }
            Err(source) => {
                return Err(LearnError::CorruptJournal {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    source,
                });
            }
        }
    }
    Ok(Replay {
        events,
        valid_len: bytes.len() as u64,
        torn: false,
        needs_newline: bytes.last().is_some_and(|byte| *byte != b'\n'),
    })
}
