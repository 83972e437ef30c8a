//! Contract recorder.
//!
//! Collects verified interactions per consumer/provider pair and persists them
//! as contract files. A recorder is an explicit value owned by the test that
//! uses it; recorders from different tests meet only in [`ContractRecorder::merge`]
//! or on disk, where [`WriteMode::Merge`] deduplicates by interaction identity.
//!
//! Written files list interactions in identity order, so the same set of
//! interactions always produces the same bytes whichever test persists first.

use crate::contract::{Contract, RecordedInteraction};
use crate::error::{PactError, PactResult};
use crate::interaction::Interaction;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

/// Serializes contract file writes within the process.
static WRITE_LOCK: Mutex<()> = Mutex::new(());

/// Distinguishes temporary files of successive writes within the process.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// How [`ContractRecorder::persist`] treats an existing contract file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Keep existing interactions and add new identities.
    ///
    /// Interactions removed from the tests stay in the file; start from an
    /// empty directory (or use [`WriteMode::Overwrite`]) to drop them.
    #[default]
    Merge,
    /// Replace the file with this recorder's interactions
    Overwrite,
}

/// Accumulates verified interactions, one contract per consumer/provider pair.
#[derive(Debug, Clone, Default)]
pub struct ContractRecorder {
    contracts: BTreeMap<(String, String), Contract>,
}

impl ContractRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a verified interaction.
    ///
    /// Returns `false` if an interaction with the same identity is already recorded.
    pub fn record(&mut self, interaction: &Interaction) -> bool {
        let added = self.insert(
            &interaction.consumer,
            &interaction.provider,
            RecordedInteraction::from(interaction),
        );
        debug!(
            consumer = %interaction.consumer,
            provider = %interaction.provider,
            description = %interaction.description,
            added,
            "interaction recorded"
        );
        added
    }

    fn insert(&mut self, consumer: &str, provider: &str, interaction: RecordedInteraction) -> bool {
        self.contracts
            .entry((consumer.to_string(), provider.to_string()))
            .or_insert_with(|| Contract::new(consumer, provider))
            .add(interaction)
    }

    /// Contract for a consumer/provider pair, if anything was recorded for it.
    #[must_use]
    pub fn contract(&self, consumer: &str, provider: &str) -> Option<&Contract> {
        self.contracts
            .get(&(consumer.to_string(), provider.to_string()))
    }

    /// All contracts, ordered by consumer then provider.
    pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
        self.contracts.values()
    }

    /// Fold another recorder into this one.
    ///
    /// Returns the number of interactions that were new.
    pub fn merge(&mut self, other: Self) -> usize {
        let mut added = 0;
        for ((consumer, provider), contract) in other.contracts {
            for interaction in contract.interactions {
                if self.insert(&consumer, &provider, interaction) {
                    added += 1;
                }
            }
        }
        added
    }

    /// Total number of recorded interactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts
            .values()
            .map(|contract| contract.interactions.len())
            .sum()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write every contract to `{dir}/{consumer}-{provider}.json`.
    ///
    /// Interactions are written in identity order (description, state name,
    /// parameters). Returns the written paths.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::ContractFile`] on I/O failure and
    /// [`PactError::Serialization`] if an existing file is not a valid contract.
    pub fn persist(&self, dir: &Path, mode: WriteMode) -> PactResult<Vec<PathBuf>> {
        let _guard = WRITE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

        std::fs::create_dir_all(dir).map_err(|source| PactError::ContractFile {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut written = Vec::with_capacity(self.contracts.len());
        for contract in self.contracts.values() {
            let path = dir.join(contract.file_name());
            let mut merged = match mode {
                WriteMode::Merge if path.exists() => {
                    let mut existing = Contract::load(&path)?;
                    for interaction in &contract.interactions {
                        existing.add(interaction.clone());
                    }
                    existing
                }
                WriteMode::Merge | WriteMode::Overwrite => contract.clone(),
            };
            merged.sort_by_identity();

            write_atomically(&path, &merged.to_json_pretty()?)?;
            info!(
                path = %path.display(),
                interactions = merged.interactions.len(),
                "contract written"
            );
            written.push(path);
        }
        Ok(written)
    }
}

/// Write to a unique sibling temp file, then rename over `path`.
fn write_atomically(path: &Path, contents: &str) -> PactResult<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("contract.json");
    let tmp = path.with_file_name(format!(
        ".{file_name}.tmp-{}-{}",
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let result = std::fs::write(&tmp, contents).and_then(|()| std::fs::rename(&tmp, path));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result.map_err(|source| PactError::ContractFile {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{RequestMatcher, ResponseMatcher};
    use crate::state::ProviderState;

    fn interaction(provider: &str, id: &str) -> Interaction {
        Interaction::builder("consumer", provider)
            .given(
                ProviderState::new("A task with task id ${task-id} is present")
                    .with_param("task-id", id),
            )
            .upon_receiving("A GET request for a task")
            .with_request(RequestMatcher::get(format!("/api/task/{id}")))
            .will_respond_with(ResponseMatcher::status(200))
            .build()
            .unwrap()
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut recorder = ContractRecorder::new();
        assert!(recorder.record(&interaction("tasks", "1")));
        assert!(!recorder.record(&interaction("tasks", "1")));
        assert!(recorder.record(&interaction("tasks", "2")));
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn test_contracts_are_split_by_provider() {
        let mut recorder = ContractRecorder::new();
        recorder.record(&interaction("tasks", "1"));
        recorder.record(&interaction("users", "1"));
        assert_eq!(recorder.contracts().count(), 2);
        assert!(recorder.contract("consumer", "tasks").is_some());
        assert!(recorder.contract("consumer", "nobody").is_none());
    }

    #[test]
    fn test_merge_counts_new_identities() {
        let mut left = ContractRecorder::new();
        left.record(&interaction("tasks", "1"));

        let mut right = ContractRecorder::new();
        right.record(&interaction("tasks", "1"));
        right.record(&interaction("tasks", "2"));

        assert_eq!(left.merge(right), 1);
        assert_eq!(left.len(), 2);
    }

    fn task_ids(path: &Path) -> Vec<String> {
        Contract::load(path)
            .unwrap()
            .interactions
            .iter()
            .map(|i| i.provider_state.params["task-id"].clone())
            .collect()
    }

    #[test]
    fn test_persist_merge_writes_identity_order() {
        let dir = tempfile::tempdir().unwrap();

        let mut first = ContractRecorder::new();
        first.record(&interaction("tasks", "2"));
        first.persist(dir.path(), WriteMode::Merge).unwrap();

        let mut second = ContractRecorder::new();
        second.record(&interaction("tasks", "3"));
        second.record(&interaction("tasks", "1"));
        let paths = second.persist(dir.path(), WriteMode::Merge).unwrap();

        assert_eq!(task_ids(&paths[0]), vec!["1", "2", "3"]);
        assert!(paths[0].ends_with("consumer-tasks.json"));
    }

    #[test]
    fn test_persist_is_independent_of_test_order() {
        let forward = tempfile::tempdir().unwrap();
        let backward = tempfile::tempdir().unwrap();

        for id in ["1", "2"] {
            let mut recorder = ContractRecorder::new();
            recorder.record(&interaction("tasks", id));
            recorder.persist(forward.path(), WriteMode::Merge).unwrap();
        }
        for id in ["2", "1"] {
            let mut recorder = ContractRecorder::new();
            recorder.record(&interaction("tasks", id));
            recorder.persist(backward.path(), WriteMode::Merge).unwrap();
        }

        let file = "consumer-tasks.json";
        let forward_bytes = std::fs::read(forward.path().join(file)).unwrap();
        let backward_bytes = std::fs::read(backward.path().join(file)).unwrap();
        assert_eq!(forward_bytes, backward_bytes);
    }

    #[test]
    fn test_persist_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = ContractRecorder::new();
        recorder.record(&interaction("tasks", "1"));
        recorder.record(&interaction("users", "1"));
        recorder.persist(dir.path(), WriteMode::Merge).unwrap();
        recorder.persist(dir.path(), WriteMode::Merge).unwrap();

        let mut names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["consumer-tasks.json", "consumer-users.json"]);
    }

    #[test]
    fn test_persist_overwrite_replaces_file() {
        let dir = tempfile::tempdir().unwrap();

        let mut first = ContractRecorder::new();
        first.record(&interaction("tasks", "1"));
        first.persist(dir.path(), WriteMode::Overwrite).unwrap();

        let mut second = ContractRecorder::new();
        second.record(&interaction("tasks", "2"));
        let paths = second.persist(dir.path(), WriteMode::Overwrite).unwrap();

        let contract = Contract::load(&paths[0]).unwrap();
        assert_eq!(contract.interactions.len(), 1);
        assert_eq!(contract.interactions[0].request.path, "/api/task/2");
    }

    #[test]
    fn test_persist_overwrite_drops_stale_interactions() {
        let dir = tempfile::tempdir().unwrap();

        let mut previous_run = ContractRecorder::new();
        previous_run.record(&interaction("tasks", "1"));
        previous_run.record(&interaction("tasks", "2"));
        previous_run.persist(dir.path(), WriteMode::Merge).unwrap();

        let mut current_run = ContractRecorder::new();
        current_run.record(&interaction("tasks", "1"));
        let paths = current_run.persist(dir.path(), WriteMode::Overwrite).unwrap();

        assert_eq!(task_ids(&paths[0]), vec!["1"]);
    }

    #[test]
    fn test_empty_recorder_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ContractRecorder::new();
        assert!(recorder.is_empty());
        assert!(recorder.persist(dir.path(), WriteMode::Merge).unwrap().is_empty());
    }
}
