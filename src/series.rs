use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::topics::Mode;

/// One ongoing serialized content thread. Created on first encounter of its
/// key, advanced only after a full pipeline run for a part succeeds, never
/// deleted by the pipeline itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub seed: String,
    pub mode: Mode,
    pub next_part: u32,
    pub parts_per_series: u32,
}

impl SeriesRecord {
    /// A series past its ceiling produces no further topics.
    pub fn is_exhausted(&self) -> bool {
        self.next_part > self.parts_per_series
    }
}

#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct SeriesState {
    series: BTreeMap<String, SeriesRecord>,
}

/// Identity key of a series record.
pub fn series_key(mode: Mode, seed: &str) -> String {
    format!("{}:{}", mode, seed.trim())
}

/// JSON-backed store of every known series, single-writer per run.
#[derive(Debug)]
pub struct SeriesStore {
    path: PathBuf,
    state: SeriesState,
}

impl SeriesStore {
    /// Read the store from disk. A missing or unparsable file yields an
    /// empty store; progress loss on read is tolerable, a crash is not.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(state) => state,
                Err(e) => {
                    warn!(
                        "Series state file {} is unparsable ({}), starting empty",
                        path.display(),
                        e
                    );
                    SeriesState::default()
                }
            },
            Err(_) => SeriesState::default(),
        };
        Self { path, state }
    }

    /// Persist the full mapping atomically: write a temp file next to the
    /// target, then replace. A half-written state file must never be
    /// observable.
    pub fn save(&self) -> anyhow::Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent)?;
        let mut tmp = NamedTempFile::new_in(&parent)?;
        tmp.write_all(serde_json::to_string_pretty(&self.state)?.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&SeriesRecord> {
        self.state.series.get(key)
    }

    /// Idempotent: inserts a fresh record at part 1, or leaves an existing
    /// key completely untouched (its `parts_per_series` included).
    pub fn ensure(&mut self, seed: &str, mode: Mode, parts_per_series: u32) {
        let key = series_key(mode, seed);
        self.state
            .series
            .entry(key)
            .or_insert_with(|| SeriesRecord {
                seed: seed.trim().to_string(),
                mode,
                next_part: 1,
                parts_per_series,
            });
    }

    /// Bump a series to its next part and persist. Unknown keys are a
    /// silent no-op; callers should never pass one, but an unknown key must
    /// not crash the run.
    pub fn advance(&mut self, key: &str) -> anyhow::Result<()> {
        match self.state.series.get_mut(key) {
            Some(record) => {
                record.next_part += 1;
                self.save()
            }
            None => {
                debug!("advance called for unknown series key '{}'", key);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeriesStore::load(dir.path().join("absent.json"));
        assert!(store.get("funny_texts:anything").is_none());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.json");
        fs::write(&path, "{not json at all").unwrap();
        let store = SeriesStore::load(&path);
        assert!(store.get("mixed:x").is_none());
    }

    #[test]
    fn ensure_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SeriesStore::load(dir.path().join("series.json"));
        store.ensure("X", Mode::FunnyTexts, 2);
        store.advance("funny_texts:X").unwrap();
        // A second ensure with a different ceiling changes nothing.
        store.ensure("X", Mode::FunnyTexts, 99);
        let record = store.get("funny_texts:X").unwrap();
        assert_eq!(record.next_part, 2);
        assert_eq!(record.parts_per_series, 2);
    }

    #[test]
    fn advance_unknown_key_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.json");
        let mut store = SeriesStore::load(&path);
        store.advance("mixed:never-seen").unwrap();
        assert!(store.get("mixed:never-seen").is_none());
        // Nothing was persisted either.
        assert!(!path.exists());
    }

    #[test]
    fn advance_increments_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.json");
        let mut store = SeriesStore::load(&path);
        store.ensure("deep cave expedition", Mode::VoxelStory, 5);
        store.advance("voxel_story:deep cave expedition").unwrap();

        let reloaded = SeriesStore::load(&path);
        let record = reloaded.get("voxel_story:deep cave expedition").unwrap();
        assert_eq!(record.next_part, 2);
        assert_eq!(record.parts_per_series, 5);
        assert_eq!(record.mode, Mode::VoxelStory);
    }

    #[test]
    fn save_load_is_a_fixed_point() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("series.json");
        let mut store = SeriesStore::load(&path);
        store.ensure("a", Mode::SpookyStory, 3);
        store.ensure("b", Mode::SpookyStory, 7);
        store.save().unwrap();

        let reloaded = SeriesStore::load(&path);
        reloaded.save().unwrap();
        let first = fs::read_to_string(&path).unwrap();
        let again = SeriesStore::load(&path);
        assert_eq!(again.state, store.state);
        again.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn save_leaves_no_temp_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.json");
        let mut store = SeriesStore::load(&path);
        store.ensure("a", Mode::Mixed, 2);
        store.save().unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn state_file_shape_matches_contract() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.json");
        let mut store = SeriesStore::load(&path);
        store.ensure("X", Mode::FunnyTexts, 2);
        store.save().unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let record = &value["series"]["funny_texts:X"];
        assert_eq!(record["seed"], "X");
        assert_eq!(record["mode"], "funny_texts");
        assert_eq!(record["next_part"], 1);
        assert_eq!(record["parts_per_series"], 2);
    }
}
