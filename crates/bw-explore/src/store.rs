//! Durable overflow storage for frontier records.
//!
//! Records are keyed by a monotonically increasing id. The frontier only
//! ever needs "append a batch", "give me the newest N" and "forget these
//! ids", so that is the whole trait.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::frontier::PathRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: u64,
    pub val: PathRecord,
}

pub trait FrontierStore {
    /// Append records with consecutive ids, in order.
    fn insert_batch(&mut self, records: &[PathRecord]) -> Result<(), StoreError>;
    /// Newest `limit` records, highest id first.
    fn last(&self, limit: usize) -> Result<Vec<StoredRecord>, StoreError>;
    fn delete(&mut self, ids: &[u64]) -> Result<(), StoreError>;
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<u64, PathRecord>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrontierStore for MemoryStore {
    fn insert_batch(&mut self, records: &[PathRecord]) -> Result<(), StoreError> {
        for record in records {
            self.records.insert(self.next_id, record.clone());
            self.next_id += 1;
        }
        Ok(())
    }

    fn last(&self, limit: usize) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(self
            .records
            .iter()
            .rev()
            .take(limit)
            .map(|(id, val)| StoredRecord {
                id: *id,
                val: val.clone(),
            })
            .collect())
    }

    fn delete(&mut self, ids: &[u64]) -> Result<(), StoreError> {
        for id in ids {
            self.records.remove(id);
        }
        Ok(())
    }

    fn len(&self) -> u64 {
        self.records.len() as u64
    }
}

const SEGMENT_PREFIX: &str = "segment-";
const SEGMENT_EXTENSION: &str = "jsonl";
const TMP_EXTENSION: &str = "tmp";

#[derive(Debug)]
struct Segment {
    path: PathBuf,
    ids: Vec<u64>,
}

/// Directory of append-only JSON-lines segments, one per spilled batch.
///
/// Each segment is written to a temp file, synced, then renamed into place,
/// so a crash leaves either the whole batch or none of it. Reopening the
/// directory rebuilds the id index from the segments on disk.
#[derive(Debug)]
pub struct SegmentStore {
    dir: PathBuf,
    segments: BTreeMap<u64, Segment>,
    next_id: u64,
    live: u64,
}

impl SegmentStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Directory {
            path: dir.clone(),
            source,
        })?;

        let entries = fs::read_dir(&dir).map_err(|source| StoreError::Directory {
            path: dir.clone(),
            source,
        })?;

        let mut segments = BTreeMap::new();
        let mut next_id = 0u64;
        let mut live = 0u64;
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Directory {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            match path.extension().and_then(|ext| ext.to_str()) {
                Some(TMP_EXTENSION) => {
                    warn!(path = %path.display(), "removing incomplete segment");
                    fs::remove_file(&path)
                        .map_err(|source| StoreError::RemoveSegment { path, source })?;
                }
                Some(SEGMENT_EXTENSION) if is_segment_name(&path) => {
                    let ids = read_segment(&path)?
                        .into_iter()
                        .map(|record| record.id)
                        .collect::<Vec<_>>();
                    let (Some(first), Some(last)) = (ids.first(), ids.last()) else {
                        continue;
                    };
                    next_id = next_id.max(last + 1);
                    live += ids.len() as u64;
                    segments.insert(*first, Segment { path, ids });
                }
                _ => {}
            }
        }

        debug!(dir = %dir.display(), segments = segments.len(), live, "opened segment store");
        Ok(Self {
            dir,
            segments,
            next_id,
            live,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Remove the store directory and everything in it.
    pub fn destroy(self) -> Result<(), StoreError> {
        fs::remove_dir_all(&self.dir).map_err(|source| StoreError::Directory {
            path: self.dir.clone(),
            source,
        })
    }

    fn segment_path(&self, first_id: u64) -> PathBuf {
        self.dir.join(format!(
            "{}{:020}.{}",
            SEGMENT_PREFIX, first_id, SEGMENT_EXTENSION
        ))
    }
}

impl FrontierStore for SegmentStore {
    fn insert_batch(&mut self, records: &[PathRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let first_id = self.next_id;
        let stored = records
            .iter()
            .enumerate()
            .map(|(offset, record)| StoredRecord {
                id: first_id + offset as u64,
                val: record.clone(),
            })
            .collect::<Vec<_>>();
        let path = self.segment_path(first_id);
        write_segment(&path, &stored)?;

        let ids = stored.iter().map(|record| record.id).collect::<Vec<_>>();
        self.next_id += ids.len() as u64;
        self.live += ids.len() as u64;
        self.segments.insert(first_id, Segment { path, ids });
        Ok(())
    }

    fn last(&self, limit: usize) -> Result<Vec<StoredRecord>, StoreError> {
        let mut out = Vec::with_capacity(limit.min(self.live as usize));
        for segment in self.segments.values().rev() {
            if out.len() >= limit {
                break;
            }
            let records = read_segment(&segment.path)?;
            for record in records.into_iter().rev() {
                if out.len() >= limit {
                    break;
                }
                out.push(record);
            }
        }
        Ok(out)
    }

    fn delete(&mut self, ids: &[u64]) -> Result<(), StoreError> {
        let doomed = ids.iter().copied().collect::<BTreeSet<_>>();
        let touched = self
            .segments
            .iter()
            .filter(|(_, segment)| segment.ids.iter().any(|id| doomed.contains(id)))
            .map(|(first, _)| *first)
            .collect::<Vec<_>>();

        for first in touched {
            let Some(segment) = self.segments.remove(&first) else {
                continue;
            };
            let before = segment.ids.len();
            let remaining = read_segment(&segment.path)?
                .into_iter()
                .filter(|record| !doomed.contains(&record.id))
                .collect::<Vec<_>>();
            self.live -= (before - remaining.len()) as u64;

            if remaining.is_empty() {
                fs::remove_file(&segment.path).map_err(|source| StoreError::RemoveSegment {
                    path: segment.path.clone(),
                    source,
                })?;
                continue;
            }

            write_segment(&segment.path, &remaining)?;
            let ids = remaining.iter().map(|record| record.id).collect::<Vec<_>>();
            self.segments.insert(
                first,
                Segment {
                    path: segment.path,
                    ids,
                },
            );
        }
        Ok(())
    }

    fn len(&self) -> u64 {
        self.live
    }
}

fn is_segment_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(SEGMENT_PREFIX))
}

fn write_segment(path: &Path, records: &[StoredRecord]) -> Result<(), StoreError> {
    let mut buffer = Vec::new();
    for record in records {
        serde_json::to_writer(&mut buffer, record).map_err(StoreError::Encode)?;
        buffer.push(b'\n');
    }

    let tmp = path.with_extension(format!("{}.{}", SEGMENT_EXTENSION, TMP_EXTENSION));
    let write_error = |source: std::io::Error| StoreError::WriteSegment {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::create(&tmp).map_err(write_error)?;
    file.write_all(&buffer).map_err(write_error)?;
    file.sync_all().map_err(write_error)?;
    fs::rename(&tmp, path).map_err(write_error)
}

fn read_segment(path: &Path) -> Result<Vec<StoredRecord>, StoreError> {
    let raw = fs::read_to_string(path).map_err(|source| StoreError::ReadSegment {
        path: path.to_path_buf(),
        source,
    })?;
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| StoreError::CorruptRecord {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod store_tests {
    use super::*;
    use bw_core::StateBlob;

    fn record(tag: &str) -> PathRecord {
        PathRecord {
            state_blob: StateBlob::new(tag),
            path: vec![tag.to_string()],
            depth: 1,
        }
    }

    fn tags(records: &[StoredRecord]) -> Vec<String> {
        records
            .iter()
            .map(|record| record.val.state_blob.as_str().to_string())
            .collect()
    }

    #[test]
    fn memory_store_returns_newest_first() {
        let mut store = MemoryStore::new();
        store
            .insert_batch(&[record("a"), record("b"), record("c")])
            .expect("insert");
        let newest = store.last(2).expect("last");
        assert_eq!(tags(&newest), vec!["c", "b"]);
        assert_eq!(newest[0].id, 2);

        store.delete(&[2, 1]).expect("delete");
        assert_eq!(store.len(), 1);
        assert_eq!(tags(&store.last(5).expect("last")), vec!["a"]);
    }

    #[test]
    fn segment_store_spans_segments_and_rewrites_partial_deletes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SegmentStore::open(dir.path().join("frontier")).expect("open");
        store.insert_batch(&[record("a"), record("b")]).expect("insert");
        store
            .insert_batch(&[record("c"), record("d"), record("e")])
            .expect("insert");
        assert_eq!(store.len(), 5);
        assert_eq!(store.segment_count(), 2);

        let newest = store.last(4).expect("last");
        assert_eq!(tags(&newest), vec!["e", "d", "c", "b"]);

        let ids = newest.iter().map(|record| record.id).collect::<Vec<_>>();
        store.delete(&ids).expect("delete");
        assert_eq!(store.len(), 1);
        assert_eq!(store.segment_count(), 1);
        assert_eq!(tags(&store.last(10).expect("last")), vec!["a"]);
    }

    #[test]
    fn segment_store_reopens_from_disk_and_drops_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("frontier");
        {
            let mut store = SegmentStore::open(&root).expect("open");
            store.insert_batch(&[record("a"), record("b")]).expect("insert");
            store.delete(&[1]).expect("delete");
        }
        fs::write(root.join("segment-00000000000000000009.jsonl.tmp"), "partial")
            .expect("write stray temp");

        let mut reopened = SegmentStore::open(&root).expect("reopen");
        assert_eq!(reopened.len(), 1);
        assert!(!root.join("segment-00000000000000000009.jsonl.tmp").exists());

        reopened.insert_batch(&[record("c")]).expect("insert");
        let newest = reopened.last(1).expect("last");
        assert_eq!(newest[0].id, 1);
        assert_eq!(tags(&newest), vec!["c"]);

        reopened.destroy().expect("destroy");
        assert!(!root.exists());
    }

    #[test]
    fn corrupt_segment_line_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("segment-00000000000000000000.jsonl"),
            "{\"id\":0,\n",
        )
        .expect("write");
        let error = SegmentStore::open(dir.path()).expect_err("corrupt");
        assert!(matches!(error, StoreError::CorruptRecord { line: 1, .. }));
    }
}
