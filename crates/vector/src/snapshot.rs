//! Append-only JSONL catalogue of vector-store snapshots (spec.md §6
//! "Snapshot catalogue"), used by operators to audit when a qdrant
//! snapshot was taken and where it lives. Grounded on the teacher's
//! JSONL rollout-file pattern (`external_memory/codex_cli.rs`): one
//! record per line, appended, never rewritten in place.

use crate::error::{Result, VectorError};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

/// One row of the snapshot catalogue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotRecord {
    pub name: String,
    pub location: String,
    pub created_at: String,
    pub size_bytes: u64,
    pub recorded_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Appends [`SnapshotRecord`]s to a JSONL file, creating it if absent.
/// Each call opens, appends, and flushes independently; callers do not
/// hold the file open across suspension points.
pub struct SnapshotCatalogue {
    path: std::path::PathBuf,
}

impl SnapshotCatalogue {
    #[must_use]
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Serializes `record` to one JSON line and appends it to the
    /// catalogue file. A malformed existing file is not a concern here:
    /// this only ever appends, never parses the prior contents.
    pub async fn record(&self, record: &SnapshotRecord) -> Result<()> {
        let line = serde_json::to_string(record).map_err(|err| VectorError::Serialization(err.to_string()))?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|err| VectorError::Io(err.to_string()))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|err| VectorError::Io(err.to_string()))?;
        file.write_all(b"\n").await.map_err(|err| VectorError::Io(err.to_string()))?;
        file.flush().await.map_err(|err| VectorError::Io(err.to_string()))?;
        Ok(())
    }

    /// Reads and parses every record currently in the catalogue, in
    /// file order. Used by operator tooling and tests, not the hot
    /// query/ingest paths.
    pub async fn read_all(&self) -> Result<Vec<SnapshotRecord>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(VectorError::Io(err.to_string())),
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(|err| VectorError::Serialization(err.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> SnapshotRecord {
        SnapshotRecord {
            name: name.to_string(),
            location: format!("s3://chessmate-snapshots/{name}.snapshot"),
            created_at: "2026-07-27T00:00:00Z".to_string(),
            size_bytes: 4096,
            recorded_at: "2026-07-27T00:05:00Z".to_string(),
            note: None,
        }
    }

    #[tokio::test]
    async fn appends_and_reads_back_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.jsonl");
        let catalogue = SnapshotCatalogue::new(&path);

        catalogue.record(&record("games-2026-07-01")).await.unwrap();
        catalogue.record(&record("games-2026-07-15")).await.unwrap();

        let rows = catalogue.read_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "games-2026-07-01");
        assert_eq!(rows[1].name, "games-2026-07-15");
    }

    #[tokio::test]
    async fn read_all_on_missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.jsonl");
        let catalogue = SnapshotCatalogue::new(&path);
        assert_eq!(catalogue.read_all().await.unwrap(), Vec::new());
    }

    #[tokio::test]
    async fn note_field_round_trips_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.jsonl");
        let catalogue = SnapshotCatalogue::new(&path);

        let mut rec = record("with-note");
        rec.note = Some("pre-migration backup".to_string());
        catalogue.record(&rec).await.unwrap();

        let rows = catalogue.read_all().await.unwrap();
        assert_eq!(rows[0].note.as_deref(), Some("pre-migration backup"));
    }
}
