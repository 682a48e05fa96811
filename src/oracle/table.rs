use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::error::OracleError;
use crate::table::parse_table;
use crate::types::{SegmentCandidate, Transcript};

use super::SelectionOracle;

/// Reads candidates from a curated segment table on disk. Row order, file
/// names and overlaps are left for the normalizer to sort out.
#[derive(Debug, Clone)]
pub struct TableOracle {
    path: PathBuf,
}

impl TableOracle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SelectionOracle for TableOracle {
    fn name(&self) -> &str {
        "table"
    }

    async fn select(
        &self,
        _transcript: &Transcript,
    ) -> Result<Vec<SegmentCandidate>, OracleError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let rows = parse_table(&raw).map_err(|err| {
            OracleError::BadOutput(format!("{}: {}", self.path.display(), err))
        })?;
        debug!(path = %self.path.display(), rows = rows.len(), "loaded curated table");
        Ok(rows.iter().map(|row| row.to_candidate()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Timestamp;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reads_rows_as_candidates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("picks.csv");
        fs::write(
            &path,
            "from_timestamp,to_timestamp,file,short_description\n00:02:00,00:03:00,x.mp4,later\n00:00:10,00:00:40,y.mp4,earlier\n",
        )
        .unwrap();

        let candidates = TableOracle::new(&path)
            .select(&Transcript::default())
            .await
            .unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].start, Timestamp::from_secs(10));
        assert_eq!(candidates[1].description, "earlier");
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let err = TableOracle::new(dir.path().join("absent.csv"))
            .select(&Transcript::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::Io(_)));
    }

    #[tokio::test]
    async fn garbage_table_is_bad_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("picks.csv");
        fs::write(&path, "not a table\n").unwrap();

        let err = TableOracle::new(&path)
            .select(&Transcript::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::BadOutput(_)));
    }
}
