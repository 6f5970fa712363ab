//! Replicates the CSV log into a keyed document store in fixed-size batches

use anyhow::Result;
use csv::StringRecord;
use std::collections::BTreeMap;
use tracing::info;

use crate::error::PanchangaError;
use crate::types::{PanchangaRecord, Region, COLUMNS};

pub const COLLECTION: &str = "panchanga_data";
pub const BATCH_SIZE: usize = 400;

/// One document per date; the date is the key and is not repeated as a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    pub key: String,
    pub fields: BTreeMap<String, String>,
}

/// A keyed store that applies a batch of full-document replacements at once
pub trait DocumentStore {
    fn commit(&mut self, collection: &str, batch: &[RemoteDocument]) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub documents: usize,
    pub batches: usize,
}

/// Assign canonical column names to a CSV row by position.
///
/// The stored header is never consulted. Only the column count is checked;
/// a row with the right width but a different column order is accepted as is.
pub fn canonicalize_schema(row: &StringRecord) -> Result<PanchangaRecord, PanchangaError> {
    if row.len() != COLUMNS.len() {
        return Err(PanchangaError::UnexpectedFieldCount {
            region: Region::CsvRow,
            expected: COLUMNS.len(),
            actual: row.len(),
        });
    }

    let field = |i: usize| row.get(i).unwrap_or_default().to_string();
    Ok(PanchangaRecord {
        date: field(0),
        samvastara: field(1),
        aayana: field(2),
        rutu: field(3),
        masa: field(4),
        paksha: field(5),
        tithi: field(6),
        vasara: field(7),
        nakshatra: field(8),
        yoga: field(9),
        karana: field(10),
        sunrise: field(11),
        sunset: field(12),
    })
}

pub fn to_document(record: &PanchangaRecord) -> RemoteDocument {
    let fields = record
        .columns()
        .iter()
        .skip(1)
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    RemoteDocument {
        key: record.date.clone(),
        fields,
    }
}

/// Upsert every record, committing after each `batch_size` rows and once more
/// for any remainder. Batches committed before a failure stay applied.
pub fn upload(
    records: &[PanchangaRecord],
    store: &mut dyn DocumentStore,
    collection: &str,
    batch_size: usize,
) -> Result<UploadSummary, PanchangaError> {
    let batch_size = batch_size.max(1);
    info!("Starting upload of {} cleaned records...", records.len());

    let mut batch: Vec<RemoteDocument> = Vec::with_capacity(batch_size);
    let mut committed = 0usize;
    let mut count = 0usize;

    for record in records {
        batch.push(to_document(record));
        count += 1;

        if count % batch_size == 0 {
            commit_batch(store, collection, &mut batch, &mut committed)?;
            info!("Uploaded {} records...", count);
        }
    }

    if !batch.is_empty() {
        commit_batch(store, collection, &mut batch, &mut committed)?;
    }

    info!(
        documents = count,
        batches = committed,
        "upload complete"
    );
    Ok(UploadSummary {
        documents: count,
        batches: committed,
    })
}

fn commit_batch(
    store: &mut dyn DocumentStore,
    collection: &str,
    batch: &mut Vec<RemoteDocument>,
    committed: &mut usize,
) -> Result<(), PanchangaError> {
    store
        .commit(collection, batch)
        .map_err(|source| PanchangaError::Persistence {
            committed_batches: *committed,
            source,
        })?;
    *committed += 1;
    batch.clear();
    Ok(())
}

/// Canonicalize every CSV row and upload the result
pub fn upload_rows(
    rows: &[StringRecord],
    store: &mut dyn DocumentStore,
    collection: &str,
    batch_size: usize,
) -> Result<UploadSummary> {
    let records = rows
        .iter()
        .map(canonicalize_schema)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(upload(&records, store, collection, batch_size)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    /// Records every committed batch; optionally fails on the nth commit
    #[derive(Default)]
    struct RecordingStore {
        commits: Vec<Vec<RemoteDocument>>,
        fail_on: Option<usize>,
    }

    impl DocumentStore for RecordingStore {
        fn commit(&mut self, collection: &str, batch: &[RemoteDocument]) -> Result<()> {
            assert_eq!(collection, COLLECTION);
            if self.fail_on == Some(self.commits.len()) {
                bail!("quota exceeded");
            }
            self.commits.push(batch.to_vec());
            Ok(())
        }
    }

    fn row(date: &str) -> StringRecord {
        StringRecord::from(vec![
            date,
            "Vishwavasu",
            "Dakshinayana",
            "Hemanta",
            "Pushya",
            "Shukla",
            "Trayodashi",
            "Guruvasara",
            "Rohini",
            "Shubha",
            "Kaulava",
            "6:49 am",
            "6:10 pm",
        ])
    }

    fn rows(n: usize) -> Vec<StringRecord> {
        (0..n).map(|i| row(&format!("day-{:04}", i))).collect()
    }

    #[test]
    fn test_canonicalize_schema() {
        let record = canonicalize_schema(&row("2026-01-01")).unwrap();
        assert_eq!(record.date, "2026-01-01");
        assert_eq!(record.vasara, "Guruvasara");
        assert_eq!(record.sunrise, "6:49 am");
        assert_eq!(record.sunset, "6:10 pm");
    }

    #[test]
    fn test_canonicalize_schema_wrong_width() {
        let short = StringRecord::from(vec!["2026-01-01", "Vishwavasu"]);
        let err = canonicalize_schema(&short).unwrap_err();
        assert!(matches!(
            err,
            PanchangaError::UnexpectedFieldCount {
                region: Region::CsvRow,
                expected: 13,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_to_document_excludes_key() {
        let record = canonicalize_schema(&row("2026-01-01")).unwrap();
        let doc = to_document(&record);
        assert_eq!(doc.key, "2026-01-01");
        assert_eq!(doc.fields.len(), 12);
        assert!(!doc.fields.contains_key("date"));
        assert_eq!(doc.fields["tithi"], "Trayodashi");
        assert_eq!(doc.fields["sunrise"], "6:49 am");
    }

    #[test]
    fn test_upload_one_document_per_row() {
        let mut store = RecordingStore::default();
        let summary = upload_rows(&rows(3), &mut store, COLLECTION, BATCH_SIZE).unwrap();
        assert_eq!(summary, UploadSummary { documents: 3, batches: 1 });
        assert_eq!(store.commits.len(), 1);
        let keys: Vec<&str> = store.commits[0].iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["day-0000", "day-0001", "day-0002"]);
    }

    #[test]
    fn test_upload_batching() {
        for (n, expected_batches, last_len) in [
            (1, 1, 1),
            (399, 1, 399),
            (400, 1, 400),
            (401, 2, 1),
            (800, 2, 400),
            (1001, 3, 201),
        ] {
            let mut store = RecordingStore::default();
            let summary = upload_rows(&rows(n), &mut store, COLLECTION, BATCH_SIZE).unwrap();
            assert_eq!(summary.documents, n);
            assert_eq!(summary.batches, expected_batches, "n = {}", n);
            assert_eq!(store.commits.len(), expected_batches, "n = {}", n);
            assert_eq!(store.commits.last().unwrap().len(), last_len, "n = {}", n);
            assert!(store.commits.iter().all(|b| b.len() <= BATCH_SIZE));
        }
    }

    #[test]
    fn test_upload_empty_issues_no_commit() {
        let mut store = RecordingStore::default();
        let summary = upload_rows(&[], &mut store, COLLECTION, BATCH_SIZE).unwrap();
        assert_eq!(summary, UploadSummary { documents: 0, batches: 0 });
        assert!(store.commits.is_empty());
    }

    #[test]
    fn test_upload_reports_committed_batches_on_failure() {
        let mut store = RecordingStore {
            fail_on: Some(2),
            ..Default::default()
        };
        let err = upload_rows(&rows(1000), &mut store, COLLECTION, BATCH_SIZE).unwrap_err();
        match err.downcast_ref::<PanchangaError>() {
            Some(PanchangaError::Persistence {
                committed_batches, ..
            }) => assert_eq!(*committed_batches, 2),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.commits.len(), 2);
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_upload_is_repeatable() {
        let mut first = RecordingStore::default();
        let mut second = RecordingStore::default();
        upload_rows(&rows(5), &mut first, COLLECTION, BATCH_SIZE).unwrap();
        upload_rows(&rows(5), &mut second, COLLECTION, BATCH_SIZE).unwrap();
        assert_eq!(first.commits, second.commits);
    }
}
