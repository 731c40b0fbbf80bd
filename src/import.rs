//! The upload loop.
//!
//! Rows are converted and handed to the [`Batcher`] in order. The first
//! failure ends the loop: no row after the batch holding the failing row is
//! converted or sent. Objects already flushed stay in the collection,
//! including the other rows of the failing batch that the service accepted.

use crate::batch::Batcher;
use crate::config::BatchConfig;
use crate::models::MovieRecord;
use crate::progress::{ImportProgressEvent, ImportProgressReporter};
use crate::weaviate::VectorStore;

/// Emit an uploading event every this many rows.
const PROGRESS_EVERY: usize = 500;

/// The row that stopped an import and why.
#[derive(Debug)]
pub struct ImportFailure {
    pub index: usize,
    pub error: anyhow::Error,
}

#[derive(Debug)]
pub struct UploadOutcome {
    pub total: usize,
    /// Rows converted and handed to the batched writer.
    pub submitted: usize,
    /// Objects the service accepted.
    pub stored: usize,
    pub requests: usize,
    pub failure: Option<ImportFailure>,
}

impl UploadOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Upload `records` into `class`, stopping at the first failure.
pub async fn upload_records(
    store: &dyn VectorStore,
    class: &str,
    config: &BatchConfig,
    records: &[MovieRecord],
    progress: &dyn ImportProgressReporter,
) -> UploadOutcome {
    let total = records.len();
    let mut batcher = Batcher::new(store, class, config);
    let mut submitted = 0;
    let mut failure = None;

    for (i, record) in records.iter().enumerate() {
        let object = match record.to_object() {
            Ok(object) => object,
            Err(error) => {
                failure = Some(ImportFailure { index: i, error });
                break;
            }
        };

        submitted += 1;
        if let Err(rejection) = batcher.add(i, object).await {
            failure = Some(ImportFailure {
                index: rejection.index,
                error: rejection.error,
            });
            break;
        }

        if (i + 1) % PROGRESS_EVERY == 0 || i + 1 == total {
            progress.report(ImportProgressEvent::Uploading {
                n: (i + 1) as u64,
                total: total as u64,
            });
        }
    }

    if failure.is_none() {
        if let Err(rejection) = batcher.flush().await {
            failure = Some(ImportFailure {
                index: rejection.index,
                error: rejection.error,
            });
        }
    }

    if let Some(f) = &failure {
        tracing::debug!(index = f.index, error = %f.error, "import stopped");
    }

    UploadOutcome {
        total,
        submitted,
        stored: batcher.stored(),
        requests: batcher.requests(),
        failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record;
    use crate::progress::NoProgress;
    use crate::weaviate::testing::MemoryStore;
    use std::sync::Mutex;

    fn records(n: usize) -> Vec<MovieRecord> {
        (0..n)
            .map(|i| record(&(i + 1).to_string(), &format!("Movie {}", i), 1980 + i as i32))
            .collect()
    }

    fn one_by_one() -> BatchConfig {
        BatchConfig {
            batch_size: 1,
            dynamic: false,
            ..BatchConfig::default()
        }
    }

    #[tokio::test]
    async fn uploads_everything_in_order() {
        let store = MemoryStore::new();
        let config = BatchConfig {
            batch_size: 4,
            dynamic: false,
            ..BatchConfig::default()
        };
        let outcome = upload_records(&store, "Movies", &config, &records(10), &NoProgress).await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.submitted, 10);
        assert_eq!(outcome.stored, 10);
        assert_eq!(store.requests(), vec![4, 4, 2]);
        let titles: Vec<String> = store
            .objects("Movies")
            .into_iter()
            .map(|o| o.title)
            .collect();
        assert_eq!(titles[0], "movie 0");
        assert_eq!(titles[9], "movie 9");
    }

    #[tokio::test]
    async fn stops_at_rejected_row() {
        for n in [0, 3, 7] {
            let store = MemoryStore::rejecting(n);
            let outcome =
                upload_records(&store, "Movies", &one_by_one(), &records(10), &NoProgress).await;

            let failure = outcome.failure.expect("import should stop");
            assert_eq!(failure.index, n);
            assert_eq!(outcome.stored, n);
            // nothing is sent after the failing row
            assert_eq!(store.submitted(), n + 1);
            assert_eq!(store.object_count("Movies"), n);
        }
    }

    #[tokio::test]
    async fn stops_on_request_failure() {
        let store = MemoryStore::failing();
        let outcome =
            upload_records(&store, "Movies", &one_by_one(), &records(5), &NoProgress).await;
        assert_eq!(outcome.failure.unwrap().index, 0);
        assert_eq!(store.requests(), vec![1]);
    }

    #[tokio::test]
    async fn bad_id_stops_before_sending() {
        let store = MemoryStore::new();
        let mut rows = records(4);
        rows[2].id = "n/a".to_string();

        let outcome = upload_records(&store, "Movies", &one_by_one(), &rows, &NoProgress).await;
        assert_eq!(outcome.failure.unwrap().index, 2);
        assert_eq!(outcome.submitted, 2);
        assert_eq!(store.submitted(), 2);
    }

    #[tokio::test]
    async fn final_flush_failure_is_reported() {
        let store = MemoryStore::rejecting(2);
        let config = BatchConfig {
            batch_size: 10,
            dynamic: false,
            ..BatchConfig::default()
        };
        let outcome = upload_records(&store, "Movies", &config, &records(3), &NoProgress).await;
        assert_eq!(outcome.failure.unwrap().index, 2);
        assert_eq!(outcome.submitted, 3);
        assert_eq!(outcome.stored, 2);
    }

    struct Recorder(Mutex<Vec<ImportProgressEvent>>);

    impl ImportProgressReporter for Recorder {
        fn report(&self, event: ImportProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn reports_progress_at_end() {
        let store = MemoryStore::new();
        let recorder = Recorder(Mutex::new(Vec::new()));
        upload_records(&store, "Movies", &one_by_one(), &records(3), &recorder).await;
        let events = recorder.0.into_inner().unwrap();
        assert_eq!(
            events,
            vec![ImportProgressEvent::Uploading { n: 3, total: 3 }]
        );
    }
}
