//! Batched writes.
//!
//! [`Batcher`] buffers upload objects and sends them to the store once the
//! buffer reaches the current batch size. With dynamic sizing on, the batch
//! size after each flush is chosen so that one request takes about
//! `creation_time_secs` at the throughput just observed.

use std::time::{Duration, Instant};

use crate::config::BatchConfig;
use crate::models::MovieObject;
use crate::weaviate::VectorStore;

/// The first object (by row index) that could not be stored.
#[derive(Debug)]
pub struct Rejection {
    pub index: usize,
    pub error: anyhow::Error,
}

pub struct Batcher<'a> {
    store: &'a dyn VectorStore,
    class: String,
    batch_size: usize,
    dynamic: bool,
    creation_time_secs: f64,
    max_batch_size: usize,
    pending: Vec<(usize, MovieObject)>,
    stored: usize,
    requests: usize,
}

impl<'a> Batcher<'a> {
    pub fn new(store: &'a dyn VectorStore, class: &str, config: &BatchConfig) -> Self {
        Self {
            store,
            class: class.to_string(),
            batch_size: config.batch_size.max(1),
            dynamic: config.dynamic,
            creation_time_secs: config.creation_time_secs,
            max_batch_size: config.max_batch_size.max(1),
            pending: Vec::new(),
            stored: 0,
            requests: 0,
        }
    }

    /// Current number of objects per request.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Objects the store accepted so far.
    pub fn stored(&self) -> usize {
        self.stored
    }

    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Buffer `object` for row `index`, flushing when the batch is full.
    pub async fn add(&mut self, index: usize, object: MovieObject) -> Result<(), Rejection> {
        self.pending.push((index, object));
        if self.pending.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Send everything buffered. Does nothing when the buffer is empty.
    ///
    /// A failed request is reported at the last row index of the batch; an
    /// object rejected by the service is reported at its own row index.
    pub async fn flush(&mut self) -> Result<(), Rejection> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let (indices, objects): (Vec<usize>, Vec<MovieObject>) =
            std::mem::take(&mut self.pending).into_iter().unzip();
        let last_index = indices[indices.len() - 1];

        let started = Instant::now();
        self.requests += 1;
        let results = self
            .store
            .add_objects(&self.class, &objects)
            .await
            .map_err(|error| Rejection {
                index: last_index,
                error,
            })?;
        let elapsed = started.elapsed();

        let mut first_rejected = None;
        for (index, result) in indices.iter().zip(results) {
            match result {
                None => self.stored += 1,
                Some(message) => {
                    if first_rejected.is_none() {
                        first_rejected = Some(Rejection {
                            index: *index,
                            error: anyhow::anyhow!(message),
                        });
                    }
                }
            }
        }
        if let Some(rejection) = first_rejected {
            return Err(rejection);
        }

        if self.dynamic {
            let next = recommend_batch_size(
                objects.len(),
                elapsed,
                self.creation_time_secs,
                self.max_batch_size,
            );
            if next != self.batch_size {
                tracing::debug!(from = self.batch_size, to = next, "batch size adjusted");
                self.batch_size = next;
            }
        }

        Ok(())
    }
}

/// Objects per request that would take `creation_time_secs` at the rate
/// `objects / elapsed`, clamped to `[1, max]`.
pub fn recommend_batch_size(
    objects: usize,
    elapsed: Duration,
    creation_time_secs: f64,
    max: usize,
) -> usize {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return max.max(1);
    }
    let per_second = objects as f64 / secs;
    let recommended = (per_second * creation_time_secs).round();
    if recommended >= max as f64 {
        max.max(1)
    } else {
        (recommended as usize).max(1)
    }
}
