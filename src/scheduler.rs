//! Bounded fan-out of per-repository collections.
//!
//! Collections run through `buffer_unordered`, so at most `concurrency` are in
//! flight and completions come back in arrival order. A single consumer drains
//! them into the [`Aggregator`]; nothing else touches the running totals.

use std::fmt;
use std::pin::pin;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use indicatif::ProgressBar;
use tokio::time::Instant;
use tracing::{error, warn};

use crate::aggregate::{Aggregator, Inventory};
use crate::collector::collect;
use crate::error::RegistryError;
use crate::models::{RepositoryName, RepositoryRecord};
use crate::registry::RegistryApi;

/// Outcome of one collection, still tied to the repository it was for
#[derive(Debug)]
pub struct Completion {
    pub name: RepositoryName,
    pub result: Result<RepositoryRecord, RegistryError>,
}

/// A repository excluded from the report because its collection failed
#[derive(Debug)]
pub struct CollectionFailure {
    pub name: RepositoryName,
    pub error: RegistryError,
}

impl fmt::Display for CollectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} generated an error: {}", self.name, self.error)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    concurrency: usize,
    timeout: Option<Duration>,
}

impl Scheduler {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            timeout: None,
        }
    }

    /// Stop draining after `timeout`; only repositories completed by then are reported.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// One collection per name, yielded as each one finishes
    pub fn completions<'a, R: RegistryApi + ?Sized>(
        &self,
        registry: &'a R,
        account_id: &'a str,
        names: Vec<RepositoryName>,
    ) -> impl Stream<Item = Completion> + 'a {
        stream::iter(names)
            .map(move |name| async move {
                let result = collect(registry, account_id, &name).await;
                Completion { name, result }
            })
            .buffer_unordered(self.concurrency)
    }

    /// Collect every repository and fold the results.
    ///
    /// Failures are logged as they arrive and kept out of the totals. Returns
    /// once, after the last completion or when the deadline passes.
    pub async fn run<R: RegistryApi + ?Sized>(
        &self,
        registry: &R,
        account_id: &str,
        names: Vec<RepositoryName>,
        progress: &ProgressBar,
    ) -> Inventory {
        let total = names.len();
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut completions = pin!(self.completions(registry, account_id, names));
        let mut aggregator = Aggregator::default();

        loop {
            let next = match deadline {
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, completions.next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            progress.suspend(|| {
                                warn!(
                                    pending = total - aggregator.processed(),
                                    "deadline reached, reporting completed repositories only"
                                )
                            });
                            break;
                        }
                    }
                }
                None => completions.next().await,
            };
            let Some(Completion { name, result }) = next else {
                break;
            };

            match result {
                Ok(record) => aggregator.accept(record),
                Err(error) => {
                    let failure = CollectionFailure { name, error };
                    progress.suspend(|| error!(repository = %failure.name, "{}", failure));
                    aggregator.reject(failure);
                }
            }
            progress.inc(1);
        }

        progress.finish();
        let skipped = total - aggregator.processed();
        aggregator.finish(skipped)
    }
}
