use crate::models::RepositoryRecord;
use crate::scheduler::CollectionFailure;

/// Running totals over every successfully collected repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub total_repos: u64,
    pub repos_without_tags: u64,
    pub repos_without_policy: u64,
    pub total_images: u64,
    pub total_size_bytes_all_repos: u64,
}

impl AggregateStats {
    /// Account for one more record. Pure sums and counts, so arrival order does not matter.
    pub fn fold(mut self, record: &RepositoryRecord) -> Self {
        self.total_repos += 1;
        self.total_images += record.image_count;
        self.total_size_bytes_all_repos += record.total_size_bytes;
        if record.lifecycle_policy.is_missing() {
            self.repos_without_policy += 1;
        }
        if record.tags.is_empty() {
            self.repos_without_tags += 1;
        }
        self
    }
}

/// Final result of a collection run
#[derive(Debug)]
pub struct Inventory {
    /// Sorted by `total_size_bytes` descending, ties in arrival order
    pub records: Vec<RepositoryRecord>,
    pub stats: AggregateStats,
    pub failures: Vec<CollectionFailure>,
    /// Repositories never collected because the run deadline passed
    pub skipped: usize,
}

/// Single consumer of scheduler completions.
#[derive(Debug, Default)]
pub struct Aggregator {
    stats: AggregateStats,
    records: Vec<RepositoryRecord>,
    failures: Vec<CollectionFailure>,
}

impl Aggregator {
    pub fn accept(&mut self, record: RepositoryRecord) {
        self.stats = self.stats.fold(&record);
        self.records.push(record);
    }

    pub fn reject(&mut self, failure: CollectionFailure) {
        self.failures.push(failure);
    }

    /// Completions seen so far, successful or not
    pub fn processed(&self) -> usize {
        self.records.len() + self.failures.len()
    }

    pub fn finish(self, skipped: usize) -> Inventory {
        let mut records = self.records;
        sort_by_size_desc(&mut records);
        Inventory {
            records,
            stats: self.stats,
            failures: self.failures,
            skipped,
        }
    }
}

/// Stable sort, largest repository first
pub fn sort_by_size_desc(records: &mut [RepositoryRecord]) {
    records.sort_by(|a, b| b.total_size_bytes.cmp(&a.total_size_bytes));
}
