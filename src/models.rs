use serde::Serialize;
use serde_json::Value;

/// Repository names are the unique key for every per-repository call.
pub type RepositoryName = String;

const KIB: f64 = 1024.0;

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (KIB * KIB)
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / (KIB * KIB * KIB)
}

pub fn bytes_to_tb(bytes: u64) -> f64 {
    bytes as f64 / (KIB * KIB * KIB * KIB)
}

/// Lifecycle policy of a repository.
///
/// `Absent` means the registry has no policy configured and serializes as
/// `null`; it is distinct from a policy with an empty rule list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LifecyclePolicy {
    Absent,
    Rules(Vec<Value>),
}

impl LifecyclePolicy {
    /// True for `Absent` and for a policy without rules.
    pub fn is_missing(&self) -> bool {
        match self {
            LifecyclePolicy::Absent => true,
            LifecyclePolicy::Rules(rules) => rules.is_empty(),
        }
    }

    /// JSON text of the policy (`null` when absent), used for CSV cells and console lines.
    pub fn to_json_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }
}

/// Resource tag attached to a repository. Keys keep the registry's casing on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Image count and summed size of one repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageSummary {
    pub image_count: u64,
    pub total_size_bytes: u64,
}

impl ImageSummary {
    pub fn from_sizes<I: IntoIterator<Item = u64>>(sizes: I) -> Self {
        sizes.into_iter().fold(Self::default(), |acc, size| Self {
            image_count: acc.image_count + 1,
            total_size_bytes: acc.total_size_bytes + size,
        })
    }
}

/// Everything collected for one repository. Built once by the collector and
/// only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryRecord {
    pub name: RepositoryName,
    pub lifecycle_policy: LifecyclePolicy,
    pub image_count: u64,
    pub total_size_bytes: u64,
    pub tags: Vec<Tag>,
}

impl RepositoryRecord {
    pub fn new(
        name: RepositoryName,
        lifecycle_policy: LifecyclePolicy,
        images: ImageSummary,
        tags: Vec<Tag>,
    ) -> Self {
        Self {
            name,
            lifecycle_policy,
            image_count: images.image_count,
            total_size_bytes: images.total_size_bytes,
            tags,
        }
    }

    pub fn total_size_mb(&self) -> f64 {
        bytes_to_mb(self.total_size_bytes)
    }

    pub fn total_size_gb(&self) -> f64 {
        bytes_to_gb(self.total_size_bytes)
    }

    pub fn total_size_tb(&self) -> f64 {
        bytes_to_tb(self.total_size_bytes)
    }

    pub fn tags_json_text(&self) -> String {
        serde_json::to_string(&self.tags).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Serialized shape of a record, with the derived unit views filled in.
#[derive(Debug, Serialize)]
pub struct RecordRow<'a> {
    pub name: &'a str,
    pub lifecycle_policy: &'a LifecyclePolicy,
    pub image_count: u64,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    pub total_size_gb: f64,
    pub total_size_tb: f64,
    pub tags: &'a [Tag],
}

impl<'a> From<&'a RepositoryRecord> for RecordRow<'a> {
    fn from(record: &'a RepositoryRecord) -> Self {
        Self {
            name: &record.name,
            lifecycle_policy: &record.lifecycle_policy,
            image_count: record.image_count,
            total_size_bytes: record.total_size_bytes,
            total_size_mb: record.total_size_mb(),
            total_size_gb: record.total_size_gb(),
            total_size_tb: record.total_size_tb(),
            tags: &record.tags,
        }
    }
}
