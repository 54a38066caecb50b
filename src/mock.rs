//! In-memory registry for tests

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::{IdentityError, RegistryError};
use crate::models::{ImageSummary, LifecyclePolicy, RepositoryName, Tag};
use crate::registry::RegistryApi;

#[derive(Debug, Clone)]
pub struct MockRepo {
    policy: LifecyclePolicy,
    images: ImageSummary,
    tags: Vec<Tag>,
    delay: Duration,
    failure: Option<String>,
}

impl MockRepo {
    pub fn new() -> Self {
        Self {
            policy: LifecyclePolicy::Absent,
            images: ImageSummary::default(),
            tags: Vec::new(),
            delay: Duration::ZERO,
            failure: None,
        }
    }

    pub fn images(mut self, image_count: u64, total_size_bytes: u64) -> Self {
        self.images = ImageSummary {
            image_count,
            total_size_bytes,
        };
        self
    }

    pub fn with_policy(mut self) -> Self {
        self.policy = LifecyclePolicy::Rules(vec![json!({
            "rulePriority": 1,
            "selection": {"tagStatus": "untagged", "countType": "imageCountMoreThan", "countNumber": 10},
            "action": {"type": "expire"}
        })]);
        self
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push(Tag::new(key, value));
        self
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    /// Make the image listing of this repository fail
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }
}

pub struct MockRegistry {
    account_id: Option<String>,
    names: Vec<RepositoryName>,
    repos: HashMap<RepositoryName, MockRepo>,
}

impl MockRegistry {
    pub fn new(account_id: &str) -> Self {
        Self {
            account_id: Some(account_id.to_string()),
            names: Vec::new(),
            repos: HashMap::new(),
        }
    }

    pub fn without_identity() -> Self {
        Self {
            account_id: None,
            names: Vec::new(),
            repos: HashMap::new(),
        }
    }

    pub fn repo(mut self, name: &str, repo: MockRepo) -> Self {
        self.names.push(name.to_string());
        self.repos.insert(name.to_string(), repo);
        self
    }

    fn lookup(&self, operation: &'static str, name: &str) -> Result<&MockRepo, RegistryError> {
        self.repos
            .get(name)
            .ok_or_else(|| RegistryError::api(operation, name, "RepositoryNotFoundException"))
    }
}

#[async_trait]
impl RegistryApi for MockRegistry {
    async fn list_repository_names(&self) -> Result<Vec<RepositoryName>, RegistryError> {
        Ok(self.names.clone())
    }

    async fn get_lifecycle_policy(&self, name: &str) -> Result<LifecyclePolicy, RegistryError> {
        Ok(self.lookup("GetLifecyclePolicy", name)?.policy.clone())
    }

    async fn get_images_and_size(&self, name: &str) -> Result<ImageSummary, RegistryError> {
        let repo = self.lookup("DescribeImages", name)?;
        if !repo.delay.is_zero() {
            tokio::time::sleep(repo.delay).await;
        }
        match &repo.failure {
            Some(message) => Err(RegistryError::api("DescribeImages", name, message.clone())),
            None => Ok(repo.images),
        }
    }

    async fn get_tags(&self, name: &str, account_id: &str) -> Result<Vec<Tag>, RegistryError> {
        let repo = self.lookup("ListTagsForResource", name)?;
        if Some(account_id) != self.account_id.as_deref() {
            return Err(RegistryError::api(
                "ListTagsForResource",
                name,
                "AccessDeniedException: foreign account",
            ));
        }
        Ok(repo.tags.clone())
    }

    async fn get_account_id(&self) -> Result<String, IdentityError> {
        self.account_id.clone().ok_or(IdentityError::MissingAccount)
    }
}

/// Log sink for asserting on emitted events
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Route events on this thread into the buffer until the guard drops
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
