use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ecr::error::DisplayErrorContext;
use aws_types::region::Region;
use serde_json::Value;
use tracing::debug;

use crate::error::{IdentityError, RegistryError};
use crate::models::{ImageSummary, LifecyclePolicy, RepositoryName, Tag};

/// Read-only capabilities the inventory needs from the registry.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// All repository names, every page drained
    async fn list_repository_names(&self) -> Result<Vec<RepositoryName>, RegistryError>;

    /// `LifecyclePolicy::Absent` when the repository has no policy configured
    async fn get_lifecycle_policy(&self, name: &str) -> Result<LifecyclePolicy, RegistryError>;

    /// Image count and summed image size, every page drained
    async fn get_images_and_size(&self, name: &str) -> Result<ImageSummary, RegistryError>;

    /// Tags of the repository resource; empty when it has none
    async fn get_tags(&self, name: &str, account_id: &str) -> Result<Vec<Tag>, RegistryError>;

    async fn get_account_id(&self) -> Result<String, IdentityError>;
}

/// Amazon ECR backed registry, with STS for the caller identity.
pub struct EcrRegistry {
    ecr: aws_sdk_ecr::Client,
    sts: aws_sdk_sts::Client,
    region: String,
}

impl EcrRegistry {
    /// Build clients from the ambient AWS configuration, optionally pinning region and profile.
    pub async fn from_env(
        region: Option<String>,
        profile: Option<String>,
    ) -> Result<Self, RegistryError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let conf = loader.load().await;

        let region = conf
            .region()
            .map(|r| r.as_ref().to_string())
            .ok_or(RegistryError::MissingRegion)?;
        debug!(%region, "loaded AWS configuration");

        Ok(Self::from_clients(
            aws_sdk_ecr::Client::new(&conf),
            aws_sdk_sts::Client::new(&conf),
            region,
        ))
    }

    pub fn from_clients(ecr: aws_sdk_ecr::Client, sts: aws_sdk_sts::Client, region: String) -> Self {
        Self { ecr, sts, region }
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl RegistryApi for EcrRegistry {
    async fn list_repository_names(&self) -> Result<Vec<RepositoryName>, RegistryError> {
        let mut names = Vec::new();
        let mut pages = self.ecr.describe_repositories().into_paginator().send();

        while let Some(page) = pages.next().await {
            let page =
                page.map_err(|e| RegistryError::Listing(DisplayErrorContext(&e).to_string()))?;
            names.extend(
                page.repositories()
                    .iter()
                    .filter_map(|repo| repo.repository_name())
                    .map(str::to_string),
            );
        }

        debug!(count = names.len(), "listed repositories");
        Ok(names)
    }

    async fn get_lifecycle_policy(&self, name: &str) -> Result<LifecyclePolicy, RegistryError> {
        debug!(repository = name, "GetLifecyclePolicy");
        match self
            .ecr
            .get_lifecycle_policy()
            .repository_name(name)
            .send()
            .await
        {
            Ok(out) => match out.lifecycle_policy_text() {
                Some(text) => parse_policy_text(name, text),
                None => Ok(LifecyclePolicy::Absent),
            },
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_lifecycle_policy_not_found_exception()) =>
            {
                Ok(LifecyclePolicy::Absent)
            }
            Err(err) => Err(RegistryError::api(
                "GetLifecyclePolicy",
                name,
                DisplayErrorContext(&err).to_string(),
            )),
        }
    }

    async fn get_images_and_size(&self, name: &str) -> Result<ImageSummary, RegistryError> {
        debug!(repository = name, "DescribeImages");
        let mut sizes = Vec::new();
        let mut pages = self
            .ecr
            .describe_images()
            .repository_name(name)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                RegistryError::api("DescribeImages", name, DisplayErrorContext(&e).to_string())
            })?;
            sizes.extend(
                page.image_details()
                    .iter()
                    .map(|img| img.image_size_in_bytes().map_or(0, |s| s.max(0) as u64)),
            );
        }

        Ok(ImageSummary::from_sizes(sizes))
    }

    async fn get_tags(&self, name: &str, account_id: &str) -> Result<Vec<Tag>, RegistryError> {
        let arn = repository_arn(&self.region, account_id, name);
        debug!(repository = name, %arn, "ListTagsForResource");
        let out = self
            .ecr
            .list_tags_for_resource()
            .resource_arn(&arn)
            .send()
            .await
            .map_err(|e| {
                RegistryError::api(
                    "ListTagsForResource",
                    name,
                    DisplayErrorContext(&e).to_string(),
                )
            })?;

        Ok(out
            .tags()
            .iter()
            .map(|t| Tag::new(t.key(), t.value()))
            .collect())
    }

    async fn get_account_id(&self) -> Result<String, IdentityError> {
        let out = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| {
                IdentityError::Lookup(aws_sdk_sts::error::DisplayErrorContext(&e).to_string())
            })?;

        out.account()
            .map(str::to_string)
            .ok_or(IdentityError::MissingAccount)
    }
}

/// Fully-qualified resource identifier used for tag lookups
pub fn repository_arn(region: &str, account_id: &str, name: &str) -> String {
    format!("arn:aws:ecr:{}:{}:repository/{}", region, account_id, name)
}

/// Extract the `rules` array from a lifecycle policy document
fn parse_policy_text(repository: &str, text: &str) -> Result<LifecyclePolicy, RegistryError> {
    let malformed = |message: String| RegistryError::MalformedPolicy {
        repository: repository.to_string(),
        message,
    };

    let mut doc: Value = serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;
    match doc.get_mut("rules").map(Value::take) {
        Some(Value::Array(rules)) => Ok(LifecyclePolicy::Rules(rules)),
        _ => Err(malformed("missing \"rules\" array".to_string())),
    }
}
