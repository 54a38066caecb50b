use tracing::debug;

use crate::error::RegistryError;
use crate::models::RepositoryRecord;
use crate::registry::RegistryApi;

/// Assemble the record for one repository.
///
/// Policy, image and tag lookups are independent and run concurrently; the
/// first failing lookup fails the whole collection.
pub async fn collect<R: RegistryApi + ?Sized>(
    registry: &R,
    account_id: &str,
    name: &str,
) -> Result<RepositoryRecord, RegistryError> {
    let (policy, images, tags) = tokio::try_join!(
        registry.get_lifecycle_policy(name),
        registry.get_images_and_size(name),
        registry.get_tags(name, account_id),
    )?;

    debug!(
        repository = name,
        images = images.image_count,
        bytes = images.total_size_bytes,
        "collected repository"
    );
    Ok(RepositoryRecord::new(name.to_string(), policy, images, tags))
}
