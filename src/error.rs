use thiserror::Error;

/// Failure of a single registry call. Scoped to one repository at the
/// scheduler boundary; never aborts the whole run.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("{operation} failed for {repository}: {message}")]
    Api {
        operation: &'static str,
        repository: String,
        message: String,
    },

    #[error("Failed to list repositories: {0}")]
    Listing(String),

    #[error("Lifecycle policy for {repository} is malformed: {message}")]
    MalformedPolicy { repository: String, message: String },

    #[error("No AWS region configured. Use --region or set AWS_REGION")]
    MissingRegion,
}

impl RegistryError {
    pub fn api(operation: &'static str, repository: &str, message: impl Into<String>) -> Self {
        RegistryError::Api {
            operation,
            repository: repository.to_string(),
            message: message.into(),
        }
    }
}

/// Caller identity could not be resolved. Fatal: tag lookups need the account id.
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("GetCallerIdentity failed: {0}")]
    Lookup(String),

    #[error("GetCallerIdentity returned no account id")]
    MissingAccount,
}

/// Errors that abort the whole run
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid --filter pattern: {0}")]
    InvalidFilter(#[source] regex::Error),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_names_repository() {
        let err = RegistryError::api("DescribeImages", "team/app", "throttled");
        assert_eq!(err.to_string(), "DescribeImages failed for team/app: throttled");
    }
}
