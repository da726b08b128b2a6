//! Clients for the code hosting platforms.
//!
//! Both clients go through the shared [`Fetcher`](crate::fetch::Fetcher), so every
//! call is cached and throttled per host. Credentials live in a [`HostingConfig`] built
//! once per run and handed to the client constructors.

mod github;
mod gitlab;
mod record;

pub use github::{GitHubClient, select_branch};
pub use gitlab::{GitLabClient, raw_readme_url};
pub use record::RepositoryRecord;

/// Default GitHub REST API root.
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

/// Default root serving raw GitHub file content.
pub const DEFAULT_GITHUB_RAW_BASE: &str = "https://raw.githubusercontent.com";

/// Credentials and endpoints for the hosting platforms.
#[derive(Debug, Clone)]
pub struct HostingConfig {
    pub github_token: Option<String>,
    pub gitlab_token: Option<String>,
    pub github_api_base: String,
    pub github_raw_base: String,
}

impl Default for HostingConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            gitlab_token: None,
            github_api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            github_raw_base: DEFAULT_GITHUB_RAW_BASE.to_string(),
        }
    }
}
