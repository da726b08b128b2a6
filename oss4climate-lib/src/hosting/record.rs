use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata snapshot of one fetched repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// `org/repo` on GitHub, `host/group/project` on GitLab. Unique within a dataset.
    pub id: String,
    pub name: String,
    pub organisation: Option<String>,
    pub url: String,
    pub website: Option<String>,
    pub description: Option<String>,
    pub license: Option<String>,
    pub language: Option<String>,
    pub latest_update: DateTime<Utc>,
    pub last_commit: Option<DateTime<Utc>>,

    /// `None` when the count could not be established reliably.
    pub open_pull_requests: Option<u32>,
    pub master_branch: Option<String>,
    pub readme: Option<String>,
    pub is_fork: bool,
    pub forked_from: Option<String>,

    /// The provider's repository resource, as received.
    pub raw_details: serde_json::Value,
}
