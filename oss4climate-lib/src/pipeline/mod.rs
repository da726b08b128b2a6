//! Orchestration of the discovery and fetch passes.
//!
//! # Discovery
//!
//! The discovery pass reads every configured source (the LF Energy landscape and
//! project pages, the opensustain.tech directory and the listings index) and
//! classifies the project links it finds. The result is merged into the persisted
//! target index and cleaned up.
//!
//! # Fetching
//!
//! The fetch pass expands organisations and groups into their repositories, then
//! fetches the details of every repository. Each target either produces a record,
//! lands in the failure list, or is skipped because a [`StopSignal`] tripped.
//! Per-target errors never abort the pass.

mod discover;
mod expand;
mod failure;
mod fetch_pass;
mod progress;
mod stop;

pub use discover::{DiscoveryOutcome, DiscoverySources, discover_targets, merge_into_index, update_listing_index};
pub use expand::organisations_of_repositories;
pub use failure::{Failure, FailureKind, failed_urls};
pub use fetch_pass::{FetchOutcome, fetch_all};
pub use progress::{Progress, SilentProgress};
pub use stop::StopSignal;

use crate::Result;
use crate::fetch::Fetcher;
use crate::hosting::{GitHubClient, GitLabClient, HostingConfig};

/// The fetcher and the platform clients sharing it.
#[derive(Debug)]
pub struct Clients<'a> {
    pub fetcher: &'a Fetcher,
    pub github: GitHubClient<'a>,
    pub gitlab: GitLabClient<'a>,
}

impl<'a> Clients<'a> {
    pub fn new(fetcher: &'a Fetcher, config: &HostingConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            github: GitHubClient::new(fetcher, config)?,
            gitlab: GitLabClient::new(fetcher, config)?,
        })
    }
}
