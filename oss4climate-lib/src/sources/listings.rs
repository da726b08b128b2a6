//! Harvest targets from every document named in a [`ResourceListing`].

use super::{from_html_page, from_markdown_str};
use crate::Result;
use crate::fetch::Fetcher;
use crate::hosting::{GitHubClient, GitLabClient};
use crate::targets::{ResourceListing, TargetSet};
use futures_util::future::join_all;

const LOG_TARGET: &str = "  listings";

/// Targets found across all listings, plus the listings that could not be read.
#[derive(Debug, Default)]
pub struct ListingHarvest {
    pub targets: TargetSet,
    pub failed_listings: Vec<String>,
}

fn readme_targets(listing_url: &str, readme: Result<Option<String>>) -> Result<TargetSet> {
    match readme? {
        Some(text) => Ok(from_markdown_str(&text)),
        None => {
            log::info!(target: LOG_TARGET, "Listing '{listing_url}' has no README");
            Ok(TargetSet::default())
        }
    }
}

/// Fetch every listing and classify the projects they link to.
///
/// A listing that fails is logged and reported in [`ListingHarvest::failed_listings`].
/// The listing's fault URLs are carried over into `unknown` and `invalid`.
pub async fn fetch_all(fetcher: &Fetcher, github: &GitHubClient<'_>, gitlab: &GitLabClient<'_>, listing: &ResourceListing) -> ListingHarvest {
    let github_results = join_all(listing.github_readme_listings.iter().map(|url| async move {
        let result = readme_targets(url, github.fetch_readme(url).await);
        (url, result)
    }));

    let gitlab_results = join_all(listing.gitlab_readme_listings.iter().map(|url| async move {
        let result = readme_targets(url, gitlab.fetch_readme(url).await);
        (url, result)
    }));

    let html_results = join_all(
        listing
            .webpage_html
            .iter()
            .map(|url| async move { (url, from_html_page(fetcher, url).await) }),
    );

    let (github_results, gitlab_results, html_results) = tokio::join!(github_results, gitlab_results, html_results);

    let mut harvest = ListingHarvest::default();
    for (url, result) in github_results.into_iter().chain(gitlab_results).chain(html_results) {
        match result {
            Ok(targets) => harvest.targets.extend(targets),
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Failed fetching listing '{url}': {e:#}");
                harvest.failed_listings.push(url.clone());
            }
        }
    }

    harvest.targets.extend(TargetSet {
        unknown: listing.fault_urls.clone(),
        invalid: listing.fault_invalid_urls.clone(),
        ..TargetSet::default()
    });
    harvest.targets.dedup_and_sort();
    harvest.failed_listings.sort();

    harvest
}
