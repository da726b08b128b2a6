//! The opensustain.tech directory.

use super::html::links_by_section;
use super::{fetch_page, from_html_str};
use crate::Result;
use crate::fetch::Fetcher;
use crate::targets::{ResourceListing, TargetSet, isolate_relevant_urls};

const LOG_TARGET: &str = "opensustain";

const LISTINGS_SECTION: &str = "Sustainable Development";
const LISTINGS_SUBSECTION: &str = "Curated Lists";

/// Fetch the directory page and classify every project it links to.
pub async fn fetch_opensustain_targets(fetcher: &Fetcher, url: &str) -> Result<TargetSet> {
    Ok(from_html_str(&fetch_page(fetcher, url).await?))
}

/// Build a listing of listings from the page's curated lists section.
///
/// GitHub and GitLab links become README listings, anything else is kept as a fault.
#[must_use]
pub fn parse_listing_of_listings(html: &str) -> ResourceListing {
    let sections = links_by_section(html);

    let Some(listing_urls) = sections.get(LISTINGS_SECTION).and_then(|s| s.get(LISTINGS_SUBSECTION)) else {
        log::warn!(target: LOG_TARGET, "No '{LISTINGS_SECTION}' / '{LISTINGS_SUBSECTION}' section found");
        return ResourceListing::default();
    };

    let relevant = isolate_relevant_urls(listing_urls);
    let others = listing_urls.iter().filter(|url| !relevant.contains(url)).cloned().collect();

    ResourceListing {
        github_readme_listings: relevant,
        fault_urls: others,
        ..ResourceListing::default()
    }
}

/// Fetch the directory page and extract its listing of listings.
pub async fn fetch_listing_of_listings(fetcher: &Fetcher, url: &str) -> Result<ResourceListing> {
    Ok(parse_listing_of_listings(&fetch_page(fetcher, url).await?))
}
