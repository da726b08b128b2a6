use super::{Clients, Failure, FailureKind, Progress, StopSignal};
use crate::Result;
use crate::sources::{
    fetch_all as fetch_listings, fetch_landscape_targets, fetch_listing_of_listings, fetch_opensustain_targets,
    fetch_project_page_targets, fetch_project_page_urls,
};
use crate::targets::{ResourceListing, TargetSet};
use core::sync::atomic::{AtomicU64, Ordering};
use futures_util::future::join_all;
use std::sync::Arc;

const LOG_TARGET: &str = "  discover";

/// Where to look for new projects. A source left unset is skipped.
#[derive(Debug, Clone, Default)]
pub struct DiscoverySources {
    pub lfenergy_landscape_url: Option<String>,
    pub lfenergy_projects_url: Option<String>,
    pub opensustain_url: Option<String>,
}

/// Targets found by a discovery pass, before they are merged into the index.
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    pub targets: TargetSet,
    pub failures: Vec<Failure>,
}

impl DiscoveryOutcome {
    fn absorb(&mut self, source: &str, result: Result<TargetSet>) {
        match result {
            Ok(targets) => {
                log::info!(target: LOG_TARGET, "Found {} targets in '{source}'", targets.len());
                self.targets.extend(targets);
            }
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Could not read '{source}': {e:#}");
                self.failures.push(Failure::new(source, FailureKind::Source, e));
            }
        }
    }
}

/// Merge newly found targets into an existing index and clean the result up.
#[must_use]
pub fn merge_into_index(existing: TargetSet, found: TargetSet) -> TargetSet {
    let mut merged = TargetSet::merge(existing, found);
    merged.cleanup();
    merged
}

/// Refresh the listing of listings from the opensustain.tech directory.
///
/// A failure leaves the existing listing untouched and is reported.
pub async fn update_listing_index(
    clients: &Clients<'_>,
    opensustain_url: Option<&str>,
    existing: ResourceListing,
) -> (ResourceListing, Vec<Failure>) {
    let Some(url) = opensustain_url else {
        return (existing, Vec::new());
    };

    match fetch_listing_of_listings(clients.fetcher, url).await {
        Ok(found) => {
            let mut listing = ResourceListing::merge(existing, found);
            listing.dedup_and_sort();
            (listing, Vec::new())
        }
        Err(e) => {
            log::warn!(target: LOG_TARGET, "Could not read listings from '{url}': {e:#}");
            (existing, vec![Failure::new(url, FailureKind::Source, e)])
        }
    }
}

async fn discover_lfenergy_projects(clients: &Clients<'_>, index_url: &str, stop: &StopSignal, progress: &dyn Progress, outcome: &mut DiscoveryOutcome) {
    let pages = match fetch_project_page_urls(clients.fetcher, index_url).await {
        Ok(pages) => pages,
        Err(e) => {
            outcome.absorb(index_url, Err(e));
            return;
        }
    };

    log::info!(target: LOG_TARGET, "Indexing {} LF Energy project pages", pages.len());

    let total = pages.len() as u64;
    let done = Arc::new(AtomicU64::new(0));
    let done_for_progress = Arc::clone(&done);
    progress.set_determinate(Box::new(move || {
        let current = done_for_progress.load(Ordering::Relaxed);
        (total, current, format!("{current}/{total} LF Energy project pages"))
    }));

    let results = join_all(pages.iter().map(|page| {
        let done = Arc::clone(&done);
        async move {
            if stop.is_stopped() {
                return (page, None);
            }
            let result = fetch_project_page_targets(clients.fetcher, page).await;
            let _ = done.fetch_add(1, Ordering::Relaxed);
            (page, Some(result))
        }
    }))
    .await;

    for (page, result) in results {
        match result {
            Some(result) => outcome.absorb(page, result),
            None => log::info!(target: LOG_TARGET, "Skipped '{page}'"),
        }
    }
}

/// Run every configured discovery source and the listings index.
///
/// Sources that fail are logged and reported in [`DiscoveryOutcome::failures`]; the
/// remaining sources still contribute.
pub async fn discover_targets(
    clients: &Clients<'_>,
    sources: &DiscoverySources,
    listing: &ResourceListing,
    stop: &StopSignal,
    progress: &dyn Progress,
) -> DiscoveryOutcome {
    let mut outcome = DiscoveryOutcome::default();

    if let Some(url) = &sources.lfenergy_projects_url
        && !stop.is_stopped()
    {
        progress.set_phase("LF Energy");
        discover_lfenergy_projects(clients, url, stop, progress, &mut outcome).await;
    }

    if let Some(url) = &sources.lfenergy_landscape_url
        && !stop.is_stopped()
    {
        progress.set_phase("Landscape");
        progress.set_indeterminate(Box::new(|| "reading the LF Energy landscape".to_string()));
        outcome.absorb(url, fetch_landscape_targets(clients.fetcher, url).await);
    }

    if let Some(url) = &sources.opensustain_url
        && !stop.is_stopped()
    {
        progress.set_phase("Opensustain");
        progress.set_indeterminate(Box::new(|| "reading opensustain.tech".to_string()));
        outcome.absorb(url, fetch_opensustain_targets(clients.fetcher, url).await);
    }

    if !stop.is_stopped() {
        progress.set_phase("Listings");
        progress.set_indeterminate(Box::new(|| "reading curated listings".to_string()));
        let harvest = fetch_listings(clients.fetcher, &clients.github, &clients.gitlab, listing).await;
        outcome.targets.extend(harvest.targets);
        outcome
            .failures
            .extend(harvest.failed_listings.into_iter().map(|url| Failure::new(url, FailureKind::Source, "listing could not be read")));
    }

    progress.done();
    outcome.targets.dedup_and_sort();
    outcome
}
