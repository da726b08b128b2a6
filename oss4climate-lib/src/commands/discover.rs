use super::Host;
use super::common::{BaseArgs, NetworkArgs, Session, load_listings_index, load_target_index, report_failures};
use crate::Result;
use crate::pipeline::{discover_targets, merge_into_index, update_listing_index};
use clap::Parser;
use std::io::Write;

const LOG_TARGET: &str = "  discover";

#[derive(Parser, Debug)]
pub struct DiscoverArgs {
    /// Do not refresh the listings index before discovering
    #[arg(long)]
    pub skip_listings_update: bool,

    #[command(flatten)]
    pub base: BaseArgs,

    #[command(flatten)]
    pub network: NetworkArgs,
}

/// Search every configured source for new projects and merge them into the target index.
pub async fn discover<H: Host>(host: &mut H, args: &DiscoverArgs) -> Result<()> {
    let config = args.base.setup()?;
    let session = Session::new(config, &args.base, &args.network).await?;
    let clients = session.clients()?;
    let config = &session.config;

    let mut failures = Vec::new();
    let mut listing = load_listings_index(&config.listings_index)?;
    if !args.skip_listings_update {
        let (updated, listing_failures) = update_listing_index(&clients, config.opensustain_url.as_deref(), listing).await;
        updated.save(&config.listings_index)?;
        listing = updated;
        failures.extend(listing_failures);
    }

    let existing = load_target_index(&config.target_index)?;
    let before = existing.len();

    let outcome = discover_targets(&clients, &config.discovery_sources(), &listing, &session.stop, &session.progress).await;
    failures.extend(outcome.failures);

    let index = merge_into_index(existing, outcome.targets);
    index.save(&config.target_index)?;
    log::info!(target: LOG_TARGET, "Saved {} targets to '{}'", index.len(), config.target_index);

    {
        let mut out = host.output();
        let _ = writeln!(
            out,
            "Target index '{}' now holds {} targets ({} before)",
            config.target_index,
            index.len(),
            before
        );
        let _ = writeln!(
            out,
            "  {} GitHub organisations, {} GitHub repositories, {} GitLab groups, {} GitLab projects",
            index.github_organisations.len(),
            index.github_repositories.len(),
            index.gitlab_groups.len(),
            index.gitlab_projects.len()
        );
        if session.stop.is_stopped() {
            let _ = writeln!(out, "Discovery was interrupted, some sources were not read");
        }
    }
    report_failures(host, &failures);

    Ok(())
}
