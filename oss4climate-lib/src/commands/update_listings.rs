use super::Host;
use super::common::{BaseArgs, NetworkArgs, Session, load_listings_index, report_failures};
use crate::Result;
use crate::pipeline::{Progress, update_listing_index};
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct UpdateListingsArgs {
    #[command(flatten)]
    pub base: BaseArgs,

    #[command(flatten)]
    pub network: NetworkArgs,
}

/// Refresh the listings index from the curated lists published on opensustain.tech.
pub async fn update_listings<H: Host>(host: &mut H, args: &UpdateListingsArgs) -> Result<()> {
    let config = args.base.setup()?;
    let session = Session::new(config, &args.base, &args.network).await?;
    let clients = session.clients()?;

    let existing = load_listings_index(&session.config.listings_index)?;
    session.progress.set_phase("Listings");
    session.progress.set_indeterminate(Box::new(|| "reading curated lists".to_string()));
    let (listing, failures) = update_listing_index(&clients, session.config.opensustain_url.as_deref(), existing).await;
    listing.save(&session.config.listings_index)?;

    let _ = writeln!(
        host.output(),
        "Listings index '{}' holds {} GitHub, {} GitLab and {} web page listings",
        session.config.listings_index,
        listing.github_readme_listings.len(),
        listing.gitlab_readme_listings.len(),
        listing.webpage_html.len()
    );
    report_failures(host, &failures);

    Ok(())
}
