use super::Host;
use super::common::{BaseArgs, NetworkArgs, Session};
use crate::Result;
use crate::dataset::{LISTING_FILE_NAME, OutputFormat, SNAPSHOT_FILE_NAME, SUMMARY_FILE_NAME, Summary, parse_flat, save_snapshot};
use crate::fetch::Fetcher;
use crate::pipeline::Progress;
use clap::Parser;
use ohno::{IntoAppError, app_err, bail};
use reqwest::header::HeaderMap;
use std::fs;
use std::io::Write;

const LOG_TARGET: &str = "  download";

#[derive(Parser, Debug)]
pub struct DownloadArgs {
    /// Base URL of the published dataset (default is `publish_url` from the configuration)
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Published listing file to fetch, `.csv` or `.json`
    #[arg(long, value_name = "NAME", default_value = LISTING_FILE_NAME)]
    pub listing: String,

    #[command(flatten)]
    pub base: BaseArgs,

    #[command(flatten)]
    pub network: NetworkArgs,
}

async fn fetch_published(fetcher: &Fetcher, url: &str) -> Result<String> {
    fetcher
        .get_text(url, &HeaderMap::new())
        .await?
        .ok_or_else(|| app_err!("'{url}' was not found"))
}

/// Fetch a published summary and listing into the output directory and rebuild the snapshot.
///
/// Published files are always fetched fresh, whatever the cache holds.
pub async fn download_dataset<H: Host>(host: &mut H, args: &DownloadArgs) -> Result<()> {
    let config = args.base.setup()?;

    let Some(base_url) = args.url.clone().or_else(|| config.publish_url.clone()) else {
        bail!("no publish URL configured, pass --url or set `publish_url`");
    };
    let base_url = base_url.trim_end_matches('/').to_string();

    if args.listing.is_empty() || args.listing.contains(['/', '\\']) {
        bail!("listing '{}' must be a plain file name", args.listing);
    }
    let listing_path = config.output_dir.join(&args.listing);
    let format = OutputFormat::from_path(&listing_path)?;

    let network = NetworkArgs {
        ignore_cached: true,
        ..args.network.clone()
    };
    let session = Session::new(config, &args.base, &network).await?;
    let config = &session.config;

    session.progress.set_phase("Downloading");
    session.progress.set_indeterminate(Box::new(|| "published dataset".to_string()));

    let summary_url = format!("{base_url}/{SUMMARY_FILE_NAME}");
    let summary_text = fetch_published(&session.fetcher, &summary_url).await?;
    let summary = Summary::from_toml_str(&summary_text).map_err(|e| app_err!("invalid summary at '{summary_url}': {e}"))?;

    let listing_url = format!("{base_url}/{}", args.listing);
    let listing_text = fetch_published(&session.fetcher, &listing_url).await?;
    let dataset = parse_flat(&listing_text, format).map_err(|e| app_err!("invalid listing at '{listing_url}': {e}"))?;

    if dataset.len() != summary.statistics.repositories {
        log::warn!(
            target: LOG_TARGET,
            "Listing has {} repositories but the summary counts {}",
            dataset.len(),
            summary.statistics.repositories
        );
    }

    fs::create_dir_all(&config.output_dir).into_app_err_with(|| format!("creating directory '{}'", config.output_dir))?;

    let summary_path = config.output_dir.join(SUMMARY_FILE_NAME);
    fs::write(&summary_path, &summary_text).into_app_err_with(|| format!("writing summary '{summary_path}'"))?;
    fs::write(&listing_path, &listing_text).into_app_err_with(|| format!("writing listing '{listing_path}'"))?;

    let snapshot_path = config.output_dir.join(SNAPSHOT_FILE_NAME);
    save_snapshot(&dataset, &snapshot_path)?;

    let mut out = host.output();
    let _ = writeln!(out, "Downloaded {} repositories from '{base_url}'", dataset.len());
    let _ = writeln!(out, "  {format} listing: {listing_path}");
    let _ = writeln!(out, "  snapshot: {snapshot_path}");
    let _ = writeln!(out, "  summary: {summary_path}");

    Ok(())
}
