use super::Host;
use super::common::{BaseArgs, NetworkArgs, Session, load_target_index, report_failures};
use crate::Result;
use crate::dataset::{LISTING_FILE_NAME, OutputFormat, SNAPSHOT_FILE_NAME, SUMMARY_FILE_NAME, Summary, save_snapshot, write_flat};
use crate::pipeline::{FailureKind, failed_urls, fetch_all, merge_into_index};
use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;

const LOG_TARGET: &str = "  generate";

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Flattened dataset to write, `.csv` or `.json` (default is `listing_data.csv` in the output directory)
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<Utf8PathBuf>,

    #[command(flatten)]
    pub base: BaseArgs,

    #[command(flatten)]
    pub network: NetworkArgs,
}

/// Fetch every target of the index and write the dataset, its snapshot and its summary.
pub async fn generate_listing<H: Host>(host: &mut H, args: &GenerateArgs) -> Result<()> {
    let config = args.base.setup()?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config.output_dir.join(LISTING_FILE_NAME));
    let format = OutputFormat::from_path(&output)?;

    let targets = load_target_index(&config.target_index)?;

    let session = Session::new(config, &args.base, &args.network).await?;
    let clients = session.clients()?;
    let config = &session.config;

    log::info!(target: LOG_TARGET, "Fetching {} targets", targets.len());
    let outcome = fetch_all(
        &clients,
        targets.clone(),
        config.max_concurrent_fetches,
        &session.stop,
        &session.progress,
    )
    .await;

    let snapshot_path = config.output_dir.join(SNAPSHOT_FILE_NAME);
    save_snapshot(&outcome.dataset, &snapshot_path)?;
    write_flat(&outcome.dataset, &output)?;

    let summary_path = config.output_dir.join(SUMMARY_FILE_NAME);
    Summary::new(
        &outcome.dataset,
        failed_urls(&outcome.failures, FailureKind::Organisation),
        failed_urls(&outcome.failures, FailureKind::Repository),
    )
    .save(&summary_path)?;

    let index = merge_into_index(targets, outcome.targets);
    index.save(&config.target_index)?;

    {
        let mut out = host.output();
        let _ = writeln!(out, "Fetched {} repositories", outcome.dataset.len());
        let _ = writeln!(out, "  {format} listing: {output}");
        let _ = writeln!(out, "  snapshot: {snapshot_path}");
        let _ = writeln!(out, "  summary: {summary_path}");
        if !outcome.skipped.is_empty() {
            let _ = writeln!(out, "Run was stopped, {} targets were not fetched", outcome.skipped.len());
        }
    }
    report_failures(host, &outcome.failures);

    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::commands::host::TestHost;

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn test_unsupported_format_fails_before_fetching() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let config_path = dir.join("oss4climate.toml");
        std::fs::write(&config_path, format!("output_dir = \"{dir}/out\"\n")).unwrap();

        let mut host = TestHost::new();
        let args = GenerateArgs::parse_from([
            "generate-listing",
            "--output",
            "listing.xlsx",
            "-c",
            config_path.as_str(),
            "--cache-dir",
            dir.join("cache").as_str(),
        ]);

        assert!(generate_listing(&mut host, &args).await.is_err());
        assert!(!dir.join("cache").exists());
        assert!(!dir.join("out").exists());
    }
}
