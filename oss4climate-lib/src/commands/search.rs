use super::Host;
use super::common::BaseArgs;
use crate::dataset::{SNAPSHOT_FILE_NAME, load_snapshot};
use crate::hosting::RepositoryRecord;
use crate::search::{ListingSearch, RankedResult, SearchFilter};
use crate::{HashMap, Result};
use camino::Utf8PathBuf;
use chrono::{TimeDelta, Utc};
use clap::Parser;
use ohno::{IntoAppError, bail};
use owo_colors::OwoColorize;
use std::io::Write;

const LOG_TARGET: &str = "    search";

/// Characters of a description shown under each result.
const DESCRIPTION_WIDTH: usize = 100;

#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Words to search for in descriptions and READMEs
    #[arg(value_name = "QUERY", required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Only show repositories in this language (can be repeated)
    #[arg(long = "language", short = 'l', value_name = "LANGUAGE")]
    pub languages: Vec<String>,

    /// Only show repositories updated in the last N days
    #[arg(long, value_name = "DAYS")]
    pub active_within_days: Option<u32>,

    /// Maximum number of results to show
    #[arg(long, short = 'n', default_value_t = 20, value_name = "COUNT")]
    pub limit: usize,

    /// Dataset snapshot to search (default is the snapshot in the output directory)
    #[arg(long, value_name = "PATH")]
    pub dataset: Option<Utf8PathBuf>,

    #[command(flatten)]
    pub base: BaseArgs,
}

/// Rank the repositories of a generated dataset against a keyword query.
pub fn search_dataset<H: Host>(host: &mut H, args: &SearchArgs) -> Result<()> {
    let config = args.base.setup()?;

    let path = args.dataset.clone().unwrap_or_else(|| config.output_dir.join(SNAPSHOT_FILE_NAME));
    if !path.exists() {
        bail!("no dataset at '{path}', run `generate-listing` or `download` first");
    }
    let dataset = load_snapshot(&path)?;

    let active_since = args
        .active_within_days
        .map(|days| {
            TimeDelta::try_days(i64::from(days))
                .and_then(|delta| Utc::now().checked_sub_signed(delta))
                .into_app_err_with(|| format!("{days} days is out of range"))
        })
        .transpose()?;

    let filter = SearchFilter {
        languages: args.languages.clone(),
        active_since,
    };
    let search = ListingSearch::from_records(dataset.records(), &filter);
    log::info!(target: LOG_TARGET, "Indexed {} of {} repositories from '{path}'", search.document_count(), dataset.len());

    let query = args.query.join(" ");
    let results = search.rank(&query);
    let by_url: HashMap<&str, &RepositoryRecord> = dataset.records().map(|r| (r.url.as_str(), r)).collect();

    let use_colors = args.base.color.use_colors(|| {
        use std::io::{IsTerminal, stdout};
        stdout().is_terminal()
    });

    let mut out = host.output();
    if results.is_empty() {
        let _ = writeln!(out, "No repository matches '{query}'");
        return Ok(());
    }

    let _ = writeln!(out, "{} repositories match '{query}'", results.len());
    for (rank, result) in results.iter().take(args.limit).enumerate() {
        let _ = writeln!(out);
        write_result(&mut out, rank + 1, result, by_url.get(result.url.as_str()).copied(), use_colors);
    }

    if results.len() > args.limit {
        let _ = writeln!(out, "\n{} more not shown, use --limit to see them", results.len() - args.limit);
    }

    Ok(())
}

fn write_result<W: Write>(out: &mut W, rank: usize, result: &RankedResult, record: Option<&RepositoryRecord>, use_colors: bool) {
    let url = if use_colors {
        result.url.bold().to_string()
    } else {
        result.url.clone()
    };
    let score = format!("{:.2}", result.ranking);
    let score = if use_colors { score.green().to_string() } else { score };
    let _ = writeln!(out, "{rank:>3}. {url}  ({score})");

    let Some(record) = record else {
        return;
    };

    if let Some(description) = record.description.as_deref().filter(|d| !d.is_empty()) {
        let mut shown: String = description.chars().take(DESCRIPTION_WIDTH).collect();
        if description.chars().count() > DESCRIPTION_WIDTH {
            shown.push_str("...");
        }
        let _ = writeln!(out, "     {shown}");
    }

    let details = [
        record.language.as_deref(),
        record.license.as_deref(),
        Some(&*format!("updated {}", record.latest_update.format("%Y-%m-%d"))),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" | ");

    if use_colors {
        let _ = writeln!(out, "     {}", details.dimmed());
    } else {
        let _ = writeln!(out, "     {details}");
    }
}
