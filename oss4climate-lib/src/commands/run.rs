//! Command dispatch logic for oss4climate

use super::{
    AddArgs, DiscoverArgs, DownloadArgs, ExpandArgs, GenerateArgs, InitArgs, SearchArgs, UpdateListingsArgs, ValidateArgs, add_targets,
    discover, download_dataset, expand_organisations, generate_listing, init_config, search_dataset, update_listings, validate_config,
};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "oss4climate", version, author, long_about = None)]
#[command(about = "Discover, catalog and search open-source climate and energy projects")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find new projects in the configured sources and add them to the target index
    Discover(Box<DiscoverArgs>),
    /// Add repository, organisation or group URLs to the target index
    Add(Box<AddArgs>),
    /// Fetch every indexed target and write the dataset
    GenerateListing(Box<GenerateArgs>),
    /// Write the organisations owning indexed GitHub repositories to a separate index
    ExpandOrganisations(Box<ExpandArgs>),
    /// Refresh the index of curated listings
    UpdateListings(Box<UpdateListingsArgs>),
    /// Download the latest published dataset
    Download(Box<DownloadArgs>),
    /// Search a generated dataset by keywords
    Search(Box<SearchArgs>),
    /// Generate a default configuration file
    Init(InitArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// # Arguments
///
/// * `args` - An iterator of command-line arguments (typically from `std::env::args()`)
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    match &Cli::parse_from(args).command {
        Command::Discover(args) => discover(host, args).await,
        Command::Add(args) => add_targets(host, args),
        Command::GenerateListing(args) => generate_listing(host, args).await,
        Command::ExpandOrganisations(args) => expand_organisations(host, args),
        Command::UpdateListings(args) => update_listings(host, args).await,
        Command::Download(args) => download_dataset(host, args).await,
        Command::Search(args) => search_dataset(host, args),
        Command::Init(args) => init_config(host, args),
        Command::Validate(args) => validate_config(host, args),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_subcommand_names() {
        let cli = Cli::try_parse_from(["oss4climate", "generate-listing", "--output", "out.json"]).unwrap();
        assert!(matches!(cli.command, Command::GenerateListing(_)));

        let cli = Cli::try_parse_from(["oss4climate", "expand-organisations", "--output", "orgs.toml"]).unwrap();
        assert!(matches!(cli.command, Command::ExpandOrganisations(_)));

        let cli = Cli::try_parse_from(["oss4climate", "download", "--listing", "listing_data.json"]).unwrap();
        assert!(matches!(cli.command, Command::Download(_)));

        let _ = Cli::try_parse_from(["oss4climate", "add"]).unwrap_err();
        let _ = Cli::try_parse_from(["oss4climate", "search"]).unwrap_err();
    }
}
