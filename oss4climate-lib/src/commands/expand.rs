use super::Host;
use super::common::{BaseArgs, load_target_index};
use crate::Result;
use crate::pipeline::organisations_of_repositories;
use camino::Utf8PathBuf;
use clap::Parser;
use ohno::bail;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct ExpandArgs {
    /// Where to write the organisations owning indexed repositories (TOML)
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Utf8PathBuf,

    #[command(flatten)]
    pub base: BaseArgs,
}

/// Write the GitHub organisations owning the indexed repositories to a separate index.
///
/// The result can be reviewed and then merged back with `add`.
pub fn expand_organisations<H: Host>(host: &mut H, args: &ExpandArgs) -> Result<()> {
    if args.output.extension() != Some("toml") {
        bail!("output must be a .toml file, got '{}'", args.output);
    }

    let config = args.base.setup()?;
    let index = load_target_index(&config.target_index)?;

    let organisations = organisations_of_repositories(&index);
    organisations.save(&args.output)?;

    let _ = writeln!(
        host.output(),
        "Wrote {} organisations to '{}'",
        organisations.github_organisations.len(),
        args.output
    );
    Ok(())
}
