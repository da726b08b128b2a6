use super::Host;
use super::common::{BaseArgs, load_target_index};
use crate::Result;
use crate::pipeline::merge_into_index;
use crate::targets::split_by_class;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Repository, organisation or group URLs to add to the index
    #[arg(value_name = "URL", required = true, num_args = 1..)]
    pub urls: Vec<String>,

    #[command(flatten)]
    pub base: BaseArgs,
}

/// Classify URLs given on the command line and merge them into the target index.
pub fn add_targets<H: Host>(host: &mut H, args: &AddArgs) -> Result<()> {
    let config = args.base.setup()?;

    let existing = load_target_index(&config.target_index)?;
    let before = existing.len();

    let found = split_by_class(&args.urls);
    let index = merge_into_index(existing, found);
    index.save(&config.target_index)?;

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
    if !index.unknown.is_empty() || !index.invalid.is_empty() {
        let _ = writeln!(out, "  {} unknown and {} invalid URLs kept aside", index.unknown.len(), index.invalid.len());
    }

    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::commands::host::TestHost;
    use crate::targets::TargetSet;
    use camino::Utf8PathBuf;

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_add_creates_and_extends_index() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let index_path = dir.join("repo_index.toml");
        let config_path = dir.join("oss4climate.toml");
        std::fs::write(&config_path, format!("target_index = \"{index_path}\"\n")).unwrap();

        let mut host = TestHost::new();
        let args = AddArgs::parse_from([
            "add",
            "https://github.com/acme/tool/",
            "https://gitlab.com/grid/ops",
            "not-a-url",
            "-c",
            config_path.as_str(),
        ]);
        add_targets(&mut host, &args).unwrap();

        let index = TargetSet::load(&index_path).unwrap();
        assert_eq!(index.github_repositories, ["https://github.com/acme/tool"]);
        assert_eq!(index.gitlab_projects, ["https://gitlab.com/grid/ops"]);
        assert_eq!(index.invalid, ["not-a-url"]);
        assert!(host.output_str().contains("now holds 3 targets (0 before)"));

        let args = AddArgs::parse_from(["add", "https://github.com/acme", "-c", config_path.as_str()]);
        add_targets(&mut host, &args).unwrap();

        let index = TargetSet::load(&index_path).unwrap();
        assert_eq!(index.github_organisations, ["https://github.com/acme"]);
        assert_eq!(index.github_repositories, ["https://github.com/acme/tool"]);
    }
}
