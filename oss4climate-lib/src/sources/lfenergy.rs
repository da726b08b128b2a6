//! LF Energy: the landscape YAML, the projects index page and the individual project pages.

use super::fetch_page;
use super::html::{find_anchor_hrefs, find_anchors};
use crate::Result;
use crate::fetch::Fetcher;
use crate::targets::{TargetSet, split_by_class, split_host_and_path};
use ohno::IntoAppError;
use serde::Deserialize;

const LOG_TARGET: &str = "  lfenergy";

const PROJECT_ICON_CLASS: &str = "projects-icon";

#[derive(Debug, Deserialize)]
struct Landscape {
    #[serde(default)]
    landscape: Option<Vec<Category>>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(default)]
    subcategories: Option<Vec<Subcategory>>,
}

#[derive(Debug, Deserialize)]
struct Subcategory {
    #[serde(default)]
    items: Option<Vec<Item>>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    repo_url: Option<String>,
}

/// Extract every `repo_url` from the landscape document.
pub fn parse_landscape(yaml: &str) -> Result<Vec<String>> {
    let doc: Landscape = serde_yaml::from_str(yaml).into_app_err("parsing landscape YAML")?;

    Ok(doc
        .landscape
        .unwrap_or_default()
        .into_iter()
        .flat_map(|c| c.subcategories.unwrap_or_default())
        .flat_map(|s| s.items.unwrap_or_default())
        .filter_map(|i| i.repo_url)
        .filter(|url| !url.trim().is_empty())
        .collect())
}

/// Extract the GitHub and GitLab links from a project page's icon bar.
#[must_use]
pub fn parse_project_page(html: &str) -> Vec<String> {
    find_anchor_hrefs(html, Some(PROJECT_ICON_CLASS))
        .into_iter()
        .filter(|href| href.starts_with("https://github.com/") || href.starts_with("https://gitlab."))
        .filter(|href| !href.ends_with(".md"))
        .collect()
}

/// Fetch the landscape document and classify the repositories it lists.
pub async fn fetch_landscape_targets(fetcher: &Fetcher, landscape_url: &str) -> Result<TargetSet> {
    let yaml = fetch_page(fetcher, landscape_url).await?;
    let repos = parse_landscape(&yaml)?;
    log::info!(target: LOG_TARGET, "Landscape lists {} repositories", repos.len());
    Ok(split_by_class(repos))
}

/// Fetch the projects index and return the distinct project page URLs, sorted.
///
/// Project pages are the links under `/projects/` on the index page's own host.
pub async fn fetch_project_page_urls(fetcher: &Fetcher, index_url: &str) -> Result<Vec<String>> {
    let (origin, _) = split_host_and_path(index_url).into_app_err_with(|| format!("'{index_url}' is not a valid URL"))?;
    let prefix = format!("{origin}/projects/");

    let html = fetch_page(fetcher, index_url).await?;
    let mut pages: Vec<String> = find_anchors(&html)
        .into_iter()
        .map(|a| a.href)
        .filter(|href| href.starts_with(&prefix) && href.len() > prefix.len())
        .collect();

    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}

/// Fetch a project page and classify the repositories it links to.
pub async fn fetch_project_page_targets(fetcher: &Fetcher, page_url: &str) -> Result<TargetSet> {
    let html = fetch_page(fetcher, page_url).await?;
    Ok(split_by_class(parse_project_page(&html)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_repo_urls() {
        let yaml = r"
landscape:
  - category:
    name: Grid
    subcategories:
      - subcategory:
        name: Operations
        items:
          - item:
            name: Tool A
            repo_url: https://github.com/acme/toolA
          - item:
            name: No repo
          - item:
            name: Sim
            repo_url: https://gitlab.com/grid/sim
      - subcategory:
        name: Empty
        items:
  - category:
    name: Other
";
        assert_eq!(
            parse_landscape(yaml).unwrap(),
            ["https://github.com/acme/toolA", "https://gitlab.com/grid/sim"]
        );
    }

    #[test]
    fn landscape_without_entries() {
        assert!(parse_landscape("landscape:\n").unwrap().is_empty());
        assert!(parse_landscape("other: 1\n").unwrap().is_empty());
    }

    #[test]
    fn invalid_landscape_is_an_error() {
        let _ = parse_landscape("landscape: [unclosed").unwrap_err();
    }

    #[test]
    fn project_page_icons() {
        let html = r#"
<a class="projects-icon" href="https://github.com/lf-energy/tool">GitHub</a>
<a class="projects-icon" href="https://github.com/lf-energy/tool/blob/main/README.md">Docs</a>
<a class="projects-icon" href="https://gitlab.eclipse.org/energy/thing">GitLab</a>
<a class="projects-icon" href="https://lists.lfenergy.org/g/tool">Mailing list</a>
<a href="https://github.com/lf-energy/unrelated">Footer</a>
"#;
        assert_eq!(
            parse_project_page(html),
            ["https://github.com/lf-energy/tool", "https://gitlab.eclipse.org/energy/thing"]
        );
    }
}
