//! Discovery sources: external listings turned into classified targets.

mod html;
mod lfenergy;
mod listings;
mod markdown;
mod opensustain;

pub use html::{Anchor, find_anchor_hrefs, find_anchors, links_by_section};
pub use lfenergy::{fetch_landscape_targets, fetch_project_page_targets, fetch_project_page_urls, parse_landscape, parse_project_page};
pub use listings::{ListingHarvest, fetch_all};
pub use markdown::find_links;
pub use opensustain::{fetch_listing_of_listings, fetch_opensustain_targets, parse_listing_of_listings};

use crate::Result;
use crate::fetch::Fetcher;
use crate::targets::{TargetSet, isolate_relevant_urls, split_by_class};
use ohno::IntoAppError;
use reqwest::header::HeaderMap;

/// Fetch a page as text, treating a missing page as an error.
pub(crate) async fn fetch_page(fetcher: &Fetcher, url: &str) -> Result<String> {
    fetcher
        .get_text(url, &HeaderMap::new())
        .await?
        .into_app_err_with(|| format!("no page found at '{url}'"))
}

/// Classify the project links of a markdown document.
#[must_use]
pub fn from_markdown_str(markdown: &str) -> TargetSet {
    split_by_class(isolate_relevant_urls(find_links(markdown)))
}

/// Classify the project links of an HTML document.
#[must_use]
pub fn from_html_str(html: &str) -> TargetSet {
    split_by_class(isolate_relevant_urls(find_anchor_hrefs(html, None)))
}

/// Fetch a web page and classify the project links it contains.
pub async fn from_html_page(fetcher: &Fetcher, url: &str) -> Result<TargetSet> {
    Ok(from_html_str(&fetch_page(fetcher, url).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_links_are_classified() {
        let md = "\
- [Org](https://github.com/acme)
- [Tool](https://github.com/acme/toolA)
- [File](https://github.com/acme/toolA/blob/main/x.py)
- [Group](https://gitlab.com/grid)
- [Site](https://example.org)
";
        let set = from_markdown_str(md);

        assert_eq!(set.github_organisations, ["https://github.com/acme"]);
        assert_eq!(set.github_repositories, ["https://github.com/acme/toolA"]);
        assert_eq!(set.gitlab_groups, ["https://gitlab.com/grid"]);
        assert!(set.unknown.is_empty());
        assert!(set.invalid.is_empty());
    }

    #[test]
    fn html_links_are_classified() {
        let html = r#"<a href="https://github.com/acme/tool/">x</a><a href="https://gitlab.com/g/p">y</a><a href="/about">z</a>"#;
        let set = from_html_str(html);

        assert_eq!(set.github_repositories, ["https://github.com/acme/tool"]);
        assert_eq!(set.gitlab_projects, ["https://gitlab.com/g/p"]);
        assert_eq!(set.len(), 2);
    }
}
