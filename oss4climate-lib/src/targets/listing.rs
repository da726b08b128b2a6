use super::toml_io::{load_toml, save_toml};
use crate::Result;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// A listing of listings: documents that themselves enumerate projects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceListing {
    /// GitHub repositories whose README links to projects.
    pub github_readme_listings: Vec<String>,

    /// GitLab projects whose README links to projects.
    pub gitlab_readme_listings: Vec<String>,

    /// Web pages linking to projects through `<a href>` tags.
    pub webpage_html: Vec<String>,

    pub fault_urls: Vec<String>,
    pub fault_invalid_urls: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ListingDocument {
    #[serde(default)]
    faults: Faults,
    #[serde(default)]
    github_hosted: ReadmeListings,
    #[serde(default)]
    gitlab_hosted: ReadmeListings,
    #[serde(default)]
    webpages: Webpages,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Faults {
    #[serde(default)]
    invalid_urls: Vec<String>,
    #[serde(default)]
    urls: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReadmeListings {
    #[serde(default)]
    readme_listings: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Webpages {
    #[serde(default)]
    html: Vec<String>,
}

fn sort_unique(v: &mut Vec<String>) {
    v.sort_unstable();
    v.dedup();
}

impl ResourceListing {
    #[must_use]
    pub fn merge(a: Self, b: Self) -> Self {
        let mut out = a;
        out.extend(b);
        out
    }

    pub fn extend(&mut self, other: Self) {
        self.github_readme_listings.extend(other.github_readme_listings);
        self.gitlab_readme_listings.extend(other.gitlab_readme_listings);
        self.webpage_html.extend(other.webpage_html);
        self.fault_urls.extend(other.fault_urls);
        self.fault_invalid_urls.extend(other.fault_invalid_urls);
    }

    pub fn dedup_and_sort(&mut self) {
        sort_unique(&mut self.github_readme_listings);
        sort_unique(&mut self.gitlab_readme_listings);
        sort_unique(&mut self.webpage_html);
        sort_unique(&mut self.fault_urls);
        sort_unique(&mut self.fault_invalid_urls);
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let doc: ListingDocument = toml::from_str(text)?;
        Ok(Self {
            github_readme_listings: doc.github_hosted.readme_listings,
            gitlab_readme_listings: doc.gitlab_hosted.readme_listings,
            webpage_html: doc.webpages.html,
            fault_urls: doc.faults.urls,
            fault_invalid_urls: doc.faults.invalid_urls,
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        let mut sorted = self.clone();
        sorted.dedup_and_sort();

        let doc = ListingDocument {
            faults: Faults {
                invalid_urls: sorted.fault_invalid_urls,
                urls: sorted.fault_urls,
            },
            github_hosted: ReadmeListings {
                readme_listings: sorted.github_readme_listings,
            },
            gitlab_hosted: ReadmeListings {
                readme_listings: sorted.gitlab_readme_listings,
            },
            webpages: Webpages { html: sorted.webpage_html },
        };

        Ok(toml::to_string(&doc)?)
    }

    pub fn load(path: &Utf8Path) -> Result<Self> {
        load_toml(path, "listings index", Self::from_toml_str)
    }

    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        save_toml(path, "listings index", &self.to_toml_string()?)
    }
}
