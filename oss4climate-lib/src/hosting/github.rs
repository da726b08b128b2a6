//! GitHub REST client.

use super::{HostingConfig, RepositoryRecord};
use crate::Result;
use crate::fetch::Fetcher;
use crate::targets::github_path_block;
use chrono::{DateTime, Utc};
use ohno::{IntoAppError, bail};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::collections::BTreeMap;

const LOG_TARGET: &str = "    github";

/// Size of the unpaginated pull request page; a full page means the count is unknown.
const PULL_REQUEST_PAGE_SIZE: usize = 30;

#[derive(Debug, Deserialize)]
struct OrgRepository {
    name: String,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct Repository {
    name: String,
    html_url: String,
    homepage: Option<String>,
    description: Option<String>,
    license: Option<License>,
    language: Option<String>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    fork: bool,
    parent: Option<Parent>,
}

#[derive(Debug, Deserialize)]
struct License {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Parent {
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct Branch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    commit: Commit,
}

#[derive(Debug, Deserialize)]
struct Commit {
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    state: String,
}

/// Pick the branch to read from.
///
/// A lone branch wins outright, then `main`, then `master`. Anything else is unresolved.
#[must_use]
pub fn select_branch(names: &[String]) -> Option<String> {
    match names {
        [only] => Some(only.clone()),
        _ => ["main", "master"]
            .into_iter()
            .find(|candidate| names.iter().any(|n| n == candidate))
            .map(ToString::to_string),
    }
}

/// A full page means more pull requests exist than were listed, so the count is unknown.
fn count_open_pull_requests(pulls: &[PullRequest]) -> Option<u32> {
    if pulls.len() >= PULL_REQUEST_PAGE_SIZE {
        return None;
    }
    u32::try_from(pulls.iter().filter(|p| p.state == "open").count()).ok()
}

/// Client for the GitHub REST API and raw content host.
#[derive(Debug)]
pub struct GitHubClient<'a> {
    fetcher: &'a Fetcher,
    api_base: String,
    raw_base: String,
    headers: HeaderMap,
}

impl<'a> GitHubClient<'a> {
    pub fn new(fetcher: &'a Fetcher, config: &HostingConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        let _ = headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));

        if let Some(token) = &config.github_token {
            let mut auth_val = HeaderValue::from_str(&format!("Bearer {token}"))?;
            auth_val.set_sensitive(true);
            let _ = headers.insert(AUTHORIZATION, auth_val);
            log::info!(target: LOG_TARGET, "GitHub running in authenticated mode");
        } else {
            log::info!(target: LOG_TARGET, "GitHub running in public mode");
        }

        Ok(Self {
            fetcher,
            api_base: config.github_api_base.trim_end_matches('/').to_string(),
            raw_base: config.github_raw_base.trim_end_matches('/').to_string(),
            headers,
        })
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let value = self.fetcher.get_json(url, &self.headers).await?;
        serde_json::from_value(value).into_app_err_with(|| format!("decoding response from '{url}'"))
    }

    /// List the repositories of an organisation, keyed by name. Only the first page is read.
    pub async fn list_repositories(&self, org_url: &str) -> Result<BTreeMap<String, String>> {
        let org = github_path_block(org_url).into_app_err_with(|| format!("'{org_url}' is not a GitHub URL"))?;

        let repos: Vec<OrgRepository> = self.get(&format!("{}/orgs/{org}/repos", self.api_base)).await?;
        log::debug!(target: LOG_TARGET, "Organisation '{org}' lists {} repositories", repos.len());

        Ok(repos.into_iter().map(|r| (r.name, r.html_url)).collect())
    }

    /// Fetch the full record of a repository.
    pub async fn fetch_details(&self, repo_url: &str) -> Result<RepositoryRecord> {
        let path = github_path_block(repo_url).into_app_err_with(|| format!("'{repo_url}' is not a GitHub URL"))?;

        let repo_api_url = format!("{}/repos/{path}", self.api_base);
        let raw_details = self.fetcher.get_json(&repo_api_url, &self.headers).await?;
        let repo: Repository =
            serde_json::from_value(raw_details.clone()).into_app_err_with(|| format!("decoding repository '{path}'"))?;

        let branch = self.resolve_branch(path).await?;

        let last_commit = match &branch {
            Some(branch) => {
                let resp: CommitResponse = self.get(&format!("{}/repos/{path}/commits/{branch}", self.api_base)).await?;
                resp.commit.author.map(|a| a.date)
            }
            None => None,
        };

        let pulls: Vec<PullRequest> = self.get(&format!("{}/repos/{path}/pulls", self.api_base)).await?;
        let open_pull_requests = count_open_pull_requests(&pulls);

        let readme = match &branch {
            Some(branch) => match self.readme(path, branch).await {
                Ok(readme) => readme,
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Could not fetch README of '{path}': {e:#}");
                    None
                }
            },
            None => None,
        };

        Ok(RepositoryRecord {
            id: path.to_string(),
            name: repo.name,
            organisation: path.split('/').next().map(ToString::to_string),
            url: repo.html_url,
            website: repo.homepage.filter(|h| !h.trim().is_empty()),
            description: repo.description,
            license: repo.license.and_then(|l| l.name),
            language: repo.language,
            latest_update: repo.updated_at,
            last_commit,
            open_pull_requests,
            master_branch: branch,
            readme,
            is_fork: repo.fork,
            forked_from: repo.parent.map(|p| p.html_url),
            raw_details,
        })
    }

    /// Fetch the README of a repository on its resolved branch.
    pub async fn fetch_readme(&self, repo_url: &str) -> Result<Option<String>> {
        let path = github_path_block(repo_url).into_app_err_with(|| format!("'{repo_url}' is not a GitHub URL"))?;

        let Some(branch) = self.resolve_branch(path).await? else {
            bail!("unable to select a branch for '{repo_url}'");
        };

        self.readme(path, &branch).await
    }

    async fn resolve_branch(&self, path: &str) -> Result<Option<String>> {
        let branches: Vec<Branch> = self.get(&format!("{}/repos/{path}/branches", self.api_base)).await?;
        let names: Vec<String> = branches.into_iter().map(|b| b.name).collect();

        let selected = select_branch(&names);
        if selected.is_none() {
            log::info!(target: LOG_TARGET, "Unable to select branch of '{path}' among {names:?}");
        }

        Ok(selected)
    }

    async fn readme(&self, path: &str, branch: &str) -> Result<Option<String>> {
        let url = format!("{}/{path}/{branch}/README.md", self.raw_base);
        Ok(self.fetcher.get_text(&url, &HeaderMap::new()).await?)
    }
}
