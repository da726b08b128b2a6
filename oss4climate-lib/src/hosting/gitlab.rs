//! GitLab REST v4 client.
//!
//! The API host is taken from each URL, so self-hosted instances work the same way
//! as `gitlab.com`.

use super::{HostingConfig, RepositoryRecord};
use crate::Result;
use crate::fetch::Fetcher;
use crate::targets::split_host_and_path;
use chrono::{DateTime, Utc};
use ohno::{IntoAppError, bail};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::collections::BTreeMap;

const LOG_TARGET: &str = "    gitlab";

/// Size of GitLab's default page; a full page means the count is unknown.
const MERGE_REQUEST_PAGE_SIZE: usize = 20;

/// Characters escaped in a project or group path, matching form encoding of `/`.
const PATH_ID: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

#[derive(Debug, Deserialize)]
struct GroupProject {
    name: String,
    web_url: String,
}

#[derive(Debug, Deserialize)]
struct Project {
    name: String,
    web_url: String,
    description: Option<String>,
    updated_at: DateTime<Utc>,
    last_activity_at: Option<DateTime<Utc>>,
    default_branch: Option<String>,
    namespace: Option<Namespace>,
    readme_url: Option<String>,
    #[serde(rename = "_links")]
    links: Option<Links>,
    forked_from_project: Option<ForkedFrom>,
}

#[derive(Debug, Deserialize)]
struct Namespace {
    name: Option<String>,
    web_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Links {
    merge_requests: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForkedFrom {
    namespace: Option<Namespace>,
}

#[derive(Debug, Deserialize)]
struct MergeRequest {
    state: Option<String>,
}

/// Rewrite a README "blob" view URL into its raw download URL.
#[must_use]
pub fn raw_readme_url(readme_url: &str) -> String {
    format!("{}?inline=false", readme_url.replacen("/blob/", "/raw/", 1))
}

fn count_open_merge_requests(requests: &[MergeRequest]) -> Option<u32> {
    if requests.len() >= MERGE_REQUEST_PAGE_SIZE {
        return None;
    }

    let open = requests
        .iter()
        .filter(|mr| matches!(mr.state.as_deref(), Some("opened" | "open")))
        .count();
    u32::try_from(open).ok()
}

/// Splits a GitLab URL into its API root and URL-encoded path identifier.
fn api_target(url: &str) -> Result<(String, String, String)> {
    let (base, block) = split_host_and_path(url).into_app_err_with(|| format!("'{url}' is not a valid GitLab URL"))?;
    if block.is_empty() {
        bail!("'{url}' does not name a GitLab group or project");
    }

    let encoded = utf8_percent_encode(&block, PATH_ID).to_string();
    Ok((format!("{base}/api/v4"), encoded, base))
}

/// Client for GitLab instances.
#[derive(Debug)]
pub struct GitLabClient<'a> {
    fetcher: &'a Fetcher,
    headers: HeaderMap,
}

impl<'a> GitLabClient<'a> {
    pub fn new(fetcher: &'a Fetcher, config: &HostingConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.gitlab_token {
            let mut token_val = HeaderValue::from_str(token)?;
            token_val.set_sensitive(true);
            let _ = headers.insert("private-token", token_val);
            log::info!(target: LOG_TARGET, "GitLab running in authenticated mode");
        } else {
            log::info!(target: LOG_TARGET, "GitLab running in public mode");
        }

        Ok(Self { fetcher, headers })
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let value = self.fetcher.get_json(url, &self.headers).await?;
        serde_json::from_value(value).into_app_err_with(|| format!("decoding response from '{url}'"))
    }

    /// List the projects of a group, keyed by name. Only the first page is read.
    pub async fn list_repositories(&self, group_url: &str) -> Result<BTreeMap<String, String>> {
        let (api, group_id, _) = api_target(group_url)?;

        let projects: Vec<GroupProject> = self.get(&format!("{api}/groups/{group_id}/projects")).await?;
        log::debug!(target: LOG_TARGET, "Group '{group_url}' lists {} projects", projects.len());

        Ok(projects.into_iter().map(|p| (p.name, p.web_url)).collect())
    }

    /// Fetch the full record of a project.
    pub async fn fetch_details(&self, project_url: &str) -> Result<RepositoryRecord> {
        let (api, project_id, base) = api_target(project_url)?;

        let raw_details = self.fetcher.get_json(&format!("{api}/projects/{project_id}"), &self.headers).await?;
        let project: Project =
            serde_json::from_value(raw_details.clone()).into_app_err_with(|| format!("decoding project '{project_url}'"))?;

        let open_pull_requests = match project.links.as_ref().and_then(|l| l.merge_requests.as_deref()) {
            Some(mr_url) => match self.get::<Vec<MergeRequest>>(mr_url).await {
                Ok(requests) => count_open_merge_requests(&requests),
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Could not fetch merge requests of '{project_url}': {e:#}");
                    None
                }
            },
            None => None,
        };

        let readme = match project.readme_url.as_deref() {
            Some(readme_url) => match self.fetcher.get_text(&raw_readme_url(readme_url), &HeaderMap::new()).await {
                Ok(readme) => readme,
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Could not fetch README of '{project_url}': {e}");
                    None
                }
            },
            None => None,
        };

        let forked_from = project
            .forked_from_project
            .and_then(|f| f.namespace)
            .and_then(|n| n.web_url);

        let host = base.split_once("://").map_or(base.as_str(), |(_, host)| host);
        let (_, block) = split_host_and_path(project_url).unwrap_or_default();

        Ok(RepositoryRecord {
            id: format!("{host}/{block}"),
            name: project.name,
            organisation: project.namespace.and_then(|n| n.name),
            url: project.web_url,
            website: None,
            description: project.description,
            // Not exposed by the project resource
            license: Some("?".to_string()),
            language: None,
            latest_update: project.updated_at,
            last_commit: project.last_activity_at,
            open_pull_requests,
            master_branch: project.default_branch,
            readme,
            is_fork: forked_from.is_some(),
            forked_from,
            raw_details,
        })
    }

    /// Fetch the README of a project through its raw download URL.
    pub async fn fetch_readme(&self, project_url: &str) -> Result<Option<String>> {
        let (api, project_id, _) = api_target(project_url)?;

        let project: Project = self.get(&format!("{api}/projects/{project_id}")).await?;
        let Some(readme_url) = project.readme_url else {
            return Ok(None);
        };

        Ok(self.fetcher.get_text(&raw_readme_url(&readme_url), &HeaderMap::new()).await?)
    }
}
