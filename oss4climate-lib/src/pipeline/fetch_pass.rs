use super::{Clients, Failure, FailureKind, Progress, StopSignal};
use crate::Result;
use crate::dataset::Dataset;
use crate::hosting::RepositoryRecord;
use crate::targets::{Platform, TargetSet, is_ambiguous_organisation};
use core::sync::atomic::{AtomicU64, Ordering};
use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

const LOG_TARGET: &str = "     fetch";

/// Special repository holding an organisation's profile, not a project.
const PROFILE_REPOSITORY_SUFFIX: &str = "/.github";

/// Everything a fetch pass produced.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub dataset: Dataset,

    /// The input targets with every expanded organisation's repositories added.
    pub targets: TargetSet,
    pub failures: Vec<Failure>,

    /// Targets not attempted because the run was stopped.
    pub skipped: Vec<String>,
}

enum Attempt<T> {
    Done(Result<T>),
    Skipped,
}

/// Bounds how many targets are in progress and tracks completions.
struct Work<'a> {
    clients: &'a Clients<'a>,
    stop: &'a StopSignal,
    limiter: Semaphore,
    completed: Arc<AtomicU64>,
}

impl Work<'_> {
    async fn run<T, F>(&self, task: F) -> Attempt<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _permit = self.limiter.acquire().await.expect("semaphore is never closed");
        if self.stop.is_stopped() {
            return Attempt::Skipped;
        }

        let result = task.await;
        let _ = self.completed.fetch_add(1, Ordering::Relaxed);
        Attempt::Done(result)
    }

    async fn list(&self, platform: Platform, url: &str) -> Attempt<BTreeMap<String, String>> {
        match platform {
            Platform::GitHub => self.run(self.clients.github.list_repositories(url)).await,
            Platform::GitLab => self.run(self.clients.gitlab.list_repositories(url)).await,
        }
    }

    async fn details(&self, platform: Platform, url: &str) -> Attempt<RepositoryRecord> {
        match platform {
            Platform::GitHub => self.run(self.clients.github.fetch_details(url)).await,
            Platform::GitLab => self.run(self.clients.gitlab.fetch_details(url)).await,
        }
    }

    fn track(&self, progress: &dyn Progress, total: usize, what: &'static str) {
        self.completed.store(0, Ordering::Relaxed);
        let completed = Arc::clone(&self.completed);
        let total = total as u64;
        progress.set_determinate(Box::new(move || {
            let current = completed.load(Ordering::Relaxed);
            (total, current, format!("{current}/{total} {what}"))
        }));
    }
}

/// Expand organisations and fetch the details of every repository in `targets`.
///
/// Organisation URLs that name something deeper than an organisation are treated as
/// repositories. At most `max_concurrent` targets are in progress at once; the fetcher
/// further limits each host to its own throttle.
pub async fn fetch_all(
    clients: &Clients<'_>,
    mut targets: TargetSet,
    max_concurrent: usize,
    stop: &StopSignal,
    progress: &dyn Progress,
) -> FetchOutcome {
    let work = &Work {
        clients,
        stop,
        limiter: Semaphore::new(max_concurrent.max(1)),
        completed: Arc::new(AtomicU64::new(0)),
    };

    let mut outcome = FetchOutcome::default();
    targets.dedup_and_sort();

    let mut organisations = Vec::new();
    for (platform, orgs, repos) in [
        (Platform::GitHub, &targets.github_organisations, &mut targets.github_repositories),
        (Platform::GitLab, &targets.gitlab_groups, &mut targets.gitlab_projects),
    ] {
        for org in orgs {
            if is_ambiguous_organisation(org) {
                log::info!(target: LOG_TARGET, "'{org}' is not an organisation, fetching it as a repository");
                repos.push(org.clone());
            } else {
                organisations.push((platform, org.clone()));
            }
        }
    }

    progress.set_phase("Expanding");
    work.track(progress, organisations.len(), "organisations");
    let listed = join_all(
        organisations
            .iter()
            .map(|(platform, url)| async move { (url, *platform, work.list(*platform, url).await) }),
    )
    .await;

    for (url, platform, attempt) in listed {
        match attempt {
            Attempt::Done(Ok(repos)) => {
                log::debug!(target: LOG_TARGET, "'{url}' has {} repositories", repos.len());
                let bucket = match platform {
                    Platform::GitHub => &mut targets.github_repositories,
                    Platform::GitLab => &mut targets.gitlab_projects,
                };
                bucket.extend(repos.into_values());
            }
            Attempt::Done(Err(e)) => {
                log::warn!(target: LOG_TARGET, "Could not list repositories of '{url}': {e:#}");
                outcome.failures.push(Failure::new(url.as_str(), FailureKind::Organisation, e));
            }
            Attempt::Skipped => outcome.skipped.push(url.clone()),
        }
    }

    targets.dedup_and_sort();

    let repositories: Vec<(Platform, &String)> = targets
        .gitlab_projects
        .iter()
        .map(|url| (Platform::GitLab, url))
        .chain(
            targets
                .github_repositories
                .iter()
                .filter(|url| !url.ends_with(PROFILE_REPOSITORY_SUFFIX))
                .map(|url| (Platform::GitHub, url)),
        )
        .collect();

    progress.set_phase("Fetching");
    work.track(progress, repositories.len(), "repositories");
    let fetched = join_all(
        repositories
            .iter()
            .map(|&(platform, url)| async move { (url, work.details(platform, url).await) }),
    )
    .await;

    let mut records = Vec::with_capacity(fetched.len());
    for (url, attempt) in fetched {
        match attempt {
            Attempt::Done(Ok(record)) => records.push(record),
            Attempt::Done(Err(e)) => {
                log::warn!(target: LOG_TARGET, "Could not fetch '{url}': {e:#}");
                outcome.failures.push(Failure::new(url.as_str(), FailureKind::Repository, e));
            }
            Attempt::Skipped => outcome.skipped.push(url.clone()),
        }
    }

    progress.done();

    if !outcome.skipped.is_empty() {
        log::warn!(target: LOG_TARGET, "Run stopped early, {} targets were not fetched", outcome.skipped.len());
    }

    outcome.dataset = Dataset::from_records(records);
    outcome.targets = targets;
    outcome
}
