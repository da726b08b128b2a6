use super::{Dataset, create_parent_dir};
use crate::Result;
use crate::hosting::RepositoryRecord;
use camino::Utf8Path;
use chrono::{DateTime, Utc};
use ohno::{IntoAppError, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::io::BufReader;

const LOG_TARGET: &str = "  snapshot";

/// File name of the snapshot inside the output directory.
pub const SNAPSHOT_FILE_NAME: &str = "listing_data.bin.zst";

const ZSTD_LEVEL: i32 = 9;

/// One vector per record field, all of the same length.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Columns {
    id: Vec<String>,
    name: Vec<String>,
    organisation: Vec<Option<String>>,
    url: Vec<String>,
    website: Vec<Option<String>>,
    description: Vec<Option<String>>,
    license: Vec<Option<String>>,
    language: Vec<Option<String>>,
    latest_update: Vec<DateTime<Utc>>,
    last_commit: Vec<Option<DateTime<Utc>>>,
    open_pull_requests: Vec<Option<u32>>,
    master_branch: Vec<Option<String>>,
    readme: Vec<Option<String>>,
    is_fork: Vec<bool>,
    forked_from: Vec<Option<String>>,
    raw_details: Vec<Value>,
}

impl Columns {
    fn from_dataset(dataset: &Dataset) -> Self {
        let mut columns = Self::default();
        for r in dataset.records().cloned() {
            columns.id.push(r.id);
            columns.name.push(r.name);
            columns.organisation.push(r.organisation);
            columns.url.push(r.url);
            columns.website.push(r.website);
            columns.description.push(r.description);
            columns.license.push(r.license);
            columns.language.push(r.language);
            columns.latest_update.push(r.latest_update);
            columns.last_commit.push(r.last_commit);
            columns.open_pull_requests.push(r.open_pull_requests);
            columns.master_branch.push(r.master_branch);
            columns.readme.push(r.readme);
            columns.is_fork.push(r.is_fork);
            columns.forked_from.push(r.forked_from);
            columns.raw_details.push(r.raw_details);
        }
        columns
    }

    fn lengths(&self) -> [usize; 16] {
        [
            self.id.len(),
            self.name.len(),
            self.organisation.len(),
            self.url.len(),
            self.website.len(),
            self.description.len(),
            self.license.len(),
            self.language.len(),
            self.latest_update.len(),
            self.last_commit.len(),
            self.open_pull_requests.len(),
            self.master_branch.len(),
            self.readme.len(),
            self.is_fork.len(),
            self.forked_from.len(),
            self.raw_details.len(),
        ]
    }

    fn into_dataset(self) -> Result<Dataset> {
        let lengths = self.lengths();
        if lengths.iter().any(|&len| len != lengths[0]) {
            bail!("snapshot columns have mismatched lengths: {lengths:?}");
        }

        let mut organisation = self.organisation.into_iter();
        let mut url = self.url.into_iter();
        let mut website = self.website.into_iter();
        let mut description = self.description.into_iter();
        let mut license = self.license.into_iter();
        let mut language = self.language.into_iter();
        let mut latest_update = self.latest_update.into_iter();
        let mut last_commit = self.last_commit.into_iter();
        let mut open_pull_requests = self.open_pull_requests.into_iter();
        let mut master_branch = self.master_branch.into_iter();
        let mut readme = self.readme.into_iter();
        let mut is_fork = self.is_fork.into_iter();
        let mut forked_from = self.forked_from.into_iter();
        let mut raw_details = self.raw_details.into_iter();

        let mut records = Vec::with_capacity(lengths[0]);
        for (id, name) in self.id.into_iter().zip(self.name) {
            let (
                Some(organisation),
                Some(url),
                Some(website),
                Some(description),
                Some(license),
                Some(language),
                Some(latest_update),
                Some(last_commit),
                Some(open_pull_requests),
                Some(master_branch),
                Some(readme),
                Some(is_fork),
                Some(forked_from),
                Some(raw_details),
            ) = (
                organisation.next(),
                url.next(),
                website.next(),
                description.next(),
                license.next(),
                language.next(),
                latest_update.next(),
                last_commit.next(),
                open_pull_requests.next(),
                master_branch.next(),
                readme.next(),
                is_fork.next(),
                forked_from.next(),
                raw_details.next(),
            )
            else {
                bail!("snapshot column ended early at record '{id}'");
            };

            records.push(RepositoryRecord {
                id,
                name,
                organisation,
                url,
                website,
                description,
                license,
                language,
                latest_update,
                last_commit,
                open_pull_requests,
                master_branch,
                readme,
                is_fork,
                forked_from,
                raw_details,
            });
        }

        Ok(Dataset::from_records(records))
    }
}

/// Write the dataset as zstd-compressed columnar JSON.
pub fn save_snapshot(dataset: &Dataset, path: &Utf8Path) -> Result<()> {
    create_parent_dir(path)?;

    let json = serde_json::to_vec(&Columns::from_dataset(dataset)).into_app_err("serializing dataset snapshot")?;
    let compressed = zstd::encode_all(json.as_slice(), ZSTD_LEVEL).into_app_err("compressing dataset snapshot")?;
    fs::write(path, &compressed).into_app_err_with(|| format!("writing dataset snapshot '{path}'"))?;

    log::debug!(target: LOG_TARGET, "Wrote {} records ({} bytes) to '{path}'", dataset.len(), compressed.len());
    Ok(())
}

/// Read a dataset written by [`save_snapshot`].
pub fn load_snapshot(path: &Utf8Path) -> Result<Dataset> {
    let file = File::open(path).into_app_err_with(|| format!("opening dataset snapshot '{path}'"))?;
    let decoder = zstd::Decoder::new(file).into_app_err_with(|| format!("could not create zstd decoder for '{path}'"))?;
    let columns: Columns =
        serde_json::from_reader(BufReader::new(decoder)).into_app_err_with(|| format!("decoding dataset snapshot '{path}'"))?;

    let dataset = columns.into_dataset()?;
    log::debug!(target: LOG_TARGET, "Loaded {} records from '{path}'", dataset.len());
    Ok(dataset)
}
