use super::{Dataset, create_parent_dir};
use crate::Result;
use crate::hosting::RepositoryRecord;
use camino::Utf8Path;
use chrono::{DateTime, Utc};
use ohno::{IntoAppError, bail};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};

const CSV_DELIMITER: u8 = b';';

/// Name of the flattened dataset written next to the snapshot.
pub const LISTING_FILE_NAME: &str = "listing_data.csv";

/// Flattened dataset format, picked from the output file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    /// Resolve the format of `path`, failing for anything but `.csv` and `.json`.
    pub fn from_path(path: &Utf8Path) -> Result<Self> {
        match path.extension() {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            Some(other) => bail!("unsupported output format '.{other}' for '{path}', expected .csv or .json"),
            None => bail!("output file '{path}' has no extension, expected .csv or .json"),
        }
    }
}

/// The exported columns. The README and the provider's raw details are not exported.
#[derive(Debug, Serialize)]
struct FlatRecord<'a> {
    id: &'a str,
    name: &'a str,
    organisation: Option<&'a str>,
    url: &'a str,
    website: Option<&'a str>,
    description: Option<&'a str>,
    license: Option<&'a str>,
    language: Option<&'a str>,
    latest_update: DateTime<Utc>,
    last_commit: Option<DateTime<Utc>>,
    open_pull_requests: Option<u32>,
    master_branch: Option<&'a str>,
    is_fork: bool,
    forked_from: Option<&'a str>,
}

impl<'a> From<&'a RepositoryRecord> for FlatRecord<'a> {
    fn from(r: &'a RepositoryRecord) -> Self {
        Self {
            id: &r.id,
            name: &r.name,
            organisation: r.organisation.as_deref(),
            url: &r.url,
            website: r.website.as_deref(),
            description: r.description.as_deref(),
            license: r.license.as_deref(),
            language: r.language.as_deref(),
            latest_update: r.latest_update,
            last_commit: r.last_commit,
            open_pull_requests: r.open_pull_requests,
            master_branch: r.master_branch.as_deref(),
            is_fork: r.is_fork,
            forked_from: r.forked_from.as_deref(),
        }
    }
}

/// JSON records additionally carry the README.
#[derive(Debug, Serialize)]
struct JsonRecord<'a> {
    #[serde(flatten)]
    flat: FlatRecord<'a>,
    readme: Option<&'a str>,
}

/// One row of a flattened dataset read back in. The README is only present in JSON.
#[derive(Debug, Deserialize)]
struct FlatRow {
    id: String,
    name: String,
    organisation: Option<String>,
    url: String,
    website: Option<String>,
    description: Option<String>,
    license: Option<String>,
    language: Option<String>,
    latest_update: DateTime<Utc>,
    last_commit: Option<DateTime<Utc>>,
    open_pull_requests: Option<u32>,
    master_branch: Option<String>,
    is_fork: bool,
    forked_from: Option<String>,
    #[serde(default)]
    readme: Option<String>,
}

impl From<FlatRow> for RepositoryRecord {
    fn from(row: FlatRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            organisation: row.organisation,
            url: row.url,
            website: row.website,
            description: row.description,
            license: row.license,
            language: row.language,
            latest_update: row.latest_update,
            last_commit: row.last_commit,
            open_pull_requests: row.open_pull_requests,
            master_branch: row.master_branch,
            readme: row.readme,
            is_fork: row.is_fork,
            forked_from: row.forked_from,
            raw_details: serde_json::Value::Null,
        }
    }
}

/// Rebuild a dataset from flattened text in `format`.
///
/// Columns that are not exported come back empty.
pub fn parse_flat(text: &str, format: OutputFormat) -> Result<Dataset> {
    let rows: Vec<FlatRow> = match format {
        OutputFormat::Csv => csv::ReaderBuilder::new()
            .delimiter(CSV_DELIMITER)
            .from_reader(text.as_bytes())
            .deserialize()
            .collect::<core::result::Result<_, csv::Error>>()?,
        OutputFormat::Json => serde_json::from_str(text)?,
    };

    Ok(Dataset::from_records(rows.into_iter().map(RepositoryRecord::from)))
}

fn generate_csv<W: Write>(dataset: &Dataset, writer: W) -> Result<()> {
    let mut csv = csv::WriterBuilder::new().delimiter(CSV_DELIMITER).from_writer(writer);
    for record in dataset.records() {
        csv.serialize(FlatRecord::from(record))?;
    }
    csv.flush()?;
    Ok(())
}

fn generate_json<W: Write>(dataset: &Dataset, writer: W) -> Result<()> {
    let records: Vec<_> = dataset
        .records()
        .map(|r| JsonRecord {
            flat: FlatRecord::from(r),
            readme: r.readme.as_deref(),
        })
        .collect();
    serde_json::to_writer_pretty(writer, &records)?;
    Ok(())
}

/// Write the dataset to `path` in the format its extension names.
pub fn write_flat(dataset: &Dataset, path: &Utf8Path) -> Result<()> {
    let format = OutputFormat::from_path(path)?;
    create_parent_dir(path)?;

    let file = File::create(path).into_app_err_with(|| format!("creating output file '{path}'"))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Csv => generate_csv(dataset, &mut writer)?,
        OutputFormat::Json => generate_json(dataset, &mut writer)?,
    }

    writer.flush().into_app_err_with(|| format!("flushing output file '{path}'"))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::super::test_records::record;
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(OutputFormat::from_path(Utf8Path::new("out/data.csv")).unwrap(), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_path(Utf8Path::new("data.json")).unwrap(), OutputFormat::Json);
        let _ = OutputFormat::from_path(Utf8Path::new("data.xlsx")).unwrap_err();
        let _ = OutputFormat::from_path(Utf8Path::new("data")).unwrap_err();
    }

    #[test]
    fn csv_uses_semicolons_and_drops_readme() {
        let mut out = Vec::new();
        generate_csv(&Dataset::from_records([record("acme/a")]), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with("id;name;organisation;url;"));
        assert!(!header.contains("readme"));
        assert!(!header.contains("raw_details"));

        let row = lines.next().unwrap();
        assert!(row.starts_with("acme/a;a;acme;https://github.com/acme/a;;"));
        // The description contains the delimiter, so it is quoted.
        assert!(row.contains("\"a; a tool\""));
        assert!(lines.next().is_none());
    }

    #[test]
    fn json_keeps_readme_but_not_raw_details() {
        let mut out = Vec::new();
        generate_json(&Dataset::from_records([record("acme/a")]), &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        let first = &value[0];
        assert_eq!(first["id"], "acme/a");
        assert_eq!(first["readme"], "# Readme\n\nSolar things.");
        assert!(first.get("raw_details").is_none());
        assert_eq!(first["open_pull_requests"], 2);
    }

    #[test]
    fn csv_reads_back_without_readme() {
        let mut out = Vec::new();
        generate_csv(&Dataset::from_records([record("acme/a"), record("grid/sim")]), &mut out).unwrap();

        let dataset = parse_flat(&String::from_utf8(out).unwrap(), OutputFormat::Csv).unwrap();
        assert_eq!(dataset.len(), 2);

        let read = dataset.get("acme/a").unwrap();
        let original = record("acme/a");
        assert_eq!(read.description, original.description);
        assert_eq!(read.open_pull_requests, Some(2));
        assert_eq!(read.latest_update, original.latest_update);
        assert_eq!(read.website, None);
        assert_eq!(read.readme, None);
    }

    #[test]
    fn json_reads_back_with_readme() {
        let mut out = Vec::new();
        generate_json(&Dataset::from_records([record("acme/a")]), &mut out).unwrap();

        let dataset = parse_flat(&String::from_utf8(out).unwrap(), OutputFormat::Json).unwrap();
        assert_eq!(dataset.get("acme/a").unwrap().readme.as_deref(), Some("# Readme\n\nSolar things."));
    }

    #[test]
    fn malformed_csv_is_rejected() {
        let _ = parse_flat("id;name\nacme/a;a\n", OutputFormat::Csv).unwrap_err();
    }

    #[test]
    fn unsupported_extension_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("data.txt")).unwrap();

        let _ = write_flat(&Dataset::default(), &path).unwrap_err();
        assert!(!path.exists());
    }
}
