//! Integration tests driving the commands through `run`

use camino::Utf8PathBuf;
use oss4climate_lib::targets::TargetSet;
use oss4climate_lib::{Host, run};
use std::io::Write;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PUBLISHED_SUMMARY: &str = r#"organisations = ["acme"]
language = ["Python"]
licences = ["MIT License"]

[statistics]
repositories = 1
organisations = 1

[failures]
organisations = []
repositories = []
"#;

const PUBLISHED_LISTING: &str = "\
id;name;organisation;url;website;description;license;language;latest_update;last_commit;open_pull_requests;master_branch;is_fork;forked_from
acme/solar;solar;acme;https://github.com/acme/solar;;Solar production forecasting;MIT License;Python;2024-03-01T12:00:00Z;;3;main;false;
";

/// Host that captures output in memory
#[derive(Debug, Default)]
struct CapturingHost {
    output_buf: Vec<u8>,
    error_buf: Vec<u8>,
    exit_code: Option<i32>,
}

impl CapturingHost {
    fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output_buf).into_owned()
    }
}

impl Host for CapturingHost {
    fn output(&mut self) -> impl Write {
        &mut self.output_buf
    }

    fn error(&mut self) -> impl Write {
        &mut self.error_buf
    }

    fn exit(&mut self, code: i32) {
        self.exit_code = Some(code);
    }
}

struct Workspace {
    _dir: tempfile::TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("temp dir is not UTF-8");
        Self { _dir: dir, root }
    }

    fn write_config(&self) -> Utf8PathBuf {
        let config = self.root.join("oss4climate.toml");
        std::fs::write(
            &config,
            format!(
                "target_index = \"{}\"\noutput_dir = \"{}\"\n",
                self.root.join("repo_index.toml"),
                self.root.join("out")
            ),
        )
        .expect("Failed to write config");
        config
    }
}

#[tokio::test]
async fn test_init_then_validate() {
    let ws = Workspace::new();
    let config = ws.root.join("generated.toml");

    let mut host = CapturingHost::default();
    run(&mut host, ["oss4climate", "init", config.as_str()]).await.unwrap();
    assert!(config.exists());

    let mut host = CapturingHost::default();
    run(&mut host, ["oss4climate", "validate", "-c", config.as_str()]).await.unwrap();
    assert!(host.output_str().contains("Configuration file is valid"));
    assert_eq!(host.exit_code, None);
}

#[tokio::test]
async fn test_validate_reports_bad_config() {
    let ws = Workspace::new();
    let config = ws.root.join("bad.toml");
    std::fs::write(&config, "request_delay_ms = \"fast\"\n").unwrap();

    let mut host = CapturingHost::default();
    let _ = run(&mut host, ["oss4climate", "validate", "-c", config.as_str()]).await.unwrap_err();
    assert_eq!(host.exit_code, Some(1));
    assert!(String::from_utf8_lossy(&host.error_buf).contains("Configuration validation failed"));
}

#[tokio::test]
async fn test_add_then_expand_organisations() {
    let ws = Workspace::new();
    let config = ws.write_config();

    let mut host = CapturingHost::default();
    run(
        &mut host,
        [
            "oss4climate",
            "add",
            "https://github.com/acme/wind",
            "https://www.github.com/zeta/grid/",
            "https://github.com/acme/wind/blob/main/README.md",
            "-c",
            config.as_str(),
        ],
    )
    .await
    .unwrap();

    let index = TargetSet::load(&ws.root.join("repo_index.toml")).unwrap();
    assert_eq!(index.github_repositories, ["https://github.com/acme/wind", "https://github.com/zeta/grid"]);
    assert_eq!(index.unknown, ["https://github.com/acme/wind/blob/main/README.md"]);

    let orgs = ws.root.join("orgs.toml");
    let mut host = CapturingHost::default();
    run(
        &mut host,
        ["oss4climate", "expand-organisations", "--output", orgs.as_str(), "-c", config.as_str()],
    )
    .await
    .unwrap();

    let expanded = TargetSet::load(&orgs).unwrap();
    assert_eq!(expanded.github_organisations, ["https://github.com/acme", "https://github.com/zeta"]);
}

#[tokio::test]
async fn test_search_without_dataset_fails() {
    let ws = Workspace::new();
    let config = ws.write_config();

    let mut host = CapturingHost::default();
    let err = run(&mut host, ["oss4climate", "search", "solar", "-c", config.as_str()])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("generate-listing"), "{err}");
}

async fn publish(server: &MockServer, file: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/oss4climate/{file}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_download_then_search() {
    let ws = Workspace::new();
    let config = ws.write_config();
    let server = MockServer::start().await;
    publish(&server, "summary.toml", PUBLISHED_SUMMARY).await;
    publish(&server, "listing_data.csv", PUBLISHED_LISTING).await;

    let url = format!("{}/oss4climate/", server.uri());
    let cache = ws.root.join("cache");
    let mut host = CapturingHost::default();
    run(
        &mut host,
        ["oss4climate", "download", "--url", url.as_str(), "--cache-dir", cache.as_str(), "-c", config.as_str()],
    )
    .await
    .unwrap();
    assert!(host.output_str().contains("Downloaded 1 repositories"), "{}", host.output_str());
    assert_eq!(std::fs::read_to_string(ws.root.join("out/summary.toml")).unwrap(), PUBLISHED_SUMMARY);
    assert!(ws.root.join("out/listing_data.csv").exists());

    let mut host = CapturingHost::default();
    run(&mut host, ["oss4climate", "search", "forecasting", "-c", config.as_str()]).await.unwrap();
    assert!(host.output_str().contains("https://github.com/acme/solar"), "{}", host.output_str());
}

#[tokio::test]
async fn test_download_missing_summary_fails() {
    let ws = Workspace::new();
    let config = ws.write_config();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oss4climate/summary.toml"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/oss4climate", server.uri());
    let cache = ws.root.join("cache");
    let mut host = CapturingHost::default();
    let err = run(
        &mut host,
        ["oss4climate", "download", "--url", url.as_str(), "--cache-dir", cache.as_str(), "-c", config.as_str()],
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("was not found"), "{err}");
    assert!(!ws.root.join("out").exists());
}
