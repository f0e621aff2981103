use serde_json::json;
use std::fs;
use tempfile::TempDir;
use toolbelt::config::{HttpConfig, RegistryConfig};
use toolbelt::licenses::{load_manifests, render_markdown, PackageSource};
use toolbelt::{Fetcher, RegistryClient, ToolError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn registry() -> (MockServer, RegistryClient) {
    let server = MockServer::start().await;
    let documents = [
        ("/pypi/requests/json", json!({ "info": { "version": "2.32.3", "license": "Apache-2.0" } })),
        (
            "/pypi/rich/json",
            json!({
                "info": {
                    "version": "13.7.1",
                    "license": null,
                    "classifiers": ["License :: OSI Approved :: MIT License"]
                }
            }),
        ),
        ("/package/conda-forge/numpy", json!({ "latest_version": "2.0.1", "license": "BSD-3-Clause" })),
    ];
    for (route, body) in documents {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
    }

    let config = RegistryConfig {
        pypi_url: server.uri(),
        anaconda_url: server.uri(),
        conda_channel: "conda-forge".to_string(),
    };
    let http = HttpConfig { timeout_seconds: 5, ..Default::default() };
    let client = RegistryClient::new(Fetcher::new(&http).unwrap(), config);
    (server, client)
}

#[tokio::test]
async fn one_row_per_package_with_placeholders_for_misses() {
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join("environment.yml"),
        "name: demo\ndependencies:\n  - numpy=1.26\n  - not-on-anaconda\n  - pip:\n      - rich\n",
    )
    .unwrap();
    fs::write(project.path().join("requirements.txt"), "requests==2.31.0\nunknown-pkg>=1.0\n").unwrap();

    let packages = load_manifests(
        &project.path().join("environment.yml"),
        &project.path().join("requirements.txt"),
    )
    .unwrap();
    assert_eq!(packages.len(), 5);
    assert_eq!(packages[0].source, PackageSource::Conda);

    let (server, client) = registry().await;
    Mock::given(method("GET"))
        .and(path("/pypi/unknown-pkg/json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let rows = client.fetch_all(&packages).await;
    assert_eq!(rows.len(), 5);
    assert_eq!(rows.iter().filter(|r| r.license.is_none()).count(), 2);

    let md = render_markdown(&rows);
    let data_rows: Vec<&str> = md.lines().skip(4).collect();
    assert_eq!(
        data_rows,
        vec![
            "| numpy | 1.26 | BSD-3-Clause |",
            "| not-on-anaconda | n/a | n/a |",
            "| rich | 13.7.1 | MIT License |",
            "| requests | 2.31.0 | Apache-2.0 |",
            "| unknown-pkg | n/a | n/a |",
        ]
    );
}

#[tokio::test]
async fn requirements_alone_are_enough() {
    let project = TempDir::new().unwrap();
    fs::write(project.path().join("requirements.txt"), "requests\n").unwrap();

    let packages = load_manifests(
        &project.path().join("environment.yml"),
        &project.path().join("requirements.txt"),
    )
    .unwrap();
    let (_server, client) = registry().await;
    let rows = client.fetch_all(&packages).await;
    assert_eq!(rows[0].version.as_deref(), Some("2.32.3"));
    assert_eq!(rows[0].license.as_deref(), Some("Apache-2.0"));
}

#[test]
fn no_manifest_at_all_is_input_not_found() {
    let project = TempDir::new().unwrap();
    let err = load_manifests(
        &project.path().join("environment.yml"),
        &project.path().join("requirements.txt"),
    )
    .unwrap_err();
    assert!(matches!(err.downcast_ref::<ToolError>(), Some(ToolError::InputNotFound { .. })));
}
