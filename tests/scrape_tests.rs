use std::fs;
use tempfile::TempDir;
use toolbelt::config::HttpConfig;
use toolbelt::scrape::{FileNaming, ScrapeOptions};
use toolbelt::{Fetcher, Scraper, ToolError, ToolKind};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scraper(output_dir: &std::path::Path, tool: ToolKind, naming: FileNaming, text_only: bool) -> Scraper {
    let http = HttpConfig { timeout_seconds: 5, ..Default::default() };
    Scraper::new(
        Fetcher::new(&http).unwrap(),
        ScrapeOptions { output_dir: output_dir.to_path_buf(), text_only, naming, tool },
    )
    .unwrap()
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8")
}

/// Serve `body` at `route`, expecting exactly `hits` requests before the
/// server is dropped.
async fn serve(server: &MockServer, route: &str, response: ResponseTemplate, hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn single_url_saved_under_given_name() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/page",
        html("<html><head><style>p{}</style></head><body><p>Hello &amp; bye</p></body></html>"),
        2,
    )
    .await;
    let out = TempDir::new().unwrap();
    let url = format!("{}/page", server.uri());

    let raw = scraper(out.path(), ToolKind::Scrape, FileNaming::Sanitized, false);
    let path = raw.scrape_url(&url, Some("page.html")).await.unwrap();
    assert_eq!(path, out.path().join("page.html"));
    assert!(fs::read_to_string(&path).unwrap().contains("<p>Hello &amp; bye</p>"));

    let text = scraper(out.path(), ToolKind::Scrape, FileNaming::Sanitized, true);
    let path = text.scrape_url(&url, None).await.unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("scrape-http"), "{}", name);
    assert!(name.ends_with(".txt"));
    let saved = fs::read_to_string(&path).unwrap();
    assert!(saved.contains("Hello & bye"));
    assert!(!saved.contains("p{}"));
}

#[tokio::test]
async fn list_keeps_going_past_bad_urls() {
    let server = MockServer::start().await;
    serve(&server, "/one", html("first"), 1).await;
    serve(&server, "/two", html("second"), 1).await;
    serve(&server, "/missing", ResponseTemplate::new(404), 1).await;
    let out = TempDir::new().unwrap();
    let list = out.path().join("urls.txt");
    fs::write(
        &list,
        format!(
            "# pages\n{base}/one\nnot a url at all\n\n{base}/missing\nftp://example.org/file\n{base}/two\n",
            base = server.uri()
        ),
    )
    .unwrap();

    let report = scraper(&out.path().join("pages"), ToolKind::ScrapeList, FileNaming::UrlBasename, false)
        .scrape_list(&list)
        .await
        .unwrap();

    assert_eq!(report.saved.len(), 2);
    assert_eq!(report.failed.len(), 3);
    assert_eq!(fs::read_to_string(out.path().join("pages/one")).unwrap(), "first");
    assert_eq!(fs::read_to_string(out.path().join("pages/two")).unwrap(), "second");
    let failed: Vec<_> = report.failed.iter().map(|f| f.url.as_str()).collect();
    assert_eq!(failed[0], "not a url at all");
    assert!(failed[1].ends_with("/missing"));
    assert_eq!(failed[2], "ftp://example.org/file");
}

#[tokio::test]
async fn same_basename_in_one_list_keeps_both_pages() {
    let server = MockServer::start().await;
    serve(&server, "/a/page", html("from a"), 1).await;
    serve(&server, "/b/page", html("from b"), 1).await;
    let out = TempDir::new().unwrap();
    let list = out.path().join("urls.txt");
    fs::write(&list, format!("{base}/a/page\n{base}/b/page\n", base = server.uri())).unwrap();
    let pages = out.path().join("pages");

    let report = scraper(&pages, ToolKind::ScrapeList, FileNaming::UrlBasename, false)
        .scrape_list(&list)
        .await
        .unwrap();

    assert_eq!(report.saved.len(), 2);
    assert_eq!(report.saved[0].path, pages.join("page"));
    assert_eq!(report.saved[1].path, pages.join("page-2"));
    assert_eq!(fs::read_to_string(pages.join("page")).unwrap(), "from a");
    assert_eq!(fs::read_to_string(pages.join("page-2")).unwrap(), "from b");
}

#[tokio::test]
async fn missing_list_file_is_input_not_found() {
    let out = TempDir::new().unwrap();
    let err = scraper(out.path(), ToolKind::ScrapeList, FileNaming::Sanitized, false)
        .scrape_list(&out.path().join("absent.txt"))
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<ToolError>(), Some(ToolError::InputNotFound { .. })));
}

#[tokio::test]
async fn link_following_fetches_each_page_once() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/",
        html(
            r##"<a href="/a">A</a> <a href="/a#section">A again</a> <a href='b'>B</a>
               <a href="/">home</a> <a href="#top">top</a> <a href="mailto:x@y.z">mail</a>
               <a href="/gone">gone</a>"##,
        ),
        1,
    )
    .await;
    serve(&server, "/a", html(r#"<a href="/b">B from A</a>"#), 1).await;
    serve(&server, "/b", html("leaf"), 1).await;
    serve(&server, "/gone", ResponseTemplate::new(404), 1).await;
    let out = TempDir::new().unwrap();

    let report = scraper(out.path(), ToolKind::ScrapeLinks, FileNaming::Sanitized, false)
        .scrape_with_links(&format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.saved.len(), 3);
    assert_eq!(report.failed.len(), 1);
    for page in &report.saved {
        assert!(page.path.is_file());
    }
    server.verify().await;
}

#[tokio::test]
async fn unreachable_start_page_aborts_link_following() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let result = scraper(out.path(), ToolKind::ScrapeLinks, FileNaming::Sanitized, false)
        .scrape_with_links(&format!("{}/nothing", server.uri()))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn collected_links_are_written_one_per_line() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/index",
        html(r#"<a href="/x">x</a><a href="https://example.org/y#frag">y</a><a href="/x">dup</a>"#),
        1,
    )
    .await;
    let out = TempDir::new().unwrap();

    let (path, links) = scraper(out.path(), ToolKind::Links, FileNaming::Sanitized, false)
        .collect_links(&format!("{}/index", server.uri()))
        .await
        .unwrap();

    assert_eq!(links.len(), 2);
    let written = fs::read_to_string(path).unwrap();
    assert_eq!(written, format!("{}/x\nhttps://example.org/y\n", server.uri()));
}
