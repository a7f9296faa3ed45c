//! Per-request orchestration: retrieval → conversion → enrichment → assembly.
//!
//! Everything here is allocated fresh per request and dropped at the end of
//! it; the only awaits are the upstream retrievals, performed in sequence.
//! The Package Index is built before assembly when it can be, but a render
//! never fails because the index could not be built — only the requested
//! page itself is a required retrieval.

use reqwest::Client;
use tracing::{info, instrument, warn};
use url::Url;

use docrelay_enrich::{assembler, llms, signatures, taskmap};
use docrelay_markdown as markdown;
use docrelay_shared::{DocRelayError, PackageCoords, PackageIndex, Result, SiteConfig};

use crate::errordoc;
use crate::fetch::{self, PageKind};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// One page-render request, as mapped by the router.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Package coordinates from the request path.
    pub coords: PackageCoords,
    /// Requested page file (e.g. `Relay.Repo.html`).
    pub page: String,
}

/// A finished response body for the router to serve.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// Response body.
    pub body: String,
    /// HTTP status the wrapper should respond with.
    pub status: u16,
    /// Content type of the body.
    pub content_type: &'static str,
}

const MARKDOWN_TYPE: &str = "text/markdown; charset=utf-8";
const JSON_TYPE: &str = "application/json";

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Render one documentation page as an enriched Markdown document.
///
/// Failures surface as a rendered error document, never a panic or a bare
/// error string.
#[instrument(skip(site), fields(package = %request.coords.package, page = %request.page))]
pub async fn render_page(site: &SiteConfig, request: &RenderRequest) -> RenderedDocument {
    match try_render_page(site, request).await {
        Ok(body) => RenderedDocument {
            body,
            status: 200,
            content_type: MARKDOWN_TYPE,
        },
        Err(e) => {
            warn!(error = %e, "page render failed");
            RenderedDocument {
                body: errordoc::render_error_document(&e),
                status: e.http_status(),
                content_type: MARKDOWN_TYPE,
            }
        }
    }
}

/// Render the llms-index replacement document for one package.
#[instrument(skip(site), fields(package = %coords.package))]
pub async fn render_llms_index(site: &SiteConfig, coords: &PackageCoords) -> RenderedDocument {
    let result = async {
        let client = fetch::build_client(site)?;
        build_package_index(&client, site, coords).await
    }
    .await;

    match result {
        Ok(index) => RenderedDocument {
            body: llms::render_llms_index(&index),
            status: 200,
            content_type: MARKDOWN_TYPE,
        },
        Err(e) => {
            warn!(error = %e, "llms index render failed");
            RenderedDocument {
                body: errordoc::render_error_document(&e),
                status: e.http_status(),
                content_type: MARKDOWN_TYPE,
            }
        }
    }
}

/// Serve the Package Index as the JSON-index response.
#[instrument(skip(site), fields(package = %coords.package))]
pub async fn render_index_json(site: &SiteConfig, coords: &PackageCoords) -> RenderedDocument {
    let result = async {
        let client = fetch::build_client(site)?;
        let index = build_package_index(&client, site, coords).await?;
        serde_json::to_string_pretty(&index)
            .map_err(|e| DocRelayError::validation(format!("index serialization failed: {e}")))
    }
    .await;

    match result {
        Ok(body) => RenderedDocument {
            body,
            status: 200,
            content_type: JSON_TYPE,
        },
        Err(e) => {
            warn!(error = %e, "index build failed");
            RenderedDocument {
                body: errordoc::error_json(&e).to_string(),
                status: e.http_status(),
                content_type: JSON_TYPE,
            }
        }
    }
}

/// Build the Package Index with its task map synthesized.
pub async fn build_package_index(
    client: &Client,
    site: &SiteConfig,
    coords: &PackageCoords,
) -> Result<PackageIndex> {
    let mut index = docrelay_index::build_index(client, site, coords).await?;
    index.task_map = taskmap::synthesize(&index);
    Ok(index)
}

// ---------------------------------------------------------------------------
// Render pipeline
// ---------------------------------------------------------------------------

/// The fallible render path behind [`render_page`].
async fn try_render_page(site: &SiteConfig, request: &RenderRequest) -> Result<String> {
    let client = fetch::build_client(site)?;
    let base_path = request.coords.base_path();

    // The index only feeds enrichment here; its failure degrades the render
    // instead of failing it.
    let package_index = match build_package_index(&client, site, &request.coords).await {
        Ok(index) => Some(index),
        Err(e) => {
            warn!(error = %e, "package index unavailable, rendering without it");
            None
        }
    };

    let page = fetch::fetch_page(&client, site, &base_path, &request.page).await?;

    let body = match page.kind {
        PageKind::Markdown => page.body.clone(),
        PageKind::Html => markdown::html_to_markdown(&page.body),
    };

    let base_url = Url::parse(&page.url)
        .map_err(|e| DocRelayError::validation(format!("bad page URL {}: {e}", page.url)))?;
    let rewritten = markdown::rewrite_links(&body, &base_url, site.upstream_host(), &site.origin);

    let annotations = signatures::extract(&rewritten);
    let page_url = site.wrapper_url(
        &base_path,
        &format!("{}.html", fetch::page_stem(&request.page)),
    );

    let document = assembler::assemble(&assembler::AssembleContext {
        body: &rewritten,
        source_url: &page.url,
        page_url: &page_url,
        annotations: &annotations,
        index: package_index.as_ref(),
    });

    info!(
        source = %page.url,
        bytes = document.len(),
        degraded = package_index.is_none(),
        "page rendered"
    );

    Ok(document)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use docrelay_shared::AppConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read fixture {path}: {e}"))
    }

    fn site_for(server: &MockServer) -> SiteConfig {
        let mut app = AppConfig::default();
        app.upstream.base_url = server.uri();
        app.wrapper.origin = "https://w".into();
        SiteConfig::from_app_config(&app).unwrap()
    }

    async fn mount(server: &MockServer, at: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    async fn mount_relay_fixtures(server: &MockServer) {
        mount(
            server,
            "/relay/1.0.0/api-reference.html",
            200,
            &load_fixture("html/api_reference.html"),
        )
        .await;
        mount(
            server,
            "/relay/1.0.0/dist/sidebar_items-1A2B3C.js",
            200,
            &load_fixture("html/sidebar_items-1A2B3C.js"),
        )
        .await;
    }

    fn request(package: &str, version: &str, page: &str) -> RenderRequest {
        RenderRequest {
            coords: PackageCoords::new(package, Some(version.into())).unwrap(),
            page: page.into(),
        }
    }

    #[tokio::test]
    async fn markdown_page_rewrites_relative_links() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/pkg/1.0.0/Mod.md",
            200,
            "# Mod\n\nSee [Other](Other.html)\n",
        )
        .await;
        // No API reference upstream: index degrades, render still succeeds.
        mount(&server, "/pkg/1.0.0/api-reference.html", 404, "").await;

        let site = site_for(&server);
        let doc = render_page(&site, &request("pkg", "1.0.0", "Mod.html")).await;

        assert_eq!(doc.status, 200);
        assert!(doc.body.contains("# Mod"));
        assert!(doc.body.contains("## Related links"));
        assert!(doc.body.contains("https://w/pkg/1.0.0/Other.html"));
    }

    #[tokio::test]
    async fn missing_page_yields_error_document_with_status() {
        let server = MockServer::start().await;
        mount(&server, "/pkg/1.0.0/api-reference.html", 404, "").await;
        mount(&server, "/pkg/1.0.0/Mod.md", 404, "").await;
        mount(&server, "/pkg/1.0.0/Mod.html", 404, "").await;

        let site = site_for(&server);
        let doc = render_page(&site, &request("pkg", "1.0.0", "Mod.html")).await;

        assert_eq!(doc.status, 502);
        let attempted = format!("{}/pkg/1.0.0/Mod.html", server.uri());
        assert!(doc.body.contains(&attempted), "body: {}", doc.body);
        assert!(doc.body.contains("404"));
    }

    #[tokio::test]
    async fn html_page_converted_when_markdown_missing() {
        let server = MockServer::start().await;
        mount_relay_fixtures(&server).await;
        mount(&server, "/relay/1.0.0/Relay.Query.md", 404, "").await;
        mount(
            &server,
            "/relay/1.0.0/Relay.Query.html",
            200,
            &load_fixture("html/module_page.html"),
        )
        .await;

        let site = site_for(&server);
        let doc = render_page(&site, &request("relay", "1.0.0", "Relay.Query.html")).await;

        assert_eq!(doc.status, 200);
        assert!(doc.body.contains("# Relay.Query"));
        assert!(doc.body.contains("```elixir"));
        assert!(doc.body.contains("u.age > 18"));
        assert!(doc
            .body
            .contains("[Relay.Repo](https://w/relay/1.0.0/Relay.Repo.html)"));
    }

    #[tokio::test]
    async fn full_render_carries_enrichment_sections() {
        let server = MockServer::start().await;
        mount_relay_fixtures(&server).await;
        mount(
            &server,
            "/relay/1.0.0/Relay.Repo.md",
            200,
            &load_fixture("md/module_page.md"),
        )
        .await;

        let site = site_for(&server);
        let doc = render_page(&site, &request("relay", "1.0.0", "Relay.Repo.html")).await;
        assert_eq!(doc.status, 200);
        let body = &doc.body;

        // Group headings inserted before their first member.
        let types = body.find("## Types").expect("Types heading");
        assert!(types < body.find("### start_opts()").unwrap());
        let callbacks = body.find("## Callbacks").expect("Callbacks heading");
        assert!(callbacks < body.find("### init/2").unwrap());

        // Function enrichment.
        assert!(body.contains("Spec: `start_link(repo, start_opts)`"));
        assert!(body.contains("| `:name` | yes | `atom()` |"));
        assert!(body.contains("Summary: Starts the repository supervision tree"));

        // Index-driven sections.
        assert!(body.contains("Common tasks: Query data"));
        assert!(body.contains("- [Relay.Query](https://w/relay/1.0.0/Relay.Query.html)"));
        assert!(body.contains("## Guides"));
        assert!(body.contains("- [Getting Started](https://w/relay/1.0.0/getting-started.html)"));
        assert!(body.contains("https://w/relay/1.0.0/Mix.Tasks.Relay.Migrate.html"));

        // Machine-readable options block.
        assert!(body.contains("## Agent data"));
        assert!(body.contains("\"query_opts\""));

        // Warnings and workflow fired from page content.
        assert!(body.contains("## Warnings"));
        assert!(body.contains("## Typical workflow"));
    }

    #[tokio::test]
    async fn index_json_includes_task_map() {
        let server = MockServer::start().await;
        mount_relay_fixtures(&server).await;

        let site = site_for(&server);
        let coords = PackageCoords::new("relay", Some("1.0.0".into())).unwrap();
        let doc = render_index_json(&site, &coords).await;

        assert_eq!(doc.status, 200);
        assert_eq!(doc.content_type, "application/json");
        let index: serde_json::Value = serde_json::from_str(&doc.body).unwrap();
        assert_eq!(index["package"], "relay");
        assert_eq!(index["modules"].as_array().unwrap().len(), 4);

        let ids: Vec<&str> = index["task_map"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_str().unwrap())
            .collect();
        assert!(ids.contains(&"getting-started"));
        assert!(ids.contains(&"run-migrations"));
        assert!(ids.contains(&"query-data"));
    }

    #[tokio::test]
    async fn index_json_failure_is_structured() {
        let server = MockServer::start().await;
        mount(&server, "/relay/1.0.0/api-reference.html", 503, "").await;

        let site = site_for(&server);
        let coords = PackageCoords::new("relay", Some("1.0.0".into())).unwrap();
        let doc = render_index_json(&site, &coords).await;

        assert_eq!(doc.status, 502);
        let body: serde_json::Value = serde_json::from_str(&doc.body).unwrap();
        assert_eq!(body["error"]["kind"], "upstream_fetch_failed");
        assert_eq!(body["error"]["status"], 503);
    }

    #[tokio::test]
    async fn llms_index_renders_from_catalog() {
        let server = MockServer::start().await;
        mount_relay_fixtures(&server).await;

        let site = site_for(&server);
        let coords = PackageCoords::new("relay", Some("1.0.0".into())).unwrap();
        let doc = render_llms_index(&site, &coords).await;

        assert_eq!(doc.status, 200);
        assert!(doc.body.starts_with("# relay\n"));
        assert!(doc.body.contains("## Modules"));
        assert!(doc.body.contains("## Common tasks"));
        assert!(doc.body.contains("(deprecated)"));
    }
}
