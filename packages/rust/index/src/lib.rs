//! Package Index construction from upstream artifacts.
//!
//! One index build performs up to two upstream retrievals, awaited in
//! sequence: the API-reference page (required) and the sidebar payload
//! (optional, discovered from the page itself). Module rows from the
//! API-reference HTML are preferred because they carry human summaries; the
//! sidebar listing supplies deprecation/group flags and is the fallback
//! module source, and is the only source for guides and tasks.

pub mod apiref;
pub mod sidebar;

use chrono::Utc;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use docrelay_shared::{
    DocRelayError, GuideEntry, ModuleEntry, PackageCoords, PackageIndex, Result, SiteConfig,
    TaskEntry,
};

pub use apiref::{ModuleSummary, parse_module_summaries};
pub use sidebar::{SidebarPayload, discover_sidebar_src, parse_sidebar};

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// One successfully retrieved text document.
#[derive(Debug, Clone)]
struct FetchedText {
    body: String,
    last_modified: Option<String>,
}

/// Fetch a URL, requiring a success status.
async fn fetch_text(client: &Client, url: &str) -> Result<FetchedText> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DocRelayError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DocRelayError::upstream(url, status.as_u16()));
    }

    let last_modified = response
        .headers()
        .get(reqwest::header::LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = response
        .text()
        .await
        .map_err(|e| DocRelayError::Network(format!("{url}: failed to read body: {e}")))?;

    Ok(FetchedText {
        body,
        last_modified,
    })
}

// ---------------------------------------------------------------------------
// Index builder
// ---------------------------------------------------------------------------

/// Build a [`PackageIndex`] for the given package coordinates.
///
/// A failed API-reference retrieval is fatal and propagates as
/// `UpstreamFetch`. A missing, unreachable, or unparseable sidebar payload is
/// recovered locally: guides and tasks come back empty and modules fall back
/// to whichever source is available.
///
/// The returned index has an empty `task_map`; synthesis happens one layer
/// up, where the rule table lives.
#[instrument(skip(client, site), fields(package = %coords.package))]
pub async fn build_index(
    client: &Client,
    site: &SiteConfig,
    coords: &PackageCoords,
) -> Result<PackageIndex> {
    let base_path = coords.base_path();
    let api_url = site.upstream_url(&base_path, "api-reference.html");

    let api_page = fetch_text(client, &api_url).await?;
    let mut sources = vec![api_url.clone()];

    // Sidebar payload: discovered from the page, recoverable on any failure.
    let sidebar_payload = match load_sidebar(client, &api_url, &api_page.body).await {
        Ok(Some((url, payload))) => {
            sources.push(url);
            Some(payload)
        }
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "sidebar payload unavailable, continuing without it");
            None
        }
    };

    let table_rows = apiref::parse_module_summaries(&api_page.body);
    let modules = build_modules(site, &base_path, &table_rows, sidebar_payload.as_ref());
    let guides = build_guides(site, &base_path, sidebar_payload.as_ref());
    let tasks = build_tasks(site, &base_path, sidebar_payload.as_ref());

    debug!(
        modules = modules.len(),
        guides = guides.len(),
        tasks = tasks.len(),
        "package index built"
    );

    Ok(PackageIndex {
        package: coords.package.clone(),
        version: coords.version.clone(),
        versioned: coords.versioned(),
        base_path,
        origin: site.origin.as_str().trim_end_matches('/').to_string(),
        last_modified: api_page.last_modified,
        sources,
        modules,
        guides,
        tasks,
        task_map: Vec::new(),
        generated_at: Utc::now(),
    })
}

/// Discover, fetch, and parse the sidebar payload referenced by a page.
async fn load_sidebar(
    client: &Client,
    page_url: &str,
    page_html: &str,
) -> Result<Option<(String, SidebarPayload)>> {
    let Some(src) = sidebar::discover_sidebar_src(page_html) else {
        debug!("no sidebar script reference found");
        return Ok(None);
    };

    let base = Url::parse(page_url)
        .map_err(|e| DocRelayError::validation(format!("bad page URL {page_url}: {e}")))?;
    let sidebar_url = base
        .join(src)
        .map_err(|e| DocRelayError::validation(format!("bad sidebar reference {src}: {e}")))?;

    let fetched = fetch_text(client, sidebar_url.as_str()).await?;
    let payload = sidebar::parse_sidebar(&fetched.body)?;

    Ok(Some((sidebar_url.to_string(), payload)))
}

// ---------------------------------------------------------------------------
// Entry construction
// ---------------------------------------------------------------------------

/// Build the module list, preferring API-reference table rows.
///
/// When both sources are present the table is authoritative for naming and
/// summaries; sidebar deprecation/group flags are overlaid by exact name.
fn build_modules(
    site: &SiteConfig,
    base_path: &str,
    table_rows: &[ModuleSummary],
    sidebar_payload: Option<&SidebarPayload>,
) -> Vec<ModuleEntry> {
    let mut modules: Vec<ModuleEntry> = Vec::new();

    if !table_rows.is_empty() {
        for row in table_rows {
            if modules.iter().any(|m| m.name == row.name) {
                continue;
            }
            let flags = sidebar_payload
                .and_then(|sb| sb.modules.iter().find(|m| m.id == row.name));
            modules.push(ModuleEntry {
                name: row.name.clone(),
                summary: row.summary.clone(),
                url: site.wrapper_url(base_path, &row.href),
                markdown_url: site.wrapper_url(base_path, &markdown_variant(&row.href)),
                deprecated: flags.is_some_and(|m| m.deprecated),
                group: flags.and_then(|m| normalize_group(m.group.as_deref())),
            });
        }
        return modules;
    }

    let Some(payload) = sidebar_payload else {
        return modules;
    };

    for module in &payload.modules {
        if modules.iter().any(|m| m.name == module.id) {
            continue;
        }
        let file = format!("{}.html", module.id);
        modules.push(ModuleEntry {
            name: module.id.clone(),
            summary: None,
            url: site.wrapper_url(base_path, &file),
            markdown_url: site.wrapper_url(base_path, &markdown_variant(&file)),
            deprecated: module.deprecated,
            group: normalize_group(module.group.as_deref()),
        });
    }

    modules
}

/// Build the guide list from the sidebar's extras.
fn build_guides(
    site: &SiteConfig,
    base_path: &str,
    sidebar_payload: Option<&SidebarPayload>,
) -> Vec<GuideEntry> {
    let Some(payload) = sidebar_payload else {
        return Vec::new();
    };

    let mut guides: Vec<GuideEntry> = Vec::new();
    for extra in &payload.extras {
        if guides.iter().any(|g| g.id == extra.id) {
            continue;
        }
        let title = if extra.title.is_empty() {
            extra.id.clone()
        } else {
            extra.title.clone()
        };
        guides.push(GuideEntry {
            id: extra.id.clone(),
            title,
            group: normalize_group(extra.group.as_deref()),
            url: site.wrapper_url(base_path, &format!("{}.html", extra.id)),
            headers: extra
                .headers
                .iter()
                .map(|h| h.id.clone())
                .filter(|h| !h.is_empty())
                .collect(),
        });
    }
    guides
}

/// Build the task list from the sidebar's tasks.
fn build_tasks(
    site: &SiteConfig,
    base_path: &str,
    sidebar_payload: Option<&SidebarPayload>,
) -> Vec<TaskEntry> {
    let Some(payload) = sidebar_payload else {
        return Vec::new();
    };

    let mut tasks: Vec<TaskEntry> = Vec::new();
    for task in &payload.tasks {
        if tasks.iter().any(|t| t.id == task.id) {
            continue;
        }
        let title = if task.title.is_empty() {
            task.id.clone()
        } else {
            task.title.clone()
        };
        tasks.push(TaskEntry {
            id: task.id.clone(),
            title,
            group: normalize_group(task.group.as_deref()),
            url: site.wrapper_url(base_path, &format!("{}.html", task.id)),
        });
    }
    tasks
}

/// Derive the Markdown-variant file name for a page href.
fn markdown_variant(href: &str) -> String {
    match href.strip_suffix(".html") {
        Some(stem) => format!("{stem}.md"),
        None => format!("{href}.md"),
    }
}

/// The sidebar encodes "no group" as an empty string.
fn normalize_group(group: Option<&str>) -> Option<String> {
    group.filter(|g| !g.is_empty()).map(str::to_string)
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
        SiteConfig::from_app_config(&app).expect("site config")
    }

    fn coords() -> PackageCoords {
        PackageCoords::new("relay", Some("1.0.0".into())).unwrap()
    }

    async fn mount_api_reference(server: &MockServer, fixture: &str) {
        Mock::given(method("GET"))
            .and(path("/relay/1.0.0/api-reference.html"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(load_fixture(fixture))
                    .insert_header("last-modified", "Wed, 01 Jan 2025 00:00:00 GMT"),
            )
            .mount(server)
            .await;
    }

    async fn mount_sidebar(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/relay/1.0.0/dist/sidebar_items-1A2B3C.js"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(load_fixture("html/sidebar_items-1A2B3C.js")),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn builds_index_from_table_and_sidebar() {
        let server = MockServer::start().await;
        mount_api_reference(&server, "html/api_reference.html").await;
        mount_sidebar(&server).await;

        let site = site_for(&server);
        let client = Client::new();
        let index = build_index(&client, &site, &coords()).await.unwrap();

        assert_eq!(index.package, "relay");
        assert_eq!(index.base_path, "relay/1.0.0");
        assert!(index.versioned);
        assert_eq!(index.origin, "https://w");
        assert_eq!(
            index.last_modified.as_deref(),
            Some("Wed, 01 Jan 2025 00:00:00 GMT")
        );

        // Table rows are authoritative; one entry per module name.
        assert_eq!(index.modules.len(), 4);
        let repo = index.module("Relay.Repo").expect("Relay.Repo listed");
        assert_eq!(repo.summary.as_deref(), Some("Defines a repository."));
        assert_eq!(repo.url, "https://w/relay/1.0.0/Relay.Repo.html");
        assert_eq!(repo.markdown_url, "https://w/relay/1.0.0/Relay.Repo.md");
        assert_eq!(repo.group.as_deref(), Some("Repositories"));

        // Sidebar flags overlaid by name.
        let legacy = index.module("Relay.LegacyAdapter").expect("listed");
        assert!(legacy.deprecated);

        // Guides and tasks come from the sidebar only.
        assert_eq!(index.guides.len(), 2);
        let guide = index.guide("getting-started").expect("guide listed");
        assert_eq!(guide.headers.len(), 2);
        assert_eq!(index.tasks.len(), 2);
        assert_eq!(
            index.task("mix relay.migrate").map(|t| t.id.as_str()),
            Some("Mix.Tasks.Relay.Migrate")
        );

        // Provenance records both retrievals.
        assert_eq!(index.sources.len(), 2);
        assert!(index.sources[0].ends_with("api-reference.html"));
        assert!(index.sources[1].contains("sidebar_items-1A2B3C.js"));
    }

    #[tokio::test]
    async fn missing_sidebar_is_recovered() {
        let server = MockServer::start().await;
        mount_api_reference(&server, "html/api_reference.html").await;
        Mock::given(method("GET"))
            .and(path("/relay/1.0.0/dist/sidebar_items-1A2B3C.js"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let site = site_for(&server);
        let index = build_index(&Client::new(), &site, &coords()).await.unwrap();

        assert_eq!(index.modules.len(), 4);
        assert!(index.guides.is_empty());
        assert!(index.tasks.is_empty());
        assert_eq!(index.sources.len(), 1);
        // Without sidebar flags nothing is marked deprecated.
        assert!(index.modules.iter().all(|m| !m.deprecated));
    }

    #[tokio::test]
    async fn unparseable_sidebar_is_recovered() {
        let server = MockServer::start().await;
        mount_api_reference(&server, "html/api_reference.html").await;
        Mock::given(method("GET"))
            .and(path("/relay/1.0.0/dist/sidebar_items-1A2B3C.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("window.load(whatever);"))
            .mount(&server)
            .await;

        let site = site_for(&server);
        let index = build_index(&Client::new(), &site, &coords()).await.unwrap();

        assert_eq!(index.modules.len(), 4);
        assert!(index.guides.is_empty());
        assert!(index.tasks.is_empty());
    }

    #[tokio::test]
    async fn sidebar_modules_used_when_table_absent() {
        let server = MockServer::start().await;
        mount_api_reference(&server, "html/api_reference_no_table.html").await;
        mount_sidebar(&server).await;

        let site = site_for(&server);
        let index = build_index(&Client::new(), &site, &coords()).await.unwrap();

        assert_eq!(index.modules.len(), 4);
        let repo = index.module("Relay.Repo").expect("listed");
        assert!(repo.summary.is_none());
        assert_eq!(repo.group.as_deref(), Some("Repositories"));
        assert!(index.module("Relay.LegacyAdapter").unwrap().deprecated);
    }

    #[tokio::test]
    async fn api_reference_failure_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/relay/1.0.0/api-reference.html"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let site = site_for(&server);
        let err = build_index(&Client::new(), &site, &coords())
            .await
            .unwrap_err();

        match err {
            DocRelayError::UpstreamFetch { url, status, .. } => {
                assert!(url.ends_with("/relay/1.0.0/api-reference.html"));
                assert_eq!(status, 404);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn markdown_variant_of_href() {
        assert_eq!(markdown_variant("Relay.Repo.html"), "Relay.Repo.md");
        assert_eq!(markdown_variant("readme"), "readme.md");
    }
}
