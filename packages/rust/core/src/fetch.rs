//! Upstream page retrieval with Markdown-variant preference.
//!
//! A page request names an `.html` file, but the upstream publishes a
//! Markdown twin for most pages. The Markdown variant is tried first (it
//! skips the HTML conversion entirely); the HTML page is the fallback. When
//! both fail, the typed error carries the requested page's URL and status
//! plus the Markdown attempt as the fallback record.

use reqwest::Client;
use tracing::debug;

use docrelay_shared::{DocRelayError, FetchAttempt, Result, SiteConfig};

/// How the retrieved body is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Markdown,
    Html,
}

/// One successfully retrieved page.
#[derive(Debug, Clone)]
pub struct RetrievedPage {
    /// Upstream URL the body came from.
    pub url: String,
    /// Raw body text.
    pub body: String,
    /// Body encoding.
    pub kind: PageKind,
}

/// Build the shared HTTP client for one request's retrievals.
pub fn build_client(site: &SiteConfig) -> Result<Client> {
    Client::builder()
        .user_agent(site.user_agent.clone())
        .timeout(std::time::Duration::from_secs(site.timeout_secs))
        .build()
        .map_err(|e| DocRelayError::Network(format!("failed to build HTTP client: {e}")))
}

/// Retrieve one page, preferring the Markdown variant.
pub async fn fetch_page(
    client: &Client,
    site: &SiteConfig,
    base_path: &str,
    page_file: &str,
) -> Result<RetrievedPage> {
    let stem = page_stem(page_file);
    let md_url = site.upstream_url(base_path, &format!("{stem}.md"));
    let html_url = site.upstream_url(base_path, &format!("{stem}.html"));

    let md_status = match fetch_body(client, &md_url).await? {
        FetchOutcome::Ok(body) => {
            debug!(url = %md_url, "markdown variant retrieved");
            return Ok(RetrievedPage {
                url: md_url,
                body,
                kind: PageKind::Markdown,
            });
        }
        FetchOutcome::Status(status) => status,
    };

    debug!(url = %md_url, status = md_status, "markdown variant missing, trying HTML");

    match fetch_body(client, &html_url).await? {
        FetchOutcome::Ok(body) => Ok(RetrievedPage {
            url: html_url,
            body,
            kind: PageKind::Html,
        }),
        FetchOutcome::Status(status) => Err(DocRelayError::upstream_with_fallback(
            html_url,
            status,
            FetchAttempt {
                url: md_url,
                status: md_status,
            },
        )),
    }
}

/// A retrieval that completed at the HTTP level.
enum FetchOutcome {
    Ok(String),
    Status(u16),
}

/// Fetch one URL; a non-success status is an outcome, not an error.
async fn fetch_body(client: &Client, url: &str) -> Result<FetchOutcome> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DocRelayError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Ok(FetchOutcome::Status(status.as_u16()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| DocRelayError::Network(format!("{url}: failed to read body: {e}")))?;

    Ok(FetchOutcome::Ok(body))
}

/// Strip a known page extension.
pub(crate) fn page_stem(page_file: &str) -> &str {
    page_file
        .strip_suffix(".html")
        .or_else(|| page_file.strip_suffix(".md"))
        .unwrap_or(page_file)
}
