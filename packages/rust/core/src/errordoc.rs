//! Error surfacing: a failed render still produces a document.
//!
//! Page renders yield a Markdown error document; the JSON-index endpoint
//! yields a structured error object. Both carry the attempted URL and
//! status, and the fallback attempt's URL and status when one was made.

use docrelay_shared::DocRelayError;

/// Render the Markdown error document for a failed page render.
pub fn render_error_document(err: &DocRelayError) -> String {
    let mut doc = String::from("# Upstream fetch failed\n\n");

    match err {
        DocRelayError::UpstreamFetch {
            url,
            status,
            fallback,
        } => {
            doc.push_str(
                "The requested documentation page could not be retrieved from the upstream host.\n\n",
            );
            doc.push_str(&format!("- Attempted: {url} (HTTP {status})\n"));
            if let Some(fb) = fallback {
                doc.push_str(&format!("- Fallback: {} (HTTP {})\n", fb.url, fb.status));
            }
        }
        other => {
            doc.push_str(&format!("{other}\n"));
        }
    }

    doc.push_str(&format!(
        "\nSuggested response status: {}\n",
        err.http_status()
    ));
    doc
}

/// Build the JSON error object for a failed index build.
pub fn error_json(err: &DocRelayError) -> serde_json::Value {
    let mut body = serde_json::json!({
        "error": {
            "kind": error_kind(err),
            "message": err.to_string(),
            "http_status": err.http_status(),
        }
    });

    if let DocRelayError::UpstreamFetch {
        url,
        status,
        fallback,
    } = err
    {
        let error = body["error"].as_object_mut().expect("error object");
        error.insert("url".into(), serde_json::json!(url));
        error.insert("status".into(), serde_json::json!(status));
        if let Some(fb) = fallback {
            error.insert("fallback_url".into(), serde_json::json!(fb.url));
            error.insert("fallback_status".into(), serde_json::json!(fb.status));
        }
    }

    body
}

/// Stable machine-readable kind string.
fn error_kind(err: &DocRelayError) -> &'static str {
    match err {
        DocRelayError::UpstreamFetch { .. } => "upstream_fetch_failed",
        DocRelayError::SidebarParse { .. } => "sidebar_parse_failed",
        DocRelayError::Network(_) => "network",
        DocRelayError::Config { .. } => "config",
        DocRelayError::Validation { .. } => "validation",
        DocRelayError::Io { .. } => "io",
    }
}
