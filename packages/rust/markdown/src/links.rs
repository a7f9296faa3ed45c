//! Link classification and rewriting between the upstream host and the
//! wrapper's own origin.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Matches `[text](url)`; image links are filtered in the replacement.
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").expect("link regex"));

/// Resolve one href against its page's base URL and rewrite upstream-host
/// targets onto the wrapper origin.
///
/// In-page fragments, `mailto:`, and `javascript:` targets come back
/// unchanged, as does anything that fails to resolve — a malformed href is
/// never an error.
pub fn resolve_href(href: &str, base: &Url, upstream_host: &str, origin: &Url) -> String {
    let trimmed = href.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("mailto:")
        || trimmed.starts_with("javascript:")
    {
        return href.to_string();
    }

    let Ok(resolved) = base.join(trimmed) else {
        return href.to_string();
    };

    if resolved.host_str() == Some(upstream_host) {
        let mut rewritten = origin.clone();
        rewritten.set_path(resolved.path());
        rewritten.set_query(resolved.query());
        rewritten.set_fragment(resolved.fragment());
        rewritten.to_string()
    } else {
        resolved.to_string()
    }
}

/// Rewrite every Markdown link target in a document through [`resolve_href`].
///
/// Image links (`![alt](url)`) are left untouched.
pub fn rewrite_links(md: &str, base: &Url, upstream_host: &str, origin: &Url) -> String {
    LINK_RE
        .replace_all(md, |caps: &regex::Captures<'_>| {
            let full_match = caps.get(0).expect("match");
            let start = full_match.start();
            if start > 0 && md.as_bytes()[start - 1] == b'!' {
                return caps[0].to_string();
            }

            let text = &caps[1];
            let target = resolve_href(&caps[2], base, upstream_host, origin);
            format!("[{text}]({target})")
        })
        .into_owned()
}
