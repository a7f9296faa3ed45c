//! HTML→Markdown conversion for one documentation generator's page HTML.
//!
//! The conversion is an ordered pipeline of `&str -> String` passes. Order is
//! load-bearing: later passes assume earlier ones already removed the tags
//! they must not see as content (fences are cut out before heading rules run,
//! headings before paragraph rules, and so on).

use std::sync::LazyLock;

use regex::Regex;

use crate::entity::{decode_entities, strip_tags};

/// Convert a raw HTML document into Markdown.
pub fn html_to_markdown(html: &str) -> String {
    let mut out = strip_invisible(html);
    out = convert_code_fences(&out);
    out = convert_headings(&out);
    out = convert_paragraphs(&out);
    out = convert_list_items(&out);
    out = convert_line_breaks(&out);
    out = convert_inline_code(&out);
    out = convert_anchors(&out);
    out = strip_residual(&out);
    let out = collapse_blank_lines(&out);

    tracing::debug!(html_len = html.len(), markdown_len = out.len(), "converted");
    out
}

// ---------------------------------------------------------------------------
// Pass 1: scripts, styles, comments
// ---------------------------------------------------------------------------

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script>").expect("script regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style>").expect("style regex"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>.*?</title>").expect("title regex"));
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment regex"));

fn strip_invisible(html: &str) -> String {
    let out = SCRIPT_RE.replace_all(html, "");
    let out = STYLE_RE.replace_all(&out, "");
    // The document title is chrome, not content; dropping the tag alone
    // would leave its text behind as a stray first line.
    let out = TITLE_RE.replace_all(&out, "");
    COMMENT_RE.replace_all(&out, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 2: <pre><code> → fenced blocks
// ---------------------------------------------------------------------------

static PRE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<pre[^>]*>\s*<code([^>]*)>(.*?)</code>\s*</pre>"#).expect("pre regex")
});
static CLASS_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class\s*=\s*"([^"]*)""#).expect("class regex"));

fn convert_code_fences(html: &str) -> String {
    PRE_CODE_RE
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let lang = fence_language(&caps[1]);
            let body = decode_entities(&strip_tags(&caps[2]));
            let body = body.trim_matches('\n').trim_end();
            format!("\n\n```{lang}\n{body}\n```\n\n")
        })
        .into_owned()
}

/// Pick a fence language from the `<code>` class attribute.
///
/// The generator emits classes like `elixir`, `makeup elixir`, or
/// `language-sql`; the last token wins.
fn fence_language(attrs: &str) -> String {
    let Some(caps) = CLASS_ATTR_RE.captures(attrs) else {
        return String::new();
    };
    caps[1]
        .split_whitespace()
        .next_back()
        .map(|token| token.trim_start_matches("language-"))
        .filter(|token| token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or_default()
        .to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: headings, deepest level first
// ---------------------------------------------------------------------------

static HEADING_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    // Index 0 holds <h6>; processing deep-to-shallow keeps an outer <h2>'s
    // pattern from consuming a nested deeper heading.
    (1..=6)
        .rev()
        .map(|level| {
            Regex::new(&format!(r"(?is)<h{level}[^>]*>(.*?)</h{level}>")).expect("heading regex")
        })
        .collect()
});

fn convert_headings(html: &str) -> String {
    let mut out = html.to_string();
    for (i, re) in HEADING_RES.iter().enumerate() {
        let level = 6 - i;
        out = re
            .replace_all(&out, |caps: &regex::Captures<'_>| {
                let text = decode_entities(&strip_tags(&caps[1]));
                let text = text.trim();
                if text.is_empty() {
                    "\n\n".to_string()
                } else {
                    format!("\n\n{} {text}\n\n", "#".repeat(level))
                }
            })
            .into_owned();
    }
    out
}

// ---------------------------------------------------------------------------
// Pass 4: paragraphs, list items, line breaks, inline code, anchors
// ---------------------------------------------------------------------------

static P_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").expect("p regex"));
static LI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li[^>]*>(.*?)</li>").expect("li regex"));
static BR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("br regex"));
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<code[^>]*>(.*?)</code>").expect("code regex"));
static A_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*"([^"]*)"[^>]*>(.*?)</a>"#).expect("anchor regex")
});

fn convert_paragraphs(html: &str) -> String {
    P_RE.replace_all(html, |caps: &regex::Captures<'_>| {
        format!("\n\n{}\n\n", caps[1].trim())
    })
    .into_owned()
}

fn convert_list_items(html: &str) -> String {
    LI_RE
        .replace_all(html, |caps: &regex::Captures<'_>| {
            // Item bodies may span lines; a list item is one Markdown line.
            let body = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
            format!("\n- {body}")
        })
        .into_owned()
}

fn convert_line_breaks(html: &str) -> String {
    BR_RE.replace_all(html, "\n").into_owned()
}

fn convert_inline_code(html: &str) -> String {
    CODE_RE
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let text = decode_entities(&strip_tags(&caps[1]));
            let text = text.trim();
            if text.is_empty() {
                String::new()
            } else {
                format!("`{text}`")
            }
        })
        .into_owned()
}

fn convert_anchors(html: &str) -> String {
    A_RE.replace_all(html, |caps: &regex::Captures<'_>| {
        let href = caps[1].trim();
        let text = decode_entities(&strip_tags(&caps[2]));
        let text = text.trim();
        // An anchor emptied by tag stripping degenerates to its bare URL
        // text instead of vanishing.
        let text = if text.is_empty() { href } else { text };
        format!("[{text}]({href})")
    })
    .into_owned()
}

// ---------------------------------------------------------------------------
// Pass 5: strip residual tags, decode residual entities (outside fences)
// ---------------------------------------------------------------------------

fn strip_residual(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_fence = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            result.push_str(line);
            result.push('\n');
            continue;
        }

        if in_fence {
            result.push_str(line);
        } else {
            result.push_str(&decode_entities(&strip_tags(line)));
        }
        result.push('\n');
    }

    result
}

// ---------------------------------------------------------------------------
// Pass 6: collapse blank runs, trim
// ---------------------------------------------------------------------------

static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{4,}").expect("blank regex"));

fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN_RE.replace_all(text, "\n\n").trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_all_levels() {
        for level in 1..=6 {
            let html = format!("<p>before</p><h{level}>Title &amp; More</h{level}><p>after</p>");
            let md = html_to_markdown(&html);
            let expected = format!("{} Title & More", "#".repeat(level));
            assert!(
                md.contains(&format!("\n\n{expected}\n\n")) || md.starts_with(&expected),
                "level {level}: {md:?}"
            );
            // Exactly N hashes: the next deeper marker must not appear.
            assert!(!md.contains(&format!("{}#", "#".repeat(level))));
        }
    }

    #[test]
    fn nested_heading_not_consumed_by_shallower_rule() {
        let html = "<h2>Outer <h4>Inner</h4></h2>";
        let md = html_to_markdown(html);
        assert!(md.contains("#### Inner"));
        assert!(md.contains("## Outer"));
    }

    #[test]
    fn pre_code_becomes_fence() {
        let html = r#"<pre><code class="elixir">x = 1 &amp;&amp; 2
IO.puts(x)</code></pre>"#;
        let md = html_to_markdown(html);
        assert!(md.starts_with("```elixir\n"));
        assert!(md.contains("x = 1 && 2"));
        assert!(md.trim_end().ends_with("```"));
    }

    #[test]
    fn fence_language_from_class_variants() {
        assert_eq!(fence_language(r#" class="makeup elixir""#), "elixir");
        assert_eq!(fence_language(r#" class="language-sql""#), "sql");
        assert_eq!(fence_language(""), "");
    }

    #[test]
    fn fence_content_not_double_decoded() {
        let html = "<pre><code>a &amp;lt; b</code></pre>";
        let md = html_to_markdown(html);
        // One decode at fence construction, none afterwards.
        assert!(md.contains("a &lt; b"), "{md:?}");
    }

    #[test]
    fn highlighted_code_loses_span_markup() {
        let html = r#"<pre><code class="elixir"><span class="kd">def</span> <span class="nf">run</span></code></pre>"#;
        let md = html_to_markdown(html);
        assert!(md.contains("def run"));
        assert!(!md.contains("<span"));
    }

    #[test]
    fn paragraphs_and_lists() {
        let html = "<p>Intro text.</p><ul><li>First item</li><li>Second
item</li></ul>";
        let md = html_to_markdown(html);
        assert!(md.contains("Intro text."));
        assert!(md.contains("\n- First item"));
        assert!(md.contains("\n- Second item"));
    }

    #[test]
    fn inline_code_and_breaks() {
        let html = "<p>Use <code>Repo.all/1</code> here.<br/>Next line.</p>";
        let md = html_to_markdown(html);
        assert!(md.contains("`Repo.all/1`"));
        assert!(md.contains("here.\nNext line."));
    }

    #[test]
    fn anchors_become_links() {
        let html = r#"<p>See <a href="Other.html">the other module</a>.</p>"#;
        let md = html_to_markdown(html);
        assert!(md.contains("[the other module](Other.html)"));
    }

    #[test]
    fn empty_anchor_degenerates_to_url() {
        let html = r#"<p><a href="Other.html"><span></span></a></p>"#;
        let md = html_to_markdown(html);
        assert!(md.contains("[Other.html](Other.html)"), "{md:?}");
    }

    #[test]
    fn empty_heading_collapses_to_blank() {
        let html = "<p>a</p><h2><span></span></h2><p>b</p>";
        let md = html_to_markdown(html);
        assert!(!md.contains("##"));
        assert!(md.contains('a'));
        assert!(md.contains('b'));
    }

    #[test]
    fn document_title_is_dropped() {
        let html =
            "<head><title>Mod \u{2014} pkg v1.0.0</title></head><body><h1>Mod</h1></body>";
        let md = html_to_markdown(html);
        assert_eq!(md, "# Mod");
    }

    #[test]
    fn scripts_styles_comments_removed() {
        let html = "<script>alert(1)</script><style>.x{}</style><!-- hidden --><p>kept</p>";
        let md = html_to_markdown(html);
        assert_eq!(md, "kept");
    }

    #[test]
    fn blank_runs_collapse() {
        let html = "<p>a</p><div></div><div></div><p>b</p>";
        let md = html_to_markdown(html);
        assert_eq!(md, "a\n\nb");
    }

    #[test]
    fn residual_tags_stripped_entities_decoded() {
        let html = "<section><p>Tom &amp; Jerry</p></section>";
        let md = html_to_markdown(html);
        assert_eq!(md, "Tom & Jerry");
    }
}
