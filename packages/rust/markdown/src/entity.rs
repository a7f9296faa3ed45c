//! HTML entity decoding and tag stripping.
//!
//! Foundational utilities used by the converter and the enrichment layer.
//! Decoding is a single forward scan, so text that is already plain comes
//! back unchanged and `&amp;lt;` decodes to `&lt;`, not `<`.

use std::sync::LazyLock;

use regex::Regex;

/// Matches a named or numeric entity reference.
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#x?[0-9A-Fa-f]+|[A-Za-z][A-Za-z0-9]*);").expect("entity regex"));

/// Matches any HTML tag, opening, closing, or self-closing.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag regex"));

/// Decode the entity subset the upstream documentation generator emits.
///
/// Unknown entities are left verbatim rather than erroring.
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let body = &caps[1];
            match decode_one(body) {
                Some(decoded) => decoded,
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Remove every HTML tag, keeping inner text.
pub fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").into_owned()
}

/// Decode a single entity body (the part between `&` and `;`).
fn decode_one(body: &str) -> Option<String> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    let named = match body {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "hellip" => "\u{2026}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "laquo" => "\u{00AB}",
        "raquo" => "\u{00BB}",
        "copy" => "\u{00A9}",
        "reg" => "\u{00AE}",
        "times" => "\u{00D7}",
        "middot" => "\u{00B7}",
        "rarr" => "\u{2192}",
        "larr" => "\u{2190}",
        _ => return None,
    };
    Some(named.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&quot;hi&quot;"), "\"hi\"");
        assert_eq!(decode_entities("x&nbsp;y"), "x y");
    }

    #[test]
    fn decodes_numeric_entities() {
        assert_eq!(decode_entities("&#39;"), "'");
        assert_eq!(decode_entities("&#x27;"), "'");
        assert_eq!(decode_entities("&#8594;"), "\u{2192}");
    }

    #[test]
    fn unknown_entities_pass_through() {
        assert_eq!(decode_entities("&bogus; &#xZZ;"), "&bogus; &#xZZ;");
    }

    #[test]
    fn decoding_plain_text_is_identity() {
        let plain = "fn main() { println!(\"1 < 2 & 3 > 2\"); }";
        assert_eq!(decode_entities(plain), plain);
    }

    #[test]
    fn decoding_is_single_pass() {
        // A doubly-escaped ampersand must not collapse twice.
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn strips_tags_keeps_text() {
        assert_eq!(
            strip_tags("<span class=\"kw\">def</span> run<br/>"),
            "def run"
        );
        assert_eq!(strip_tags("no tags"), "no tags");
    }
}
