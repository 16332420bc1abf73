//! Answer markup.
//!
//! Answers from the ask endpoint are plain text with optional Markdown links
//! (`[label](url)`) and newlines. They are turned into a small, safe HTML
//! fragment (the "rich" form shown once an answer settles) and a plain-text
//! rendition derived back from that HTML (the form the typewriter reveals).

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Shown when the endpoint answered but the `answer` field was missing or empty.
pub const NO_RESPONSE: &str = "Sorry, no response.";

/// Shown when the ask request failed entirely.
pub const CONTACT_ERROR: &str = "⚠️ Error contacting AI.";

const BLOCKED_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

/// Both renditions of an assistant answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAnswer {
    pub html: String,
    pub plain: String,
}

/// A piece of parsed answer HTML
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    Link { label: String, href: String },
    LineBreak,
}

enum Tag {
    LineBreak,
    LinkOpen(String),
    LinkClose,
    Other,
}

fn link_pattern() -> &'static Regex {
    static LINK: OnceLock<Regex> = OnceLock::new();
    LINK.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link pattern is valid"))
}

/// Render a raw answer into its HTML and plain-text forms.
///
/// A missing or empty answer renders the [`NO_RESPONSE`] fallback.
pub fn render_answer(answer: Option<&str>) -> RenderedAnswer {
    let source = match answer {
        Some(text) if !text.is_empty() => text,
        _ => NO_RESPONSE,
    };

    let html = answer_to_html(source);
    let plain = html_to_text(&html);
    RenderedAnswer { html, plain }
}

/// The fixed answer used when the request itself failed. No markup is applied.
pub fn error_answer() -> RenderedAnswer {
    RenderedAnswer {
        html: CONTACT_ERROR.to_string(),
        plain: CONTACT_ERROR.to_string(),
    }
}

/// Convert answer text to HTML: escape, linkify, then turn newlines into breaks.
pub fn answer_to_html(answer: &str) -> String {
    let escaped = escape_html(answer);

    let linked = link_pattern().replace_all(&escaped, |caps: &Captures| {
        let label = &caps[1];
        let href = &caps[2];
        if is_blocked_scheme(href) {
            label.to_string()
        } else {
            format!(
                r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
                encode_line_breaks(href),
                label
            )
        }
    });

    linked.replace("\n\n", "<br><br>").replace('\n', "<br>")
}

// Line breaks in a URL are percent-encoded so the `<br>` pass below never
// lands inside an attribute.
fn encode_line_breaks(href: &str) -> String {
    href.replace('\r', "%0D").replace('\n', "%0A")
}

/// Text content of an HTML fragment; `<br>` becomes a newline.
pub fn html_to_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    for fragment in parse_fragments(html) {
        match fragment {
            Fragment::Text(t) => text.push_str(&t),
            Fragment::Link { label, .. } => text.push_str(&label),
            Fragment::LineBreak => text.push('\n'),
        }
    }
    text
}

/// Parse answer HTML into text runs, links and line breaks.
///
/// Only `<a>` and `<br>` carry meaning; every other tag is dropped and its
/// text kept. Entities are decoded.
pub fn parse_fragments(html: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut text = String::new();
    // (href, undecoded label)
    let mut link: Option<(String, String)> = None;
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        buffer_for(&mut link, &mut text).push_str(&rest[..open]);
        let after = &rest[open..];

        let starts_tag = after[1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!');
        let close = if starts_tag { tag_end(after) } else { None };

        let Some(close) = close else {
            buffer_for(&mut link, &mut text).push('<');
            rest = &after[1..];
            continue;
        };

        let tag = &after[1..close];
        rest = &after[close + 1..];

        match classify(tag) {
            Tag::LineBreak => match link.as_mut() {
                Some((_, label)) => label.push('\n'),
                None => {
                    flush_text(&mut fragments, &mut text);
                    fragments.push(Fragment::LineBreak);
                }
            },
            Tag::LinkOpen(href) => {
                flush_text(&mut fragments, &mut text);
                if let Some(unclosed) = link.take() {
                    push_link(&mut fragments, unclosed);
                }
                link = Some((href, String::new()));
            }
            Tag::LinkClose => {
                if let Some(open_link) = link.take() {
                    push_link(&mut fragments, open_link);
                }
            }
            Tag::Other => {}
        }
    }

    buffer_for(&mut link, &mut text).push_str(rest);
    if let Some(unclosed) = link.take() {
        push_link(&mut fragments, unclosed);
    }
    flush_text(&mut fragments, &mut text);

    fragments
}

/// Byte offset of the `>` closing the tag that starts `after`, skipping any
/// `>` inside quoted attribute values.
fn tag_end(after: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in after.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

fn buffer_for<'a>(link: &'a mut Option<(String, String)>, text: &'a mut String) -> &'a mut String {
    match link {
        Some((_, label)) => label,
        None => text,
    }
}

fn flush_text(fragments: &mut Vec<Fragment>, text: &mut String) {
    if text.is_empty() {
        return;
    }
    let decoded = decode_entities(text);
    text.clear();

    if let Some(Fragment::Text(previous)) = fragments.last_mut() {
        previous.push_str(&decoded);
    } else {
        fragments.push(Fragment::Text(decoded));
    }
}

fn push_link(fragments: &mut Vec<Fragment>, (href, label): (String, String)) {
    fragments.push(Fragment::Link {
        label: decode_entities(&label),
        href,
    });
}

fn classify(tag: &str) -> Tag {
    let tag = tag.trim();
    let (name, attrs) = match tag.find(|c: char| c.is_ascii_whitespace()) {
        Some(i) => (&tag[..i], &tag[i..]),
        None => (tag, ""),
    };

    match name.trim_end_matches('/').to_ascii_lowercase().as_str() {
        "br" => Tag::LineBreak,
        "a" => Tag::LinkOpen(attribute(attrs, "href").map(decode_entities).unwrap_or_default()),
        "/a" => Tag::LinkClose,
        _ => Tag::Other,
    }
}

/// Value of `name` in a tag's attribute list. Quoted and bare values are accepted.
fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    // ASCII lowercasing keeps byte offsets aligned with `attrs`
    let lower = attrs.to_ascii_lowercase();
    let mut search = 0;

    while let Some(found) = lower[search..].find(name) {
        let start = search + found;
        search = start + name.len();

        let standalone = start == 0 || lower.as_bytes()[start - 1].is_ascii_whitespace();
        if !standalone {
            continue;
        }

        let Some(value) = attrs[search..].trim_start().strip_prefix('=') else {
            continue;
        };
        let value = value.trim_start();

        return Some(match value.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let inner = &value[1..];
                &inner[..inner.find(quote).unwrap_or(inner.len())]
            }
            _ => &value[..value.find(|c: char| c.is_ascii_whitespace()).unwrap_or(value.len())],
        });
    }

    None
}

fn is_blocked_scheme(href: &str) -> bool {
    let normalized: String = href
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    BLOCKED_SCHEMES.iter().any(|scheme| normalized.starts_with(scheme))
}

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode named (`&amp;`, `&lt;`, ...) and numeric character references.
/// Unknown references are left as written.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];

        let decoded = candidate
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&candidate[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(&['x', 'X'][..]) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_becomes_safe_anchor() {
        let rendered = render_answer(Some("See [the museum](https://example.com/whitman) today"));
        assert_eq!(
            rendered.html,
            r#"See <a href="https://example.com/whitman" target="_blank" rel="noopener noreferrer">the museum</a> today"#
        );
        assert_eq!(rendered.plain, "See the museum today");
    }

    #[test]
    fn test_every_link_is_converted() {
        let rendered = render_answer(Some("- [One](https://a.example)\n- [Two](https://b.example)"));
        assert_eq!(rendered.html.matches("<a href=").count(), 2);
        assert!(rendered.html.contains(r#"href="https://b.example""#));
        assert_eq!(rendered.plain, "- One\n- Two");
    }

    #[test]
    fn test_newlines_become_breaks() {
        let html = answer_to_html("a\n\nb\nc");
        assert_eq!(html, "a<br><br>b<br>c");
    }

    #[test]
    fn test_opening_hours_scenario() {
        let rendered = render_answer(Some("We are open 9-5.\n\n[Visit](https://example.com)"));
        assert_eq!(
            rendered.html,
            r#"We are open 9-5.<br><br><a href="https://example.com" target="_blank" rel="noopener noreferrer">Visit</a>"#
        );
        assert_eq!(rendered.plain, "We are open 9-5.\n\nVisit");
    }

    #[test]
    fn test_missing_or_empty_answer_falls_back() {
        assert_eq!(render_answer(None).plain, NO_RESPONSE);
        assert_eq!(render_answer(Some("")).plain, NO_RESPONSE);
        assert_eq!(render_answer(Some("")).html, NO_RESPONSE);
    }

    #[test]
    fn test_error_answer_is_unmarked() {
        let rendered = error_answer();
        assert_eq!(rendered.html, CONTACT_ERROR);
        assert_eq!(rendered.plain, CONTACT_ERROR);
    }

    #[test]
    fn test_plain_text_never_contains_generated_tags() {
        let rendered = render_answer(Some("[a](https://b.example)\n[c](https://d.example)\n\ndone"));
        assert!(!rendered.plain.contains("<a"));
        assert!(!rendered.plain.contains("<br"));
        assert!(!rendered.plain.contains("</a>"));
    }

    #[test]
    fn test_plain_text_is_clean_for_awkward_urls() {
        for answer in [
            "See [Visit](https://a.example/x\ny) now",
            "See [Visit](https://a.example/x\r\n\ny) now",
            r#"See [Visit](https://a.example/"quoted") now"#,
            "See [Visit](https://a.example/a>b) now",
            "See [Visit](https://a.example/it's>\nhere) now",
        ] {
            let rendered = render_answer(Some(answer));
            assert_eq!(rendered.plain, "See Visit now", "answer {:?}", answer);
            assert!(!rendered.plain.contains("target="));
            assert!(!rendered.plain.contains("href"));
        }
    }

    #[test]
    fn test_line_break_in_url_is_percent_encoded() {
        let html = answer_to_html("[Visit](https://a.example/x\ny)");
        assert_eq!(
            html,
            r#"<a href="https://a.example/x%0Ay" target="_blank" rel="noopener noreferrer">Visit</a>"#
        );
        assert_eq!(
            parse_fragments(&html),
            vec![Fragment::Link {
                label: "Visit".to_string(),
                href: "https://a.example/x%0Ay".to_string(),
            }]
        );
    }

    #[test]
    fn test_tag_end_skips_quoted_angle_brackets() {
        let fragments = parse_fragments(r#"<a href="https://a.example/<br>y" title='a>b'>go</a> on"#);
        assert_eq!(
            fragments,
            vec![
                Fragment::Link {
                    label: "go".to_string(),
                    href: "https://a.example/<br>y".to_string(),
                },
                Fragment::Text(" on".to_string()),
            ]
        );
    }

    #[test]
    fn test_raw_markup_in_answer_is_escaped() {
        let rendered = render_answer(Some("<script>alert(1)</script> & more"));
        assert_eq!(
            rendered.html,
            "&lt;script&gt;alert(1)&lt;/script&gt; &amp; more"
        );
        assert_eq!(rendered.plain, "<script>alert(1)</script> & more");
        assert!(parse_fragments(&rendered.html)
            .iter()
            .all(|f| matches!(f, Fragment::Text(_))));
    }

    #[test]
    fn test_plain_text_is_stable_when_rerendered() {
        for answer in [
            "We are open 9-5.\n\n[Visit](https://example.com)",
            "Fish &amp; chips < 5 dollars",
            "Quotes \"here\" and 'there'",
            "Line one\nLine two\n\n\nLine three",
        ] {
            let first = render_answer(Some(answer)).plain;
            let second = render_answer(Some(&first)).plain;
            assert_eq!(first, second, "rerendering changed {:?}", answer);
        }
    }

    #[test]
    fn test_executable_schemes_are_not_linked() {
        let rendered = render_answer(Some("[click](javascript:alert)"));
        assert!(!rendered.html.contains("<a"));
        assert_eq!(rendered.plain, "click");

        let rendered = render_answer(Some("[x]( JaVaScRiPt:void)"));
        assert!(!rendered.html.contains("<a"));
    }

    #[test]
    fn test_href_quotes_cannot_break_attribute() {
        let html = answer_to_html(r#"[x](https://a.example/" onclick="evil)"#);
        assert!(html.contains(r#"href="https://a.example/&quot; onclick=&quot;evil""#));

        let fragments = parse_fragments(&html);
        assert_eq!(
            fragments,
            vec![Fragment::Link {
                label: "x".to_string(),
                href: r#"https://a.example/" onclick="evil"#.to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_fragments_structure() {
        let html = answer_to_html("Hi\n[Site](https://example.com?a=1&b=2)\n\nBye");
        assert_eq!(
            parse_fragments(&html),
            vec![
                Fragment::Text("Hi".to_string()),
                Fragment::LineBreak,
                Fragment::Link {
                    label: "Site".to_string(),
                    href: "https://example.com?a=1&b=2".to_string(),
                },
                Fragment::LineBreak,
                Fragment::LineBreak,
                Fragment::Text("Bye".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_fragments_tolerates_stray_angle_brackets() {
        assert_eq!(
            parse_fragments("a < b <i>c</i>"),
            vec![Fragment::Text("a < b c".to_string())]
        );
        assert_eq!(html_to_text("unterminated <b"), "unterminated <b");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("&lt;&gt;&amp;&quot;&apos;"), "<>&\"'");
        assert_eq!(decode_entities("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(decode_entities("AT&T &unknown; &"), "AT&T &unknown; &");
    }

    #[test]
    fn test_multiline_label_keeps_break_in_label() {
        let fragments = parse_fragments(&answer_to_html("[two\nlines](https://x.example)"));
        assert_eq!(
            fragments,
            vec![Fragment::Link {
                label: "two\nlines".to_string(),
                href: "https://x.example".to_string(),
            }]
        );
    }
}
