use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::tools::{ToolError, Toolbox};

const TRUNCATION_MARKER: &str = "\n\n[... truncated for length ...]";

/// Elements whose content never reaches the reader.
const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "svg"];

const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "title", "tr", "ul",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowseArgs {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub wait_selector: Option<String>,
    #[serde(default)]
    pub wait_time_ms: Option<u64>,
    #[serde(default)]
    pub max_text_chars: Option<usize>,
}

fn normalize_url(raw: &str) -> Result<Url, ToolError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ToolError::UrlRequired);
    }
    let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };
    let url = Url::parse(&with_scheme).map_err(|_| ToolError::InvalidUrl)?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(ToolError::InvalidUrl),
    }
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Finds the `>` closing a tag that starts at `from`, skipping quoted attribute values.
fn tag_end(html: &str, from: usize) -> Option<usize> {
    let mut quote = None;
    for (i, ch) in html[from..].char_indices() {
        match (quote, ch) {
            (None, '"' | '\'') => quote = Some(ch),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => return Some(from + i),
            _ => {}
        }
    }
    None
}

/// Decodes a text run; source line breaks are plain whitespace.
fn push_text(out: &mut String, text: &str) {
    out.push_str(&decode_entities(text).replace(['\n', '\r'], " "));
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Reduces an HTML document to readable text: one line per block element,
/// list items prefixed with `- `, runs of whitespace collapsed.
pub(crate) fn html_to_text(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let mut raw = String::with_capacity(html.len() / 2);
    let mut pos = 0;

    while pos < html.len() {
        let Some(lt) = html[pos..].find('<').map(|i| pos + i) else {
            push_text(&mut raw, &html[pos..]);
            break;
        };
        push_text(&mut raw, &html[pos..lt]);

        if html[lt..].starts_with("<!--") {
            pos = match html[lt + 4..].find("-->") {
                Some(i) => lt + 4 + i + 3,
                None => html.len(),
            };
            continue;
        }
        let Some(gt) = tag_end(html, lt + 1) else {
            push_text(&mut raw, &html[lt..]);
            break;
        };
        let inner = &html[lt + 1..gt];
        let closing = inner.starts_with('/');
        let name = tag_name(inner);
        pos = gt + 1;

        if !closing && !inner.ends_with('/') && SKIPPED.contains(&name.as_str()) {
            let close = format!("</{name}");
            pos = match lower[pos..].find(&close) {
                Some(i) => tag_end(html, pos + i).map_or(html.len(), |e| e + 1),
                None => html.len(),
            };
            continue;
        }
        if name == "li" {
            if !closing {
                raw.push_str("\n- ");
            }
        } else if BLOCKS.contains(&name.as_str()) {
            raw.push('\n');
        } else if name == "td" || name == "th" {
            raw.push(' ');
        }
    }

    let mut lines: Vec<String> = Vec::new();
    for line in raw.split('\n') {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() || line == "-" {
            if lines.last().is_some_and(|l| !l.is_empty()) {
                lines.push(String::new());
            }
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

/// Checks the last compound of a CSS selector against the raw document.
/// Each `tag`, `#id` and `.class` part must appear somewhere in the page.
fn selector_present(html: &str, selector: &str) -> bool {
    let Some(last) = selector
        .split([' ', '>', '+', '~'])
        .filter(|s| !s.is_empty())
        .last()
    else {
        return true;
    };
    let mut parts = Vec::new();
    let mut current = String::new();
    for ch in last.chars() {
        if (ch == '#' || ch == '.') && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        parts.push(current);
    }

    parts.iter().all(|part| {
        let (kind, name) = part.split_at(if part.starts_with(['#', '.']) { 1 } else { 0 });
        let name = regex::escape(name);
        let pattern = match kind {
            "#" => format!(r#"(?i)\bid\s*=\s*["']?{name}(["'\s/>]|$)"#),
            "." => format!(r#"(?i)\bclass\s*=\s*["']([^"']*\s)?{name}["'\s]"#),
            _ => format!(r"(?i)<{name}[\s/>]"),
        };
        Regex::new(&pattern).is_ok_and(|re| re.is_match(html))
    })
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text,
    }
}

impl Toolbox {
    pub async fn browse(&self, args: BrowseArgs) -> Result<String, ToolError> {
        let url = normalize_url(&args.url)?;
        let wait_ms = args.wait_time_ms.unwrap_or(self.cfg.browse_default_wait_ms);
        let max_chars = args
            .max_text_chars
            .unwrap_or(self.cfg.browse_max_text_chars);

        debug!(url = %url, "fetching page");
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ToolError::PageLoad(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ToolError::PageLoad(format!("HTTP {status} for {url}")));
        }
        let html = resp
            .text()
            .await
            .map_err(|e| ToolError::PageLoad(e.to_string()))?;
        if wait_ms > 0 {
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
        }
        if let Some(sel) = args.wait_selector.as_deref().map(str::trim)
            && !sel.is_empty()
            && !selector_present(&html, sel)
        {
            return Err(ToolError::PageLoad(format!("selector not found: {sel}")));
        }

        let text = truncate_chars(html_to_text(&html), max_chars);
        if text.is_empty() {
            Ok("(no text content)".to_string())
        } else {
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolsConfig;
    use httptest::{Expectation, Server, matchers::*, responders::*};
    use tempfile::tempdir;

    const PAGE: &str = r#"<!doctype html>
<html><head><title>Daily &amp; Notes</title>
<style>body { color: red; }</style>
<script>var x = "<p>not text</p>";</script></head>
<body>
  <!-- hidden comment -->
  <div id="content" class="main wide">
    <h1>Hello&nbsp;world</h1>
    <p>First   paragraph
       continues here.</p>
    <ul><li>one</li><li>two &lt;3</li></ul>
  </div>
</body></html>"#;

    fn args(url: String) -> BrowseArgs {
        BrowseArgs {
            url,
            wait_selector: None,
            wait_time_ms: Some(0),
            max_text_chars: None,
        }
    }

    fn toolbox() -> (tempfile::TempDir, Toolbox) {
        let dir = tempdir().unwrap();
        let tb = Toolbox::new(dir.path(), dir.path(), ToolsConfig::default()).unwrap();
        (dir, tb)
    }

    #[test]
    fn html_is_reduced_to_readable_text() {
        assert_eq!(
            html_to_text(PAGE),
            "Daily & Notes\n\nHello world\n\nFirst paragraph continues here.\n\n- one\n- two <3"
        );
    }

    #[test]
    fn entities_decode_and_unknown_ones_survive() {
        assert_eq!(decode_entities("a &#65;&#x42; &bogus; & b"), "a AB &bogus; & b");
    }

    #[test]
    fn urls_get_a_scheme_and_need_a_host() {
        assert_eq!(
            normalize_url(" example.com/x ").unwrap().as_str(),
            "https://example.com/x"
        );
        assert_eq!(
            normalize_url("http://example.com").unwrap().scheme(),
            "http"
        );
        assert!(matches!(normalize_url("   "), Err(ToolError::UrlRequired)));
        assert!(matches!(normalize_url("https://"), Err(ToolError::InvalidUrl)));
    }

    #[test]
    fn selectors_match_ids_classes_and_tags() {
        assert!(selector_present(PAGE, "#content"));
        assert!(selector_present(PAGE, ".wide"));
        assert!(selector_present(PAGE, "div.main"));
        assert!(selector_present(PAGE, "body ul"));
        assert!(!selector_present(PAGE, "#missing"));
        assert!(!selector_present(PAGE, "table"));
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("héllo".into(), 10), "héllo");
        assert_eq!(
            truncate_chars("héllo".into(), 2),
            "hé\n\n[... truncated for length ...]"
        );
    }

    #[tokio::test]
    async fn fetches_and_converts_page() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/page"))
                .respond_with(status_code(200).body(PAGE)),
        );
        let (_dir, tb) = toolbox();
        let mut a = args(server.url("/page").to_string());
        a.wait_selector = Some("#content".into());
        let out = tb.browse(a).await.unwrap();
        assert!(out.starts_with("Daily & Notes"), "{out}");
        assert!(!out.contains("not text"));
    }

    #[tokio::test]
    async fn truncates_long_pages() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/long"))
                .respond_with(status_code(200).body("<p>abcdefghij</p>")),
        );
        let (_dir, tb) = toolbox();
        let mut a = args(server.url("/long").to_string());
        a.max_text_chars = Some(4);
        assert_eq!(
            tb.browse(a).await.unwrap(),
            "abcd\n\n[... truncated for length ...]"
        );
    }

    #[tokio::test]
    async fn missing_selector_and_http_errors_fail_the_load() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/ok"))
                .respond_with(status_code(200).body(PAGE)),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/gone"))
                .respond_with(status_code(404)),
        );
        let (_dir, tb) = toolbox();

        let mut a = args(server.url("/ok").to_string());
        a.wait_selector = Some("#nope".into());
        assert_eq!(
            tb.browse(a).await.unwrap_err().to_string(),
            "failed to load page: selector not found: #nope"
        );

        let err = tb.browse(args(server.url("/gone").to_string())).await.unwrap_err();
        assert!(err.to_string().starts_with("failed to load page: HTTP 404"), "{err}");
    }

    #[tokio::test]
    async fn empty_page_has_placeholder_text() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/empty"))
                .respond_with(status_code(200).body("<html><script>x()</script></html>")),
        );
        let (_dir, tb) = toolbox();
        assert_eq!(
            tb.browse(args(server.url("/empty").to_string())).await.unwrap(),
            "(no text content)"
        );
    }
}
