//! Pattern-based HTML helpers: anchor extraction and visible text.

use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

pub struct HtmlExtractor {
    anchor_href: Regex,
    hidden_blocks: Regex,
    block_breaks: Regex,
    tags: Regex,
    spaces: Regex,
}

impl HtmlExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            anchor_href: Regex::new(
                r#"(?is)<a\b[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
            )?,
            hidden_blocks: Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->")?,
            block_breaks: Regex::new(
                r"(?i)<br\s*/?>|</?(?:p|div|li|ul|ol|tr|table|section|article|header|footer|h[1-6]|title|pre|blockquote)\b[^>]*>",
            )?,
            tags: Regex::new(r"(?s)<[^>]*>")?,
            spaces: Regex::new(r"[ \t\x0B\x0C\r]+")?,
        })
    }

    /// Raw `href` values of every `<a>` tag, in document order.
    pub fn hrefs(&self, html: &str) -> Vec<String> {
        self.anchor_href
            .captures_iter(html)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
            .map(|m| decode_entities(m.as_str().trim()))
            .filter(|href| !href.is_empty())
            .collect()
    }

    /// Anchor targets resolved against `base`, http(s) only, fragments
    /// dropped, first occurrence kept.
    pub fn extract_links(&self, html: &str, base: &Url) -> Vec<Url> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for href in self.hrefs(html) {
            let Ok(mut url) = base.join(&href) else {
                continue;
            };
            if url.scheme() != "http" && url.scheme() != "https" {
                continue;
            }
            url.set_fragment(None);
            if seen.insert(url.as_str().to_string()) {
                links.push(url);
            }
        }
        links
    }

    /// Text a reader would see: scripts, styles and comments removed, tags
    /// stripped, entities decoded, blank lines collapsed.
    pub fn visible_text(&self, html: &str) -> String {
        let without_hidden = self.hidden_blocks.replace_all(html, " ");
        let with_breaks = self.block_breaks.replace_all(&without_hidden, "\n");
        let stripped = self.tags.replace_all(&with_breaks, "");
        let decoded = decode_entities(&stripped);

        let mut out = String::with_capacity(decoded.len());
        let mut last_blank = true;
        for line in decoded.lines() {
            let line = self.spaces.replace_all(line, " ");
            let line = line.trim();
            if line.is_empty() {
                if !last_blank {
                    out.push('\n');
                    last_blank = true;
                }
                continue;
            }
            out.push_str(line);
            out.push('\n');
            last_blank = false;
        }
        out.trim_end().to_string() + "\n"
    }
}

pub fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Keep alphanumerics, space, `.` and `_`; everything else becomes `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == ' ' || c == '.' || c == '_' { c } else { '_' })
        .collect()
}
