//! Fetch pages over HTTP and persist them: single URL, URL list, and one
//! level of link following.

use crate::error::ToolError;
use crate::html::{sanitize_filename, HtmlExtractor};
use crate::net::{normalize_url, Fetcher, Page};
use crate::output::{write_lines, write_text};
use crate::tool::ToolKind;
use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use url::Url;

const MAX_NAME_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileNaming {
    /// `<tool>-<sanitized url>.txt`
    #[default]
    Sanitized,
    /// Last path segment of the URL, query dropped.
    UrlBasename,
}

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub output_dir: PathBuf,
    /// Save visible text instead of the raw body.
    pub text_only: bool,
    pub naming: FileNaming,
    /// Identity used in generated file names.
    pub tool: ToolKind,
}

#[derive(Debug, Clone)]
pub struct SavedPage {
    pub url: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FailedUrl {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub saved: Vec<SavedPage>,
    pub failed: Vec<FailedUrl>,
}

impl BatchReport {
    fn fail(&mut self, url: &str, err: &anyhow::Error) {
        error!("Error retrieving {}: {:#}", url, err);
        self.failed.push(FailedUrl { url: url.to_string(), reason: format!("{:#}", err) });
    }

    pub fn print_summary(&self) {
        println!("Saved {} page(s), {} failure(s)", self.saved.len(), self.failed.len());
        for page in &self.saved {
            println!("  ✓ {} -> {}", page.url, page.path.display());
        }
        for failure in &self.failed {
            println!("  ✗ {}: {}", failure.url, failure.reason);
        }
    }
}

pub struct Scraper {
    fetcher: Fetcher,
    html: HtmlExtractor,
    options: ScrapeOptions,
}

/// Read one URL per line; blank lines and `#` comments are ignored.
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(ToolError::missing("URL list", path).into());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

impl Scraper {
    pub fn new(fetcher: Fetcher, options: ScrapeOptions) -> Result<Self> {
        Ok(Self { fetcher, html: HtmlExtractor::new()?, options })
    }

    /// Output file name for `url`.
    pub fn file_name_for(&self, url: &Url) -> String {
        let sanitized = || {
            let mut name = sanitize_filename(url.as_str());
            if name.len() > MAX_NAME_LEN {
                let mut cut = MAX_NAME_LEN;
                while !name.is_char_boundary(cut) {
                    cut -= 1;
                }
                name.truncate(cut);
            }
            format!("{}-{}.txt", self.options.tool, name)
        };

        match self.options.naming {
            FileNaming::Sanitized => sanitized(),
            FileNaming::UrlBasename => url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(sanitize_filename)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(sanitized),
        }
    }

    fn content_of(&self, page: &Page) -> String {
        if self.options.text_only {
            self.html.visible_text(&page.body)
        } else {
            page.body.clone()
        }
    }

    fn save(&self, page: &Page, file_name: &str) -> Result<PathBuf> {
        let path = self.options.output_dir.join(file_name);
        write_text(&path, &self.content_of(page))?;
        info!("Content from {} saved to {}", page.url, path.display());
        Ok(path)
    }

    /// Fetch `url` and save it under a name not yet used in this run.
    async fn fetch_and_save_unique(&self, url: &Url, used: &mut HashSet<String>) -> Result<(Page, PathBuf)> {
        let page = self.fetcher.get(url).await?;
        let name = unique_name(used, self.file_name_for(url));
        let path = self.save(&page, &name)?;
        Ok((page, path))
    }

    /// Fetch one URL and save it as `name` (or a URL-derived name).
    pub async fn scrape_url(&self, raw: &str, name: Option<&str>) -> Result<PathBuf> {
        let url = normalize_url(raw)?;
        let page = self.fetcher.get(&url).await?;
        let file_name = match name {
            Some(name) => name.to_string(),
            None => self.file_name_for(&url),
        };
        self.save(&page, &file_name)
    }

    /// Fetch every URL listed in `list_file`, one at a time. A failing URL is
    /// logged once and recorded; the batch keeps going.
    pub async fn scrape_list(&self, list_file: &Path) -> Result<BatchReport> {
        let urls = read_url_list(list_file)?;
        info!("Scraping {} URL(s) from {}", urls.len(), list_file.display());

        let mut report = BatchReport::default();
        let mut used = HashSet::new();
        for raw in urls {
            let url = match normalize_url(&raw) {
                Ok(url) => url,
                Err(err) => {
                    report.fail(&raw, &err);
                    continue;
                }
            };
            match self.fetch_and_save_unique(&url, &mut used).await {
                Ok((_, path)) => report.saved.push(SavedPage { url: url.to_string(), path }),
                Err(err) => report.fail(url.as_str(), &err),
            }
        }

        info!("Saved {} page(s), {} failure(s)", report.saved.len(), report.failed.len());
        Ok(report)
    }

    /// Fetch `raw`, then every page it links to, one level deep. No URL is
    /// fetched twice. Failure to fetch the start page aborts the run.
    pub async fn scrape_with_links(&self, raw: &str) -> Result<BatchReport> {
        let start = normalize_url(raw)?;
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(visit_key(&start));

        let mut used = HashSet::new();
        let (page, path) = self.fetch_and_save_unique(&start, &mut used).await?;
        visited.insert(visit_key(&page.url));

        let mut report = BatchReport::default();
        report.saved.push(SavedPage { url: start.to_string(), path });

        let links = self.html.extract_links(&page.body, &page.url);
        info!("Found {} link(s) on {}", links.len(), page.url);

        for link in links {
            if !visited.insert(visit_key(&link)) {
                continue;
            }
            match self.fetch_and_save_unique(&link, &mut used).await {
                Ok((linked, path)) => {
                    visited.insert(visit_key(&linked.url));
                    report.saved.push(SavedPage { url: link.to_string(), path });
                }
                Err(err) => report.fail(link.as_str(), &err),
            }
        }

        Ok(report)
    }

    /// Save the resolved links of one page, one per line.
    pub async fn collect_links(&self, raw: &str) -> Result<(PathBuf, Vec<Url>)> {
        let url = normalize_url(raw)?;
        let page = self.fetcher.get(&url).await?;
        let links = self.html.extract_links(&page.body, &page.url);
        if links.is_empty() {
            warn!("No links found on {}", url);
        }
        info!("Extracted {} links from {}", links.len(), url);

        let path = self.options.output_dir.join(self.file_name_for(&url));
        write_lines(&path, links.iter().map(|l| l.as_str()))?;
        info!("Links saved to {}", path.display());
        Ok((path, links))
    }
}

/// `name`, or `name` with `-2`, `-3`, ... before its extension when an
/// earlier page of the run already took it.
fn unique_name(used: &mut HashSet<String>, name: String) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name.as_str(), ""),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{stem}-{n}{ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn visit_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_names_get_a_counter_before_the_extension() {
        let mut used = HashSet::new();
        assert_eq!(unique_name(&mut used, "page".into()), "page");
        assert_eq!(unique_name(&mut used, "page".into()), "page-2");
        assert_eq!(unique_name(&mut used, "page".into()), "page-3");
        assert_eq!(unique_name(&mut used, "index.html".into()), "index.html");
        assert_eq!(unique_name(&mut used, "index.html".into()), "index-2.html");
        assert_eq!(unique_name(&mut used, ".env".into()), ".env");
        assert_eq!(unique_name(&mut used, ".env".into()), ".env-2");
    }
}
