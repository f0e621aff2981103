use crate::config::HttpConfig;
use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// A fetched page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects.
    pub url: Url,
    pub body: String,
}

pub struct Fetcher {
    client: Client,
}

/// Parse user input as an http(s) URL, prepending `https://` when no scheme
/// is given.
pub fn normalize_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("empty URL");
    }
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    let url = Url::parse(&candidate).with_context(|| format!("invalid URL: {}", raw))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow!("unsupported URL scheme {} in {}", other, raw)),
    }
}

impl Fetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .context("building HTTP client")?;

        Ok(Self { client })
    }

    /// One GET. Non-2xx statuses are errors.
    pub async fn get(&self, url: &Url) -> Result<Page> {
        debug!("GET {}", url);
        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {} from {}", status, url);
        }
        let final_url = response.url().clone();
        let body = response.text().await?;
        Ok(Page { url: final_url, body })
    }

    /// GET and decode a JSON body.
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {} from {}", status, url);
        }
        Ok(response.json().await?)
    }
}
