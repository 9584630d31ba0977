//! Retrieval of companion pages.
//!
//! [`PageSource`] is the seam between collection logic and the network;
//! [`HttpFetcher`] is the production implementation. The fetcher performs a
//! single attempt per call. Retrying is the caller's decision.

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use time::Date;
use tracing::{debug, info};

use connscore_types::puzzle_number_for;

use crate::config::{FetchConfig, redact_proxy};
use crate::error::{Error, Result};

/// Browser agents rotated through when no agent is configured.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPad; CPU OS 17_3_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_3_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Mobile/15E148 Safari/604.1",
];

const REFERER: &str = "https://www.nytimes.com/crosswords";

/// Share of requests that carry a `Referer`.
const REFERER_PROBABILITY: f64 = 0.7;

/// Source of raw page content for a puzzle date.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the companion page for `date`.
    ///
    /// Fails with [`Error::Network`] or [`Error::Http`]; both are retryable.
    async fn fetch(&self, date: Date) -> Result<String>;
}

/// Companion page URL for `date`.
///
/// ```
/// use connscore_core::companion_url;
/// use time::macros::date;
///
/// assert_eq!(
///     companion_url("https://www.nytimes.com", date!(2025 - 03 - 09)),
///     "https://www.nytimes.com/2025/03/09/crosswords/connections-companion-638.html"
/// );
/// ```
pub fn companion_url(base_url: &str, date: Date) -> String {
    format!(
        "{}/{:04}/{:02}/{:02}/crosswords/connections-companion-{}.html",
        base_url.trim_end_matches('/'),
        date.year(),
        u8::from(date.month()),
        date.day(),
        puzzle_number_for(date)
    )
}

/// Pick the User-Agent for one request.
pub fn pick_user_agent<'a, R: Rng + ?Sized>(configured: Option<&'a str>, rng: &mut R) -> &'a str {
    match configured {
        Some(agent) => agent,
        None => USER_AGENTS[rng.random_range(0..USER_AGENTS.len())],
    }
}

/// Fetches companion pages over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Build a fetcher.
    ///
    /// Fails with [`Error::InvalidConfig`] when the proxy URL or the
    /// configured User-Agent cannot be used.
    pub fn new(config: FetchConfig) -> Result<Self> {
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(Error::InvalidConfig(format!(
                "base URL must start with http:// or https://, got: {}",
                config.base_url
            )));
        }
        if let Some(agent) = &config.user_agent {
            HeaderValue::from_str(agent)
                .map_err(|e| Error::InvalidConfig(format!("invalid user agent: {}", e)))?;
        }

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .default_headers(browser_headers());

        builder = match &config.proxy_url {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(proxy).map_err(|e| {
                    Error::InvalidConfig(format!(
                        "invalid proxy URL {}: {}",
                        redact_proxy(proxy),
                        e
                    ))
                })?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        let client = builder
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;

        if let Some(proxy) = &config.proxy_url {
            info!("Using proxy {}", redact_proxy(proxy));
        }

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// URL requested for `date`.
    pub fn url_for(&self, date: Date) -> String {
        companion_url(&self.config.base_url, date)
    }

    fn pick_request_headers(&self) -> (String, bool) {
        let mut rng = rand::rng();
        let agent = pick_user_agent(self.config.user_agent.as_deref(), &mut rng).to_string();
        (agent, rng.random_bool(REFERER_PROBABILITY))
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self, date: Date) -> Result<String> {
        let url = self.url_for(date);
        let (agent, with_referer) = self.pick_request_headers();
        info!("Requesting {}", url);
        debug!("Using user agent: {}", agent);

        let mut request = self.client.get(&url).header(header::USER_AGENT, agent);
        if with_referer {
            request = request.header(header::REFERER, REFERER);
        }

        let response = request.send().await.map_err(|source| Error::Network {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| Error::Network {
            url: url.clone(),
            source,
        })?;
        debug!("Received {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use time::macros::date;

    #[test]
    fn test_companion_url() {
        assert_eq!(
            companion_url("https://www.nytimes.com/", date!(2024 - 01 - 05)),
            "https://www.nytimes.com/2024/01/05/crosswords/connections-companion-209.html"
        );
    }

    #[test]
    fn test_configured_user_agent_is_used() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(pick_user_agent(Some("custom/1.0"), &mut rng), "custom/1.0");
    }

    #[test]
    fn test_rotation_picks_from_list() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let agent = pick_user_agent(None, &mut rng);
            assert!(USER_AGENTS.contains(&agent));
        }
    }

    #[test]
    fn test_new_rejects_bad_proxy() {
        let config = FetchConfig {
            proxy_url: Some("not a url".into()),
            ..Default::default()
        };
        assert!(matches!(
            HttpFetcher::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_new_rejects_bad_base_url() {
        let config = FetchConfig {
            base_url: "ftp://example.com".into(),
            ..Default::default()
        };
        assert!(matches!(
            HttpFetcher::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_url_for_uses_base() {
        let fetcher = HttpFetcher::new(FetchConfig {
            base_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            fetcher.url_for(date!(2025 - 03 - 09)),
            "http://127.0.0.1:9/2025/03/09/crosswords/connections-companion-638.html"
        );
    }
}
