use crate::catalog::cache::ResponseCache;
use crate::catalog::normalize::{normalize_product_at, NormalizedProduct};
use crate::config::Settings;
use anyhow::Context;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// How many recent products a cohort is drawn from.
pub const RECENT_FETCH_LIMIT: usize = 250;

const PRODUCTS_PATH: &str = "products";
const PAGE_SIZE: u32 = 100;
const PAGE_SORT: &str = "createdAt,desc";
/// Pages beyond this are never requested, whatever `limit` asks for.
const MAX_PAGES: u32 = 3;
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);
const ERROR_BODY_PREVIEW: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog not configured: {0} is required")]
    NotConfigured(&'static str),

    #[error("invalid catalog url: {0}")]
    InvalidUrl(String),

    #[error("platform {path} HTTP {status}: {body}")]
    Http {
        path: String,
        status: u16,
        body: String,
    },

    #[error("platform request failed: {0}")]
    Transport(String),

    #[error("platform response is not valid JSON: {0}")]
    Decode(String),
}

/// Outcome of a best-effort catalog read. `Unavailable` keeps "upstream is
/// down or misconfigured" apart from "upstream answered with nothing" for
/// callers that care; [`CatalogFetch::into_products`] folds both into an
/// empty list for callers that don't.
#[derive(Debug)]
pub enum CatalogFetch {
    Products(Vec<NormalizedProduct>),
    Unavailable(CatalogError),
}

impl CatalogFetch {
    pub fn into_products(self) -> Vec<NormalizedProduct> {
        match self {
            Self::Products(products) => products,
            Self::Unavailable(_) => Vec::new(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[async_trait::async_trait]
pub trait CatalogTransport: Send + Sync {
    async fn get_json(&self, url: &Url, authorization: &str) -> Result<Value, CatalogError>;
}

#[derive(Debug, Clone)]
pub struct HttpCatalogTransport {
    http: reqwest::Client,
}

impl HttpCatalogTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build catalog http client")?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl CatalogTransport for HttpCatalogTransport {
    async fn get_json(&self, url: &Url, authorization: &str) -> Result<Value, CatalogError> {
        let res = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(CatalogError::Http {
                path: url.path().to_string(),
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_PREVIEW).collect(),
            });
        }

        serde_json::from_str::<Value>(&text).map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

pub struct CatalogClient {
    base_url: Option<String>,
    authorization: Option<String>,
    transport: Arc<dyn CatalogTransport>,
    cache: Arc<dyn ResponseCache>,
    cache_ttl: Duration,
}

impl CatalogClient {
    pub fn new(
        base_url: Option<String>,
        api_key: Option<String>,
        transport: Arc<dyn CatalogTransport>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        let authorization = api_key.map(|key| {
            if key.starts_with("Bearer ") {
                key
            } else {
                format!("Bearer {key}")
            }
        });

        Self {
            base_url,
            authorization,
            transport,
            cache,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Missing credentials are not an error here: they surface as
    /// [`CatalogError::NotConfigured`] on first use.
    pub fn from_settings(
        settings: &Settings,
        cache: Arc<dyn ResponseCache>,
    ) -> anyhow::Result<Self> {
        let transport =
            HttpCatalogTransport::new(Duration::from_secs(settings.platform_timeout_secs))?;
        Ok(Self::new(
            settings.platform_api_base.clone(),
            settings.platform_api_key.clone(),
            Arc::new(transport),
            cache,
        )
        .with_cache_ttl(Duration::from_secs(settings.catalog_cache_ttl_secs)))
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, CatalogError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or(CatalogError::NotConfigured("PLATFORM_API_BASE"))?;

        // A base that already ends in /api must not gain a second /api segment.
        let cleaned = path.trim_start_matches('/');
        let cleaned = cleaned.strip_prefix("api/").unwrap_or(cleaned);
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };

        let mut url = Url::parse(&base)
            .and_then(|b| b.join(cleaned))
            .map_err(|e| CatalogError::InvalidUrl(format!("{base}{cleaned}: {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            for (k, v) in params.iter().filter(|(_, v)| !v.is_empty()) {
                query.append_pair(k, v);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    async fn api_get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, CatalogError> {
        let authorization = self
            .authorization
            .as_deref()
            .ok_or(CatalogError::NotConfigured("PLATFORM_API_KEY"))?;
        let url = self.endpoint(path, params)?;

        let cache_key = format!("GET {url}");
        if let Some(hit) = self.cache.get(&cache_key).await {
            tracing::debug!(%url, "catalog cache hit");
            return Ok(hit);
        }

        let body = self.transport.get_json(&url, authorization).await?;
        self.cache.set(&cache_key, body.clone(), self.cache_ttl).await;
        Ok(body)
    }

    async fn get_page(&self, page: u32) -> Result<Value, CatalogError> {
        self.api_get(
            PRODUCTS_PATH,
            &[
                ("page", page.to_string()),
                ("size", PAGE_SIZE.to_string()),
                ("sort", PAGE_SORT.to_string()),
            ],
        )
        .await
    }

    /// Fetches up to three pages of the most recent products (server order,
    /// newest first) and normalises them. Never fails; see [`CatalogFetch`].
    pub async fn fetch_recent(&self, limit: usize) -> CatalogFetch {
        let mut items: Vec<Value> = Vec::new();

        let first_error = match self.get_page(1).await {
            // No pagination envelope: the whole answer is the first page.
            Ok(Value::Array(flat)) => return CatalogFetch::Products(normalize_all(flat)),
            Ok(envelope) => {
                items.extend(envelope_items(&envelope));
                if !items.is_empty() {
                    let total_pages = total_pages(&envelope);
                    for page in 2..=MAX_PAGES {
                        if total_pages < u64::from(page) {
                            break;
                        }
                        match self.get_page(page).await {
                            Ok(body) => items.extend(envelope_items(&body)),
                            Err(err) => {
                                tracing::warn!(page, error = %err, "catalog page fetch failed; keeping earlier pages");
                            }
                        }
                    }
                    tracing::debug!(items = items.len(), total_pages, "catalog pages fetched");
                    return CatalogFetch::Products(normalize_all(items));
                }
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "catalog first page fetch failed; trying unpaged listing");
                Some(err)
            }
        };

        match self
            .api_get(PRODUCTS_PATH, &[("limit", limit.to_string())])
            .await
        {
            Ok(Value::Array(flat)) => CatalogFetch::Products(normalize_all(flat)),
            Ok(envelope) => CatalogFetch::Products(normalize_all(envelope_items(&envelope))),
            Err(err) => {
                tracing::warn!(error = %err, "catalog unpaged listing failed");
                match first_error {
                    Some(first) => CatalogFetch::Unavailable(first),
                    None => CatalogFetch::Products(Vec::new()),
                }
            }
        }
    }

    /// Best-effort product list; upstream failure yields an empty list.
    pub async fn fetch_recent_products(&self, limit: usize) -> Vec<NormalizedProduct> {
        self.fetch_recent(limit).await.into_products()
    }
}

/// `totalPages` as the platform sends it: integer, float or numeric string.
/// Anything unreadable counts as a single page.
fn total_pages(envelope: &Value) -> u64 {
    let raw = match envelope.get("totalPages") {
        Some(Value::Number(n)) => n.as_u64().map(|v| v as f64).or_else(|| n.as_f64()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.filter(|v| v.is_finite() && *v >= 1.0)
        .map(|v| v.floor() as u64)
        .unwrap_or(1)
}

fn envelope_items(body: &Value) -> Vec<Value> {
    body.get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn normalize_all(items: Vec<Value>) -> Vec<NormalizedProduct> {
    let now = chrono::Utc::now();
    items
        .iter()
        .map(|raw| normalize_product_at(raw, now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::cache::{InMemoryResponseCache, NoopResponseCache};
    use serde_json::json;
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(&Url) -> Result<Value, CatalogError> + Send + Sync>;

    struct FakeTransport {
        calls: Mutex<Vec<String>>,
        auth_seen: Mutex<Vec<String>>,
        respond: Responder,
    }

    impl FakeTransport {
        fn new(
            respond: impl Fn(&Url) -> Result<Value, CatalogError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                auth_seen: Mutex::new(Vec::new()),
                respond: Box::new(respond),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl CatalogTransport for FakeTransport {
        async fn get_json(&self, url: &Url, authorization: &str) -> Result<Value, CatalogError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.auth_seen.lock().unwrap().push(authorization.to_string());
            (self.respond)(url)
        }
    }

    fn query_param(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    fn page_of(page: u64, n: usize, total_pages: u64) -> Value {
        let items: Vec<_> = (0..n)
            .map(|i| json!({"id": format!("p{page}-{i}"), "name": "FCN", "coupon": 8.0}))
            .collect();
        json!({"items": items, "totalPages": total_pages})
    }

    fn client(transport: Arc<FakeTransport>, cache: Arc<dyn ResponseCache>) -> CatalogClient {
        CatalogClient::new(
            Some("https://portal.example.com/api".to_string()),
            Some("secret".to_string()),
            transport,
            cache,
        )
    }

    #[tokio::test]
    async fn missing_configuration_is_unavailable_not_empty() {
        let transport = FakeTransport::new(|_| Ok(json!([])));
        let client = CatalogClient::new(None, None, transport.clone(), Arc::new(NoopResponseCache));

        let fetch = client.fetch_recent(250).await;
        assert!(matches!(
            fetch,
            CatalogFetch::Unavailable(CatalogError::NotConfigured(_))
        ));
        assert!(client.fetch_recent_products(250).await.is_empty());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn builds_urls_under_the_api_base_with_bearer_auth() {
        let transport = FakeTransport::new(|_| Ok(json!([])));
        let client = client(transport.clone(), Arc::new(NoopResponseCache));
        client.fetch_recent(250).await;

        let calls = transport.calls();
        assert_eq!(
            calls[0],
            "https://portal.example.com/api/products?page=1&size=100&sort=createdAt%2Cdesc"
        );
        assert_eq!(transport.auth_seen.lock().unwrap()[0], "Bearer secret");
    }

    #[tokio::test]
    async fn flat_list_is_treated_as_the_only_page() {
        let transport = FakeTransport::new(|_| {
            Ok(json!([{"id": "a", "coupon": 7}, {"id": "b"}]))
        });
        let client = client(transport.clone(), Arc::new(NoopResponseCache));

        let products = client.fetch_recent_products(250).await;
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].id.as_deref(), Some("a"));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn paginates_at_most_three_pages_in_fetch_order() {
        let transport = FakeTransport::new(|url| {
            let page: u64 = query_param(url, "page").unwrap().parse().unwrap();
            Ok(page_of(page, 100, 9))
        });
        let client = client(transport.clone(), Arc::new(NoopResponseCache));

        let products = client.fetch_recent_products(1000).await;
        assert_eq!(products.len(), 300);
        assert_eq!(products[0].id.as_deref(), Some("p1-0"));
        assert_eq!(products[100].id.as_deref(), Some("p2-0"));
        assert_eq!(products[299].id.as_deref(), Some("p3-99"));
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn stops_at_reported_total_pages() {
        let transport = FakeTransport::new(|url| {
            let page: u64 = query_param(url, "page").unwrap().parse().unwrap();
            Ok(page_of(page, 10, 2))
        });
        let client = client(transport.clone(), Arc::new(NoopResponseCache));

        assert_eq!(client.fetch_recent_products(250).await.len(), 20);
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn total_pages_accepts_float_and_string_forms() {
        for (total, expected_pages) in [(json!(3.0), 3), (json!("3"), 3), (json!(" 2.0 "), 2)] {
            let transport = FakeTransport::new(move |url| {
                let page: u64 = query_param(url, "page").unwrap().parse().unwrap();
                let mut body = page_of(page, 10, 0);
                body["totalPages"] = total.clone();
                Ok(body)
            });
            let client = client(transport.clone(), Arc::new(NoopResponseCache));

            assert_eq!(client.fetch_recent_products(250).await.len(), expected_pages * 10);
            assert_eq!(transport.calls().len(), expected_pages);
        }
    }

    #[test]
    fn unreadable_total_pages_means_one_page() {
        assert_eq!(total_pages(&json!({"totalPages": "many"})), 1);
        assert_eq!(total_pages(&json!({"totalPages": -4})), 1);
        assert_eq!(total_pages(&json!({"totalPages": null})), 1);
        assert_eq!(total_pages(&json!({})), 1);
        assert_eq!(total_pages(&json!({"totalPages": 7})), 7);
    }

    #[tokio::test]
    async fn later_page_failure_keeps_earlier_pages() {
        let transport = FakeTransport::new(|url| match query_param(url, "page").as_deref() {
            Some("1") => Ok(page_of(1, 5, 3)),
            Some("2") => Err(CatalogError::Transport("reset".into())),
            _ => Ok(page_of(3, 4, 3)),
        });
        let client = client(transport.clone(), Arc::new(NoopResponseCache));

        let products = client.fetch_recent_products(250).await;
        assert_eq!(products.len(), 9);
        assert_eq!(products[5].id.as_deref(), Some("p3-0"));
    }

    #[tokio::test]
    async fn falls_back_to_unpaged_listing_when_first_page_fails() {
        let transport = FakeTransport::new(|url| {
            if query_param(url, "limit").is_some() {
                Ok(json!({"items": [{"id": "x"}]}))
            } else {
                Err(CatalogError::Http {
                    path: url.path().to_string(),
                    status: 404,
                    body: String::new(),
                })
            }
        });
        let client = client(transport.clone(), Arc::new(NoopResponseCache));

        let products = client.fetch_recent_products(250).await;
        assert_eq!(products.len(), 1);
        assert!(transport.calls()[1].ends_with("products?limit=250"));
    }

    #[tokio::test]
    async fn every_request_failing_is_unavailable() {
        let transport = FakeTransport::new(|_| Err(CatalogError::Transport("timeout".into())));
        let client = client(transport, Arc::new(NoopResponseCache));

        let fetch = client.fetch_recent(250).await;
        assert!(fetch.is_unavailable());
        assert!(fetch.into_products().is_empty());
    }

    #[tokio::test]
    async fn cached_responses_skip_the_network() {
        let transport = FakeTransport::new(|url| {
            let page: u64 = query_param(url, "page").unwrap().parse().unwrap();
            Ok(page_of(page, 3, 1))
        });
        let client = client(transport.clone(), Arc::new(InMemoryResponseCache::new()));

        assert_eq!(client.fetch_recent_products(250).await.len(), 3);
        assert_eq!(client.fetch_recent_products(250).await.len(), 3);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let transport = FakeTransport::new(|_| Err(CatalogError::Transport("down".into())));
        let client = client(transport.clone(), Arc::new(InMemoryResponseCache::new()));

        client.fetch_recent(250).await;
        client.fetch_recent(250).await;
        assert_eq!(transport.calls().len(), 4);
    }
}
