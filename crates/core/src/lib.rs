pub mod catalog;
pub mod cohort;
pub mod domain;
pub mod ideas;
pub mod indicative;
pub mod llm;

pub mod config {
    //! Process settings read from the environment (after `dotenvy`). A missing
    //! catalog base URL or key is not an error here; the catalog client
    //! reports it as `CatalogError::NotConfigured` on first use.

    use anyhow::Context;
    use std::str::FromStr;

    pub const DEFAULT_ARTICLE_BASE: &str = "https://www.stropro.com/investments-solutions";
    const DEFAULT_PLATFORM_TIMEOUT_SECS: u64 = 8;
    const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 600;
    const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
    const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
    const DEFAULT_ANTHROPIC_MAX_TOKENS: u32 = 1024;
    const DEFAULT_ANTHROPIC_TIMEOUT_SECS: u64 = 30;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub platform_api_base: Option<String>,
        pub platform_api_key: Option<String>,
        pub platform_timeout_secs: u64,
        pub catalog_cache_ttl_secs: u64,
        pub anthropic_api_key: Option<String>,
        pub anthropic_base_url: String,
        pub anthropic_model: String,
        pub anthropic_max_tokens: u32,
        pub anthropic_timeout_secs: u64,
        pub article_base: String,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Same as [`Settings::from_env`], reading variables through `lookup`.
        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let var = |key: &str| {
                lookup(key)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            };
            let parsed = |key: &str| var(key).and_then(|s| parse_or_none(&s));

            Ok(Self {
                platform_api_base: var("PLATFORM_API_BASE"),
                platform_api_key: var("PLATFORM_API_KEY"),
                platform_timeout_secs: parsed("PLATFORM_TIMEOUT_SECS")
                    .unwrap_or(DEFAULT_PLATFORM_TIMEOUT_SECS),
                catalog_cache_ttl_secs: parsed("CATALOG_CACHE_TTL_SECS")
                    .unwrap_or(DEFAULT_CATALOG_CACHE_TTL_SECS),
                anthropic_api_key: var("ANTHROPIC_API_KEY"),
                anthropic_base_url: var("ANTHROPIC_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
                anthropic_model: var("ANTHROPIC_MODEL")
                    .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
                anthropic_max_tokens: var("ANTHROPIC_MAX_TOKENS")
                    .and_then(|s| parse_or_none(&s))
                    .unwrap_or(DEFAULT_ANTHROPIC_MAX_TOKENS),
                anthropic_timeout_secs: parsed("ANTHROPIC_TIMEOUT_SECS")
                    .unwrap_or(DEFAULT_ANTHROPIC_TIMEOUT_SECS),
                article_base: var("ARTICLE_BASE")
                    .unwrap_or_else(|| DEFAULT_ARTICLE_BASE.to_string()),
                sentry_dsn: var("SENTRY_DSN"),
            })
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }
    }

    fn parse_or_none<T: FromStr>(s: &str) -> Option<T> {
        s.parse().ok()
    }

}
