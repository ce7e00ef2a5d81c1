//! USD to local-currency exchange rate with a TTL cache and a constant fallback.
//!
//! ```text
//! get_rate() ──► cache fresh? ──yes──► cached rate
//!                    │ no
//!                    ▼
//!              RateSource::fetch ──ok──► cache + return (Live)
//!                    │ err
//!                    ▼
//!              fallback constant ──► cache + return (Fallback)
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or};
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strum::Display;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Rate used whenever the quote source fails
pub const DEFAULT_FALLBACK_RATE: Decimal = dec!(5.80);

/// Exchange-rate settings
#[derive(Clone, Debug)]
pub struct RateConfig {
    pub endpoint: String,
    /// ISO code of the target currency, e.g. `BRL`
    pub local_currency: String,
    /// Symbol printed before local amounts, e.g. `R$`
    pub currency_symbol: String,
    /// Field of the quote object holding the rate
    pub quote_field: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub fallback_rate: Decimal,
}

impl RateConfig {
    /// Key of the quote object in the response body, e.g. `USDBRL`
    pub fn quote_key(&self) -> String {
        format!("USD{}", self.local_currency)
    }
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://economia.awesomeapi.com.br/last/USD-BRL".to_string(),
            local_currency: "BRL".to_string(),
            currency_symbol: "R$".to_string(),
            quote_field: "bid".to_string(),
            timeout: Duration::from_millis(2000),
            cache_ttl: Duration::from_secs(3600),
            fallback_rate: DEFAULT_FALLBACK_RATE,
        }
    }
}

impl FromEnv for RateConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            endpoint: env_or_default("RATE_API_URL", &defaults.endpoint),
            local_currency: env_or_default("LOCAL_CURRENCY", &defaults.local_currency)
                .to_uppercase(),
            currency_symbol: env_or_default("LOCAL_CURRENCY_SYMBOL", &defaults.currency_symbol),
            quote_field: env_or_default("RATE_QUOTE_FIELD", &defaults.quote_field),
            timeout: Duration::from_millis(env_parse_or("RATE_TIMEOUT_MS", 2000u64)?),
            cache_ttl: Duration::from_secs(env_parse_or("RATE_CACHE_TTL_SECS", 3600u64)?),
            fallback_rate: env_parse_or("RATE_FALLBACK", defaults.fallback_rate)?,
        })
    }
}

/// Why a quote could not be obtained. Never leaves this module's provider.
#[derive(Debug, Error)]
pub enum RateError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Quote source returned status {0}")]
    Status(u16),

    #[error("Malformed quote response: {0}")]
    Malformed(String),
}

/// External quote source
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch(&self) -> Result<Decimal, RateError>;
}

/// Pull the rate out of `{ "<quote_key>": { "<field>": "5.4321", ... } }`.
///
/// The field may be a JSON string or number; the rate must be positive.
pub fn extract_quote(
    body: &serde_json::Value,
    quote_key: &str,
    field: &str,
) -> Result<Decimal, RateError> {
    let value = body
        .get(quote_key)
        .and_then(|quote| quote.get(field))
        .ok_or_else(|| RateError::Malformed(format!("missing {quote_key}.{field}")))?;

    let rate: Decimal = match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| RateError::Malformed(format!("{quote_key}.{field} is not numeric: {value}")))?;

    if rate <= Decimal::ZERO {
        return Err(RateError::Malformed(format!("non-positive rate {rate}")));
    }
    Ok(rate)
}

/// Quote source speaking the AwesomeAPI `last/USD-XXX` format
pub struct AwesomeApiSource {
    client: Client,
    endpoint: String,
    quote_key: String,
    quote_field: String,
    timeout: Duration,
}

impl AwesomeApiSource {
    pub fn new(config: &RateConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            quote_key: config.quote_key(),
            quote_field: config.quote_field.clone(),
            timeout: config.timeout,
        }
    }
}

#[async_trait]
impl RateSource for AwesomeApiSource {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch(&self) -> Result<Decimal, RateError> {
        let response = self
            .client
            .get(&self.endpoint)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RateError::Status(status.as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RateError::Malformed(e.to_string()))?;

        extract_quote(&body, &self.quote_key, &self.quote_field)
    }
}

/// Source that always answers with a pinned rate
#[derive(Debug, Clone, Copy)]
pub struct StaticRateSource(pub Decimal);

#[async_trait]
impl RateSource for StaticRateSource {
    async fn fetch(&self) -> Result<Decimal, RateError> {
        Ok(self.0)
    }
}

/// Time source for cache staleness
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Where a rate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RateOrigin {
    Live,
    Fallback,
}

/// A rate together with its provenance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateQuote {
    pub rate: Decimal,
    pub origin: RateOrigin,
    pub fetched_at: DateTime<Utc>,
}

impl RateQuote {
    /// Fresh while `now - fetched_at < ttl`. A clock that went backwards
    /// keeps the quote fresh.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (now - self.fetched_at).to_std() {
            Ok(age) => age >= ttl,
            Err(_) => false,
        }
    }
}

/// Cached, always-available exchange rate
pub struct RateProvider {
    source: Box<dyn RateSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    fallback_rate: Decimal,
    cache: tokio::sync::Mutex<Option<RateQuote>>,
}

impl RateProvider {
    pub fn new(source: Box<dyn RateSource>, config: &RateConfig) -> Self {
        Self::with_clock(source, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        source: Box<dyn RateSource>,
        clock: Arc<dyn Clock>,
        config: &RateConfig,
    ) -> Self {
        Self {
            source,
            clock,
            ttl: config.cache_ttl,
            fallback_rate: config.fallback_rate,
            cache: tokio::sync::Mutex::new(None),
        }
    }

    /// Current rate; never fails
    pub async fn get_rate(&self) -> Decimal {
        self.get_quote().await.rate
    }

    /// Current rate with provenance.
    ///
    /// Within the validity window the cached quote is returned without
    /// touching the source. A fallback quote is cached like a live one.
    pub async fn get_quote(&self) -> RateQuote {
        let mut cache = self.cache.lock().await;
        let now = self.clock.now();

        if let Some(quote) = cache.as_ref() {
            if !quote.is_stale(now, self.ttl) {
                debug!(rate = %quote.rate, origin = %quote.origin, "Using cached exchange rate");
                return *quote;
            }
        }

        let quote = match self.source.fetch().await {
            Ok(rate) => {
                info!(%rate, "Fetched exchange rate");
                RateQuote {
                    rate,
                    origin: RateOrigin::Live,
                    fetched_at: now,
                }
            }
            Err(e) => {
                warn!(error = %e, fallback = %self.fallback_rate, "Exchange rate fetch failed, using fallback");
                RateQuote {
                    rate: self.fallback_rate,
                    origin: RateOrigin::Fallback,
                    fetched_at: now,
                }
            }
        };

        *cache = Some(quote);
        quote
    }

    /// Drop the cached quote so the next call queries the source
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
    }

    fn provider(source: MockRateSource, clock: Arc<ManualClock>) -> RateProvider {
        RateProvider::with_clock(Box::new(source), clock, &RateConfig::default())
    }

    #[test]
    fn test_extract_quote_from_string_field() {
        let body = json!({ "USDBRL": { "code": "USD", "bid": "5.4321", "ask": "5.4400" } });
        assert_eq!(extract_quote(&body, "USDBRL", "bid").unwrap(), dec!(5.4321));
    }

    #[test]
    fn test_extract_quote_from_number_field() {
        let body = json!({ "USDEUR": { "bid": 0.92 } });
        assert_eq!(extract_quote(&body, "USDEUR", "bid").unwrap(), dec!(0.92));
    }

    #[test]
    fn test_extract_quote_rejects_bad_shapes() {
        let cases = [
            json!({}),
            json!({ "USDBRL": {} }),
            json!({ "USDBRL": { "bid": "abc" } }),
            json!({ "USDBRL": { "bid": null } }),
            json!({ "USDBRL": { "bid": "0" } }),
            json!({ "USDBRL": { "bid": "-1.2" } }),
            json!([1, 2, 3]),
        ];
        for body in cases {
            assert!(
                matches!(extract_quote(&body, "USDBRL", "bid"), Err(RateError::Malformed(_))),
                "expected malformed for {body}"
            );
        }
    }

    #[test]
    fn test_quote_staleness() {
        let quote = RateQuote {
            rate: dec!(5),
            origin: RateOrigin::Live,
            fetched_at: start(),
        };
        let ttl = Duration::from_secs(3600);

        assert!(!quote.is_stale(start(), ttl));
        assert!(!quote.is_stale(start() + chrono::Duration::seconds(3599), ttl));
        assert!(quote.is_stale(start() + chrono::Duration::seconds(3600), ttl));
        assert!(!quote.is_stale(start() - chrono::Duration::seconds(10), ttl));
    }

    #[tokio::test]
    async fn test_second_call_within_window_uses_cache() {
        let mut source = MockRateSource::new();
        source.expect_fetch().times(1).returning(|| Ok(dec!(5.25)));
        let clock = Arc::new(ManualClock::new(start()));
        let rates = provider(source, clock.clone());

        assert_eq!(rates.get_rate().await, dec!(5.25));
        clock.advance(Duration::from_secs(1800));
        let quote = rates.get_quote().await;
        assert_eq!(quote.rate, dec!(5.25));
        assert_eq!(quote.origin, RateOrigin::Live);
        assert_eq!(quote.fetched_at, start());
    }

    #[tokio::test]
    async fn test_refetches_after_window() {
        let mut source = MockRateSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(dec!(5.00)));
        source
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(dec!(5.50)));
        let clock = Arc::new(ManualClock::new(start()));
        let rates = provider(source, clock.clone());

        assert_eq!(rates.get_rate().await, dec!(5.00));
        clock.advance(Duration::from_secs(3600));
        assert_eq!(rates.get_rate().await, dec!(5.50));
    }

    #[tokio::test]
    async fn test_failure_returns_fallback_and_caches_it() {
        let mut source = MockRateSource::new();
        source
            .expect_fetch()
            .times(1)
            .returning(|| Err(RateError::Status(503)));
        let clock = Arc::new(ManualClock::new(start()));
        let rates = provider(source, clock.clone());

        let quote = rates.get_quote().await;
        assert_eq!(quote.rate, DEFAULT_FALLBACK_RATE);
        assert_eq!(quote.origin, RateOrigin::Fallback);

        clock.advance(Duration::from_secs(60));
        assert_eq!(rates.get_rate().await, DEFAULT_FALLBACK_RATE);
    }

    #[tokio::test]
    async fn test_configured_fallback_is_used() {
        let mut source = MockRateSource::new();
        source
            .expect_fetch()
            .returning(|| Err(RateError::Malformed("garbage".to_string())));
        let config = RateConfig {
            fallback_rate: dec!(6.10),
            ..Default::default()
        };
        let rates = RateProvider::new(Box::new(source), &config);

        assert_eq!(rates.get_rate().await, dec!(6.10));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let mut source = MockRateSource::new();
        source.expect_fetch().times(2).returning(|| Ok(dec!(5.10)));
        let rates = provider(source, Arc::new(ManualClock::new(start())));

        rates.get_rate().await;
        rates.invalidate().await;
        rates.get_rate().await;
    }

    #[tokio::test]
    async fn test_static_source() {
        let rates = RateProvider::new(Box::new(StaticRateSource(dec!(4.75))), &RateConfig::default());
        let quote = rates.get_quote().await;
        assert_eq!(quote.rate, dec!(4.75));
        assert_eq!(quote.origin, RateOrigin::Live);
    }

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("RATE_API_URL", Some("http://rates.local/last/USD-EUR")),
                ("LOCAL_CURRENCY", Some("eur")),
                ("LOCAL_CURRENCY_SYMBOL", Some("EUR")),
                ("RATE_TIMEOUT_MS", Some("750")),
                ("RATE_CACHE_TTL_SECS", Some("60")),
                ("RATE_FALLBACK", Some("0.95")),
            ],
            || {
                let config = RateConfig::from_env().unwrap();
                assert_eq!(config.endpoint, "http://rates.local/last/USD-EUR");
                assert_eq!(config.quote_key(), "USDEUR");
                assert_eq!(config.currency_symbol, "EUR");
                assert_eq!(config.timeout, Duration::from_millis(750));
                assert_eq!(config.cache_ttl, Duration::from_secs(60));
                assert_eq!(config.fallback_rate, dec!(0.95));
                assert_eq!(config.quote_field, "bid");
            },
        );
    }

    #[test]
    fn test_config_rejects_bad_fallback() {
        temp_env::with_var("RATE_FALLBACK", Some("five"), || {
            let err = RateConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("RATE_FALLBACK"));
        });
    }

    #[test]
    fn test_origin_displays_like_it_serializes() {
        for (origin, label) in [(RateOrigin::Live, "live"), (RateOrigin::Fallback, "fallback")] {
            assert_eq!(origin.to_string(), label);
            assert_eq!(serde_json::to_value(origin).unwrap(), json!(label));
        }
    }
}
