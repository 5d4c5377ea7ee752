//! Rate sources: a blocking HTTP client and a file cache in front of it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use divfolio::{CurrencyCode, RateSource, RateSourceError, RateTable};
use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Body of a `latest rates` response: units of each currency per one unit
/// of `base`.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteResponse {
    #[serde(default)]
    pub base: Option<String>,
    pub rates: BTreeMap<String, f64>,
}

impl QuoteResponse {
    /// Convert quotes into factors for `reporting`. The response's own base
    /// wins over `default_base` when it names a valid code.
    pub fn into_table(
        self,
        reporting: CurrencyCode,
        default_base: CurrencyCode,
    ) -> std::result::Result<RateTable, RateSourceError> {
        let base = self
            .base
            .as_deref()
            .and_then(CurrencyCode::new)
            .unwrap_or(default_base);
        RateTable::from_base_quotes(
            reporting,
            base,
            self.rates.iter().map(|(code, quote)| (code.as_str(), *quote)),
        )
        .map_err(|e| RateSourceError::Malformed(e.to_string()))
    }
}

/// Blocking client for an exchangerate.host-style endpoint.
pub struct HttpRateSource {
    client: Client,
    url: String,
    base: CurrencyCode,
}

impl HttpRateSource {
    pub fn new(url: &str, base: CurrencyCode, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            base,
        })
    }

    fn request_url(&self) -> String {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{sep}base={}", self.url, self.base)
    }
}

impl RateSource for HttpRateSource {
    fn fetch(&self, reporting: CurrencyCode) -> std::result::Result<RateTable, RateSourceError> {
        let url = self.request_url();
        debug!("GET {url}");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| RateSourceError::Unavailable(format!("rate request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(RateSourceError::Unavailable(format!(
                "rate endpoint returned {}",
                resp.status()
            )));
        }

        resp.json::<QuoteResponse>()
            .map_err(|e| RateSourceError::Malformed(format!("failed to parse rates: {e}")))?
            .into_table(reporting, self.base)
    }
}

/// On-disk form of a cached table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedRates {
    fetched_at: DateTime<Utc>,
    reporting: String,
    rates: BTreeMap<String, f64>,
}

impl CachedRates {
    fn from_table(table: &RateTable, fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at,
            reporting: table.reporting().to_string(),
            rates: table
                .entries()
                .into_iter()
                .map(|(code, rate)| (code.to_string(), rate))
                .collect(),
        }
    }

    fn table(&self, reporting: CurrencyCode) -> std::result::Result<RateTable, RateSourceError> {
        let mut table = RateTable::new(reporting);
        for (raw, rate) in &self.rates {
            let code = CurrencyCode::new(raw)
                .ok_or_else(|| RateSourceError::Malformed(format!("cached code {raw:?}")))?;
            table
                .insert(code, *rate)
                .map_err(|e| RateSourceError::Malformed(e.to_string()))?;
        }
        Ok(table)
    }
}

/// Time-boxed file cache around another source.
///
/// A cache younger than `ttl` is served without fetching. When a fetch
/// fails, an expired cache is served as the last known table. With no
/// usable cache the inner error is returned.
pub struct CachedRateSource<S> {
    inner: S,
    path: PathBuf,
    ttl: chrono::Duration,
}

impl<S: RateSource> CachedRateSource<S> {
    pub fn new(inner: S, path: impl Into<PathBuf>, ttl: chrono::Duration) -> Self {
        Self {
            inner,
            path: path.into(),
            ttl,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// [`RateSource::fetch`] with an explicit clock.
    pub fn fetch_at(
        &self,
        reporting: CurrencyCode,
        now: DateTime<Utc>,
    ) -> std::result::Result<RateTable, RateSourceError> {
        let cached = self.read_cache(reporting);

        if let Some(c) = &cached {
            if now - c.fetched_at < self.ttl {
                info!("using cached rates from {}", c.fetched_at);
                return c.table(reporting);
            }
        }

        match self.inner.fetch(reporting) {
            Ok(table) => {
                if let Err(e) = self.write_cache(&table, now) {
                    warn!("could not write rate cache {}: {e}", self.path.display());
                }
                Ok(table)
            }
            Err(e) => match cached {
                Some(c) => {
                    warn!("{e}; serving last known rates from {}", c.fetched_at);
                    c.table(reporting)
                }
                None => Err(e),
            },
        }
    }

    fn read_cache(&self, reporting: CurrencyCode) -> Option<CachedRates> {
        let contents = fs::read_to_string(&self.path).ok()?;
        let cached: CachedRates = match serde_json::from_str(&contents) {
            Ok(c) => c,
            Err(e) => {
                warn!("ignoring unreadable rate cache {}: {e}", self.path.display());
                return None;
            }
        };
        if CurrencyCode::new(&cached.reporting) != Some(reporting) {
            debug!("rate cache reports in {}, want {reporting}", cached.reporting);
            return None;
        }
        Some(cached)
    }

    fn write_cache(&self, table: &RateTable, now: DateTime<Utc>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&CachedRates::from_table(table, now))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, json)
    }
}

impl<S: RateSource> RateSource for CachedRateSource<S> {
    fn fetch(&self, reporting: CurrencyCode) -> std::result::Result<RateTable, RateSourceError> {
        self.fetch_at(reporting, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Counts calls and either returns a table or fails.
    struct Scripted {
        table: Option<RateTable>,
        calls: Cell<usize>,
    }

    impl Scripted {
        fn ok(usd: f64) -> Self {
            let table = RateTable::new(CurrencyCode::SEK)
                .with_rate(CurrencyCode::USD, usd)
                .unwrap();
            Self {
                table: Some(table),
                calls: Cell::new(0),
            }
        }

        fn down() -> Self {
            Self {
                table: None,
                calls: Cell::new(0),
            }
        }
    }

    impl RateSource for Scripted {
        fn fetch(&self, _: CurrencyCode) -> std::result::Result<RateTable, RateSourceError> {
            self.calls.set(self.calls.get() + 1);
            self.table
                .clone()
                .ok_or_else(|| RateSourceError::Unavailable("offline".into()))
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-19T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn day() -> chrono::Duration {
        chrono::Duration::hours(24)
    }

    #[test]
    fn quote_response_to_table() {
        let body = r#"{"base":"USD","rates":{"SEK":10.5,"CAD":1.35,"NOK":10.5,"USD":1.0}}"#;
        let resp: QuoteResponse = serde_json::from_str(body).unwrap();
        let table = resp.into_table(CurrencyCode::SEK, CurrencyCode::EUR).unwrap();
        assert_eq!(table.rate("SEK"), 1.0);
        assert!((table.rate("USD") - 10.5).abs() < 1e-12);
        assert!((table.rate("CAD") - 10.5 / 1.35).abs() < 1e-12);
        assert!((table.rate("NOK") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn quote_response_without_reporting_is_malformed() {
        let body = r#"{"rates":{"CAD":1.35}}"#;
        let resp: QuoteResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            resp.into_table(CurrencyCode::SEK, CurrencyCode::USD),
            Err(RateSourceError::Malformed(_))
        ));
    }

    #[test]
    fn request_url_appends_base() {
        let src = HttpRateSource::new(
            "https://example.test/latest",
            CurrencyCode::USD,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(src.request_url(), "https://example.test/latest?base=USD");
    }

    /// Answer one HTTP request with `status` and `body`; the handle yields
    /// the request line.
    fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/latest", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            let text = String::from_utf8_lossy(&request).into_owned();
            text.lines().next().unwrap_or_default().to_string()
        });
        (url, handle)
    }

    #[test]
    fn http_fetch_decodes_quotes() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"base":"USD","rates":{"SEK":10.5,"CAD":1.4}}"#,
        );
        let src = HttpRateSource::new(&url, CurrencyCode::USD, Duration::from_secs(5)).unwrap();
        let table = src.fetch(CurrencyCode::SEK).unwrap();

        assert!(server.join().unwrap().starts_with("GET /latest?base=USD "));
        assert!((table.rate("USD") - 10.5).abs() < 1e-12);
        assert!((table.rate("CAD") - 7.5).abs() < 1e-12);
    }

    #[test]
    fn http_error_status_is_unavailable() {
        let (url, server) = serve_once("503 Service Unavailable", "{}");
        let src = HttpRateSource::new(&url, CurrencyCode::USD, Duration::from_secs(5)).unwrap();
        let err = src.fetch(CurrencyCode::SEK).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, RateSourceError::Unavailable(_)));
    }

    #[test]
    fn http_garbage_body_is_malformed() {
        let (url, server) = serve_once("200 OK", "not json");
        let src = HttpRateSource::new(&url, CurrencyCode::USD, Duration::from_secs(5)).unwrap();
        let err = src.fetch(CurrencyCode::SEK).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, RateSourceError::Malformed(_)));
    }

    #[test]
    fn fresh_cache_skips_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CachedRateSource::new(Scripted::ok(10.0), dir.path().join("r.json"), day());

        let first = cache.fetch_at(CurrencyCode::SEK, t0()).unwrap();
        let later = t0() + chrono::Duration::hours(3);
        let second = cache.fetch_at(CurrencyCode::SEK, later).unwrap();

        assert_eq!(cache.inner.calls.get(), 1);
        assert_eq!(first.rate("USD"), second.rate("USD"));
    }

    #[test]
    fn expired_cache_refetches() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CachedRateSource::new(Scripted::ok(10.0), dir.path().join("r.json"), day());
        cache.fetch_at(CurrencyCode::SEK, t0()).unwrap();
        cache
            .fetch_at(CurrencyCode::SEK, t0() + chrono::Duration::hours(25))
            .unwrap();
        assert_eq!(cache.inner.calls.get(), 2);
    }

    #[test]
    fn stale_cache_served_when_source_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        CachedRateSource::new(Scripted::ok(11.0), &path, day())
            .fetch_at(CurrencyCode::SEK, t0())
            .unwrap();

        let offline = CachedRateSource::new(Scripted::down(), &path, day());
        let table = offline
            .fetch_at(CurrencyCode::SEK, t0() + chrono::Duration::days(7))
            .unwrap();
        assert_eq!(table.rate("USD"), 11.0);
        assert_eq!(offline.inner.calls.get(), 1);
    }

    #[test]
    fn no_cache_and_source_down_errors() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CachedRateSource::new(Scripted::down(), dir.path().join("r.json"), day());
        assert!(cache.fetch_at(CurrencyCode::SEK, t0()).is_err());
    }

    #[test]
    fn cache_for_other_currency_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        CachedRateSource::new(Scripted::ok(10.0), &path, day())
            .fetch_at(CurrencyCode::SEK, t0())
            .unwrap();
        let offline = CachedRateSource::new(Scripted::down(), &path, day());
        assert!(offline.fetch_at(CurrencyCode::EUR, t0()).is_err());
    }

    #[test]
    fn corrupt_cache_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        fs::write(&path, "{not json").unwrap();
        let cache = CachedRateSource::new(Scripted::ok(10.0), &path, day());
        assert_eq!(cache.fetch_at(CurrencyCode::SEK, t0()).unwrap().rate("USD"), 10.0);
        assert_eq!(cache.inner.calls.get(), 1);
    }
}
