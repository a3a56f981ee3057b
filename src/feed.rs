//! Threat feed clients
//!
//! The globe only needs a list of recently reported hosts with a country and
//! a confidence score. `AbuseIpDbFeed` pulls the AbuseIPDB blacklist,
//! `FileFeed` reads a saved copy of the same payload and `DemoFeed` makes up
//! plausible records when no API key is configured.

use crate::globe::places::{normalize_code, UNKNOWN_CODE};
use chrono::{DateTime, TimeZone, Utc};
use rand::prelude::*;
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://api.abuseipdb.com/api/v2/blacklist";
pub const DEFAULT_LIMIT: usize = 100;
pub const DEFAULT_CONFIDENCE_MINIMUM: u8 = 90;

/// One reported host from the reputation feed.
#[derive(Clone, Debug, PartialEq)]
pub struct ThreatRecord {
    pub ip: String,
    pub country_code: String,
    pub confidence: u8,
    pub last_reported: DateTime<Utc>,
}

impl ThreatRecord {
    pub fn new(ip: impl Into<String>, country_code: &str, confidence: u32, last_reported: DateTime<Utc>) -> Self {
        Self {
            ip: ip.into(),
            country_code: normalize_code(country_code),
            confidence: confidence.min(100) as u8,
            last_reported,
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("network error: {0}")]
    Network(String),
    #[error("feed returned HTTP {0}")]
    Status(u16),
    #[error("malformed feed payload: {0}")]
    Malformed(String),
    #[error("failed to read feed snapshot: {0}")]
    Io(#[from] io::Error),
}

/// Source of threat records. Runs on a worker thread.
pub trait ThreatFeed: Send {
    fn fetch(&self) -> Result<Vec<ThreatRecord>, FeedError>;

    fn name(&self) -> &str;
}

// ============================================================================
// Payload
// ============================================================================

#[derive(Debug, Deserialize)]
struct BlacklistResponse {
    data: Vec<BlacklistEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlacklistEntry {
    ip_address: String,
    #[serde(default, deserialize_with = "lenient_code")]
    country_code: Option<String>,
    #[serde(default)]
    abuse_confidence_score: u32,
    #[serde(default)]
    last_reported_at: Option<String>,
}

/// Any non-string country code decodes as missing instead of failing the batch.
fn lenient_code<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(code) => Some(code),
        _ => None,
    })
}

impl BlacklistEntry {
    fn into_record(self) -> ThreatRecord {
        let last_reported = self
            .last_reported_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| {
                tracing::debug!(ip = %self.ip_address, "record without usable timestamp");
                DateTime::<Utc>::UNIX_EPOCH
            });

        ThreatRecord::new(
            self.ip_address,
            self.country_code.as_deref().unwrap_or(UNKNOWN_CODE),
            self.abuse_confidence_score,
            last_reported,
        )
    }
}

/// Parse a blacklist payload, keeping the `limit` most severe records.
pub fn parse_blacklist(body: &str, limit: usize) -> Result<Vec<ThreatRecord>, FeedError> {
    let response: BlacklistResponse =
        serde_json::from_str(body).map_err(|e| FeedError::Malformed(e.to_string()))?;
    Ok(most_severe(response.data.into_iter().map(BlacklistEntry::into_record).collect(), limit))
}

fn most_severe(mut records: Vec<ThreatRecord>, limit: usize) -> Vec<ThreatRecord> {
    records.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then(b.last_reported.cmp(&a.last_reported))
    });
    records.truncate(limit);
    records
}

// ============================================================================
// AbuseIPDB
// ============================================================================

pub struct AbuseIpDbFeed {
    api_key: Option<String>,
    endpoint: String,
    confidence_minimum: u8,
    limit: usize,
    timeout: Duration,
}

impl AbuseIpDbFeed {
    pub fn new(api_key: Option<String>, endpoint: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            confidence_minimum: DEFAULT_CONFIDENCE_MINIMUM,
            limit: DEFAULT_LIMIT,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_confidence_minimum(mut self, minimum: u8) -> Self {
        self.confidence_minimum = minimum.min(100);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ThreatFeed for AbuseIpDbFeed {
    fn fetch(&self) -> Result<Vec<ThreatRecord>, FeedError> {
        let key = self.api_key.as_deref().ok_or(FeedError::MissingApiKey)?;

        let response = ureq::get(&self.endpoint)
            .set("Key", key)
            .set("Accept", "application/json")
            .query("confidenceMinimum", &self.confidence_minimum.to_string())
            .query("limit", &self.limit.to_string())
            .timeout(self.timeout)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => FeedError::Status(code),
                ureq::Error::Transport(t) => FeedError::Network(t.to_string()),
            })?;

        let body = response
            .into_string()
            .map_err(|e| FeedError::Malformed(e.to_string()))?;

        parse_blacklist(&body, self.limit)
    }

    fn name(&self) -> &str {
        "abuseipdb"
    }
}

// ============================================================================
// Snapshot file
// ============================================================================

pub struct FileFeed {
    path: PathBuf,
    limit: usize,
}

impl FileFeed {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ThreatFeed for FileFeed {
    fn fetch(&self) -> Result<Vec<ThreatRecord>, FeedError> {
        let body = std::fs::read_to_string(&self.path)?;
        parse_blacklist(&body, self.limit)
    }

    fn name(&self) -> &str {
        "file"
    }
}

// ============================================================================
// Demo
// ============================================================================

// Weighted toward the usual suspects, with a few unmapped codes mixed in
const DEMO_COUNTRIES: &[&str] = &[
    "CN", "CN", "CN", "US", "US", "RU", "RU", "IN", "BR", "VN", "DE", "NL",
    "KR", "ID", "TW", "HK", "SG", "FR", "GB", "IR", "UA", "BG", "RO", "TH",
    "ZA", "NG", "AR", "??", "XK",
];

/// Synthetic records for running without an API key.
pub struct DemoFeed {
    seed: u64,
    count: usize,
    delay: Duration,
}

impl DemoFeed {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            count: 40,
            delay: Duration::from_millis(400),
        }
    }

    #[cfg(test)]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl ThreatFeed for DemoFeed {
    fn fetch(&self) -> Result<Vec<ThreatRecord>, FeedError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let now = Utc::now().timestamp();
        let records = (0..self.count)
            .map(|_| {
                let ip = format!(
                    "{}.{}.{}.{}",
                    rng.gen_range(1..=223),
                    rng.gen_range(0..=255),
                    rng.gen_range(0..=255),
                    rng.gen_range(1..=254)
                );
                let country = DEMO_COUNTRIES[rng.gen_range(0..DEMO_COUNTRIES.len())];
                let confidence = rng.gen_range(75..=100);
                let reported = Utc
                    .timestamp_opt(now - rng.gen_range(0..86_400), 0)
                    .single()
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
                ThreatRecord::new(ip, country, confidence, reported)
            })
            .collect();

        Ok(most_severe(records, DEFAULT_LIMIT))
    }

    fn name(&self) -> &str {
        "demo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "meta": { "generatedAt": "2024-05-01T12:00:00+00:00" },
        "data": [
            { "ipAddress": "1.2.3.4", "countryCode": "us", "abuseConfidenceScore": 90,
              "lastReportedAt": "2024-05-01T11:59:00+00:00" },
            { "ipAddress": "5.6.7.8", "countryCode": null, "abuseConfidenceScore": 100,
              "lastReportedAt": "2024-05-01T10:00:00+00:00" },
            { "ipAddress": "9.9.9.9", "countryCode": "IN", "abuseConfidenceScore": 140,
              "lastReportedAt": "not a date" },
            { "ipAddress": "2001:db8::1", "abuseConfidenceScore": 40 }
        ]
    }"#;

    #[test]
    fn parses_and_normalizes_payload() {
        let records = parse_blacklist(SAMPLE, 100).unwrap();
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.confidence <= 100));

        let us = records.iter().find(|r| r.ip == "1.2.3.4").unwrap();
        assert_eq!(us.country_code, "US");

        let null_country = records.iter().find(|r| r.ip == "5.6.7.8").unwrap();
        assert_eq!(null_country.country_code, UNKNOWN_CODE);

        let bad_date = records.iter().find(|r| r.ip == "9.9.9.9").unwrap();
        assert_eq!(bad_date.confidence, 100);
        assert_eq!(bad_date.last_reported, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn keeps_most_severe_records() {
        let records = parse_blacklist(SAMPLE, 2).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.confidence == 100));
        // Newer report wins the tie
        assert_eq!(records[0].ip, "5.6.7.8");
    }

    #[test]
    fn non_string_country_code_keeps_the_record() {
        let body = r#"{ "data": [
            { "ipAddress": "1.1.1.1", "countryCode": "US", "abuseConfidenceScore": 80 },
            { "ipAddress": "2.2.2.2", "countryCode": 42, "abuseConfidenceScore": 70 },
            { "ipAddress": "3.3.3.3", "countryCode": ["DE"], "abuseConfidenceScore": 60 }
        ] }"#;
        let records = parse_blacklist(body, 10).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].country_code, "US");
        assert_eq!(records[1].country_code, UNKNOWN_CODE);
        assert_eq!(records[2].country_code, UNKNOWN_CODE);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(matches!(parse_blacklist("{\"errors\": []}", 10), Err(FeedError::Malformed(_))));
        assert!(matches!(parse_blacklist("<html>", 10), Err(FeedError::Malformed(_))));
    }

    #[test]
    fn missing_api_key_fails_without_network() {
        let feed = AbuseIpDbFeed::new(Some("   ".to_string()), None);
        assert!(matches!(feed.fetch(), Err(FeedError::MissingApiKey)));
    }

    #[test]
    fn missing_snapshot_file_is_io_error() {
        let feed = FileFeed::new(Path::new("/definitely/not/here.json"));
        assert!(matches!(feed.fetch(), Err(FeedError::Io(_))));
    }

    #[test]
    fn snapshot_file_round_trip() {
        let path = std::env::temp_dir().join(format!("threatglobe-feed-{}.json", std::process::id()));
        std::fs::write(&path, SAMPLE).unwrap();
        let records = FileFeed::new(&path).fetch().unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(records.len(), 4);
    }

    #[test]
    fn demo_feed_is_deterministic() {
        let a = DemoFeed::new(7).with_delay(Duration::ZERO).fetch().unwrap();
        let b = DemoFeed::new(7).with_delay(Duration::ZERO).fetch().unwrap();
        assert_eq!(a.len(), 40);
        let ips_a: Vec<_> = a.iter().map(|r| r.ip.clone()).collect();
        let ips_b: Vec<_> = b.iter().map(|r| r.ip.clone()).collect();
        assert_eq!(ips_a, ips_b);
        assert!(a.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }
}
