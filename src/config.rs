use crate::feed::{
    AbuseIpDbFeed, DemoFeed, FileFeed, ThreatFeed, DEFAULT_CONFIDENCE_MINIMUM, DEFAULT_LIMIT,
};
use crate::globe::clock::{DEFAULT_FPS, DEFAULT_PULSE_PERIOD, DEFAULT_ROTATION_PERIOD, DEFAULT_SHIMMER_PERIOD};
use crate::globe::gesture::SENSITIVITY;
use crate::settings::Settings;
use std::path::PathBuf;
use std::time::Duration;

/// Where threat records come from
#[derive(Clone, Debug, PartialEq)]
pub enum FeedSource {
    AbuseIpDb {
        api_key: String,
        endpoint: Option<String>,
        confidence_minimum: u8,
        limit: usize,
        timeout: Duration,
    },
    File(PathBuf),
    Demo,
}

/// Runtime configuration for the globe view
#[derive(Clone, Debug)]
pub struct GlobeConfig {
    pub fps: u32,
    pub rotation_period: Duration,
    pub pulse_period: Duration,
    pub shimmer_period: Duration,
    pub sensitivity: f32,
    pub seed: u64,
    pub texture: Option<PathBuf>,
    pub feed: FeedSource,
    pub scheme: u8,
    pub print: bool,
    pub print_size: (u16, u16),
}

/// Values given on the command line; `None` means not given.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub texture: Option<PathBuf>,
    pub feed_file: Option<PathBuf>,
    pub demo: bool,
    pub seed: Option<u64>,
    pub fps: Option<u32>,
    pub rotation_secs: Option<f32>,
    pub pulse_secs: Option<f32>,
    pub scheme: Option<u8>,
    pub print: bool,
    pub width: Option<u16>,
    pub height: Option<u16>,
}

impl GlobeConfig {
    /// Merge command line over settings over built-in defaults.
    pub fn resolve(cli: Overrides, settings: &Settings) -> Self {
        let globe = &settings.globe;
        let feed = &settings.feed;

        let source = if cli.demo {
            FeedSource::Demo
        } else if let Some(path) = cli.feed_file {
            FeedSource::File(path)
        } else if let Some(api_key) = feed.api_key.clone().filter(|k| !k.trim().is_empty()) {
            FeedSource::AbuseIpDb {
                api_key,
                endpoint: feed.endpoint.clone(),
                confidence_minimum: feed.confidence_minimum.unwrap_or(DEFAULT_CONFIDENCE_MINIMUM),
                limit: feed.limit.unwrap_or(DEFAULT_LIMIT),
                timeout: Duration::from_secs(feed.timeout_secs.unwrap_or(10)),
            }
        } else {
            tracing::info!("no AbuseIPDB key configured, using demo feed");
            FeedSource::Demo
        };

        Self {
            fps: cli.fps.or(globe.fps).unwrap_or(DEFAULT_FPS).clamp(1, 240),
            rotation_period: period(cli.rotation_secs.or(globe.rotation_secs), DEFAULT_ROTATION_PERIOD),
            pulse_period: period(cli.pulse_secs.or(globe.pulse_secs), DEFAULT_PULSE_PERIOD),
            shimmer_period: DEFAULT_SHIMMER_PERIOD,
            sensitivity: SENSITIVITY,
            seed: cli.seed.unwrap_or_else(rand::random),
            texture: cli.texture.or_else(|| globe.texture.clone()),
            feed: source,
            scheme: cli.scheme.or(globe.scheme).unwrap_or(0).min(9),
            print: cli.print,
            print_size: (cli.width.unwrap_or(80).max(8), cli.height.unwrap_or(40).max(4)),
        }
    }

    /// Feed name for logs; never includes the key.
    pub fn feed_kind(&self) -> &'static str {
        match self.feed {
            FeedSource::AbuseIpDb { .. } => "abuseipdb",
            FeedSource::File(_) => "file",
            FeedSource::Demo => "demo",
        }
    }

    /// A fresh feed for one fetch. `generation` varies the demo data between re-fetches.
    pub fn make_feed(&self, generation: u64) -> Box<dyn ThreatFeed> {
        match &self.feed {
            FeedSource::AbuseIpDb { api_key, endpoint, confidence_minimum, limit, timeout } => Box::new(
                AbuseIpDbFeed::new(Some(api_key.clone()), endpoint.clone())
                    .with_confidence_minimum(*confidence_minimum)
                    .with_limit(*limit)
                    .with_timeout(*timeout),
            ),
            FeedSource::File(path) => Box::new(FileFeed::new(path)),
            FeedSource::Demo => Box::new(DemoFeed::new(self.seed.wrapping_add(generation))),
        }
    }
}

/// Seconds to a period; values that are not a usable positive duration keep the default.
fn period(secs: Option<f32>, default: Duration) -> Duration {
    secs.and_then(|s| Duration::try_from_secs_f32(s).ok())
        .filter(|d| !d.is_zero())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(text: &str) -> Settings {
        Settings::parse(text)
    }

    #[test]
    fn defaults_without_any_input() {
        let cfg = GlobeConfig::resolve(Overrides::default(), &Settings::default());
        assert_eq!(cfg.fps, DEFAULT_FPS);
        assert_eq!(cfg.rotation_period, DEFAULT_ROTATION_PERIOD);
        assert_eq!(cfg.pulse_period, DEFAULT_PULSE_PERIOD);
        assert_eq!(cfg.feed, FeedSource::Demo);
        assert_eq!(cfg.scheme, 0);
        assert_eq!(cfg.print_size, (80, 40));
    }

    #[test]
    fn command_line_beats_settings() {
        let s = settings("[globe]\nfps = 30\nrotation_secs = 20.0\nscheme = 4\n");
        let cli = Overrides {
            fps: Some(15),
            scheme: Some(2),
            ..Overrides::default()
        };
        let cfg = GlobeConfig::resolve(cli, &s);
        assert_eq!(cfg.fps, 15);
        assert_eq!(cfg.scheme, 2);
        assert_eq!(cfg.rotation_period, Duration::from_secs(20));
    }

    #[test]
    fn api_key_selects_live_feed() {
        let s = settings("[feed]\napi_key = \"k\"\nlimit = 5\n");
        let cfg = GlobeConfig::resolve(Overrides::default(), &s);
        match cfg.feed {
            FeedSource::AbuseIpDb { api_key, limit, confidence_minimum, .. } => {
                assert_eq!(api_key, "k");
                assert_eq!(limit, 5);
                assert_eq!(confidence_minimum, DEFAULT_CONFIDENCE_MINIMUM);
            }
            other => panic!("expected live feed, got {:?}", other),
        }
    }

    #[test]
    fn demo_and_file_flags_override_key() {
        let s = settings("[feed]\napi_key = \"k\"\n");
        let cfg = GlobeConfig::resolve(Overrides { demo: true, ..Overrides::default() }, &s);
        assert_eq!(cfg.feed, FeedSource::Demo);

        let cli = Overrides {
            feed_file: Some(PathBuf::from("snapshot.json")),
            ..Overrides::default()
        };
        let cfg = GlobeConfig::resolve(cli, &s);
        assert_eq!(cfg.feed, FeedSource::File(PathBuf::from("snapshot.json")));
    }

    #[test]
    fn bad_values_are_clamped() {
        let cli = Overrides {
            fps: Some(0),
            rotation_secs: Some(-3.0),
            pulse_secs: Some(f32::NAN),
            scheme: Some(42),
            ..Overrides::default()
        };
        let cfg = GlobeConfig::resolve(cli, &Settings::default());
        assert_eq!(cfg.fps, 1);
        assert_eq!(cfg.rotation_period, DEFAULT_ROTATION_PERIOD);
        assert_eq!(cfg.pulse_period, DEFAULT_PULSE_PERIOD);
        assert_eq!(cfg.scheme, 9);
    }

    #[test]
    fn oversized_periods_keep_defaults() {
        let s = settings("[globe]\nrotation_secs = 1e30\n");
        let cli = Overrides {
            pulse_secs: Some(f32::MAX),
            ..Overrides::default()
        };
        let cfg = GlobeConfig::resolve(cli, &s);
        assert_eq!(cfg.rotation_period, DEFAULT_ROTATION_PERIOD);
        assert_eq!(cfg.pulse_period, DEFAULT_PULSE_PERIOD);

        let cfg = GlobeConfig::resolve(Overrides { rotation_secs: Some(0.0), ..Overrides::default() }, &s);
        assert_eq!(cfg.rotation_period, DEFAULT_ROTATION_PERIOD);
    }

    #[test]
    fn seed_is_kept() {
        let cli = Overrides { seed: Some(7), ..Overrides::default() };
        let cfg = GlobeConfig::resolve(cli, &Settings::default());
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.make_feed(0).name(), "demo");
    }
}
