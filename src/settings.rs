use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub globe: GlobeSettings,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedSettings {
    pub api_key: Option<String>,      // AbuseIPDB API key
    pub endpoint: Option<String>,     // Override for the blacklist URL
    pub confidence_minimum: Option<u8>,
    pub limit: Option<usize>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GlobeSettings {
    pub texture: Option<PathBuf>,     // Equirectangular world map image
    pub rotation_secs: Option<f32>,
    pub pulse_secs: Option<f32>,
    pub fps: Option<u32>,
    pub scheme: Option<u8>,
}

impl Settings {
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read settings");
                Self::default()
            }
        }
    }

    /// Parse settings text, falling back to defaults when it is invalid.
    pub fn parse(content: &str) -> Self {
        match toml::from_str(content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "invalid settings, using defaults");
                Self::default()
            }
        }
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("threatglobe")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_sections() {
        let settings = Settings::parse(
            r#"
            [feed]
            api_key = "abc123"
            confidence_minimum = 75
            limit = 20

            [globe]
            texture = "/tmp/earth.png"
            rotation_secs = 30.0
            scheme = 2
            "#,
        );
        assert_eq!(settings.feed.api_key.as_deref(), Some("abc123"));
        assert_eq!(settings.feed.confidence_minimum, Some(75));
        assert_eq!(settings.feed.limit, Some(20));
        assert!(settings.feed.endpoint.is_none());
        assert_eq!(settings.globe.texture, Some(PathBuf::from("/tmp/earth.png")));
        assert_eq!(settings.globe.rotation_secs, Some(30.0));
        assert_eq!(settings.globe.scheme, Some(2));
        assert!(settings.globe.fps.is_none());
    }

    #[test]
    fn missing_sections_default() {
        let settings = Settings::parse("[globe]\nfps = 30\n");
        assert!(settings.feed.api_key.is_none());
        assert_eq!(settings.globe.fps, Some(30));
    }

    #[test]
    fn invalid_toml_falls_back() {
        let settings = Settings::parse("[feed\napi_key = ");
        assert!(settings.feed.api_key.is_none());
        assert!(settings.globe.texture.is_none());
    }

    #[test]
    fn config_path_is_namespaced() {
        let path = Settings::config_path();
        assert!(path.ends_with("threatglobe/config.toml"));
    }
}
