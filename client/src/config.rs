use crowdmap_shared::ApiContract;

pub const DEFAULT_API_BASE: &str = "http://localhost:8080";
pub const DEFAULT_REFRESH_SECS: u32 = 300;
pub const DEFAULT_FETCH_TIMEOUT_MS: u32 = 15_000;

/// Build-time settings. Every key is optional; missing or unparsable
/// values fall back to the defaults above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base: String,
    pub kakao_app_key: Option<String>,
    pub contract: ApiContract,
    /// Periodic refresh interval; 0 turns it off.
    pub refresh_secs: u32,
    pub fetch_timeout_ms: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            kakao_app_key: None,
            contract: ApiContract::default(),
            refresh_secs: DEFAULT_REFRESH_SECS,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ClientConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let api_base = non_empty(lookup("CROWDMAP_API_BASE"))
            .map(|base| base.trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty())
            .unwrap_or(defaults.api_base);
        let contract = non_empty(lookup("CROWDMAP_API_CONTRACT"))
            .and_then(|v| ApiContract::parse(&v))
            .unwrap_or(defaults.contract);
        let refresh_secs = non_empty(lookup("CROWDMAP_REFRESH_SECS"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.refresh_secs);
        let fetch_timeout_ms = non_empty(lookup("CROWDMAP_FETCH_TIMEOUT_MS"))
            .and_then(|v| v.parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(defaults.fetch_timeout_ms);

        Self {
            api_base,
            kakao_app_key: non_empty(lookup("KAKAO_MAP_APP_KEY")),
            contract,
            refresh_secs,
            fetch_timeout_ms,
        }
    }

    /// Values baked in by the build environment.
    pub fn from_build_env() -> Self {
        Self::from_lookup(|key| {
            let value = match key {
                "CROWDMAP_API_BASE" => option_env!("CROWDMAP_API_BASE"),
                "KAKAO_MAP_APP_KEY" => option_env!("KAKAO_MAP_APP_KEY"),
                "CROWDMAP_API_CONTRACT" => option_env!("CROWDMAP_API_CONTRACT"),
                "CROWDMAP_REFRESH_SECS" => option_env!("CROWDMAP_REFRESH_SECS"),
                "CROWDMAP_FETCH_TIMEOUT_MS" => option_env!("CROWDMAP_FETCH_TIMEOUT_MS"),
                _ => None,
            };
            value.map(str::to_string)
        })
    }

    pub fn endpoint(&self) -> String {
        crate::fetch::endpoint_url(&self.api_base, self.contract)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> ClientConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.endpoint(), "http://localhost:8080/congestion?include_fcst=true");
    }

    #[test]
    fn reads_every_key() {
        let config = from_pairs(&[
            ("CROWDMAP_API_BASE", "https://crowd.example.kr/api/"),
            ("KAKAO_MAP_APP_KEY", " abc123 "),
            ("CROWDMAP_API_CONTRACT", "legacy"),
            ("CROWDMAP_REFRESH_SECS", "0"),
            ("CROWDMAP_FETCH_TIMEOUT_MS", "5000"),
        ]);
        assert_eq!(config.api_base, "https://crowd.example.kr/api");
        assert_eq!(config.kakao_app_key.as_deref(), Some("abc123"));
        assert_eq!(config.contract, ApiContract::Legacy);
        assert_eq!(config.refresh_secs, 0);
        assert_eq!(config.fetch_timeout_ms, 5000);
        assert_eq!(config.endpoint(), "https://crowd.example.kr/api/tourist-spots");
    }

    #[test]
    fn garbage_values_fall_back() {
        let config = from_pairs(&[
            ("CROWDMAP_API_BASE", "   "),
            ("KAKAO_MAP_APP_KEY", ""),
            ("CROWDMAP_API_CONTRACT", "graphql"),
            ("CROWDMAP_REFRESH_SECS", "soon"),
            ("CROWDMAP_FETCH_TIMEOUT_MS", "0"),
        ]);
        assert_eq!(config, ClientConfig::default());
    }
}
