use std::{path::Path, str::FromStr, time::Duration};

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{error::Error, report_data::ReportData};

/// Public dummy DCAP quote service.
pub const DEFAULT_SERVICE_URL: &str = "https://dcap-dummy.sirrah.suave.flashbots.net";
/// Placeholder substituted with the lower-case hex report data.
pub const REPORT_DATA_PLACEHOLDER: &str = "{report_data}";
pub const DEFAULT_PATH_TEMPLATE: &str = "/dcap/{report_data}";
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Quotes are a few KiB; anything above this is not a quote.
pub const DEFAULT_MAX_RESPONSE_SIZE: u64 = 4 * 1024 * 1024;

/// Shape of the body returned by the attestation service.
///
/// This is a property of the targeted service and is never guessed from the
/// response content.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseMode {
    /// The body is the quote.
    #[default]
    Direct,
    /// The body is text lines, the last non-empty one being the quote.
    LineDelimited,
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ResponseMode::Direct => write!(f, "direct"),
            ResponseMode::LineDelimited => write!(f, "line-delimited"),
        }
    }
}

impl FromStr for ResponseMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ResponseMode::Direct),
            "line-delimited" => Ok(ResponseMode::LineDelimited),
            s => Err(Error::ConfigError(format!(
                "unknown response mode '{s}', expected 'direct' or 'line-delimited'"
            ))),
        }
    }
}

/// Attestation service to query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    base_url: String,
    path_template: String,
    mode: ResponseMode,
}

impl ServiceEndpoint {
    pub fn new(base_url: &str, path_template: &str, mode: ResponseMode) -> Result<Self, Error> {
        Url::from_str(base_url).map_err(|e| Error::URLError(format!("{base_url}: {e}")))?;

        if !path_template.contains(REPORT_DATA_PLACEHOLDER) {
            return Err(Error::ConfigError(format!(
                "path template '{path_template}' lacks the {REPORT_DATA_PLACEHOLDER} placeholder"
            )));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            path_template: path_template.to_owned(),
            mode,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// Build the quote request URL for `report_data`.
    pub fn quote_url(&self, report_data: &ReportData) -> Result<Url, Error> {
        let path = self
            .path_template
            .replace(REPORT_DATA_PLACEHOLDER, &report_data.to_hex());
        let sep = if path.starts_with('/') { "" } else { "/" };

        Url::from_str(&format!("{}{sep}{path}", self.base_url))
            .map_err(|e| Error::URLError(e.to_string()))
    }
}

impl Default for ServiceEndpoint {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_owned(),
            path_template: DEFAULT_PATH_TEMPLATE.to_owned(),
            mode: ResponseMode::default(),
        }
    }
}

/// Settings of a [`crate::QuoteFetcher`].
///
/// Every field has a default so a JSON config file only needs to carry the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetcherConfig {
    pub base_url: String,
    pub path_template: String,
    pub mode: ResponseMode,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_response_size: u64,
    /// Decoding the signature attached to the quote is left to the verifier.
    /// Only `false` is accepted.
    pub decode_signature: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_owned(),
            path_template: DEFAULT_PATH_TEMPLATE.to_owned(),
            mode: ResponseMode::default(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            decode_signature: false,
        }
    }
}

impl FetcherConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        let config: FetcherConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn endpoint(&self) -> Result<ServiceEndpoint, Error> {
        ServiceEndpoint::new(&self.base_url, &self.path_template, self.mode)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.user_agent.trim().is_empty() {
            return Err(Error::ConfigError("user agent must not be empty".to_owned()));
        }

        if self.timeout_secs == 0 {
            return Err(Error::ConfigError("timeout must be positive".to_owned()));
        }

        if self.max_response_size == 0 {
            return Err(Error::ConfigError(
                "maximum response size must be positive".to_owned(),
            ));
        }

        if self.decode_signature {
            return Err(Error::ConfigError(
                "signature decoding is not performed by the quote client".to_owned(),
            ));
        }

        self.endpoint().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FetcherConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mode, ResponseMode::Direct);
        assert!(!config.user_agent.is_empty());
        assert!(config.user_agent.starts_with("dcap_quote_client/"));
    }

    #[test]
    fn test_config_partial_json() {
        let config: FetcherConfig =
            serde_json::from_str(r#"{"mode": "line-delimited", "timeout_secs": 5}"#).unwrap();
        assert_eq!(config.mode, ResponseMode::LineDelimited);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.base_url, DEFAULT_SERVICE_URL);
        assert_eq!(config.max_response_size, DEFAULT_MAX_RESPONSE_SIZE);
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        assert!(serde_json::from_str::<FetcherConfig>(r#"{"retries": 3}"#).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = FetcherConfig {
            user_agent: " ".to_owned(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        config.user_agent = DEFAULT_USER_AGENT.to_owned();
        config.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        config.timeout_secs = DEFAULT_TIMEOUT_SECS;
        config.decode_signature = true;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        config.decode_signature = false;
        config.path_template = "/dcap".to_owned();
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        config.path_template = DEFAULT_PATH_TEMPLATE.to_owned();
        config.base_url = "not a url".to_owned();
        assert!(matches!(config.validate(), Err(Error::URLError(_))));
    }

    #[test]
    fn test_response_mode_from_str() {
        assert_eq!(
            "direct".parse::<ResponseMode>().unwrap(),
            ResponseMode::Direct
        );
        assert_eq!(
            "line-delimited".parse::<ResponseMode>().unwrap(),
            ResponseMode::LineDelimited
        );
        assert!("auto".parse::<ResponseMode>().is_err());
        assert_eq!(ResponseMode::LineDelimited.to_string(), "line-delimited");
    }

    #[test]
    fn test_quote_url() {
        let report_data = ReportData::from_hex(&"AB".repeat(64)).unwrap();

        let endpoint = ServiceEndpoint::default();
        assert_eq!(
            endpoint.quote_url(&report_data).unwrap().as_str(),
            format!("{DEFAULT_SERVICE_URL}/dcap/{}", "ab".repeat(64))
        );

        let endpoint = ServiceEndpoint::new(
            "http://127.0.0.1:8080/",
            "v1/quote/{report_data}",
            ResponseMode::LineDelimited,
        )
        .unwrap();
        assert_eq!(
            endpoint.quote_url(&report_data).unwrap().as_str(),
            format!("http://127.0.0.1:8080/v1/quote/{}", "ab".repeat(64))
        );
        assert_eq!(endpoint.mode(), ResponseMode::LineDelimited);
    }
}
