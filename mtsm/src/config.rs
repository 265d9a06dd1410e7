//! Client configuration.
//!
//! A [`Config`] can be built in code with [`Config::new`] or deserialized from
//! YAML or JSON. Every field but `url` has a default.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use time::UtcOffset;
use url::Url;

use mtsm_payload::clock::DEFAULT_UTC_OFFSET_SECONDS;

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`Config::validate`].
pub enum Error {
    /// No URL was given
    #[error("URL must not be empty")]
    EmptyUrl,
    /// Wrapper around [`url::ParseError`]
    #[error("URL could not be parsed: {0}")]
    Url(#[from] url::ParseError),
    /// Only http and https are spoken
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    /// Wrapper around [`reqwest::header::InvalidHeaderName`]
    #[error("Invalid header name: {0}")]
    HeaderName(#[from] reqwest::header::InvalidHeaderName),
    /// Wrapper around [`reqwest::header::InvalidHeaderValue`]
    #[error("Invalid header value: {0}")]
    HeaderValue(#[from] reqwest::header::InvalidHeaderValue),
    /// Wrapper around [`time::error::ComponentRange`]
    #[error("UTC offset out of range: {0}")]
    UtcOffset(#[from] time::error::ComponentRange),
    /// Maximum retry wait is below the initial retry wait
    #[error("retry_max_wait_milliseconds ({max}) must be at least retry_wait_milliseconds ({wait})")]
    RetryWait {
        /// Initial wait
        wait: u64,
        /// Maximum wait
        max: u64,
    },
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_wait_milliseconds() -> u64 {
    1_000
}

fn default_retry_max_wait_milliseconds() -> u64 {
    2_000
}

fn default_write_path() -> String {
    "/api/v1/write".to_string()
}

fn default_import_path() -> String {
    "/api/v1/import".to_string()
}

fn default_api_prefix() -> String {
    "/prometheus".to_string()
}

fn default_utc_offset_seconds() -> i32 {
    DEFAULT_UTC_OFFSET_SECONDS
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "snake_case")]
/// Configuration of a [`crate::Client`].
pub struct Config {
    /// Base URL of the backend, may carry `user:pass@` credentials
    pub url: String,
    /// Basic auth user, wins over the URL's
    #[serde(default)]
    pub username: Option<String>,
    /// Basic auth password, wins over the URL's
    #[serde(default)]
    pub password: Option<String>,
    /// Per request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Retries used by [`crate::Client::push_with_default_retries`]
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// Wait before the first retry, doubled on every further retry
    #[serde(default = "default_retry_wait_milliseconds")]
    pub retry_wait_milliseconds: u64,
    /// Upper bound of a single retry wait
    #[serde(default = "default_retry_max_wait_milliseconds")]
    pub retry_max_wait_milliseconds: u64,
    /// Headers added to every request
    #[serde(default)]
    pub headers: FxHashMap<String, String>,
    /// Path of the remote-write endpoint
    #[serde(default = "default_write_path")]
    pub write_path: String,
    /// Path of the bulk import endpoint
    #[serde(default = "default_import_path")]
    pub import_path: String,
    /// Prefix of the query API
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Zone "now" is read in, seconds east of UTC
    #[serde(default = "default_utc_offset_seconds")]
    pub utc_offset_seconds: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: None,
            password: None,
            timeout_seconds: default_timeout_seconds(),
            retry_count: default_retry_count(),
            retry_wait_milliseconds: default_retry_wait_milliseconds(),
            retry_max_wait_milliseconds: default_retry_max_wait_milliseconds(),
            headers: FxHashMap::default(),
            write_path: default_write_path(),
            import_path: default_import_path(),
            api_prefix: default_api_prefix(),
            utc_offset_seconds: default_utc_offset_seconds(),
        }
    }
}

impl Config {
    /// Create a [`Config`] for `url` with every other field defaulted.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Check every field that can be wrong.
    ///
    /// # Errors
    ///
    /// Function will error if the URL is empty, unparsable or not http(s), a
    /// header is not a valid HTTP header, the UTC offset is out of range or the
    /// maximum retry wait is below the initial one.
    pub fn validate(&self) -> Result<(), Error> {
        self.base_url()?;
        self.header_map()?;
        self.utc_offset()?;
        if self.retry_max_wait_milliseconds < self.retry_wait_milliseconds {
            return Err(Error::RetryWait {
                wait: self.retry_wait_milliseconds,
                max: self.retry_max_wait_milliseconds,
            });
        }
        Ok(())
    }

    /// The URL with credentials, query and fragment stripped.
    ///
    /// # Errors
    ///
    /// See [`Config::validate`].
    pub fn base_url(&self) -> Result<Url, Error> {
        let mut url = self.parse_url()?;
        // http(s) URLs always have a host, so neither of these can fail.
        let _ = url.set_username("");
        let _ = url.set_password(None);
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    /// Basic auth credentials, if both a user and a password are known.
    /// Explicit `username`/`password` win over the URL's userinfo.
    ///
    /// # Errors
    ///
    /// See [`Config::validate`].
    pub fn credentials(&self) -> Result<Option<(String, String)>, Error> {
        let url = self.parse_url()?;
        let username = self
            .username
            .clone()
            .unwrap_or_else(|| url.username().to_string());
        let password = self
            .password
            .clone()
            .or_else(|| url.password().map(str::to_string))
            .unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            Ok(None)
        } else {
            Ok(Some((username, password)))
        }
    }

    /// `headers` as a [`HeaderMap`].
    ///
    /// # Errors
    ///
    /// See [`Config::validate`].
    pub fn header_map(&self) -> Result<HeaderMap, Error> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            map.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }
        Ok(map)
    }

    /// `utc_offset_seconds` as a [`UtcOffset`].
    ///
    /// # Errors
    ///
    /// See [`Config::validate`].
    pub fn utc_offset(&self) -> Result<UtcOffset, Error> {
        Ok(UtcOffset::from_whole_seconds(self.utc_offset_seconds)?)
    }

    /// Per request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Initial retry wait.
    #[must_use]
    pub fn retry_wait(&self) -> Duration {
        Duration::from_millis(self.retry_wait_milliseconds)
    }

    /// Maximum retry wait.
    #[must_use]
    pub fn retry_max_wait(&self) -> Duration {
        Duration::from_millis(self.retry_max_wait_milliseconds)
    }

    fn parse_url(&self) -> Result<Url, Error> {
        if self.url.trim().is_empty() {
            return Err(Error::EmptyUrl);
        }
        let url = Url::parse(self.url.trim())?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(Error::UnsupportedScheme(scheme.to_string())),
        }
    }
}
