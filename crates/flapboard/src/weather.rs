//! Weather source.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::WeatherConfig;
use crate::error::{Error, Result};
use crate::records::WeatherReport;

/// Something that reports current conditions.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetch current conditions.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is unreachable, unconfigured, or
    /// answers with something unusable.
    async fn fetch(&self) -> Result<WeatherReport>;
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    main: MainBlock,
    wind: WindBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    main: String,
}

#[allow(clippy::cast_possible_truncation)]
fn round(value: f64) -> i32 {
    value.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

impl From<CurrentConditions> for WeatherReport {
    fn from(data: CurrentConditions) -> Self {
        Self {
            temperature: round(data.main.temp),
            wind: round(data.wind.speed),
            condition: data
                .weather
                .into_iter()
                .next()
                .map(|c| c.main)
                .unwrap_or_default(),
        }
    }
}

/// OpenWeatherMap current-conditions client.
pub struct OpenWeatherClient {
    http: reqwest::Client,
    url: Url,
    api_key: Option<String>,
    location: String,
    units: String,
}

impl OpenWeatherClient {
    /// Build a client from weather configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// built.
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            url: Url::parse(&config.api_url)?,
            api_key: config.api_key.clone(),
            location: config.location.clone(),
            units: config.units.clone(),
        })
    }
}

impl fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("url", &self.url.as_str())
            .field("location", &self.location)
            .field("units", &self.units)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn fetch(&self) -> Result<WeatherReport> {
        let api_key = self.api_key.as_deref().ok_or(Error::MissingCredential {
            name: "weather.api_key",
        })?;
        debug!(location = %self.location, "Fetching weather");

        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("q", &self.location)
            .append_pair("units", &self.units)
            .append_pair("appid", api_key);

        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::weather(format!("HTTP {}", status.as_u16())));
        }

        let data: CurrentConditions = response
            .json()
            .await
            .map_err(|e| Error::weather(format!("unreadable response: {e}")))?;
        let report = WeatherReport::from(data);
        debug!(?report, "Weather fetched");
        Ok(report)
    }
}
