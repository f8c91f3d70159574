use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::weather_code::WeatherCode;

/// One complete reading for a single coordinate.
///
/// Field names on the wire follow the Open-Meteo response, so the shared store payload
/// is a subset of the API body and decodes with the same code path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSnapshot {
    pub longitude: f64,
    pub latitude: f64,
    pub current: CurrentConditions,
    pub daily: DailyForecast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    #[serde(rename = "temperature_2m")]
    pub temperature_c: f64,
    pub weather_code: i32,
    #[serde(rename = "wind_speed_10m")]
    pub wind_speed_ms: f64,
    #[serde(rename = "precipitation")]
    pub precipitation_pct: f64,
}

/// Parallel per-day sequences; index 0 is today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    #[serde(rename = "temperature_2m_max")]
    pub max_temps: Vec<f64>,
    #[serde(rename = "temperature_2m_min")]
    pub min_temps: Vec<f64>,
    #[serde(rename = "weather_code")]
    pub weather_codes: Vec<i32>,
    #[serde(rename = "time")]
    pub dates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDay {
    pub date: String,
    pub weather_code: i32,
    pub temp_max_c: f64,
    pub temp_min_c: f64,
}

impl DailyForecast {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn check_lengths(&self) -> Result<(), SnapshotDecodeError> {
        let length = self.dates.len();
        if self.weather_codes.len() != length
            || self.max_temps.len() != length
            || self.min_temps.len() != length
        {
            return Err(SnapshotDecodeError::DailyLengthMismatch {
                time: length,
                weather_code: self.weather_codes.len(),
                temperature_max: self.max_temps.len(),
                temperature_min: self.min_temps.len(),
            });
        }
        Ok(())
    }

    pub fn day(&self, index: usize) -> Option<ForecastDay> {
        Some(ForecastDay {
            date: self.dates.get(index)?.clone(),
            weather_code: *self.weather_codes.get(index)?,
            temp_max_c: *self.max_temps.get(index)?,
            temp_min_c: *self.min_temps.get(index)?,
        })
    }

    pub fn days(&self) -> impl Iterator<Item = ForecastDay> + '_ {
        (0..self.len()).filter_map(|index| self.day(index))
    }

    /// Forward-looking days, skipping today.
    pub fn upcoming(&self, count: usize) -> Vec<ForecastDay> {
        self.days().skip(1).take(count).collect()
    }
}

impl ForecastSnapshot {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, SnapshotDecodeError> {
        let snapshot: Self = serde_json::from_slice(bytes)?;
        snapshot.daily.check_lengths()?;
        Ok(snapshot)
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn weather_code(&self) -> Option<WeatherCode> {
        WeatherCode::from_code(self.current.weather_code).ok()
    }
}

#[derive(Debug, Error)]
pub enum SnapshotDecodeError {
    #[error("invalid forecast payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error(
        "daily arrays length mismatch (time={time}, weather_code={weather_code}, \
         temperature_2m_max={temperature_max}, temperature_2m_min={temperature_min})"
    )]
    DailyLengthMismatch {
        time: usize,
        weather_code: usize,
        temperature_max: usize,
        temperature_min: usize,
    },
}

/// Code for the current conditions, if a snapshot is loaded and the code is known.
pub fn current_weather_code(snapshot: Option<&ForecastSnapshot>) -> Option<WeatherCode> {
    snapshot.and_then(ForecastSnapshot::weather_code)
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid date '{0}': expected yyyy-MM-dd")]
pub struct ParseError(pub String);

/// Abbreviated English weekday for a `yyyy-MM-dd` date, e.g. `"Mon"`.
pub fn day_name(date: &str) -> Result<String, ParseError> {
    if !is_iso_date_shape(date) {
        return Err(ParseError(date.to_string()));
    }
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ParseError(date.to_string()))?;
    Ok(parsed.format("%a").to_string())
}

// chrono tolerates padding, signs and single-digit fields; dates here are fixed width.
fn is_iso_date_shape(date: &str) -> bool {
    let bytes = date.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(index, byte)| match index {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        })
}

pub fn validate_coordinates(lat: f64, lon: f64) -> Result<(), ValidationError> {
    if !((-90.0)..=90.0).contains(&lat) {
        return Err(ValidationError::InvalidLatitude(lat));
    }
    if !((-180.0)..=180.0).contains(&lon) {
        return Err(ValidationError::InvalidLongitude(lon));
    }
    Ok(())
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("invalid latitude: {0}")]
    InvalidLatitude(f64),
    #[error("invalid longitude: {0}")]
    InvalidLongitude(f64),
    #[error("invalid coordinate update '{0}': expected '<lat>,<lon>'")]
    MalformedCoordinates(String),
}

/// Parses one `lat,lon` location update line.
pub fn parse_coordinate_line(line: &str) -> Result<(f64, f64), ValidationError> {
    let malformed = || ValidationError::MalformedCoordinates(line.trim().to_string());
    let (raw_lat, raw_lon) = line.split_once(',').ok_or_else(malformed)?;
    let lat = raw_lat.trim().parse::<f64>().map_err(|_| malformed())?;
    let lon = raw_lon.trim().parse::<f64>().map_err(|_| malformed())?;
    validate_coordinates(lat, lon)?;
    Ok((lat, lon))
}
