use serde_json::Value;

use crate::model::{ForecastSnapshot, validate_coordinates};

use super::{ProviderApi, ProviderError};

pub const FORECAST_ENDPOINT: &str = "https://api.open-meteo.com/v1/forecast";
const FORECAST_CURRENT_FIELDS: &str = "temperature_2m,precipitation,weather_code,wind_speed_10m";
const FORECAST_DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min";
const WIND_SPEED_UNIT: &str = "ms";

/// Forecast request URL against the public Open-Meteo endpoint.
pub fn build_forecast_url(lat: f64, lon: f64) -> Result<String, ProviderError> {
    forecast_url(FORECAST_ENDPOINT, lat, lon)
}

pub fn forecast_url(endpoint: &str, lat: f64, lon: f64) -> Result<String, ProviderError> {
    validate_coordinates(lat, lon)?;

    // The field lists are sent verbatim; form-encoding would escape the commas.
    Ok(format!(
        "{endpoint}?latitude={lat}&longitude={lon}&current={FORECAST_CURRENT_FIELDS}\
         &daily={FORECAST_DAILY_FIELDS}&wind_speed_unit={WIND_SPEED_UNIT}"
    ))
}

pub fn fetch_forecast<P>(
    api: &P,
    endpoint: &str,
    lat: f64,
    lon: f64,
) -> Result<ForecastSnapshot, ProviderError>
where
    P: ProviderApi + ?Sized,
{
    let url = forecast_url(endpoint, lat, lon)?;
    tracing::debug!(%url, "requesting forecast");

    let response = api.get(&url)?;
    if !response.is_success() {
        tracing::warn!(
            status = response.status,
            reason = extract_error_message(&response.body).as_deref().unwrap_or(""),
            "forecast endpoint returned non-success status; decoding body anyway"
        );
    }

    parse_forecast_response(&response.body)
}

pub fn parse_forecast_response(body: &[u8]) -> Result<ForecastSnapshot, ProviderError> {
    Ok(ForecastSnapshot::from_json_slice(body)?)
}

fn extract_error_message(body: &[u8]) -> Option<String> {
    let json = serde_json::from_slice::<Value>(body).ok()?;
    for key in ["reason", "message", "error"] {
        if let Some(value) = json.get(key).and_then(Value::as_str) {
            let message = value.trim();
            if !message.is_empty() {
                return Some(message.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::model::ValidationError;
    use crate::providers::ProviderResponse;

    const BERLIN_BODY: &str = r#"{
        "latitude": 52.52,
        "longitude": 13.419998,
        "generationtime_ms": 0.05,
        "utc_offset_seconds": 0,
        "timezone": "GMT",
        "current_units": {"temperature_2m": "°C"},
        "current": {
            "time": "2024-01-29T10:00",
            "interval": 900,
            "temperature_2m": 7.4,
            "precipitation": 0.4,
            "weather_code": 61,
            "wind_speed_10m": 3.2
        },
        "daily": {
            "time": ["2024-01-29", "2024-01-30", "2024-01-31"],
            "weather_code": [61, 3, 2],
            "temperature_2m_max": [8.1, 9.0, 10.2],
            "temperature_2m_min": [2.0, 3.1, 4.2]
        }
    }"#;

    struct RecordingApi {
        response: Result<ProviderResponse, ProviderError>,
        urls: RefCell<Vec<String>>,
    }

    impl RecordingApi {
        fn returning(status: u16, body: &str) -> Self {
            Self {
                response: Ok(ProviderResponse {
                    status,
                    body: body.as_bytes().to_vec(),
                }),
                urls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ProviderApi for RecordingApi {
        fn get(&self, url: &str) -> Result<ProviderResponse, ProviderError> {
            self.urls.borrow_mut().push(url.to_string());
            self.response.clone()
        }
    }

    #[test]
    fn open_meteo_url_contains_exact_query() {
        let url = build_forecast_url(52.52, 13.41).expect("url");

        assert_eq!(
            url,
            "https://api.open-meteo.com/v1/forecast?latitude=52.52&longitude=13.41\
             &current=temperature_2m,precipitation,weather_code,wind_speed_10m\
             &daily=weather_code,temperature_2m_max,temperature_2m_min&wind_speed_unit=ms"
        );
    }

    #[test]
    fn open_meteo_url_substitutes_coordinates_verbatim() {
        for (lat, lon) in [(-33.8688, 151.2093), (0.0, -0.5), (-90.0, 180.0)] {
            let url = build_forecast_url(lat, lon).expect("url");
            assert!(url.contains(&format!("latitude={lat}&")));
            assert!(url.contains(&format!("longitude={lon}&")));
            assert!(url.ends_with("&wind_speed_unit=ms"));
        }
    }

    #[test]
    fn open_meteo_url_rejects_out_of_range_coordinates() {
        assert_eq!(
            build_forecast_url(123.0, 0.0),
            Err(ProviderError::InvalidCoordinates(
                ValidationError::InvalidLatitude(123.0)
            ))
        );
    }

    #[test]
    fn open_meteo_forecast_decodes_consumed_fields() {
        let snapshot = parse_forecast_response(BERLIN_BODY.as_bytes()).expect("snapshot");

        assert_eq!(snapshot.latitude, 52.52);
        assert_eq!(snapshot.current.temperature_c, 7.4);
        assert_eq!(snapshot.current.weather_code, 61);
        assert_eq!(snapshot.current.wind_speed_ms, 3.2);
        assert_eq!(snapshot.current.precipitation_pct, 0.4);
        assert_eq!(snapshot.daily.len(), 3);
        assert_eq!(snapshot.daily.dates[2], "2024-01-31");
    }

    #[test]
    fn open_meteo_forecast_rejects_mismatched_daily_lengths() {
        let body = r#"{
            "latitude": 52.52,
            "longitude": 13.41,
            "current": {"temperature_2m": 7.4, "precipitation": 0.0, "weather_code": 3, "wind_speed_10m": 1.0},
            "daily": {
                "time": ["2024-01-29", "2024-01-30"],
                "weather_code": [3],
                "temperature_2m_max": [8.1, 9.0],
                "temperature_2m_min": [2.0, 3.1]
            }
        }"#;

        let error = parse_forecast_response(body.as_bytes()).expect_err("must fail");
        assert!(
            matches!(error, ProviderError::Decode(message) if message.contains("length mismatch"))
        );
    }

    #[test]
    fn open_meteo_forecast_rejects_missing_and_mistyped_fields() {
        let missing_current = r#"{"latitude": 1.0, "longitude": 2.0, "daily": {
            "time": [], "weather_code": [], "temperature_2m_max": [], "temperature_2m_min": []}}"#;
        let wrong_type = BERLIN_BODY.replace("\"weather_code\": 61", "\"weather_code\": \"rain\"");

        assert!(matches!(
            parse_forecast_response(missing_current.as_bytes()),
            Err(ProviderError::Decode(_))
        ));
        assert!(matches!(
            parse_forecast_response(wrong_type.as_bytes()),
            Err(ProviderError::Decode(_))
        ));
        assert!(matches!(
            parse_forecast_response(b"<html>bad gateway</html>"),
            Err(ProviderError::Decode(_))
        ));
    }

    #[test]
    fn open_meteo_fetch_decodes_body_of_non_success_status() {
        let api = RecordingApi::returning(500, BERLIN_BODY);

        let snapshot = fetch_forecast(&api, FORECAST_ENDPOINT, 52.52, 13.41).expect("snapshot");
        assert_eq!(snapshot.current.weather_code, 61);
    }

    #[test]
    fn open_meteo_fetch_surfaces_error_body_as_decode_error() {
        let api = RecordingApi::returning(400, r#"{"error": true, "reason": "bad latitude"}"#);

        let error = fetch_forecast(&api, FORECAST_ENDPOINT, 52.52, 13.41).expect_err("must fail");
        assert!(matches!(error, ProviderError::Decode(_)));
    }

    #[test]
    fn open_meteo_fetch_skips_network_for_invalid_coordinates() {
        let api = RecordingApi::returning(200, BERLIN_BODY);

        let error = fetch_forecast(&api, FORECAST_ENDPOINT, 0.0, 200.0).expect_err("must fail");
        assert!(error.is_user_error());
        assert!(api.urls.borrow().is_empty());
    }

    #[test]
    fn open_meteo_fetch_uses_configured_endpoint() {
        let api = RecordingApi::returning(200, BERLIN_BODY);

        fetch_forecast(&api, "http://localhost:8080/v1/forecast", 1.5, 2.5).expect("snapshot");
        let urls = api.urls.borrow();
        assert!(
            urls[0].starts_with("http://localhost:8080/v1/forecast?latitude=1.5&longitude=2.5")
        );
    }

    #[test]
    fn open_meteo_extract_error_message_prefers_reason() {
        let body = br#"{"error": true, "reason": "rate limit exceeded"}"#;
        assert_eq!(
            extract_error_message(body),
            Some("rate limit exceeded".to_string())
        );
    }
}
