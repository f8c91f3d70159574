//! Open-Meteo forecast acquisition, WMO code classification and snapshot sharing.
//!
//! - `providers`: request URL, HTTP transport and response decoding.
//! - `service`: fetch pipeline, stale-write guard and subscriber fan-out.
//! - `store`: shared key-value surface read by the widget.
//! - `widget`: timeline entry built from the shared snapshot.

pub mod config;
pub mod error;
pub mod model;
pub mod providers;
pub mod service;
pub mod store;
pub mod weather_code;
pub mod widget;

pub use model::{ForecastSnapshot, current_weather_code, day_name};
pub use providers::open_meteo::build_forecast_url;
pub use service::{ForecastClient, ForecastFetch, ShareStatus};
pub use weather_code::{WeatherCode, classify};
