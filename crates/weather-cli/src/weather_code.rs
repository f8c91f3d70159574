use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Icon used by display surfaces when a code falls outside the WMO table.
pub const FALLBACK_SMALL_ICON: &str = "cloud";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCode {
    ClearSky,
    MainlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    DepositingRimeFog,
    DrizzleLight,
    DrizzleModerate,
    DrizzleDense,
    FreezingDrizzleLight,
    FreezingDrizzleDense,
    RainSlight,
    RainModerate,
    RainHeavy,
    FreezingRainLight,
    FreezingRainHeavy,
    SnowSlight,
    SnowModerate,
    SnowHeavy,
    SnowGrains,
    RainShowersSlight,
    RainShowersModerate,
    RainShowersViolent,
    SnowShowersSlight,
    SnowShowersHeavy,
    Thunderstorm,
    ThunderstormSlightHail,
    ThunderstormHeavyHail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeatherCodeInfo {
    pub code: i32,
    pub weather_code: WeatherCode,
    pub description: &'static str,
    pub big_icon: &'static str,
    pub small_icon: &'static str,
}

const fn info(
    code: i32,
    weather_code: WeatherCode,
    description: &'static str,
    big_icon: &'static str,
    small_icon: &'static str,
) -> WeatherCodeInfo {
    WeatherCodeInfo {
        code,
        weather_code,
        description,
        big_icon,
        small_icon,
    }
}

/// WMO weather interpretation codes as served by Open-Meteo, sorted by code.
///
/// Related intensities share icon keys; descriptions stay distinct per severity.
#[rustfmt::skip]
pub static WEATHER_CODE_TABLE: [WeatherCodeInfo; 28] = [
    info(0, WeatherCode::ClearSky, "Sunny", "sunny", "sun.max"),
    info(1, WeatherCode::MainlyClear, "Mostly Clear", "sunnyCloud", "cloud.sun"),
    info(2, WeatherCode::PartlyCloudy, "Partly Cloudy", "sunnyCloud", "cloud.sun"),
    info(3, WeatherCode::Overcast, "Overcast", "veryCloudy", "cloud"),
    info(45, WeatherCode::Fog, "Foggy", "veryCloudy", "cloud"),
    info(48, WeatherCode::DepositingRimeFog, "Foggy", "veryCloudy", "cloud"),
    info(51, WeatherCode::DrizzleLight, "Light Drizzle", "rainy", "cloud.drizzle"),
    info(53, WeatherCode::DrizzleModerate, "Moderate Drizzle", "rainy", "cloud.drizzle"),
    info(55, WeatherCode::DrizzleDense, "Dense Drizzle", "rainy", "cloud.drizzle"),
    info(56, WeatherCode::FreezingDrizzleLight, "Freezing Drizzle", "rainy", "cloud.drizzle"),
    info(57, WeatherCode::FreezingDrizzleDense, "Freezing Drizzle", "rainy", "cloud.drizzle"),
    info(61, WeatherCode::RainSlight, "Light Rain", "rainy", "cloud.drizzle"),
    info(63, WeatherCode::RainModerate, "Moderate Rain", "rainy", "cloud.drizzle"),
    info(65, WeatherCode::RainHeavy, "Heavy Rain", "rainy", "cloud.drizzle"),
    info(66, WeatherCode::FreezingRainLight, "Freezing Rain", "rainy", "cloud.drizzle"),
    info(67, WeatherCode::FreezingRainHeavy, "Freezing Rain", "rainy", "cloud.drizzle"),
    info(71, WeatherCode::SnowSlight, "Light Snow", "snowing", "cloud.snow"),
    info(73, WeatherCode::SnowModerate, "Moderate Snow", "snowing", "cloud.snow"),
    info(75, WeatherCode::SnowHeavy, "Heavy Snow", "snowing", "cloud.snow"),
    info(77, WeatherCode::SnowGrains, "Snow Grains", "snowing", "cloud.snow"),
    info(80, WeatherCode::RainShowersSlight, "Light Rain Showers", "veryRainy", "cloud.rain"),
    info(81, WeatherCode::RainShowersModerate, "Moderate Rain Showers", "veryRainy", "cloud.rain"),
    info(82, WeatherCode::RainShowersViolent, "Violent Rain Showers", "veryRainy", "cloud.rain"),
    info(85, WeatherCode::SnowShowersSlight, "Snow Showers", "snowing", "cloud.snow"),
    info(86, WeatherCode::SnowShowersHeavy, "Snow Showers", "snowing", "cloud.snow"),
    info(95, WeatherCode::Thunderstorm, "Thunderstorm", "thunder", "cloud.bolt.rain"),
    info(96, WeatherCode::ThunderstormSlightHail, "Thunderstorm with Hail", "thunder", "cloud.bolt.rain"),
    info(99, WeatherCode::ThunderstormHeavyHail, "Severe Thunderstorm with Heavy Hail", "thunder", "cloud.bolt.rain"),
];

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("unknown weather code: {0}")]
pub struct UnknownCodeError(pub i32);

pub fn classify(code: i32) -> Result<&'static WeatherCodeInfo, UnknownCodeError> {
    WEATHER_CODE_TABLE
        .binary_search_by_key(&code, |entry| entry.code)
        .map(|index| &WEATHER_CODE_TABLE[index])
        .map_err(|_| UnknownCodeError(code))
}

pub fn small_icon_or_fallback(code: i32) -> &'static str {
    classify(code)
        .map(|entry| entry.small_icon)
        .unwrap_or(FALLBACK_SMALL_ICON)
}

impl WeatherCode {
    pub fn from_code(code: i32) -> Result<Self, UnknownCodeError> {
        classify(code).map(|entry| entry.weather_code)
    }

    pub fn info(self) -> &'static WeatherCodeInfo {
        // Variants are declared in table order.
        &WEATHER_CODE_TABLE[self as usize]
    }

    pub fn code(self) -> i32 {
        self.info().code
    }

    pub fn description(self) -> &'static str {
        self.info().description
    }

    pub fn big_icon(self) -> &'static str {
        self.info().big_icon
    }

    pub fn small_icon(self) -> &'static str {
        self.info().small_icon
    }
}

impl TryFrom<i32> for WeatherCode {
    type Error = UnknownCodeError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}
