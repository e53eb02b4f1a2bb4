use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherData {
    pub temperature: f64,
    pub humidity: u32,
    pub condition: String,
    pub condition_icon: String,
    pub wind_speed: f64,
    pub time: String,
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub location: Option<String>,
}

/// Subset of the Open-Meteo forecast response we read.
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
pub struct CurrentConditions {
    pub temperature_2m: f64,
    pub relative_humidity_2m: f64,
    pub weather_code: u16,
    pub wind_speed_10m: f64,
    pub time: String,
}

pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

static DISTRICTS: &[(&str, Coordinates)] = &[
    ("ranchi", Coordinates { lat: 23.344315, lon: 85.296013 }),
    ("dhanbad", Coordinates { lat: 23.7957, lon: 86.4304 }),
    ("bokaro", Coordinates { lat: 23.801, lon: 85.325 }),
    ("giridih", Coordinates { lat: 24.180, lon: 85.199 }),
    ("hazaribagh", Coordinates { lat: 24.160, lon: 85.372 }),
    ("jamshedpur", Coordinates { lat: 22.794, lon: 86.180 }),
    ("east singhbhum", Coordinates { lat: 22.8042, lon: 86.1971 }),
    ("west singhbhum", Coordinates { lat: 22.6392, lon: 84.8272 }),
    ("deoghar", Coordinates { lat: 24.485, lon: 86.696 }),
    ("dumka", Coordinates { lat: 24.269, lon: 87.249 }),
    ("garhwa", Coordinates { lat: 24.168, lon: 83.813 }),
    ("godda", Coordinates { lat: 24.827, lon: 87.212 }),
    ("gumla", Coordinates { lat: 23.043, lon: 84.541 }),
    ("jamtara", Coordinates { lat: 23.963, lon: 86.802 }),
    ("khunti", Coordinates { lat: 23.073, lon: 85.278 }),
    ("koderma", Coordinates { lat: 24.467, lon: 85.599 }),
    ("latehar", Coordinates { lat: 23.744, lon: 84.499 }),
    ("lohardaga", Coordinates { lat: 23.434, lon: 84.680 }),
    ("pakur", Coordinates { lat: 24.633, lon: 87.849 }),
    ("palamu", Coordinates { lat: 24.031, lon: 84.073 }),
    ("ramgarh", Coordinates { lat: 23.631, lon: 85.519 }),
    ("sahibganj", Coordinates { lat: 25.250, lon: 87.650 }),
    ("seraikela-kharsawan", Coordinates { lat: 22.701, lon: 86.148 }),
    ("simdega", Coordinates { lat: 22.617, lon: 84.500 }),
    ("chatra", Coordinates { lat: 24.207, lon: 84.872 }),
];

/// Case-insensitive lookup of a Jharkhand district.
pub fn district_coordinates(location: &str) -> Option<&'static Coordinates> {
    let normalized = location.trim().to_lowercase();
    DISTRICTS
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, coords)| coords)
}

pub fn district_names() -> Vec<&'static str> {
    DISTRICTS.iter().map(|(name, _)| *name).collect()
}

/// WMO weather interpretation code to description and icon.
pub fn describe_weather_code(code: u16) -> (&'static str, &'static str) {
    match code {
        0 => ("Clear sky", "☀️"),
        1 => ("Mainly clear", "🌤️"),
        2 => ("Partly cloudy", "⛅"),
        3 => ("Overcast", "☁️"),
        45 | 48 => ("Foggy", "🌫️"),
        51 => ("Light drizzle", "🌦️"),
        53 => ("Drizzle", "🌦️"),
        55 => ("Heavy drizzle", "🌧️"),
        61 => ("Light rain", "🌧️"),
        63 => ("Rain", "🌧️"),
        65 => ("Heavy rain", "⛈️"),
        71 => ("Light snow", "🌨️"),
        73 => ("Snow", "❄️"),
        75 => ("Heavy snow", "❄️"),
        77 => ("Snow grains", "❄️"),
        80 => ("Light showers", "🌦️"),
        81 => ("Showers", "🌧️"),
        82 => ("Heavy showers", "⛈️"),
        85 => ("Light snow showers", "🌨️"),
        86 => ("Snow showers", "❄️"),
        95 => ("Thunderstorm", "⛈️"),
        96 => ("Thunderstorm with hail", "⛈️"),
        99 => ("Thunderstorm with heavy hail", "⛈️"),
        _ => ("Unknown", "🌡️"),
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl From<CurrentConditions> for WeatherData {
    fn from(current: CurrentConditions) -> Self {
        let (condition, icon) = describe_weather_code(current.weather_code);
        Self {
            temperature: round_one_decimal(current.temperature_2m),
            humidity: current.relative_humidity_2m.round() as u32,
            condition: condition.to_string(),
            condition_icon: icon.to_string(),
            wind_speed: round_one_decimal(current.wind_speed_10m),
            time: current.time,
        }
    }
}
