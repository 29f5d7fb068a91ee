//! Daily forecast model produced by the midday reduction

use serde::{Deserialize, Serialize};

/// One calendar day of the upcoming forecast, represented by its midday
/// sample from the 3-hour feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    /// Epoch seconds of the midday sample
    pub dt: i64,
    /// Temperature in Celsius at midday
    pub temp: f64,
    pub min_temp: f64,
    pub max_temp: f64,
    /// Precipitation probability as an integer percentage
    pub pop: u8,
    /// Weather category label, e.g. "Clear" or "Rain"
    pub weather_main: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_day_serializes_with_camel_case_keys() {
        let day = ForecastDay {
            dt: 1_685_620_800,
            temp: 24.1,
            min_temp: 18.4,
            max_temp: 26.0,
            pop: 56,
            weather_main: "Rain".to_string(),
        };
        let json = serde_json::to_value(&day).unwrap();
        assert_eq!(json["minTemp"], 18.4);
        assert_eq!(json["maxTemp"], 26.0);
        assert_eq!(json["weatherMain"], "Rain");
        assert_eq!(json["pop"], 56);
    }
}
