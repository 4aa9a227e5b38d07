//! Growth metric output records, serialized as the export response body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthMetric {
    pub volume_growth: f64,
    pub high_growth: f64,
    pub low_growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPairMetric {
    pub market_pair: String,
    pub metric: GrowthMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde(rename = "market_pair_data")]
    pub metrics: Vec<MarketPairMetric>,
}

/// Percentage change from `a` to `b`. Callers must reject `a == 0`.
pub fn growth_rate(a: f64, b: f64) -> f64 {
    (b - a) * 100.0 / a
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn growth_rate_is_percentage_of_left_value() {
        assert_eq!(growth_rate(1.0, 2.0), 100.0);
        assert_eq!(growth_rate(4.0, 3.0), -25.0);
        assert_eq!(growth_rate(7.5, 7.5), 0.0);
    }

    #[test]
    fn summary_serializes_with_export_field_names() {
        let summary = WindowSummary {
            from: Utc.with_ymd_and_hms(2012, 11, 1, 22, 8, 0).single().unwrap(),
            to: Utc.with_ymd_and_hms(2012, 11, 1, 22, 13, 0).single().unwrap(),
            metrics: vec![MarketPairMetric {
                market_pair: "BTC-ETH".to_string(),
                metric: GrowthMetric {
                    volume_growth: 10.0,
                    high_growth: 100.0,
                    low_growth: -50.0,
                },
            }],
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["from"], "2012-11-01T22:08:00Z");
        assert_eq!(json["to"], "2012-11-01T22:13:00Z");
        let data = json["market_pair_data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["market_pair"], "BTC-ETH");
        assert_eq!(data[0]["metric"]["volume_growth"], 10.0);
        assert_eq!(data[0]["metric"]["high_growth"], 100.0);
        assert_eq!(data[0]["metric"]["low_growth"], -50.0);
    }
}
