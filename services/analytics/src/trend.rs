//! Linear trend estimation over yearly counts.
//!
//! Model: `count = a + b * (year - base_year)`, fitted by ordinary least
//! squares, where `base_year` is the first year present. Forecasts are
//! rounded and clamped at zero.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{AnalysisError, Result};

/// Forecasts further out than this many years carry a warning.
const CONFIDENT_HORIZON: u32 = 5;
/// Accuracy points lost per year of horizon.
const ACCURACY_DECAY_PER_YEAR: f64 = 5.0;
/// Margin-of-error points per year of horizon for a fit with r² = 0.
const MARGIN_PER_YEAR: f64 = 10.0;
/// Longest horizon `forecast_horizon` accepts.
pub const MAX_HORIZON_YEARS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearTrend {
    pub base_year: i32,
    pub last_year: i32,
    pub intercept: f64,
    pub slope: f64,
    pub r_squared: f64,
}

impl LinearTrend {
    pub fn fit(counts: &BTreeMap<i32, u64>) -> Result<Self> {
        let (base_year, last_year) = match (counts.keys().next(), counts.keys().next_back()) {
            (Some(&first), Some(&last)) if counts.len() >= 2 => (first, last),
            _ => {
                return Err(AnalysisError::InsufficientData {
                    years: counts.len(),
                })
            }
        };

        let points: Vec<(f64, f64)> = counts
            .iter()
            .map(|(&year, &count)| ((year - base_year) as f64, count as f64))
            .collect();

        let n = points.len() as f64;
        let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
        let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
        let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
        let sum_x2: f64 = points.iter().map(|(x, _)| x * x).sum();

        // Non-zero because the keys are distinct and there are at least two
        let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_x2 - sum_x * sum_x);
        let mean_x = sum_x / n;
        let mean_y = sum_y / n;
        let intercept = mean_y - slope * mean_x;

        let ss_tot: f64 = points.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();
        let ss_res: f64 = points
            .iter()
            .map(|(x, y)| (y - (intercept + slope * x)).powi(2))
            .sum();
        let r_squared = if ss_tot == 0.0 {
            0.0
        } else {
            1.0 - ss_res / ss_tot
        };

        Ok(Self {
            base_year,
            last_year,
            intercept,
            slope,
            r_squared,
        })
    }

    /// Raw regression value for a year.
    pub fn predict(&self, year: i32) -> f64 {
        self.intercept + self.slope * (year - self.base_year) as f64
    }

    /// Regression value rounded to a whole count, never negative.
    pub fn predict_count(&self, year: i32) -> u64 {
        self.predict(year).round().max(0.0) as u64
    }

    pub fn direction(&self) -> TrendDirection {
        if self.slope > 0.0 {
            TrendDirection::Increasing
        } else if self.slope < 0.0 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub year: i32,
    pub predicted_value: u64,
    /// r² as a percentage, e.g. "87.50%"
    pub accuracy_percent: String,
    pub trend: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizonForecast {
    pub predicted_value: u64,
    pub accuracy_percent: String,
    pub margin_of_error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Forecast for the year after the last one observed.
pub fn forecast_next(counts: &BTreeMap<i32, u64>) -> Result<Forecast> {
    let trend = LinearTrend::fit(counts)?;
    let year = trend.last_year + 1;

    Ok(Forecast {
        year,
        predicted_value: trend.predict_count(year),
        accuracy_percent: format_percent(trend.r_squared * 100.0),
        trend: trend.direction(),
    })
}

/// Forecasts for each of the next `years` years. Accuracy drops and the
/// margin of error widens with the horizon; this is a heuristic, not a
/// statistical interval.
pub fn forecast_horizon(counts: &BTreeMap<i32, u64>, years: u32) -> Result<BTreeMap<i32, HorizonForecast>> {
    if years > MAX_HORIZON_YEARS {
        return Err(AnalysisError::HorizonTooLong {
            years,
            max: MAX_HORIZON_YEARS,
        });
    }
    let trend = LinearTrend::fit(counts)?;

    let forecasts = (1..=years)
        .map(|step| {
            // step <= MAX_HORIZON_YEARS, so the cast cannot wrap
            let year = trend.last_year + step as i32;
            let horizon = step as f64;
            let accuracy = (trend.r_squared * 100.0 - horizon * ACCURACY_DECAY_PER_YEAR).max(0.0);
            let margin = (1.0 - trend.r_squared) * horizon * MARGIN_PER_YEAR;
            let warning = (step > CONFIDENT_HORIZON).then(|| {
                format!(
                    "Low confidence: forecast is more than {} years ahead",
                    CONFIDENT_HORIZON
                )
            });

            (
                year,
                HorizonForecast {
                    predicted_value: trend.predict_count(year),
                    accuracy_percent: format_percent(accuracy),
                    margin_of_error: format!("±{}", format_percent(margin)),
                    warning,
                },
            )
        })
        .collect();

    Ok(forecasts)
}

fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}
