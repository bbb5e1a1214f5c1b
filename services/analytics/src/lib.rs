//! Aggregations, rankings and trend forecasts over occurrence records.

pub mod aggregate;
pub mod error;
pub mod order;
pub mod service;
pub mod trend;

pub use aggregate::Season;
pub use error::AnalysisError;
pub use order::Ranked;
pub use service::AnalysisService;
pub use trend::{Forecast, HorizonForecast, LinearTrend, TrendDirection};
