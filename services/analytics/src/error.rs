use ingest::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Insufficient data: at least 2 distinct years are required, found {years}")]
    InsufficientData { years: usize },

    #[error("Forecast horizon of {years} years exceeds the maximum of {max}")]
    HorizonTooLong { years: u32, max: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
