use thiserror::Error;

#[derive(Error, Debug)]
pub enum BriefError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown fact field: {0}")]
    UnknownField(String),

    #[error("Unknown fiscal period: {0}")]
    UnknownFiscalPeriod(String),

    #[error("Unknown KPI: {0}")]
    UnknownKpi(String),

    #[error("Unknown sector template: {0}")]
    UnknownTemplate(String),
}

pub type BriefResult<T> = Result<T, BriefError>;
