use thiserror::Error;

#[derive(Debug, Error)]
pub enum CurveLabError {
    #[error("Construction error: {0}")]
    Construction(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Degenerate geometry: {0}")]
    Degenerate(String),

    #[error("Singular system: {0}")]
    Singular(String),

    #[error("Index out of range: {0}")]
    IndexOutOfRange(String),
}

pub type Result<T> = std::result::Result<T, CurveLabError>;
