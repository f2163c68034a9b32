use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InsightsError {
    #[error("Incorrect insights format: {0}")]
    MalformedInput(String),
}
