use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlanError>;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("program parse error: {0}")]
    Parse(String),

    #[error("invalid program: {0}")]
    Invalid(String),
}

impl From<serde_yaml::Error> for PlanError {
    fn from(e: serde_yaml::Error) -> Self {
        PlanError::Parse(e.to_string())
    }
}
