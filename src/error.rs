use thiserror::Error;

/// Failure kinds raised by the age-model pipeline.
///
/// Every kind is terminal for the run that raised it: no stage retries, and no
/// downstream stage is invoked with partial data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgeModelError {
    /// Empty or malformed data reached the core.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Fewer than two matched tie points.
    #[error("only {found} tie point(s) found; cannot build age model (need at least 2)")]
    InsufficientAnchors { found: usize },

    /// Two anchors share a depth, so the segment slope between them is undefined.
    #[error("degenerate age model: multiple anchors at depth {depth}")]
    DegenerateAgeModel { depth: f64 },

    /// Too few samples to interpolate.
    #[error("series has {len} point(s); resampling needs at least 2")]
    EmptySeries { len: usize },
}

impl AgeModelError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AgeModelError::InvalidInput(message.into())
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<AgeModelError> for AppError {
    fn from(err: AgeModelError) -> Self {
        let exit_code = match err {
            AgeModelError::InvalidInput(_) => 2,
            AgeModelError::EmptySeries { .. } => 3,
            AgeModelError::InsufficientAnchors { .. } | AgeModelError::DegenerateAgeModel { .. } => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
