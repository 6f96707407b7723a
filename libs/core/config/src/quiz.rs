use crate::{env_required, ConfigError, FromEnv};

/// Location of the companion quiz service.
///
/// Used by the course-scoped ranking pipeline, which asks the quiz service
/// for the quiz ids belonging to a course.
#[derive(Clone, Debug)]
pub struct QuizServiceConfig {
    pub base_url: String,
}

impl FromEnv for QuizServiceConfig {
    /// Reads `QUIZ_SERVICE_URL` (required).
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_required("QUIZ_SERVICE_URL")?,
        })
    }
}
