use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{UserError, UserResult};

/// Port to the quiz service, used to resolve a course into its quiz ids for
/// the per-course ranking.
#[async_trait]
pub trait QuizClient: Send + Sync {
    async fn quiz_ids_by_course(
        &self,
        course_id: &str,
        bearer_token: &str,
    ) -> UserResult<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct QuizSummary {
    id: String,
}

/// HTTP client against the quiz service. The caller's bearer token is
/// forwarded so the quiz service applies its own authorization.
#[derive(Debug, Clone)]
pub struct HttpQuizClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpQuizClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl QuizClient for HttpQuizClient {
    async fn quiz_ids_by_course(
        &self,
        course_id: &str,
        bearer_token: &str,
    ) -> UserResult<Vec<String>> {
        let url = format!("{}/quiz/course/{}", self.base_url, course_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(bearer_token)
            .send()
            .await
            .map_err(|e| UserError::QuizService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UserError::QuizService(format!(
                "quiz service returned {} for course {}",
                response.status(),
                course_id
            )));
        }

        let quizzes: Vec<QuizSummary> = response
            .json()
            .await
            .map_err(|e| UserError::QuizService(e.to_string()))?;

        Ok(quizzes.into_iter().map(|q| q.id).collect())
    }
}

/// Client returning a fixed id list, for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticQuizClient {
    quiz_ids: Vec<String>,
}

impl StaticQuizClient {
    pub fn new(quiz_ids: Vec<String>) -> Self {
        Self { quiz_ids }
    }
}

#[async_trait]
impl QuizClient for StaticQuizClient {
    async fn quiz_ids_by_course(
        &self,
        _course_id: &str,
        _bearer_token: &str,
    ) -> UserResult<Vec<String>> {
        Ok(self.quiz_ids.clone())
    }
}
