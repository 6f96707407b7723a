use async_trait::async_trait;
use messaging::{Event, ProcessingError, Processor};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::UserError;
use crate::models::Provider;
use crate::repository::UserRepository;
use crate::service::UserService;

/// A quiz was answered by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAnswerEvent {
    pub user_id: Uuid,
    pub quiz_id: String,
    pub is_answer: bool,
}

/// A quiz was marked or unmarked by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkQuizEvent {
    pub user_id: Uuid,
    pub quiz_id: String,
    pub is_marked: bool,
}

/// A quiz was deleted from the quiz service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuizEvent {
    pub quiz_id: String,
}

/// A federated identity grant was revoked at the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeOAuthEvent {
    pub provider: Provider,
    pub provider_subject: String,
}

/// Published by this service when a user account is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserEvent {
    pub user_id: Uuid,
}

/// Events arriving from the quiz service, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QuizEvent {
    CheckAnswer(CheckAnswerEvent),
    MarkQuiz(MarkQuizEvent),
    DeleteQuiz(DeleteQuizEvent),
}

impl Event for QuizEvent {
    fn event_id(&self) -> String {
        match self {
            QuizEvent::CheckAnswer(e) => format!("check-answer:{}:{}", e.user_id, e.quiz_id),
            QuizEvent::MarkQuiz(e) => format!("mark-quiz:{}:{}", e.user_id, e.quiz_id),
            QuizEvent::DeleteQuiz(e) => format!("delete-quiz:{}", e.quiz_id),
        }
    }
}

/// Events arriving from the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuthEvent {
    RevokeOAuth(RevokeOAuthEvent),
}

impl Event for AuthEvent {
    fn event_id(&self) -> String {
        match self {
            AuthEvent::RevokeOAuth(e) => {
                format!("revoke-oauth:{:?}:{}", e.provider, e.provider_subject)
            }
        }
    }
}

impl Event for DeleteUserEvent {
    fn event_id(&self) -> String {
        format!("delete-user:{}", self.user_id)
    }
}

#[derive(Debug, Error)]
#[error("event publish failed: {0}")]
pub struct PublishError(pub String);

/// Outbound port for events this service emits.
#[async_trait]
pub trait UserEventPublisher: Send + Sync {
    async fn publish_user_deleted(&self, event: DeleteUserEvent) -> Result<(), PublishError>;
}

/// Classify a service failure for the redelivery policy: infrastructure
/// faults are retried, domain outcomes are final.
fn categorize(error: UserError) -> ProcessingError {
    match error {
        UserError::Repository(msg) => ProcessingError::transient(msg),
        UserError::QuizService(msg) => ProcessingError::transient(msg),
        UserError::Publish(msg) => ProcessingError::transient(msg),
        other => ProcessingError::permanent(other.to_string()),
    }
}

/// Applies quiz-service events to the user aggregate.
pub struct QuizEventProcessor<R: UserRepository> {
    service: UserService<R>,
}

impl<R: UserRepository> QuizEventProcessor<R> {
    pub fn new(service: UserService<R>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<R: UserRepository + 'static> Processor<QuizEvent> for QuizEventProcessor<R> {
    async fn process(&self, event: &QuizEvent) -> Result<(), ProcessingError> {
        match event {
            QuizEvent::CheckAnswer(e) => {
                self.service
                    .answer_quiz(e.user_id, &e.quiz_id, e.is_answer)
                    .await
            }
            QuizEvent::MarkQuiz(e) => {
                // The event subject acts on their own account.
                let principal = Principal::user(e.user_id);
                self.service
                    .toggle_mark(&principal, e.user_id, &e.quiz_id, e.is_marked)
                    .await
                    .map(|_| ())
            }
            QuizEvent::DeleteQuiz(e) => self.service.cascade_quiz_deletion(&e.quiz_id).await,
        }
        .map_err(categorize)
    }

    fn name(&self) -> &'static str {
        "quiz-events"
    }
}

/// Applies auth-service events to the user aggregate.
pub struct AuthEventProcessor<R: UserRepository> {
    service: UserService<R>,
}

impl<R: UserRepository> AuthEventProcessor<R> {
    pub fn new(service: UserService<R>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<R: UserRepository + 'static> Processor<AuthEvent> for AuthEventProcessor<R> {
    async fn process(&self, event: &AuthEvent) -> Result<(), ProcessingError> {
        match event {
            AuthEvent::RevokeOAuth(e) => self
                .service
                .revoke_federated_account(e.provider, &e.provider_subject)
                .await
                .map_err(categorize),
        }
    }

    fn name(&self) -> &'static str {
        "auth-events"
    }
}

/// Publisher that records emitted events, for tests.
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    events: tokio::sync::Mutex<Vec<DeleteUserEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn published(&self) -> Vec<DeleteUserEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl UserEventPublisher for RecordingEventPublisher {
    async fn publish_user_deleted(&self, event: DeleteUserEvent) -> Result<(), PublishError> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Publisher that always fails, for tests of the best-effort path.
#[derive(Debug, Default)]
pub struct FailingEventPublisher;

#[async_trait]
impl UserEventPublisher for FailingEventPublisher {
    async fn publish_user_deleted(&self, _event: DeleteUserEvent) -> Result<(), PublishError> {
        Err(PublishError("broker unreachable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiz_event_wire_format() {
        let json = serde_json::json!({
            "type": "checkAnswer",
            "userId": "0191e9a0-0000-7000-8000-000000000001",
            "quizId": "quiz-1",
            "isAnswer": true,
        });

        let event: QuizEvent = serde_json::from_value(json).unwrap();
        match event {
            QuizEvent::CheckAnswer(e) => {
                assert_eq!(e.quiz_id, "quiz-1");
                assert!(e.is_answer);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_delete_user_event_uses_camel_case() {
        let event = DeleteUserEvent {
            user_id: Uuid::now_v7(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("user_id").is_none());
    }

    #[tokio::test]
    async fn test_quiz_processor_applies_answer_events() {
        use crate::models::CreateUser;
        use crate::quiz_client::StaticQuizClient;
        use crate::repository::{InMemoryUserRepository, UserRepository};
        use std::sync::Arc;

        let repo = Arc::new(InMemoryUserRepository::new());
        let service = UserService::new(
            repo.clone(),
            Arc::new(StaticQuizClient::default()),
            Arc::new(RecordingEventPublisher::new()),
        );
        let user = service
            .create_user(CreateUser {
                username: "alice".to_string(),
                password: Some("correct horse battery".to_string()),
                provider: None,
                provider_subject: None,
                nickname: "alice".to_string(),
                notifications_enabled: true,
                daily_goal: 5,
            })
            .await
            .unwrap();

        let processor = QuizEventProcessor::new(service);
        processor
            .process(&QuizEvent::CheckAnswer(CheckAnswerEvent {
                user_id: user.id,
                quiz_id: "q1".to_string(),
                is_answer: true,
            }))
            .await
            .unwrap();
        processor
            .process(&QuizEvent::MarkQuiz(MarkQuizEvent {
                user_id: user.id,
                quiz_id: "q1".to_string(),
                is_marked: true,
            }))
            .await
            .unwrap();

        let stored = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.correct_quiz_ids.contains("q1"));
        assert!(stored.marked_quiz_ids.contains("q1"));

        // An answer for an unknown user is rejected permanently, never retried.
        let err = processor
            .process(&QuizEvent::CheckAnswer(CheckAnswerEvent {
                user_id: Uuid::now_v7(),
                quiz_id: "q1".to_string(),
                is_answer: true,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.category(), messaging::ErrorCategory::Permanent);
    }

    #[test]
    fn test_infrastructure_errors_are_transient() {
        assert_eq!(
            categorize(UserError::Repository("down".into())).category(),
            messaging::ErrorCategory::Transient
        );
        assert_eq!(
            categorize(UserError::NotFound).category(),
            messaging::ErrorCategory::Permanent
        );
        assert_eq!(
            categorize(UserError::PermissionDenied).category(),
            messaging::ErrorCategory::Permanent
        );
    }
}
