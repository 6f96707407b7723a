//! Users Domain
//!
//! User identity, profile attributes, and quiz-interaction state for the
//! quiz platform, kept consistent with the quiz service through domain
//! events.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐
//! │  Handlers   │   │ Event procs │  ← HTTP endpoints / consumed events
//! └──────┬──────┘   └──────┬──────┘
//!        │                 │
//! ┌──────▼─────────────────▼──────┐
//! │           Service             │  ← pipelines: lookup → authorize →
//! └──────┬─────────────────┬──────┘    mutate → persist → emit
//!        │                 │
//! ┌──────▼──────┐   ┌──────▼──────┐
//! │ Repository  │   │  Publisher  │  ← persistence port / event port
//! └──────┬──────┘   └─────────────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← the User aggregate and its invariants
//! └─────────────┘
//! ```
//!
//! The aggregate owns its invariants (disjoint correct/incorrect sets,
//! derived answer rate, monotonic level); the service owns pipeline ordering
//! (existence before authorization before mutation) and event idempotency.

pub mod auth;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod quiz_client;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use auth::Principal;
pub use error::{UserError, UserResult};
pub use events::{
    AuthEvent, AuthEventProcessor, CheckAnswerEvent, DeleteQuizEvent, DeleteUserEvent,
    FailingEventPublisher, MarkQuizEvent, PublishError, QuizEvent, QuizEventProcessor,
    RecordingEventPublisher, RevokeOAuthEvent, UserEventPublisher,
};
pub use models::{
    ChangePassword, CreateUser, MatchPassword, Provider, Role, UpdateProfile, User, UserResponse,
};
pub use quiz_client::{HttpQuizClient, QuizClient, StaticQuizClient};
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;
