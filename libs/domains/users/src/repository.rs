use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::UserResult;
use crate::models::{Provider, User};

/// Persistence port for the user aggregate.
///
/// `save` is an upsert keyed by id. Service pipelines do a load-mutate-save
/// cycle without holding any lock across the await points, so two pipelines
/// racing on the same user can lose an update; callers that cannot tolerate
/// this must serialize per user upstream.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> UserResult<Option<User>>;

    async fn find_by_provider(
        &self,
        provider: Provider,
        provider_subject: &str,
    ) -> UserResult<Option<User>>;

    /// All users, unspecified order. Used by the quiz-deletion cascade.
    async fn find_all(&self) -> UserResult<Vec<User>>;

    /// Users sorted by how many quizzes they answered correctly, descending.
    async fn find_all_ordered_by_correct_count(&self) -> UserResult<Vec<User>>;

    /// Ranking restricted to a set of quiz ids: users sorted by how many of
    /// the given quizzes they answered correctly, descending. Every user
    /// appears; those with no matching correct answer rank at the bottom.
    async fn find_all_ordered_by_correct_count_within(
        &self,
        quiz_ids: &[String],
    ) -> UserResult<Vec<User>>;

    async fn save(&self, user: User) -> UserResult<User>;

    /// Returns whether a user with that id existed.
    async fn delete_by_id(&self, id: Uuid) -> UserResult<bool>;
}

/// In-memory repository backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_provider(
        &self,
        provider: Provider,
        provider_subject: &str,
    ) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| {
                u.provider == Some(provider)
                    && u.provider_subject.as_deref() == Some(provider_subject)
            })
            .cloned())
    }

    async fn find_all(&self) -> UserResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(users.values().cloned().collect())
    }

    async fn find_all_ordered_by_correct_count(&self) -> UserResult<Vec<User>> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| b.correct_quiz_ids.len().cmp(&a.correct_quiz_ids.len()));
        Ok(all)
    }

    async fn find_all_ordered_by_correct_count_within(
        &self,
        quiz_ids: &[String],
    ) -> UserResult<Vec<User>> {
        let users = self.users.read().await;
        let mut scored: Vec<(usize, User)> = users
            .values()
            .map(|u| {
                let score = quiz_ids
                    .iter()
                    .filter(|id| u.correct_quiz_ids.contains(*id))
                    .count();
                (score, u.clone())
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().map(|(_, u)| u).collect())
    }

    async fn save(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_by_id(&self, id: Uuid) -> UserResult<bool> {
        let mut users = self.users.write().await;
        Ok(users.remove(&id).is_some())
    }
}
