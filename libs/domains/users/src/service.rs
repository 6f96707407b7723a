use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::{UserError, UserResult};
use crate::events::{DeleteUserEvent, UserEventPublisher};
use crate::models::{ChangePassword, CreateUser, Provider, UpdateProfile, User};
use crate::quiz_client::QuizClient;
use crate::repository::UserRepository;

/// User service: every pipeline loads the aggregate, applies domain methods
/// and persists the result.
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
    quiz_client: Arc<dyn QuizClient>,
    publisher: Arc<dyn UserEventPublisher>,
}

impl<R: UserRepository> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            quiz_client: Arc::clone(&self.quiz_client),
            publisher: Arc::clone(&self.publisher),
        }
    }
}

impl<R: UserRepository> UserService<R> {
    pub fn new(
        repository: Arc<R>,
        quiz_client: Arc<dyn QuizClient>,
        publisher: Arc<dyn UserEventPublisher>,
    ) -> Self {
        Self {
            repository,
            quiz_client,
            publisher,
        }
    }

    /// Register a new account, local or federated.
    ///
    /// Pipeline order: identity-shape validation, both uniqueness checks,
    /// then credential hashing.
    pub async fn create_user(&self, input: CreateUser) -> UserResult<User> {
        if !matches!(
            (&input.password, &input.provider, &input.provider_subject),
            (Some(_), None, None) | (None, Some(_), Some(_))
        ) {
            return Err(UserError::Validation(
                "Provide either a password or a provider with its subject".to_string(),
            ));
        }

        if self
            .repository
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(UserError::AlreadyExists);
        }
        if let (Some(provider), Some(subject)) = (input.provider, &input.provider_subject) {
            if self
                .repository
                .find_by_provider(provider, subject)
                .await?
                .is_some()
            {
                return Err(UserError::AlreadyExists);
            }
        }

        let password_hash = match &input.password {
            Some(password) => Some(self.hash_password(password)?),
            None => None,
        };

        let user = User::new(
            input.username,
            input.nickname,
            password_hash,
            input.provider,
            input.provider_subject,
            input.notifications_enabled,
            input.daily_goal,
        );

        let saved = self.repository.save(user).await?;
        tracing::info!(user_id = %saved.id, username = %saved.username, "user registered");
        Ok(saved)
    }

    pub async fn get_user(&self, id: Uuid) -> UserResult<User> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound)
    }

    pub async fn get_user_by_username(&self, username: &str) -> UserResult<User> {
        self.repository
            .find_by_username(username)
            .await?
            .ok_or(UserError::NotFound)
    }

    /// The caller's own account, resolved from their token.
    pub async fn get_authenticated_user(&self, principal: &Principal) -> UserResult<User> {
        self.get_user(principal.id).await
    }

    /// Global ranking by correct-answer count.
    pub async fn get_ranking(&self) -> UserResult<Vec<User>> {
        self.repository.find_all_ordered_by_correct_count().await
    }

    /// Ranking restricted to the quizzes of one course. The quiz service
    /// resolves the course with the caller's own token.
    pub async fn get_ranking_by_course(
        &self,
        course_id: &str,
        bearer_token: &str,
    ) -> UserResult<Vec<User>> {
        let quiz_ids = self
            .quiz_client
            .quiz_ids_by_course(course_id, bearer_token)
            .await?;
        self.repository
            .find_all_ordered_by_correct_count_within(&quiz_ids)
            .await
    }

    /// Update the mutable display fields. Existence is checked before
    /// authorization, so probing an id you cannot touch yields the same 404
    /// as a missing one only when it really is missing.
    pub async fn update_profile(
        &self,
        id: Uuid,
        principal: &Principal,
        input: UpdateProfile,
    ) -> UserResult<User> {
        let mut user = self.get_user(id).await?;
        self.authorize(principal, &user)?;

        user.update_profile(
            input.nickname,
            input.avatar_image,
            input.notifications_enabled,
            input.daily_goal,
        );
        self.repository.save(user).await
    }

    /// Change a local password after verifying the current one.
    pub async fn change_password(
        &self,
        id: Uuid,
        principal: &Principal,
        input: ChangePassword,
    ) -> UserResult<User> {
        let mut user = self.get_user(id).await?;
        self.authorize(principal, &user)?;

        let current_hash = user
            .password_hash
            .clone()
            .ok_or(UserError::OAuthNoPassword)?;
        self.verify_password(&input.current_password, &current_hash)?;

        let new_hash = self.hash_password(&input.new_password)?;
        user.update_credential(new_hash);
        self.repository.save(user).await
    }

    /// Verify a username/password pair. Used by the match-password flow.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> UserResult<User> {
        let user = self.get_user_by_username(username).await?;
        let hash = user
            .password_hash
            .clone()
            .ok_or(UserError::OAuthNoPassword)?;
        self.verify_password(password, &hash)?;
        Ok(user)
    }

    /// Delete an account and announce it. The announcement is best effort:
    /// a publish failure is logged but never undoes the deletion.
    pub async fn delete_user(&self, id: Uuid, principal: &Principal) -> UserResult<()> {
        let user = self.get_user(id).await?;
        self.authorize(principal, &user)?;

        self.repository.delete_by_id(id).await?;
        tracing::info!(user_id = %id, "user deleted");

        self.announce_deletion(id).await;
        Ok(())
    }

    /// Apply an answer outcome from the quiz service. Redeliveries of an
    /// already-answered quiz are no-ops.
    pub async fn answer_quiz(
        &self,
        user_id: Uuid,
        quiz_id: &str,
        is_correct: bool,
    ) -> UserResult<()> {
        let mut user = self.get_user(user_id).await?;

        if user.has_answered(quiz_id) {
            tracing::debug!(user_id = %user_id, quiz_id, "answer already recorded, skipping");
            return Ok(());
        }

        if is_correct {
            user.record_correct_answer(quiz_id);
            user.check_level_up();
        } else {
            user.record_incorrect_answer(quiz_id);
        }

        self.repository.save(user).await?;
        Ok(())
    }

    /// Mark or unmark a quiz for a user, subject to the owner-or-admin rule.
    pub async fn toggle_mark(
        &self,
        principal: &Principal,
        user_id: Uuid,
        quiz_id: &str,
        should_mark: bool,
    ) -> UserResult<User> {
        let mut user = self.get_user(user_id).await?;
        self.authorize(principal, &user)?;

        if should_mark {
            user.mark_quiz(quiz_id);
        } else {
            user.unmark_quiz(quiz_id);
        }

        self.repository.save(user).await
    }

    /// Remove a deleted quiz from every user that references it.
    ///
    /// Full scan; only users that actually referenced the quiz are saved
    /// back. A failure mid-scan leaves earlier users updated, and the
    /// redelivered event finishes the rest since removal is idempotent.
    pub async fn cascade_quiz_deletion(&self, quiz_id: &str) -> UserResult<()> {
        let users = self.repository.find_all().await?;
        let mut touched = 0usize;

        for mut user in users {
            if user.remove_quiz_references(quiz_id) {
                self.repository.save(user).await?;
                touched += 1;
            }
        }

        tracing::info!(quiz_id, touched, "quiz references removed");
        Ok(())
    }

    /// Delete the account tied to a revoked federated grant. Unknown grants
    /// are ignored so revocation redeliveries stay idempotent.
    pub async fn revoke_federated_account(
        &self,
        provider: Provider,
        provider_subject: &str,
    ) -> UserResult<()> {
        let Some(user) = self
            .repository
            .find_by_provider(provider, provider_subject)
            .await?
        else {
            tracing::debug!(?provider, provider_subject, "no account for revoked grant");
            return Ok(());
        };

        self.repository.delete_by_id(user.id).await?;
        tracing::info!(user_id = %user.id, ?provider, "federated account deleted after revocation");

        self.announce_deletion(user.id).await;
        Ok(())
    }

    fn authorize(&self, principal: &Principal, target: &User) -> UserResult<()> {
        if principal.can_mutate(target.id) {
            Ok(())
        } else {
            Err(UserError::PermissionDenied)
        }
    }

    async fn announce_deletion(&self, user_id: Uuid) {
        let event = DeleteUserEvent { user_id };
        if let Err(error) = self.publisher.publish_user_deleted(event).await {
            tracing::warn!(user_id = %user_id, %error, "failed to publish user-deleted event");
        }
    }

    fn hash_password(&self, password: &str) -> UserResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| UserError::PasswordHash(e.to_string()))
    }

    fn verify_password(&self, password: &str, hash: &str) -> UserResult<()> {
        let parsed = PasswordHash::new(hash).map_err(|e| UserError::PasswordHash(e.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| UserError::PasswordMismatch)
    }
}
