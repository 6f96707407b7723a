use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// User roles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Federated identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provider {
    Google,
    Github,
}

/// The User aggregate root.
///
/// Progress state (level, answer rate, the three quiz-id sets) is mutable
/// only through the methods below; the service layer loads a copy, mutates
/// it and persists it back, so an aggregate instance is never shared across
/// concurrent pipelines.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Unique identifier; immutable once assigned
    pub id: Uuid,
    /// Login key (unique)
    pub username: String,
    /// Argon2 hash; `None` for federated accounts (never exposed in responses)
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Federated identity provider, if the account was created via OAuth
    pub provider: Option<Provider>,
    /// Subject id at the federated provider
    pub provider_subject: Option<String>,
    /// Display name
    pub nickname: String,
    /// Avatar image URL
    pub avatar_image: Option<String>,
    /// Whether push notifications are enabled
    pub notifications_enabled: bool,
    /// Daily quiz goal (positive)
    pub daily_goal: u32,
    /// Current level; starts at 1 and only ever increases
    pub level: u32,
    /// Correct answers as a percentage in [0, 100]; derived from the id sets
    pub answer_rate: f64,
    pub role: Role,
    /// Quiz ids answered correctly; disjoint from `incorrect_quiz_ids`
    pub correct_quiz_ids: HashSet<String>,
    /// Quiz ids answered incorrectly; disjoint from `correct_quiz_ids`
    pub incorrect_quiz_ids: HashSet<String>,
    /// Quiz ids the user marked; independent of correctness
    pub marked_quiz_ids: HashSet<String>,
    /// Creation timestamp; set once, never mutated
    pub created_at: DateTime<Utc>,
}

/// Correct answers needed per level before the next level-up.
const LEVEL_UP_STEP: usize = 5;

impl User {
    /// Create a fresh aggregate for a new registration.
    ///
    /// Exactly one of `password_hash` and the `(provider, provider_subject)`
    /// pair must be present; the service validates this before construction.
    pub fn new(
        username: String,
        nickname: String,
        password_hash: Option<String>,
        provider: Option<Provider>,
        provider_subject: Option<String>,
        notifications_enabled: bool,
        daily_goal: u32,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            username,
            password_hash,
            provider,
            provider_subject,
            nickname,
            avatar_image: None,
            notifications_enabled,
            daily_goal,
            level: 1,
            answer_rate: 0.0,
            role: Role::User,
            correct_quiz_ids: HashSet::new(),
            incorrect_quiz_ids: HashSet::new(),
            marked_quiz_ids: HashSet::new(),
            created_at: Utc::now(),
        }
    }

    /// Whether the account was created through a federated provider and has
    /// no local credential.
    pub fn is_federated(&self) -> bool {
        self.password_hash.is_none()
    }

    /// Whether this quiz was already answered, correctly or not.
    ///
    /// The service uses this as the idempotency guard before recording an
    /// answer; redelivered answer events become no-ops.
    pub fn has_answered(&self, quiz_id: &str) -> bool {
        self.correct_quiz_ids.contains(quiz_id) || self.incorrect_quiz_ids.contains(quiz_id)
    }

    /// Record a correct answer and recompute the answer rate.
    ///
    /// The caller must have checked `has_answered` first; the aggregate does
    /// not re-derive that guard.
    pub fn record_correct_answer(&mut self, quiz_id: &str) {
        self.correct_quiz_ids.insert(quiz_id.to_string());
        self.recompute_answer_rate();
    }

    /// Record an incorrect answer and recompute the answer rate.
    pub fn record_incorrect_answer(&mut self, quiz_id: &str) {
        self.incorrect_quiz_ids.insert(quiz_id.to_string());
        self.recompute_answer_rate();
    }

    /// Advance at most one level if the threshold is reached.
    ///
    /// The threshold is `level * 5` correct answers. Called once per answer
    /// event, so a single call never skips levels.
    pub fn check_level_up(&mut self) {
        if self.correct_quiz_ids.len() >= self.level as usize * LEVEL_UP_STEP {
            self.level += 1;
        }
    }

    /// Idempotent mark of a quiz.
    pub fn mark_quiz(&mut self, quiz_id: &str) {
        self.marked_quiz_ids.insert(quiz_id.to_string());
    }

    /// Idempotent unmark of a quiz.
    pub fn unmark_quiz(&mut self, quiz_id: &str) {
        self.marked_quiz_ids.remove(quiz_id);
    }

    /// Replace the four mutable display fields; progress fields untouched.
    pub fn update_profile(
        &mut self,
        nickname: String,
        avatar_image: Option<String>,
        notifications_enabled: bool,
        daily_goal: u32,
    ) {
        self.nickname = nickname;
        self.avatar_image = avatar_image;
        self.notifications_enabled = notifications_enabled;
        self.daily_goal = daily_goal;
    }

    /// Replace the password hash unconditionally; the service verifies the
    /// old credential first.
    pub fn update_credential(&mut self, password_hash: String) {
        self.password_hash = Some(password_hash);
    }

    /// Drop every reference to a deleted quiz from all three id sets.
    ///
    /// Neither level nor answer rate is recomputed: historical progress is
    /// not revised when a quiz is deleted. Returns whether anything changed,
    /// so the cascade only persists users that actually referenced the quiz.
    pub fn remove_quiz_references(&mut self, quiz_id: &str) -> bool {
        let removed_correct = self.correct_quiz_ids.remove(quiz_id);
        let removed_incorrect = self.incorrect_quiz_ids.remove(quiz_id);
        let removed_marked = self.marked_quiz_ids.remove(quiz_id);
        removed_correct || removed_incorrect || removed_marked
    }

    fn recompute_answer_rate(&mut self) {
        let correct = self.correct_quiz_ids.len();
        let total = correct + self.incorrect_quiz_ids.len();
        // With no answers recorded the rate is a defined 0.0, never NaN.
        self.answer_rate = if total == 0 {
            0.0
        } else {
            100.0 * correct as f64 / total as f64
        };
    }
}

/// User response DTO (without credential material)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub nickname: String,
    pub avatar_image: Option<String>,
    pub level: u32,
    pub role: Role,
    pub notifications_enabled: bool,
    pub daily_goal: u32,
    pub answer_rate: f64,
    pub provider: Option<Provider>,
    pub created_at: DateTime<Utc>,
    pub correct_quiz_ids: HashSet<String>,
    pub incorrect_quiz_ids: HashSet<String>,
    pub marked_quiz_ids: HashSet<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            nickname: user.nickname,
            avatar_image: user.avatar_image,
            level: user.level,
            role: user.role,
            notifications_enabled: user.notifications_enabled,
            daily_goal: user.daily_goal,
            answer_rate: user.answer_rate,
            provider: user.provider,
            created_at: user.created_at,
            correct_quiz_ids: user.correct_quiz_ids,
            incorrect_quiz_ids: user.incorrect_quiz_ids,
            marked_quiz_ids: user.marked_quiz_ids,
        }
    }
}

/// DTO for registration, local or federated
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    /// Plain-text password for local accounts; absent for federated ones
    pub password: Option<String>,
    pub provider: Option<Provider>,
    pub provider_subject: Option<String>,
    #[validate(length(min = 1, max = 30))]
    pub nickname: String,
    #[serde(default = "default_notifications")]
    pub notifications_enabled: bool,
    #[validate(range(min = 1))]
    #[serde(default = "default_daily_goal")]
    pub daily_goal: u32,
}

fn default_notifications() -> bool {
    true
}

fn default_daily_goal() -> u32 {
    5
}

/// DTO for updating the mutable display fields
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProfile {
    #[validate(length(min = 1, max = 30))]
    pub nickname: String,
    pub avatar_image: Option<String>,
    pub notifications_enabled: bool,
    #[validate(range(min = 1))]
    pub daily_goal: u32,
}

/// DTO for changing a local password
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePassword {
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// DTO for verifying a password out-of-band (login-adjacent flow)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MatchPassword {
    pub password: String,
}
