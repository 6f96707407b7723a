use std::sync::Arc;

use domain_users::{
    ChangePassword, CreateUser, FailingEventPublisher, InMemoryUserRepository, Principal,
    Provider, RecordingEventPublisher, StaticQuizClient, UpdateProfile, User, UserError,
    UserRepository, UserService,
};
use uuid::Uuid;

fn service(
    repo: Arc<InMemoryUserRepository>,
    publisher: Arc<RecordingEventPublisher>,
) -> UserService<InMemoryUserRepository> {
    UserService::new(repo, Arc::new(StaticQuizClient::default()), publisher)
}

fn create_local(username: &str) -> CreateUser {
    CreateUser {
        username: username.to_string(),
        password: Some("correct horse battery".to_string()),
        provider: None,
        provider_subject: None,
        nickname: username.to_string(),
        notifications_enabled: true,
        daily_goal: 5,
    }
}

fn create_federated(username: &str, subject: &str) -> CreateUser {
    CreateUser {
        username: username.to_string(),
        password: None,
        provider: Some(Provider::Google),
        provider_subject: Some(subject.to_string()),
        nickname: username.to_string(),
        notifications_enabled: true,
        daily_goal: 5,
    }
}

#[tokio::test]
async fn test_registration_hashes_password_and_defaults() {
    let repo = Arc::new(InMemoryUserRepository::new());
    let svc = service(repo.clone(), Arc::new(RecordingEventPublisher::new()));

    let user = svc.create_user(create_local("alice")).await.unwrap();

    assert_eq!(user.level, 1);
    assert_eq!(user.answer_rate, 0.0);
    let hash = user.password_hash.as_deref().unwrap();
    assert!(hash.starts_with("$argon2"));
    assert_ne!(hash, "correct horse battery");
}

#[tokio::test]
async fn test_registration_rejects_duplicate_username() {
    let svc = service(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(RecordingEventPublisher::new()),
    );

    svc.create_user(create_local("alice")).await.unwrap();
    let err = svc.create_user(create_local("alice")).await.unwrap_err();
    assert!(matches!(err, UserError::AlreadyExists));
}

#[tokio::test]
async fn test_registration_rejects_duplicate_provider_subject() {
    let svc = service(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(RecordingEventPublisher::new()),
    );

    svc.create_user(create_federated("bob", "google-1"))
        .await
        .unwrap();
    let err = svc
        .create_user(create_federated("bob2", "google-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, UserError::AlreadyExists));
}

#[tokio::test]
async fn test_registration_rejects_mixed_identity() {
    let svc = service(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(RecordingEventPublisher::new()),
    );

    let mut input = create_local("alice");
    input.provider = Some(Provider::Github);
    input.provider_subject = Some("gh-1".to_string());
    let err = svc.create_user(input).await.unwrap_err();
    assert!(matches!(err, UserError::Validation(_)));

    let mut input = create_local("bob");
    input.password = None;
    let err = svc.create_user(input).await.unwrap_err();
    assert!(matches!(err, UserError::Validation(_)));
}

#[tokio::test]
async fn test_update_profile_requires_ownership() {
    let svc = service(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(RecordingEventPublisher::new()),
    );
    let alice = svc.create_user(create_local("alice")).await.unwrap();

    let update = UpdateProfile {
        nickname: "Renamed".to_string(),
        avatar_image: None,
        notifications_enabled: false,
        daily_goal: 3,
    };

    let stranger = Principal::user(Uuid::now_v7());
    let err = svc
        .update_profile(alice.id, &stranger, update.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, UserError::PermissionDenied));

    let updated = svc
        .update_profile(alice.id, &Principal::user(alice.id), update.clone())
        .await
        .unwrap();
    assert_eq!(updated.nickname, "Renamed");

    // Admin may mutate anyone.
    let update = UpdateProfile {
        nickname: "ByAdmin".to_string(),
        avatar_image: None,
        notifications_enabled: true,
        daily_goal: 7,
    };
    let updated = svc
        .update_profile(alice.id, &Principal::admin(Uuid::now_v7()), update)
        .await
        .unwrap();
    assert_eq!(updated.nickname, "ByAdmin");
}

#[tokio::test]
async fn test_missing_user_reported_before_permission() {
    let svc = service(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(RecordingEventPublisher::new()),
    );

    // Even an unauthorized caller learns only that the id does not exist.
    let err = svc
        .update_profile(
            Uuid::now_v7(),
            &Principal::user(Uuid::now_v7()),
            UpdateProfile {
                nickname: "x".to_string(),
                avatar_image: None,
                notifications_enabled: true,
                daily_goal: 1,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, UserError::NotFound));
}

#[tokio::test]
async fn test_change_password_verifies_current() {
    let svc = service(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(RecordingEventPublisher::new()),
    );
    let alice = svc.create_user(create_local("alice")).await.unwrap();
    let me = Principal::user(alice.id);

    let err = svc
        .change_password(
            alice.id,
            &me,
            ChangePassword {
                current_password: "wrong".to_string(),
                new_password: "another secret".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, UserError::PasswordMismatch));

    svc.change_password(
        alice.id,
        &me,
        ChangePassword {
            current_password: "correct horse battery".to_string(),
            new_password: "another secret".to_string(),
        },
    )
    .await
    .unwrap();

    svc.verify_credentials("alice", "another secret").await.unwrap();
    let err = svc
        .verify_credentials("alice", "correct horse battery")
        .await
        .unwrap_err();
    assert!(matches!(err, UserError::PasswordMismatch));
}

#[tokio::test]
async fn test_change_password_on_federated_account() {
    let svc = service(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(RecordingEventPublisher::new()),
    );
    let bob = svc
        .create_user(create_federated("bob", "google-1"))
        .await
        .unwrap();

    let err = svc
        .change_password(
            bob.id,
            &Principal::user(bob.id),
            ChangePassword {
                current_password: "irrelevant".to_string(),
                new_password: "new password".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, UserError::OAuthNoPassword));
}

#[tokio::test]
async fn test_delete_user_publishes_event() {
    let repo = Arc::new(InMemoryUserRepository::new());
    let publisher = Arc::new(RecordingEventPublisher::new());
    let svc = service(repo.clone(), publisher.clone());
    let alice = svc.create_user(create_local("alice")).await.unwrap();

    svc.delete_user(alice.id, &Principal::user(alice.id))
        .await
        .unwrap();

    assert!(repo.find_by_id(alice.id).await.unwrap().is_none());
    let events = publisher.published().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].user_id, alice.id);
}

#[tokio::test]
async fn test_delete_succeeds_even_when_publish_fails() {
    let repo = Arc::new(InMemoryUserRepository::new());
    let svc = UserService::new(
        repo.clone(),
        Arc::new(StaticQuizClient::default()),
        Arc::new(FailingEventPublisher),
    );
    let alice = svc.create_user(create_local("alice")).await.unwrap();

    svc.delete_user(alice.id, &Principal::user(alice.id))
        .await
        .unwrap();
    assert!(repo.find_by_id(alice.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_answer_quiz_updates_progress() {
    let repo = Arc::new(InMemoryUserRepository::new());
    let svc = service(repo.clone(), Arc::new(RecordingEventPublisher::new()));
    let alice = svc.create_user(create_local("alice")).await.unwrap();

    svc.answer_quiz(alice.id, "q1", true).await.unwrap();
    svc.answer_quiz(alice.id, "q2", true).await.unwrap();
    svc.answer_quiz(alice.id, "q3", true).await.unwrap();
    svc.answer_quiz(alice.id, "q4", false).await.unwrap();

    let user = repo.find_by_id(alice.id).await.unwrap().unwrap();
    assert_eq!(user.answer_rate, 75.0);
    assert_eq!(user.level, 1);
}

#[tokio::test]
async fn test_answer_quiz_is_idempotent_on_redelivery() {
    let repo = Arc::new(InMemoryUserRepository::new());
    let svc = service(repo.clone(), Arc::new(RecordingEventPublisher::new()));
    let alice = svc.create_user(create_local("alice")).await.unwrap();

    svc.answer_quiz(alice.id, "q1", true).await.unwrap();
    // Redelivery with a flipped outcome must not move the quiz between sets.
    svc.answer_quiz(alice.id, "q1", false).await.unwrap();

    let user = repo.find_by_id(alice.id).await.unwrap().unwrap();
    assert!(user.correct_quiz_ids.contains("q1"));
    assert!(user.incorrect_quiz_ids.is_empty());
    assert_eq!(user.answer_rate, 100.0);
}

#[tokio::test]
async fn test_answer_quiz_levels_up_at_threshold() {
    let repo = Arc::new(InMemoryUserRepository::new());
    let svc = service(repo.clone(), Arc::new(RecordingEventPublisher::new()));
    let alice = svc.create_user(create_local("alice")).await.unwrap();

    for i in 0..4 {
        svc.answer_quiz(alice.id, &format!("q{i}"), true).await.unwrap();
    }
    assert_eq!(repo.find_by_id(alice.id).await.unwrap().unwrap().level, 1);

    svc.answer_quiz(alice.id, "q4", true).await.unwrap();
    assert_eq!(repo.find_by_id(alice.id).await.unwrap().unwrap().level, 2);

    // Level 2 needs 10 correct answers, so 9 is not enough.
    for i in 5..9 {
        svc.answer_quiz(alice.id, &format!("q{i}"), true).await.unwrap();
    }
    assert_eq!(repo.find_by_id(alice.id).await.unwrap().unwrap().level, 2);
    svc.answer_quiz(alice.id, "q9", true).await.unwrap();
    assert_eq!(repo.find_by_id(alice.id).await.unwrap().unwrap().level, 3);
}

#[tokio::test]
async fn test_answer_quiz_for_unknown_user() {
    let svc = service(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(RecordingEventPublisher::new()),
    );

    let err = svc.answer_quiz(Uuid::now_v7(), "q1", true).await.unwrap_err();
    assert!(matches!(err, UserError::NotFound));
}

#[tokio::test]
async fn test_toggle_mark_requires_ownership() {
    let repo = Arc::new(InMemoryUserRepository::new());
    let svc = service(repo.clone(), Arc::new(RecordingEventPublisher::new()));
    let alice = svc.create_user(create_local("alice")).await.unwrap();

    let err = svc
        .toggle_mark(&Principal::user(Uuid::now_v7()), alice.id, "q1", true)
        .await
        .unwrap_err();
    assert!(matches!(err, UserError::PermissionDenied));

    let me = Principal::user(alice.id);
    let user = svc.toggle_mark(&me, alice.id, "q1", true).await.unwrap();
    assert!(user.marked_quiz_ids.contains("q1"));

    let user = svc.toggle_mark(&me, alice.id, "q1", false).await.unwrap();
    assert!(user.marked_quiz_ids.is_empty());
}

#[tokio::test]
async fn test_cascade_touches_only_referencing_users() {
    let repo = Arc::new(InMemoryUserRepository::new());
    let svc = service(repo.clone(), Arc::new(RecordingEventPublisher::new()));

    let alice = svc.create_user(create_local("alice")).await.unwrap();
    let bob = svc.create_user(create_local("bob")).await.unwrap();

    svc.answer_quiz(alice.id, "doomed", true).await.unwrap();
    svc.toggle_mark(&Principal::user(alice.id), alice.id, "doomed", true)
        .await
        .unwrap();
    svc.answer_quiz(bob.id, "other", false).await.unwrap();

    svc.cascade_quiz_deletion("doomed").await.unwrap();

    let alice_after = repo.find_by_id(alice.id).await.unwrap().unwrap();
    assert!(!alice_after.correct_quiz_ids.contains("doomed"));
    assert!(!alice_after.marked_quiz_ids.contains("doomed"));

    let bob_after = repo.find_by_id(bob.id).await.unwrap().unwrap();
    assert!(bob_after.incorrect_quiz_ids.contains("other"));

    // Redelivery finds nothing left to remove.
    svc.cascade_quiz_deletion("doomed").await.unwrap();
}

#[tokio::test]
async fn test_revoke_federated_account_deletes_and_announces() {
    let repo = Arc::new(InMemoryUserRepository::new());
    let publisher = Arc::new(RecordingEventPublisher::new());
    let svc = service(repo.clone(), publisher.clone());

    let bob = svc
        .create_user(create_federated("bob", "google-1"))
        .await
        .unwrap();

    svc.revoke_federated_account(Provider::Google, "google-1")
        .await
        .unwrap();

    assert!(repo.find_by_id(bob.id).await.unwrap().is_none());
    assert_eq!(publisher.published().await.len(), 1);

    // Redelivery for an already-revoked grant is a no-op.
    svc.revoke_federated_account(Provider::Google, "google-1")
        .await
        .unwrap();
    assert_eq!(publisher.published().await.len(), 1);
}

#[tokio::test]
async fn test_course_ranking_uses_quiz_service_ids() {
    let repo = Arc::new(InMemoryUserRepository::new());
    let svc = UserService::new(
        repo.clone(),
        Arc::new(StaticQuizClient::new(vec![
            "c1".to_string(),
            "c2".to_string(),
        ])),
        Arc::new(RecordingEventPublisher::new()),
    );

    let alice = svc.create_user(create_local("alice")).await.unwrap();
    let bob = svc.create_user(create_local("bob")).await.unwrap();
    svc.answer_quiz(alice.id, "c1", true).await.unwrap();
    svc.answer_quiz(alice.id, "c2", true).await.unwrap();
    svc.answer_quiz(bob.id, "c1", true).await.unwrap();
    svc.answer_quiz(bob.id, "outside", true).await.unwrap();

    let ranking = svc.get_ranking_by_course("course-1", "token").await.unwrap();
    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0].id, alice.id);
    assert_eq!(ranking[1].id, bob.id);
}

#[tokio::test]
async fn test_get_authenticated_user() {
    let svc = service(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(RecordingEventPublisher::new()),
    );
    let alice = svc.create_user(create_local("alice")).await.unwrap();

    let me = svc
        .get_authenticated_user(&Principal::user(alice.id))
        .await
        .unwrap();
    assert_eq!(me.id, alice.id);

    let err = svc
        .get_authenticated_user(&Principal::user(Uuid::now_v7()))
        .await
        .unwrap_err();
    assert!(matches!(err, UserError::NotFound));
}

#[tokio::test]
async fn test_correct_and_incorrect_sets_stay_disjoint_under_events() {
    let repo = Arc::new(InMemoryUserRepository::new());
    let svc = service(repo.clone(), Arc::new(RecordingEventPublisher::new()));
    let alice = svc.create_user(create_local("alice")).await.unwrap();

    for i in 0..20 {
        svc.answer_quiz(alice.id, &format!("q{i}"), i % 2 == 0)
            .await
            .unwrap();
        // Redeliver every event once.
        svc.answer_quiz(alice.id, &format!("q{i}"), i % 2 != 0)
            .await
            .unwrap();
    }

    let user: User = repo.find_by_id(alice.id).await.unwrap().unwrap();
    assert!(user.correct_quiz_ids.is_disjoint(&user.incorrect_quiz_ids));
    assert_eq!(user.correct_quiz_ids.len() + user.incorrect_quiz_ids.len(), 20);
}
