use chrono::{DateTime, Duration, TimeZone, Utc};
use hifz_srs::{
    CardService, CardValidationError, CreateCardRequest, Database, ReviewResult, SchedulerError,
    SchedulerParams, SrsScheduler,
};
use uuid::Uuid;

fn start_of_term() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 7, 7, 0, 0).unwrap()
}

async fn create_service() -> CardService {
    let db = Database::new("sqlite::memory:").await.unwrap();
    CardService::new(db)
}

fn ayah(user_id: &str, content_id: &str, surah_id: i32, content: &str) -> CreateCardRequest {
    CreateCardRequest {
        user_id: user_id.to_string(),
        content_id: content_id.to_string(),
        surah_id,
        content: content.to_string(),
        difficulty: None,
    }
}

fn good(accuracy: f64) -> ReviewResult {
    ReviewResult {
        quality: 4,
        response_time: 6.0,
        accuracy,
        was_correct: true,
    }
}

#[tokio::test]
async fn test_card_creation_defaults() {
    let service = create_service().await;

    let card = service
        .create_card_at(ayah("student-1", "1:1", 1, "بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ"), start_of_term())
        .await
        .unwrap();

    assert_eq!(card.ease_factor, 2.5);
    assert_eq!(card.interval_days, 1);
    assert_eq!(card.repetitions, 0);
    assert_eq!(card.due_date, start_of_term());
    assert_eq!(card.last_reviewed, None);
    assert!(card.review_history.is_empty());

    let retrieved = service.get_card(card.id).await.unwrap().unwrap();
    assert_eq!(retrieved.content, card.content);
}

#[tokio::test]
async fn test_card_is_unique_per_user_and_content() {
    let service = create_service().await;
    service.create_card(ayah("student-1", "1:2", 1, "text")).await.unwrap();

    let err = service
        .create_card(ayah("student-1", "1:2", 1, "text"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("already exists"));

    service.create_card(ayah("student-2", "1:2", 1, "text")).await.unwrap();
}

#[tokio::test]
async fn test_invalid_difficulty_is_rejected() {
    let service = create_service().await;
    let mut request = ayah("student-1", "1:3", 1, "text");
    request.difficulty = Some(7.0);

    let err = service.create_card(request).await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<CardValidationError>(),
        Some(&CardValidationError::InvalidDifficulty(7.0))
    );
}

#[tokio::test]
async fn test_surah_outside_mushaf_is_rejected() {
    let service = create_service().await;

    for surah_id in [0, -7, 115] {
        let err = service
            .create_card(ayah("student-1", "0:1", surah_id, "text"))
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<CardValidationError>(),
            Some(&CardValidationError::InvalidSurah(surah_id))
        );
    }
    assert!(service.get_cards_for_user("student-1").await.unwrap().is_empty());

    service.create_card(ayah("student-1", "114:6", 114, "text")).await.unwrap();
}

#[tokio::test]
async fn test_review_progression_persists() {
    let service = create_service().await;
    let card = service
        .create_card_at(ayah("student-1", "112:1", 112, &"ق".repeat(60)), start_of_term())
        .await
        .unwrap();

    let mut now = start_of_term();
    let mut intervals = Vec::new();
    for _ in 0..3 {
        let updated = service
            .review_card_at(card.id, good(90.0), now)
            .await
            .unwrap()
            .unwrap();
        intervals.push(updated.interval_days);
        now = updated.due_date;
    }
    assert_eq!(intervals, vec![1, 6, 15]);

    let stored = service.get_card(card.id).await.unwrap().unwrap();
    assert_eq!(stored.repetitions, 3);
    assert_eq!(stored.review_history.len(), 3);
    assert_eq!(stored.interval_days, 15);

    let failed = service
        .review_card_at(
            card.id,
            ReviewResult {
                quality: 1,
                response_time: 20.0,
                accuracy: 30.0,
                was_correct: false,
            },
            now,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.repetitions, 0);
    assert_eq!(failed.interval_days, 1);
    assert_eq!(failed.review_history.len(), 4);
}

#[tokio::test]
async fn test_review_of_missing_card_returns_none() {
    let service = create_service().await;
    let result = service.review_card(Uuid::new_v4(), good(90.0)).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_invalid_review_result_is_rejected_without_side_effects() {
    let service = create_service().await;
    let card = service.create_card(ayah("student-1", "2:1", 2, "الم")).await.unwrap();

    let err = service
        .review_card(
            card.id,
            ReviewResult {
                quality: 9,
                response_time: 3.0,
                accuracy: 90.0,
                was_correct: true,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<SchedulerError>(),
        Some(&SchedulerError::InvalidQuality(9))
    );

    let stored = service.get_card(card.id).await.unwrap().unwrap();
    assert!(stored.review_history.is_empty());
}

#[tokio::test]
async fn test_rebuild_restores_cached_state_from_history() {
    let service = create_service().await;
    let card = service
        .create_card_at(ayah("student-1", "2:255", 2, &"ا".repeat(250)), start_of_term())
        .await
        .unwrap();

    let mut now = start_of_term();
    let mut last = None;
    for accuracy in [95.0, 85.0, 75.0, 90.0] {
        let updated = service
            .review_card_at(card.id, good(accuracy), now)
            .await
            .unwrap()
            .unwrap();
        now = updated.due_date;
        last = Some(updated);
    }
    let last = last.unwrap();

    let rebuilt = service.rebuild_card_state(card.id).await.unwrap().unwrap();
    assert_eq!(rebuilt.ease_factor, last.ease_factor);
    assert_eq!(rebuilt.interval_days, last.interval_days);
    assert_eq!(rebuilt.repetitions, last.repetitions);
    assert_eq!(rebuilt.due_date, last.due_date);
    assert!((rebuilt.memorization_confidence - last.memorization_confidence).abs() < 1e-12);
}

#[tokio::test]
async fn test_due_cards_and_surah_filter() {
    let service = create_service().await;
    let earlier = start_of_term() - Duration::days(2);

    service.create_card_at(ayah("student-1", "1:1", 1, "a"), earlier).await.unwrap();
    service.create_card_at(ayah("student-1", "114:1", 114, "b"), earlier).await.unwrap();
    service.create_card_at(ayah("student-1", "114:2", 114, "c"), start_of_term() + Duration::days(1)).await.unwrap();
    service.create_card_at(ayah("student-2", "1:1", 1, "a"), earlier).await.unwrap();

    let due = service.get_due_cards("student-1", 10, None, start_of_term()).await.unwrap();
    assert_eq!(due.len(), 2);
    assert!(due.iter().all(|c| c.user_id == "student-1"));

    let due = service.get_due_cards("student-1", 10, Some(114), start_of_term()).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].content_id, "114:1");
}

#[tokio::test]
async fn test_schedule_and_stats_for_user() {
    let service = create_service().await;
    for verse in 1..=5 {
        service
            .create_card_at(ayah("student-1", &format!("103:{}", verse), 103, "وَالْعَصْرِ"), start_of_term())
            .await
            .unwrap();
    }
    let cards = service.get_cards_for_user("student-1").await.unwrap();
    service.review_card_at(cards[0].id, good(100.0), start_of_term()).await.unwrap();

    let schedule = service
        .get_study_schedule("student-1", 3, 2, start_of_term())
        .await
        .unwrap();
    assert_eq!(schedule.len(), 2);
    assert_eq!(schedule[0].new_count, 3);
    assert_eq!(schedule[0].review_count, 0);
    assert_eq!(schedule[1].review_count, 1);

    let stats = service.get_study_stats("student-1", start_of_term()).await.unwrap();
    assert_eq!(stats.total_cards, 5);
    assert_eq!(stats.due_today, 4);
    assert_eq!(stats.overdue, 0);
    assert_eq!(stats.streak_days, 1);
}

#[tokio::test]
async fn test_configured_initial_ease_applies_to_new_cards() {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let scheduler = SrsScheduler::with_params(SchedulerParams {
        initial_ease: 2.3,
        ..SchedulerParams::default()
    });
    let service = CardService::with_scheduler(db, scheduler);

    let card = service.create_card(ayah("student-1", "97:1", 97, "text")).await.unwrap();
    assert_eq!(card.ease_factor, 2.3);
}

#[tokio::test]
async fn test_delete_card() {
    let service = create_service().await;
    let card = service.create_card(ayah("student-1", "108:1", 108, "text")).await.unwrap();
    service.review_card(card.id, good(90.0)).await.unwrap();

    assert!(service.delete_card(card.id).await.unwrap());
    assert!(service.get_card(card.id).await.unwrap().is_none());
    assert!(!service.delete_card(card.id).await.unwrap());
}

#[tokio::test]
async fn test_long_run_of_perfect_reviews_stays_loadable() {
    let service = create_service().await;
    let card = service
        .create_card_at(ayah("student-1", "112:4", 112, "short"), start_of_term())
        .await
        .unwrap();
    service.create_card_at(ayah("student-1", "112:1", 112, "text"), start_of_term()).await.unwrap();

    let perfect = ReviewResult {
        quality: 5,
        response_time: 3.0,
        accuracy: 100.0,
        was_correct: true,
    };
    for _ in 0..40 {
        service
            .review_card_at(card.id, perfect, start_of_term())
            .await
            .unwrap()
            .unwrap();
    }

    let stored = service.get_card(card.id).await.unwrap().unwrap();
    assert_eq!(stored.review_history.len(), 40);
    assert_eq!(stored.interval_days, 36_500);
    assert_eq!(stored.due_date, start_of_term() + Duration::days(36_500));

    assert_eq!(service.get_cards_for_user("student-1").await.unwrap().len(), 2);
    let stats = service.get_study_stats("student-1", start_of_term()).await.unwrap();
    assert_eq!(stats.total_cards, 2);
}
