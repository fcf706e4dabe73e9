use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
pub const MINIMUM_EASE_FACTOR: f64 = 1.3;

/// One schedulable unit of memorization content, usually a single ayah.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub user_id: String,
    pub content_id: String, // Ayah key, e.g. "2:255"
    pub surah_id: i32,
    pub content: String,
    pub difficulty: f64, // 0-5, set manually
    pub ease_factor: f64,
    pub interval_days: i64,
    pub repetitions: i32,
    pub due_date: DateTime<Utc>,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub memorization_confidence: f64, // 0-1
    pub created_at: DateTime<Utc>,
    pub review_history: Vec<ReviewRecord>, // Oldest first
}

impl Card {
    /// A fresh card for a (user, content) pair, due immediately.
    pub fn new(
        user_id: String,
        content_id: String,
        surah_id: i32,
        content: String,
        difficulty: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            content_id,
            surah_id,
            content,
            difficulty,
            ease_factor: DEFAULT_EASE_FACTOR,
            interval_days: 1,
            repetitions: 0,
            due_date: now,
            last_reviewed: None,
            memorization_confidence: 0.0,
            created_at: now,
            review_history: Vec::new(),
        }
    }

    pub fn content_length(&self) -> usize {
        self.content.chars().count()
    }

    pub fn is_new(&self) -> bool {
        self.repetitions == 0
    }
}

/// Immutable log entry written on every review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub timestamp: DateTime<Utc>,
    pub quality: i32,
    pub response_time: f64, // seconds
    pub accuracy: f64,      // 0-100
    pub ease_factor: f64,
    pub interval_days: i64,
    pub was_correct: bool,
}

/// Outcome of a single recitation attempt as reported by the session driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub quality: i32, // 0-5
    pub response_time: f64,
    pub accuracy: f64,
    pub was_correct: bool,
}

/// Partial card update produced by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardUpdate {
    pub ease_factor: f64,
    pub interval_days: i64,
    pub repetitions: i32,
    pub due_date: DateTime<Utc>,
    pub last_reviewed: DateTime<Utc>,
    pub memorization_confidence: f64,
    pub review_record: ReviewRecord,
}

impl CardUpdate {
    pub fn apply_to(self, card: &mut Card) {
        card.ease_factor = self.ease_factor;
        card.interval_days = self.interval_days;
        card.repetitions = self.repetitions;
        card.due_date = self.due_date;
        card.last_reviewed = Some(self.last_reviewed);
        card.memorization_confidence = self.memorization_confidence;
        card.review_history.push(self.review_record);
    }
}

/// Scheduling state rebuilt purely from a card's review history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayedState {
    pub ease_factor: f64,
    pub interval_days: i64,
    pub repetitions: i32,
    pub due_date: DateTime<Utc>,
    pub last_reviewed: DateTime<Utc>,
    pub memorization_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyDay {
    pub date: NaiveDate,
    pub review_card_ids: Vec<Uuid>,
    pub new_card_ids: Vec<Uuid>,
    pub review_count: usize,
    pub new_count: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyStats {
    pub total_cards: usize,
    pub due_today: usize,
    pub overdue: usize,
    pub average_confidence: f64,
    pub mastered: usize,
    pub struggling: usize,
    pub streak_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCardRequest {
    pub user_id: String,
    pub content_id: String,
    pub surah_id: i32,
    pub content: String,
    pub difficulty: Option<f64>,
}
