use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::time::Instant;
use uuid::Uuid;

use crate::database::Database;
use crate::errors::CardValidationError;
use crate::models::*;
use crate::srs_scheduler::SrsScheduler;
use crate::{log_service_error, log_service_start, log_service_success, log_validation};

const SERVICE: &str = "card_service";
const SURAH_ID_MIN: i32 = 1;
const SURAH_ID_MAX: i32 = 114;

/// Drives review sessions: loads cards, runs the scheduler, persists its output.
#[derive(Clone)]
pub struct CardService {
    db: Database,
    scheduler: SrsScheduler,
}

impl CardService {
    pub fn new(db: Database) -> Self {
        Self::with_scheduler(db, SrsScheduler::new())
    }

    pub fn with_scheduler(db: Database, scheduler: SrsScheduler) -> Self {
        Self { db, scheduler }
    }

    pub fn scheduler(&self) -> &SrsScheduler {
        &self.scheduler
    }

    // Card lifecycle
    pub async fn create_card(&self, request: CreateCardRequest) -> Result<Card> {
        self.create_card_at(request, Utc::now()).await
    }

    pub async fn create_card_at(&self, request: CreateCardRequest, now: DateTime<Utc>) -> Result<Card> {
        let difficulty = request.difficulty.unwrap_or(0.0);
        if let Err(rejection) = validate_request(&request, difficulty) {
            log_validation!(failure, "create_card", error = &rejection);
            return Err(rejection.into());
        }

        let mut card = Card::new(
            request.user_id,
            request.content_id,
            request.surah_id,
            request.content,
            difficulty,
            now,
        );
        card.ease_factor = self.scheduler.params().initial_ease;

        self.db.insert_card(&card).await.map_err(|e| {
            if e.to_string().to_lowercase().contains("unique constraint") {
                anyhow!(
                    "Card for content '{}' already exists for user '{}'",
                    card.content_id,
                    card.user_id
                )
            } else {
                e
            }
        })?;

        log_service_success!(SERVICE, "create_card", "card created successfully");
        Ok(card)
    }

    pub async fn get_card(&self, id: Uuid) -> Result<Option<Card>> {
        self.db.get_card(id).await
    }

    pub async fn get_cards_for_user(&self, user_id: &str) -> Result<Vec<Card>> {
        self.db.get_cards_for_user(user_id).await
    }

    pub async fn delete_card(&self, id: Uuid) -> Result<bool> {
        self.db.delete_card(id).await
    }

    // Review operations
    pub async fn review_card(&self, card_id: Uuid, result: ReviewResult) -> Result<Option<Card>> {
        self.review_card_at(card_id, result, Utc::now()).await
    }

    pub async fn review_card_at(
        &self,
        card_id: Uuid,
        result: ReviewResult,
        now: DateTime<Utc>,
    ) -> Result<Option<Card>> {
        log_service_start!(SERVICE, "review_card", card_id = card_id);
        let started = Instant::now();

        let mut card = match self.db.get_card(card_id).await? {
            Some(card) => card,
            None => return Ok(None),
        };

        let update = match self.scheduler.review(&card, &result, now) {
            Ok(update) => update,
            Err(rejection) => {
                log_validation!(failure, "review_result", error = &rejection);
                return Err(rejection.into());
            }
        };

        if let Err(e) = self.db.apply_review(card_id, &update).await {
            log_service_error!(SERVICE, "review_card", card_id = card_id, error = &e);
            return Err(e);
        }
        update.apply_to(&mut card);

        log_service_success!(
            SERVICE,
            "review_card",
            card_id = card_id,
            duration_ms = started.elapsed().as_millis() as u64
        );
        Ok(Some(card))
    }

    /// Recompute the cached scheduling columns of a card from its review history.
    pub async fn rebuild_card_state(&self, card_id: Uuid) -> Result<Option<Card>> {
        let mut card = match self.db.get_card(card_id).await? {
            Some(card) => card,
            None => return Ok(None),
        };

        if let Some(state) = self.scheduler.replay_history(&card) {
            self.db.update_scheduling_state(card_id, &state).await?;
            card.ease_factor = state.ease_factor;
            card.interval_days = state.interval_days;
            card.repetitions = state.repetitions;
            card.due_date = state.due_date;
            card.last_reviewed = Some(state.last_reviewed);
            card.memorization_confidence = state.memorization_confidence;
        }

        Ok(Some(card))
    }

    // Planning
    pub async fn get_due_cards(
        &self,
        user_id: &str,
        limit: usize,
        surah_id: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Card>> {
        log_service_start!(SERVICE, "get_due_cards", user_id = user_id);
        let mut cards = self.db.get_cards_for_user(user_id).await?;
        if let Some(surah_id) = surah_id {
            cards.retain(|c| c.surah_id == surah_id);
        }
        Ok(self.scheduler.get_due_cards(&cards, limit, now))
    }

    pub async fn get_study_schedule(
        &self,
        user_id: &str,
        daily_target: usize,
        days_ahead: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<StudyDay>> {
        log_service_start!(SERVICE, "get_study_schedule", user_id = user_id);
        let cards = self.db.get_cards_for_user(user_id).await?;
        Ok(self
            .scheduler
            .generate_study_schedule(&cards, daily_target, days_ahead, now))
    }

    pub async fn get_study_stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<StudyStats> {
        log_service_start!(SERVICE, "get_study_stats", user_id = user_id);
        let cards = self.db.get_cards_for_user(user_id).await?;
        Ok(self.scheduler.calculate_study_stats(&cards, now))
    }
}

fn validate_request(request: &CreateCardRequest, difficulty: f64) -> Result<(), CardValidationError> {
    if request.user_id.trim().is_empty() {
        return Err(CardValidationError::EmptyField("user_id"));
    }
    if request.content_id.trim().is_empty() {
        return Err(CardValidationError::EmptyField("content_id"));
    }
    if !(SURAH_ID_MIN..=SURAH_ID_MAX).contains(&request.surah_id) {
        return Err(CardValidationError::InvalidSurah(request.surah_id));
    }
    if !(0.0..=5.0).contains(&difficulty) {
        return Err(CardValidationError::InvalidDifficulty(difficulty));
    }
    Ok(())
}
