use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

use crate::log_db_operation;
use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        let db = Database { pool };
        db.migrate().await?;
        log_db_operation!(info, "migrate", "database initialized");
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                content_id TEXT NOT NULL,
                surah_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                difficulty REAL NOT NULL DEFAULT 0.0,
                ease_factor REAL NOT NULL DEFAULT 2.5,
                interval_days INTEGER NOT NULL DEFAULT 1,
                repetitions INTEGER NOT NULL DEFAULT 0,
                due_date TEXT NOT NULL,
                last_reviewed TEXT,
                memorization_confidence REAL NOT NULL DEFAULT 0.0,
                created_at TEXT NOT NULL,
                UNIQUE (user_id, content_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS review_records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                card_id TEXT NOT NULL,
                reviewed_at TEXT NOT NULL,
                quality INTEGER NOT NULL,
                response_time REAL NOT NULL,
                accuracy REAL NOT NULL,
                ease_factor REAL NOT NULL,
                interval_days INTEGER NOT NULL,
                was_correct BOOLEAN NOT NULL,
                FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cards_user ON cards (user_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_card ON review_records (card_id, seq)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // Card operations
    pub async fn insert_card(&self, card: &Card) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cards (id, user_id, content_id, surah_id, content, difficulty,
                               ease_factor, interval_days, repetitions, due_date,
                               last_reviewed, memorization_confidence, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(card.id.to_string())
        .bind(&card.user_id)
        .bind(&card.content_id)
        .bind(card.surah_id)
        .bind(&card.content)
        .bind(card.difficulty)
        .bind(card.ease_factor)
        .bind(card.interval_days)
        .bind(card.repetitions)
        .bind(card.due_date.to_rfc3339())
        .bind(card.last_reviewed.map(|d| d.to_rfc3339()))
        .bind(card.memorization_confidence)
        .bind(card.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_card(&self, id: Uuid) -> Result<Option<Card>> {
        let started = Instant::now();
        let row = sqlx::query("SELECT * FROM cards WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let card = match row {
            Some(row) => {
                let mut card = row_to_card(&row)?;
                card.review_history = self.get_review_history(id).await?;
                Some(card)
            }
            None => None,
        };

        log_db_operation!(
            debug,
            "get_card",
            card_id = id,
            duration_ms = started.elapsed().as_millis() as u64
        );
        Ok(card)
    }

    pub async fn get_cards_for_user(&self, user_id: &str) -> Result<Vec<Card>> {
        let started = Instant::now();
        let rows = sqlx::query("SELECT * FROM cards WHERE user_id = ?1 ORDER BY surah_id, content_id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let mut cards = rows.iter().map(row_to_card).collect::<Result<Vec<_>>>()?;

        let record_rows = sqlx::query(
            r#"
            SELECT r.* FROM review_records r
            JOIN cards c ON c.id = r.card_id
            WHERE c.user_id = ?1
            ORDER BY r.seq ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut histories: HashMap<Uuid, Vec<ReviewRecord>> = HashMap::new();
        for row in &record_rows {
            let card_id = Uuid::parse_str(&row.get::<String, _>("card_id"))?;
            histories.entry(card_id).or_default().push(row_to_record(row)?);
        }
        for card in &mut cards {
            if let Some(history) = histories.remove(&card.id) {
                card.review_history = history;
            }
        }

        log_db_operation!(
            debug,
            "get_cards_for_user",
            count = cards.len(),
            duration_ms = started.elapsed().as_millis() as u64
        );
        Ok(cards)
    }

    async fn get_review_history(&self, card_id: Uuid) -> Result<Vec<ReviewRecord>> {
        let rows = sqlx::query("SELECT * FROM review_records WHERE card_id = ?1 ORDER BY seq ASC")
            .bind(card_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_record).collect()
    }

    /// Persist a scheduler update and append its review record atomically.
    pub async fn apply_review(&self, card_id: Uuid, update: &CardUpdate) -> Result<()> {
        let started = Instant::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE cards
            SET ease_factor = ?1, interval_days = ?2, repetitions = ?3, due_date = ?4,
                last_reviewed = ?5, memorization_confidence = ?6
            WHERE id = ?7
            "#,
        )
        .bind(update.ease_factor)
        .bind(update.interval_days)
        .bind(update.repetitions)
        .bind(update.due_date.to_rfc3339())
        .bind(update.last_reviewed.to_rfc3339())
        .bind(update.memorization_confidence)
        .bind(card_id.to_string())
        .execute(&mut *tx)
        .await?;

        let record = &update.review_record;
        sqlx::query(
            r#"
            INSERT INTO review_records (card_id, reviewed_at, quality, response_time, accuracy,
                                        ease_factor, interval_days, was_correct)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(card_id.to_string())
        .bind(record.timestamp.to_rfc3339())
        .bind(record.quality)
        .bind(record.response_time)
        .bind(record.accuracy)
        .bind(record.ease_factor)
        .bind(record.interval_days)
        .bind(record.was_correct)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        log_db_operation!(
            debug,
            "apply_review",
            card_id = card_id,
            duration_ms = started.elapsed().as_millis() as u64
        );
        Ok(())
    }

    /// Overwrite the cached scheduling columns, leaving history untouched.
    pub async fn update_scheduling_state(&self, card_id: Uuid, state: &ReplayedState) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE cards
            SET ease_factor = ?1, interval_days = ?2, repetitions = ?3, due_date = ?4,
                last_reviewed = ?5, memorization_confidence = ?6
            WHERE id = ?7
            "#,
        )
        .bind(state.ease_factor)
        .bind(state.interval_days)
        .bind(state.repetitions)
        .bind(state.due_date.to_rfc3339())
        .bind(state.last_reviewed.to_rfc3339())
        .bind(state.memorization_confidence)
        .bind(card_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_card(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM review_records WHERE card_id = ?1")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM cards WHERE id = ?1")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn row_to_card(row: &SqliteRow) -> Result<Card> {
    Ok(Card {
        id: Uuid::parse_str(&row.get::<String, _>("id"))?,
        user_id: row.get("user_id"),
        content_id: row.get("content_id"),
        surah_id: row.get("surah_id"),
        content: row.get("content"),
        difficulty: row.get("difficulty"),
        ease_factor: row.get("ease_factor"),
        interval_days: row.get("interval_days"),
        repetitions: row.get("repetitions"),
        due_date: parse_timestamp(&row.get::<String, _>("due_date"))?,
        last_reviewed: row
            .get::<Option<String>, _>("last_reviewed")
            .map(|s| parse_timestamp(&s))
            .transpose()?,
        memorization_confidence: row.get("memorization_confidence"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        review_history: Vec::new(),
    })
}

fn row_to_record(row: &SqliteRow) -> Result<ReviewRecord> {
    Ok(ReviewRecord {
        timestamp: parse_timestamp(&row.get::<String, _>("reviewed_at"))?,
        quality: row.get("quality"),
        response_time: row.get("response_time"),
        accuracy: row.get("accuracy"),
        ease_factor: row.get("ease_factor"),
        interval_days: row.get("interval_days"),
        was_correct: row.get("was_correct"),
    })
}
