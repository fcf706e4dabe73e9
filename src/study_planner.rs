use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::log_scheduler;
use crate::models::{Card, StudyDay, StudyStats};
use crate::srs_scheduler::SrsScheduler;

/// Earliest due first; among equally due cards the harder one leads.
fn review_order(a: &Card, b: &Card) -> Ordering {
    a.due_date
        .cmp(&b.due_date)
        .then_with(|| b.difficulty.total_cmp(&a.difficulty))
}

impl SrsScheduler {
    /// Cards due at or before `now`, in review order, at most `limit` of them.
    pub fn get_due_cards(&self, cards: &[Card], limit: usize, now: DateTime<Utc>) -> Vec<Card> {
        let mut due: Vec<&Card> = cards.iter().filter(|c| c.due_date <= now).collect();
        due.sort_by(|a, b| review_order(a, b));

        log_scheduler!(planner, "get_due_cards", card_count = due.len(), "due cards selected");

        due.into_iter().take(limit).cloned().collect()
    }

    /// Project the next `days_ahead` days of study, starting with today (UTC).
    ///
    /// Today's bucket also holds everything already overdue. Each day takes review
    /// cards before new ones, up to `daily_target` in total. Nothing is carried over
    /// between days.
    pub fn generate_study_schedule(
        &self,
        cards: &[Card],
        daily_target: usize,
        days_ahead: u32,
        now: DateTime<Utc>,
    ) -> Vec<StudyDay> {
        let today = now.date_naive();

        (0..days_ahead)
            .map(|offset| {
                let date = today + Duration::days(i64::from(offset));
                let mut due_that_day: Vec<&Card> = cards
                    .iter()
                    .filter(|c| {
                        let due = c.due_date.date_naive();
                        if offset == 0 { due <= date } else { due == date }
                    })
                    .collect();
                due_that_day.sort_by(|a, b| review_order(a, b));

                let (new_cards, review_cards): (Vec<&Card>, Vec<&Card>) =
                    due_that_day.into_iter().partition(|c| c.is_new());

                let review_card_ids: Vec<_> =
                    review_cards.iter().take(daily_target).map(|c| c.id).collect();
                let remaining = daily_target - review_card_ids.len();
                let new_card_ids: Vec<_> = new_cards.iter().take(remaining).map(|c| c.id).collect();

                StudyDay {
                    date,
                    review_count: review_card_ids.len(),
                    new_count: new_card_ids.len(),
                    total: review_card_ids.len() + new_card_ids.len(),
                    review_card_ids,
                    new_card_ids,
                }
            })
            .collect()
    }

    pub fn calculate_study_stats(&self, cards: &[Card], now: DateTime<Utc>) -> StudyStats {
        let p = self.params();
        let today = now.date_naive();

        let due_today = cards
            .iter()
            .filter(|c| c.due_date.date_naive() <= today)
            .count();
        let overdue = cards
            .iter()
            .filter(|c| c.due_date.date_naive() < today)
            .count();

        let average_confidence = if cards.is_empty() {
            0.0
        } else {
            cards.iter().map(|c| c.memorization_confidence).sum::<f64>() / cards.len() as f64
        };

        let mastered = cards
            .iter()
            .filter(|c| {
                c.memorization_confidence >= p.mastered_confidence
                    && c.repetitions >= p.mastered_repetitions
            })
            .count();
        let struggling = cards
            .iter()
            .filter(|c| {
                c.memorization_confidence < p.struggling_confidence
                    && c.repetitions >= p.struggling_repetitions
            })
            .count();

        StudyStats {
            total_cards: cards.len(),
            due_today,
            overdue,
            average_confidence,
            mastered,
            struggling,
            streak_days: self.streak_days(cards, today),
        }
    }

    /// Consecutive days ending today on which some card was last reviewed.
    fn streak_days(&self, cards: &[Card], today: NaiveDate) -> u32 {
        let reviewed_on: HashSet<NaiveDate> = cards
            .iter()
            .filter_map(|c| c.last_reviewed)
            .map(|ts| ts.date_naive())
            .collect();

        (0..self.params().streak_lookback_days)
            .take_while(|offset| reviewed_on.contains(&(today - Duration::days(i64::from(*offset)))))
            .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn card_due(offset_hours: i64, difficulty: f64, repetitions: i32) -> Card {
        let mut card = Card::new(
            "user-1".to_string(),
            format!("2:{}", offset_hours),
            2,
            "بِسْمِ اللَّهِ".to_string(),
            difficulty,
            fixed_now(),
        );
        card.due_date = fixed_now() + Duration::hours(offset_hours);
        card.repetitions = repetitions;
        card
    }

    #[test]
    fn test_due_cards_excludes_future_and_orders() {
        let scheduler = SrsScheduler::new();
        let easy_old = card_due(-48, 1.0, 2);
        let hard_old = card_due(-48, 4.0, 2);
        let recent = card_due(-1, 5.0, 1);
        let future = card_due(3, 5.0, 1);
        let cards = vec![recent.clone(), easy_old.clone(), future.clone(), hard_old.clone()];

        let due = scheduler.get_due_cards(&cards, 10, fixed_now());
        let ids: Vec<_> = due.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![hard_old.id, easy_old.id, recent.id]);
        assert!(due.iter().all(|c| c.due_date <= fixed_now()));

        let limited = scheduler.get_due_cards(&cards, 1, fixed_now());
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, hard_old.id);
    }

    #[test]
    fn test_due_card_exactly_now_is_included() {
        let scheduler = SrsScheduler::new();
        let cards = vec![card_due(0, 0.0, 0)];
        assert_eq!(scheduler.get_due_cards(&cards, 5, fixed_now()).len(), 1);
    }

    #[test]
    fn test_schedule_prioritizes_reviews_and_caps_daily_target() {
        let scheduler = SrsScheduler::new();
        let cards = vec![
            card_due(-30, 0.0, 0), // overdue, new
            card_due(-2, 0.0, 3),  // due today, review
            card_due(1, 0.0, 2),   // later today, review
            card_due(2, 0.0, 0),   // later today, new
            card_due(24, 0.0, 4),  // tomorrow
            card_due(72, 0.0, 0),  // outside a 2 day window
        ];

        let schedule = scheduler.generate_study_schedule(&cards, 3, 2, fixed_now());
        assert_eq!(schedule.len(), 2);

        let today = &schedule[0];
        assert_eq!(today.date, fixed_now().date_naive());
        assert_eq!(today.review_count, 2);
        assert_eq!(today.new_count, 1);
        assert_eq!(today.total, 3);
        assert_eq!(today.new_card_ids, vec![cards[0].id]);

        let tomorrow = &schedule[1];
        assert_eq!(tomorrow.review_card_ids, vec![cards[4].id]);
        assert_eq!(tomorrow.new_count, 0);
    }

    #[test]
    fn test_schedule_with_zero_target() {
        let scheduler = SrsScheduler::new();
        let cards = vec![card_due(-1, 0.0, 1)];
        let schedule = scheduler.generate_study_schedule(&cards, 0, 1, fixed_now());
        assert_eq!(schedule[0].total, 0);
    }

    #[test]
    fn test_study_stats() {
        let scheduler = SrsScheduler::new();

        let mut mastered = card_due(48, 0.0, 6);
        mastered.memorization_confidence = 0.95;
        mastered.last_reviewed = Some(fixed_now());

        let mut struggling = card_due(-30, 3.0, 3);
        struggling.memorization_confidence = 0.3;
        struggling.last_reviewed = Some(fixed_now() - Duration::days(1));

        let mut today_card = card_due(-1, 0.0, 1);
        today_card.memorization_confidence = 0.6;
        today_card.last_reviewed = Some(fixed_now() - Duration::days(2));

        let stats = scheduler.calculate_study_stats(
            &[mastered, struggling, today_card],
            fixed_now(),
        );
        assert_eq!(stats.total_cards, 3);
        assert_eq!(stats.due_today, 2);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.mastered, 1);
        assert_eq!(stats.struggling, 1);
        assert!((stats.average_confidence - (0.95 + 0.3 + 0.6) / 3.0).abs() < 1e-9);
        assert_eq!(stats.streak_days, 3);
    }

    #[test]
    fn test_streak_breaks_on_gap_and_caps() {
        let scheduler = SrsScheduler::new();

        let mut gap = card_due(0, 0.0, 1);
        gap.last_reviewed = Some(fixed_now() - Duration::days(2));
        let stats = scheduler.calculate_study_stats(&[gap], fixed_now());
        assert_eq!(stats.streak_days, 0);

        let daily: Vec<Card> = (0..40)
            .map(|day| {
                let mut card = card_due(0, 0.0, 1);
                card.last_reviewed = Some(fixed_now() - Duration::days(day));
                card
            })
            .collect();
        let stats = scheduler.calculate_study_stats(&daily, fixed_now());
        assert_eq!(stats.streak_days, 30);
    }

    #[test]
    fn test_empty_stats() {
        let stats = SrsScheduler::new().calculate_study_stats(&[], fixed_now());
        assert_eq!(stats.total_cards, 0);
        assert_eq!(stats.average_confidence, 0.0);
        assert_eq!(stats.streak_days, 0);
    }
}
