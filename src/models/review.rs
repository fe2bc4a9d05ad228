//! Spaced-repetition helpers over a word's review schedule.

use chrono::{NaiveDate, NaiveDateTime};

use super::word::{WordEntry, TIMESTAMP_FORMAT};

const MAX_MEMORY_STRENGTH: i64 = 100;

impl WordEntry {
    /// True if the entry is active and scheduled for review on `date`.
    pub fn is_due(&self, date: NaiveDate) -> bool {
        self.is_active() && self.spaced_repetition_dates.contains(&date)
    }

    /// Records the outcome of reviewing this entry at `now`.
    ///
    /// The review date is removed from the schedule, the matching counter is
    /// incremented and memory strength moves by one. The caller persists the
    /// result through the sync engine.
    pub fn apply_review(&mut self, correct: bool, now: NaiveDateTime) {
        let today = now.date();
        self.spaced_repetition_dates.retain(|d| *d != today);

        if correct {
            self.correct_reviews = self.correct_reviews.saturating_add(1);
            self.memory_strength = (self.memory_strength + 1).min(MAX_MEMORY_STRENGTH);
        } else {
            self.wrong_reviews = self.wrong_reviews.saturating_add(1);
            self.memory_strength = (self.memory_strength - 1).max(0);
        }

        self.last_reviewed = now.format(TIMESTAMP_FORMAT).to_string();
    }
}

/// Entries due on `today`, hardest first: most wrong reviews, then fewest
/// correct reviews.
pub fn due_words(words: &[WordEntry], today: NaiveDate) -> Vec<WordEntry> {
    let mut due: Vec<WordEntry> = words.iter().filter(|w| w.is_due(today)).cloned().collect();
    due.sort_by(|a, b| {
        b.wrong_reviews
            .cmp(&a.wrong_reviews)
            .then(a.correct_reviews.cmp(&b.correct_reviews))
    });
    due
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_is_due() {
        let entry = WordEntry::new("apple").with_review_dates(vec![date(2025, 1, 1)]);

        assert!(entry.is_due(date(2025, 1, 1)));
        assert!(!entry.is_due(date(2025, 1, 2)));
    }

    #[test]
    fn test_deleted_entry_is_never_due() {
        let mut entry = WordEntry::new("apple").with_review_dates(vec![date(2025, 1, 1)]);
        entry.is_deleted = true;

        assert!(!entry.is_due(date(2025, 1, 1)));
    }

    #[test]
    fn test_apply_correct_review() {
        let mut entry = WordEntry::new("apple")
            .with_review_dates(vec![date(2025, 1, 1), date(2025, 1, 8)]);
        entry.memory_strength = 100;
        let now = date(2025, 1, 1).and_hms_opt(9, 0, 0).unwrap();

        entry.apply_review(true, now);

        assert_eq!(entry.correct_reviews, 1);
        assert_eq!(entry.wrong_reviews, 0);
        assert_eq!(entry.memory_strength, 100);
        assert_eq!(entry.spaced_repetition_dates, vec![date(2025, 1, 8)]);
        assert_eq!(entry.last_reviewed, "2025-01-01 09:00:00");
    }

    #[test]
    fn test_apply_wrong_review_floors_strength() {
        let mut entry = WordEntry::new("apple").with_review_dates(vec![date(2025, 1, 1)]);
        let now = date(2025, 1, 1).and_hms_opt(9, 0, 0).unwrap();

        entry.apply_review(false, now);

        assert_eq!(entry.wrong_reviews, 1);
        assert_eq!(entry.memory_strength, 0);
        assert!(entry.spaced_repetition_dates.is_empty());
    }

    #[test]
    fn test_due_words_sorted_hardest_first() {
        let today = date(2025, 1, 1);
        let mut easy = WordEntry::new("easy").with_review_dates(vec![today]);
        easy.correct_reviews = 5;
        let mut hard = WordEntry::new("hard").with_review_dates(vec![today]);
        hard.wrong_reviews = 3;
        let mut medium = WordEntry::new("medium").with_review_dates(vec![today]);
        medium.correct_reviews = 1;
        let later = WordEntry::new("later").with_review_dates(vec![date(2025, 2, 1)]);

        let due = due_words(&[easy, later, medium, hard], today);
        let names: Vec<&str> = due.iter().map(|w| w.word.as_str()).collect();

        assert_eq!(names, vec!["hard", "medium", "easy"]);
    }
}
