//! Statistics snapshot: the counters stored for one scope instance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate translation-progress counters of one scope at one point in time.
///
/// Word and character counts are taken from the source text of each string.
/// `todo` counts strings needing work (fuzzy or empty) and `nottranslated`
/// the empty ones only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub all: u64,
    pub all_words: u64,
    pub all_chars: u64,

    pub translated: u64,
    pub translated_words: u64,
    pub translated_chars: u64,

    /// Translated strings that were additionally reviewed
    pub approved: u64,

    /// Translated strings that cannot be edited
    pub readonly: u64,

    pub fuzzy: u64,
    pub fuzzy_words: u64,
    pub fuzzy_chars: u64,

    pub todo: u64,
    pub todo_words: u64,
    pub todo_chars: u64,

    pub nottranslated: u64,
    pub nottranslated_words: u64,
    pub nottranslated_chars: u64,

    /// Strings with at least one active failing check
    pub allchecks: u64,
    pub allchecks_words: u64,

    /// Translated strings with at least one active failing check
    pub translated_checks: u64,

    /// Individual check results that were dismissed
    pub dismissed_checks: u64,

    pub suggestions: u64,
    pub comments: u64,

    /// Latest change of any string below this scope
    pub last_changed: Option<DateTime<Utc>>,
}

impl StatsSnapshot {
    /// Element-wise sum of `other` into `self`; `last_changed` keeps the later value.
    pub fn accumulate(&mut self, other: &StatsSnapshot) {
        self.all += other.all;
        self.all_words += other.all_words;
        self.all_chars += other.all_chars;
        self.translated += other.translated;
        self.translated_words += other.translated_words;
        self.translated_chars += other.translated_chars;
        self.approved += other.approved;
        self.readonly += other.readonly;
        self.fuzzy += other.fuzzy;
        self.fuzzy_words += other.fuzzy_words;
        self.fuzzy_chars += other.fuzzy_chars;
        self.todo += other.todo;
        self.todo_words += other.todo_words;
        self.todo_chars += other.todo_chars;
        self.nottranslated += other.nottranslated;
        self.nottranslated_words += other.nottranslated_words;
        self.nottranslated_chars += other.nottranslated_chars;
        self.allchecks += other.allchecks;
        self.allchecks_words += other.allchecks_words;
        self.translated_checks += other.translated_checks;
        self.dismissed_checks += other.dismissed_checks;
        self.suggestions += other.suggestions;
        self.comments += other.comments;
        self.last_changed = self.last_changed.max(other.last_changed);
    }

    /// Check the counting invariants every snapshot must satisfy.
    pub fn is_consistent(&self) -> bool {
        self.translated + self.todo == self.all
            && self.translated_words + self.todo_words == self.all_words
            && self.translated_chars + self.todo_chars == self.all_chars
            && self.fuzzy + self.nottranslated == self.todo
            && self.nottranslated <= self.todo
            && self.approved + self.readonly <= self.translated
            && self.translated_checks <= self.allchecks
    }

    /// Percentages derived from the counters, as shown on progress bars.
    pub fn percentages(&self) -> StatsPercentages {
        StatsPercentages {
            translated_percent: translation_percent(self.translated, self.all),
            approved_percent: translation_percent(self.approved, self.all),
            fuzzy_percent: translation_percent(self.fuzzy, self.all),
            allchecks_percent: translation_percent(self.allchecks, self.all),
            translated_words_percent: translation_percent(
                self.translated_words,
                self.all_words,
            ),
            translated_chars_percent: translation_percent(
                self.translated_chars,
                self.all_chars,
            ),
        }
    }
}

/// Progress percentages of a snapshot (0-100, one decimal place).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsPercentages {
    pub translated_percent: f64,
    pub approved_percent: f64,
    pub fuzzy_percent: f64,
    pub allchecks_percent: f64,
    pub translated_words_percent: f64,
    pub translated_chars_percent: f64,
}

/// Percentage of `value` in `total`, rounded to one decimal place.
///
/// An empty total counts as complete. The result never rounds a non-zero
/// value down to 0.0 or an incomplete value up to 100.0.
pub fn translation_percent(value: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }

    let percent = (1000.0 * value as f64 / total as f64).round() / 10.0;

    if percent == 0.0 && value != 0 {
        return 0.1;
    }
    if percent == 100.0 && value < total {
        return 99.9;
    }
    percent
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(all: u64, translated: u64, fuzzy: u64) -> StatsSnapshot {
        let nottranslated = all - translated - fuzzy;
        StatsSnapshot {
            all,
            translated,
            fuzzy,
            todo: fuzzy + nottranslated,
            nottranslated,
            ..Default::default()
        }
    }

    // ==================== Accumulate Tests ====================

    #[test]
    fn test_accumulate_sums_counters() {
        let mut total = sample(10, 6, 4);
        total.accumulate(&sample(5, 5, 0));

        assert_eq!(total.all, 15);
        assert_eq!(total.translated, 11);
        assert_eq!(total.todo, 4);
        assert!(total.is_consistent());
    }

    #[test]
    fn test_accumulate_keeps_latest_change() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let mut a = StatsSnapshot {
            last_changed: Some(later),
            ..Default::default()
        };
        a.accumulate(&StatsSnapshot {
            last_changed: Some(earlier),
            ..Default::default()
        });
        assert_eq!(a.last_changed, Some(later));

        let mut b = StatsSnapshot::default();
        b.accumulate(&StatsSnapshot {
            last_changed: Some(earlier),
            ..Default::default()
        });
        assert_eq!(b.last_changed, Some(earlier));
    }

    // ==================== Invariant Tests ====================

    #[test]
    fn test_default_is_consistent() {
        assert!(StatsSnapshot::default().is_consistent());
    }

    #[test]
    fn test_inconsistent_snapshot_detected() {
        let broken = StatsSnapshot {
            all: 3,
            translated: 1,
            todo: 1,
            ..Default::default()
        };
        assert!(!broken.is_consistent());
    }

    // ==================== Percent Tests ====================

    #[test]
    fn test_percent_empty_total_is_complete() {
        assert_eq!(translation_percent(0, 0), 100.0);
    }

    #[test]
    fn test_percent_rounds_to_one_decimal() {
        assert_eq!(translation_percent(1, 3), 33.3);
        assert_eq!(translation_percent(2, 3), 66.7);
        assert_eq!(translation_percent(6, 10), 60.0);
    }

    #[test]
    fn test_percent_never_shows_misleading_zero() {
        assert_eq!(translation_percent(1, 100_000), 0.1);
        assert_eq!(translation_percent(0, 100_000), 0.0);
    }

    #[test]
    fn test_percent_never_shows_misleading_hundred() {
        assert_eq!(translation_percent(99_999, 100_000), 99.9);
        assert_eq!(translation_percent(100_000, 100_000), 100.0);
    }

    #[test]
    fn test_percentages_from_snapshot() {
        let snapshot = sample(10, 6, 4);
        let percents = snapshot.percentages();

        assert_eq!(percents.translated_percent, 60.0);
        assert_eq!(percents.fuzzy_percent, 40.0);
        assert_eq!(percents.approved_percent, 0.0);
        // No words were counted, so word progress is complete
        assert_eq!(percents.translated_words_percent, 100.0);
    }
}
