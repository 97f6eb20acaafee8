//! Snapshot computation: tallies for leaves, element-wise sums for parents.

use crate::catalog::{Unit, UnitState};
use crate::snapshot::StatsSnapshot;
use serde::Deserialize;
use tracing::warn;

/// One failing quality check as recorded on a string.
#[derive(Debug, Deserialize)]
struct CheckResult {
    #[allow(dead_code)]
    check: String,
    #[serde(default)]
    dismissed: bool,
}

/// Number of whitespace-delimited words.
pub fn count_words(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Number of Unicode code points.
pub fn count_chars(text: &str) -> u64 {
    text.chars().count() as u64
}

/// Tally the strings of one translation.
///
/// Every string lands in exactly one of translated, fuzzy or empty. Check
/// entries that cannot be read are skipped; the string is still counted by
/// its state.
pub fn compute_leaf(units: &[Unit]) -> StatsSnapshot {
    let mut stats = StatsSnapshot::default();

    for unit in units {
        let words = count_words(&unit.source);
        let chars = count_chars(&unit.source);

        stats.all += 1;
        stats.all_words += words;
        stats.all_chars += chars;

        if unit.state.is_translated() {
            stats.translated += 1;
            stats.translated_words += words;
            stats.translated_chars += chars;
            match unit.state {
                UnitState::Approved => stats.approved += 1,
                UnitState::ReadOnly => stats.readonly += 1,
                _ => {}
            }
        } else {
            stats.todo += 1;
            stats.todo_words += words;
            stats.todo_chars += chars;
            if unit.state == UnitState::Fuzzy {
                stats.fuzzy += 1;
                stats.fuzzy_words += words;
                stats.fuzzy_chars += chars;
            } else {
                stats.nottranslated += 1;
                stats.nottranslated_words += words;
                stats.nottranslated_chars += chars;
            }
        }

        let (active, dismissed) = tally_checks(unit);
        stats.dismissed_checks += dismissed;
        if active > 0 {
            stats.allchecks += 1;
            stats.allchecks_words += words;
            if unit.state.is_translated() {
                stats.translated_checks += 1;
            }
        }

        stats.suggestions += u64::from(unit.suggestions);
        stats.comments += u64::from(unit.comments);
        stats.last_changed = stats.last_changed.max(unit.changed_at);
    }

    stats
}

/// Count (active, dismissed) check results of a string.
fn tally_checks(unit: &Unit) -> (u64, u64) {
    let mut active = 0;
    let mut dismissed = 0;

    for raw in &unit.checks {
        match CheckResult::deserialize(raw) {
            Ok(check) if check.dismissed => dismissed += 1,
            Ok(_) => active += 1,
            Err(e) => {
                warn!("Skipping unreadable check result on unit {}: {}", unit.id, e);
            }
        }
    }

    (active, dismissed)
}

/// Sum child snapshots into their parent's snapshot.
///
/// The result does not depend on the order of the children.
pub fn compute_parent<'a, I>(children: I) -> StatsSnapshot
where
    I: IntoIterator<Item = &'a StatsSnapshot>,
{
    children
        .into_iter()
        .fold(StatsSnapshot::default(), |mut total, child| {
            total.accumulate(child);
            total
        })
}
