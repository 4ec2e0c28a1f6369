//! Spaced Repetition Scheduler
//!
//! Pure, deterministic SM-2-family scheduling over [`SrsEntry`] state:
//! consistent recall grows intervals geometrically through the ease factor,
//! a lapse (quality below 3) resets the cycle to one day, and the ease
//! factor drifts slowly with recent quality instead of overreacting to a
//! single answer.
//!
//! Quality scores run 0..=5 as in the classic SuperMemo scale: 0-2 are
//! failures of recall, 3-5 are increasingly comfortable successes.
//!
//! References:
//! - Wozniak, P. A. (1990). Optimization of learning. (SM-2)

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::profile::SrsEntry;
use crate::types::{INITIAL_EASE_FACTOR, MASTERY_INTERVAL_CAP, MIN_EASE_FACTOR};

/// Maximum meaningful quality score.
pub const MAX_QUALITY: u8 = 5;

/// Quality at or above this counts as successful recall.
pub const PASSING_QUALITY: u8 = 3;

/// An item whose review is due, with how far overdue it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueItem {
    pub item_id: String,
    /// Whole days past the scheduled review date (0 = due today).
    pub days_due: i64,
}

/// Creates the entry for an item's first review.
///
/// A low-quality first pass schedules the item for tomorrow; a high-quality
/// first pass earns a short starter interval equal to the quality score.
pub fn initialize(quality: u8, now: DateTime<Utc>) -> SrsEntry {
    let quality = quality.min(MAX_QUALITY);
    let interval = if quality < PASSING_QUALITY {
        1
    } else {
        quality as u32
    };
    SrsEntry {
        ease_factor: INITIAL_EASE_FACTOR,
        interval,
        review_count: 1,
        next_review_date: now + Duration::days(interval as i64),
    }
}

/// Applies one review outcome to an entry.
///
/// Quality below 3 is a lapse: the interval resets to one day and the ease
/// factor takes a penalty (clamped at the floor). Otherwise the interval
/// grows by the ease factor and the ease factor drifts by the SM-2 delta.
pub fn review(entry: &SrsEntry, quality: u8, now: DateTime<Utc>) -> SrsEntry {
    let quality = quality.min(MAX_QUALITY);

    let (interval, ease_factor) = if quality < PASSING_QUALITY {
        let penalized = entry.ease_factor - 0.2;
        (1, penalized.max(MIN_EASE_FACTOR))
    } else {
        let grown = (entry.interval as f64 * entry.ease_factor).round() as u32;
        let q = (MAX_QUALITY - quality) as f64;
        let drifted = entry.ease_factor + (0.1 - q * (0.08 + q * 0.02));
        (grown.max(entry.interval).max(1), drifted.max(MIN_EASE_FACTOR))
    };

    SrsEntry {
        ease_factor,
        interval,
        review_count: entry.review_count.saturating_add(1),
        next_review_date: now + Duration::days(interval as i64),
    }
}

/// Items from `items_in_category` whose review date has arrived, most
/// overdue first.
pub fn due_items(
    srs_data: &HashMap<String, SrsEntry>,
    items_in_category: &[String],
    now: DateTime<Utc>,
) -> Vec<DueItem> {
    let mut due: Vec<DueItem> = items_in_category
        .iter()
        .filter_map(|item_id| {
            let entry = srs_data.get(item_id)?;
            if now >= entry.next_review_date {
                Some(DueItem {
                    item_id: item_id.clone(),
                    days_due: (now - entry.next_review_date).num_days(),
                })
            } else {
                None
            }
        })
        .collect();
    due.sort_by(|a, b| b.days_due.cmp(&a.days_due).then(a.item_id.cmp(&b.item_id)));
    due
}

/// Normalized retention score for an item, in [0, 1].
///
/// Zero only when the item has never been reviewed. Otherwise a blend of
/// two saturating curves, each strictly increasing while the other is held
/// fixed: ease normalized from the 1.3 floor, and interval saturating
/// toward the 30-day cap.
pub fn mastery(item_id: &str, srs_data: &HashMap<String, SrsEntry>) -> f64 {
    let Some(entry) = srs_data.get(item_id) else {
        return 0.0;
    };

    let ease_above_floor = (entry.ease_factor - MIN_EASE_FACTOR).max(0.0);
    let ease_component =
        ease_above_floor / (ease_above_floor + (INITIAL_EASE_FACTOR - MIN_EASE_FACTOR));
    let interval_component = entry.interval as f64 / (entry.interval as f64 + MASTERY_INTERVAL_CAP);

    0.1 + 0.9 * (0.5 * ease_component + 0.5 * interval_component)
}

// ==================== Tests ====================
