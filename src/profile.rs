//! Learner Profile Data Model
//!
//! The root aggregate persisted per device/install: the skill ledger,
//! per-item spaced-repetition state, activity history, unlocked
//! achievements, and settings. The profile store in [`crate::store`] is the
//! only writer; everything here is structure plus the small invariant-
//! preserving mutators it calls.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Difficulty, SkillCategory};

/// Schema version written into every persisted profile.
///
/// Loading accepts any profile with the same major version; anything else is
/// treated as malformed and replaced with a default.
pub const PROFILE_VERSION: &str = "1.0.0";

// ==================== Skill Ledger ====================

/// Per-category counters and mastery set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRecord {
    /// Skill level 0-3; never demoted.
    pub level: u32,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    /// Derived from the counters on every attempt; never drifts.
    pub accuracy: f64,
    /// Items explicitly marked mastered for this category.
    pub mastered_items: BTreeSet<String>,
}

impl SkillRecord {
    /// Folds one attempt outcome into the counters and re-evaluates the
    /// level thresholds. The level only ever increases.
    pub fn apply_attempt(&mut self, correct: bool) {
        self.total_attempts = self.total_attempts.saturating_add(1);
        if correct {
            self.correct_attempts = self.correct_attempts.saturating_add(1);
        }
        self.recompute_accuracy();
        self.level = self.level.max(self.earned_level());
    }

    /// Accuracy is a pure projection of the counters.
    pub fn recompute_accuracy(&mut self) {
        self.accuracy = if self.total_attempts > 0 {
            self.correct_attempts as f64 / self.total_attempts as f64
        } else {
            0.0
        };
    }

    fn earned_level(&self) -> u32 {
        if self.accuracy >= 0.9 && self.total_attempts >= 50 {
            3
        } else if self.accuracy >= 0.8 && self.total_attempts >= 30 {
            2
        } else if self.accuracy >= 0.7 && self.total_attempts >= 10 {
            1
        } else {
            0
        }
    }
}

// ==================== SRS entry ====================

/// Spaced-repetition state for one learnable item.
///
/// Created on the first review and never deleted; a long-unreviewed item
/// simply accumulates days overdue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SrsEntry {
    pub ease_factor: f64,
    /// Review interval in whole days, always >= 1.
    pub interval: u32,
    pub review_count: u32,
    pub next_review_date: DateTime<Utc>,
}

// ==================== Activity history ====================

/// Aggregate play record for one activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub plays: u32,
    pub best_score: u32,
    pub total_score: u64,
    /// `total_score / plays`, integer-floored.
    pub average_score: u32,
    /// Highest star grade ever earned; never lowered.
    pub stars: u8,
    pub last_played: Option<DateTime<Utc>>,
}

impl ActivityRecord {
    /// Folds one completed play into the record.
    pub fn apply_score(&mut self, score: u32, now: DateTime<Utc>) {
        self.plays = self.plays.saturating_add(1);
        self.best_score = self.best_score.max(score);
        self.total_score = self.total_score.saturating_add(score as u64);
        self.average_score = (self.total_score / self.plays as u64) as u32;
        self.stars = self.stars.max(star_grade(score));
        self.last_played = Some(now);
    }
}

/// Star grade for a single play: 3 at 150 points, 2 at 100, 1 at 50.
pub fn star_grade(score: u32) -> u8 {
    if score >= 150 {
        3
    } else if score >= 100 {
        2
    } else if score >= 50 {
        1
    } else {
        0
    }
}

// ==================== Settings ====================

/// Small learner-editable preferences record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSettings {
    pub preferred_difficulty: Difficulty,
    pub hints_enabled: bool,
    pub display_language: String,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            preferred_difficulty: Difficulty::Beginner,
            hints_enabled: true,
            display_language: "en".to_string(),
        }
    }
}

// ==================== Learner profile ====================

/// Root aggregate; one per device/install.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    /// Opaque stable identifier, generated once, never reused.
    pub profile_id: String,
    /// Semantic version of the persisted shape.
    pub version: String,
    pub skills: BTreeMap<SkillCategory, SkillRecord>,
    /// Keyed by item identifier, independent of category.
    pub srs_data: HashMap<String, SrsEntry>,
    pub game_history: BTreeMap<crate::types::ActivityId, ActivityRecord>,
    /// Unlocked achievement id -> unlock timestamp. Append-only.
    pub achievements: BTreeMap<String, DateTime<Utc>>,
    pub settings: ProfileSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LearnerProfile {
    /// Freshly constructed default profile with every category present.
    pub fn new() -> Self {
        let now = Utc::now();
        let skills = SkillCategory::ALL
            .iter()
            .map(|c| (*c, SkillRecord::default()))
            .collect();
        Self {
            profile_id: Uuid::new_v4().to_string(),
            version: PROFILE_VERSION.to_string(),
            skills,
            srs_data: HashMap::new(),
            game_history: BTreeMap::new(),
            achievements: BTreeMap::new(),
            settings: ProfileSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Skill record for a category, creating the default entry if a loaded
    /// profile predates the category.
    pub fn skill_mut(&mut self, category: SkillCategory) -> &mut SkillRecord {
        self.skills.entry(category).or_default()
    }

    pub fn skill(&self, category: SkillCategory) -> Option<&SkillRecord> {
        self.skills.get(&category)
    }

    /// True when the persisted version shares this build's major version.
    pub fn version_supported(version: &str) -> bool {
        let major = |v: &str| v.split('.').next().map(str::to_string);
        major(version).is_some() && major(version) == major(PROFILE_VERSION)
    }
}

impl Default for LearnerProfile {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Tests ====================
