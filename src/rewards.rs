//! Reward Evaluator
//!
//! Predicate-based achievement unlocking over a static catalog. Each
//! achievement is tagged data plus a pure predicate over a profile
//! snapshot, so every condition is unit-testable in isolation. Unlocking is
//! idempotent and append-only; the evaluator reads the profile store and
//! writes back through its mutation API.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::profile::LearnerProfile;
use crate::store::ProfileStore;
use crate::types::{ActivityId, SkillCategory, MASTERY_LEVEL};

/// Static achievement definition; the catalog is versioned alongside
/// content, not persisted per learner.
pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub predicate: fn(&LearnerProfile) -> bool,
}

/// Unlock-coverage summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementProgress {
    pub unlocked: usize,
    pub total: usize,
    pub percentage: f64,
}

// ==================== Catalog ====================

/// The full achievement catalog, in display order.
pub fn catalog() -> &'static [AchievementDef] {
    &CATALOG
}

static CATALOG: [AchievementDef; 10] = [
    AchievementDef {
        id: "first_game",
        name: "First Steps",
        description: "Finish your very first game",
        predicate: |p| p.game_history.values().any(|r| r.plays > 0),
    },
    AchievementDef {
        id: "five_letters",
        name: "Letter Collector",
        description: "Master 5 letters",
        predicate: |p| mastered_in(p, SkillCategory::Alphabet) >= 5,
    },
    AchievementDef {
        id: "alphabet_complete",
        name: "Alphabet Champion",
        description: "Master all 26 letters",
        predicate: |p| mastered_in(p, SkillCategory::Alphabet) >= 26,
    },
    AchievementDef {
        id: "ten_words",
        name: "Word Sprout",
        description: "Master 10 words",
        predicate: |p| mastered_in(p, SkillCategory::Vocabulary) >= 10,
    },
    AchievementDef {
        id: "fifty_words",
        name: "Word Gardener",
        description: "Master 50 words",
        predicate: |p| mastered_in(p, SkillCategory::Vocabulary) >= 50,
    },
    AchievementDef {
        id: "steady_aim",
        name: "Steady Aim",
        description: "Reach 80% accuracy over 20 or more tries",
        predicate: |p| {
            let (total, correct) = p.skills.values().fold((0u32, 0u32), |(t, c), s| {
                (t + s.total_attempts, c + s.correct_attempts)
            });
            total >= 20 && correct as f64 / total as f64 >= 0.8
        },
    },
    AchievementDef {
        id: "ten_games",
        name: "Regular Player",
        description: "Play 10 games",
        predicate: |p| total_plays(p) >= 10,
    },
    AchievementDef {
        id: "fifty_games",
        name: "Dedicated Player",
        description: "Play 50 games",
        predicate: |p| total_plays(p) >= 50,
    },
    AchievementDef {
        id: "explorer",
        name: "Explorer",
        description: "Try every activity at least once",
        predicate: |p| {
            ActivityId::ALL
                .iter()
                .all(|a| p.game_history.get(a).map(|r| r.plays > 0).unwrap_or(false))
        },
    },
    AchievementDef {
        id: "category_master",
        name: "Subject Star",
        description: "Bring any skill to its top level",
        predicate: |p| p.skills.values().any(|s| s.level >= MASTERY_LEVEL),
    },
];

fn mastered_in(profile: &LearnerProfile, category: SkillCategory) -> usize {
    profile
        .skill(category)
        .map(|s| s.mastered_items.len())
        .unwrap_or(0)
}

fn total_plays(profile: &LearnerProfile) -> u32 {
    profile.game_history.values().map(|r| r.plays).sum()
}

// ==================== Evaluator ====================

pub struct RewardEvaluator {
    store: Arc<ProfileStore>,
}

impl RewardEvaluator {
    pub fn new(store: Arc<ProfileStore>) -> Self {
        Self { store }
    }

    /// Evaluates every catalog predicate against the current profile,
    /// unlocks and persists whatever newly qualifies, and returns exactly
    /// the newly unlocked definitions. An empty result is the common case.
    pub fn check_achievements(&self) -> CoreResult<Vec<&'static AchievementDef>> {
        let profile = self.store.profile();
        let mut newly_unlocked = Vec::new();

        for def in catalog() {
            if profile.achievements.contains_key(def.id) {
                continue;
            }
            if (def.predicate)(&profile) && self.store.unlock_achievement(def.id)? {
                newly_unlocked.push(def);
            }
        }

        Ok(newly_unlocked)
    }

    /// Idempotent unlock by id; returns whether anything changed.
    pub fn unlock_achievement(&self, id: &str) -> CoreResult<bool> {
        self.store.unlock_achievement(id)
    }

    pub fn get_unlocked_achievements(&self) -> Vec<&'static AchievementDef> {
        let profile = self.store.profile();
        catalog()
            .iter()
            .filter(|d| profile.achievements.contains_key(d.id))
            .collect()
    }

    pub fn get_locked_achievements(&self) -> Vec<&'static AchievementDef> {
        let profile = self.store.profile();
        catalog()
            .iter()
            .filter(|d| !profile.achievements.contains_key(d.id))
            .collect()
    }

    pub fn get_achievement_progress(&self) -> AchievementProgress {
        let total = catalog().len();
        let unlocked = self.get_unlocked_achievements().len();
        let percentage = if total > 0 {
            unlocked as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        AchievementProgress {
            unlocked,
            total,
            percentage,
        }
    }
}

// ==================== Tests ====================
