//! Learner Profile Store
//!
//! Exclusive owner of the in-memory [`LearnerProfile`]. All mutation flows
//! through here so the structural invariants are enforced centrally; the
//! recommendation engine and reward evaluator only read snapshots and call
//! back into this API.
//!
//! Persistence policy: every mutating call updates the in-memory profile
//! first (validated shape), then attempts a save. A failed write is logged
//! and surfaced as an error, but the in-memory profile is retained so the
//! session continues; corrupt persisted data on load is replaced with a
//! fresh default rather than failing the caller.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::mpsc::Receiver;
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::events::{EventBus, ProgressEvent};
use crate::profile::{star_grade, LearnerProfile, PROFILE_VERSION};
use crate::sanitize;
use crate::srs;
use crate::storage::KeyValueStorage;
use crate::types::{activity_category, ActivityId, SkillCategory};

/// Key the profile document is stored under.
pub const PROFILE_STORAGE_KEY: &str = "alphakids-profile";

/// Attempt counters reported by a completed activity, folded into the
/// activity's mapped skill category.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameStats {
    pub attempts: u32,
    pub correct: u32,
}

/// Owns the persisted learner state behind a single mutex.
pub struct ProfileStore {
    storage: Box<dyn KeyValueStorage>,
    events: EventBus,
    profile: Mutex<LearnerProfile>,
    key: String,
}

impl ProfileStore {
    /// Opens the store, loading the persisted profile or substituting a
    /// default when the key is absent or the data is unusable.
    pub fn open(storage: Box<dyn KeyValueStorage>) -> Self {
        Self::open_with_key(storage, PROFILE_STORAGE_KEY)
    }

    pub fn open_with_key(storage: Box<dyn KeyValueStorage>, key: &str) -> Self {
        let profile = Self::load_from(storage.as_ref(), key);
        Self {
            storage,
            events: EventBus::new(),
            profile: Mutex::new(profile),
            key: key.to_string(),
        }
    }

    /// Reads and revives a profile; any failure degrades to a default.
    fn load_from(storage: &dyn KeyValueStorage, key: &str) -> LearnerProfile {
        let raw = match storage.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no stored profile, starting fresh");
                return LearnerProfile::new();
            }
            Err(e) => {
                warn!(error = %e, "profile read failed, starting fresh");
                return LearnerProfile::new();
            }
        };

        let parsed: LearnerProfile = match serde_json::from_str(&raw) {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "stored profile unparsable, starting fresh");
                return LearnerProfile::new();
            }
        };

        if !LearnerProfile::version_supported(&parsed.version) {
            warn!(version = %parsed.version, "stored profile version unsupported, starting fresh");
            return LearnerProfile::new();
        }

        let mut revived = sanitize::sanitize(parsed);
        revived.version = PROFILE_VERSION.to_string();
        match sanitize::validate(&revived) {
            Ok(()) => revived,
            Err(e) => {
                warn!(error = %e, "stored profile failed validation, starting fresh");
                LearnerProfile::new()
            }
        }
    }

    /// Read-your-writes snapshot of the current profile.
    pub fn profile(&self) -> LearnerProfile {
        self.profile.lock().clone()
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    /// Validates the in-memory profile and writes it out.
    ///
    /// On validation failure the save is refused; on a quota or storage
    /// failure the write is abandoned. Either way the in-memory profile is
    /// untouched and the error is logged for telemetry.
    pub fn save(&self) -> CoreResult<()> {
        let snapshot = self.profile.lock().clone();
        self.persist(&snapshot)
    }

    fn persist(&self, profile: &LearnerProfile) -> CoreResult<()> {
        if let Err(e) = sanitize::validate(profile) {
            warn!(error = %e, "refusing to persist invalid profile");
            return Err(e);
        }

        let json = serde_json::to_string(&sanitize::sanitize(profile.clone()))?;
        match self.storage.set(&self.key, &json) {
            Ok(()) => {
                self.events.emit(ProgressEvent::ProgressSaved {
                    profile_id: profile.profile_id.clone(),
                });
                Ok(())
            }
            Err(CoreError::QuotaExceeded) => {
                warn!("profile save abandoned: storage quota exceeded");
                Err(CoreError::QuotaExceeded)
            }
            Err(e) => {
                warn!(error = %e, "profile save failed");
                Err(e)
            }
        }
    }

    /// Records one attempt outcome: counters, accuracy, level thresholds,
    /// then persist.
    pub fn record_attempt(
        &self,
        category: SkillCategory,
        _item_id: &str,
        correct: bool,
    ) -> CoreResult<()> {
        let snapshot = {
            let mut profile = self.profile.lock();
            profile.skill_mut(category).apply_attempt(correct);
            profile.updated_at = Utc::now();
            profile.clone()
        };
        self.persist(&snapshot)
    }

    /// Idempotently adds an item to a category's mastered set.
    ///
    /// Returns whether the item was newly added; duplicates are a no-op and
    /// emit nothing.
    pub fn mark_item_mastered(&self, category: SkillCategory, item_id: &str) -> CoreResult<bool> {
        let (added, mastered_count, snapshot) = {
            let mut profile = self.profile.lock();
            let skill = profile.skill_mut(category);
            let added = skill.mastered_items.insert(item_id.to_string());
            let count = skill.mastered_items.len();
            if added {
                profile.updated_at = Utc::now();
            }
            (added, count, profile.clone())
        };

        if !added {
            return Ok(false);
        }

        let event = match category {
            SkillCategory::Alphabet => ProgressEvent::LetterMastered {
                item_id: item_id.to_string(),
                mastered_count,
            },
            _ => ProgressEvent::WordMastered {
                category,
                item_id: item_id.to_string(),
                mastered_count,
            },
        };
        self.events.emit(event);

        self.persist(&snapshot)?;
        Ok(true)
    }

    /// Records a completed activity: play counters, star grade, and the
    /// attempt stats folded into the activity's mapped category.
    pub fn record_activity_completion(
        &self,
        activity: ActivityId,
        score: u32,
        stats: GameStats,
    ) -> CoreResult<()> {
        let now = Utc::now();
        let snapshot = {
            let mut profile = self.profile.lock();
            profile
                .game_history
                .entry(activity)
                .or_default()
                .apply_score(score, now);

            let category = activity_category(activity);
            let skill = profile.skill_mut(category);
            let correct = stats.correct.min(stats.attempts);
            for i in 0..stats.attempts {
                skill.apply_attempt(i < correct);
            }

            profile.updated_at = now;
            profile.clone()
        };

        self.events.emit(ProgressEvent::GameRecorded {
            activity,
            score,
            stars: star_grade(score),
        });

        self.persist(&snapshot)
    }

    /// Applies a review outcome to an item's SRS entry, creating the entry
    /// on first review.
    pub fn record_review(&self, item_id: &str, quality: u8) -> CoreResult<()> {
        let now = Utc::now();
        let snapshot = {
            let mut profile = self.profile.lock();
            let entry = match profile.srs_data.get(item_id) {
                Some(existing) => srs::review(existing, quality, now),
                None => srs::initialize(quality, now),
            };
            profile.srs_data.insert(item_id.to_string(), entry);
            profile.updated_at = now;
            profile.clone()
        };
        self.persist(&snapshot)
    }

    /// Appends an achievement to the unlocked set.
    ///
    /// Returns whether anything changed; repeated calls are no-ops.
    pub fn unlock_achievement(&self, achievement_id: &str) -> CoreResult<bool> {
        let (added, snapshot) = {
            let mut profile = self.profile.lock();
            let added = !profile.achievements.contains_key(achievement_id);
            if added {
                profile
                    .achievements
                    .insert(achievement_id.to_string(), Utc::now());
                profile.updated_at = Utc::now();
            }
            (added, profile.clone())
        };

        if !added {
            return Ok(false);
        }

        self.events.emit(ProgressEvent::AchievementUnlocked {
            achievement_id: achievement_id.to_string(),
        });
        self.persist(&snapshot)?;
        Ok(true)
    }

    /// Replaces the profile with a fresh default and persists it.
    pub fn reset(&self) -> CoreResult<()> {
        let fresh = LearnerProfile::new();
        let profile_id = fresh.profile_id.clone();
        let snapshot = {
            let mut profile = self.profile.lock();
            *profile = fresh;
            profile.clone()
        };

        self.events.emit(ProgressEvent::ProgressReset { profile_id });
        self.persist(&snapshot)
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::types::Difficulty;

    fn memory_store() -> ProfileStore {
        ProfileStore::open(Box::new(MemoryStorage::new()))
    }

    #[test]
    fn test_open_with_empty_storage_starts_fresh() {
        let store = memory_store();
        let profile = store.profile();
        assert_eq!(profile.version, PROFILE_VERSION);
        assert!(profile.game_history.is_empty());
    }

    #[test]
    fn test_open_with_garbage_starts_fresh() {
        let storage = MemoryStorage::new();
        storage.set(PROFILE_STORAGE_KEY, "{not json").unwrap();
        let store = ProfileStore::open(Box::new(storage));
        assert_eq!(store.profile().version, PROFILE_VERSION);
    }

    #[test]
    fn test_open_rejects_future_major_version() {
        let storage = MemoryStorage::new();
        let mut profile = LearnerProfile::new();
        profile.version = "2.0.0".to_string();
        profile.skill_mut(SkillCategory::Alphabet).total_attempts = 7;
        storage
            .set(PROFILE_STORAGE_KEY, &serde_json::to_string(&profile).unwrap())
            .unwrap();

        let store = ProfileStore::open(Box::new(storage));
        let loaded = store.profile();
        assert_ne!(loaded.profile_id, profile.profile_id);
        assert_eq!(
            loaded.skill(SkillCategory::Alphabet).unwrap().total_attempts,
            0
        );
    }

    #[test]
    fn test_roundtrip_through_storage() {
        let storage = Box::new(MemoryStorage::new());
        {
            let store = ProfileStore::open_with_key(storage, "p");
            store
                .record_attempt(SkillCategory::Vocabulary, "cat", true)
                .unwrap();
            let profile = store.profile();

            // Reopen against the same bytes.
            let raw = serde_json::to_string(&profile).unwrap();
            let storage2 = MemoryStorage::new();
            storage2.set("p", &raw).unwrap();
            let reopened = ProfileStore::open_with_key(Box::new(storage2), "p");
            assert_eq!(reopened.profile(), profile);
        }
    }

    #[test]
    fn test_record_attempt_updates_and_persists() {
        let store = memory_store();
        store
            .record_attempt(SkillCategory::Alphabet, "a", true)
            .unwrap();
        store
            .record_attempt(SkillCategory::Alphabet, "b", false)
            .unwrap();

        let skill = store.profile();
        let skill = skill.skill(SkillCategory::Alphabet).unwrap();
        assert_eq!(skill.total_attempts, 2);
        assert_eq!(skill.correct_attempts, 1);
        assert!((skill.accuracy - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mark_item_mastered_is_idempotent() {
        let store = memory_store();
        assert!(store
            .mark_item_mastered(SkillCategory::Alphabet, "a")
            .unwrap());
        assert!(!store
            .mark_item_mastered(SkillCategory::Alphabet, "a")
            .unwrap());

        let profile = store.profile();
        let mastered = &profile.skill(SkillCategory::Alphabet).unwrap().mastered_items;
        assert_eq!(mastered.len(), 1);
    }

    #[test]
    fn test_mastered_events_distinguish_letters_and_words() {
        let store = memory_store();
        let rx = store.subscribe();

        store
            .mark_item_mastered(SkillCategory::Alphabet, "a")
            .unwrap();
        store
            .mark_item_mastered(SkillCategory::Vocabulary, "cat")
            .unwrap();

        let events: Vec<ProgressEvent> = rx.try_iter().collect();
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::LetterMastered { item_id, .. } if item_id == "a"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::WordMastered { item_id, .. } if item_id == "cat"
        )));
    }

    #[test]
    fn test_activity_completion_best_and_average() {
        let store = memory_store();
        store
            .record_activity_completion(ActivityId::WordBuilder, 100, GameStats::default())
            .unwrap();
        store
            .record_activity_completion(ActivityId::WordBuilder, 200, GameStats::default())
            .unwrap();

        let profile = store.profile();
        let record = &profile.game_history[&ActivityId::WordBuilder];
        assert_eq!(record.plays, 2);
        assert_eq!(record.best_score, 200);
        assert_eq!(record.average_score, 150);
        assert_eq!(record.stars, 3);
    }

    #[test]
    fn test_activity_stats_fold_into_mapped_category() {
        let store = memory_store();
        store
            .record_activity_completion(
                ActivityId::SoundSafari,
                80,
                GameStats {
                    attempts: 10,
                    correct: 7,
                },
            )
            .unwrap();

        let profile = store.profile();
        let listening = profile.skill(SkillCategory::Listening).unwrap();
        assert_eq!(listening.total_attempts, 10);
        assert_eq!(listening.correct_attempts, 7);
    }

    #[test]
    fn test_record_review_initializes_then_updates() {
        let store = memory_store();
        store.record_review("x", 4).unwrap();
        {
            let profile = store.profile();
            let entry = &profile.srs_data["x"];
            assert_eq!(entry.ease_factor, 2.5);
            assert!(entry.interval > 0);
        }

        store.record_review("x", 1).unwrap();
        let profile = store.profile();
        let entry = &profile.srs_data["x"];
        assert_eq!(entry.interval, 1);
        assert_eq!(entry.review_count, 2);
    }

    #[test]
    fn test_unlock_achievement_idempotent() {
        let store = memory_store();
        assert!(store.unlock_achievement("first_game").unwrap());
        assert!(!store.unlock_achievement("first_game").unwrap());
        assert_eq!(store.profile().achievements.len(), 1);
    }

    #[test]
    fn test_quota_failure_keeps_in_memory_state() {
        // Quota too small for any profile document.
        let storage = MemoryStorage::with_quota(16);
        let store = ProfileStore::open(Box::new(storage));

        let result = store.record_attempt(SkillCategory::Spelling, "s", true);
        assert!(matches!(result, Err(CoreError::QuotaExceeded)));

        // The session continues with the mutation applied in memory.
        let skill = store.profile();
        let skill = skill.skill(SkillCategory::Spelling).unwrap();
        assert_eq!(skill.total_attempts, 1);
    }

    #[test]
    fn test_reset_replaces_profile_and_emits() {
        let store = memory_store();
        store
            .record_attempt(SkillCategory::Alphabet, "a", true)
            .unwrap();
        let old_id = store.profile().profile_id;

        let rx = store.subscribe();
        store.reset().unwrap();

        let profile = store.profile();
        assert_ne!(profile.profile_id, old_id);
        assert_eq!(profile.skill(SkillCategory::Alphabet).unwrap().total_attempts, 0);

        let events: Vec<ProgressEvent> = rx.try_iter().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, ProgressEvent::ProgressReset { .. })));
    }

    #[test]
    fn test_settings_default() {
        let store = memory_store();
        let settings = store.profile().settings;
        assert_eq!(settings.preferred_difficulty, Difficulty::Beginner);
        assert!(settings.hints_enabled);
    }
}
