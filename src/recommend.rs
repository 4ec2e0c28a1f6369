//! Recommendation Engine
//!
//! Decides what a learner sees next: difficulty selection, weighted content
//! sampling, weak-area and velocity analytics, and success prediction. The
//! engine reads profile snapshots from the [`ProfileStore`] and calls the
//! pure scheduler in [`crate::srs`]; it never mutates learner state.
//!
//! Sampling uses a seedable RNG so selection is reproducible in tests.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::profile::LearnerProfile;
use crate::srs;
use crate::store::ProfileStore;
use crate::types::{
    activities_for_category, ActivityId, ContentCatalog, ContentItem, Difficulty, SkillCategory,
    MASTERY_LEVEL, WEAK_AREA_ACCURACY, WEAK_AREA_MIN_ATTEMPTS,
};

/// A category flagged as needing attention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakArea {
    pub category: SkillCategory,
    pub accuracy: f64,
}

/// One step of the generated learning path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathEntry {
    pub category: SkillCategory,
    pub difficulty: Difficulty,
    pub recommended_games: Vec<ActivityId>,
}

/// Practice-rate analytics over a recent window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocityReport {
    pub attempts_per_day: f64,
    pub current_accuracy: f64,
    /// Mastered items over the category's known roster, in [0, 1].
    pub mastery_rate: f64,
}

pub struct RecommendationEngine {
    store: Arc<ProfileStore>,
    catalog: ContentCatalog,
    rng: Mutex<ChaCha8Rng>,
}

impl RecommendationEngine {
    pub fn new(store: Arc<ProfileStore>, catalog: ContentCatalog) -> Self {
        Self {
            store,
            catalog,
            rng: Mutex::new(ChaCha8Rng::from_entropy()),
        }
    }

    /// Deterministic sampling for tests and replayable sessions.
    pub fn with_seed(store: Arc<ProfileStore>, catalog: ContentCatalog, seed: u64) -> Self {
        Self {
            store,
            catalog,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    // ==================== Difficulty ====================

    /// Difficulty tier for a category from its level and accuracy.
    /// New learners always get beginner.
    pub fn recommended_difficulty(&self, category: SkillCategory) -> Difficulty {
        let profile = self.store.profile();
        Self::difficulty_for(&profile, category)
    }

    fn difficulty_for(profile: &LearnerProfile, category: SkillCategory) -> Difficulty {
        let Some(skill) = profile.skill(category) else {
            return Difficulty::Beginner;
        };
        if skill.total_attempts == 0 {
            return Difficulty::Beginner;
        }
        if skill.level >= 3 && skill.accuracy >= 0.85 {
            Difficulty::Advanced
        } else if skill.level >= 2 && skill.accuracy >= 0.75 {
            Difficulty::Intermediate
        } else {
            Difficulty::Beginner
        }
    }

    // ==================== Sampling ====================

    /// Uniform sample without replacement from the pool entries matching
    /// `difficulty`. Returns all matches when fewer than `count` exist.
    pub fn select_by_difficulty(
        &self,
        pool: &[ContentItem],
        difficulty: Difficulty,
        count: usize,
    ) -> Vec<ContentItem> {
        let matches: Vec<ContentItem> = pool
            .iter()
            .filter(|i| i.difficulty == difficulty)
            .cloned()
            .collect();
        self.sample(matches, count)
    }

    /// Uniform sample without replacement; the whole pool when `count`
    /// exceeds its size.
    pub fn select_random(&self, pool: &[ContentItem], count: usize) -> Vec<ContentItem> {
        self.sample(pool.to_vec(), count)
    }

    fn sample(&self, mut pool: Vec<ContentItem>, count: usize) -> Vec<ContentItem> {
        let mut rng = self.rng.lock();
        pool.shuffle(&mut *rng);
        pool.truncate(count);
        pool
    }

    /// Blends due reviews, fresh unmastered items, and difficulty-matched
    /// fill into one working set of size `min(count, pool.len())`.
    pub fn select_content_for_student(
        &self,
        category: SkillCategory,
        pool: &[ContentItem],
        count: usize,
    ) -> Vec<ContentItem> {
        let profile = self.store.profile();
        let now = chrono::Utc::now();
        let target = count.min(pool.len());

        let pool_ids: Vec<String> = pool.iter().map(|i| i.id.clone()).collect();
        let mut selected: Vec<ContentItem> = Vec::with_capacity(target);
        let taken = |sel: &[ContentItem], id: &str| sel.iter().any(|i| i.id == id);

        // 1. Due reviews, most overdue first.
        for due in srs::due_items(&profile.srs_data, &pool_ids, now) {
            if selected.len() >= target {
                break;
            }
            if let Some(item) = pool.iter().find(|i| i.id == due.item_id) {
                selected.push(item.clone());
            }
        }

        // 2. Fresh items: never reviewed and not yet mastered.
        let mastered = profile
            .skill(category)
            .map(|s| s.mastered_items.clone())
            .unwrap_or_default();
        if selected.len() < target {
            let fresh: Vec<ContentItem> = pool
                .iter()
                .filter(|i| {
                    !profile.srs_data.contains_key(&i.id)
                        && !mastered.contains(&i.id)
                        && !taken(&selected, &i.id)
                })
                .cloned()
                .collect();
            for item in self.sample(fresh, target - selected.len()) {
                selected.push(item);
            }
        }

        // 3. Fill with the recommended-difficulty slice, then whatever is
        // left, so the guarantee on the returned size holds.
        if selected.len() < target {
            let difficulty = Self::difficulty_for(&profile, category);
            let remaining: Vec<ContentItem> = pool
                .iter()
                .filter(|i| i.difficulty == difficulty && !taken(&selected, &i.id))
                .cloned()
                .collect();
            for item in self.sample(remaining, target - selected.len()) {
                selected.push(item);
            }
        }
        if selected.len() < target {
            let leftovers: Vec<ContentItem> = pool
                .iter()
                .filter(|i| !taken(&selected, &i.id))
                .cloned()
                .collect();
            for item in self.sample(leftovers, target - selected.len()) {
                selected.push(item);
            }
        }

        selected
    }

    // ==================== Analytics ====================

    /// Categories with enough data to judge and accuracy below the weak
    /// threshold, weakest first.
    pub fn identify_weak_areas(&self) -> Vec<WeakArea> {
        let profile = self.store.profile();
        let mut weak: Vec<WeakArea> = profile
            .skills
            .iter()
            .filter(|(_, s)| {
                s.total_attempts >= WEAK_AREA_MIN_ATTEMPTS && s.accuracy < WEAK_AREA_ACCURACY
            })
            .map(|(c, s)| WeakArea {
                category: *c,
                accuracy: s.accuracy,
            })
            .collect();
        weak.sort_by(|a, b| a.accuracy.total_cmp(&b.accuracy));
        weak
    }

    /// Activities for the weakest category, falling back to the least
    /// practiced category when nothing qualifies as weak.
    pub fn suggest_next_game(&self) -> Vec<ActivityId> {
        let target = match self.identify_weak_areas().first() {
            Some(weak) => weak.category,
            None => {
                let profile = self.store.profile();
                profile
                    .skills
                    .iter()
                    .min_by_key(|(_, s)| s.total_attempts)
                    .map(|(c, _)| *c)
                    .unwrap_or(SkillCategory::Alphabet)
            }
        };
        activities_for_category(target)
    }

    /// One entry per category below mastery level, with its recommended
    /// difficulty and suggested activities. Mastered categories are
    /// excluded entirely.
    pub fn generate_learning_path(&self) -> Vec<LearningPathEntry> {
        let profile = self.store.profile();
        SkillCategory::ALL
            .iter()
            .filter(|c| {
                profile
                    .skill(**c)
                    .map(|s| s.level < MASTERY_LEVEL)
                    .unwrap_or(true)
            })
            .map(|c| LearningPathEntry {
                category: *c,
                difficulty: Self::difficulty_for(&profile, *c),
                recommended_games: activities_for_category(*c),
            })
            .collect()
    }

    /// Practice rate, accuracy, and mastery coverage for a category over a
    /// recent window. Never divides by zero: an empty roster or an empty
    /// window degrades to zero rates.
    pub fn analyze_learning_velocity(
        &self,
        category: SkillCategory,
        window_days: u32,
    ) -> VelocityReport {
        let profile = self.store.profile();
        let skill = profile.skill(category).cloned().unwrap_or_default();

        let attempts_per_day = if window_days > 0 {
            skill.total_attempts as f64 / window_days as f64
        } else {
            0.0
        };

        let known = self.catalog.items_in(category).len();
        let mastery_rate = if known > 0 && skill.total_attempts > 0 {
            (skill.mastered_items.len() as f64 / known as f64).min(1.0)
        } else {
            0.0
        };

        VelocityReport {
            attempts_per_day,
            current_accuracy: skill.accuracy,
            mastery_rate,
        }
    }

    /// Hint phrased by familiarity with the item.
    pub fn get_personalized_hint(&self, category: SkillCategory, item_id: &str) -> String {
        let profile = self.store.profile();
        match profile.srs_data.get(item_id) {
            None => format!(
                "This {} is new to you. Take your time and listen carefully!",
                Self::item_noun(category)
            ),
            Some(entry) if entry.interval >= 7 && entry.ease_factor >= 2.0 => format!(
                "You know this {} well. Trust your memory!",
                Self::item_noun(category)
            ),
            Some(entry) if entry.ease_factor < 1.6 => format!(
                "This {} has been tricky. Sound it out slowly, piece by piece.",
                Self::item_noun(category)
            ),
            Some(_) => format!(
                "You've seen this {} before. Think back to last time!",
                Self::item_noun(category)
            ),
        }
    }

    fn item_noun(category: SkillCategory) -> &'static str {
        match category {
            SkillCategory::Alphabet => "letter",
            SkillCategory::Phrases => "phrase",
            _ => "word",
        }
    }

    /// Success probability for a category at a target difficulty, in
    /// [0, 1]. A learner with no attempts gets the 0.5 uninformative
    /// prior; otherwise the estimate rises with accuracy and falls as the
    /// target difficulty rises above beginner.
    pub fn predict_success_probability(
        &self,
        category: SkillCategory,
        difficulty: Difficulty,
    ) -> f64 {
        let profile = self.store.profile();
        let Some(skill) = profile.skill(category) else {
            return 0.5;
        };
        if skill.total_attempts == 0 {
            return 0.5;
        }

        let base = 0.25 + 0.6 * skill.accuracy + 0.05 * skill.level.min(3) as f64;
        let penalty = 0.15 * difficulty.rank() as f64;
        (base - penalty).clamp(0.05, 0.95)
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::store::GameStats;

    fn fresh_engine(catalog: ContentCatalog) -> (Arc<ProfileStore>, RecommendationEngine) {
        let store = Arc::new(ProfileStore::open(Box::new(MemoryStorage::new())));
        let engine = RecommendationEngine::with_seed(Arc::clone(&store), catalog, 7);
        (store, engine)
    }

    fn alphabet_pool() -> Vec<ContentItem> {
        ('a'..='j')
            .enumerate()
            .map(|(i, c)| {
                let difficulty = match i % 3 {
                    0 => Difficulty::Beginner,
                    1 => Difficulty::Intermediate,
                    _ => Difficulty::Advanced,
                };
                ContentItem::new(c.to_string(), SkillCategory::Alphabet, difficulty)
            })
            .collect()
    }

    #[test]
    fn test_fresh_learner_gets_beginner() {
        let (_, engine) = fresh_engine(ContentCatalog::default());
        assert_eq!(
            engine.recommended_difficulty(SkillCategory::Alphabet),
            Difficulty::Beginner
        );
    }

    #[test]
    fn test_difficulty_rises_with_level_and_accuracy() {
        let (store, engine) = fresh_engine(ContentCatalog::default());
        // 50 correct attempts: accuracy 1.0, level 3 -> advanced.
        for _ in 0..50 {
            store
                .record_attempt(SkillCategory::Vocabulary, "w", true)
                .unwrap();
        }
        assert_eq!(
            engine.recommended_difficulty(SkillCategory::Vocabulary),
            Difficulty::Advanced
        );
    }

    #[test]
    fn test_select_by_difficulty_never_pads() {
        let (_, engine) = fresh_engine(ContentCatalog::default());
        let pool = alphabet_pool();
        let advanced_in_pool = pool
            .iter()
            .filter(|i| i.difficulty == Difficulty::Advanced)
            .count();

        let picked = engine.select_by_difficulty(&pool, Difficulty::Advanced, 50);
        assert_eq!(picked.len(), advanced_in_pool);
        assert!(picked.iter().all(|i| i.difficulty == Difficulty::Advanced));
    }

    #[test]
    fn test_select_random_without_replacement() {
        let (_, engine) = fresh_engine(ContentCatalog::default());
        let pool = alphabet_pool();

        let picked = engine.select_random(&pool, 4);
        assert_eq!(picked.len(), 4);
        let mut ids: Vec<&str> = picked.iter().map(|i| i.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);

        let all = engine.select_random(&pool, 100);
        assert_eq!(all.len(), pool.len());
    }

    #[test]
    fn test_select_content_size_guarantee() {
        let (store, engine) = fresh_engine(ContentCatalog::default());
        let pool = alphabet_pool();

        // Mix of due reviews and mastered items.
        store.record_review("a", 1).unwrap();
        store
            .mark_item_mastered(SkillCategory::Alphabet, "b")
            .unwrap();

        let picked = engine.select_content_for_student(SkillCategory::Alphabet, &pool, 6);
        assert_eq!(picked.len(), 6);
        let mut ids: Vec<&str> = picked.iter().map(|i| i.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6, "no duplicates in the working set");

        let tiny = engine.select_content_for_student(SkillCategory::Alphabet, &pool[..3], 10);
        assert_eq!(tiny.len(), 3);

        let empty = engine.select_content_for_student(SkillCategory::Alphabet, &[], 10);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_due_review_takes_priority() {
        let (store, engine) = fresh_engine(ContentCatalog::default());
        let pool = alphabet_pool();

        // Quality 0 initializes with a one-day interval; the next review is
        // tomorrow, so it is not due yet. Simulate a due item by reviewing
        // and checking it shows up once due. Here we assert fresh items fill
        // the set when nothing is due.
        store.record_review("a", 5).unwrap();
        let picked = engine.select_content_for_student(SkillCategory::Alphabet, &pool, 3);
        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|i| i.id != "a"), "scheduled item is not fresh");
    }

    #[test]
    fn test_weak_areas_need_enough_data() {
        let (store, engine) = fresh_engine(ContentCatalog::default());
        // 4 attempts, all wrong: too sparse to judge.
        for _ in 0..4 {
            store
                .record_attempt(SkillCategory::Listening, "x", false)
                .unwrap();
        }
        assert!(engine.identify_weak_areas().is_empty());

        // Fifth attempt crosses the data threshold.
        store
            .record_attempt(SkillCategory::Listening, "x", false)
            .unwrap();
        let weak = engine.identify_weak_areas();
        assert_eq!(weak.len(), 1);
        assert_eq!(weak[0].category, SkillCategory::Listening);
    }

    #[test]
    fn test_weak_areas_sorted_ascending() {
        let (store, engine) = fresh_engine(ContentCatalog::default());
        for i in 0..10 {
            store
                .record_attempt(SkillCategory::Listening, "x", i < 4)
                .unwrap(); // 0.4
            store
                .record_attempt(SkillCategory::Spelling, "y", i < 2)
                .unwrap(); // 0.2
        }

        let weak = engine.identify_weak_areas();
        assert_eq!(weak.len(), 2);
        assert_eq!(weak[0].category, SkillCategory::Spelling);
        assert!(weak[0].accuracy <= weak[1].accuracy);
    }

    #[test]
    fn test_suggest_next_game_targets_weakest() {
        let (store, engine) = fresh_engine(ContentCatalog::default());
        for i in 0..10 {
            store
                .record_attempt(SkillCategory::Listening, "x", i < 3)
                .unwrap();
        }
        let games = engine.suggest_next_game();
        assert_eq!(games, vec![ActivityId::SoundSafari]);
    }

    #[test]
    fn test_suggest_next_game_falls_back_to_least_practiced() {
        let (store, engine) = fresh_engine(ContentCatalog::default());
        // Plenty of good practice everywhere except phrases.
        for category in [
            SkillCategory::Alphabet,
            SkillCategory::Vocabulary,
            SkillCategory::Listening,
            SkillCategory::Spelling,
        ] {
            for _ in 0..8 {
                store.record_attempt(category, "x", true).unwrap();
            }
        }
        let games = engine.suggest_next_game();
        assert_eq!(games, vec![ActivityId::PhrasePainter]);
    }

    #[test]
    fn test_learning_path_excludes_mastered_categories() {
        let (store, engine) = fresh_engine(ContentCatalog::default());
        // Drive vocabulary to level 3.
        for _ in 0..50 {
            store
                .record_attempt(SkillCategory::Vocabulary, "w", true)
                .unwrap();
        }

        let path = engine.generate_learning_path();
        assert_eq!(path.len(), SkillCategory::ALL.len() - 1);
        assert!(path.iter().all(|e| e.category != SkillCategory::Vocabulary));
        assert!(path
            .iter()
            .all(|e| !e.recommended_games.is_empty()));
    }

    #[test]
    fn test_velocity_handles_empty_everything() {
        let (_, engine) = fresh_engine(ContentCatalog::default());
        let report = engine.analyze_learning_velocity(SkillCategory::Phrases, 7);
        assert_eq!(report.attempts_per_day, 0.0);
        assert_eq!(report.current_accuracy, 0.0);
        assert_eq!(report.mastery_rate, 0.0);
    }

    #[test]
    fn test_velocity_math() {
        let catalog = ContentCatalog::new(vec![
            ContentItem::new("a", SkillCategory::Alphabet, Difficulty::Beginner),
            ContentItem::new("b", SkillCategory::Alphabet, Difficulty::Beginner),
            ContentItem::new("c", SkillCategory::Alphabet, Difficulty::Beginner),
            ContentItem::new("d", SkillCategory::Alphabet, Difficulty::Beginner),
        ]);
        let (store, engine) = fresh_engine(catalog);

        for _ in 0..14 {
            store
                .record_attempt(SkillCategory::Alphabet, "a", true)
                .unwrap();
        }
        store
            .mark_item_mastered(SkillCategory::Alphabet, "a")
            .unwrap();

        let report = engine.analyze_learning_velocity(SkillCategory::Alphabet, 7);
        assert!((report.attempts_per_day - 2.0).abs() < f64::EPSILON);
        assert!((report.mastery_rate - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hint_reflects_familiarity() {
        let (store, engine) = fresh_engine(ContentCatalog::default());

        let new_hint = engine.get_personalized_hint(SkillCategory::Alphabet, "z");
        assert!(new_hint.contains("new"));

        store.record_review("z", 4).unwrap();
        let seen_hint = engine.get_personalized_hint(SkillCategory::Alphabet, "z");
        assert_ne!(new_hint, seen_hint);
    }

    #[test]
    fn test_prediction_uninformative_prior() {
        let (_, engine) = fresh_engine(ContentCatalog::default());
        for difficulty in [
            Difficulty::Beginner,
            Difficulty::Intermediate,
            Difficulty::Advanced,
        ] {
            assert_eq!(
                engine.predict_success_probability(SkillCategory::Vocabulary, difficulty),
                0.5
            );
        }
    }

    #[test]
    fn test_prediction_monotone_in_difficulty() {
        let (store, engine) = fresh_engine(ContentCatalog::default());
        for i in 0..20 {
            store
                .record_attempt(SkillCategory::Vocabulary, "w", i % 4 != 0)
                .unwrap();
        }

        let beginner =
            engine.predict_success_probability(SkillCategory::Vocabulary, Difficulty::Beginner);
        let intermediate =
            engine.predict_success_probability(SkillCategory::Vocabulary, Difficulty::Intermediate);
        let advanced =
            engine.predict_success_probability(SkillCategory::Vocabulary, Difficulty::Advanced);

        assert!(beginner >= intermediate);
        assert!(intermediate >= advanced);
        for p in [beginner, intermediate, advanced] {
            assert!((0.0..=1.0).contains(&p));
        }
    }
}
