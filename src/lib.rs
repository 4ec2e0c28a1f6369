//! # alphakids-core - Adaptive Instruction Core
//!
//! The decision-making core of the AlphaKids learning app: it decides what
//! a learner sees next and when they should review it again. The
//! presentation layer reports attempt outcomes and reads recommendations;
//! everything stateful flows through the profile store.
//!
//! ## Modules
//!
//! - [`store`] - learner profile store (load/save/record/reset, events)
//! - [`srs`] - pure SM-2-family spaced-repetition scheduling
//! - [`recommend`] - difficulty selection, content sampling, analytics
//! - [`rewards`] - predicate-based achievement evaluation
//! - [`storage`] - synchronous key-value persistence boundary
//! - [`sanitize`] - profile validation and repair at the storage boundary
//! - [`events`] - change-notification events and subscriber channels
//! - [`profile`] - the persisted learner data model
//! - [`types`] - closed category/difficulty/activity enumerations
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use alphakids_core::{
//!     ContentCatalog, MemoryStorage, ProfileStore, RecommendationEngine, RewardEvaluator,
//!     SkillCategory,
//! };
//!
//! let store = Arc::new(ProfileStore::open(Box::new(MemoryStorage::new())));
//! store.record_attempt(SkillCategory::Alphabet, "a", true).unwrap();
//!
//! let engine = RecommendationEngine::new(Arc::clone(&store), ContentCatalog::default());
//! let difficulty = engine.recommended_difficulty(SkillCategory::Alphabet);
//!
//! let rewards = RewardEvaluator::new(Arc::clone(&store));
//! let newly_unlocked = rewards.check_achievements().unwrap();
//! # let _ = (difficulty, newly_unlocked);
//! ```

pub mod error;
pub mod events;
pub mod profile;
pub mod recommend;
pub mod rewards;
pub mod sanitize;
pub mod srs;
pub mod storage;
pub mod store;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use events::{EventBus, ProgressEvent};
pub use profile::{
    ActivityRecord, LearnerProfile, ProfileSettings, SkillRecord, SrsEntry, PROFILE_VERSION,
};
pub use recommend::{LearningPathEntry, RecommendationEngine, VelocityReport, WeakArea};
pub use rewards::{catalog as achievement_catalog, AchievementDef, AchievementProgress, RewardEvaluator};
pub use srs::{DueItem, MAX_QUALITY, PASSING_QUALITY};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{GameStats, ProfileStore, PROFILE_STORAGE_KEY};
pub use types::{
    activities_for_category, activity_category, ActivityId, ContentCatalog, ContentItem,
    Difficulty, SkillCategory,
};
