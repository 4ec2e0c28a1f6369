//! Common Types and Constants
//!
//! Closed enumerations for skill categories, difficulty tiers, and activity
//! identifiers, plus the static activity-to-category mapping table and the
//! tuning constants shared across modules.

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Ease factor assigned to an item on its first review
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Hard floor for the ease factor; prevents runaway interval collapse
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Interval (days) at which the mastery curve saturates
pub const MASTERY_INTERVAL_CAP: f64 = 30.0;

/// Minimum attempts before a category is judged at all
pub const WEAK_AREA_MIN_ATTEMPTS: u32 = 5;

/// Accuracy below this marks a category as a weak area
pub const WEAK_AREA_ACCURACY: f64 = 0.6;

/// Skill level at which a category counts as mastered
pub const MASTERY_LEVEL: u32 = 3;

// ==================== Skill Categories ====================

/// A learning domain tracked independently in the skill ledger.
///
/// The set is closed: adding a category is a data-model change, not a
/// runtime event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkillCategory {
    Alphabet,
    Vocabulary,
    Phrases,
    Listening,
    Spelling,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 5] = [
        SkillCategory::Alphabet,
        SkillCategory::Vocabulary,
        SkillCategory::Phrases,
        SkillCategory::Listening,
        SkillCategory::Spelling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::Alphabet => "alphabet",
            SkillCategory::Vocabulary => "vocabulary",
            SkillCategory::Phrases => "phrases",
            SkillCategory::Listening => "listening",
            SkillCategory::Spelling => "spelling",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "alphabet" => Some(SkillCategory::Alphabet),
            "vocabulary" => Some(SkillCategory::Vocabulary),
            "phrases" => Some(SkillCategory::Phrases),
            "listening" => Some(SkillCategory::Listening),
            "spelling" => Some(SkillCategory::Spelling),
            _ => None,
        }
    }
}

// ==================== Difficulty ====================

/// Content difficulty tier recommended to a learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "beginner" => Some(Difficulty::Beginner),
            "intermediate" => Some(Difficulty::Intermediate),
            "advanced" => Some(Difficulty::Advanced),
            _ => None,
        }
    }

    /// Rank used when comparing tiers (beginner lowest).
    pub fn rank(&self) -> u8 {
        match self {
            Difficulty::Beginner => 0,
            Difficulty::Intermediate => 1,
            Difficulty::Advanced => 2,
        }
    }
}

// ==================== Activities ====================

/// A playable activity in the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityId {
    LetterMatch,
    SoundSafari,
    WordBuilder,
    FlashDash,
    PhrasePainter,
    EchoChamber,
}

impl ActivityId {
    pub const ALL: [ActivityId; 6] = [
        ActivityId::LetterMatch,
        ActivityId::SoundSafari,
        ActivityId::WordBuilder,
        ActivityId::FlashDash,
        ActivityId::PhrasePainter,
        ActivityId::EchoChamber,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityId::LetterMatch => "letterMatch",
            ActivityId::SoundSafari => "soundSafari",
            ActivityId::WordBuilder => "wordBuilder",
            ActivityId::FlashDash => "flashDash",
            ActivityId::PhrasePainter => "phrasePainter",
            ActivityId::EchoChamber => "echoChamber",
        }
    }
}

/// Static activity-to-category table.
///
/// Exhaustive by construction: a new activity will not compile until it is
/// mapped here.
pub fn activity_category(activity: ActivityId) -> SkillCategory {
    match activity {
        ActivityId::LetterMatch => SkillCategory::Alphabet,
        ActivityId::SoundSafari => SkillCategory::Listening,
        ActivityId::WordBuilder => SkillCategory::Vocabulary,
        ActivityId::FlashDash => SkillCategory::Vocabulary,
        ActivityId::PhrasePainter => SkillCategory::Phrases,
        ActivityId::EchoChamber => SkillCategory::Spelling,
    }
}

/// All activities feeding a given category.
pub fn activities_for_category(category: SkillCategory) -> Vec<ActivityId> {
    ActivityId::ALL
        .iter()
        .copied()
        .filter(|a| activity_category(*a) == category)
        .collect()
}

// ==================== Content ====================

/// A learnable item (letter, word, or phrase) offered by the content packs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub category: SkillCategory,
    pub difficulty: Difficulty,
}

impl ContentItem {
    pub fn new(id: impl Into<String>, category: SkillCategory, difficulty: Difficulty) -> Self {
        Self {
            id: id.into(),
            category,
            difficulty,
        }
    }
}

/// The content roster the recommendation engine works against.
///
/// Versioned alongside the content packs, not generated by this crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentCatalog {
    pub items: Vec<ContentItem>,
}

impl ContentCatalog {
    pub fn new(items: Vec<ContentItem>) -> Self {
        Self { items }
    }

    pub fn items_in(&self, category: SkillCategory) -> Vec<&ContentItem> {
        self.items.iter().filter(|i| i.category == category).collect()
    }

    pub fn item_ids_in(&self, category: SkillCategory) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| i.category == category)
            .map(|i| i.id.clone())
            .collect()
    }
}

// ==================== Tests ====================
