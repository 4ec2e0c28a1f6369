//! Profile Validation and Sanitization
//!
//! The pass/fail + sanitize contract guarding the storage boundary. Every
//! load and every save goes through here: `validate` rejects structurally
//! invalid profiles, `sanitize` clamps numeric fields back into range and
//! recomputes derived values so a slightly damaged profile can still be
//! accepted.

use crate::error::{CoreError, CoreResult};
use crate::profile::LearnerProfile;
use crate::types::MIN_EASE_FACTOR;

/// Checks the structural invariants of a profile.
///
/// Returns the first violation found; the profile is not modified.
pub fn validate(profile: &LearnerProfile) -> CoreResult<()> {
    if profile.profile_id.is_empty() {
        return Err(CoreError::Validation("empty profile id".to_string()));
    }
    if !LearnerProfile::version_supported(&profile.version) {
        return Err(CoreError::Validation(format!(
            "unsupported profile version: {}",
            profile.version
        )));
    }

    for (category, skill) in &profile.skills {
        if skill.correct_attempts > skill.total_attempts {
            return Err(CoreError::Validation(format!(
                "{}: correct attempts {} exceed total {}",
                category.as_str(),
                skill.correct_attempts,
                skill.total_attempts
            )));
        }
        if !skill.accuracy.is_finite() || !(0.0..=1.0).contains(&skill.accuracy) {
            return Err(CoreError::Validation(format!(
                "{}: accuracy {} out of range",
                category.as_str(),
                skill.accuracy
            )));
        }
    }

    for (item_id, entry) in &profile.srs_data {
        if !entry.ease_factor.is_finite() || entry.ease_factor < MIN_EASE_FACTOR {
            return Err(CoreError::Validation(format!(
                "srs entry {item_id}: ease factor {} below floor",
                entry.ease_factor
            )));
        }
        if entry.interval == 0 {
            return Err(CoreError::Validation(format!(
                "srs entry {item_id}: zero interval"
            )));
        }
    }

    for (activity, record) in &profile.game_history {
        if (record.best_score as u64) > record.total_score && record.plays > 0 {
            return Err(CoreError::Validation(format!(
                "{}: best score {} exceeds total {}",
                activity.as_str(),
                record.best_score,
                record.total_score
            )));
        }
        if record.stars > 3 {
            return Err(CoreError::Validation(format!(
                "{}: star grade {} out of range",
                activity.as_str(),
                record.stars
            )));
        }
    }

    Ok(())
}

/// Clamps out-of-range numerics and recomputes derived fields.
///
/// Applied to loaded profiles before validation so recoverable damage
/// (NaN accuracy, ease below the floor, drifted averages) does not force a
/// full reset.
pub fn sanitize(mut profile: LearnerProfile) -> LearnerProfile {
    for skill in profile.skills.values_mut() {
        if skill.correct_attempts > skill.total_attempts {
            skill.correct_attempts = skill.total_attempts;
        }
        skill.recompute_accuracy();
    }

    for entry in profile.srs_data.values_mut() {
        if !entry.ease_factor.is_finite() || entry.ease_factor < MIN_EASE_FACTOR {
            entry.ease_factor = MIN_EASE_FACTOR;
        }
        if entry.interval == 0 {
            entry.interval = 1;
        }
    }

    for record in profile.game_history.values_mut() {
        if record.plays > 0 {
            record.average_score = (record.total_score / record.plays as u64) as u32;
        } else {
            record.average_score = 0;
        }
        record.stars = record.stars.min(3);
    }

    profile
}
