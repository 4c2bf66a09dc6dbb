//! Settings validation with per-field fallback.
//!
//! A bad field never takes the whole document down: the field reverts to its
//! last-good value and the problem is reported once. At startup "last good"
//! is the built-in default.

use std::collections::HashSet;

use super::Settings;

/// Limit beyond which a gap is considered a typo rather than a preference.
const MAX_GAP: u32 = 500;

/// A rejected settings field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("inner_gap {0} exceeds 500, keeping previous value")]
    InnerGapOutOfRange(u32),
    #[error("outer_gap {0} exceeds 500, keeping previous value")]
    OuterGapOutOfRange(u32),
    #[error("empty floating title pattern dropped")]
    EmptyTitlePattern,
    #[error("workspace definition {0:?} has an empty name, dropped")]
    UnnamedWorkspace(uuid::Uuid),
    #[error("duplicate workspace id {0:?} dropped")]
    DuplicateWorkspace(uuid::Uuid),
}

/// Validates a candidate settings value against the last-good one.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Returns the sanitized settings plus every rejection that occurred.
    /// Callers report each rejection once (warn) per spec'd policy.
    pub fn sanitize(mut candidate: Settings, last_good: &Settings) -> (Settings, Vec<ConfigError>) {
        let mut errors = Vec::new();

        if candidate.inner_gap > MAX_GAP {
            errors.push(ConfigError::InnerGapOutOfRange(candidate.inner_gap));
            candidate.inner_gap = last_good.inner_gap;
        }
        if candidate.outer_gap > MAX_GAP {
            errors.push(ConfigError::OuterGapOutOfRange(candidate.outer_gap));
            candidate.outer_gap = last_good.outer_gap;
        }

        let before = candidate.floating_title_patterns.len();
        candidate
            .floating_title_patterns
            .retain(|pattern| !pattern.trim().is_empty());
        for _ in candidate.floating_title_patterns.len()..before {
            errors.push(ConfigError::EmptyTitlePattern);
        }

        let mut seen = HashSet::new();
        candidate.workspaces.retain(|seed| {
            if seed.name.trim().is_empty() {
                errors.push(ConfigError::UnnamedWorkspace(seed.id));
                return false;
            }
            if !seen.insert(seed.id) {
                errors.push(ConfigError::DuplicateWorkspace(seed.id));
                return false;
            }
            true
        });

        (candidate, errors)
    }
}
