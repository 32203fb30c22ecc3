//! The composite scoring engine (§4.2): recency decay, project match, full
//! text rank, and semantic similarity, combined under one of two weight
//! profiles and boosted for knowledge types.

use crate::model::KnowledgeType;

/// Exponential recency half-life-ish time constant (τ), in hours, as
/// suggested in §4.2.
pub const RECENCY_TAU_HOURS: f64 = 72.0;

/// The four independent signals that feed the composite score, each
/// normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Signals {
    pub recency: f64,
    pub project_match: f64,
    pub fts: f64,
    pub semantic: f64,
}

/// A weight profile assigning relative importance to each signal. Weights
/// are not required to sum to 1; the composite is clamped afterward.
#[derive(Debug, Clone, Copy)]
pub struct WeightProfile {
    pub recency: f64,
    pub project_match: f64,
    pub fts: f64,
    pub semantic: f64,
}

/// Favors semantic + full-text signals, used by hybrid/keyword search
/// (§4.2, §4.4).
pub const SEARCH_WEIGHTS: WeightProfile = WeightProfile {
    recency: 0.10,
    project_match: 0.10,
    fts: 0.35,
    semantic: 0.45,
};

/// Favors recency + project match, used by smart-context assembly without a
/// query (§4.2, §4.4).
pub const CONTEXT_WEIGHTS: WeightProfile = WeightProfile {
    recency: 0.45,
    project_match: 0.35,
    fts: 0.10,
    semantic: 0.10,
};

/// Per-knowledge-type composite-score multiplier, applied after weighting.
/// Ordinary (non-knowledge) observations get a boost of exactly `1.0`.
#[must_use]
pub fn knowledge_type_boost(knowledge_type: Option<KnowledgeType>) -> f64 {
    match knowledge_type {
        None => 1.0,
        Some(KnowledgeType::Decision) => 1.35,
        Some(KnowledgeType::Constraint) => 1.3,
        Some(KnowledgeType::Heuristic) => 1.25,
        Some(KnowledgeType::Rejected) => 1.15,
    }
}

/// Monotone recency decay: `exp(-age_hours / τ)`, clamped to `[0, 1]`.
/// Negative ages (clock skew) are treated as zero age. Epoch values are
/// seconds, matching every `created_at_epoch`/`now_epoch` produced via
/// `chrono::Utc::now().timestamp()` at the call sites.
#[must_use]
pub fn recency_score(now_epoch: i64, created_at_epoch: i64) -> f64 {
    let age_secs = (now_epoch - created_at_epoch).max(0) as f64;
    let age_hours = age_secs / (60.0 * 60.0);
    (-age_hours / RECENCY_TAU_HOURS).exp().clamp(0.0, 1.0)
}

/// `1.0` if `observation_project` exactly matches `query_project`
/// (or no project filter was given), `0.0` otherwise.
#[must_use]
pub fn project_match_score(observation_project: &str, query_project: Option<&str>) -> f64 {
    match query_project {
        Some(qp) if qp == observation_project => 1.0,
        Some(_) => 0.0,
        None => 1.0,
    }
}

/// Normalize a raw full-text rank (typically negative, more negative =
/// better, as SQLite FTS5's `bm25()` returns) into `[0, 1]`.
#[must_use]
pub fn fts_score(raw_rank: f64) -> f64 {
    // bm25() scores are <= 0 with lower (more negative) meaning a better
    // match; fold the unbounded tail smoothly into [0, 1).
    let positive_strength = (-raw_rank).max(0.0);
    (positive_strength / (positive_strength + 1.0)).clamp(0.0, 1.0)
}

/// Clamp a cosine similarity to `[0, 1]`, per §4.2 (`max(0, cosine)`).
#[must_use]
pub fn semantic_score(cosine: f64) -> f64 {
    cosine.max(0.0).min(1.0)
}

/// Compute the composite score for a set of signals under a weight profile,
/// multiplied by the knowledge-type boost, clamped to `[0, 1]`.
#[must_use]
pub fn composite_score(signals: Signals, profile: WeightProfile, knowledge_type: Option<KnowledgeType>) -> f64 {
    let raw = profile.recency * signals.recency
        + profile.project_match * signals.project_match
        + profile.fts * signals.fts
        + profile.semantic * signals.semantic;
    (raw * knowledge_type_boost(knowledge_type)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoring_is_always_in_unit_interval() {
        let signals = Signals { recency: 1.0, project_match: 1.0, fts: 1.0, semantic: 1.0 };
        let score = composite_score(signals, SEARCH_WEIGHTS, Some(KnowledgeType::Decision));
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn project_match_scores_higher_than_mismatch_all_else_equal() {
        let matching = project_match_score("demo", Some("demo"));
        let mismatching = project_match_score("demo", Some("other"));
        assert!(matching >= mismatching);

        let mut signals = Signals { recency: 0.5, project_match: matching, fts: 0.5, semantic: 0.5 };
        let score_match = composite_score(signals, CONTEXT_WEIGHTS, None);
        signals.project_match = mismatching;
        let score_mismatch = composite_score(signals, CONTEXT_WEIGHTS, None);
        assert!(score_match >= score_mismatch);
    }

    #[test]
    fn recency_decays_toward_zero_as_age_grows() {
        let now = 1_000_000_000_i64;
        let fresh = recency_score(now, now);
        let old = recency_score(now, now - 1000 * 60 * 60 * 24 * 30);
        assert!(fresh > old);
        assert!((0.0..=1.0).contains(&fresh));
        assert!((0.0..=1.0).contains(&old));
    }

    #[test]
    fn negative_cosine_clamps_to_zero() {
        assert_eq!(semantic_score(-0.5), 0.0);
        assert_eq!(semantic_score(0.9), 0.9);
        assert_eq!(semantic_score(1.5), 1.0);
    }

    #[test]
    fn knowledge_observations_are_boosted_over_ordinary_ones() {
        assert!(knowledge_type_boost(Some(KnowledgeType::Decision)) > knowledge_type_boost(None));
    }
}
