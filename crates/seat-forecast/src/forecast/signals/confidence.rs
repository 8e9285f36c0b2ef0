use crate::forecast::domain::Confidence;

/// Supplementary evidence sources beyond the snapshot history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvidenceFlags {
    pub has_regional_data: bool,
    pub has_age_cohorts: bool,
}

impl EvidenceFlags {
    fn bonus(self) -> usize {
        usize::from(self.has_regional_data) + usize::from(self.has_age_cohorts)
    }
}

/// Discrete evidence level: each extra source counts as one more snapshot.
pub fn determine_confidence(
    snapshot_count: usize,
    evidence: EvidenceFlags,
    min_required: usize,
) -> Confidence {
    let effective = snapshot_count.saturating_add(evidence.bonus());
    if effective < min_required {
        Confidence::Low
    } else if effective < min_required.saturating_mul(2) {
        Confidence::Medium
    } else {
        Confidence::High
    }
}
