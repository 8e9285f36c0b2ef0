use crate::forecast::config::AttractivenessConfig;
use crate::forecast::domain::FacilityProfile;

const MAX_RATING: f64 = 5.0;

/// Desirability of a facility in `[0, 1]`, used to scale how much regional demand it absorbs.
///
/// Six sub-scores (rating, review popularity, evaluation grade, premium status, feature richness
/// and staffing ratio) are each clamped to `[0, 1]`, weighted, and the sum clamped again.
pub fn calculate_attractiveness(profile: &FacilityProfile, config: &AttractivenessConfig) -> f64 {
    let weights = &config.weights;

    let rating = unit(profile.rating / MAX_RATING);
    let reviews = capped_share(profile.review_count as usize, config.review_cap);
    let evaluation = unit(
        profile
            .evaluation_grade
            .map_or(config.neutral_score, |grade| grade.score()),
    );
    let premium = if profile.is_premium { 1.0 } else { 0.0 };
    let features = capped_share(profile.features.len(), config.feature_cap);
    let staffing = staffing_score(profile, config);

    unit(
        weights.rating * rating
            + weights.reviews * reviews
            + weights.evaluation * evaluation
            + weights.premium * premium
            + weights.features * features
            + weights.staffing * staffing,
    )
}

fn staffing_score(profile: &FacilityProfile, config: &AttractivenessConfig) -> f64 {
    let enrolled = profile.capacity.current;
    match profile.teacher_count {
        Some(teachers) if teachers > 0 && enrolled > 0 => {
            let ratio = f64::from(teachers) / f64::from(enrolled);
            unit(ratio / config.ideal_staff_ratio)
        }
        _ => unit(config.neutral_score),
    }
}

fn capped_share(count: usize, cap: u32) -> f64 {
    if cap == 0 {
        return 0.0;
    }
    let cap = cap as usize;
    count.min(cap) as f64 / cap as f64
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
