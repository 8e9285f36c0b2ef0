use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use seat_forecast::forecast::signals::{
    calculate_attractiveness, calculate_demand_factor, calculate_graduation, calculate_trend,
    determine_confidence, EvidenceFlags,
};
use seat_forecast::forecast::{
    compose_prediction, AgeCohortClass, AttractivenessConfig, CapacityCounts, DemandBounds,
    EvaluationGrade, FacilityId, FacilityProfile, ForecastConfig, GraduationSchedule,
    OccupancySnapshot, RegionalDemand,
};

const NEUTRAL_MONTHS: [u32; 5] = [7, 8, 10, 11, 12];

fn at(month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, month, day, 9, 0, 0).unwrap()
}

fn snapshot_strategy() -> impl Strategy<Value = OccupancySnapshot> {
    (1u32..200, 0u32..250, 0u32..20, 0i64..365).prop_map(|(total, current, waiting, days)| {
        OccupancySnapshot::new(
            CapacityCounts::new(total, current, waiting),
            at(1, 1) + Duration::days(days),
        )
    })
}

fn grade_strategy() -> impl Strategy<Value = Option<EvaluationGrade>> {
    prop_oneof![
        Just(None),
        Just(Some(EvaluationGrade::A)),
        Just(Some(EvaluationGrade::B)),
        Just(Some(EvaluationGrade::C)),
        Just(Some(EvaluationGrade::D)),
    ]
}

fn cohort_strategy() -> impl Strategy<Value = AgeCohortClass> {
    (0u32..6, 0u32..30, 0u32..35).prop_map(|(age, capacity, current)| {
        AgeCohortClass::new(format!("age {age}"), capacity, current)
    })
}

prop_compose! {
    fn profile_strategy()(
        total in 0u32..300,
        current in 0u32..350,
        waiting in 0u32..40,
        rating in 0.0f64..=5.0,
        review_count in 0u32..500,
        grade in grade_strategy(),
        is_premium in any::<bool>(),
        feature_count in 0usize..15,
        teacher_count in proptest::option::of(0u32..40),
        cohorts in proptest::collection::vec(cohort_strategy(), 0..5),
    ) -> FacilityProfile {
        let mut profile = FacilityProfile::new(
            FacilityId::new("fac-prop"),
            CapacityCounts::new(total, current, waiting),
        );
        profile.rating = rating;
        profile.review_count = review_count;
        profile.evaluation_grade = grade;
        profile.is_premium = is_premium;
        profile.features = (0..feature_count).map(|index| format!("feature-{index}")).collect();
        profile.teacher_count = teacher_count;
        profile.age_cohorts = cohorts;
        profile
    }
}

fn demand_strategy() -> impl Strategy<Value = Option<RegionalDemand>> {
    proptest::option::of((0u64..100_000, 0u64..500).prop_map(
        |(child_population, facility_count)| RegionalDemand {
            child_population,
            facility_count,
        },
    ))
}

proptest! {
    #[test]
    fn trend_is_zero_without_two_snapshots(
        snapshots in proptest::collection::vec(snapshot_strategy(), 0..2),
    ) {
        prop_assert_eq!(calculate_trend(&snapshots), 0.0);
    }

    #[test]
    fn score_and_prediction_stay_in_range(
        profile in profile_strategy(),
        snapshots in proptest::collection::vec(snapshot_strategy(), 0..12),
        month in 1u32..=12,
        demand in demand_strategy(),
    ) {
        let outcome = compose_prediction(
            &ForecastConfig::default(),
            &profile,
            &snapshots,
            at(month, 15),
            demand.as_ref(),
        );
        prop_assert!(outcome.overall_score <= 100);
        prop_assert_eq!(outcome.by_age_class.len(), profile.age_cohorts.len());
        let magnitudes: Vec<u32> = outcome
            .factors
            .iter()
            .map(|factor| factor.impact.unsigned_abs())
            .collect();
        prop_assert!(magnitudes.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn fully_occupied_facilities_forecast_nothing(
        total in 1u32..200,
        over in 0u32..10,
        history in proptest::collection::vec((0u32..10, 0i64..60), 0..8),
        waiting in 0u32..20,
        cohort_age in 0u32..6,
        month in 1u32..=12,
    ) {
        let mut profile = FacilityProfile::new(
            FacilityId::new("fac-full"),
            CapacityCounts::new(total, total + over, waiting),
        );
        profile.age_cohorts = vec![AgeCohortClass::new(
            format!("age {cohort_age} years"),
            total,
            total,
        )];
        let snapshots: Vec<OccupancySnapshot> = history
            .into_iter()
            .map(|(extra, days)| {
                OccupancySnapshot::new(
                    CapacityCounts::new(total, total + extra, 0),
                    at(1, 1) + Duration::days(days),
                )
            })
            .collect();

        let outcome = compose_prediction(
            &ForecastConfig::default(),
            &profile,
            &snapshots,
            at(month, 15),
            None,
        );
        prop_assert_eq!(outcome.predicted_vacancies, 0);
        prop_assert_eq!(outcome.overall_score, 0);
        prop_assert!(outcome.factors.iter().all(|factor| factor.impact <= 0));
        prop_assert!(outcome
            .by_age_class
            .iter()
            .all(|class| class.predicted_vacancy == 0));
    }

    #[test]
    fn single_snapshot_in_neutral_month_keeps_current_vacancy(
        total in 0u32..300,
        current in 0u32..300,
        month_index in 0usize..NEUTRAL_MONTHS.len(),
        rating in 0.0f64..=5.0,
    ) {
        let mut profile = FacilityProfile::new(
            FacilityId::new("fac-basic"),
            CapacityCounts::new(total, current, 0),
        );
        profile.rating = rating;
        let snapshots = vec![OccupancySnapshot::new(
            CapacityCounts::new(total, current, 0),
            at(1, 5),
        )];

        let outcome = compose_prediction(
            &ForecastConfig::default(),
            &profile,
            &snapshots,
            at(NEUTRAL_MONTHS[month_index], 15),
            None,
        );
        prop_assert_eq!(outcome.predicted_vacancies, profile.current_vacancy());
    }

    #[test]
    fn confidence_never_drops_with_more_evidence(
        count in 0usize..20,
        extra in 0usize..5,
        regional in any::<bool>(),
        cohorts in any::<bool>(),
        min_required in 1usize..6,
    ) {
        let flags = EvidenceFlags { has_regional_data: regional, has_age_cohorts: cohorts };
        let base = determine_confidence(count, flags, min_required);
        prop_assert!(determine_confidence(count + extra, flags, min_required) >= base);
        let richer = EvidenceFlags { has_regional_data: true, has_age_cohorts: true };
        prop_assert!(determine_confidence(count, richer, min_required) >= base);
    }

    #[test]
    fn demand_is_neutral_without_data(capacity in 0u32..500) {
        prop_assert_eq!(calculate_demand_factor(None, capacity, &DemandBounds::default()), 1.0);
    }

    #[test]
    fn demand_stays_within_bounds(demand in demand_strategy(), capacity in 0u32..500) {
        let bounds = DemandBounds::default();
        let factor = calculate_demand_factor(demand.as_ref(), capacity, &bounds);
        prop_assert!((bounds.min_factor..=bounds.max_factor).contains(&factor));
    }

    #[test]
    fn attractiveness_is_a_unit_score(profile in profile_strategy()) {
        let score = calculate_attractiveness(&profile, &AttractivenessConfig::default());
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn graduation_is_zero_outside_the_schedule(
        cohorts in proptest::collection::vec(cohort_strategy(), 0..6),
        month in 7u32..=12,
    ) {
        prop_assert_eq!(calculate_graduation(&cohorts, month, &GraduationSchedule::default()), 0);
    }
}

#[test]
fn rising_vacancy_gives_positive_trend() {
    let snapshots: Vec<OccupancySnapshot> = [(10, 0), (20, 7), (30, 14)]
        .into_iter()
        .map(|(vacancy, day)| {
            OccupancySnapshot::new(
                CapacityCounts::new(100, 100 - vacancy, 0),
                at(2, 1) + Duration::days(day),
            )
        })
        .collect();
    assert!(calculate_trend(&snapshots) > 0.0);

    let reversed: Vec<OccupancySnapshot> = [(30, 0), (20, 7), (10, 14)]
        .into_iter()
        .map(|(vacancy, day)| {
            OccupancySnapshot::new(
                CapacityCounts::new(100, 100 - vacancy, 0),
                at(2, 1) + Duration::days(day),
            )
        })
        .collect();
    assert!(calculate_trend(&reversed) < 0.0);
}

#[test]
fn graduation_follows_the_school_calendar() {
    let cohorts = vec![
        AgeCohortClass::new("age 3", 20, 15),
        AgeCohortClass::new("age 5", 20, 18),
    ];
    let schedule = GraduationSchedule::default();

    assert_eq!(calculate_graduation(&cohorts, 3, &schedule), 18);
    assert_eq!(calculate_graduation(&cohorts, 5, &schedule), 5);
    assert_eq!(calculate_graduation(&cohorts, 7, &schedule), 0);
}
