use super::round_half_up;
use crate::forecast::config::GraduationSchedule;
use crate::forecast::domain::AgeCohortClass;

/// Sentinel age for class labels that carry no recognizable age.
pub const UNKNOWN_AGE: i32 = -1;

const MAX_AGE_DIGITS: usize = 3;

/// Extracts the child age embedded in a class label.
///
/// Recognizes `"age N"` anywhere in the label (case-insensitive, e.g. `"Sunflower (age 3 years)"`)
/// and the Korean `"만N세"` form. Anything else yields [`UNKNOWN_AGE`]; this never fails.
pub fn parse_age_from_class_name(class_name: &str) -> i32 {
    age_after_keyword(class_name)
        .or_else(|| age_in_korean_form(class_name))
        .unwrap_or(UNKNOWN_AGE)
}

fn age_after_keyword(class_name: &str) -> Option<i32> {
    let lowered = class_name.to_ascii_lowercase();
    let mut search_from = 0;

    while let Some(offset) = lowered[search_from..].find("age") {
        let start = search_from + offset;
        let end = start + "age".len();
        let starts_word = lowered[..start]
            .chars()
            .next_back()
            .map_or(true, |previous| !previous.is_alphanumeric());

        if starts_word {
            if let Some(age) = leading_number(lowered[end..].trim_start()) {
                return Some(age);
            }
        }
        search_from = end;
    }

    None
}

fn age_in_korean_form(class_name: &str) -> Option<i32> {
    class_name.match_indices('만').find_map(|(index, marker)| {
        let rest = &class_name[index + marker.len()..];
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if rest[digits..].starts_with('세') {
            leading_number(rest)
        } else {
            None
        }
    })
}

fn leading_number(text: &str) -> Option<i32> {
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() || digits.len() > MAX_AGE_DIGITS {
        return None;
    }
    digits.parse().ok()
}

/// The cohort with the highest parsed age, first occurrence winning ties.
///
/// Cohorts with unknown ages never qualify, so `None` means no cohort is eligible to graduate.
pub fn oldest_cohort(cohorts: &[AgeCohortClass]) -> Option<(&AgeCohortClass, i32)> {
    let mut oldest: Option<(&AgeCohortClass, i32)> = None;
    for cohort in cohorts {
        let age = cohort.age();
        let best = oldest.map_or(UNKNOWN_AGE, |(_, best)| best);
        if age > best {
            oldest = Some((cohort, age));
        }
    }
    oldest
}

/// Seats expected to open in `month` as the oldest cohort graduates.
pub fn calculate_graduation(
    cohorts: &[AgeCohortClass],
    month: u32,
    schedule: &GraduationSchedule,
) -> u32 {
    let Some((cohort, _)) = oldest_cohort(cohorts) else {
        return 0;
    };
    if cohort.current == 0 {
        return 0;
    }

    let expected = round_half_up(f64::from(cohort.current) * schedule.multiplier(month));
    super::seat_count(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cohorts() -> Vec<AgeCohortClass> {
        vec![
            AgeCohortClass::new("age 0 years", 10, 8),
            AgeCohortClass::new("age 1 years", 15, 12),
            AgeCohortClass::new("age 2 years", 20, 18),
        ]
    }

    #[test]
    fn parses_english_and_korean_labels() {
        assert_eq!(parse_age_from_class_name("age 3 years"), 3);
        assert_eq!(parse_age_from_class_name("Sunflower room (Age 5)"), 5);
        assert_eq!(parse_age_from_class_name("age0"), 0);
        assert_eq!(parse_age_from_class_name("만3세"), 3);
        assert_eq!(parse_age_from_class_name("만0세반"), 0);
    }

    #[test]
    fn unparsable_labels_map_to_unknown() {
        assert_eq!(parse_age_from_class_name("infant room"), UNKNOWN_AGE);
        assert_eq!(parse_age_from_class_name("mixed ages"), UNKNOWN_AGE);
        assert_eq!(parse_age_from_class_name("stage 2"), UNKNOWN_AGE);
        assert_eq!(parse_age_from_class_name("영아반"), UNKNOWN_AGE);
        assert_eq!(parse_age_from_class_name("만세"), UNKNOWN_AGE);
        assert_eq!(parse_age_from_class_name(""), UNKNOWN_AGE);
    }

    #[test]
    fn full_effect_in_proximity_months() {
        let schedule = GraduationSchedule::default();
        for month in 1..=4 {
            assert_eq!(calculate_graduation(&cohorts(), month, &schedule), 18);
        }
    }

    #[test]
    fn decayed_effect_in_decay_months() {
        let schedule = GraduationSchedule::default();
        assert_eq!(calculate_graduation(&cohorts(), 5, &schedule), 5);
        assert_eq!(calculate_graduation(&cohorts(), 6, &schedule), 5);
    }

    #[test]
    fn no_effect_outside_schedule() {
        let schedule = GraduationSchedule::default();
        assert_eq!(calculate_graduation(&cohorts(), 7, &schedule), 0);
        assert_eq!(calculate_graduation(&cohorts(), 10, &schedule), 0);
    }

    #[test]
    fn no_cohorts_or_no_known_ages_yield_zero() {
        let schedule = GraduationSchedule::default();
        assert_eq!(calculate_graduation(&[], 3, &schedule), 0);

        let unlabeled = vec![AgeCohortClass::new("mixed room", 20, 20)];
        assert_eq!(calculate_graduation(&unlabeled, 3, &schedule), 0);
    }

    #[test]
    fn ties_resolve_to_first_occurrence() {
        let cohorts = vec![
            AgeCohortClass::new("age 4 morning", 20, 7),
            AgeCohortClass::new("age 4 afternoon", 20, 15),
        ];
        let (cohort, age) = oldest_cohort(&cohorts).expect("eligible cohort");
        assert_eq!(age, 4);
        assert_eq!(cohort.current, 7);
        assert_eq!(
            calculate_graduation(&cohorts, 3, &GraduationSchedule::default()),
            7
        );
    }
}
