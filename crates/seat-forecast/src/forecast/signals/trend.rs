use crate::forecast::domain::OccupancySnapshot;

const SECONDS_PER_WEEK: f64 = 7.0 * 24.0 * 60.0 * 60.0;

/// Weekly vacancy velocity across the snapshot history.
///
/// Positive values mean seats are opening up, negative values mean the facility is filling.
/// Histories shorter than two observations carry no signal and yield `0.0`. The elapsed span is
/// floored at one week so same-day snapshots do not inflate the rate.
pub fn calculate_trend(snapshots: &[OccupancySnapshot]) -> f64 {
    if snapshots.len() < 2 {
        return 0.0;
    }

    let mut ordered: Vec<&OccupancySnapshot> = snapshots.iter().collect();
    ordered.sort_by_key(|snapshot| snapshot.observed_at);

    let total_delta: i64 = ordered
        .windows(2)
        .map(|pair| pair[1].vacancy() - pair[0].vacancy())
        .sum();

    let first = ordered[0].observed_at;
    let last = ordered[ordered.len() - 1].observed_at;
    let elapsed_seconds = (last - first).num_milliseconds() as f64 / 1000.0;
    let weeks = (elapsed_seconds / SECONDS_PER_WEEK).max(1.0);

    total_delta as f64 / weeks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::domain::CapacityCounts;
    use chrono::{Duration, TimeZone, Utc};

    fn snapshot(total: u32, current: u32, days_ago: i64) -> OccupancySnapshot {
        let anchor = Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap();
        OccupancySnapshot::new(
            CapacityCounts::new(total, current, 0),
            anchor - Duration::days(days_ago),
        )
    }

    #[test]
    fn short_histories_have_no_trend() {
        assert_eq!(calculate_trend(&[]), 0.0);
        assert_eq!(calculate_trend(&[snapshot(100, 80, 0)]), 0.0);
    }

    #[test]
    fn detects_opening_seats() {
        let history = [
            snapshot(100, 90, 14),
            snapshot(100, 80, 7),
            snapshot(100, 70, 0),
        ];
        let trend = calculate_trend(&history);
        assert!(trend > 0.0);
        assert!((trend - 10.0).abs() < 1e-9, "20 seats over two weeks");
    }

    #[test]
    fn detects_filling_facility() {
        let history = [
            snapshot(100, 70, 14),
            snapshot(100, 80, 7),
            snapshot(100, 90, 0),
        ];
        assert!(calculate_trend(&history) < 0.0);
    }

    #[test]
    fn input_order_does_not_matter() {
        let newest_first = [
            snapshot(100, 70, 0),
            snapshot(100, 80, 7),
            snapshot(100, 90, 14),
        ];
        assert!((calculate_trend(&newest_first) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn same_day_snapshots_use_one_week_floor() {
        let history = [snapshot(50, 45, 0), snapshot(50, 40, 0)];
        assert_eq!(calculate_trend(&history), 5.0);
    }
}
