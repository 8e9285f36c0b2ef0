use crate::forecast::config::SeasonalCalendar;

/// Additive seat adjustment for the enrollment cycle position of `month` (1-12).
pub fn seasonal_adjustment(month: u32, calendar: &SeasonalCalendar) -> i32 {
    if month == calendar.graduation_month {
        calendar.graduation_adjustment
    } else if month == calendar.enrollment_month {
        calendar.enrollment_adjustment
    } else if calendar.stable_months.contains(&month) {
        calendar.stable_adjustment
    } else {
        0
    }
}
