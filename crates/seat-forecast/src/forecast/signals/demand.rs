use crate::forecast::config::{DemandBounds, NEUTRAL_DEMAND_FACTOR};
use crate::forecast::domain::RegionalDemand;

/// Regional competitive pressure as a bounded multiplier.
///
/// Above `1.0` the region is undersupplied (children per facility exceed this facility's
/// capacity), below `1.0` it is oversupplied. Missing data, a zero facility count or a zero
/// capacity all return [`NEUTRAL_DEMAND_FACTOR`] so absent data never biases the forecast.
pub fn calculate_demand_factor(
    demand: Option<&RegionalDemand>,
    capacity: u32,
    bounds: &DemandBounds,
) -> f64 {
    let Some(demand) = demand else {
        return NEUTRAL_DEMAND_FACTOR;
    };
    if demand.facility_count == 0 || capacity == 0 {
        return NEUTRAL_DEMAND_FACTOR;
    }

    let children_per_facility = demand.child_population as f64 / demand.facility_count as f64;
    let factor = children_per_facility / f64::from(capacity);
    factor.clamp(bounds.min_factor, bounds.max_factor)
}
