use crate::predict::PredictError;
use crate::sat::{ObsSet, TrackedObject};
use crate::station::GroundStation;

/// Orbital-mechanics contract used by the update cycle.
///
/// Implementations must be pure functions of their inputs: the scheduler
/// refreshes every object twice per cycle (before and after sink delivery)
/// and relies on both passes producing identical results for a fixed time.
pub trait OrbitEngine {
    /// Derived observational state for `sat` as seen from `observer` at
    /// simulated time `at` (daynum).
    fn propagate(
        &self,
        sat: &TrackedObject,
        observer: &GroundStation,
        at: f64,
    ) -> Result<ObsSet, PredictError>;

    /// Next time the satellite rises above the horizon, searching at most
    /// `horizon_days` ahead of `from`. Returns [`crate::sat::NEVER`] when
    /// no crossing is found within the horizon.
    fn find_next_rise(
        &self,
        sat: &TrackedObject,
        observer: &GroundStation,
        from: f64,
        horizon_days: f64,
    ) -> f64;

    /// Next horizon set time, same bounds and sentinel as
    /// [`OrbitEngine::find_next_rise`].
    fn find_next_set(
        &self,
        sat: &TrackedObject,
        observer: &GroundStation,
        from: f64,
        horizon_days: f64,
    ) -> f64;
}
