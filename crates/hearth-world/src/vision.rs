//! Vision helpers.
//!
//! One rule, applied identically everywhere visibility is checked: at
//! night the vision radius is scaled down by the night-vision percentage
//! (default 60%), floored at one cell. Every visibility-dependent action
//! and every perception build must go through [`effective_vision`].

use hearth_types::TimeOfDay;

/// Default night-vision scaling, in percent of the daytime radius.
pub const DEFAULT_NIGHT_VISION_PERCENT: u32 = 60;

/// The vision radius in effect for a time of day.
///
/// Daytime returns `base` unchanged; night returns
/// `max(1, base * night_percent / 100)`.
pub const fn effective_vision(base: u32, time_of_day: TimeOfDay, night_percent: u32) -> u32 {
    match time_of_day {
        TimeOfDay::Morning | TimeOfDay::Afternoon | TimeOfDay::Evening => base,
        TimeOfDay::Night => {
            let scaled = match base.checked_mul(night_percent) {
                Some(product) => product / 100,
                None => base,
            };
            if scaled < 1 { 1 } else { scaled }
        }
    }
}
