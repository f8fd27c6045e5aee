//! Edge detection between consecutive input snapshots.

use crate::types::{Buttons, Event, InputSnapshot, Sticks};
#[cfg(all(not(feature = "skip-analog"), not(feature = "skip-analog-changed")))]
use crate::types::AnalogButtons;

/// Compute the event between `prev` and `cur`.
///
/// Buttons report edges only; sticks and pressures report `cur - prev`
/// wrapped to 8 bits, so a swing from 120 to -120 yields 16.
///
/// ```
/// use ds3_proto::{diff, Buttons, InputSnapshot};
///
/// let prev = InputSnapshot::zeroed();
/// let cur = InputSnapshot { buttons: Buttons::CROSS, ..prev };
///
/// let event = diff(&prev, &cur);
/// assert_eq!(event.button_down, Buttons::CROSS);
/// assert!(event.button_up.is_empty());
/// ```
#[must_use]
pub fn diff(prev: &InputSnapshot, cur: &InputSnapshot) -> Event {
    Event {
        button_down: edges(prev.buttons, cur.buttons),
        button_up: edges(cur.buttons, prev.buttons),
        stick_delta: stick_delta(&prev.sticks, &cur.sticks),
        #[cfg(all(not(feature = "skip-analog"), not(feature = "skip-analog-changed")))]
        analog_delta: analog_delta(&prev.analog, &cur.analog),
    }
}

/// Bits clear in `from` and set in `to`.
#[inline]
fn edges(from: Buttons, to: Buttons) -> Buttons {
    !from & to
}

#[inline]
fn stick_delta(prev: &Sticks, cur: &Sticks) -> Sticks {
    Sticks::new(
        cur.lx.wrapping_sub(prev.lx),
        cur.ly.wrapping_sub(prev.ly),
        cur.rx.wrapping_sub(prev.rx),
        cur.ry.wrapping_sub(prev.ry),
    )
}

#[cfg(all(not(feature = "skip-analog"), not(feature = "skip-analog-changed")))]
#[inline]
fn analog_delta(prev: &AnalogButtons, cur: &AnalogButtons) -> AnalogButtons<i8> {
    let prev = prev.to_array();
    let cur = cur.to_array();
    let mut delta = [0i8; 12];
    for (d, (p, c)) in delta.iter_mut().zip(prev.iter().zip(cur.iter())) {
        *d = c.wrapping_sub(*p) as i8;
    }
    AnalogButtons::from_array(delta)
}
