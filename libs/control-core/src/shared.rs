//! State shared between the input tick context and the control loop.
//!
//! The tick context is the sole producer, the control loop the sole
//! consumer. Instead of bare globals guarded by convention, the boundary is
//! a struct whose only producer-side operations are `publish_*` and whose
//! only consumer-side operations are `take_*` (read-and-clear). Every field
//! is a single atomic, so no read can tear even when the producer runs at
//! interrupt priority.
//!
//! A `take_*` clears the change marker before loading the value, so a
//! publish racing the take is never lost: it re-raises the marker and the
//! next take observes the newer value.

use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};

pub struct SharedInputs {
    volt_position: AtomicI32,
    volt_changed: AtomicBool,
    curr_position: AtomicI32,
    curr_changed: AtomicBool,
    output_enabled: AtomicBool,
    output_changed: AtomicBool,
}

impl SharedInputs {
    pub const fn new() -> Self {
        Self {
            volt_position: AtomicI32::new(0),
            volt_changed: AtomicBool::new(false),
            curr_position: AtomicI32::new(0),
            curr_changed: AtomicBool::new(false),
            output_enabled: AtomicBool::new(false),
            output_changed: AtomicBool::new(false),
        }
    }

    // Producer side (tick context only).

    pub fn publish_voltage_position(&self, position: i32) {
        self.volt_position.store(position, Ordering::SeqCst);
        self.volt_changed.store(true, Ordering::SeqCst);
    }

    pub fn publish_current_position(&self, position: i32) {
        self.curr_position.store(position, Ordering::SeqCst);
        self.curr_changed.store(true, Ordering::SeqCst);
    }

    pub fn publish_output_enabled(&self, enabled: bool) {
        self.output_enabled.store(enabled, Ordering::SeqCst);
        self.output_changed.store(true, Ordering::SeqCst);
    }

    // Consumer side (control loop only).

    /// Voltage-set encoder position, if it moved since the last take.
    pub fn take_voltage_position(&self) -> Option<i32> {
        if self.volt_changed.swap(false, Ordering::SeqCst) {
            Some(self.volt_position.load(Ordering::SeqCst))
        } else {
            None
        }
    }

    /// Current-set encoder position, if it moved since the last take.
    pub fn take_current_position(&self) -> Option<i32> {
        if self.curr_changed.swap(false, Ordering::SeqCst) {
            Some(self.curr_position.load(Ordering::SeqCst))
        } else {
            None
        }
    }

    /// The debounced output-enable value, if the button toggled it since
    /// the last take.
    pub fn take_output_event(&self) -> Option<bool> {
        if self.output_changed.swap(false, Ordering::SeqCst) {
            Some(self.output_enabled.load(Ordering::SeqCst))
        } else {
            None
        }
    }

    /// Current enable value without consuming the change marker.
    pub fn output_enabled(&self) -> bool {
        self.output_enabled.load(Ordering::SeqCst)
    }
}

impl Default for SharedInputs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_is_read_and_clear() {
        let shared = SharedInputs::new();
        assert_eq!(shared.take_voltage_position(), None);

        shared.publish_voltage_position(3);
        assert_eq!(shared.take_voltage_position(), Some(3));
        assert_eq!(shared.take_voltage_position(), None);
    }

    #[test]
    fn later_publish_wins() {
        let shared = SharedInputs::new();
        shared.publish_current_position(1);
        shared.publish_current_position(-4);
        assert_eq!(shared.take_current_position(), Some(-4));
    }

    #[test]
    fn output_event_and_level_are_distinct() {
        let shared = SharedInputs::new();
        assert!(!shared.output_enabled());
        assert_eq!(shared.take_output_event(), None);

        shared.publish_output_enabled(true);
        assert!(shared.output_enabled());
        assert_eq!(shared.take_output_event(), Some(true));
        assert_eq!(shared.take_output_event(), None);
        // Level stays readable after the event is consumed.
        assert!(shared.output_enabled());
    }

    #[test]
    fn channels_do_not_cross_talk() {
        let shared = SharedInputs::new();
        shared.publish_voltage_position(7);
        assert_eq!(shared.take_current_position(), None);
        assert_eq!(shared.take_output_event(), None);
        assert_eq!(shared.take_voltage_position(), Some(7));
    }
}
