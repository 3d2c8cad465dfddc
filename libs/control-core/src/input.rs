//! Front-panel input capture: two quadrature encoders and one pushbutton,
//! sampled once per fixed tick.
//!
//! The decoders are pure state machines over sampled pin levels; the tick
//! context feeds them and publishes the results into [`SharedInputs`], the
//! control loop never touches them directly.

use crate::shared::SharedInputs;

/// Fixed input sampling period. Input responsiveness is governed by this
/// alone, independently of the control loop's refresh cadence.
pub const TICK_PERIOD_MS: u64 = 5;

/// A release only toggles the output when the button was seen asserted for
/// strictly more than this many consecutive polls (4 × 5 ms = 20 ms held).
pub const BUTTON_PRESS_POLLS: u8 = 3;

/// Pin levels of all front-panel inputs captured in a single tick.
///
/// `button_pressed` is the already-inverted reading of the active-low
/// switch (true = pin low = held down).
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelSample {
    pub volt_a_high: bool,
    pub volt_b_high: bool,
    pub curr_a_high: bool,
    pub curr_b_high: bool,
    pub button_pressed: bool,
}

/// Half-resolution quadrature decoder.
///
/// Phase A is level-sampled every tick and only LOW→HIGH transitions count;
/// phase B's level at that same tick gives the direction. Because sampling
/// is tick-quantized rather than edge-triggered, at most one transition per
/// tick can be counted — faster rotation is under-counted. That bound is a
/// deliberate property of the panel design, not a defect; an upgrade to
/// edge interrupts must be made explicitly.
#[derive(Debug, Clone, Copy)]
pub struct QuadratureDecoder {
    position: i32,
    last_a_high: bool,
    changed: bool,
}

impl QuadratureDecoder {
    /// `initial_a_high` is the phase-A level at construction time, so an
    /// encoder idling high does not register a phantom first step.
    pub const fn new(initial_a_high: bool) -> Self {
        Self {
            position: 0,
            last_a_high: initial_a_high,
            changed: false,
        }
    }

    pub fn tick(&mut self, a_high: bool, b_high: bool) {
        if !self.last_a_high && a_high {
            // B low at the rising edge of A = clockwise.
            if b_high {
                self.position -= 1;
            } else {
                self.position += 1;
            }
            self.changed = true;
        }
        self.last_a_high = a_high;
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn take_changed(&mut self) -> bool {
        core::mem::take(&mut self.changed)
    }
}

/// Poll-count debouncer for the active-low output button.
///
/// Asserted polls accumulate; the decision is made on release, so a held
/// button never auto-repeats and a bounce shorter than the threshold is
/// discarded entirely.
#[derive(Debug, Clone, Copy)]
pub struct ButtonDebouncer {
    depressed_polls: u8,
    enabled: bool,
    changed: bool,
}

impl ButtonDebouncer {
    pub const fn new() -> Self {
        Self {
            depressed_polls: 0,
            enabled: false,
            changed: false,
        }
    }

    pub fn tick(&mut self, pressed: bool) {
        if pressed {
            self.depressed_polls = self.depressed_polls.saturating_add(1);
        } else if self.depressed_polls > 0 {
            if self.depressed_polls > BUTTON_PRESS_POLLS {
                self.enabled = !self.enabled;
                self.changed = true;
            }
            self.depressed_polls = 0;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn depressed_polls(&self) -> u8 {
        self.depressed_polls
    }

    pub fn take_changed(&mut self) -> bool {
        core::mem::take(&mut self.changed)
    }
}

impl Default for ButtonDebouncer {
    fn default() -> Self {
        Self::new()
    }
}

/// The whole input capture service: both encoders plus the button.
///
/// Owned exclusively by the tick context. [`InputCapture::tick`] samples,
/// decodes and publishes; nothing here performs I/O beyond consuming the
/// pin levels already read into the [`PanelSample`].
#[derive(Debug)]
pub struct InputCapture {
    volt: QuadratureDecoder,
    curr: QuadratureDecoder,
    button: ButtonDebouncer,
}

impl InputCapture {
    pub const fn new(initial: PanelSample) -> Self {
        Self {
            volt: QuadratureDecoder::new(initial.volt_a_high),
            curr: QuadratureDecoder::new(initial.curr_a_high),
            button: ButtonDebouncer::new(),
        }
    }

    /// Run one 5 ms tick and publish whatever changed into `shared`.
    pub fn tick(&mut self, sample: PanelSample, shared: &SharedInputs) {
        self.volt.tick(sample.volt_a_high, sample.volt_b_high);
        self.curr.tick(sample.curr_a_high, sample.curr_b_high);
        self.button.tick(sample.button_pressed);

        if self.volt.take_changed() {
            shared.publish_voltage_position(self.volt.position());
        }
        if self.curr.take_changed() {
            shared.publish_current_position(self.curr.position());
        }
        if self.button.take_changed() {
            shared.publish_output_enabled(self.button.is_enabled());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spin(dec: &mut QuadratureDecoder, edges: &[(bool, bool)]) {
        for &(a, b) in edges {
            dec.tick(a, b);
        }
    }

    #[test]
    fn rising_edge_with_b_low_increments() {
        let mut dec = QuadratureDecoder::new(false);
        spin(&mut dec, &[(true, false)]);
        assert_eq!(dec.position(), 1);
        assert!(dec.take_changed());
        assert!(!dec.take_changed());
    }

    #[test]
    fn rising_edge_with_b_high_decrements() {
        let mut dec = QuadratureDecoder::new(false);
        spin(&mut dec, &[(true, true)]);
        assert_eq!(dec.position(), -1);
        assert!(dec.take_changed());
    }

    #[test]
    fn only_rising_edges_count() {
        let mut dec = QuadratureDecoder::new(false);
        // high-high-low-low: one rising edge, one falling, steady levels.
        spin(&mut dec, &[(true, false), (true, false), (false, false), (false, true)]);
        assert_eq!(dec.position(), 1);
        // Next rising edge counts again.
        spin(&mut dec, &[(true, false)]);
        assert_eq!(dec.position(), 2);
    }

    #[test]
    fn initial_high_level_is_not_an_edge() {
        let mut dec = QuadratureDecoder::new(true);
        spin(&mut dec, &[(true, false), (true, true)]);
        assert_eq!(dec.position(), 0);
        assert!(!dec.take_changed());
    }

    #[test]
    fn full_detent_cycle_counts_once_per_a_rise() {
        let mut dec = QuadratureDecoder::new(false);
        // Clockwise sequence A/B: 00 -> 10 -> 11 -> 01 -> 00, twice.
        let cycle = [(true, false), (true, true), (false, true), (false, false)];
        spin(&mut dec, &cycle);
        spin(&mut dec, &cycle);
        assert_eq!(dec.position(), 2);
    }

    fn hold_and_release(btn: &mut ButtonDebouncer, polls: u8) {
        for _ in 0..polls {
            btn.tick(true);
        }
        btn.tick(false);
    }

    #[test]
    fn four_poll_hold_toggles_once() {
        let mut btn = ButtonDebouncer::new();
        hold_and_release(&mut btn, 4);
        assert!(btn.is_enabled());
        assert!(btn.take_changed());
        assert_eq!(btn.depressed_polls(), 0);
        // Release with no further press does nothing more.
        btn.tick(false);
        assert!(btn.is_enabled());
        assert!(!btn.take_changed());
    }

    #[test]
    fn three_poll_hold_is_noise() {
        let mut btn = ButtonDebouncer::new();
        hold_and_release(&mut btn, 3);
        assert!(!btn.is_enabled());
        assert!(!btn.take_changed());
        assert_eq!(btn.depressed_polls(), 0);
    }

    #[test]
    fn second_valid_press_toggles_back() {
        let mut btn = ButtonDebouncer::new();
        hold_and_release(&mut btn, 10);
        hold_and_release(&mut btn, 10);
        assert!(!btn.is_enabled());
    }

    #[test]
    fn long_hold_saturates_instead_of_wrapping() {
        let mut btn = ButtonDebouncer::new();
        // 2000 polls (10 s) must not wrap the counter back under threshold.
        for _ in 0..2000 {
            btn.tick(true);
        }
        btn.tick(false);
        assert!(btn.is_enabled());
    }

    #[test]
    fn capture_publishes_into_shared() {
        let shared = SharedInputs::new();
        let mut cap = InputCapture::new(PanelSample::default());

        let mut s = PanelSample::default();
        cap.tick(s, &shared);
        assert_eq!(shared.take_voltage_position(), None);

        s.volt_a_high = true;
        s.curr_a_high = true;
        s.curr_b_high = true;
        cap.tick(s, &shared);
        assert_eq!(shared.take_voltage_position(), Some(1));
        assert_eq!(shared.take_current_position(), Some(-1));
        assert_eq!(shared.take_voltage_position(), None);

        // Button: held over threshold, then released.
        s.button_pressed = true;
        for _ in 0..5 {
            cap.tick(s, &shared);
        }
        s.button_pressed = false;
        cap.tick(s, &shared);
        assert_eq!(shared.take_output_event(), Some(true));
        assert_eq!(shared.take_output_event(), None);
        assert!(shared.output_enabled());
    }
}
