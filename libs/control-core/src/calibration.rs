//! Millivolt↔code calibration for the regulator DAC channels and the
//! feedback ADC.
//!
//! All scalars are fixed properties of the board's analog chain, kept as
//! named constants with their circuit derivation next to them so a board
//! revision only has to touch the numbers, never re-derive the formulas.

use crate::mcp4922::MAX_CODE;

/// Fixed margin the switching pre-regulator keeps above the linear stage's
/// target so the LDO never runs out of drop-out headroom.
pub const PRE_REG_HEADROOM_MV: u32 = 3250;

// Pre-regulator feedback network: the buck's feedback pin balances at
// 1210 mV through three resistors — 7.97 kΩ to the rail, 3.48 kΩ to the DAC
// output, 1.00 kΩ to ground. KCL at the feedback node gives
//
//   V_dac = 1210 · (1 + 3480/1000 + 3480/7970) − V_rail · (3480/7970)
//
// and with the DAC driven at 1 mV/code the code is numerically V_dac. The
// rail target is the output target plus PRE_REG_HEADROOM_MV, which folds
// the headroom into the constant term (≈ 5949 − 0.437·3250 ≈ 4530). The
// slope is the measured value of the network ratio on this board.
pub const PRE_REG_CODE_OFFSET: f32 = 4530.0;
pub const PRE_REG_SLOPE_CODE_PER_MV: f32 = 0.4375;

/// Reference voltage of the linear regulator's error amplifier.
pub const LINEAR_REF_MV: f32 = 1250.0;
/// Measured gain of the amplifier stage between DAC output and the linear
/// regulator's adjust input.
pub const LINEAR_STAGE_GAIN: f32 = 2.21;

/// R34/R35 divider between the output terminals and ADC channel 1. With the
/// converter's 4.096 V reference one code is one millivolt at the pin, so
/// undoing the divider recovers true terminal millivolts.
pub const TERMINAL_DIVIDER_RATIO: f32 = 2.65;

/// DAC code for the switching pre-regulator (channel A) that places the
/// rail `PRE_REG_HEADROOM_MV` above `target_mv`.
///
/// Truncated toward zero, then clamped to the device range; the raw network
/// equation leaves the range for small targets (code 4530 at 0 mV) and must
/// never reach the wire unclamped.
pub fn pre_reg_code_for_mv(target_mv: u32) -> u16 {
    let code = PRE_REG_CODE_OFFSET - target_mv as f32 * PRE_REG_SLOPE_CODE_PER_MV;
    (code as i32).clamp(0, MAX_CODE as i32) as u16
}

/// DAC code for the linear output stage (channel B) producing `target_mv`
/// at the terminals. Truncated toward zero, clamped to the device range.
pub fn linear_code_for_mv(target_mv: u32) -> u16 {
    let code = (target_mv as f32 - LINEAR_REF_MV) / LINEAR_STAGE_GAIN;
    (code as i32).clamp(0, MAX_CODE as i32) as u16
}

/// True terminal millivolts from a raw ADC channel-1 sample.
pub fn terminal_mv_from_sense(raw: u16) -> u32 {
    (raw as f32 * TERMINAL_DIVIDER_RATIO) as u32
}
