//! Headings live in 24-bit fixed point so the wire values never drift through float
//! round-trips; radians are a derived view.

use std::f64::consts::TAU;

pub const ANGLE_BITS: u32 = 24;
pub const ANGLE_UNITS: u32 = 1 << ANGLE_BITS;
pub const HALF_TURN: i32 = 1 << (ANGLE_BITS - 1);
const ANGLE_MASK: u32 = ANGLE_UNITS - 1;
const UNITS_PER_RADIAN: f64 = ANGLE_UNITS as f64 / TAU;

/// Absolute-angle input bytes cover `0..=250`; the circle is split into 251 steps.
pub const TARGET_ANGLE_STEPS: u32 = 251;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Angle(u32);

impl Angle {
  pub const ZERO: Angle = Angle(0);

  pub fn from_units(units: i64) -> Self {
    Angle((units.rem_euclid(ANGLE_UNITS as i64)) as u32)
  }

  pub fn from_radians(radians: f64) -> Self {
    if !radians.is_finite() {
      return Angle::ZERO;
    }
    let units = (radians.rem_euclid(TAU) * UNITS_PER_RADIAN).floor() as i64;
    Angle::from_units(units)
  }

  pub fn from_target_byte(value: u8) -> Self {
    let value = value.min((TARGET_ANGLE_STEPS - 1) as u8) as u64;
    Angle(((value * ANGLE_UNITS as u64) / TARGET_ANGLE_STEPS as u64) as u32)
  }

  pub fn units(self) -> u32 {
    self.0
  }

  pub fn radians(self) -> f64 {
    self.0 as f64 / UNITS_PER_RADIAN
  }

  /// Heading as one byte over the full circle.
  pub fn to_byte(self) -> u8 {
    (self.0 >> (ANGLE_BITS - 8)) as u8
  }

  pub fn offset(self, delta_units: i64) -> Self {
    Angle::from_units(self.0 as i64 + delta_units)
  }

  /// Signed shortest rotation from `self` to `target`, in `(-2^23, 2^23]`.
  pub fn shortest_diff(self, target: Angle) -> i32 {
    let raw = (target.0.wrapping_sub(self.0) & ANGLE_MASK) as i32;
    if raw > HALF_TURN {
      raw - ANGLE_UNITS as i32
    } else {
      raw
    }
  }

  /// Rotates toward `target` by at most `max_units`, snapping when within reach.
  pub fn step_toward(self, target: Angle, max_units: f64) -> Angle {
    let diff = self.shortest_diff(target);
    if (diff as f64).abs() <= max_units {
      return target;
    }
    let step = max_units.floor() as i64;
    self.offset(if diff < 0 { -step } else { step })
  }
}

pub fn radians_to_units(radians: f64) -> f64 {
  radians * UNITS_PER_RADIAN
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wrapping_a_full_turn_is_identity() {
    for units in [0i64, 1, 12345, HALF_TURN as i64, ANGLE_UNITS as i64 - 1] {
      let angle = Angle::from_units(units);
      assert_eq!(angle.offset(ANGLE_UNITS as i64), angle);
      assert_eq!(angle.offset(-(ANGLE_UNITS as i64)), angle);
    }
    assert_eq!(Angle::from_units(-1).units(), ANGLE_UNITS - 1);
  }

  #[test]
  fn shortest_diff_stays_in_half_open_range() {
    let half = HALF_TURN as u32;
    let samples = [0u32, 1, 2, half - 1, half, half + 1, ANGLE_UNITS - 1];
    for &a in &samples {
      for &b in &samples {
        let diff = Angle::from_units(a as i64).shortest_diff(Angle::from_units(b as i64));
        assert!(diff > -HALF_TURN && diff <= HALF_TURN, "{a} -> {b} gave {diff}");
        assert_eq!(Angle::from_units(a as i64).offset(diff as i64).units(), b);
      }
    }
  }

  #[test]
  fn shortest_diff_wraps_across_zero() {
    let near_end = Angle::from_units(ANGLE_UNITS as i64 - 10);
    let near_start = Angle::from_units(10);
    assert_eq!(near_end.shortest_diff(near_start), 20);
    assert_eq!(near_start.shortest_diff(near_end), -20);
  }

  #[test]
  fn step_toward_snaps_or_limits() {
    let from = Angle::from_units(100);
    assert_eq!(from.step_toward(Angle::from_units(150), 60.0).units(), 150);
    assert_eq!(from.step_toward(Angle::from_units(1000), 60.0).units(), 160);
    assert_eq!(from.step_toward(Angle::from_units(0), 10.0).units(), 90);
  }

  #[test]
  fn target_byte_maps_linearly_onto_circle() {
    assert_eq!(Angle::from_target_byte(0).units(), 0);
    let quarter = Angle::from_target_byte(251 / 4 + 1).radians();
    assert!((quarter - TAU / 4.0).abs() < TAU / 251.0);
    assert!(Angle::from_target_byte(250).units() < ANGLE_UNITS);
    assert_eq!(Angle::from_target_byte(255), Angle::from_target_byte(250));
  }

  #[test]
  fn radians_round_trip_within_one_unit() {
    for radians in [0.0, 0.5, 3.0, 6.2, -1.0] {
      let angle = Angle::from_radians(radians);
      let back = Angle::from_radians(angle.radians());
      assert!((back.units() as i64 - angle.units() as i64).abs() <= 1);
    }
    assert_eq!(Angle::from_units(HALF_TURN as i64).to_byte(), 128);
    assert_eq!(Angle::from_units(ANGLE_UNITS as i64 - 1).to_byte(), 255);
  }
}
