//! Phase-Frame Tracker
//!
//! Gantree: L2_Timing → PhaseFrameTracker
//!
//! Per RF core, the running oscillator phase within one line. The
//! first rotation of a line is written with an absolute phase; every
//! later rotation is written as the increment to its desired phase.
//! Angles are stored exactly as computed; no table negates them.
//!
//! A virtual Z by a multiple of 90° writes nothing: the shift is carried
//! and added to the increment of the next play, which stays one of the
//! canonical increments.

use awgc_core::phase::{canonical_position, IQ_QUADRATURE_DEG, CANONICAL_INCREMENTS_DEG};
use awgc_core::{CoreId, Degrees, RotationKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Phase written by one command-table entry
/// Gantree: PhaseUpdate // Absolute | Increment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PhaseUpdate {
    /// Set the oscillator phase
    Absolute(Degrees),
    /// Advance the oscillator phase
    Increment(Degrees),
}

impl PhaseUpdate {
    /// Angle carried by the update
    pub fn value(&self) -> Degrees {
        match self {
            PhaseUpdate::Absolute(v) | PhaseUpdate::Increment(v) => *v,
        }
    }

    /// True for increments
    pub fn is_incremental(&self) -> bool {
        matches!(self, PhaseUpdate::Increment(_))
    }

    /// Value for the first oscillator
    pub fn phase0(&self) -> Degrees {
        self.value()
    }

    /// Value for the second oscillator (quadrature for absolute phases)
    pub fn phase1(&self) -> Degrees {
        match self {
            PhaseUpdate::Absolute(v) => v + IQ_QUADRATURE_DEG,
            PhaseUpdate::Increment(v) => *v,
        }
    }
}

impl fmt::Display for PhaseUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseUpdate::Absolute(v) => write!(f, "={}°", v),
            PhaseUpdate::Increment(v) => write!(f, "+{}°", v),
        }
    }
}

/// Running phase of one RF core
/// Gantree: PhaseFrame // local_phase_deg
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseFrame {
    /// Desired phase of the last rotation
    pub local_phase_deg: Degrees,
    /// True once an absolute phase or a virtual Z was written
    pub primed: bool,
    /// Canonical Z shift not yet written
    pub pending_deg: Degrees,
}

/// Fold an angle into (-360°, 360°)
fn within_turn(angle: Degrees) -> Degrees {
    angle % 360.0 + 0.0
}

/// Phase frames of all RF cores within one line
#[derive(Debug, Clone, Default)]
pub struct PhaseFrameTracker {
    frames: BTreeMap<CoreId, PhaseFrame>,
}

impl PhaseFrameTracker {
    /// Fresh tracker, every frame un-primed at 0°
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all frames (start of a line)
    pub fn reset(&mut self) {
        self.frames.clear();
    }

    /// Phase update of a rotation
    /// Gantree: rotation(core, kind) -> PhaseUpdate // 절대 or 증분
    pub fn rotation(&mut self, core: &CoreId, kind: RotationKind) -> PhaseUpdate {
        let desired = kind.desired_phase_deg();
        let frame = self.frames.entry(core.clone()).or_default();
        let update = if frame.primed {
            PhaseUpdate::Increment(within_turn(
                desired - frame.local_phase_deg + frame.pending_deg,
            ))
        } else {
            PhaseUpdate::Absolute(desired)
        };
        frame.local_phase_deg = desired;
        frame.primed = true;
        frame.pending_deg = 0.0;
        update
    }

    /// Phase update of a virtual Z; `None` when the shift is carried to the next play
    /// Gantree: virtual_z(core, angle) -> Option<PhaseUpdate> // 90° 배수는 이월
    pub fn virtual_z(&mut self, core: &CoreId, angle: Degrees) -> Option<PhaseUpdate> {
        let frame = self.frames.entry(core.clone()).or_default();
        frame.primed = true;
        match canonical_position(within_turn(angle)) {
            Some(position) => {
                frame.pending_deg =
                    within_turn(frame.pending_deg + CANONICAL_INCREMENTS_DEG[position]);
                None
            }
            None => Some(PhaseUpdate::Increment(angle)),
        }
    }

    /// Carried shift of a core, cleared
    pub fn take_shift(&mut self, core: &CoreId) -> Degrees {
        self.frames
            .get_mut(core)
            .map(|frame| std::mem::take(&mut frame.pending_deg))
            .unwrap_or(0.0)
    }

    /// Current frame of a core
    pub fn frame(&self, core: &CoreId) -> Option<&PhaseFrame> {
        self.frames.get(core)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn core() -> CoreId {
        CoreId::new("dev8001", 0)
    }

    #[test]
    fn test_repeated_x_increments_zero() {
        let mut tracker = PhaseFrameTracker::new();
        let updates: Vec<_> = (0..4)
            .map(|_| tracker.rotation(&core(), RotationKind::X))
            .collect();
        assert_eq!(updates[0], PhaseUpdate::Absolute(0.0));
        for u in &updates[1..] {
            assert_eq!(*u, PhaseUpdate::Increment(0.0));
        }
    }

    #[test]
    fn test_increment_is_desired_minus_running() {
        let mut tracker = PhaseFrameTracker::new();
        tracker.rotation(&core(), RotationKind::Yyy); // 90
        let u = tracker.rotation(&core(), RotationKind::Xxx); // -180
        assert_eq!(u, PhaseUpdate::Increment(-270.0));
        let u = tracker.rotation(&core(), RotationKind::Myym); // 90
        assert_eq!(u, PhaseUpdate::Increment(270.0));
        assert_relative_eq!(tracker.frame(&core()).unwrap().local_phase_deg, 90.0);
    }

    #[test]
    fn test_virtual_z_primes_without_moving() {
        let mut tracker = PhaseFrameTracker::new();
        assert_eq!(tracker.virtual_z(&core(), 45.0), Some(PhaseUpdate::Increment(45.0)));
        assert_eq!(
            tracker.rotation(&core(), RotationKind::Y),
            PhaseUpdate::Increment(-90.0)
        );
    }

    #[test]
    fn test_canonical_z_carried_into_next_rotation() {
        let mut tracker = PhaseFrameTracker::new();
        tracker.rotation(&core(), RotationKind::Y); // -90
        assert_eq!(tracker.virtual_z(&core(), 90.0), None);
        assert_eq!(tracker.virtual_z(&core(), 540.0), None);
        // 0 - (-90) + 90 + 180 = 360
        assert_eq!(
            tracker.rotation(&core(), RotationKind::X),
            PhaseUpdate::Increment(0.0)
        );
        assert_eq!(tracker.virtual_z(&core(), -270.0), None);
        let u = tracker.rotation(&core(), RotationKind::Yyy); // 90
        assert_relative_eq!(u.value(), -180.0);
        assert!(u.is_incremental());
        assert_relative_eq!(tracker.take_shift(&core()), 0.0);
    }

    #[test]
    fn test_shift_taken_once() {
        let mut tracker = PhaseFrameTracker::new();
        assert_relative_eq!(tracker.take_shift(&core()), 0.0);
        tracker.virtual_z(&core(), 180.0);
        assert_relative_eq!(tracker.take_shift(&core()), 180.0);
        assert_relative_eq!(tracker.take_shift(&core()), 0.0);
    }

    #[test]
    fn test_reset_and_quadrature() {
        let mut tracker = PhaseFrameTracker::new();
        tracker.rotation(&core(), RotationKind::X);
        tracker.reset();
        let u = tracker.rotation(&core(), RotationKind::Y);
        assert_eq!(u, PhaseUpdate::Absolute(-90.0));
        assert_relative_eq!(u.phase1(), 0.0);
        assert_relative_eq!(PhaseUpdate::Increment(90.0).phase1(), 90.0);
    }
}
