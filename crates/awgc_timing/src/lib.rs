//! # AWGC Timing
//!
//! Sample-grid lengths, frames, phase tracking and step scheduling.
//!
//! ## Gantree Architecture
//!
//! ```text
//! awgc_timing // L2: Timing (완료)
//!     LengthResolver // ns → samples, 표준 길이 (완료)
//!     Frame // π/2, π, P1, P2 프레임 선택 (완료)
//!     PhaseFrameTracker // 절대/증분 위상 (완료)
//!     Scheduler // 슬롯별 프레임+위상+패딩 (완료)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use awgc_timing::prelude::*;
//!
//! let resolver = LengthResolver::new(2.4, 0.0).unwrap();
//! // 33 ns at 2.4 GSa/s is 79.2 samples, aligned to 80
//! assert_eq!(resolver.aligned_samples(33.0), Some(80));
//!
//! // Side padding above 5 ns is rejected up front
//! assert!(LengthResolver::new(2.4, 6.0).is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Length & padding resolver (Gantree: L2_Timing → LengthResolver)
pub mod lengths;

/// Frames (Gantree: L2_Timing → Frame)
pub mod frame;

/// Phase-frame tracker (Gantree: L2_Timing → PhaseFrameTracker)
pub mod phase;

/// Step scheduler (Gantree: L2_Timing → Scheduler)
pub mod schedule;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::{Frame, StepContext};
pub use lengths::{align_samples, CoreLengths, LengthResolver, LengthTable, PulseLength};
pub use phase::{PhaseFrame, PhaseFrameTracker, PhaseUpdate};
pub use schedule::{DcContent, ScheduledLine, ScheduledSlot, Scheduler, SlotOp};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases

    pub use crate::frame::{Frame, StepContext};
    pub use crate::lengths::{align_samples, CoreLengths, LengthResolver, LengthTable, PulseLength};
    pub use crate::phase::{PhaseFrame, PhaseFrameTracker, PhaseUpdate};
    pub use crate::schedule::{DcContent, ScheduledLine, ScheduledSlot, Scheduler, SlotOp};
}

// ============================================================================
// Version Information
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Integration Tests
// ============================================================================
