//! # AWGC Core
//!
//! Foundation types for the gate-sequence to AWG compiler: core ids,
//! gate tokens, parsed sequence lines, the static core registry and the
//! gate-parameter table.
//!
//! ## Gantree Architecture
//!
//! ```text
//! awgc_core // L0+L1: Foundation + Sequence (완료)
//!     L0_Foundation // 기반 타입/상수/에러 (완료)
//!         CoreTypes // CoreId, ChannelRole, DcChannel (완료)
//!         Constants // 하드웨어/위상/시퀀서 상수 (완료)
//!         Errors // AwgcError (완료)
//!     L1_Sequence // 입력 모델 (완료)
//!         GateToken // 게이트 토큰 (완료)
//!         SequenceLine // 라인/스텝 (완료)
//!         CoreRegistry // 채널 맵 (완료)
//!         GateParameterTable // 게이트 파라미터 (완료)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use awgc_core::prelude::*;
//!
//! let registry = CoreRegistry::new(vec![
//!     CoreDescriptor::rf("dev8001", 0, 1).with_trigger(),
//!     CoreDescriptor::rf("dev8001", 1, 2),
//! ])
//! .unwrap();
//!
//! let params = GateParameterTable::new()
//!     .with_rf(1, RfParameters::new(66.0, 33.0, 0.5, 0.5, 100e6))
//!     .with_rf(2, RfParameters::new(70.0, 35.0, 0.5, 0.5, 110e6));
//!
//! assert!(params.validate_against(&registry).is_ok());
//! assert_eq!(registry.binding(2).unwrap().role, ChannelRole::Rf);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Core types (Gantree: L0_Foundation → CoreTypes)
pub mod types;

/// Constants (Gantree: L0_Foundation → Constants)
pub mod constants;

/// Error types (Gantree: L0_Foundation → Errors)
pub mod error;

/// Gate tokens (Gantree: L1_Sequence → GateToken)
pub mod gate;

/// Sequence lines (Gantree: L1_Sequence → SequenceLine)
pub mod sequence;

/// Core registry (Gantree: L1_Sequence → CoreRegistry)
pub mod registry;

/// Gate parameters (Gantree: L1_Sequence → GateParameterTable)
pub mod params;

// ============================================================================
// Re-exports
// ============================================================================

pub use constants::{hardware, phase, sequencer};
pub use error::{AwgcError, AwgcResult};
pub use gate::{ArbitraryPulse, GateFamily, GateOp, GateToken, RotationKind};
pub use params::{GateParameterTable, PlungerParameters, RfParameters};
pub use registry::{ChannelBinding, ChannelMap, CoreConfig, CoreDescriptor, CoreRegistry};
pub use sequence::{CoreSlot, SequenceLine};
pub use types::{ChannelIndex, ChannelRole, CoreId, DcChannel, Degrees, Nanoseconds, Samples};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases
    //!
    //! ```rust
    //! use awgc_core::prelude::*;
    //! ```

    pub use crate::constants::{hardware, phase, sequencer};
    pub use crate::error::{AwgcError, AwgcResult};
    pub use crate::gate::{ArbitraryPulse, GateFamily, GateOp, GateToken, RotationKind};
    pub use crate::params::{GateParameterTable, PlungerParameters, RfParameters};
    pub use crate::registry::{
        ChannelBinding, ChannelMap, CoreConfig, CoreDescriptor, CoreRegistry,
    };
    pub use crate::sequence::{CoreSlot, SequenceLine};
    pub use crate::types::{
        ChannelIndex, ChannelRole, CoreId, DcChannel, Degrees, Nanoseconds, Samples,
    };
}

// ============================================================================
// Version Information
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_registry_and_params_together() {
        let registry = CoreRegistry::new(vec![
            CoreDescriptor::rf("dev8001", 0, 1).with_trigger(),
            CoreDescriptor::dc("dev8002", 0, 3, 4),
        ])
        .unwrap();
        let params = GateParameterTable::new()
            .with_rf(1, RfParameters::new(60.0, 30.0, 0.5, 0.5, 1e8))
            .with_plunger(3, PlungerParameters::new(40.0, 0.1));

        assert_eq!(
            params.validate_against(&registry),
            Err(AwgcError::MissingCalibration {
                channel: 4,
                kind: "plunger"
            })
        );
    }

    #[test]
    fn test_line_built_from_tokens() {
        let rf = CoreId::new("dev8001", 0);
        let mut line = SequenceLine::new(2);
        let mut slots = BTreeMap::new();
        slots.insert(
            rf.clone(),
            CoreSlot::new(vec![GateToken::explicit(
                rf.clone(),
                ChannelRole::Rf,
                1,
                GateOp::Rotation(RotationKind::Yy),
            )]),
        );
        line.push_step(96, slots);

        assert!(line.is_padded());
        assert_eq!(line.total_samples(), 96);
        assert_eq!(
            line.track(&rf).unwrap()[0].primary().unwrap().op.rotation(),
            Some(RotationKind::Yy)
        );
    }

    #[test]
    fn test_constants() {
        assert_eq!(hardware::COMMAND_TABLE_CAPACITY, 1024);
        assert_eq!(hardware::SAMPLE_ALIGNMENT, 16);
        assert_eq!(phase::canonical_position(-270.0), Some(6));
        assert_eq!(sequencer::DEFAULT_INNER_REPETITIONS, 1000);
    }
}
