//! # AWGC Waveform
//!
//! Per-core waveform catalogs: the standard pulses every core carries,
//! the paired and arbitrary waveforms a program adds, and their samples.
//!
//! ## Gantree Architecture
//!
//! ```text
//! awgc_waveform // L4: Waveform (완료)
//!     WaveformDescriptor // slot, key, 길이, 채널 (완료)
//!     CatalogBuilder // 표준 + 동적 파형 (완료)
//!     Render // 샘플 생성 (완료)
//! ```
//!
//! ## Slot Layout
//!
//! | core | fixed slots | dynamic slots |
//! |------|-------------|---------------|
//! | RF   | `pi_pifr`, `pi_2_pi2fr`, `pi_2_pifr` | one per arbitrary label |
//! | DC   | `p1_{p1,p2,pi2,pi}fr`, `p2_{p2,p1,pi2,pi}fr` | paired plunger per frame, arbitrary per step |

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Waveform descriptors (Gantree: L4_Waveform → WaveformDescriptor)
pub mod descriptor;

/// Catalog builder (Gantree: L4_Waveform → CatalogBuilder)
pub mod catalog;

/// Sample rendering (Gantree: L4_Waveform → Render)
pub mod render;

// ============================================================================
// Re-exports
// ============================================================================

pub use catalog::{CatalogBuilder, WaveformCatalog};
pub use descriptor::{
    ChannelAssignment, DcShape, SlotId, WaveformDescriptor, WaveformKey, WaveformShape,
};
pub use render::{render, render_catalog, RenderedWaveform};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases

    pub use crate::catalog::{CatalogBuilder, WaveformCatalog};
    pub use crate::descriptor::{
        ChannelAssignment, DcShape, SlotId, WaveformDescriptor, WaveformKey, WaveformShape,
    };
    pub use crate::render::{render, render_catalog, RenderedWaveform};
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Integration Tests
// ============================================================================
