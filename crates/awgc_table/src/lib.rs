//! # AWGC Table
//!
//! Per-core command tables: fixed index layouts, the allocation arena for
//! dynamic entries, the assembler that turns scheduled lines into entry
//! indices, and the JSON document the instrument driver uploads.
//!
//! ## Gantree Architecture
//!
//! ```text
//! awgc_table // L5: Table (완료)
//!     CommandTableEntry // play | phase | wait (완료)
//!     TableLayout // RF 0..=z0z, DC 0..=12 (완료)
//!     AllocationArena // Z, 파형, 대기 동적 할당 (완료)
//!     CommandTableAssembler // 라인 → 인덱스 (완료)
//!     CommandTableDocument // JSON 스키마 (완료)
//! ```
//!
//! ## Table Order
//!
//! Fixed entries first, then arbitrary Z angles, then dynamic waveforms,
//! then waits without a fixed entry. Every table is checked against the
//! 1024-entry ceiling before it is materialised.

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Entries and tables (Gantree: L5_Table → CommandTableEntry)
pub mod entry;

/// Fixed layouts (Gantree: L5_Table → TableLayout)
pub mod layout;

/// Dynamic allocations (Gantree: L5_Table → AllocationArena)
pub mod arena;

/// Assembler (Gantree: L5_Table → CommandTableAssembler)
pub mod assembler;

/// JSON document (Gantree: L5_Table → CommandTableDocument)
pub mod schema;

// ============================================================================
// Re-exports
// ============================================================================

pub use arena::{AllocationArena, ArenaRef, SealedArena};
pub use assembler::{AssembledCore, CommandTableAssembler, LinePlan};
pub use entry::{CommandTable, CommandTableEntry, EntryAction, EntryIndex, PhaseSetting};
pub use layout::{DcLayout, FrameVariant, RfLayout, TableLayout};
pub use schema::{CommandTableDocument, EntryDocument, PhaseField, TableHeader, WaveformField};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases

    pub use crate::assembler::{AssembledCore, CommandTableAssembler, LinePlan};
    pub use crate::entry::{CommandTable, CommandTableEntry, EntryAction, EntryIndex, PhaseSetting};
    pub use crate::layout::{DcLayout, RfLayout, TableLayout};
    pub use crate::schema::CommandTableDocument;
}

// ============================================================================
// Version Information
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Integration Tests
// ============================================================================
