//! Allocation arena
//!
//! Gantree: L5_Table → AllocationArena
//!
//! Dynamic command-table entries (arbitrary Z angles, dynamic waveforms,
//! extra waits) are collected in program order by threading the arena
//! through every allocation: each call consumes the arena and hands back
//! the grown arena plus a handle. Handles become table indices only when
//! the arena is sealed behind the fixed entries, after the capacity
//! check.

use crate::entry::{CommandTableEntry, EntryIndex};
use awgc_core::phase::angle_key;
use awgc_core::{AwgcError, AwgcResult, CoreId, Degrees, Samples};
use awgc_timing::PhaseUpdate;
use awgc_waveform::SlotId;
use std::collections::BTreeMap;

/// Handle to an arena allocation
/// Gantree: ArenaRef // Z | Waveform | Wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ArenaRef {
    /// n-th distinct arbitrary Z angle
    Z(usize),
    /// n-th dynamic waveform
    Waveform(usize),
    /// n-th extra wait
    Wait(usize),
}

/// Dynamic play: slot, length and the phase it writes (`None` for the default)
type DynamicPlay = (SlotId, Samples, Option<PhaseUpdate>);

/// Identity of a dynamic play; plays of one slot differ by their phase
type PlayKey = (SlotId, Option<(bool, i64)>);

fn play_key(slot: SlotId, phase: Option<PhaseUpdate>) -> PlayKey {
    (slot, phase.map(|p| (p.is_incremental(), angle_key(p.value()))))
}

/// Append-only dynamic allocations of one core
/// Gantree: AllocationArena // 동적 할당
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationArena {
    z_angles: Vec<Degrees>,
    z_index: BTreeMap<i64, usize>,
    waveforms: Vec<DynamicPlay>,
    waveform_index: BTreeMap<PlayKey, usize>,
    waits: Vec<Samples>,
    wait_index: BTreeMap<Samples, usize>,
}

impl AllocationArena {
    /// Empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate (or find) the entry of an arbitrary Z angle
    /// Gantree: allocate_z(self, angle) -> (Self, ArenaRef) // 각도별 1회
    pub fn allocate_z(mut self, angle: Degrees) -> (Self, ArenaRef) {
        let key = angle_key(angle);
        let n = match self.z_index.get(&key) {
            Some(&n) => n,
            None => {
                self.z_angles.push(angle);
                self.z_index.insert(key, self.z_angles.len() - 1);
                self.z_angles.len() - 1
            }
        };
        (self, ArenaRef::Z(n))
    }

    /// Allocate (or find) the play entry of a dynamic waveform
    pub fn allocate_waveform(self, slot: SlotId, samples: Samples) -> (Self, ArenaRef) {
        self.allocate_play(slot, samples, None)
    }

    /// Allocate (or find) a dynamic play writing its own phase
    /// Gantree: allocate_play(self, slot, samples, phase) -> (Self, ArenaRef) // 위상 포함
    pub fn allocate_play(
        mut self,
        slot: SlotId,
        samples: Samples,
        phase: Option<PhaseUpdate>,
    ) -> (Self, ArenaRef) {
        let key = play_key(slot, phase);
        let n = match self.waveform_index.get(&key) {
            Some(&n) => n,
            None => {
                self.waveforms.push((slot, samples, phase));
                self.waveform_index.insert(key, self.waveforms.len() - 1);
                self.waveforms.len() - 1
            }
        };
        (self, ArenaRef::Waveform(n))
    }

    /// Allocate (or find) a wait without a fixed entry
    pub fn allocate_wait(mut self, samples: Samples) -> (Self, ArenaRef) {
        let n = match self.wait_index.get(&samples) {
            Some(&n) => n,
            None => {
                self.waits.push(samples);
                self.wait_index.insert(samples, self.waits.len() - 1);
                self.waits.len() - 1
            }
        };
        (self, ArenaRef::Wait(n))
    }

    /// Number of allocations
    pub fn len(&self) -> usize {
        self.z_angles.len() + self.waveforms.len() + self.waits.len()
    }

    /// True if nothing was allocated
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fix indices behind `base` fixed entries
    /// Gantree: seal(self, base, capacity) -> Result<SealedArena> // 용량 검사
    pub fn seal(
        self,
        core: &CoreId,
        base: usize,
        capacity: usize,
        waveform_phase: Option<PhaseUpdate>,
    ) -> AwgcResult<SealedArena> {
        let required = base + self.len();
        if required > capacity {
            return Err(AwgcError::CapacityExceeded {
                core: core.clone(),
                required,
                capacity,
            });
        }

        let z_base = base;
        let waveform_base = z_base + self.z_angles.len();
        let wait_base = waveform_base + self.waveforms.len();

        let mut entries = Vec::with_capacity(self.len());
        for (i, &angle) in self.z_angles.iter().enumerate() {
            entries.push(CommandTableEntry::phase_increment((z_base + i) as EntryIndex, angle));
        }
        for (i, &(slot, samples, phase)) in self.waveforms.iter().enumerate() {
            entries.push(CommandTableEntry::play(
                (waveform_base + i) as EntryIndex,
                slot,
                samples,
                phase.or(waveform_phase),
            ));
        }
        for (i, &samples) in self.waits.iter().enumerate() {
            entries.push(CommandTableEntry::wait((wait_base + i) as EntryIndex, samples));
        }

        Ok(SealedArena {
            z_base,
            waveform_base,
            wait_base,
            z_angles: self.z_angles,
            waveforms: self.waveforms,
            entries,
        })
    }
}

/// Arena with final indices
#[derive(Debug, Clone, PartialEq)]
pub struct SealedArena {
    z_base: usize,
    waveform_base: usize,
    wait_base: usize,
    z_angles: Vec<Degrees>,
    waveforms: Vec<DynamicPlay>,
    entries: Vec<CommandTableEntry>,
}

impl SealedArena {
    /// Table index of a handle
    pub fn index(&self, handle: ArenaRef) -> EntryIndex {
        let index = match handle {
            ArenaRef::Z(n) => self.z_base + n,
            ArenaRef::Waveform(n) => self.waveform_base + n,
            ArenaRef::Wait(n) => self.wait_base + n,
        };
        index as EntryIndex
    }

    /// `(index, angle)` of every arbitrary Z entry
    pub fn z_allocations(&self) -> Vec<(EntryIndex, Degrees)> {
        self.z_angles
            .iter()
            .enumerate()
            .map(|(i, &a)| ((self.z_base + i) as EntryIndex, a))
            .collect()
    }

    /// `(index, slot)` of every dynamic waveform entry
    pub fn waveform_allocations(&self) -> Vec<(EntryIndex, SlotId)> {
        self.waveforms
            .iter()
            .enumerate()
            .map(|(i, &(slot, _, _))| ((self.waveform_base + i) as EntryIndex, slot))
            .collect()
    }

    /// Dynamic entries in index order
    pub fn into_entries(self) -> Vec<CommandTableEntry> {
        self.entries
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> CoreId {
        CoreId::new("dev8001", 0)
    }

    #[test]
    fn test_dedupe_and_sections() {
        let arena = AllocationArena::new();
        let (arena, wait) = arena.allocate_wait(240);
        let (arena, z1) = arena.allocate_z(45.0);
        let (arena, w) = arena.allocate_waveform(3, 128);
        let (arena, z2) = arena.allocate_z(12.5);
        let (arena, z1_again) = arena.allocate_z(45.0 + 1e-9);
        assert_eq!(z1, z1_again);
        assert_eq!(arena.len(), 4);

        let sealed = arena.seal(&core(), 36, 1024, Some(PhaseUpdate::Increment(0.0))).unwrap();
        assert_eq!(sealed.index(z1), 36);
        assert_eq!(sealed.index(z2), 37);
        assert_eq!(sealed.index(w), 38);
        assert_eq!(sealed.index(wait), 39);
        assert_eq!(sealed.z_allocations(), vec![(36, 45.0), (37, 12.5)]);
        assert_eq!(sealed.waveform_allocations(), vec![(38, 3)]);

        let entries = sealed.into_entries();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[3], CommandTableEntry::wait(39, 240));
    }

    #[test]
    fn test_plays_of_one_slot_split_by_phase() {
        let arena = AllocationArena::new();
        let (arena, plain) = arena.allocate_waveform(3, 96);
        let (arena, shifted) = arena.allocate_play(3, 96, Some(PhaseUpdate::Increment(90.0)));
        let (arena, absolute) = arena.allocate_play(3, 96, Some(PhaseUpdate::Absolute(90.0)));
        let (arena, again) = arena.allocate_play(3, 96, Some(PhaseUpdate::Increment(90.0)));
        assert_eq!(shifted, again);
        assert_ne!(plain, shifted);
        assert_ne!(shifted, absolute);

        let sealed = arena.seal(&core(), 36, 1024, Some(PhaseUpdate::Increment(0.0))).unwrap();
        assert_eq!(sealed.waveform_allocations(), vec![(36, 3), (37, 3), (38, 3)]);
        let entries = sealed.into_entries();
        assert_eq!(
            entries[0],
            CommandTableEntry::play(36, 3, 96, Some(PhaseUpdate::Increment(0.0)))
        );
        assert_eq!(
            entries[2],
            CommandTableEntry::play(38, 3, 96, Some(PhaseUpdate::Absolute(90.0)))
        );
    }

    #[test]
    fn test_capacity_checked_before_entries() {
        let arena = (0..1000).fold(AllocationArena::new(), |arena, k| {
            arena.allocate_z(0.1 * (k + 1) as f64).0
        });
        assert_eq!(
            arena.seal(&core(), 36, 1024, None),
            Err(AwgcError::CapacityExceeded {
                core: core(),
                required: 1036,
                capacity: 1024
            })
        );
    }
}
