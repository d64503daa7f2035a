//! Command-Table Assembler
//!
//! Gantree: L5_Table → CommandTableAssembler
//!
//! Maps every scheduled slot of every line to command-table indices. Fixed
//! entries come from the role's [`TableLayout`]; everything else is
//! allocated in the [`AllocationArena`], threaded through the lines in
//! program order. The table is materialised only after the arena has
//! passed the capacity check.
//!
//! A play whose trailing pad is shorter than a playable wait is replaced
//! by its stretched waveform, so every wait entry meets the minimum
//! length.

use crate::arena::{AllocationArena, ArenaRef, SealedArena};
use crate::entry::{CommandTable, EntryIndex};
use crate::layout::{DcLayout, RfLayout, TableLayout};
use awgc_core::hardware::{CAPACITY_WARNING_RATIO, COMMAND_TABLE_CAPACITY};
use awgc_core::phase::is_zero;
use awgc_core::{
    AwgcError, AwgcResult, ChannelRole, CoreDescriptor, CoreId, CoreRegistry, Degrees, Samples,
};
use awgc_timing::{LengthTable, PhaseUpdate, ScheduledLine, ScheduledSlot, SlotOp};
use awgc_waveform::{SlotId, WaveformCatalog, WaveformKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Output
// ============================================================================

/// Entry indices one core executes for one line
/// Gantree: LinePlan // line → [index]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePlan {
    /// 1-based source line number
    pub line: usize,
    /// Indices in execution order
    pub indices: Vec<EntryIndex>,
}

/// Assembled command table of one core
/// Gantree: AssembledCore // table + plans
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledCore {
    /// Owning core
    pub core: CoreId,
    /// Command table
    pub table: CommandTable,
    /// Index plan of every line
    pub lines: Vec<LinePlan>,
    /// `(index, angle)` of the arbitrary Z entries
    pub z_allocations: Vec<(EntryIndex, Degrees)>,
    /// `(index, slot)` of the dynamic waveform entries
    pub waveform_allocations: Vec<(EntryIndex, SlotId)>,
}

impl AssembledCore {
    /// Plan of a line
    pub fn line(&self, number: usize) -> Option<&LinePlan> {
        self.lines.iter().find(|p| p.line == number)
    }
}

// ============================================================================
// Slot Resolution
// ============================================================================

/// What a slot needs before the layout and arena are consulted
enum SlotEntry {
    Fixed(EntryIndex),
    Waveform {
        slot: SlotId,
        samples: Samples,
        phase: Option<PhaseUpdate>,
    },
    Z(Degrees),
    Wait(Samples),
    NoOp,
}

/// Index before the arena is sealed
#[derive(Debug, Clone, Copy)]
enum Planned {
    Fixed(EntryIndex),
    Dynamic(ArenaRef),
}

impl Planned {
    fn resolve(self, sealed: &SealedArena) -> EntryIndex {
        match self {
            Planned::Fixed(index) => index,
            Planned::Dynamic(handle) => sealed.index(handle),
        }
    }
}

fn mismatched(core: &CoreId, op: &SlotOp) -> AwgcError {
    AwgcError::InvalidConfig(format!("{} cannot execute '{}'", core, op))
}

fn dynamic_waveform(
    catalog: &WaveformCatalog,
    key: &WaveformKey,
    phase: Option<PhaseUpdate>,
) -> AwgcResult<SlotEntry> {
    catalog
        .get(key)
        .map(|d| SlotEntry::Waveform {
            slot: d.slot_id,
            samples: d.sample_count,
            phase,
        })
        .ok_or_else(|| {
            AwgcError::InvalidConfig(format!(
                "catalog of {} has no waveform '{}'",
                catalog.core(),
                key
            ))
        })
}

/// Phase an RF play writes beyond the default
fn written_phase(op: &SlotOp) -> Option<PhaseUpdate> {
    match op {
        SlotOp::Rotation { phase, .. } => Some(*phase),
        SlotOp::ArbitraryRf { shift, .. } if !is_zero(*shift) => {
            Some(PhaseUpdate::Increment(*shift))
        }
        _ => None,
    }
}

/// Stretched play standing in for a play plus a too-short pad
fn stretched_entry(
    core: &CoreId,
    catalog: &WaveformCatalog,
    slot: &ScheduledSlot,
) -> AwgcResult<SlotEntry> {
    let key = WaveformKey::of_slot(&slot.op)
        .map(|base| base.stretched(slot.play_samples()))
        .ok_or_else(|| mismatched(core, &slot.op))?;
    dynamic_waveform(catalog, &key, written_phase(&slot.op))
}

fn rf_entry(core: &CoreId, catalog: &WaveformCatalog, slot: &ScheduledSlot) -> AwgcResult<SlotEntry> {
    match &slot.op {
        SlotOp::Rotation { kind, frame, phase } => RfLayout::rotation_index(*kind, *frame, *phase)
            .map(SlotEntry::Fixed)
            .ok_or_else(|| AwgcError::UnknownFrameReference {
                core: core.clone(),
                angle_deg: phase.value(),
            }),
        SlotOp::VirtualZ { angle } => Ok(SlotEntry::Z(*angle)),
        SlotOp::ArbitraryRf { pulse, .. } => dynamic_waveform(
            catalog,
            &WaveformKey::ArbitraryRf {
                label: pulse.label.clone(),
            },
            written_phase(&slot.op),
        ),
        SlotOp::Wait => Ok(SlotEntry::Wait(slot.samples)),
        SlotOp::NoOp => Ok(SlotEntry::NoOp),
        op => Err(mismatched(core, op)),
    }
}

fn dc_entry(core: &CoreId, catalog: &WaveformCatalog, slot: &ScheduledSlot) -> AwgcResult<SlotEntry> {
    match &slot.op {
        SlotOp::Plunger { channel, frame } => {
            Ok(SlotEntry::Fixed(DcLayout::plunger_index(*channel, *frame)))
        }
        SlotOp::PairedPlunger { frame } => {
            dynamic_waveform(catalog, &WaveformKey::PairedPlunger { frame: *frame }, None)
        }
        SlotOp::ArbitraryDc { line, step, .. } => dynamic_waveform(
            catalog,
            &WaveformKey::ArbitraryDc {
                line: *line,
                step: *step,
            },
            None,
        ),
        SlotOp::Wait => Ok(SlotEntry::Wait(slot.samples)),
        SlotOp::NoOp => Ok(SlotEntry::NoOp),
        op => Err(mismatched(core, op)),
    }
}

type Resolve = fn(&CoreId, &WaveformCatalog, &ScheduledSlot) -> AwgcResult<SlotEntry>;

// ============================================================================
// CommandTableAssembler
// ============================================================================

/// Builds every core's command table and line plans
/// Gantree: CommandTableAssembler // 테이블 조립
#[derive(Debug, Clone, Copy)]
pub struct CommandTableAssembler<'a> {
    lengths: &'a LengthTable,
    capacity: usize,
}

impl<'a> CommandTableAssembler<'a> {
    /// Assembler with the hardware capacity
    pub fn new(lengths: &'a LengthTable) -> Self {
        Self {
            lengths,
            capacity: COMMAND_TABLE_CAPACITY,
        }
    }

    /// Lower the entry ceiling (never above the hardware capacity)
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.min(COMMAND_TABLE_CAPACITY);
        self
    }

    /// Assemble all cores
    /// Gantree: assemble(registry, catalogs, lines) -> Result<Map<CoreId, AssembledCore>>
    pub fn assemble(
        &self,
        registry: &CoreRegistry,
        catalogs: &BTreeMap<CoreId, WaveformCatalog>,
        lines: &[ScheduledLine],
    ) -> AwgcResult<BTreeMap<CoreId, AssembledCore>> {
        registry
            .cores()
            .iter()
            .map(|core| {
                let catalog = catalogs.get(&core.id).ok_or_else(|| {
                    AwgcError::InvalidConfig(format!("no waveform catalog for {}", core.id))
                })?;
                Ok((core.id.clone(), self.assemble_core(core, catalog, lines)?))
            })
            .collect()
    }

    /// Assemble one core
    pub fn assemble_core(
        &self,
        core: &CoreDescriptor,
        catalog: &WaveformCatalog,
        lines: &[ScheduledLine],
    ) -> AwgcResult<AssembledCore> {
        let assembled = match core.role {
            ChannelRole::Rf => self.assemble_with(
                &RfLayout::new(self.lengths),
                rf_entry,
                Some(PhaseUpdate::Increment(0.0)),
                &core.id,
                catalog,
                lines,
            )?,
            ChannelRole::Dc => self.assemble_with(
                &DcLayout::new(self.lengths),
                dc_entry,
                None,
                &core.id,
                catalog,
                lines,
            )?,
        };

        let utilization = assembled.table.utilization();
        if utilization > CAPACITY_WARNING_RATIO {
            log::warn!(
                "command table of {} is {:.0}% full ({} entries)",
                core.id,
                utilization * 100.0,
                assembled.table.len()
            );
        }
        log::debug!(
            "assembled {}: {} entries, {} arbitrary Z, {} dynamic waveforms",
            core.id,
            assembled.table.len(),
            assembled.z_allocations.len(),
            assembled.waveform_allocations.len()
        );
        Ok(assembled)
    }

    fn assemble_with<L: TableLayout>(
        &self,
        layout: &L,
        resolve: Resolve,
        waveform_phase: Option<PhaseUpdate>,
        core: &CoreId,
        catalog: &WaveformCatalog,
        lines: &[ScheduledLine],
    ) -> AwgcResult<AssembledCore> {
        // dynamic waveforms take their entries in catalog order
        let seeded = catalog
            .dynamic()
            .filter(|d| !d.key.is_stretched())
            .fold(AllocationArena::new(), |arena, d| {
                arena.allocate_waveform(d.slot_id, d.sample_count).0
            });

        let (arena, planned) = lines.iter().try_fold(
            (seeded, Vec::with_capacity(lines.len())),
            |(arena, mut planned), line| {
                let (arena, indices) = plan_line(layout, resolve, core, catalog, line, arena)?;
                planned.push((line.number, indices));
                Ok::<_, AwgcError>((arena, planned))
            },
        )?;

        let sealed = arena.seal(core, layout.fixed_len(), self.capacity, waveform_phase)?;
        let lines = planned
            .into_iter()
            .map(|(line, indices)| LinePlan {
                line,
                indices: indices.into_iter().map(|p| p.resolve(&sealed)).collect(),
            })
            .collect();
        let z_allocations = sealed.z_allocations();
        let waveform_allocations = sealed.waveform_allocations();

        let mut entries = layout.fixed_entries(catalog)?;
        entries.extend(sealed.into_entries());

        Ok(AssembledCore {
            core: core.clone(),
            table: CommandTable::new(core.clone(), entries)?,
            lines,
            z_allocations,
            waveform_allocations,
        })
    }
}

fn plan_line<L: TableLayout>(
    layout: &L,
    resolve: Resolve,
    core: &CoreId,
    catalog: &WaveformCatalog,
    line: &ScheduledLine,
    arena: AllocationArena,
) -> AwgcResult<(AllocationArena, Vec<Planned>)> {
    line.track(core)
        .unwrap_or_default()
        .iter()
        .try_fold((arena, Vec::new()), |(arena, mut planned), slot| {
            let entry = if slot.folds_pad() {
                stretched_entry(core, catalog, slot)?
            } else {
                resolve(core, catalog, slot)?
            };
            let (arena, entry) = plan_entry(layout, arena, entry);
            planned.extend(entry);
            let (arena, pad) = plan_entry(layout, arena, SlotEntry::Wait(slot.trailing_wait()));
            planned.extend(pad);
            Ok((arena, planned))
        })
}

fn plan_entry<L: TableLayout>(
    layout: &L,
    arena: AllocationArena,
    entry: SlotEntry,
) -> (AllocationArena, Option<Planned>) {
    match entry {
        SlotEntry::Fixed(index) => (arena, Some(Planned::Fixed(index))),
        SlotEntry::NoOp => (arena, Some(Planned::Fixed(layout.noop_index()))),
        SlotEntry::Wait(0) => (arena, None),
        SlotEntry::Wait(samples) => match layout.wait_index(samples) {
            Some(index) => (arena, Some(Planned::Fixed(index))),
            None => {
                let (arena, handle) = arena.allocate_wait(samples);
                (arena, Some(Planned::Dynamic(handle)))
            }
        },
        SlotEntry::Z(angle) => {
            let (arena, handle) = arena.allocate_z(angle);
            (arena, Some(Planned::Dynamic(handle)))
        }
        SlotEntry::Waveform {
            slot,
            samples,
            phase,
        } => {
            let (arena, handle) = arena.allocate_play(slot, samples, phase);
            (arena, Some(Planned::Dynamic(handle)))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
