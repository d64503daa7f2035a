//! Gate-Line Parser
//!
//! Gantree: L3_Parse → GateLineParser
//!
//! Binds lexed gates to cores and fills every step up to the full set of
//! configured indices: absent indices wait for the step duration, and in
//! a step made of virtual Z gates they receive the z0z placeholder. A
//! zero-length wait lasts nothing and leaves its step empty.

use crate::token::{lex_step, RawGate, RawOp};
use awgc_core::{
    ArbitraryPulse, AwgcError, AwgcResult, ChannelBinding, ChannelIndex, ChannelRole, CoreId,
    CoreRegistry, CoreSlot, GateOp, GateToken, Samples, SequenceLine,
};
use awgc_core::phase::is_zero;
use awgc_timing::LengthTable;
use std::collections::{BTreeMap, BTreeSet};

/// Parser of single GST lines
/// Gantree: GateLineParser // 라인 파서
#[derive(Debug, Clone, Copy)]
pub struct GateLineParser<'a> {
    registry: &'a CoreRegistry,
    lengths: &'a LengthTable,
}

impl<'a> GateLineParser<'a> {
    /// Create a parser over a registry and resolved lengths
    pub fn new(registry: &'a CoreRegistry, lengths: &'a LengthTable) -> Self {
        Self { registry, lengths }
    }

    /// Parse one line, `tok;tok;...;`
    /// Gantree: parse_line(number, text) -> Result<SequenceLine> // 라인 파싱
    pub fn parse_line(&self, number: usize, text: &str) -> AwgcResult<SequenceLine> {
        let mut line = SequenceLine::new(number);
        for step in text.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (duration, slots) = self.parse_step(number, step)?;
            line.push_step(duration, slots);
        }
        for core in self.registry.cores() {
            line.tracks.entry(core.id.clone()).or_default();
        }
        Ok(line)
    }

    fn parse_step(
        &self,
        number: usize,
        step: &str,
    ) -> AwgcResult<(Samples, BTreeMap<CoreId, CoreSlot>)> {
        let gates = lex_step(number, step)?;

        let mut explicit: BTreeMap<ChannelIndex, GateToken> = BTreeMap::new();
        let mut seen = BTreeSet::new();
        for gate in &gates {
            if !seen.insert(gate.channel) {
                return Err(AwgcError::parse(
                    number,
                    gate.to_string(),
                    format!("index {} appears twice in one step", gate.channel),
                ));
            }
            let binding = self.registry.binding(gate.channel).map_err(|_| {
                AwgcError::parse(
                    number,
                    gate.to_string(),
                    format!("index {} is not in the channel map", gate.channel),
                )
            })?;
            let op = self.bind_op(number, gate, binding)?;
            explicit.insert(
                gate.channel,
                GateToken::explicit(binding.core.clone(), binding.role, gate.channel, op),
            );
        }

        let virtual_gates = gates
            .iter()
            .filter(|g| matches!(g.op, RawOp::VirtualZ(_)))
            .count();
        if virtual_gates > 0 && virtual_gates < gates.len() {
            let first = gates
                .iter()
                .find(|g| matches!(g.op, RawOp::VirtualZ(_)))
                .map(|g| g.to_string())
                .unwrap_or_default();
            return Err(AwgcError::parse(
                number,
                first,
                "virtual Z cannot share a step with timed gates",
            ));
        }
        let z_step = virtual_gates > 0;

        let duration = explicit
            .values()
            .map(|t| self.lengths.natural_samples(&t.op))
            .max()
            .unwrap_or(0);

        let mut slots = BTreeMap::new();
        for core in self.registry.cores() {
            let tokens = core
                .channels
                .iter()
                .map(|&channel| {
                    explicit.remove(&channel).unwrap_or_else(|| {
                        let fill = if z_step {
                            GateOp::NoOp
                        } else {
                            GateOp::Wait(duration)
                        };
                        GateToken::synthesized(core.id.clone(), core.role, channel, fill)
                    })
                })
                .collect();
            slots.insert(core.id.clone(), CoreSlot::new(tokens));
        }

        Ok((duration, slots))
    }

    fn bind_op(&self, number: usize, gate: &RawGate, binding: &ChannelBinding) -> AwgcResult<GateOp> {
        let reject = |reason: &str| Err(AwgcError::parse(number, gate.to_string(), reason));
        match (&gate.op, binding.role) {
            (RawOp::Rotation(kind), ChannelRole::Rf) => Ok(GateOp::Rotation(*kind)),
            (RawOp::Rotation(_), ChannelRole::Dc) => reject("rotation on a DC index"),
            (RawOp::Plunger, ChannelRole::Dc) => match binding.dc_channel {
                Some(channel) => Ok(GateOp::PlungerPulse(channel)),
                None => reject("DC index without a plunger position"),
            },
            (RawOp::Plunger, ChannelRole::Rf) => reject("plunger pulse on an RF index"),
            (RawOp::VirtualZ(_), ChannelRole::Dc) => reject("virtual Z on a DC index"),
            (RawOp::VirtualZ(angle), ChannelRole::Rf) if is_zero(*angle) => Ok(GateOp::NoOp),
            (RawOp::VirtualZ(angle), ChannelRole::Rf) => Ok(GateOp::ArbitraryZ(*angle)),
            (RawOp::Wait(ns), _) if self.lengths.raw_samples(*ns) == Some(0) => Ok(GateOp::Wait(0)),
            (RawOp::Wait(ns), _) => match self.lengths.aligned_samples(*ns) {
                Some(samples) => Ok(GateOp::Wait(samples)),
                None => reject("wait too long"),
            },
            (RawOp::Arbitrary { label, values }, _) => {
                let samples = match self.lengths.aligned_samples(values[0]) {
                    Some(samples) => samples,
                    None => return reject("arbitrary waveform too long"),
                };
                Ok(GateOp::ArbitraryWaveform(ArbitraryPulse {
                    label: label.clone(),
                    duration_ns: values[0],
                    amplitude: values.get(1).copied().unwrap_or(1.0),
                    phase_deg: values.get(2).copied().unwrap_or(0.0),
                    extra: values.iter().skip(3).copied().collect(),
                    samples,
                }))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use awgc_core::{CoreDescriptor, DcChannel, RotationKind};

    fn registry() -> CoreRegistry {
        CoreRegistry::new(vec![
            CoreDescriptor::rf("dev8001", 0, 1).with_trigger(),
            CoreDescriptor::rf("dev8001", 1, 2),
            CoreDescriptor::dc("dev8002", 0, 5, 6),
        ])
        .unwrap()
    }

    fn lengths() -> LengthTable {
        LengthTable {
            sample_rate_gsa: 2.4,
            side_padding_ns: 0.0,
            half_pi: 80,
            pi: 160,
            plunger: [96, 96],
            has_dc: true,
            cores: BTreeMap::new(),
        }
    }

    fn rf(core: usize) -> CoreId {
        CoreId::new("dev8001", core)
    }

    #[test]
    fn test_waits_synthesized_for_absent_indices() {
        let (r, l) = (registry(), lengths());
        let line = GateLineParser::new(&r, &l).parse_line(2, "(1)x;(2)t100;").unwrap();
        assert_eq!(line.step_durations, vec![80, 240]);
        assert!(line.is_padded());

        let core2 = line.track(&rf(1)).unwrap();
        assert_eq!(core2[0].tokens[0].op, GateOp::Wait(80));
        assert!(core2[0].is_synthesized());
        assert_eq!(core2[1].tokens[0].op, GateOp::Wait(240));
        assert!(!core2[1].is_synthesized());

        let dc = line.track(&CoreId::new("dev8002", 0)).unwrap();
        assert_eq!(dc[1].tokens.len(), 2);
        assert_eq!(dc[1].tokens[1].op, GateOp::Wait(240));
    }

    #[test]
    fn test_zero_wait_is_empty() {
        let (r, l) = (registry(), lengths());
        let parser = GateLineParser::new(&r, &l);
        let line = parser.parse_line(1, "(1)t0;").unwrap();
        assert_eq!(line.step_durations, vec![0]);
        assert_eq!(line.track(&rf(0)).unwrap()[0].tokens[0].op, GateOp::Wait(0));
        assert_eq!(line.track(&rf(1)).unwrap()[0].tokens[0].op, GateOp::Wait(0));

        // alongside a pulse the step keeps the pulse length
        let line = parser.parse_line(1, "(1)t0(2)x;").unwrap();
        assert_eq!(line.step_durations, vec![80]);
        // the shortest non-zero wait still lands on the grid floor
        let line = parser.parse_line(1, "(1)t1;").unwrap();
        assert_eq!(line.step_durations, vec![48]);
    }

    #[test]
    fn test_z_broadcasts_noop() {
        let (r, l) = (registry(), lengths());
        let line = GateLineParser::new(&r, &l).parse_line(1, "(2)z45z;").unwrap();
        assert_eq!(line.step_durations, vec![0]);
        assert_eq!(line.track(&rf(1)).unwrap()[0].tokens[0].op, GateOp::ArbitraryZ(45.0));
        assert_eq!(line.track(&rf(0)).unwrap()[0].tokens[0].op, GateOp::NoOp);

        let zero = GateLineParser::new(&r, &l).parse_line(1, "(2)z0z;").unwrap();
        assert_eq!(zero.track(&rf(1)).unwrap()[0].tokens[0].op, GateOp::NoOp);
    }

    #[test]
    fn test_plunger_and_multi_gate_step() {
        let (r, l) = (registry(), lengths());
        let line = GateLineParser::new(&r, &l).parse_line(1, "(1)x(2)xx(6)p;").unwrap();
        assert_eq!(line.step_durations, vec![160]);
        let dc = line.track(&CoreId::new("dev8002", 0)).unwrap();
        assert_eq!(dc[0].tokens[0].op, GateOp::Wait(160));
        assert_eq!(dc[0].tokens[1].op, GateOp::PlungerPulse(DcChannel::P2));
        assert_eq!(
            line.track(&rf(1)).unwrap()[0].tokens[0].op,
            GateOp::Rotation(RotationKind::Xx)
        );
    }

    #[test]
    fn test_arbitrary_waveform_defaults() {
        let (r, l) = (registry(), lengths());
        let line = GateLineParser::new(&r, &l).parse_line(1, "(1)*sq[50];").unwrap();
        match &line.track(&rf(0)).unwrap()[0].tokens[0].op {
            GateOp::ArbitraryWaveform(pulse) => {
                assert_eq!(pulse.samples, 128);
                assert_eq!(pulse.amplitude, 1.0);
                assert_eq!(pulse.phase_deg, 0.0);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(line.step_durations, vec![128]);
    }

    #[test]
    fn test_binding_errors() {
        let (r, l) = (registry(), lengths());
        let parser = GateLineParser::new(&r, &l);
        for bad in [
            "(9)x;",
            "(5)x;",
            "(1)p;",
            "(5)z10;",
            "(1)z10(2)x;",
            "(1)x(1)y;",
        ] {
            assert!(
                matches!(parser.parse_line(3, bad), Err(AwgcError::Parse { line: 3, .. })),
                "{} should fail",
                bad
            );
        }
    }

    #[test]
    fn test_empty_line_has_empty_tracks() {
        let (r, l) = (registry(), lengths());
        let line = GateLineParser::new(&r, &l).parse_line(1, ";").unwrap();
        assert_eq!(line.num_steps(), 0);
        assert_eq!(line.tracks.len(), 3);
    }
}
