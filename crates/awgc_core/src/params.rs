//! Gate-parameter table
//!
//! Gantree: L1_Sequence → GateParameterTable
//!
//! Per-index calibration input: pulse lengths and amplitudes of the RF
//! rotations and of the DC plunger pulses. Lengths are nanoseconds; the
//! timing crate turns them into samples.

use crate::error::{AwgcError, AwgcResult};
use crate::registry::CoreRegistry;
use crate::types::{ChannelIndex, ChannelRole, Nanoseconds};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Calibration of one RF index
/// Gantree: RfParameters // tau_pi, tau_pi_2, i_amp, q_amp, mod_freq
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RfParameters {
    /// π pulse length (ns)
    pub tau_pi: Nanoseconds,
    /// π/2 pulse length (ns)
    pub tau_pi_2: Nanoseconds,
    /// In-phase amplitude
    pub i_amp: f64,
    /// Quadrature amplitude
    pub q_amp: f64,
    /// Oscillator frequency (Hz)
    pub mod_freq: f64,
}

impl RfParameters {
    /// Create parameters
    pub fn new(tau_pi: Nanoseconds, tau_pi_2: Nanoseconds, i_amp: f64, q_amp: f64, mod_freq: f64) -> Self {
        Self {
            tau_pi,
            tau_pi_2,
            i_amp,
            q_amp,
            mod_freq,
        }
    }
}

/// Calibration of one plunger index
/// Gantree: PlungerParameters // tau, amp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlungerParameters {
    /// Pulse length (ns)
    pub tau: Nanoseconds,
    /// Pulse amplitude
    pub amp: f64,
}

impl PlungerParameters {
    /// Create parameters
    pub fn new(tau: Nanoseconds, amp: f64) -> Self {
        Self { tau, amp }
    }
}

/// All calibration inputs of one compile
/// Gantree: GateParameterTable // rf + plunger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateParameterTable {
    /// RF index → parameters
    #[serde(default)]
    pub rf: BTreeMap<ChannelIndex, RfParameters>,
    /// Plunger index → parameters
    #[serde(default)]
    pub plunger: BTreeMap<ChannelIndex, PlungerParameters>,
}

impl GateParameterTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add RF parameters (builder)
    pub fn with_rf(mut self, channel: ChannelIndex, params: RfParameters) -> Self {
        self.rf.insert(channel, params);
        self
    }

    /// Add plunger parameters (builder)
    pub fn with_plunger(mut self, channel: ChannelIndex, params: PlungerParameters) -> Self {
        self.plunger.insert(channel, params);
        self
    }

    /// RF parameters of an index
    pub fn rf(&self, channel: ChannelIndex) -> AwgcResult<&RfParameters> {
        self.rf.get(&channel).ok_or(AwgcError::MissingCalibration {
            channel,
            kind: "RF",
        })
    }

    /// Plunger parameters of an index
    pub fn plunger(&self, channel: ChannelIndex) -> AwgcResult<&PlungerParameters> {
        self.plunger.get(&channel).ok_or(AwgcError::MissingCalibration {
            channel,
            kind: "plunger",
        })
    }

    /// Check that every configured index has parameters of the right kind
    /// and that lengths and amplitudes are usable
    pub fn validate_against(&self, registry: &CoreRegistry) -> AwgcResult<()> {
        for (&channel, binding) in registry.channels() {
            match binding.role {
                ChannelRole::Rf => {
                    let p = self.rf(channel)?;
                    check_length(channel, "tau_pi", p.tau_pi)?;
                    check_length(channel, "tau_pi_2", p.tau_pi_2)?;
                    check_amplitude(channel, "i_amp", p.i_amp)?;
                    check_amplitude(channel, "q_amp", p.q_amp)?;
                    if !p.mod_freq.is_finite() {
                        return Err(AwgcError::InvalidConfig(format!(
                            "mod_freq of index {} is not finite",
                            channel
                        )));
                    }
                }
                ChannelRole::Dc => {
                    let p = self.plunger(channel)?;
                    check_length(channel, "tau", p.tau)?;
                    check_amplitude(channel, "amp", p.amp)?;
                }
            }
        }
        Ok(())
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> AwgcResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> AwgcResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> AwgcResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn check_length(channel: ChannelIndex, name: &str, value: Nanoseconds) -> AwgcResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AwgcError::InvalidConfig(format!(
            "{} of index {} must be a positive length, got {}",
            name, channel, value
        )));
    }
    Ok(())
}

fn check_amplitude(channel: ChannelIndex, name: &str, value: f64) -> AwgcResult<()> {
    if !value.is_finite() || value.abs() > 1.0 {
        return Err(AwgcError::InvalidConfig(format!(
            "{} of index {} must lie in [-1, 1], got {}",
            name, channel, value
        )));
    }
    Ok(())
}

impl fmt::Display for GateParameterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "GateParameterTable")?;
        for (idx, p) in &self.rf {
            writeln!(
                f,
                "  RF {:>3}: tau_pi={:.2} ns, tau_pi_2={:.2} ns, amp=({:.3}, {:.3}), f={:.3e} Hz",
                idx, p.tau_pi, p.tau_pi_2, p.i_amp, p.q_amp, p.mod_freq
            )?;
        }
        for (idx, p) in &self.plunger {
            writeln!(f, "  P  {:>3}: tau={:.2} ns, amp={:.3}", idx, p.tau, p.amp)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
