//! Core registry (static channel map)
//!
//! Gantree: L1_Sequence → CoreRegistry
//!
//! Maps every GST channel index to the AWG core that drives it. The
//! registry is built once per compile and passed by reference into every
//! stage; nothing is stored in process-wide state.

use crate::error::{AwgcError, AwgcResult};
use crate::types::{ChannelIndex, ChannelRole, CoreId, DcChannel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

// ============================================================================
// Channel Map (input format)
// ============================================================================

/// One core entry of the channel map file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Role of the core
    pub role: ChannelRole,
    /// Physical output numbers on the instrument
    pub channel_core_numbers: Vec<u8>,
    /// GST indices driven by the core
    pub channel_global_numbers: Vec<ChannelIndex>,
    /// True if the external trigger is wired to this core
    #[serde(default)]
    pub trigger_wiring: bool,
}

/// `awg_id → core_index → CoreConfig`
pub type ChannelMap = BTreeMap<String, BTreeMap<usize, CoreConfig>>;

// ============================================================================
// CoreDescriptor
// ============================================================================

/// Static description of one output core
/// Gantree: CoreDescriptor // 코어 설명
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreDescriptor {
    /// Core id
    pub id: CoreId,
    /// RF or DC
    pub role: ChannelRole,
    /// Physical output pair
    pub channel_pair: [u8; 2],
    /// GST indices in output order
    pub channels: Vec<ChannelIndex>,
    /// True for the trigger-source core
    pub trigger_wired: bool,
}

impl CoreDescriptor {
    /// RF core driving one qubit index on outputs `2k+1, 2k+2`
    pub fn rf(awg: &str, core: usize, channel: ChannelIndex) -> Self {
        Self {
            id: CoreId::new(awg, core),
            role: ChannelRole::Rf,
            channel_pair: Self::default_pair(core),
            channels: vec![channel],
            trigger_wired: false,
        }
    }

    /// DC core driving two plunger indices
    pub fn dc(awg: &str, core: usize, p1: ChannelIndex, p2: ChannelIndex) -> Self {
        Self {
            id: CoreId::new(awg, core),
            role: ChannelRole::Dc,
            channel_pair: Self::default_pair(core),
            channels: vec![p1, p2],
            trigger_wired: false,
        }
    }

    /// Mark as trigger source
    pub fn with_trigger(mut self) -> Self {
        self.trigger_wired = true;
        self
    }

    fn default_pair(core: usize) -> [u8; 2] {
        let first = (2 * core + 1).min(u8::MAX as usize - 1) as u8;
        [first, first + 1]
    }

    /// Plunger position of a GST index on this core
    pub fn dc_channel_of(&self, channel: ChannelIndex) -> Option<DcChannel> {
        if self.role != ChannelRole::Dc {
            return None;
        }
        self.channels
            .iter()
            .position(|&c| c == channel)
            .and_then(DcChannel::from_position)
    }

    /// GST index of a plunger position
    pub fn channel_at(&self, channel: DcChannel) -> Option<ChannelIndex> {
        self.channels.get(channel.position()).copied()
    }

    /// Check the descriptor on its own
    fn validate(&self) -> AwgcResult<()> {
        let expected = self.role.channels_per_core();
        if self.channels.len() != expected {
            return Err(AwgcError::InvalidChannelMap(format!(
                "{} core {} must drive {} index(es), found {}",
                self.role,
                self.id,
                expected,
                self.channels.len()
            )));
        }
        if self.channels.contains(&0) {
            return Err(AwgcError::InvalidChannelMap(format!(
                "core {} uses index 0; GST indices are 1-based",
                self.id
            )));
        }
        Ok(())
    }
}

impl fmt::Display for CoreDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} outputs {:?} indices {:?}{}",
            self.role,
            self.id,
            self.channel_pair,
            self.channels,
            if self.trigger_wired { " [trigger]" } else { "" }
        )
    }
}

// ============================================================================
// Channel Binding
// ============================================================================

/// Where a GST index lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelBinding {
    /// Owning core
    pub core: CoreId,
    /// Role of the owning core
    pub role: ChannelRole,
    /// Plunger position, DC only
    pub dc_channel: Option<DcChannel>,
}

// ============================================================================
// CoreRegistry
// ============================================================================

/// Validated set of cores, indexed by core id and by GST index
/// Gantree: CoreRegistry // 코어 레지스트리
#[derive(Debug, Clone, PartialEq)]
pub struct CoreRegistry {
    cores: Vec<CoreDescriptor>,
    bindings: BTreeMap<ChannelIndex, ChannelBinding>,
}

impl CoreRegistry {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Build and validate a registry
    /// Gantree: new(Vec<CoreDescriptor>) -> Result<Self> // 생성+검증
    pub fn new(mut cores: Vec<CoreDescriptor>) -> AwgcResult<Self> {
        if cores.is_empty() {
            return Err(AwgcError::InvalidChannelMap("no cores configured".into()));
        }
        cores.sort_by(|a, b| a.id.cmp(&b.id));

        let mut bindings = BTreeMap::new();
        for (i, descriptor) in cores.iter().enumerate() {
            descriptor.validate()?;
            if i > 0 && cores[i - 1].id == descriptor.id {
                return Err(AwgcError::InvalidChannelMap(format!(
                    "core {} declared twice",
                    descriptor.id
                )));
            }
            for (position, &channel) in descriptor.channels.iter().enumerate() {
                let binding = ChannelBinding {
                    core: descriptor.id.clone(),
                    role: descriptor.role,
                    dc_channel: match descriptor.role {
                        ChannelRole::Rf => None,
                        ChannelRole::Dc => DcChannel::from_position(position),
                    },
                };
                if bindings.insert(channel, binding).is_some() {
                    return Err(AwgcError::InvalidChannelMap(format!(
                        "index {} mapped to more than one channel",
                        channel
                    )));
                }
            }
        }

        let triggers = cores.iter().filter(|c| c.trigger_wired).count();
        if triggers != 1 {
            return Err(AwgcError::TriggerSource { count: triggers });
        }

        Ok(Self { cores, bindings })
    }

    /// Build from the nested channel-map format
    pub fn from_channel_map(map: &ChannelMap) -> AwgcResult<Self> {
        let mut cores = Vec::new();
        for (awg, awg_cores) in map {
            for (&core, config) in awg_cores {
                if config.channel_core_numbers.len() != 2 {
                    return Err(AwgcError::InvalidChannelMap(format!(
                        "{}/core{} must list two output numbers",
                        awg, core
                    )));
                }
                cores.push(CoreDescriptor {
                    id: CoreId::new(awg.clone(), core),
                    role: config.role,
                    channel_pair: [config.channel_core_numbers[0], config.channel_core_numbers[1]],
                    channels: config.channel_global_numbers.clone(),
                    trigger_wired: config.trigger_wiring,
                });
            }
        }
        Self::new(cores)
    }

    /// Parse a channel map from JSON
    pub fn from_json(json: &str) -> AwgcResult<Self> {
        let map: ChannelMap = serde_json::from_str(json)?;
        Self::from_channel_map(&map)
    }

    /// Load a channel map file
    pub fn from_json_file(path: impl AsRef<Path>) -> AwgcResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Export back to the channel-map format
    pub fn to_channel_map(&self) -> ChannelMap {
        let mut map = ChannelMap::new();
        for descriptor in &self.cores {
            map.entry(descriptor.id.awg.clone()).or_default().insert(
                descriptor.id.core,
                CoreConfig {
                    role: descriptor.role,
                    channel_core_numbers: descriptor.channel_pair.to_vec(),
                    channel_global_numbers: descriptor.channels.clone(),
                    trigger_wiring: descriptor.trigger_wired,
                },
            );
        }
        map
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// All cores, ordered by id
    pub fn cores(&self) -> &[CoreDescriptor] {
        &self.cores
    }

    /// Number of cores
    pub fn len(&self) -> usize {
        self.cores.len()
    }

    /// Never true for a validated registry
    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    /// Look up a core
    pub fn get(&self, id: &CoreId) -> Option<&CoreDescriptor> {
        self.cores
            .binary_search_by(|c| c.id.cmp(id))
            .ok()
            .map(|i| &self.cores[i])
    }

    /// Cores of one role
    pub fn cores_with_role(&self, role: ChannelRole) -> impl Iterator<Item = &CoreDescriptor> {
        self.cores.iter().filter(move |c| c.role == role)
    }

    /// RF cores
    pub fn rf_cores(&self) -> impl Iterator<Item = &CoreDescriptor> {
        self.cores_with_role(ChannelRole::Rf)
    }

    /// DC cores
    pub fn dc_cores(&self) -> impl Iterator<Item = &CoreDescriptor> {
        self.cores_with_role(ChannelRole::Dc)
    }

    /// True if any DC core is configured
    pub fn has_dc(&self) -> bool {
        self.dc_cores().next().is_some()
    }

    /// Binding of a GST index
    pub fn binding(&self, channel: ChannelIndex) -> AwgcResult<&ChannelBinding> {
        self.bindings
            .get(&channel)
            .ok_or(AwgcError::UnknownChannel(channel))
    }

    /// All configured GST indices, ascending
    pub fn channels(&self) -> impl Iterator<Item = (&ChannelIndex, &ChannelBinding)> {
        self.bindings.iter()
    }

    /// The single trigger-wired core
    pub fn trigger_source(&self) -> &CoreDescriptor {
        // new() guarantees exactly one
        self.cores
            .iter()
            .find(|c| c.trigger_wired)
            .unwrap_or(&self.cores[0])
    }
}

impl fmt::Display for CoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CoreRegistry ({} cores)", self.cores.len())?;
        for core in &self.cores {
            writeln!(f, "  {}", core)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn two_rf_one_dc() -> Vec<CoreDescriptor> {
        vec![
            CoreDescriptor::rf("dev8001", 0, 1).with_trigger(),
            CoreDescriptor::rf("dev8001", 1, 2),
            CoreDescriptor::dc("dev8002", 0, 5, 6),
        ]
    }

    #[test]
    fn test_registry_bindings() {
        let registry = CoreRegistry::new(two_rf_one_dc()).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.rf_cores().count(), 2);
        assert!(registry.has_dc());

        let binding = registry.binding(6).unwrap();
        assert_eq!(binding.role, ChannelRole::Dc);
        assert_eq!(binding.dc_channel, Some(DcChannel::P2));
        assert_eq!(binding.core, CoreId::new("dev8002", 0));

        assert_eq!(registry.binding(9), Err(AwgcError::UnknownChannel(9)));
        assert_eq!(registry.trigger_source().id, CoreId::new("dev8001", 0));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let cores = vec![
            CoreDescriptor::rf("dev8001", 0, 1).with_trigger(),
            CoreDescriptor::rf("dev8001", 1, 1),
        ];
        assert!(matches!(
            CoreRegistry::new(cores),
            Err(AwgcError::InvalidChannelMap(_))
        ));
    }

    #[test]
    fn test_trigger_source_count() {
        let none = vec![CoreDescriptor::rf("dev8001", 0, 1)];
        assert_eq!(
            CoreRegistry::new(none),
            Err(AwgcError::TriggerSource { count: 0 })
        );

        let two = vec![
            CoreDescriptor::rf("dev8001", 0, 1).with_trigger(),
            CoreDescriptor::rf("dev8001", 1, 2).with_trigger(),
        ];
        assert_eq!(
            CoreRegistry::new(two),
            Err(AwgcError::TriggerSource { count: 2 })
        );
    }

    #[test]
    fn test_wrong_channel_count() {
        let mut dc = CoreDescriptor::dc("dev8002", 0, 5, 6);
        dc.channels.pop();
        let cores = vec![CoreDescriptor::rf("dev8001", 0, 1).with_trigger(), dc];
        assert!(CoreRegistry::new(cores).is_err());
    }

    #[test]
    fn test_channel_map_json() {
        let json = r#"{
            "dev8001": {
                "0": {"role": "rf", "channel_core_numbers": [1, 2],
                      "channel_global_numbers": [1], "trigger_wiring": true},
                "1": {"role": "rf", "channel_core_numbers": [3, 4],
                      "channel_global_numbers": [2]}
            },
            "dev8002": {
                "0": {"role": "dc", "channel_core_numbers": [1, 2],
                      "channel_global_numbers": [5, 6]}
            }
        }"#;
        let registry = CoreRegistry::from_json(json).unwrap();
        assert_eq!(registry.len(), 3);
        let rf1 = registry.get(&CoreId::new("dev8001", 1)).unwrap();
        assert_eq!(rf1.channel_pair, [3, 4]);
        assert!(!rf1.trigger_wired);

        let again = CoreRegistry::from_channel_map(&registry.to_channel_map()).unwrap();
        assert_eq!(again, registry);
    }
}
