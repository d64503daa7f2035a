//! Waveform rendering
//!
//! Gantree: L4_Waveform → Render
//!
//! Turns a descriptor into the two sample vectors uploaded to the core's
//! output pair. RF envelopes are built as complex IQ samples and split
//! into I and Q.

use crate::catalog::WaveformCatalog;
use crate::descriptor::{DcShape, SlotId, WaveformDescriptor, WaveformShape};
use awgc_core::Samples;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Samples of one waveform on both outputs
/// Gantree: RenderedWaveform // 렌더링된 파형
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedWaveform {
    /// Slot in waveform memory
    pub slot_id: SlotId,
    /// Readable name
    pub semantic_key: String,
    /// First output
    pub channel0: Vec<f64>,
    /// Second output
    pub channel1: Vec<f64>,
}

impl RenderedWaveform {
    /// Number of samples
    pub fn len(&self) -> usize {
        self.channel0.len()
    }

    /// True if the waveform has no samples
    pub fn is_empty(&self) -> bool {
        self.channel0.is_empty()
    }

    /// Peak absolute amplitude over both outputs
    pub fn peak(&self) -> f64 {
        self.channel0
            .iter()
            .chain(self.channel1.iter())
            .fold(0.0, |m, v| m.max(v.abs()))
    }
}

/// Centred rectangular envelope of `active` samples in a `total` window
fn envelope<T: Copy>(total: Samples, active: Samples, on: T, off: T) -> Vec<T> {
    let total = total as usize;
    let active = (active as usize).min(total);
    let start = (total - active) / 2;
    (0..total)
        .map(|i| if i >= start && i < start + active { on } else { off })
        .collect()
}

/// Render one descriptor
/// Gantree: render(descriptor) -> RenderedWaveform // 샘플 생성
pub fn render(descriptor: &WaveformDescriptor) -> RenderedWaveform {
    let n = descriptor.sample_count;
    let (channel0, channel1) = match &descriptor.shape {
        WaveformShape::IqPulse { active, i_amp, q_amp } => {
            split_iq(envelope(n, *active, Complex64::new(*i_amp, *q_amp), Complex64::new(0.0, 0.0)))
        }
        WaveformShape::IqArbitrary { active, pulse } => {
            let on = Complex64::from_polar(pulse.amplitude, pulse.phase_deg.to_radians());
            split_iq(envelope(n, *active, on, Complex64::new(0.0, 0.0)))
        }
        WaveformShape::Dc { channels } => (render_dc(n, &channels[0]), render_dc(n, &channels[1])),
    };
    RenderedWaveform {
        slot_id: descriptor.slot_id,
        semantic_key: descriptor.semantic_key.clone(),
        channel0,
        channel1,
    }
}

fn split_iq(samples: Vec<Complex64>) -> (Vec<f64>, Vec<f64>) {
    samples.iter().map(|c| (c.re, c.im)).unzip()
}

fn render_dc(n: Samples, shape: &DcShape) -> Vec<f64> {
    match shape {
        DcShape::Silent => vec![0.0; n as usize],
        DcShape::Pulse { active, amp } => envelope(n, *active, *amp, 0.0),
    }
}

/// Render every waveform of a catalog in slot order
pub fn render_catalog(catalog: &WaveformCatalog) -> Vec<RenderedWaveform> {
    catalog.descriptors().iter().map(render).collect()
}

// ============================================================================
// Tests
// ============================================================================
