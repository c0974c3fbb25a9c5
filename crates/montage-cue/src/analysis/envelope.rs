//! Energy envelope extraction
//!
//! Decodes raw samples into a normalized RMS envelope (~50ms windows)
//! plus band-limited variants (low/mid/high) for multi-band beat
//! detection. Foundational; everything downstream consumes these.

use rayon::join;

/// RMS window length, seconds
pub const WINDOW_SECS: f64 = 0.05;

/// Low band upper cutoff (kick/bass region)
const LOW_CUTOFF_HZ: f32 = 200.0;
/// Mid band upper cutoff
const MID_CUTOFF_HZ: f32 = 2000.0;

/// Energy envelope: one normalized RMS value per fixed window
#[derive(Debug, Clone)]
pub struct EnergyEnvelope {
    values: Vec<f32>,
    window_secs: f64,
}

impl EnergyEnvelope {
    /// Compute the envelope of a mono sample buffer, normalized to its
    /// own maximum.
    pub fn from_samples(samples: &[f32], sample_rate: u32) -> Self {
        let window = ((sample_rate as f64 * WINDOW_SECS) as usize).max(1);
        let mut values: Vec<f32> = samples
            .chunks(window)
            .map(|chunk| {
                let sum_sq: f64 = chunk.iter().map(|&s| (s as f64) * (s as f64)).sum();
                (sum_sq / chunk.len() as f64).sqrt() as f32
            })
            .collect();

        let max = values.iter().cloned().fold(0.0f32, f32::max);
        if max > 0.0 {
            for v in &mut values {
                *v /= max;
            }
        }

        Self {
            values,
            window_secs: WINDOW_SECS,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    pub fn window_secs(&self) -> f64 {
        self.window_secs
    }

    /// Time at the center of window `i`
    #[inline]
    pub fn time_at(&self, i: usize) -> f64 {
        (i as f64 + 0.5) * self.window_secs
    }

    /// Envelope value at an arbitrary time (0 outside the track)
    pub fn value_at(&self, time: f64) -> f32 {
        if time < 0.0 {
            return 0.0;
        }
        let i = (time / self.window_secs) as usize;
        self.values.get(i).copied().unwrap_or(0.0)
    }

    /// Total covered duration, seconds
    pub fn duration(&self) -> f64 {
        self.values.len() as f64 * self.window_secs
    }
}

/// One-pole low-pass over a sample buffer
fn low_pass(samples: &[f32], sample_rate: u32, cutoff_hz: f32) -> Vec<f32> {
    let dt = 1.0 / sample_rate as f32;
    let rc = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz);
    let alpha = dt / (rc + dt);
    let mut out = Vec::with_capacity(samples.len());
    let mut acc = 0.0f32;
    for &s in samples {
        acc += alpha * (s - acc);
        out.push(acc);
    }
    out
}

/// Envelopes of the three band-limited passes
#[derive(Debug, Clone)]
pub struct BandEnvelopes {
    pub low: EnergyEnvelope,
    pub mid: EnergyEnvelope,
    pub high: EnergyEnvelope,
}

impl BandEnvelopes {
    /// Split the signal into low/mid/high bands and compute each band's
    /// envelope. The three passes run in parallel.
    pub fn split(samples: &[f32], sample_rate: u32) -> Self {
        let lp_low = low_pass(samples, sample_rate, LOW_CUTOFF_HZ);
        let lp_mid = low_pass(samples, sample_rate, MID_CUTOFF_HZ);

        let mid_band: Vec<f32> = lp_mid
            .iter()
            .zip(lp_low.iter())
            .map(|(m, l)| m - l)
            .collect();
        let high_band: Vec<f32> = samples
            .iter()
            .zip(lp_mid.iter())
            .map(|(s, m)| s - m)
            .collect();

        let (low, (mid, high)) = join(
            || EnergyEnvelope::from_samples(&lp_low, sample_rate),
            || {
                join(
                    || EnergyEnvelope::from_samples(&mid_band, sample_rate),
                    || EnergyEnvelope::from_samples(&high_band, sample_rate),
                )
            },
        );

        Self { low, mid, high }
    }
}
