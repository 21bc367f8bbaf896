//! Spectral grid detection.
//!
//! Samples random vertical lines from the source raster, transforms each
//! line's luminance derivative with an FFT, sums the magnitude spectra and
//! picks the dominant frequency bin. The bin index is the number of grid
//! cells spanning the image height, so `height / bin` is the pitch of the
//! original pixel grid.

use image::RgbaImage;
use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RepixError, Result};

/// Upper bound on combined-spectrum bins, keeps memory bounded for huge rasters
const MAX_SPECTRUM_BINS: usize = 10_000;

/// Minimum ratio between a sub-harmonic bin and the detected peak for the
/// sub-harmonic to be accepted as the fundamental
const FUNDAMENTAL_RATIO: f32 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerSettings {
    /// Number of vertical lines to sample (capped at the image width)
    pub line_count: usize,
    /// Seed for the line-selection generator; equal seeds select equal lines
    pub seed: u64,
    /// Standard deviation of the spectrum-smoothing Gaussian
    pub smoothing_sigma: f32,
    /// Smoothing kernel size; even values are rounded up to the next odd
    pub smoothing_kernel: usize,
    /// First bin considered by peak detection, skips DC and near-DC bins
    pub peak_start: usize,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            line_count: 30,
            seed: 1,
            smoothing_sigma: 2.0,
            smoothing_kernel: 7,
            peak_start: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpectralAnalysis {
    /// Dominant frequency bin, 0 when no regular grid was detected
    pub dominant_frequency: usize,
    pub combined_spectrum: Vec<f32>,
    pub smoothed_spectrum: Vec<f32>,
    /// Columns that contributed to the combined spectrum
    pub sampled_columns: Vec<u32>,
}

impl SpectralAnalysis {
    /// Source pixels per grid cell implied by the detected frequency
    pub fn pitch(&self, height: u32) -> Option<f32> {
        if self.dominant_frequency == 0 {
            None
        } else {
            Some(height as f32 / self.dominant_frequency as f32)
        }
    }
}

// ============================================================================
// LINE SAMPLING
// ============================================================================

/// Deterministic xorshift64 generator for reproducible line selection
struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    fn new(seed: u64) -> Self {
        // xorshift state must never be zero
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }
}

/// Pick distinct column indices via a partial Fisher-Yates shuffle
fn select_columns(width: u32, count: usize, seed: u64) -> Vec<u32> {
    let count = count.min(width as usize);
    let mut pool: Vec<u32> = (0..width).collect();
    let mut rng = Xorshift64::new(seed);

    for i in 0..count {
        let j = i + rng.next_below((pool.len() - i) as u64) as usize;
        pool.swap(i, j);
    }

    let mut columns = pool[..count].to_vec();
    columns.sort_unstable();
    columns
}

/// Per-row luminance of one column, mean of the color channels (alpha ignored)
fn luminance_column(img: &RgbaImage, x: u32) -> Vec<f32> {
    (0..img.height())
        .map(|y| {
            let p = img.get_pixel(x, y);
            (p[0] as f32 + p[1] as f32 + p[2] as f32) / 3.0
        })
        .collect()
}

/// Absolute first difference; empty for signals shorter than two samples
fn abs_derivative(luminance: &[f32]) -> Vec<f32> {
    luminance.windows(2).map(|w| (w[1] - w[0]).abs()).collect()
}

// ============================================================================
// SPECTRAL ANALYSIS
// ============================================================================

/// Magnitude spectrum of a real signal; transform length equals signal length
fn magnitude_spectrum(fft: &dyn Fft<f32>, signal: &[f32]) -> Vec<f32> {
    let mut buffer: Vec<Complex<f32>> =
        signal.iter().map(|&v| Complex::new(v, 0.0)).collect();
    fft.process(&mut buffer);
    buffer.iter().map(|c| c.norm()).collect()
}

/// Sum per-line magnitude spectra into one combined spectrum.
///
/// Lines shorter than a bin index contribute nothing to that bin. The output
/// is truncated to half the image height (bins above Nyquist mirror the
/// lower half) and always holds at least one bin.
fn combine_spectra(spectra: &[Vec<f32>], height: u32) -> Result<Vec<f32>> {
    let max_len = spectra.iter().map(|m| m.len()).max().unwrap_or(0);
    if max_len == 0 {
        return Err(RepixError::InsufficientSignal(
            "no sampled line produced a derivative signal".to_string(),
        ));
    }

    let len = max_len
        .min((height as usize) / 2)
        .min(MAX_SPECTRUM_BINS)
        .max(1);

    let mut combined = vec![0.0f32; len];
    for magnitudes in spectra {
        for (i, &m) in magnitudes.iter().take(len).enumerate() {
            combined[i] += m;
        }
    }
    Ok(combined)
}

// ============================================================================
// SMOOTHING + PEAK DETECTION
// ============================================================================

/// Gaussian-smooth a spectrum. At the array edges the kernel is truncated to
/// the in-range taps and renormalized, so a constant input stays constant.
pub(crate) fn gaussian_smooth(input: &[f32], sigma: f32, kernel_size: usize) -> Vec<f32> {
    let size = if kernel_size % 2 == 0 {
        kernel_size + 1
    } else {
        kernel_size
    };
    if input.is_empty() || sigma <= 0.0 || size <= 1 {
        return input.to_vec();
    }

    let half = (size / 2) as isize;
    let weights: Vec<f32> = (-half..=half)
        .map(|j| (-(j * j) as f32 / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f32 = weights.iter().sum();
    let weights: Vec<f32> = weights.iter().map(|w| w / total).collect();

    let len = input.len() as isize;
    (0..len)
        .map(|i| {
            let mut acc = 0.0f32;
            let mut weight_sum = 0.0f32;
            for j in -half..=half {
                let idx = i + j;
                if idx >= 0 && idx < len {
                    let w = weights[(j + half) as usize];
                    acc += input[idx as usize] * w;
                    weight_sum += w;
                }
            }
            acc / weight_sum
        })
        .collect()
}

/// Index of the strongest bin at or past `start`; 0 when nothing positive is
/// found. Strict comparison, so the left-most of equal maxima wins.
pub(crate) fn find_peak(smoothed: &[f32], start: usize) -> usize {
    let mut best = 0.0f32;
    let mut peak = 0usize;
    for (i, &value) in smoothed.iter().enumerate().skip(start) {
        if value > best {
            best = value;
            peak = i;
        }
    }
    peak
}

/// Demote a harmonic peak to its fundamental.
///
/// Smoothing integrates the leakage of off-bin harmonics into wide humps
/// that can out-score a bin-aligned fundamental, so the raw combined
/// spectrum is checked around `peak / m` for m = 4, 3, 2: if a sub-harmonic
/// bin carries at least half the strength of the peak's own neighborhood,
/// that bin is the grid frequency.
fn refine_fundamental(combined: &[f32], peak: usize, start: usize) -> usize {
    if peak == 0 {
        return 0;
    }
    let len = combined.len();
    let lo_ref = peak.saturating_sub(1);
    let hi_ref = (peak + 1).min(len - 1);
    let reference = combined[lo_ref..=hi_ref]
        .iter()
        .cloned()
        .fold(0.0f32, f32::max);

    for divisor in [4usize, 3, 2] {
        let lo = (((peak as f32 - 1.0) / divisor as f32).floor() as usize).max(start);
        let hi = (((peak as f32 + 1.0) / divisor as f32).ceil() as usize).min(len - 1);
        if lo > hi || lo >= peak {
            continue;
        }
        let (candidate, value) = (lo..=hi)
            .map(|i| (i, combined[i]))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap();
        if value >= FUNDAMENTAL_RATIO * reference {
            return candidate;
        }
    }
    peak
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Run the expensive analysis stages: line sampling, per-line FFT, spectrum
/// aggregation, smoothing and peak detection.
///
/// The result is cacheable per image; grid reconstruction can then be re-run
/// with adjusted parameters without repeating this work.
pub fn analyze_image(img: &RgbaImage, settings: &AnalyzerSettings) -> Result<SpectralAnalysis> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(RepixError::InvalidImage(format!(
            "zero-sized raster ({}x{})",
            width, height
        )));
    }

    let columns = select_columns(width, settings.line_count, settings.seed);
    debug!("sampling {} vertical lines", columns.len());

    let spectra: Vec<Vec<f32>> = if height < 2 {
        // no derivative is possible, every line is empty
        Vec::new()
    } else {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(height as usize - 1);
        columns
            .par_iter()
            .map(|&x| {
                let derivative = abs_derivative(&luminance_column(img, x));
                magnitude_spectrum(fft.as_ref(), &derivative)
            })
            .collect()
    };

    let combined = combine_spectra(&spectra, height)?;
    let smoothed = gaussian_smooth(&combined, settings.smoothing_sigma, settings.smoothing_kernel);
    let peak = find_peak(&smoothed, settings.peak_start);
    let dominant_frequency = refine_fundamental(&combined, peak, settings.peak_start);
    if dominant_frequency != peak {
        debug!(
            "smoothed peak {} demoted to fundamental {}",
            peak, dominant_frequency
        );
    }

    Ok(SpectralAnalysis {
        dominant_frequency,
        combined_spectrum: combined,
        smoothed_spectrum: smoothed,
        sampled_columns: columns,
    })
}

// ============================================================================
// TESTS
// ============================================================================
