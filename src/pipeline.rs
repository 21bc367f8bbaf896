//! Pipeline entry points.
//!
//! Two ways in: `run_pipeline` executes every stage, while `rebuild_grid`
//! re-runs only the cheap grid-dependent stages for an already analyzed
//! image. Callers cache the `SpectralAnalysis` per image and call
//! `rebuild_grid` when the user corrects the pitch or offset by hand.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analyzer::{analyze_image, AnalyzerSettings, SpectralAnalysis};
use crate::error::{RepixError, Result};
use crate::histogram::{color_histogram, ColorCount};
use crate::matte::{matte_background, MatteResult, MatteSettings};
use crate::resampler::{resample_grid, GridParams, Reconstruction};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSettings {
    pub analyzer: AnalyzerSettings,
    pub matte: MatteSettings,
}

/// Output of the grid-dependent stages
#[derive(Debug, Clone)]
pub struct GridOutput {
    pub reconstruction: Reconstruction,
    pub histogram: Vec<ColorCount>,
    /// Absent when the histogram is empty and no background color exists
    pub matte: Option<MatteResult>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub analysis: SpectralAnalysis,
    /// Source pixels per grid cell, absent when no grid was detected
    pub pitch: Option<f32>,
    /// Absent when no grid was detected
    pub grid: Option<GridOutput>,
}

/// Run the full pipeline. A raster without a detectable grid is a valid
/// result with empty grid outputs, not an error.
pub fn run_pipeline(img: &RgbaImage, settings: &PipelineSettings) -> Result<PipelineOutput> {
    let analysis = analyze_image(img, &settings.analyzer)?;
    let pitch = analysis.pitch(img.height());

    let grid = match GridParams::from_frequency(img.height(), analysis.dominant_frequency) {
        Some(params) => {
            info!(
                "grid detected: {} cells across height, pitch {:.2}px",
                analysis.dominant_frequency, params.pitch
            );
            Some(rebuild_grid(img, &params, &settings.matte)?)
        }
        None => {
            info!("no regular grid detected");
            None
        }
    };

    Ok(PipelineOutput {
        analysis,
        pitch,
        grid,
    })
}

/// Run only the grid-dependent stages with caller-supplied parameters.
pub fn rebuild_grid(
    img: &RgbaImage,
    params: &GridParams,
    matte: &MatteSettings,
) -> Result<GridOutput> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(RepixError::InvalidImage(format!(
            "zero-sized raster ({}x{})",
            width, height
        )));
    }

    let reconstruction = resample_grid(img, params)?;
    let histogram = color_histogram(&reconstruction.image);
    // the most frequent color is the background candidate
    let matte_result = histogram
        .first()
        .map(|top| matte_background(&reconstruction.image, top.color, matte));
    debug!(
        "reconstructed {}x{} with {} distinct colors",
        reconstruction.image.width(),
        reconstruction.image.height(),
        histogram.len()
    );

    Ok(GridOutput {
        reconstruction,
        histogram,
        matte: matte_result,
    })
}
