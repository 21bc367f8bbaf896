//! Native pixel-grid estimation and reconstruction for upscaled pixel art.
//!
//! Given a decoded RGBA raster that is suspected to be an integer-scaled
//! pixel-art image, this crate estimates the spacing of the original pixel
//! grid and rebuilds the image at its native resolution:
//!
//! 1. sample random vertical lines and take the absolute luminance
//!    derivative of each,
//! 2. transform the derivatives to magnitude spectra and sum them,
//! 3. smooth the combined spectrum and pick the dominant frequency bin,
//!    which is the number of grid cells across the image height,
//! 4. resample one representative pixel per grid cell,
//! 5. histogram the reconstructed colors, and
//! 6. flood-fill the most frequent color from the border to cut out the
//!    background.
//!
//! Decoding, encoding, persistence and display are the caller's concern;
//! the boundary type in both directions is [`image::RgbaImage`].
//!
//! ```no_run
//! use repix::{run_pipeline, PipelineSettings};
//!
//! # fn demo(raster: image::RgbaImage) -> repix::Result<()> {
//! let output = run_pipeline(&raster, &PipelineSettings::default())?;
//! if let Some(pitch) = output.pitch {
//!     println!("grid pitch: {:.2} source pixels", pitch);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod error;
pub mod histogram;
pub mod matte;
pub mod pipeline;
pub mod resampler;

pub use analyzer::{analyze_image, AnalyzerSettings, SpectralAnalysis};
pub use error::{RepixError, Result};
pub use histogram::{color_histogram, ColorCount};
pub use matte::{matte_background, MatteResult, MatteSettings};
pub use pipeline::{rebuild_grid, run_pipeline, GridOutput, PipelineOutput, PipelineSettings};
pub use resampler::{resample_grid, GridParams, PixelSample, Reconstruction};
