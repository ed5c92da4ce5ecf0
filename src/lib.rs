//! Segmentation-mask overlay compositing.
//!
//! Turns flat per-pixel class-id masks into colored, alpha-blended overlays
//! drawn over an optional base image: a cached 256-entry palette, an
//! `O(mask pixels)` rasterizer at native mask resolution, and a compositor
//! that scales layers nearest-neighbor onto a reusable surface and encodes
//! the result as PNG.

#![forbid(unsafe_code)]

pub mod compose;
pub mod error;
pub mod model;
pub mod palette;
pub mod raster;
pub mod surface;

pub use compose::{GT_LAYER_OPACITY, OverlayEngine, PRED_LAYER_OPACITY, SharedOverlayEngine};
pub use error::{MaskoverError, MaskoverResult};
pub use model::{
    ClassPreference, ClassPrefs, DEFAULT_SIDE, MAX_SIDE, Mask, MaskPayload, RenderOptions,
};
pub use palette::{Palette, PaletteManager};
pub use raster::{LayerRgba, rasterize};
pub use surface::RenderSurface;
