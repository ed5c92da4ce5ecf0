use std::io::Cursor;
use std::sync::{Arc, Mutex};

use base64::Engine as _;

use crate::{
    error::{MaskoverError, MaskoverResult},
    model::{DEFAULT_SIDE, Mask, RenderOptions},
    palette::PaletteManager,
    raster,
    surface::RenderSurface,
};

/// Ground truth renders at the full requested opacity.
pub const GT_LAYER_OPACITY: f32 = 1.0;
/// Prediction is always slightly more transparent than ground truth so both
/// stay distinguishable where they overlap. Fixed, not user-configurable.
pub const PRED_LAYER_OPACITY: f32 = 0.8;

/// The compositing engine: one palette cache plus one render surface, reused
/// across many render calls.
///
/// Rendering is synchronous; a call runs to completion (including encoding)
/// before returning. The engine does no internal locking — multi-threaded
/// hosts wrap it in a [`SharedOverlayEngine`] and hold the lock for a whole
/// render call.
pub struct OverlayEngine {
    palette: PaletteManager,
    surface: RenderSurface,
}

/// Explicit sharing handle for hosts that render from multiple threads.
pub type SharedOverlayEngine = Arc<Mutex<OverlayEngine>>;

impl OverlayEngine {
    /// Fails iff the initial surface size is invalid (zero dimension); the
    /// engine cannot exist without a drawable surface.
    pub fn new(width: u32, height: u32) -> MaskoverResult<Self> {
        Ok(Self {
            palette: PaletteManager::new(),
            surface: RenderSurface::new(width, height)?,
        })
    }

    pub fn with_default_size() -> MaskoverResult<Self> {
        Self::new(DEFAULT_SIDE, DEFAULT_SIDE)
    }

    pub fn into_shared(self) -> SharedOverlayEngine {
        Arc::new(Mutex::new(self))
    }

    /// Observable palette-rebuild count (cache behavior, used by tests).
    pub fn palette_rebuilds(&self) -> u64 {
        self.palette.rebuilds()
    }

    /// Full composite: optional base image, then ground truth, then
    /// prediction, blended in that order. Returns PNG bytes.
    #[tracing::instrument(skip_all, fields(alpha = options.alpha))]
    pub fn render(
        &mut self,
        base: Option<&image::RgbaImage>,
        gt: Option<&Mask>,
        pred: Option<&Mask>,
        options: &RenderOptions,
    ) -> MaskoverResult<Vec<u8>> {
        let drawn_base = base.filter(|_| options.show_raw);
        let (width, height) = output_size(drawn_base, gt, pred);
        self.surface.resize_to(width, height)?;

        match drawn_base {
            Some(img) => self.surface.draw_base(img),
            None => self.surface.fill_black(),
        }

        let palette = *self.palette.derive(options.class_prefs.as_ref());

        if options.show_gt
            && let Some(mask) = gt
        {
            let layer = raster::rasterize(mask, &palette);
            self.surface
                .blend_layer(&layer, options.alpha * GT_LAYER_OPACITY);
        }
        if options.show_pred
            && let Some(mask) = pred
        {
            let layer = raster::rasterize(mask, &palette);
            self.surface
                .blend_layer(&layer, options.alpha * PRED_LAYER_OPACITY);
        }

        encode_png(&self.surface)
    }

    /// Mask-only composite on a black background at native mask resolution.
    pub fn render_masks(
        &mut self,
        gt: Option<&Mask>,
        pred: Option<&Mask>,
        options: &RenderOptions,
    ) -> MaskoverResult<Vec<u8>> {
        self.render(None, gt, pred, options)
    }

    /// Like [`OverlayEngine::render`], returned as a `data:image/png;base64`
    /// URL for direct display-layer consumption.
    pub fn render_data_url(
        &mut self,
        base: Option<&image::RgbaImage>,
        gt: Option<&Mask>,
        pred: Option<&Mask>,
        options: &RenderOptions,
    ) -> MaskoverResult<String> {
        let png = self.render(base, gt, pred, options)?;
        let b64 = base64::engine::general_purpose::STANDARD.encode(&png);
        Ok(format!("data:image/png;base64,{b64}"))
    }
}

// Output size: base image (when drawn) wins, else whichever mask is present
// (ground truth preferred), else the square default. A degenerate base falls
// through to the next rule.
fn output_size(
    base: Option<&image::RgbaImage>,
    gt: Option<&Mask>,
    pred: Option<&Mask>,
) -> (u32, u32) {
    if let Some(img) = base {
        let (w, h) = img.dimensions();
        if w > 0 && h > 0 {
            return (w, h);
        }
    }
    if let Some(mask) = gt.or(pred) {
        return mask.native_size();
    }
    (DEFAULT_SIDE, DEFAULT_SIDE)
}

fn encode_png(surface: &RenderSurface) -> MaskoverResult<Vec<u8>> {
    encode_rgba_png(surface.data(), surface.width(), surface.height())
}

fn encode_rgba_png(data: &[u8], width: u32, height: u32) -> MaskoverResult<Vec<u8>> {
    let mut buf = Vec::new();
    image::write_buffer_with_format(
        &mut Cursor::new(&mut buf),
        data,
        width,
        height,
        image::ExtendedColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .map_err(|e| MaskoverError::encode(e.to_string()))?;
    Ok(buf)
}
