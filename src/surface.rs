use crate::{
    error::{MaskoverError, MaskoverResult},
    raster::LayerRgba,
};

/// Mutable RGBA8 render target with a fixed pixel size.
///
/// Reallocated only when the requested output size differs from the current
/// one; a resize destroys prior contents, so the compositor always follows it
/// with a full redraw. The surface's own alpha channel is held fully opaque
/// by every drawing operation.
pub struct RenderSurface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RenderSurface {
    /// Fails on a zero dimension: the engine cannot exist without a drawable
    /// surface.
    pub fn new(width: u32, height: u32) -> MaskoverResult<Self> {
        if width == 0 || height == 0 {
            return Err(MaskoverError::validation(format!(
                "render surface must have nonzero size, got {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 4],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Recreates the pixel buffer iff the size changed. Returns whether a
    /// resize happened (contents are then undefined until redrawn).
    pub fn resize_to(&mut self, width: u32, height: u32) -> MaskoverResult<bool> {
        if width == self.width && height == self.height {
            return Ok(false);
        }
        if width == 0 || height == 0 {
            return Err(MaskoverError::validation(format!(
                "render surface must have nonzero size, got {width}x{height}"
            )));
        }
        tracing::debug!(width, height, "resizing render surface");
        self.width = width;
        self.height = height;
        self.data = vec![0u8; width as usize * height as usize * 4];
        Ok(true)
    }

    /// Fills the whole surface with opaque black.
    pub fn fill_black(&mut self) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&[0, 0, 0, 255]);
        }
    }

    /// Draws `base` stretched to the surface size, nearest-neighbor,
    /// composing it over opaque black so partially transparent sources cannot
    /// leak stale surface contents.
    pub fn draw_base(&mut self, base: &image::RgbaImage) {
        let (sw, sh) = base.dimensions();
        if sw == 0 || sh == 0 {
            self.fill_black();
            return;
        }
        let dw = self.width;
        for (row_y, row) in self
            .data
            .chunks_exact_mut(dw as usize * 4)
            .enumerate()
        {
            let sy = nearest(row_y as u32, self.height, sh);
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let sx = nearest(x as u32, dw, sw);
                let s = base.get_pixel(sx, sy).0;
                let a = u16::from(s[3]);
                px[0] = mul_div255(u16::from(s[0]), a);
                px[1] = mul_div255(u16::from(s[1]), a);
                px[2] = mul_div255(u16::from(s[2]), a);
                px[3] = 255;
            }
        }
    }

    /// Blends a native-resolution layer over the surface, scaled
    /// nearest-neighbor to the output size (class boundaries stay sharp), at
    /// the given opacity: `dst = dst*(1-a) + src*a` per color channel.
    pub fn blend_layer(&mut self, layer: &LayerRgba, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
        if op == 0 || layer.width == 0 || layer.height == 0 {
            return;
        }

        let dw = self.width;
        for (row_y, row) in self
            .data
            .chunks_exact_mut(dw as usize * 4)
            .enumerate()
        {
            let sy = nearest(row_y as u32, self.height, layer.height);
            let src_row = &layer.data[sy as usize * layer.width as usize * 4..];
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let sx = nearest(x as u32, dw, layer.width) as usize;
                let s = &src_row[sx * 4..sx * 4 + 4];
                let sa = mul_div255(u16::from(s[3]), op);
                if sa == 0 {
                    continue;
                }
                let inv = 255u16 - u16::from(sa);
                for i in 0..3 {
                    let sc = mul_div255(u16::from(s[i]), u16::from(sa));
                    let dc = mul_div255(u16::from(px[i]), inv);
                    px[i] = sc.saturating_add(dc);
                }
                px[3] = 255;
            }
        }
    }
}

fn nearest(dst: u32, dst_len: u32, src_len: u32) -> u32 {
    ((u64::from(dst) * u64::from(src_len)) / u64::from(dst_len)) as u32
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
