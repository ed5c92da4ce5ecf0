use crate::{
    model::Mask,
    palette::{self, Palette},
};

/// RGBA8 pixels at a mask's native resolution, before any scaling.
#[derive(Clone, Debug)]
pub struct LayerRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Converts one mask into an RGBA buffer via palette lookup.
///
/// Cost is `O(mask pixels)`, independent of display size; scaling happens
/// later in the compositor. A `values` length that disagrees with
/// `height * width` truncates to the shorter of the two, leaving the rest of
/// the buffer transparent.
pub fn rasterize(mask: &Mask, palette: &Palette) -> LayerRgba {
    let (width, height) = mask.native_size();
    let pixel_count = width as usize * height as usize;
    let mut data = vec![0u8; pixel_count * 4];

    let n = mask.values.len().min(pixel_count);
    for (i, &class_id) in mask.values[..n].iter().enumerate() {
        // Background stays transparent no matter what the palette holds.
        if class_id == 0 {
            continue;
        }
        let c = palette[class_id as usize];
        let px = &mut data[i * 4..i * 4 + 4];
        px[0] = palette::red(c);
        px[1] = palette::green(c);
        px[2] = palette::blue(c);
        px[3] = palette::alpha(c);
    }

    LayerRgba {
        width,
        height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::DEFAULT_SIDE,
        palette::{PALETTE_LEN, pack_rgba},
    };

    fn test_palette() -> Palette {
        let mut pal = [0u32; PALETTE_LEN];
        pal[1] = pack_rgba(255, 0, 0, 255);
        pal[2] = pack_rgba(0, 255, 0, 255);
        pal
    }

    fn px(layer: &LayerRgba, x: u32, y: u32) -> [u8; 4] {
        let i = (y * layer.width + x) as usize * 4;
        layer.data[i..i + 4].try_into().unwrap()
    }

    #[test]
    fn lookup_transform_matches_palette() {
        let mask = Mask::new(vec![0, 1, 2, 1], vec![2.0, 2.0]);
        let layer = rasterize(&mask, &test_palette());
        assert_eq!((layer.width, layer.height), (2, 2));
        assert_eq!(px(&layer, 0, 0), [0, 0, 0, 0]);
        assert_eq!(px(&layer, 1, 0), [255, 0, 0, 255]);
        assert_eq!(px(&layer, 0, 1), [0, 255, 0, 255]);
        assert_eq!(px(&layer, 1, 1), [255, 0, 0, 255]);
    }

    #[test]
    fn background_transparent_even_if_palette_entry_set() {
        let mut pal = test_palette();
        pal[0] = pack_rgba(255, 255, 255, 255);
        let mask = Mask::new(vec![0], vec![1.0, 1.0]);
        let layer = rasterize(&mask, &pal);
        assert_eq!(px(&layer, 0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn short_values_truncate_leaving_transparency() {
        let mask = Mask::new(vec![1, 1], vec![2.0, 2.0]);
        let layer = rasterize(&mask, &test_palette());
        assert_eq!(px(&layer, 0, 0), [255, 0, 0, 255]);
        assert_eq!(px(&layer, 1, 0), [255, 0, 0, 255]);
        assert_eq!(px(&layer, 0, 1), [0, 0, 0, 0]);
        assert_eq!(px(&layer, 1, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn long_values_truncate_to_pixel_count() {
        let mask = Mask::new(vec![1; 10], vec![2.0, 2.0]);
        let layer = rasterize(&mask, &test_palette());
        assert_eq!(layer.data.len(), 2 * 2 * 4);
    }

    #[test]
    fn missing_shape_falls_back_to_default_square() {
        let mask = Mask::new(vec![1, 2, 3], vec![]);
        let layer = rasterize(&mask, &test_palette());
        assert_eq!((layer.width, layer.height), (DEFAULT_SIDE, DEFAULT_SIDE));
    }

    #[test]
    fn batch_dims_are_ignored() {
        let mask = Mask::new(vec![1; 6], vec![1.0, 2.0, 3.0]);
        let layer = rasterize(&mask, &test_palette());
        assert_eq!((layer.width, layer.height), (3, 2));
    }
}
