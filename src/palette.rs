use crate::model::ClassPrefs;

pub const PALETTE_LEN: usize = 256;

/// Class id -> packed RGBA color. `palette[0]` is always transparent.
pub type Palette = [u32; PALETTE_LEN];

// Packed layout: alpha in bits 31..24, then blue, green, red in the low byte.
// `raster.rs` unpacks through these accessors, so the layout never becomes an
// implicit endianness assumption.
pub const fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    ((a as u32) << 24) | ((b as u32) << 16) | ((g as u32) << 8) | (r as u32)
}

pub const fn red(c: u32) -> u8 {
    c as u8
}

pub const fn green(c: u32) -> u8 {
    (c >> 8) as u8
}

pub const fn blue(c: u32) -> u8 {
    (c >> 16) as u8
}

pub const fn alpha(c: u32) -> u8 {
    (c >> 24) as u8
}

pub const TRANSPARENT: u32 = 0;

/// Derives and memoizes the 256-entry palette.
///
/// Recomputation is skipped iff the content hash of the preference map equals
/// the previously cached hash; that comparison is the sole invalidation rule.
pub struct PaletteManager {
    palette: Palette,
    last_hash: Option<u64>,
    rebuilds: u64,
}

impl Default for PaletteManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PaletteManager {
    pub fn new() -> Self {
        Self {
            palette: [TRANSPARENT; PALETTE_LEN],
            last_hash: None,
            rebuilds: 0,
        }
    }

    /// Returns the palette for `prefs`, rebuilding only when the preference
    /// content changed since the last call.
    pub fn derive(&mut self, prefs: Option<&ClassPrefs>) -> &Palette {
        let hash = prefs_hash(prefs);
        if self.last_hash == Some(hash) {
            return &self.palette;
        }
        tracing::debug!(rebuilds = self.rebuilds + 1, "rebuilding class palette");
        self.last_hash = Some(hash);
        self.rebuilds += 1;

        for (i, slot) in self.palette.iter_mut().enumerate() {
            *slot = entry_for_class(i as u8, prefs);
        }
        &self.palette
    }

    /// Number of palette rebuilds so far. Observable cache behavior for tests.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

fn entry_for_class(id: u8, prefs: Option<&ClassPrefs>) -> u32 {
    // Class 0 is reserved background, always transparent.
    if id == 0 {
        return TRANSPARENT;
    }

    match prefs.and_then(|p| p.get(&id)) {
        Some(pref) if !pref.enabled => TRANSPARENT,
        Some(pref) => match pref.rgb() {
            Some([r, g, b]) => pack_rgba(r, g, b, 255),
            None => fallback_color(id),
        },
        None => fallback_color(id),
    }
}

/// Deterministic fallback color: golden-angle hue rotation at fixed
/// saturation/lightness, so every class id gets a stable, visually distinct
/// color even with no configuration.
pub fn fallback_color(id: u8) -> u32 {
    let hue = (f64::from(id) * 137.508) % 360.0;
    let [r, g, b] = hsl_to_rgb(hue, 0.72, 0.52);
    pack_rgba(r, g, b, 255)
}

fn hsl_to_rgb(hue: f64, sat: f64, light: f64) -> [u8; 3] {
    let c = (1.0 - (2.0 * light - 1.0).abs()) * sat;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = light - c / 2.0;

    let (r, g, b) = match hue {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    ]
}

// Content hash over the canonical (sorted-key) form of the preference map.
// Absent maps hash to a fixed sentinel so "no prefs" is itself cacheable.
fn prefs_hash(prefs: Option<&ClassPrefs>) -> u64 {
    let mut h = Fnv1a64::new();
    match prefs {
        None => h.write_u8(0),
        Some(map) => {
            h.write_u8(1);
            for (id, pref) in map {
                h.write_u8(*id);
                h.write_u8(u8::from(pref.enabled));
                match &pref.color {
                    Some(c) => {
                        h.write_u8(1);
                        h.write_bytes(c.as_bytes());
                    }
                    None => h.write_u8(0),
                }
            }
        }
    }
    h.finish()
}

struct Fnv1a64(u64);

impl Fnv1a64 {
    fn new() -> Self {
        Self(0xcbf29ce484222325)
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        let mut h = self.0;
        for &b in bytes {
            h ^= b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        self.0 = h;
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassPreference;

    fn pref(enabled: bool, color: Option<&str>) -> ClassPreference {
        ClassPreference {
            enabled,
            color: color.map(str::to_string),
        }
    }

    #[test]
    fn background_entry_is_transparent_for_all_palettes() {
        let mut mgr = PaletteManager::new();
        assert_eq!(mgr.derive(None)[0], TRANSPARENT);

        let mut prefs = ClassPrefs::new();
        prefs.insert(0, pref(true, Some("#ffffff")));
        assert_eq!(mgr.derive(Some(&prefs))[0], TRANSPARENT);
    }

    #[test]
    fn explicit_color_wins_and_disabled_goes_transparent() {
        let mut prefs = ClassPrefs::new();
        prefs.insert(1, pref(true, Some("#ff0000")));
        prefs.insert(2, pref(false, Some("#00ff00")));

        let mut mgr = PaletteManager::new();
        let pal = mgr.derive(Some(&prefs));
        assert_eq!(pal[1], pack_rgba(255, 0, 0, 255));
        assert_eq!(pal[2], TRANSPARENT);
    }

    #[test]
    fn enabled_without_color_falls_back() {
        let mut prefs = ClassPrefs::new();
        prefs.insert(5, pref(true, None));

        let mut mgr = PaletteManager::new();
        let pal = mgr.derive(Some(&prefs));
        assert_eq!(pal[5], fallback_color(5));
        assert_eq!(alpha(pal[5]), 255);
    }

    #[test]
    fn malformed_color_falls_back_instead_of_failing() {
        let mut prefs = ClassPrefs::new();
        prefs.insert(3, pref(true, Some("not-a-color")));

        let mut mgr = PaletteManager::new();
        assert_eq!(mgr.derive(Some(&prefs))[3], fallback_color(3));
    }

    #[test]
    fn fallback_colors_are_distinct_and_stable() {
        let mut seen = std::collections::BTreeSet::new();
        for id in 1..=255u8 {
            let c = fallback_color(id);
            assert_eq!(alpha(c), 255);
            assert!(seen.insert(c), "duplicate fallback color for class {id}");
            assert_eq!(c, fallback_color(id));
        }
    }

    #[test]
    fn known_fallback_shades() {
        // hue 137.508 for class 1, hue 275.016 for class 2.
        let c1 = fallback_color(1);
        assert_eq!((red(c1), green(c1), blue(c1)), (44, 221, 96));
        let c2 = fallback_color(2);
        assert_eq!((red(c2), green(c2), blue(c2)), (147, 44, 221));
    }

    #[test]
    fn equal_prefs_do_not_recompute() {
        let mut prefs = ClassPrefs::new();
        prefs.insert(1, pref(true, Some("#112233")));

        let mut mgr = PaletteManager::new();
        mgr.derive(Some(&prefs));
        assert_eq!(mgr.rebuilds(), 1);

        let same = prefs.clone();
        mgr.derive(Some(&same));
        assert_eq!(mgr.rebuilds(), 1);

        mgr.derive(None);
        assert_eq!(mgr.rebuilds(), 2);
        mgr.derive(None);
        assert_eq!(mgr.rebuilds(), 2);

        prefs.insert(2, pref(false, None));
        mgr.derive(Some(&prefs));
        assert_eq!(mgr.rebuilds(), 3);
    }
}
