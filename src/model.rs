use std::collections::BTreeMap;

/// Side length used when a mask carries no usable shape metadata.
pub const DEFAULT_SIDE: u32 = 256;

/// Upper bound on a sanitized mask dimension. Shape metadata beyond this
/// cannot describe a real mask and would otherwise force absurd allocations.
pub const MAX_SIDE: u32 = 16_384;

/// Per-class display preference supplied by UI-level configuration.
///
/// Wire form: `{"enabled": true, "color": "#ff0000"}`. `enabled` defaults to
/// true when absent; `color` is a `#RRGGBB` string.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClassPreference {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl ClassPreference {
    /// Parses the `#RRGGBB` color, if present and well formed. Malformed
    /// strings are treated as "no color" so the deterministic fallback kicks
    /// in instead of a render failure.
    pub fn rgb(&self) -> Option<[u8; 3]> {
        parse_hex_rgb(self.color.as_deref()?)
    }
}

/// Sparse class id -> preference map. JSON object keys are class ids.
pub type ClassPrefs = BTreeMap<u8, ClassPreference>;

/// One segmentation mask: flat row-major class ids plus shape metadata.
///
/// The last two shape entries are `(height, width)`; leading dims (e.g. a
/// batch dimension) are ignored. Shape entries stay `f64` because upstream
/// JSON metadata has been observed to carry non-integer and non-finite
/// values; [`Mask::native_size`] sanitizes them.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    pub values: Vec<u8>,
    pub shape: Vec<f64>,
}

impl Mask {
    pub fn new(values: Vec<u8>, shape: Vec<f64>) -> Self {
        Self { values, shape }
    }

    /// Native `(width, height)` of this mask. Shapes with fewer than two
    /// dimensions fall back to the square default; each dimension is floored,
    /// clamped to `[1, MAX_SIDE]`, and non-finite entries become the default
    /// side.
    pub fn native_size(&self) -> (u32, u32) {
        if self.shape.len() < 2 {
            return (DEFAULT_SIDE, DEFAULT_SIDE);
        }
        let h = sanitize_dim(self.shape[self.shape.len() - 2]);
        let w = sanitize_dim(self.shape[self.shape.len() - 1]);
        (w, h)
    }
}

fn sanitize_dim(d: f64) -> u32 {
    if !d.is_finite() {
        return DEFAULT_SIDE;
    }
    d.floor().clamp(1.0, f64::from(MAX_SIDE)) as u32
}

/// Serde mirror of the mask payload as delivered by the data-fetch
/// collaborator: `{"value": [...], "shape": [...]}`.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MaskPayload {
    pub value: Vec<i64>,
    pub shape: Vec<f64>,
}

impl MaskPayload {
    /// Converts to a [`Mask`], mapping any value outside `[0, 255]` to the
    /// background class rather than truncating bits.
    pub fn into_mask(self) -> Mask {
        let values = self
            .value
            .into_iter()
            .map(|v| u8::try_from(v).unwrap_or(0))
            .collect();
        Mask::new(values, self.shape)
    }
}

/// Per-render layer toggles and opacity.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    pub show_raw: bool,
    pub show_gt: bool,
    pub show_pred: bool,
    /// Accepted for forward compatibility; no rendering effect yet.
    pub show_diff: bool,
    /// Global opacity multiplier, clamped to `[0, 1]` at blend time.
    pub alpha: f32,
    pub class_prefs: Option<ClassPrefs>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_raw: true,
            show_gt: true,
            show_pred: true,
            show_diff: false,
            alpha: 1.0,
            class_prefs: None,
        }
    }
}

pub fn parse_hex_rgb(s: &str) -> Option<[u8; 3]> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}
