//! Crop box computation and sanitization.
//!
//! [`default_crop_box`] produces the largest centered region of an image that
//! matches a target ratio. [`sanitize_crop_box`] takes a user-edited box
//! (arbitrary floats, possibly NaN) and clamps it back onto the image at the
//! exact target ratio; it never fails, falling back to the default box when
//! the edit is unusable.

use serde::{Deserialize, Serialize};

use crate::Tolerances;

/// An integer crop region inside an image.
///
/// Invariants (upheld by both constructors in this module):
/// `x + width <= image_width`, `y + height <= image_height`, both dimensions
/// positive, and `width / height` within one-pixel rounding of the target
/// ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropBox {
    /// The box's own aspect ratio.
    pub fn ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// Whether the box lies fully inside an image of the given size.
    pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= image_width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= image_height)
    }
}

/// A client-edited crop box before sanitization. Fields are floats because
/// edits arrive from UI drags and may be fractional, negative, or NaN.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropBoxEdit {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<CropBox> for CropBoxEdit {
    fn from(b: CropBox) -> Self {
        Self {
            x: f64::from(b.x),
            y: f64::from(b.y),
            width: f64::from(b.width),
            height: f64::from(b.height),
        }
    }
}

/// The largest centered crop of `image_width x image_height` matching
/// `ratio`.
///
/// When the image is wider than the target, the full height is kept and the
/// width is trimmed symmetrically; when taller, the reverse. An image already
/// at the target ratio crops to itself.
///
/// Invalid inputs (zero dimensions, non-positive or non-finite ratio) yield
/// the full-image box so the result is always usable.
pub fn default_crop_box(image_width: u32, image_height: u32, ratio: f64) -> CropBox {
    let full = CropBox {
        x: 0,
        y: 0,
        width: image_width.max(1),
        height: image_height.max(1),
    };
    if image_width == 0 || image_height == 0 || !ratio.is_finite() || ratio <= 0.0 {
        return full;
    }

    let image_ratio = f64::from(image_width) / f64::from(image_height);
    if image_ratio > ratio {
        let crop_width =
            ((f64::from(image_height) * ratio).round() as u32).clamp(1, image_width);
        CropBox {
            x: (image_width - crop_width) / 2,
            y: 0,
            width: crop_width,
            height: image_height,
        }
    } else if image_ratio < ratio {
        let crop_height =
            ((f64::from(image_width) / ratio).round() as u32).clamp(1, image_height);
        CropBox {
            x: 0,
            y: (image_height - crop_height) / 2,
            width: image_width,
            height: crop_height,
        }
    } else {
        full
    }
}

/// Clamp a user-edited box onto the image at the exact target ratio.
///
/// Unusable edits (non-finite fields, non-positive dimensions) fall back to
/// [`default_crop_box`]. Otherwise the dimensions are clamped into the image,
/// re-derived from the ratio, enlarged to the minimum crop size from
/// `tolerances`, and the origin is clamped so the box stays inside the image.
///
/// Sanitizing a box that [`default_crop_box`] produced returns it unchanged.
pub fn sanitize_crop_box(
    raw: &CropBoxEdit,
    image_width: u32,
    image_height: u32,
    ratio: f64,
    tolerances: &Tolerances,
) -> CropBox {
    if image_width == 0 || image_height == 0 || !ratio.is_finite() || ratio <= 0.0 {
        return default_crop_box(image_width, image_height, ratio);
    }
    let finite =
        raw.x.is_finite() && raw.y.is_finite() && raw.width.is_finite() && raw.height.is_finite();
    if !finite || raw.width <= 0.0 || raw.height <= 0.0 {
        return default_crop_box(image_width, image_height, ratio);
    }

    let max_w = f64::from(image_width);
    let max_h = f64::from(image_height);
    let mut w = raw.width.clamp(1.0, max_w);
    let mut h = raw.height.clamp(1.0, max_h);

    // A box already within one pixel of the target ratio keeps its
    // dimensions; this is what makes sanitize a fixed point on default
    // boxes despite rounding.
    let on_ratio = (h * ratio - w).abs() <= 0.5 || (w / ratio - h).abs() <= 0.5;
    if !on_ratio {
        let derived_h = w / ratio;
        if derived_h <= max_h {
            h = derived_h;
        } else {
            let derived_w = h * ratio;
            if derived_w <= max_w {
                w = derived_w;
            } else {
                return default_crop_box(image_width, image_height, ratio);
            }
        }
    }

    // Enforce the minimum crop size, re-deriving the paired dimension and
    // pinning at the image bound when the ratio cannot be kept otherwise.
    let min_w = f64::from(min_crop_dimension(image_width, tolerances));
    let min_h = f64::from(min_crop_dimension(image_height, tolerances));
    if w < min_w {
        w = min_w;
        h = w / ratio;
        if h > max_h {
            h = max_h;
            w = h * ratio;
        }
    }
    if h < min_h {
        h = min_h;
        w = h * ratio;
        if w > max_w {
            w = max_w;
            h = w / ratio;
        }
    }

    let width = (w.round() as u32).clamp(1, image_width);
    let height = (h.round() as u32).clamp(1, image_height);
    let x = (raw.x.max(0.0).round() as u32).min(image_width - width);
    let y = (raw.y.max(0.0).round() as u32).min(image_height - height);
    CropBox {
        x,
        y,
        width,
        height,
    }
}

/// Minimum usable crop dimension for a source dimension: a fixed fraction of
/// the image with an absolute pixel floor, never exceeding the image itself.
fn min_crop_dimension(image_dimension: u32, tolerances: &Tolerances) -> u32 {
    let fraction = (f64::from(image_dimension) * tolerances.min_crop_fraction).round() as u32;
    image_dimension.min(tolerances.min_crop_px.max(fraction))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tol() -> Tolerances {
        Tolerances::default()
    }

    #[test]
    fn test_default_crop_wide_image() {
        // 1000x600 at 4:3 trims width to 800, centered.
        let b = default_crop_box(1000, 600, 4.0 / 3.0);
        assert_eq!(
            b,
            CropBox {
                x: 100,
                y: 0,
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn test_default_crop_tall_image() {
        let b = default_crop_box(600, 1000, 4.0 / 3.0);
        assert_eq!(b.width, 600);
        assert_eq!(b.height, 450);
        assert_eq!(b.x, 0);
        assert_eq!(b.y, 275);
    }

    #[test]
    fn test_default_crop_exact_ratio_is_full_image() {
        let b = default_crop_box(800, 600, 4.0 / 3.0);
        assert_eq!(
            b,
            CropBox {
                x: 0,
                y: 0,
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn test_default_crop_invalid_inputs() {
        let b = default_crop_box(0, 600, 4.0 / 3.0);
        assert!(b.width >= 1 && b.height >= 1);
        let b = default_crop_box(800, 600, f64::NAN);
        assert_eq!(b.width, 800);
        assert_eq!(b.height, 600);
        let b = default_crop_box(800, 600, -2.0);
        assert_eq!(b.width, 800);
    }

    #[test]
    fn test_sanitize_is_fixed_point_on_default() {
        for &(w, h) in &[(1000u32, 600u32), (600, 1000), (800, 600), (1920, 1080)] {
            for &r in &[4.0 / 3.0, 16.0 / 9.0, 1.0, 3.0 / 4.0] {
                let default = default_crop_box(w, h, r);
                let sanitized = sanitize_crop_box(&default.into(), w, h, r, &tol());
                assert_eq!(sanitized, default, "{}x{} at {}", w, h, r);
            }
        }
    }

    #[test]
    fn test_sanitize_rejects_non_finite() {
        let edit = CropBoxEdit {
            x: f64::NAN,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        };
        let b = sanitize_crop_box(&edit, 1000, 600, 4.0 / 3.0, &tol());
        assert_eq!(b, default_crop_box(1000, 600, 4.0 / 3.0));
    }

    #[test]
    fn test_sanitize_rejects_non_positive_dimensions() {
        let edit = CropBoxEdit {
            x: 10.0,
            y: 10.0,
            width: -5.0,
            height: 100.0,
        };
        let b = sanitize_crop_box(&edit, 1000, 600, 4.0 / 3.0, &tol());
        assert_eq!(b, default_crop_box(1000, 600, 4.0 / 3.0));
    }

    #[test]
    fn test_sanitize_rederives_height_from_width() {
        let edit = CropBoxEdit {
            x: 0.0,
            y: 0.0,
            width: 400.0,
            height: 400.0,
        };
        let b = sanitize_crop_box(&edit, 1000, 600, 4.0 / 3.0, &tol());
        assert_eq!(b.width, 400);
        assert_eq!(b.height, 300);
    }

    #[test]
    fn test_sanitize_rederives_width_when_height_overflows() {
        // width 900 at 3:4 would need height 1200 > 600, so width follows
        // the clamped height instead.
        let edit = CropBoxEdit {
            x: 0.0,
            y: 0.0,
            width: 900.0,
            height: 600.0,
        };
        let b = sanitize_crop_box(&edit, 1000, 600, 3.0 / 4.0, &tol());
        assert_eq!(b.height, 600);
        assert_eq!(b.width, 450);
    }

    #[test]
    fn test_sanitize_enforces_minimum_size() {
        let edit = CropBoxEdit {
            x: 0.0,
            y: 0.0,
            width: 4.0,
            height: 3.0,
        };
        let b = sanitize_crop_box(&edit, 1000, 600, 4.0 / 3.0, &tol());
        // min width = max(20, 6% of 1000) = 60
        assert!(b.width >= 60, "width {} below minimum", b.width);
        assert!(b.fits_within(1000, 600));
    }

    #[test]
    fn test_sanitize_clamps_origin() {
        let edit = CropBoxEdit {
            x: 950.0,
            y: 590.0,
            width: 400.0,
            height: 300.0,
        };
        let b = sanitize_crop_box(&edit, 1000, 600, 4.0 / 3.0, &tol());
        assert!(b.fits_within(1000, 600));
        assert_eq!(b.x, 600);
        assert_eq!(b.y, 300);
    }

    #[test]
    fn test_sanitize_clamps_negative_origin() {
        let edit = CropBoxEdit {
            x: -40.0,
            y: -10.0,
            width: 400.0,
            height: 300.0,
        };
        let b = sanitize_crop_box(&edit, 1000, 600, 4.0 / 3.0, &tol());
        assert_eq!(b.x, 0);
        assert_eq!(b.y, 0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn ratios() -> impl Strategy<Value = f64> {
            // Practical aspect ratios, from 9:16 portrait to very wide.
            0.5f64..4.0
        }

        proptest! {
            #[test]
            fn default_box_satisfies_invariant(
                w in 20u32..4000,
                h in 20u32..4000,
                r in ratios(),
            ) {
                let b = default_crop_box(w, h, r);
                prop_assert!(b.fits_within(w, h));
                // Within half a pixel of the target ratio on whichever
                // dimension was derived by rounding.
                let err = (f64::from(b.width) - f64::from(b.height) * r).abs();
                prop_assert!(
                    err <= 0.5 * r.max(1.0) + 1e-9 || b.width == 1 || b.height == 1,
                    "{}x{} at {} gave {:?}", w, h, r, b
                );
            }

            #[test]
            fn sanitize_default_is_identity(
                w in 20u32..4000,
                h in 20u32..4000,
                r in ratios(),
            ) {
                let default = default_crop_box(w, h, r);
                let sanitized = sanitize_crop_box(&default.into(), w, h, r, &Tolerances::default());
                prop_assert_eq!(sanitized, default);
            }

            #[test]
            fn sanitize_never_panics_and_stays_in_bounds(
                x in prop_oneof![any::<f64>(), Just(f64::NAN), Just(f64::INFINITY)],
                y in prop_oneof![any::<f64>(), Just(f64::NEG_INFINITY)],
                bw in prop_oneof![any::<f64>(), Just(0.0), Just(-1.0)],
                bh in prop_oneof![any::<f64>(), Just(f64::NAN)],
                w in 20u32..4000,
                h in 20u32..4000,
                r in ratios(),
            ) {
                let edit = CropBoxEdit { x, y, width: bw, height: bh };
                let b = sanitize_crop_box(&edit, w, h, r, &Tolerances::default());
                prop_assert!(b.fits_within(w, h), "{:?} escaped {}x{}", b, w, h);
            }
        }
    }
}
