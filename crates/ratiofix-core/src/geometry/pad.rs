//! Letterbox padding geometry.

use serde::{Deserialize, Serialize};

/// A canvas large enough to hold the source image at the target ratio, with
/// the offsets that center the source on it.
///
/// Invariants: the canvas never shrinks either source dimension, at most one
/// dimension grows, and `canvas_width / canvas_height` is within one-pixel
/// rounding of the target ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddingBox {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl PaddingBox {
    /// The canvas aspect ratio.
    pub fn ratio(&self) -> f64 {
        f64::from(self.canvas_width) / f64::from(self.canvas_height)
    }
}

/// Compute the letterbox canvas for an image at a target ratio.
///
/// A too-wide image grows height only; a too-tall image grows width only;
/// an image already at the target keeps its own dimensions. The ceiling
/// guarantees the canvas fully covers the source.
///
/// Invalid inputs (zero dimensions, non-positive or non-finite ratio) yield
/// a canvas identical to the source.
pub fn compute_padding_box(image_width: u32, image_height: u32, ratio: f64) -> PaddingBox {
    let mut canvas_width = image_width;
    let mut canvas_height = image_height;

    if image_width > 0 && image_height > 0 && ratio.is_finite() && ratio > 0.0 {
        let image_ratio = f64::from(image_width) / f64::from(image_height);
        if image_ratio > ratio {
            canvas_height = ((f64::from(image_width) / ratio).ceil() as u32).max(image_height);
        } else if image_ratio < ratio {
            canvas_width = ((f64::from(image_height) * ratio).ceil() as u32).max(image_width);
        }
    }

    PaddingBox {
        canvas_width,
        canvas_height,
        offset_x: (canvas_width - image_width) / 2,
        offset_y: (canvas_height - image_height) / 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_wide_image_grows_height() {
        // 1000x600 at 4:3 needs a 1000x750 canvas, source centered at y=75.
        let p = compute_padding_box(1000, 600, 4.0 / 3.0);
        assert_eq!(
            p,
            PaddingBox {
                canvas_width: 1000,
                canvas_height: 750,
                offset_x: 0,
                offset_y: 75
            }
        );
    }

    #[test]
    fn test_pad_tall_image_grows_width() {
        let p = compute_padding_box(600, 1000, 4.0 / 3.0);
        assert_eq!(p.canvas_height, 1000);
        assert_eq!(p.canvas_width, 1334); // ceil(1000 * 4/3)
        assert_eq!(p.offset_y, 0);
        assert_eq!(p.offset_x, 367);
    }

    #[test]
    fn test_pad_matching_image_is_untouched() {
        let p = compute_padding_box(800, 600, 4.0 / 3.0);
        assert_eq!(
            p,
            PaddingBox {
                canvas_width: 800,
                canvas_height: 600,
                offset_x: 0,
                offset_y: 0
            }
        );
    }

    #[test]
    fn test_pad_invalid_ratio_is_untouched() {
        let p = compute_padding_box(800, 600, f64::NAN);
        assert_eq!(p.canvas_width, 800);
        assert_eq!(p.canvas_height, 600);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn canvas_never_shrinks_and_grows_one_dimension(
                w in 1u32..4000,
                h in 1u32..4000,
                r in 0.5f64..4.0,
            ) {
                let p = compute_padding_box(w, h, r);
                prop_assert!(p.canvas_width >= w);
                prop_assert!(p.canvas_height >= h);
                let grew = u32::from(p.canvas_width > w) + u32::from(p.canvas_height > h);
                prop_assert!(grew <= 1, "both dimensions grew: {:?}", p);
                prop_assert_eq!(p.offset_x, (p.canvas_width - w) / 2);
                prop_assert_eq!(p.offset_y, (p.canvas_height - h) / 2);
            }

            #[test]
            fn canvas_hits_target_ratio_within_rounding(
                w in 20u32..4000,
                h in 20u32..4000,
                r in 0.5f64..4.0,
            ) {
                let p = compute_padding_box(w, h, r);
                let err = (f64::from(p.canvas_width) - f64::from(p.canvas_height) * r).abs();
                prop_assert!(err <= r.max(1.0) + 1e-9, "{:?} missed ratio {}", p, r);
            }
        }
    }
}
