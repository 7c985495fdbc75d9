//! Ratiofix Core - Aspect-ratio normalization engine
//!
//! This crate detects when images grouped under a shared category drift from
//! the group's dominant aspect ratio, proposes exact-ratio crop geometry or
//! non-destructive padding geometry, applies the chosen transform to produce
//! a derived asset, and repoints referencing records to it. Source assets
//! are never modified.
//!
//! Persistence, authorization, and transport are collaborator concerns; the
//! engine talks to them through the traits in [`stores`].

pub mod apply;
pub mod catalog;
pub mod codec;
pub mod geometry;
pub mod ratio;
pub mod rewrite;
pub mod stores;
pub mod transform;
pub mod worklist;

pub use apply::{ApplyOutcome, ApplyWarning, Normalizer, WarningKind};
pub use catalog::{build_report, OffendingImage, RatioBucket, Report, ReportTotals};
pub use codec::{CodecError, DynamicCodec, EncodeFormat, ImageCodec};
pub use geometry::{compute_padding_box, default_crop_box, sanitize_crop_box, CropBox, CropBoxEdit, PaddingBox};
pub use ratio::{ratio_value, within_tolerance, ParseRatioError, RatioKey};
pub use stores::{
    AssetFormat, AssetId, AssetStore, EntityId, GroupId, GroupStore, ImageAssetInfo,
    ReferenceStore, StoreError,
};
pub use transform::{crop_asset, pad_asset, Provenance, TransformOp};
pub use worklist::{list_groups_needing_normalization, ReportCache, WorklistEntry};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default relative deviation below which a ratio counts as matching.
pub const RATIO_TOLERANCE: f64 = 0.03;

/// Default minimum crop dimension as a fraction of the image dimension.
pub const MIN_CROP_FRACTION: f64 = 0.06;

/// Default absolute floor for a crop dimension, in pixels.
pub const MIN_CROP_PX: u32 = 20;

/// Tunable thresholds for classification and crop sanitization.
///
/// These govern how aggressively images are flagged, not correctness, so
/// they are configuration rather than hard-coded at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Relative deviation threshold for matching vs. offending.
    pub ratio_epsilon: f64,
    /// Minimum crop dimension as a fraction of the source dimension.
    pub min_crop_fraction: f64,
    /// Absolute pixel floor for a crop dimension.
    pub min_crop_px: u32,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            ratio_epsilon: RATIO_TOLERANCE,
            min_crop_fraction: MIN_CROP_FRACTION,
            min_crop_px: MIN_CROP_PX,
        }
    }
}

/// Error taxonomy for report and apply operations.
///
/// `InvalidInput` on a top-level call is fatal for that call. The per-image
/// variants (`MissingSource`, `DecodeFailed`, `SaveFailed`,
/// `ReferenceUpdateFailed`) are downgraded to warnings inside a batch so one
/// bad image never aborts the rest.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("source bytes unavailable for asset {0}")]
    MissingSource(AssetId),

    #[error("decoding asset {asset} failed: {reason}")]
    DecodeFailed { asset: AssetId, reason: String },

    #[error("saving derived asset for {asset} failed: {reason}")]
    SaveFailed { asset: AssetId, reason: String },

    #[error("updating reference {entity} failed: {reason}")]
    ReferenceUpdateFailed { entity: EntityId, reason: String },

    /// Collaborator failure outside the per-image taxonomy, e.g. while
    /// enumerating groups or persisting the canonical ratio.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ParseRatioError> for NormalizeError {
    fn from(err: ParseRatioError) -> Self {
        NormalizeError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerances_defaults() {
        let tol = Tolerances::default();
        assert_eq!(tol.ratio_epsilon, RATIO_TOLERANCE);
        assert_eq!(tol.min_crop_fraction, MIN_CROP_FRACTION);
        assert_eq!(tol.min_crop_px, MIN_CROP_PX);
    }

    #[test]
    fn test_parse_error_becomes_invalid_input() {
        let err: NormalizeError = "bogus".parse::<RatioKey>().unwrap_err().into();
        assert!(matches!(err, NormalizeError::InvalidInput(_)));
    }
}
