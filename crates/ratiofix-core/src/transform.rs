//! Applying a crop or pad transform to produce a derived asset.
//!
//! A transform reads the source bytes, decodes them, applies the geometry,
//! re-encodes in the source's format (PNG fallback), and registers the
//! result as a new asset carrying provenance. The source asset is never
//! modified or deleted.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::{EncodeFormat, ImageCodec, PAD_BACKGROUND};
use crate::geometry::{compute_padding_box, CropBox};
use crate::ratio::RatioKey;
use crate::stores::{AssetId, AssetStore, GroupId, ImageAssetInfo};
use crate::NormalizeError;

/// Which transform produced a derived asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformOp {
    /// Cut the source down to the target ratio.
    Crop,
    /// Letterbox the source onto a white canvas at the target ratio.
    Pad,
}

impl fmt::Display for TransformOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransformOp::Crop => "crop",
            TransformOp::Pad => "pad",
        })
    }
}

/// Where a derived asset came from.
///
/// One derived asset exists per `(source, group, ratio, operation)`
/// combination; [`Provenance::derived_name`] is deterministic in those four
/// values so re-running a batch targets the same derived asset instead of
/// creating duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: AssetId,
    pub group: GroupId,
    pub ratio: RatioKey,
    pub operation: TransformOp,
}

impl Provenance {
    /// Deterministic filename for the derived asset.
    pub fn derived_name(&self, extension: &str) -> String {
        let (rw, rh) = self.ratio.terms();
        format!(
            "{}-{}-{}x{}-{}.{}",
            self.source, self.group, rw, rh, self.operation, extension
        )
    }
}

/// Crop `source` to `area` and register the result as a derived asset.
///
/// Descriptive metadata (alt text, title) is copied from the source onto the
/// derived asset so references can swap over without losing captions.
pub fn crop_asset<A: AssetStore, C: ImageCodec>(
    assets: &mut A,
    codec: &C,
    source: &AssetId,
    area: &CropBox,
    group: &GroupId,
    ratio: &RatioKey,
) -> Result<AssetId, NormalizeError> {
    let info = read_info(assets, source)?;
    let bytes = read_source(assets, source)?;
    let decoded = codec
        .decode(&bytes)
        .map_err(|e| NormalizeError::DecodeFailed {
            asset: source.clone(),
            reason: e.to_string(),
        })?;
    let cropped = codec
        .crop(&decoded, area)
        .map_err(|e| NormalizeError::SaveFailed {
            asset: source.clone(),
            reason: e.to_string(),
        })?;
    register_derived(
        assets,
        codec,
        &cropped,
        info,
        Provenance {
            source: source.clone(),
            group: group.clone(),
            ratio: *ratio,
            operation: TransformOp::Crop,
        },
    )
}

/// Letterbox `source` onto a white canvas at `ratio` and register the result
/// as a derived asset. The padding geometry is recomputed here from the
/// decoded dimensions, so the pixels composited always match the canvas.
pub fn pad_asset<A: AssetStore, C: ImageCodec>(
    assets: &mut A,
    codec: &C,
    source: &AssetId,
    group: &GroupId,
    ratio: &RatioKey,
) -> Result<AssetId, NormalizeError> {
    let info = read_info(assets, source)?;
    let bytes = read_source(assets, source)?;
    let decoded = codec
        .decode(&bytes)
        .map_err(|e| NormalizeError::DecodeFailed {
            asset: source.clone(),
            reason: e.to_string(),
        })?;
    let canvas = compute_padding_box(info.width, info.height, ratio.value());
    let padded = codec
        .composite_on_canvas(&decoded, &canvas, PAD_BACKGROUND)
        .map_err(|e| NormalizeError::SaveFailed {
            asset: source.clone(),
            reason: e.to_string(),
        })?;
    register_derived(
        assets,
        codec,
        &padded,
        info,
        Provenance {
            source: source.clone(),
            group: group.clone(),
            ratio: *ratio,
            operation: TransformOp::Pad,
        },
    )
}

fn read_info<A: AssetStore>(
    assets: &A,
    source: &AssetId,
) -> Result<ImageAssetInfo, NormalizeError> {
    assets
        .asset_info(source)
        .map_err(|_| NormalizeError::MissingSource(source.clone()))
}

fn read_source<A: AssetStore>(assets: &A, source: &AssetId) -> Result<Vec<u8>, NormalizeError> {
    assets
        .read_bytes(source)
        .map_err(|_| NormalizeError::MissingSource(source.clone()))
}

fn register_derived<A: AssetStore, C: ImageCodec>(
    assets: &mut A,
    codec: &C,
    image: &C::Image,
    source_info: ImageAssetInfo,
    provenance: Provenance,
) -> Result<AssetId, NormalizeError> {
    let format = EncodeFormat::for_source(source_info.format);
    let bytes = codec
        .encode(image, format)
        .map_err(|e| NormalizeError::SaveFailed {
            asset: provenance.source.clone(),
            reason: e.to_string(),
        })?;
    let name = provenance.derived_name(format.extension());
    let derived = assets
        .create_asset(&name, bytes, format.as_asset_format(), &provenance)
        .map_err(|e| NormalizeError::SaveFailed {
            asset: provenance.source.clone(),
            reason: e.to_string(),
        })?;
    assets
        .copy_descriptive_metadata(&provenance.source, &derived)
        .map_err(|e| NormalizeError::SaveFailed {
            asset: provenance.source.clone(),
            reason: e.to_string(),
        })?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        source = %provenance.source,
        derived = %derived,
        operation = %provenance.operation,
        "registered derived asset"
    );

    Ok(derived)
}
