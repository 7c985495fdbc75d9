//! Image decode/crop/composite/encode behind a trait seam.
//!
//! The transform pipeline never talks to an image library directly; it goes
//! through [`ImageCodec`] so the library binding stays in one place.
//! [`DynamicCodec`] is the default binding over the `image` crate.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use thiserror::Error;

use crate::geometry::{CropBox, PaddingBox};
use crate::stores::AssetFormat;

/// Quality used when re-encoding JPEG sources.
pub const DERIVED_JPEG_QUALITY: u8 = 90;

/// Background color of padded canvases (solid white).
pub const PAD_BACKGROUND: [u8; 3] = [255, 255, 255];

/// Errors from decode, transform, or encode steps.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The bytes are not a decodable image.
    #[error("invalid or unsupported image data: {0}")]
    Decode(String),

    /// The requested crop region does not fit inside the image.
    #[error("crop box {x},{y} {width}x{height} exceeds image bounds {image_width}x{image_height}")]
    CropOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    /// The canvas is smaller than the image being composited onto it.
    #[error("canvas {canvas_width}x{canvas_height} cannot hold {image_width}x{image_height} source")]
    CanvasTooSmall {
        canvas_width: u32,
        canvas_height: u32,
        image_width: u32,
        image_height: u32,
    },

    /// Encoding to the output format failed.
    #[error("encoding failed: {0}")]
    Encode(String),
}

/// Output encoding for a derived asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeFormat {
    Jpeg,
    Png,
}

impl EncodeFormat {
    /// Encode derived assets in the source's own format where we can;
    /// everything else falls back to PNG, which is lossless and always
    /// available.
    pub fn for_source(format: AssetFormat) -> Self {
        match format {
            AssetFormat::Jpeg => EncodeFormat::Jpeg,
            AssetFormat::Png | AssetFormat::Other => EncodeFormat::Png,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            EncodeFormat::Jpeg => "jpg",
            EncodeFormat::Png => "png",
        }
    }

    pub fn as_asset_format(self) -> AssetFormat {
        match self {
            EncodeFormat::Jpeg => AssetFormat::Jpeg,
            EncodeFormat::Png => AssetFormat::Png,
        }
    }
}

/// Capability seam over an image library.
pub trait ImageCodec {
    /// In-memory image representation of the backing library.
    type Image;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Image, CodecError>;

    fn crop(&self, image: &Self::Image, area: &CropBox) -> Result<Self::Image, CodecError>;

    /// Place `image` on a `canvas`-sized background of the given color at
    /// the canvas offsets.
    fn composite_on_canvas(
        &self,
        image: &Self::Image,
        canvas: &PaddingBox,
        background: [u8; 3],
    ) -> Result<Self::Image, CodecError>;

    fn encode(&self, image: &Self::Image, format: EncodeFormat) -> Result<Vec<u8>, CodecError>;
}

/// [`ImageCodec`] bound to the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicCodec;

impl ImageCodec for DynamicCodec {
    type Image = DynamicImage;

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        image::load_from_memory(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn crop(&self, image: &DynamicImage, area: &CropBox) -> Result<DynamicImage, CodecError> {
        if !area.fits_within(image.width(), image.height()) {
            return Err(CodecError::CropOutOfBounds {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height,
                image_width: image.width(),
                image_height: image.height(),
            });
        }
        Ok(image.crop_imm(area.x, area.y, area.width, area.height))
    }

    fn composite_on_canvas(
        &self,
        image: &DynamicImage,
        canvas: &PaddingBox,
        background: [u8; 3],
    ) -> Result<DynamicImage, CodecError> {
        if canvas.canvas_width < image.width() || canvas.canvas_height < image.height() {
            return Err(CodecError::CanvasTooSmall {
                canvas_width: canvas.canvas_width,
                canvas_height: canvas.canvas_height,
                image_width: image.width(),
                image_height: image.height(),
            });
        }
        let mut surface = RgbImage::from_pixel(
            canvas.canvas_width,
            canvas.canvas_height,
            Rgb(background),
        );
        image::imageops::replace(
            &mut surface,
            &image.to_rgb8(),
            i64::from(canvas.offset_x),
            i64::from(canvas.offset_y),
        );
        Ok(DynamicImage::ImageRgb8(surface))
    }

    fn encode(&self, image: &DynamicImage, format: EncodeFormat) -> Result<Vec<u8>, CodecError> {
        let mut out = Cursor::new(Vec::new());
        match format {
            EncodeFormat::Jpeg => {
                // JPEG has no alpha channel.
                let rgb = image.to_rgb8();
                let encoder = JpegEncoder::new_with_quality(&mut out, DERIVED_JPEG_QUALITY);
                encoder
                    .write_image(
                        rgb.as_raw(),
                        rgb.width(),
                        rgb.height(),
                        ExtendedColorType::Rgb8,
                    )
                    .map_err(|e| CodecError::Encode(e.to_string()))?;
            }
            EncodeFormat::Png => {
                image
                    .write_to(&mut out, image::ImageFormat::Png)
                    .map_err(|e| CodecError::Encode(e.to_string()))?;
            }
        }
        Ok(out.into_inner())
    }
}
