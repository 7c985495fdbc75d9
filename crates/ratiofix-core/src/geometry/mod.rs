//! Crop and padding geometry.
//!
//! Both engines are pure: they take pixel dimensions and a target ratio and
//! return integer boxes. Crop boxes select a region inside the image; padding
//! boxes describe a letterbox canvas that never shrinks the source.
//!
//! # Coordinate System
//!
//! - Origin is the top-left corner
//! - All coordinates are integer pixels
//! - A target ratio is `width / height` as a positive real number

mod crop;
mod pad;

pub use crop::{default_crop_box, sanitize_crop_box, CropBox, CropBoxEdit};
pub use pad::{compute_padding_box, PaddingBox};
