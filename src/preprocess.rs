//! Preprocessing transforms applied before peak detection.
//!
//! A transform maps a frame to a filtered frame of the same size. It never
//! mutates its input; the detector always runs it on its own working copy.
mod discoidal;

pub use discoidal::DiscoidalFilter;

use crate::image::{ImageF32, Roi};

/// Pure image-to-image transform restricted to a region of interest.
///
/// Pixels outside `roi` are returned unchanged.
pub trait Preprocess: Send + Sync {
    fn apply(&self, image: &ImageF32, roi: Roi) -> ImageF32;
}

impl<F> Preprocess for F
where
    F: Fn(&ImageF32, Roi) -> ImageF32 + Send + Sync,
{
    fn apply(&self, image: &ImageF32, roi: Roi) -> ImageF32 {
        self(image, roi)
    }
}
