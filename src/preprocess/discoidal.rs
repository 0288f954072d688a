use super::Preprocess;
use crate::error::ConfigError;
use crate::image::{ImageF32, Roi};

/// Background-suppressing ring filter.
///
/// Each output pixel is the mean over a small inner disc minus the mean over
/// a surrounding ring, clamped at zero. Spots narrower than the inner radius
/// keep their contrast while smooth background cancels out.
///
/// Membership uses the rounded Euclidean distance: offsets with
/// `round(d) <= inner_radius` form the disc, `round(d) == outer_radius` the
/// ring. Offsets that fall outside the image are skipped.
#[derive(Clone, Debug)]
pub struct DiscoidalFilter {
    inner_radius: usize,
    outer_radius: usize,
    inner: Vec<(isize, isize)>,
    outer: Vec<(isize, isize)>,
}

impl DiscoidalFilter {
    pub fn new(inner_radius: usize, outer_radius: usize) -> Result<Self, ConfigError> {
        if inner_radius >= outer_radius {
            return Err(ConfigError::InvalidFilterRadii {
                inner: inner_radius,
                outer: outer_radius,
            });
        }
        let r = outer_radius as isize;
        let mut inner = Vec::new();
        let mut outer = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                let d = ((dx * dx + dy * dy) as f64).sqrt().round() as usize;
                if d <= inner_radius {
                    inner.push((dx, dy));
                }
                if d == outer_radius {
                    outer.push((dx, dy));
                }
            }
        }
        Ok(Self {
            inner_radius,
            outer_radius,
            inner,
            outer,
        })
    }

    pub fn inner_radius(&self) -> usize {
        self.inner_radius
    }

    pub fn outer_radius(&self) -> usize {
        self.outer_radius
    }

    fn mean_over(image: &ImageF32, x: usize, y: usize, offsets: &[(isize, isize)]) -> f64 {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for &(dx, dy) in offsets {
            if let Some(v) = image.get_checked(x as isize + dx, y as isize + dy) {
                sum += v as f64;
                count += 1;
            }
        }
        sum / count as f64
    }
}

impl Preprocess for DiscoidalFilter {
    fn apply(&self, image: &ImageF32, roi: Roi) -> ImageF32 {
        let roi = roi.clip(image.w, image.h);
        let mut out = image.clone();
        for y in roi.y..roi.y_end() {
            for x in roi.x..roi.x_end() {
                let inner = Self::mean_over(image, x, y, &self.inner);
                let ring = Self::mean_over(image, x, y, &self.outer);
                let v = inner - ring;
                out.set(x, y, if v > 0.0 { v as f32 } else { 0.0 });
            }
        }
        out
    }
}
