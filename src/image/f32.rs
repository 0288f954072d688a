//! Owned single-channel f32 image in row-major layout (stride == width).
//!
//! This is the pixel accessor used by every stage: detection reads and paints
//! a private copy, fitting reads windows, preprocessing produces new buffers.
use super::roi::Roi;

#[derive(Clone, Debug, PartialEq)]
pub struct ImageF32 {
    /// Image width in pixels
    pub w: usize,
    /// Image height in pixels
    pub h: usize,
    /// Number of f32 elements between consecutive rows (equals `w`)
    pub stride: usize,
    /// Backing storage in row-major order
    pub data: Vec<f32>,
}

impl ImageF32 {
    /// Construct a zero-initialized buffer of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            stride: w,
            data: vec![0.0; w * h],
        }
    }

    /// Wrap an existing row-major buffer. Returns `None` when the length does
    /// not match `w × h`.
    pub fn from_vec(w: usize, h: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == w * h).then_some(Self {
            w,
            h,
            stride: w,
            data,
        })
    }

    #[inline]
    /// Convert (x, y) to a linear index into `data`.
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.stride + x
    }
    #[inline]
    /// Get the pixel value at (x, y).
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[self.idx(x, y)]
    }
    #[inline]
    /// Set the pixel value at (x, y).
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    /// Signed accessor returning `None` outside the image.
    #[inline]
    pub fn get_checked(&self, x: isize, y: isize) -> Option<f32> {
        if x < 0 || y < 0 || x as usize >= self.w || y as usize >= self.h {
            return None;
        }
        Some(self.get(x as usize, y as usize))
    }

    /// Pixels of row `y`.
    #[inline]
    pub fn row(&self, y: usize) -> &[f32] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }

    /// Rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        (0..self.h).map(move |y| self.row(y))
    }

    /// Row slices of `roi`, which must lie inside the image.
    pub fn roi_rows<'a>(&'a self, roi: &Roi) -> impl Iterator<Item = &'a [f32]> + 'a {
        let (x0, x1) = (roi.x, roi.x_end());
        (roi.y..roi.y_end()).map(move |y| &self.row(y)[x0..x1])
    }

    /// Region covering the whole image.
    pub fn full_roi(&self) -> Roi {
        Roi::new(0, 0, self.w, self.h)
    }

    /// Smallest pixel value in the image (`+inf` when empty).
    pub fn min_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// Largest pixel value in the image (`-inf` when empty).
    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Mean and population standard deviation over `roi`.
    pub fn roi_stats(&self, roi: &Roi) -> (f64, f64) {
        let count = roi.area();
        if count == 0 {
            return (f64::NAN, f64::NAN);
        }
        let sum: f64 = self
            .roi_rows(roi)
            .flat_map(|row| row.iter())
            .map(|&v| v as f64)
            .sum();
        let mean = sum / count as f64;
        let var: f64 = self
            .roi_rows(roi)
            .flat_map(|row| row.iter())
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum();
        (mean, (var / count as f64).sqrt())
    }

    /// Paint a filled disc centred at `(cx, cy)` with `value`.
    ///
    /// A pixel belongs to the disc when its centre lies within `radius + 0.5`
    /// of the disc centre, which matches a `(2r+1)`-wide rasterised oval.
    pub fn fill_disc(&mut self, cx: usize, cy: usize, radius: usize, value: f32) {
        let r = radius as isize;
        let limit = (radius as f64 + 0.5).powi(2);
        for dy in -r..=r {
            let y = cy as isize + dy;
            if y < 0 || y as usize >= self.h {
                continue;
            }
            for dx in -r..=r {
                let x = cx as isize + dx;
                if x < 0 || x as usize >= self.w {
                    continue;
                }
                if ((dx * dx + dy * dy) as f64) <= limit {
                    self.set(x as usize, y as usize, value);
                }
            }
        }
    }
}
