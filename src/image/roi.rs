use serde::{Deserialize, Serialize};

/// Rectangular region of interest in pixel coordinates, half-open on both
/// axes: `[x, x + width) × [y, y + height)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Roi {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Roi {
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn x_end(&self) -> usize {
        self.x + self.width
    }

    #[inline]
    pub fn y_end(&self) -> usize {
        self.y + self.height
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && x < self.x_end() && y >= self.y && y < self.y_end()
    }

    /// Intersect with the `[0, width) × [0, height)` image rectangle.
    pub fn clip(&self, width: usize, height: usize) -> Roi {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.x_end().min(width);
        let y1 = self.y_end().min(height);
        Roi::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Square window of side `2 * radius + 1` centred at `(cx, cy)`, clipped to
    /// the image.
    pub fn square_around(cx: usize, cy: usize, radius: usize, width: usize, height: usize) -> Roi {
        let x0 = cx.saturating_sub(radius);
        let y0 = cy.saturating_sub(radius);
        let x1 = (cx + radius + 1).min(width);
        let y1 = (cy + radius + 1).min(height);
        Roi::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }
}
