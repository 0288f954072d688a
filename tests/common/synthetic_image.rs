use peak_tracker::image::ImageF32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Gaussian spot description for the synthetic renderer.
#[derive(Clone, Copy, Debug)]
pub struct SpotSpec {
    pub x: f64,
    pub y: f64,
    pub amplitude: f64,
    pub sigma: f64,
}

/// Renders spots on a flat background with optional uniform noise.
///
/// `noise` is the half-width of the uniform distribution. The generator is
/// seeded so that each call with the same arguments yields the same frame.
pub fn render_frame(
    width: usize,
    height: usize,
    background: f64,
    spots: &[SpotSpec],
    noise: f64,
    seed: u64,
) -> ImageF32 {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = ImageF32::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let mut v = background;
            for s in spots {
                let dx = x as f64 - s.x;
                let dy = y as f64 - s.y;
                v += s.amplitude * (-(dx * dx + dy * dy) / (2.0 * s.sigma * s.sigma)).exp();
            }
            if noise > 0.0 {
                v += rng.gen_range(-noise..noise);
            }
            img.set(x, y, v as f32);
        }
    }
    img
}
