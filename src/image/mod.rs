//! Frame buffers, regions of interest and disk I/O.
pub mod f32;
pub mod io;
pub mod roi;

pub use self::f32::ImageF32;
pub use self::roi::Roi;
