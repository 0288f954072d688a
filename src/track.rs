//! Trajectory building from per-frame localizations.
//!
//! Linking is greedy: for each source frame, every candidate link to a
//! localization up to `look_ahead` frames later and closer than `max_step`
//! is collected, the candidates are ordered by (frame gap, squared distance)
//! and accepted in that order unless an endpoint is already taken. The
//! result is not a globally optimal assignment.
//!
//! [`msd`] turns linked trajectories into mean square displacement curves
//! and diffusion coefficients; [`step_sizes`] estimates diffusion from the
//! distribution of single-frame step lengths.
mod linker;
pub mod msd;
mod params;
pub mod step_sizes;

pub use linker::{link_particles, LinkRecord, LinkStep, Linkage, Positioned, Spot, Trajectory};
pub use params::LinkParams;
