//! # lumen
//!
//! A physically-based offline renderer: scenes are rendered by Monte Carlo
//! integration of the light-transport equation over geometric primitives,
//! materials, area lights, and participating media.
//!
//! ## Architecture
//!
//! - **Linear algebra**: distinct `Vector`/`Normal`/`Point` types with
//!   semantic transform rules, `Transform` caching its inverse
//! - **Sampling**: stratified, scrambled (0,2)-sequence, and adaptive
//!   samplers feeding per-pixel batches to the integrators
//! - **Acceleration**: an SAH bounding-volume hierarchy, linearized into a
//!   flat array for stackless traversal
//! - **Scattering**: BSDFs composed of up to eight BxDF lobes allocated in a
//!   per-thread bump arena, with shading/geometric normal correction
//! - **Integrators**: Whitted, unidirectional path tracing with Russian
//!   roulette, and bidirectional path tracing; emission and single-scattering
//!   volume integrators for participating media
//! - **Parallelism**: worker threads pull shuffled image tiles from an atomic
//!   block queue and splat filter-weighted samples into lock-free pixel
//!   accumulators
//!
//! ## Rendering equation
//!
//! The integrators estimate the rendering equation via Monte Carlo
//! integration:
//!
//! ```text
//!   L_o(p, ω_o) = L_e(p, ω_o) + ∫_Ω f(p, ω_i, ω_o) · L_i(p, ω_i) · |cos θ_i| dω_i
//! ```
//!
//! with multiple importance sampling combining light and BSDF samples by the
//! power heuristic.

pub mod accel;
pub mod driver;
pub mod film;
pub mod geometry;
pub mod integrator;
pub mod light;
pub mod linalg;
pub mod material;
pub mod monte_carlo;
pub mod presets;
pub mod renderer;
pub mod sampler;
pub mod scene;
pub mod texture;
pub mod volume;
