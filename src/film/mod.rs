//! The film layer: radiance colors, reconstruction filters, the atomic
//! render target, and the camera that turns image samples into rays.

mod camera;
mod color;
mod filter;
mod render_target;

pub use camera::Camera;
pub use color::{Color, Color24, BLACK, WHITE};
pub use filter::Filter;
pub use render_target::{Pixel, RenderTarget};
