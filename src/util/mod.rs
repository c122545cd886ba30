pub mod vec2;

pub use vec2::{Rect, Vec2};
