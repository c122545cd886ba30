pub mod ai;
pub mod combat;
pub mod physics;
pub mod projectile;
