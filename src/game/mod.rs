pub mod arcade;
pub mod constants;
pub mod entity;
pub mod events;
pub mod game_loop;
pub mod input_buffer;
pub mod level;
pub mod mode;
pub mod performance;
pub mod quest;
pub mod snapshot;
pub mod spatial;
pub mod systems;
pub mod world;

pub use game_loop::Game;
pub use input_buffer::{InputAction, InputSender};
pub use mode::GameMode;
