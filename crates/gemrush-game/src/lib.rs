pub mod controller;
pub mod entity;
pub mod level;
pub mod physics;

pub use controller::{GameController, GameError};
