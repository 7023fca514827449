pub mod ai;
pub mod constants;
pub mod math;
pub mod room;
pub mod sector;
pub mod snake;
pub mod types;
pub mod world;
