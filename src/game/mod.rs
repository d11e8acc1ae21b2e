pub mod agent;
pub mod angle;
pub mod bot;
pub mod collision;
pub mod constants;
pub mod food;
pub mod math;
pub mod room;
pub mod types;
pub mod world;
