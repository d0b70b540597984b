pub mod cache;
pub mod config;
pub mod map;

pub use map::MapOptions;
