pub mod config;
pub mod portal;

pub use config::Config;
pub use portal::*;
