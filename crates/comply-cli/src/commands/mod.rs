//! Command implementations.

pub mod config;
pub mod estimate;
pub mod mapping;
pub mod score;

pub use self::config::execute_config;
pub use self::estimate::execute_estimate;
pub use self::mapping::execute_mapping;
pub use self::score::execute_score;
