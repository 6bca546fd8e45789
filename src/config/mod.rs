//! Process configuration: the active SQL dialect and environment settings.

pub mod dialect;
pub mod settings;

pub use dialect::*;
pub use settings::*;
