//! SQL text: the PostgreSQL → MySQL translator and the parameterized query builder.

mod builder;
pub mod params;
pub mod translate;
pub use builder::*;
pub use params::*;
pub use translate::{translate, translate_with_report, TranslateWarning, Translation};
