mod engine;
mod summary;
mod types;

pub use engine::project;
pub use types::{ConfigError, Params, Projection, Series, SeriesPoint, Summary, YearRecord};
