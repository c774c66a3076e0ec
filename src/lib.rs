pub mod api;
pub mod bounds;
pub mod config;
pub mod error;
pub mod objective;
pub mod optimizer;
pub mod params;
pub mod plan;
pub mod sample;
pub mod scan;
pub mod simulate;
pub mod store;
pub mod wizard;

pub use error::{XfResult, XrayFitError};
