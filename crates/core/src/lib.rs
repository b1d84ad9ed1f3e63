//! ULog flight recordings: parsing, derived telemetry fields, and the
//! curve-selection session a plotting frontend renders from.

pub mod dataset;
pub mod model;
pub mod parsers;
pub mod report;
pub mod views;

pub use dataset::build;
pub use model::{Recording, Session, Slot};
pub use parsers::parse_auto;
