// Domain models: measurements, audit snapshots, alerts, cycle reports

mod alert;
mod cycle;
mod snapshot;

pub use alert::GrowthAlert;
pub use cycle::{CycleReport, ServerReport, ServerStatus};
pub use snapshot::{Measurement, Segment, SizeSnapshot};
