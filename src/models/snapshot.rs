// Size measurements and persisted audit snapshots

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which file group of a database a size refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    Data,
    Log,
}

impl Segment {
    pub fn suffix(self) -> &'static str {
        match self {
            Segment::Data => "_Data",
            Segment::Log => "_Log",
        }
    }

    /// Audit label for a database, e.g. `Fichas_Data`.
    pub fn label(self, database_name: &str) -> String {
        format!("{}{}", database_name, self.suffix())
    }
}

/// One row of live size output for a database, in megabytes. Never persisted as is.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub database_name: String,
    pub data_mb: Decimal,
    pub log_mb: Decimal,
}

impl Measurement {
    pub fn size(&self, segment: Segment) -> Decimal {
        match segment {
            Segment::Data => self.data_mb,
            Segment::Log => self.log_mb,
        }
    }
}

/// One audit row. Unique per (server_alias, label, captured_date); never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeSnapshot {
    pub captured_date: NaiveDate,
    pub server_alias: String,
    pub label: String,
    pub size_mb: Decimal,
}
