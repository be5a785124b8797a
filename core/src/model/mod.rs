pub mod city;
pub mod metrics;
pub mod time_point;

pub use city::{City, CityCatalog, GeoPoint};
pub use metrics::{find_record, DatasetTable, MetricRecord};
pub use time_point::TimePoint;
