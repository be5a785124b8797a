pub mod bezier;
pub mod projection;
pub mod stats;

pub use bezier::{curved_path, BezierCurve, CurveSettings};
pub use projection::GeoBounds;
pub use stats::StatsHelper;
