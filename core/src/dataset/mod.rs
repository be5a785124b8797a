pub mod fallback;
pub mod provider;

pub use fallback::{fallback_for, fallback_table};
pub use provider::{
    DatasetOrigin, DatasetProvider, DatasetSource, JsonFileSource, PeriodDataset, StaticSource,
    UnavailableSource,
};
