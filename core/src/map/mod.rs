pub mod detail;
pub mod flow;
pub mod markers;
pub mod period;
pub mod surface;
pub mod view;

pub use detail::{CityDetail, StarRating};
pub use period::{PeriodLoaded, PeriodRequest, PeriodSequence, PeriodToken};
pub use surface::{
    CityLabel, DashPattern, FlowArrow, FlowLayer, FlowLine, HeadlessSurface, LineStyle, MapSurface,
    MarkerSpec, Rgba, Scene,
};
pub use view::MapView;
