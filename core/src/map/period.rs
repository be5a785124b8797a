use crate::model::{MetricRecord, TimePoint};

/// Monotonic stamp of an issued period update.
pub type PeriodToken = u64;

/// A period update issued by the map; the host resolves it through the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodRequest {
    pub token: PeriodToken,
    pub time_point: TimePoint,
}

/// A resolved period update, fed back into the map.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodLoaded {
    pub token: PeriodToken,
    pub time_point: TimePoint,
    pub records: Vec<MetricRecord>,
}

/// Issues tokens and decides whether a resolution is still the latest one.
#[derive(Debug, Default)]
pub struct PeriodSequence {
    issued: PeriodToken,
}

impl PeriodSequence {
    pub fn issue(&mut self, time_point: TimePoint) -> PeriodRequest {
        self.issued += 1;
        PeriodRequest {
            token: self.issued,
            time_point,
        }
    }

    pub fn is_current(&self, token: PeriodToken) -> bool {
        token == self.issued
    }

    pub fn latest(&self) -> PeriodToken {
        self.issued
    }
}
