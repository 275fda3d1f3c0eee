//! Hydrological analysis algorithms
//!
//! DEM conditioning for flood mapping:
//! - Priority-Flood: O(n log n) depression filling (Barnes 2014)
//! - Fill sinks: iterative Planchon-Darboux (2001) alternative
//! - Flow direction: D8 single flow direction
//! - Flow accumulation: upstream contributing cells
//! - Conditioning: the three steps chained

mod correction;
pub(crate) mod fill_sinks;
pub(crate) mod flow_accumulation;
pub(crate) mod flow_direction;
mod priority_flood;

pub use correction::{condition_dem, ConditionDem, ConditionedDem, ConditioningParams, FillMethod};
pub use fill_sinks::{fill_sinks, FillSinks, FillSinksParams};
pub use flow_accumulation::{flow_accumulation, FlowAccumulation};
pub use flow_direction::{flow_direction, FlowDirection};
pub use priority_flood::{priority_flood, PriorityFlood, PriorityFloodParams};
