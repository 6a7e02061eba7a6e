//! Delivery of queued items.
//!
//! - `dispatch`: per-kind delivery of a single item
//! - `processor`: drain passes with the single-pass guard and retry ceiling
//! - `trigger`: connectivity-driven scheduling of drain passes

mod dispatch;
mod processor;
mod trigger;

pub use dispatch::{deliver, DeliveryError};
pub use processor::{DeliveryProcessor, DrainOutcome, DrainReport, ProcessorStatsSnapshot};
pub use trigger::DrainTrigger;
