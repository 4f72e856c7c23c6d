//! Orchestration of the rolling segment window
//!
//! [`TrackGenerator`] owns levels, segments, the path generator and the
//! extrusion pipeline and advances all of them from `tick`.

pub mod action;
pub mod config;
pub mod events;
pub mod track;

pub use action::{ActionQueue, TrackAction};
pub use config::{GeneratorConfig, OriginResetConfig};
pub use events::{EventBus, SubscriberId, TrackEvent};
pub use track::TrackGenerator;
