//! Segment templates and their instantiated, spatially anchored form
//!
//! A [`SegmentTemplate`] is authored data. [`Segment::instantiate`] turns it
//! into a live segment with objects, lanes and builders that the generator
//! places, extrudes and activates.

pub mod builder;
pub mod instance;
pub mod lane;
pub mod object;
pub mod pool;
pub mod settings;
pub mod template;

pub use builder::{ActiveRandomChildren, BuildContext, BuildQueue, Builder, BuilderFactory};
pub use instance::Segment;
pub use lane::{Lane, LaneSource};
pub use object::{Mesh, ObjectResult, ObjectSource, SegmentObject};
pub use pool::SegmentPool;
pub use settings::{BoundsInclusion, ExtrusionSettings, Indexing, MeshColliderHandling};
pub use template::{Axis, SegmentTemplate, SegmentType};
