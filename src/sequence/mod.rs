//! Segment selection: definitions, sequences, levels and level iteration

pub mod definition;
pub mod descriptor;
pub mod iteration;
pub mod level;
pub mod sequence;

pub use definition::{SegmentDefinition, Selection};
pub use descriptor::{DefinitionDescriptor, LevelDescriptor, PolicyDescriptor, SequenceDescriptor, TemplateLibrary};
pub use iteration::{LevelIteration, resolve_start_level};
pub use level::{Level, LevelContent, LevelPick};
pub use sequence::{SegmentSelector, SegmentSequence, SelectionPolicy};
