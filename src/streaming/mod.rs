//! Background loading of remote level content

pub mod level_loader;
pub mod source;

pub use level_loader::{LevelLoader, LoadRequest, LoadResult};
pub use source::{
    DirectoryLevelSource, LevelSource, LoadFuture,
    level_path, save_level, load_level,
};
