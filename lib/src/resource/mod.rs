//! The resource tree: files and directories read from disk, and the decorated
//! views through which the rest of the build sees them.

mod metadata;
mod file;
mod tree;
mod directory;

pub use metadata::*;
pub use file::*;
pub use tree::*;
pub use directory::*;
