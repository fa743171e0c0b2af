pub mod error;
pub mod path;
pub mod resolver;

pub use error::{FsError, FsResult};
pub use resolver::{PathResolver, ResolvedNode};
