pub mod attr;
pub mod dispatch;
pub mod error;
#[cfg(feature = "fuse")]
pub mod fuse_shim;
pub mod listing;
pub mod resolver;
pub mod signal;
pub mod stores;
pub mod sys;

pub use attr::*;
pub use dispatch::*;
pub use error::*;
#[cfg(feature = "fuse")]
pub use fuse_shim::*;
pub use listing::*;
pub use resolver::*;
pub use stores::*;
pub use sys::TimeUpdate;
