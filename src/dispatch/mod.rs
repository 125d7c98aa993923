//! Ordered dispatch: admission, bounded concurrent checking, in-order release.

pub mod dispatcher;
pub mod registry;
pub mod release;

pub use dispatcher::{Checker, Dispatcher, Summary};
pub use registry::WorkItemRegistry;
pub use release::OrderedReleaseBuffer;
