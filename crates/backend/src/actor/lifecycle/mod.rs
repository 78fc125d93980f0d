//! Lifecycle primitives shared by the pipeline actors and the host.

pub mod completion;
