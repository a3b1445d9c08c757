//! Runtime plumbing shared by the bootstrap steps.

mod shutdown;

pub use shutdown::ShutdownSignal;
pub(crate) use shutdown::cancellable;
