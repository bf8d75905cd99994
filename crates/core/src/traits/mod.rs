pub mod capacity;
pub mod dispatch_invoker;
pub mod queue_transport;

pub use capacity::*;
pub use dispatch_invoker::*;
pub use queue_transport::*;
