pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use errors::{RelayError, RelayResult};
pub use models::{
    DispatchEnvelope, QueueMessage, TriggerEvent, WorkPayload, PROCESS_MESSAGE_OPERATION,
};
pub use traits::{
    CapacityProvisioner, CapacitySignal, DispatchInvoker, InvocationHandler, ProvisioningStrategy,
    QueueTransport,
};
