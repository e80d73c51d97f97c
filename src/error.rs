use crate::bootstrap::BootStage;
use crate::device::DriverError;
use crate::matter::stack::StackError;
use crate::storage::StorageError;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum LightError {
    #[error("Persistent storage unavailable: {0}")]
    Storage(#[from] StorageError),

    #[error("LED driver initialization failed: {0}")]
    Driver(#[from] DriverError),

    #[error("Matter node could not be created")]
    NodeCreationFailed,

    #[error("On/Off light endpoint could not be created")]
    EndpointCreationFailed,

    #[error("Endpoint {0} is already bound")]
    EndpointAlreadyBound(u16),

    #[error("Failed to start Matter stack: {0}")]
    StackStartFailed(#[from] StackError),

    #[error("Bootstrap already ran and stopped at stage {0}")]
    BootstrapFinished(BootStage),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LightError>;
