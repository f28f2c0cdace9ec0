use crate::net::TransportError;
use crate::register::{Action, RegisterType};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("No write function available for {0}s (read only)")]
    ReadOnlyRegister(RegisterType),

    #[error("No read function available for {0}s")]
    NoReadFunction(RegisterType),

    #[error("{count} function codes qualify for {action} on {kind}s")]
    AmbiguousFunctionCode {
        kind: RegisterType,
        action: Action,
        count: usize,
    },

    #[error("Register {0} has no known value yet")]
    UnreadRegister(String),

    #[error("Unknown register: {0}")]
    UnknownRegister(String),

    #[error("Invalid register map: {0}")]
    Model(String),

    #[error("Device is already active")]
    AlreadyActive,

    #[error("Device has been stopped")]
    Stopped,
}

impl Error {
    /// Whether retrying the same write can never succeed.
    pub fn is_permanent(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_permanent(),
            Error::ReadOnlyRegister(_) | Error::AmbiguousFunctionCode { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
