pub mod gate;
pub mod rtu;

pub use gate::Gate;

use crate::register::{Address, Value};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio_modbus::prelude::ExceptionCode;
use tokio_modbus::{FunctionCode, SlaveId};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Device answered with exception: {0}")]
    Exception(ExceptionCode),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport is not connected")]
    NotConnected,
}

impl TransportError {
    /// Whether sending the same request again can never succeed. A busy
    /// device may accept the request later, any other exception is final.
    pub fn is_permanent(&self) -> bool {
        match self {
            TransportError::Encoding(_) => true,
            TransportError::Exception(code) => !matches!(
                code,
                ExceptionCode::ServerDeviceBusy | ExceptionCode::Acknowledge
            ),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Count(u16),
    Coils(Vec<bool>),
    Words(Vec<u16>),
}

/// One request on the wire, without the unit id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub fn_code: FunctionCode,
    pub address: Address,
    pub payload: Payload,
}

impl Request {
    pub fn read(fn_code: FunctionCode, address: Address, count: u16) -> Self {
        Self {
            fn_code,
            address,
            payload: Payload::Count(count),
        }
    }

    /// Pack register values into the representation `fn_code` carries.
    pub fn write(
        fn_code: FunctionCode,
        address: Address,
        values: &[Value],
    ) -> Result<Self, TransportError> {
        let single = matches!(
            fn_code,
            FunctionCode::WriteSingleCoil | FunctionCode::WriteSingleRegister
        );
        if single && values.len() != 1 {
            return Err(TransportError::Encoding(format!(
                "{fn_code:?} carries exactly one value, got {}",
                values.len()
            )));
        }
        if values.is_empty() || values.len() > u16::MAX as usize {
            return Err(TransportError::Encoding(format!(
                "Invalid number of values for {fn_code:?}: {}",
                values.len()
            )));
        }

        let payload = match fn_code {
            FunctionCode::WriteSingleCoil | FunctionCode::WriteMultipleCoils => Payload::Coils(
                values
                    .iter()
                    .map(|v| match *v {
                        0 => Ok(false),
                        1 => Ok(true),
                        v => Err(TransportError::Encoding(format!(
                            "Coil value {v} at {address} is neither 0 nor 1"
                        ))),
                    })
                    .collect::<Result<_, _>>()?,
            ),
            FunctionCode::WriteSingleRegister | FunctionCode::WriteMultipleRegisters => {
                Payload::Words(
                    values
                        .iter()
                        .map(|v| {
                            u16::try_from(*v).map_err(|_| {
                                TransportError::Encoding(format!(
                                    "Register value {v} at {address} does not fit into 16 bits"
                                ))
                            })
                        })
                        .collect::<Result<_, _>>()?,
                )
            }
            code => {
                return Err(TransportError::Encoding(format!(
                    "{code:?} is not a write function"
                )));
            }
        };

        Ok(Self {
            fn_code,
            address,
            payload,
        })
    }
}

/// A request/response connection to exactly one bus.
///
/// Implementations are driven by one caller at a time; concurrent access is
/// serialized by [`Gate`].
#[async_trait]
pub trait Transport: Send {
    async fn open(&mut self) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;

    /// Execute `request` against `unit`. Reads return one word per
    /// requested item (bits as 0/1), writes return an empty vector.
    async fn execute(
        &mut self,
        unit: SlaveId,
        request: &Request,
    ) -> Result<Vec<u16>, TransportError>;
}
