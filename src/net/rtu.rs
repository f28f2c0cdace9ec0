use crate::net::{Payload, Request, Transport, TransportError};

use async_trait::async_trait;
use log::{info, warn};
use tokio_modbus::client::Context;
use tokio_modbus::prelude::{rtu, Client, Reader, Slave, SlaveContext, SlaveId, Writer};
use tokio_modbus::FunctionCode;
use tokio_serial::{DataBits, FlowControl, Parity, SerialStream, StopBits};

/// Modbus RTU over a serial port, 8N1 without flow control.
pub struct RtuTransport {
    path: String,
    baud_rate: u32,
    context: Option<Context>,
}

impl RtuTransport {
    pub fn new(path: &str, baud_rate: u32) -> Self {
        Self {
            path: path.to_owned(),
            baud_rate,
            context: None,
        }
    }
}

fn bits(values: Vec<bool>) -> Vec<u16> {
    values.into_iter().map(|b| if b { 1 } else { 0 }).collect()
}

/// Map a client result onto the transport's error classes. Exception
/// responses keep their code so callers can tell final rejections from a
/// busy device.
fn classify<T>(result: tokio_modbus::Result<T>) -> Result<T, TransportError> {
    match result {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(code)) => Err(TransportError::Exception(code)),
        Err(tokio_modbus::Error::Transport(e)) => Err(TransportError::Io(e)),
        Err(e) => Err(TransportError::InvalidResponse(format!("{}", e))),
    }
}

#[async_trait]
impl Transport for RtuTransport {
    async fn open(&mut self) -> Result<(), TransportError> {
        if self.context.is_some() {
            return Ok(());
        }

        let builder = tokio_serial::new(&self.path, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None);

        match SerialStream::open(&builder) {
            Ok(stream) => {
                info!("Opened {} at {} baud.", self.path, self.baud_rate);
                self.context = Some(rtu::attach_slave(stream, Slave::broadcast()));
                Ok(())
            }
            Err(e) => Err(TransportError::Connection(format!(
                "Failed to open {}. [{}]",
                self.path, e
            ))),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut context) = self.context.take() {
            if let Err(e) = context.disconnect().await {
                warn!("Disconnect from {} failed. [{}]", self.path, e);
                return Err(e.into());
            }
            info!("Closed {}.", self.path);
        }
        Ok(())
    }

    async fn execute(
        &mut self,
        unit: SlaveId,
        request: &Request,
    ) -> Result<Vec<u16>, TransportError> {
        let context = self.context.as_mut().ok_or(TransportError::NotConnected)?;
        context.set_slave(Slave(unit));

        let addr = request.address;
        match (request.fn_code, &request.payload) {
            (FunctionCode::ReadCoils, Payload::Count(cnt)) => {
                classify(context.read_coils(addr, *cnt).await).map(bits)
            }
            (FunctionCode::ReadDiscreteInputs, Payload::Count(cnt)) => {
                classify(context.read_discrete_inputs(addr, *cnt).await).map(bits)
            }
            (FunctionCode::ReadInputRegisters, Payload::Count(cnt)) => {
                classify(context.read_input_registers(addr, *cnt).await)
            }
            (FunctionCode::ReadHoldingRegisters, Payload::Count(cnt)) => {
                classify(context.read_holding_registers(addr, *cnt).await)
            }
            (FunctionCode::WriteSingleCoil, Payload::Coils(coils)) if coils.len() == 1 => {
                classify(context.write_single_coil(addr, coils[0]).await).map(|_| Vec::new())
            }
            (FunctionCode::WriteMultipleCoils, Payload::Coils(coils)) => {
                classify(context.write_multiple_coils(addr, coils).await).map(|_| Vec::new())
            }
            (FunctionCode::WriteSingleRegister, Payload::Words(words)) if words.len() == 1 => {
                classify(context.write_single_register(addr, words[0]).await).map(|_| Vec::new())
            }
            (FunctionCode::WriteMultipleRegisters, Payload::Words(words)) => {
                classify(context.write_multiple_registers(addr, words).await).map(|_| Vec::new())
            }
            (code, payload) => Err(TransportError::Encoding(format!(
                "{code:?} cannot carry {payload:?}"
            ))),
        }
    }
}
