use crate::net::{Request, Transport, TransportError};

use log::{debug, warn};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_modbus::SlaveId;

/// Exclusive access to the transport of one device.
///
/// Every request passes through the same lock, so two calls never overlap
/// on the wire. Each call is bounded by the gate's timeout.
pub struct Gate {
    transport: Mutex<Box<dyn Transport>>,
    unit: SlaveId,
    timeout: Duration,
}

impl Gate {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

    pub fn new(transport: Box<dyn Transport>, unit: SlaveId, timeout: Duration) -> Self {
        Self {
            transport: Mutex::new(transport),
            unit,
            timeout,
        }
    }

    pub fn unit(&self) -> SlaveId {
        self.unit
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn open(&self) -> Result<(), TransportError> {
        self.transport.lock().await.open().await
    }

    pub async fn close(&self) {
        if let Err(e) = self.transport.lock().await.close().await {
            warn!("Failed to close transport of unit {}. [{}]", self.unit, e);
        }
    }

    pub async fn execute(&self, request: &Request) -> Result<Vec<u16>, TransportError> {
        let mut transport = self.transport.lock().await;
        debug!(
            "Execute {:?} on unit {} at {}.",
            request.fn_code, self.unit, request.address
        );
        match tokio::time::timeout(self.timeout, transport.execute(self.unit, request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        }
    }
}
