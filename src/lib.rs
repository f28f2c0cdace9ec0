//! Register mirroring and write staging for Sunline controllers on a Modbus
//! RTU line.
//!
//! A [`Device`] keeps a local copy of the controller's registers up to date
//! and writes staged values back in the background. Read and write failures
//! are reported through the device's [`EventBus`].

pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod model;
pub mod net;
pub mod register;
pub mod util;


pub use config::Config;
pub use device::{Device, Options};
pub use error::{Error, Result};
pub use event::{Event, EventBus, EventKind};
pub use model::{Model, AUTO_TRANSFORMER};
pub use register::{Register, RegisterBank, RegisterType, Value};
