mod bank;
mod code;

pub use bank::RegisterBank;
pub use code::{Action, CodeTable};

use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub type Address = u16;
pub type Value = i32;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterType {
    DiscreteInput,
    Coil,
    InputRegister,
    HoldingRegister,
}

impl RegisterType {
    pub const ALL: [RegisterType; 4] = [
        RegisterType::DiscreteInput,
        RegisterType::Coil,
        RegisterType::InputRegister,
        RegisterType::HoldingRegister,
    ];
}

impl Display for RegisterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterType::DiscreteInput => f.write_str("discrete input"),
            RegisterType::Coil => f.write_str("coil"),
            RegisterType::InputRegister => f.write_str("input register"),
            RegisterType::HoldingRegister => f.write_str("holding register"),
        }
    }
}

/// One entry of a static register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Definition {
    pub name: &'static str,
    pub kind: RegisterType,
    pub address: Address,
}

impl Definition {
    pub const fn new(name: &'static str, kind: RegisterType, address: Address) -> Self {
        Self {
            name,
            kind,
            address,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct State {
    last_known: Option<Value>,
    pending: Option<Value>,
}

/// Values of a register taken under one lock at the start of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub current: Option<Value>,
    pub staged: Option<Value>,
}

#[derive(Debug)]
pub struct Register {
    name: &'static str,
    kind: RegisterType,
    address: Address,
    state: Mutex<State>,
}

impl Register {
    pub fn new(definition: &Definition) -> Self {
        Self {
            name: definition.name,
            kind: definition.kind,
            address: definition.address,
            state: Mutex::new(State::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> RegisterType {
        self.kind
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The staged value if any, else the last value read from the device.
    pub fn current_value(&self) -> Result<Value> {
        let state = self.state();
        state
            .pending
            .or(state.last_known)
            .ok_or_else(|| Error::UnreadRegister(self.name.to_owned()))
    }

    pub fn last_known(&self) -> Option<Value> {
        self.state().last_known
    }

    pub fn pending(&self) -> Option<Value> {
        self.state().pending
    }

    pub fn stage(&self, value: Value) {
        let mut state = self.state();
        if state.pending != Some(value) {
            state.pending = Some(value);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.state().pending.is_some()
    }

    pub fn accept_pending(&self) {
        let mut state = self.state();
        if let Some(value) = state.pending.take() {
            state.last_known = Some(value);
        }
    }

    pub fn discard(&self) {
        self.state().pending = None;
    }

    pub(crate) fn set_last_known(&self, value: Value) {
        self.state().last_known = Some(value);
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        let state = self.state();
        Snapshot {
            current: state.pending.or(state.last_known),
            staged: state.pending,
        }
    }

    /// Record a confirmed write of `written`. The pending value is only
    /// cleared if it is still the one captured in the snapshot, so a value
    /// staged while the write was in flight stays dirty.
    pub(crate) fn settle(&self, written: Value, staged: Option<Value>) {
        let mut state = self.state();
        state.last_known = Some(written);
        if state.pending == staged {
            state.pending = None;
        }
    }

    /// Drop a pending value that can never be written, unless it was
    /// replaced in the meantime.
    pub(crate) fn reject(&self, staged: Option<Value>) {
        let mut state = self.state();
        if staged.is_some() && state.pending == staged {
            state.pending = None;
        }
    }
}
