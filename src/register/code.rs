use crate::error::{Error, Result};
use crate::register::RegisterType;

use std::fmt::Display;
use tokio_modbus::FunctionCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Read => f.write_str("read"),
            Action::Write => f.write_str("write"),
        }
    }
}

/// Function codes a device model accepts, per register type and per action.
#[derive(Debug, Clone, Copy)]
pub struct CodeTable {
    pub discrete_inputs: &'static [FunctionCode],
    pub coils: &'static [FunctionCode],
    pub input_registers: &'static [FunctionCode],
    pub holding_registers: &'static [FunctionCode],
    pub read: &'static [FunctionCode],
    pub write: &'static [FunctionCode],
}

impl CodeTable {
    /// Block reads for every type, batch writes for coils and holding registers.
    pub const STANDARD: CodeTable = CodeTable {
        discrete_inputs: &[FunctionCode::ReadDiscreteInputs],
        coils: &[
            FunctionCode::ReadCoils,
            FunctionCode::WriteSingleCoil,
            FunctionCode::WriteMultipleCoils,
        ],
        input_registers: &[FunctionCode::ReadInputRegisters],
        holding_registers: &[
            FunctionCode::ReadHoldingRegisters,
            FunctionCode::WriteSingleRegister,
            FunctionCode::WriteMultipleRegisters,
        ],
        read: &[
            FunctionCode::ReadCoils,
            FunctionCode::ReadDiscreteInputs,
            FunctionCode::ReadHoldingRegisters,
            FunctionCode::ReadInputRegisters,
        ],
        write: &[
            FunctionCode::WriteMultipleCoils,
            FunctionCode::WriteMultipleRegisters,
        ],
    };

    pub fn allowed(&self, kind: RegisterType) -> &'static [FunctionCode] {
        match kind {
            RegisterType::DiscreteInput => self.discrete_inputs,
            RegisterType::Coil => self.coils,
            RegisterType::InputRegister => self.input_registers,
            RegisterType::HoldingRegister => self.holding_registers,
        }
    }

    pub fn actions(&self, action: Action) -> &'static [FunctionCode] {
        match action {
            Action::Read => self.read,
            Action::Write => self.write,
        }
    }

    /// The single function code allowed both for `kind` and for `action`.
    ///
    /// An empty intersection means the action is not possible on this type.
    /// More than one candidate is a broken table and is reported instead of
    /// picking one of them.
    pub fn select(&self, kind: RegisterType, action: Action) -> Result<FunctionCode> {
        let actions = self.actions(action);
        let mut candidates: Vec<FunctionCode> = Vec::new();
        for code in self.allowed(kind) {
            if actions.contains(code) && !candidates.contains(code) {
                candidates.push(*code);
            }
        }

        match candidates.as_slice() {
            [code] => Ok(*code),
            [] => match action {
                Action::Read => Err(Error::NoReadFunction(kind)),
                Action::Write => Err(Error::ReadOnlyRegister(kind)),
            },
            _ => Err(Error::AmbiguousFunctionCode {
                kind,
                action,
                count: candidates.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, CodeTable};
    use crate::error::Error;
    use crate::register::RegisterType;
    use tokio_modbus::FunctionCode;

    #[test]
    fn ut_select_standard() {
        let table = CodeTable::STANDARD;
        assert_eq!(
            table.select(RegisterType::DiscreteInput, Action::Read).unwrap(),
            FunctionCode::ReadDiscreteInputs
        );
        assert_eq!(
            table.select(RegisterType::Coil, Action::Read).unwrap(),
            FunctionCode::ReadCoils
        );
        assert_eq!(
            table.select(RegisterType::InputRegister, Action::Read).unwrap(),
            FunctionCode::ReadInputRegisters
        );
        assert_eq!(
            table.select(RegisterType::HoldingRegister, Action::Read).unwrap(),
            FunctionCode::ReadHoldingRegisters
        );
        assert_eq!(
            table.select(RegisterType::Coil, Action::Write).unwrap(),
            FunctionCode::WriteMultipleCoils
        );
        assert_eq!(
            table.select(RegisterType::HoldingRegister, Action::Write).unwrap(),
            FunctionCode::WriteMultipleRegisters
        );
    }

    #[test]
    fn ut_select_read_only() {
        let table = CodeTable::STANDARD;
        assert!(matches!(
            table.select(RegisterType::DiscreteInput, Action::Write),
            Err(Error::ReadOnlyRegister(RegisterType::DiscreteInput))
        ));
        assert!(matches!(
            table.select(RegisterType::InputRegister, Action::Write),
            Err(Error::ReadOnlyRegister(RegisterType::InputRegister))
        ));
    }

    #[test]
    fn ut_select_ambiguous() {
        let table = CodeTable {
            write: &[
                FunctionCode::WriteSingleRegister,
                FunctionCode::WriteMultipleRegisters,
            ],
            ..CodeTable::STANDARD
        };
        assert!(matches!(
            table.select(RegisterType::HoldingRegister, Action::Write),
            Err(Error::AmbiguousFunctionCode { count: 2, .. })
        ));
    }

    #[test]
    fn ut_select_no_read() {
        let table = CodeTable {
            read: &[FunctionCode::ReadCoils],
            ..CodeTable::STANDARD
        };
        assert!(matches!(
            table.select(RegisterType::HoldingRegister, Action::Read),
            Err(Error::NoReadFunction(RegisterType::HoldingRegister))
        ));
    }

    #[test]
    fn ut_select_repeated_code() {
        let table = CodeTable {
            coils: &[
                FunctionCode::ReadCoils,
                FunctionCode::WriteMultipleCoils,
                FunctionCode::WriteMultipleCoils,
            ],
            ..CodeTable::STANDARD
        };
        assert_eq!(
            table.select(RegisterType::Coil, Action::Write).unwrap(),
            FunctionCode::WriteMultipleCoils
        );
    }
}
