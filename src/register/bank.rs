use crate::error::{Error, Result};
use crate::register::{Definition, Register, RegisterType};

use std::collections::HashMap;

/// All registers of one device instance, in map order.
#[derive(Debug)]
pub struct RegisterBank {
    registers: Vec<Register>,
    index: HashMap<&'static str, usize>,
}

impl RegisterBank {
    pub fn new(definitions: &[Definition]) -> Result<Self> {
        let mut index = HashMap::with_capacity(definitions.len());
        let mut registers = Vec::with_capacity(definitions.len());
        for (idx, definition) in definitions.iter().enumerate() {
            if index.insert(definition.name, idx).is_some() {
                return Err(Error::Model(format!(
                    "register name {} is defined twice",
                    definition.name
                )));
            }
            if registers
                .iter()
                .any(|r: &Register| r.kind() == definition.kind && r.address() == definition.address)
            {
                return Err(Error::Model(format!(
                    "{} {} shares its address {} with another register",
                    definition.kind, definition.name, definition.address
                )));
            }
            registers.push(Register::new(definition));
        }
        Ok(Self { registers, index })
    }

    pub fn get(&self, name: &str) -> Option<&Register> {
        self.index.get(name).map(|idx| &self.registers[*idx])
    }

    pub fn require(&self, name: &str) -> Result<&Register> {
        self.get(name)
            .ok_or_else(|| Error::UnknownRegister(name.to_owned()))
    }

    pub fn of_kind(&self, kind: RegisterType) -> impl Iterator<Item = &Register> {
        self.registers.iter().filter(move |r| r.kind() == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Register> {
        self.registers.iter()
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Drop every pending write.
    pub fn discard_all(&self) {
        self.registers.iter().for_each(Register::discard);
    }
}
