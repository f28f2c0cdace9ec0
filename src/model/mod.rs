mod auto_transformer;

pub use auto_transformer::AUTO_TRANSFORMER;

use crate::error::{Error, Result};
use crate::register::{Address, CodeTable, Definition, RegisterBank, RegisterType};

use itertools::Itertools;
use tokio_modbus::SlaveId;

/// One block read per poll cycle, covering `[start, start + count)`.
#[derive(Debug, Clone, Copy)]
pub struct ReadBlock {
    pub kind: RegisterType,
    pub start: Address,
    pub count: u16,
}

impl ReadBlock {
    pub const fn new(kind: RegisterType, start: Address, count: u16) -> Self {
        Self { kind, start, count }
    }

    pub fn contains(&self, address: Address) -> bool {
        address >= self.start && (address - self.start) < self.count
    }
}

/// Registers that are always written together, starting at `address` with
/// one register per consecutive address.
#[derive(Debug, Clone, Copy)]
pub struct CommitGroup {
    pub kind: RegisterType,
    pub address: Address,
    pub members: &'static [&'static str],
}

impl CommitGroup {
    pub const fn new(
        kind: RegisterType,
        address: Address,
        members: &'static [&'static str],
    ) -> Self {
        Self {
            kind,
            address,
            members,
        }
    }
}

/// Static description of one controller model.
///
/// Commit groups are listed in priority order. Per commit cycle at most one
/// coil group is written, and holding groups are only considered if no coil
/// group was written.
#[derive(Debug)]
pub struct Model {
    pub name: &'static str,
    pub unit: SlaveId,
    pub codes: CodeTable,
    pub registers: &'static [Definition],
    pub reads: &'static [ReadBlock],
    pub coil_commits: &'static [CommitGroup],
    pub holding_commits: &'static [CommitGroup],
}

impl Model {
    /// Build the register bank of a new device instance.
    pub fn bank(&self) -> Result<RegisterBank> {
        let bank = RegisterBank::new(self.registers)?;
        self.validate(&bank)?;
        Ok(bank)
    }

    fn validate(&self, bank: &RegisterBank) -> Result<()> {
        let duplicates: Vec<_> = self.reads.iter().map(|b| b.kind).duplicates().collect();
        if !duplicates.is_empty() {
            return Err(Error::Model(format!(
                "{}: more than one read block for {:?}",
                self.name, duplicates
            )));
        }

        for register in bank.iter() {
            let covered = self
                .reads
                .iter()
                .any(|b| b.kind == register.kind() && b.contains(register.address()));
            if !covered {
                return Err(Error::Model(format!(
                    "{}: {} {} at {} is not covered by any read block",
                    self.name,
                    register.kind(),
                    register.name(),
                    register.address()
                )));
            }
        }

        let groups = self
            .coil_commits
            .iter()
            .map(|g| (RegisterType::Coil, g))
            .chain(
                self.holding_commits
                    .iter()
                    .map(|g| (RegisterType::HoldingRegister, g)),
            );
        for (kind, group) in groups {
            if group.kind != kind || group.members.is_empty() {
                return Err(Error::Model(format!(
                    "{}: invalid {} commit group at {}",
                    self.name, kind, group.address
                )));
            }
            for (offset, name) in group.members.iter().enumerate() {
                let register = bank.require(name)?;
                let expected = usize::from(group.address) + offset;
                if register.kind() != kind || usize::from(register.address()) != expected {
                    return Err(Error::Model(format!(
                        "{}: {} is not the {} at {} of its commit group",
                        self.name, name, kind, expected
                    )));
                }
            }
        }
        Ok(())
    }
}
