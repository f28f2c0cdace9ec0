use crate::model::{CommitGroup, Model, ReadBlock};
use crate::register::{CodeTable, Definition, RegisterType};

use RegisterType::{Coil, DiscreteInput, HoldingRegister, InputRegister};

const REGISTERS: [Definition; 28] = [
    Definition::new("Alarm", DiscreteInput, 0),
    Definition::new("Initial_JP", DiscreteInput, 1),
    Definition::new("Press_rel", DiscreteInput, 2),
    Definition::new("Motor_Termo", DiscreteInput, 3),
    Definition::new("Fire_Alarm", DiscreteInput, 4),
    Definition::new("Contact_Hatch", DiscreteInput, 5),
    Definition::new("Fan_start", DiscreteInput, 6),
    Definition::new("ZAS_state", DiscreteInput, 7),
    Definition::new("ZAS", Coil, 0),
    Definition::new("FAN_START", Coil, 1),
    Definition::new("Reset", Coil, 31),
    Definition::new("INTERN_TEMPER", InputRegister, 0),
    Definition::new("Alarm_code", InputRegister, 2),
    Definition::new("INT_REGUL", InputRegister, 3),
    Definition::new("EXT_REGUL", InputRegister, 6),
    Definition::new("MODE_CODE", InputRegister, 7),
    Definition::new("Power_W", InputRegister, 8),
    Definition::new("Fan_current", InputRegister, 9),
    Definition::new("DAC_LEVEL", HoldingRegister, 0),
    Definition::new("SL_ADDR", HoldingRegister, 10),
    Definition::new("RS485_BAUD", HoldingRegister, 11),
    Definition::new("MODE_CODE_H", HoldingRegister, 12),
    Definition::new("DEFAULT_POWER", HoldingRegister, 13),
    Definition::new("MAX_CURRENT", HoldingRegister, 14),
    Definition::new("Hatch_Timeout", HoldingRegister, 15),
    Definition::new("OVERLOAD_TIME", HoldingRegister, 16),
    Definition::new("MIN_CURRENT", HoldingRegister, 17),
    Definition::new("Press_timeout", HoldingRegister, 18),
];

const READS: [ReadBlock; 4] = [
    ReadBlock::new(DiscreteInput, 0, 8),
    ReadBlock::new(Coil, 0, 32),
    ReadBlock::new(InputRegister, 0, 10),
    ReadBlock::new(HoldingRegister, 0, 19),
];

const COIL_COMMITS: [CommitGroup; 2] = [
    CommitGroup::new(Coil, 0, &["ZAS", "FAN_START"]),
    CommitGroup::new(Coil, 31, &["Reset"]),
];

const HOLDING_COMMITS: [CommitGroup; 2] = [
    CommitGroup::new(HoldingRegister, 0, &["DAC_LEVEL"]),
    CommitGroup::new(
        HoldingRegister,
        10,
        &[
            "SL_ADDR",
            "RS485_BAUD",
            "MODE_CODE_H",
            "DEFAULT_POWER",
            "MAX_CURRENT",
            "Hatch_Timeout",
            "OVERLOAD_TIME",
            "MIN_CURRENT",
            "Press_timeout",
        ],
    ),
];

/// Sunline auto-transformer controller, unit 1.
pub static AUTO_TRANSFORMER: Model = Model {
    name: "AutoTransformer",
    unit: 1,
    codes: CodeTable::STANDARD,
    registers: &REGISTERS,
    reads: &READS,
    coil_commits: &COIL_COMMITS,
    holding_commits: &HOLDING_COMMITS,
};
