//! Test harness for spirv-bridge unit and integration tests
//!
//! This module provides utilities for building small SPIR-V modules that
//! declare specialization constants, and for turning them into descriptor
//! tables.
//!
//! # Example
//!
//! ```rust
//! use spirv_bridge::test_harness::*;
//! use spirv_bridge::parse_spec_consts;
//!
//! let module = ModuleBuilder::new()
//!     .spec_int(0, 32, 1)
//!     .spec_float(1, 64, 0)
//!     .encode();
//!
//! let table = table_from_binary(&module);
//! let overrides = parse_spec_consts("0:i32:42 1:f64:3.5", &table).expect("valid overrides");
//! assert_eq!(overrides[&0], 42);
//! ```

#![allow(clippy::must_use_candidate, clippy::missing_panics_doc)]

use rspirv::dr::{Instruction, Module, ModuleHeader, Operand};
use rspirv::spirv::{AddressingModel, Capability, Decoration, MemoryModel, Op, Word};

use crate::options::SpirvVersion;
use crate::spec_const::{SpecConstDescriptor, SpecConstTable};
use crate::spirv::{SpirvModule, spec_const_info};

pub use crate::spec_const::float::half_to_f64;

/// Builds a kernel module holding only scalar specialization constants.
///
/// Types are deduplicated; every constant gets a fresh result id.
#[derive(Debug)]
pub struct ModuleBuilder {
    version: SpirvVersion,
    next_id: Word,
    module: Module,
    /// (opcode, width) -> result id
    type_ids: Vec<((Op, u32), Word)>,
}

impl Default for ModuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleBuilder {
    pub fn new() -> Self {
        let mut module = Module::new();
        for capability in [Capability::Addresses, Capability::Kernel, Capability::Int64] {
            module.capabilities.push(Instruction::new(
                Op::Capability,
                None,
                None,
                vec![Operand::Capability(capability)],
            ));
        }
        module.memory_model = Some(Instruction::new(
            Op::MemoryModel,
            None,
            None,
            vec![
                Operand::AddressingModel(AddressingModel::Physical64),
                Operand::MemoryModel(MemoryModel::OpenCL),
            ],
        ));

        Self {
            version: SpirvVersion::V1_0,
            next_id: 1,
            module,
            type_ids: Vec::new(),
        }
    }

    /// Header version of the built module.
    #[must_use]
    pub fn with_version(mut self, version: SpirvVersion) -> Self {
        self.version = version;
        self
    }

    fn fresh_id(&mut self) -> Word {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn type_id(&mut self, opcode: Op, width: u32) -> Word {
        if let Some(&(_, id)) = self.type_ids.iter().find(|(key, _)| *key == (opcode, width)) {
            return id;
        }
        let id = self.fresh_id();
        let operands = match opcode {
            Op::TypeBool => vec![],
            // Signedness 0: kernels use unsigned integer types.
            Op::TypeInt => vec![Operand::LiteralBit32(width), Operand::LiteralBit32(0)],
            _ => vec![Operand::LiteralBit32(width)],
        };
        self.module
            .types_global_values
            .push(Instruction::new(opcode, None, Some(id), operands));
        self.type_ids.push(((opcode, width), id));
        id
    }

    fn push_constant(&mut self, spec_id: Option<u32>, opcode: Op, result_type: Word, literal: Option<Operand>) {
        let result = self.fresh_id();
        if let Some(spec_id) = spec_id {
            self.module.annotations.push(Instruction::new(
                Op::Decorate,
                None,
                None,
                vec![
                    Operand::IdRef(result),
                    Operand::Decoration(Decoration::SpecId),
                    Operand::LiteralBit32(spec_id),
                ],
            ));
        }
        self.module.types_global_values.push(Instruction::new(
            opcode,
            Some(result_type),
            Some(result),
            literal.into_iter().collect(),
        ));
    }

    #[must_use]
    pub fn spec_bool(mut self, spec_id: u32, value: bool) -> Self {
        let ty = self.type_id(Op::TypeBool, 1);
        let opcode = if value {
            Op::SpecConstantTrue
        } else {
            Op::SpecConstantFalse
        };
        self.push_constant(Some(spec_id), opcode, ty, None);
        self
    }

    #[must_use]
    pub fn spec_int(mut self, spec_id: u32, width: u32, value: u64) -> Self {
        let ty = self.type_id(Op::TypeInt, width);
        self.push_constant(Some(spec_id), Op::SpecConstant, ty, Some(literal(width, value)));
        self
    }

    /// `bits` is the IEEE bit pattern of the default value.
    #[must_use]
    pub fn spec_float(mut self, spec_id: u32, width: u32, bits: u64) -> Self {
        let ty = self.type_id(Op::TypeFloat, width);
        self.push_constant(Some(spec_id), Op::SpecConstant, ty, Some(literal(width, bits)));
        self
    }

    /// An `OpSpecConstant` without a `SpecId` decoration.
    #[must_use]
    pub fn undecorated_spec_int(mut self, width: u32, value: u64) -> Self {
        let ty = self.type_id(Op::TypeInt, width);
        self.push_constant(None, Op::SpecConstant, ty, Some(literal(width, value)));
        self
    }

    pub fn build(self) -> SpirvModule {
        let Self {
            version,
            next_id,
            mut module,
            ..
        } = self;
        let mut header = ModuleHeader::new(next_id);
        let (major, minor) = version.major_minor();
        header.set_version(major, minor);
        module.header = Some(header);
        SpirvModule::from(module)
    }

    /// Binary encoding of [`ModuleBuilder::build`].
    pub fn encode(self) -> Vec<u8> {
        self.build().encode()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn literal(width: u32, value: u64) -> Operand {
    if width > 32 {
        Operand::LiteralBit64(value)
    } else {
        Operand::LiteralBit32(value as u32)
    }
}

/// Descriptor table from `(id, size_bytes)` pairs.
pub fn table(entries: &[(u32, usize)]) -> SpecConstTable {
    entries
        .iter()
        .map(|&(id, size_bytes)| SpecConstDescriptor { id, size_bytes })
        .collect()
}

/// Decode a binary module and build its descriptor table.
pub fn table_from_binary(bytes: &[u8]) -> SpecConstTable {
    let module = SpirvModule::decode(bytes).expect("test module should decode");
    spec_const_info(&module).into_iter().collect()
}

/// Count instructions with the given opcode.
pub fn count_opcode(module: &SpirvModule, opcode: Op) -> usize {
    module
        .instructions()
        .filter(|inst| inst.class.opcode == opcode)
        .count()
}
