use std::collections::HashMap;

use rspirv::dr::Operand;
use rspirv::spirv::{Decoration, Op};

use super::SpirvModule;
use crate::spec_const::SpecConstDescriptor;

/// List the scalar specialization constants a module declares, in
/// declaration order, with their size in bytes.
///
/// A constant is listed only when it carries a `SpecId` decoration. Booleans
/// count as one byte; integer and float sizes are their bit width rounded up
/// to whole bytes.
#[must_use]
pub fn spec_const_info(module: &SpirvModule) -> Vec<SpecConstDescriptor> {
    let module = module.module();

    let spec_ids: HashMap<u32, u32> = module
        .annotations
        .iter()
        .filter(|inst| inst.class.opcode == Op::Decorate)
        .filter_map(|inst| match inst.operands[..] {
            [
                Operand::IdRef(target),
                Operand::Decoration(Decoration::SpecId),
                Operand::LiteralBit32(spec_id),
                ..,
            ] => Some((target, spec_id)),
            _ => None,
        })
        .collect();

    // Types are declared before the constants that use them.
    let mut type_sizes: HashMap<u32, usize> = HashMap::new();
    let mut descriptors = Vec::new();
    for inst in &module.types_global_values {
        let Some(result) = inst.result_id else {
            continue;
        };
        match inst.class.opcode {
            Op::TypeBool => {
                type_sizes.insert(result, 1);
            }
            Op::TypeInt | Op::TypeFloat => {
                if let Some(&Operand::LiteralBit32(width)) = inst.operands.first() {
                    type_sizes.insert(result, (width as usize).div_ceil(8).max(1));
                }
            }
            Op::SpecConstantTrue | Op::SpecConstantFalse | Op::SpecConstant => {
                let Some(&id) = spec_ids.get(&result) else {
                    continue;
                };
                match inst.result_type.and_then(|ty| type_sizes.get(&ty)) {
                    Some(&size_bytes) => descriptors.push(SpecConstDescriptor { id, size_bytes }),
                    None => tracing::warn!(
                        result,
                        result_type = ?inst.result_type,
                        "specialization constant has a non-scalar or undeclared type, skipping"
                    ),
                }
            }
            _ => {}
        }
    }
    descriptors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_harness::ModuleBuilder;

    #[test]
    fn test_declaration_order_and_sizes() {
        let module = ModuleBuilder::new()
            .spec_int(3, 32, 7)
            .spec_bool(0, true)
            .spec_float(9, 64, 2.5f64.to_bits())
            .spec_int(1, 8, 1)
            .spec_float(2, 16, 0x3c00)
            .build();

        assert_eq!(
            spec_const_info(&module),
            vec![
                SpecConstDescriptor { id: 3, size_bytes: 4 },
                SpecConstDescriptor { id: 0, size_bytes: 1 },
                SpecConstDescriptor { id: 9, size_bytes: 8 },
                SpecConstDescriptor { id: 1, size_bytes: 1 },
                SpecConstDescriptor { id: 2, size_bytes: 2 },
            ]
        );
    }

    #[test]
    fn test_undecorated_constants_are_skipped() {
        let module = ModuleBuilder::new()
            .spec_int(5, 32, 1)
            .undecorated_spec_int(32, 4)
            .build();
        assert_eq!(
            spec_const_info(&module),
            vec![SpecConstDescriptor { id: 5, size_bytes: 4 }]
        );
    }

    #[test]
    fn test_empty_module() {
        assert!(spec_const_info(&ModuleBuilder::new().build()).is_empty());
    }
}
