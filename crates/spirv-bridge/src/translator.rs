use crate::options::TranslatorOptions;
use crate::spec_const::SpecConstDescriptor;
use crate::spirv::{SpirvModule, spec_const_info};
use crate::{Error, Result};

/// Direction of a SPIR-V binary/text conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    ToText,
    ToBinary,
}

/// Entry points of the LLVM/SPIR-V translation library.
///
/// Inputs and outputs are serialized modules: LLVM bitcode on the LLVM side,
/// SPIR-V binary (or text, when [`TranslatorOptions::text_format`] is set)
/// on the SPIR-V side.
pub trait Translator {
    /// LLVM bitcode to SPIR-V.
    fn write_spirv(&self, bitcode: &[u8], options: &TranslatorOptions) -> Result<Vec<u8>>;

    /// SPIR-V to LLVM bitcode, applying the options' spec constant overrides.
    fn read_spirv(&self, spirv: &[u8], options: &TranslatorOptions) -> Result<Vec<u8>>;

    /// Rewrite LLVM bitcode so that it is representable in SPIR-V.
    fn regularize(&self, bitcode: &[u8]) -> Result<Vec<u8>>;

    /// Convert between the binary and textual SPIR-V forms.
    fn convert_spirv(&self, input: &[u8], conversion: Conversion) -> Result<Vec<u8>>;

    /// Specialization constants declared by a SPIR-V binary.
    fn spec_const_info(&self, spirv: &[u8]) -> Result<Vec<SpecConstDescriptor>>;
}

/// The SPIR-V-only part of the translator, implemented in this crate.
///
/// LLVM-side operations report [`Error::BackendUnavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeTranslator;

impl Translator for NativeTranslator {
    fn write_spirv(&self, _bitcode: &[u8], _options: &TranslatorOptions) -> Result<Vec<u8>> {
        Err(Error::BackendUnavailable("LLVM to SPIR-V translation"))
    }

    fn read_spirv(&self, spirv: &[u8], _options: &TranslatorOptions) -> Result<Vec<u8>> {
        // Reject malformed input before reporting the missing backend.
        SpirvModule::decode(spirv)?;
        Err(Error::BackendUnavailable("SPIR-V to LLVM translation"))
    }

    fn regularize(&self, _bitcode: &[u8]) -> Result<Vec<u8>> {
        Err(Error::BackendUnavailable("LLVM regularization"))
    }

    fn convert_spirv(&self, input: &[u8], conversion: Conversion) -> Result<Vec<u8>> {
        match conversion {
            Conversion::ToText => {
                let module = SpirvModule::decode(input)?;
                Ok(module.to_text().into_bytes())
            }
            Conversion::ToBinary => {
                let text = std::str::from_utf8(input)?;
                let module = SpirvModule::from_text(text)?;
                Ok(module.encode())
            }
        }
    }

    fn spec_const_info(&self, spirv: &[u8]) -> Result<Vec<SpecConstDescriptor>> {
        let module = SpirvModule::decode(spirv)?;
        let descriptors = spec_const_info(&module);
        tracing::debug!(count = descriptors.len(), "extracted specialization constants");
        Ok(descriptors)
    }
}
