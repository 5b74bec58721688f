#![allow(
    clippy::missing_errors_doc // error enums carry the failure descriptions
)]

pub mod error;
pub mod options;
pub mod spec_const;
pub mod spirv;
pub mod translator;

/// Test harness module for writing unit and integration tests.
///
/// This module is only available when running tests or when the
/// `test-harness` feature is enabled.
#[cfg(any(test, feature = "test-harness"))]
pub mod test_harness;

pub use error::{Error, Result};
pub use options::{Extension, ExtensionStatus, SpirvVersion, TranslatorOptions, parse_extensions};
pub use spec_const::{
    SpecConstDescriptor, SpecConstError, SpecConstOverrides, SpecConstTable, parse_spec_consts,
};
pub use spirv::SpirvModule;
pub use translator::{Conversion, NativeTranslator, Translator};
