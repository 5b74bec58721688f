use crate::options::ExtensionError;
use crate::spec_const::SpecConstError;
use crate::spirv::{DecodeError, TextError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SPIR-V decoding error: {0}")]
    Decode(#[from] DecodeError),

    #[error("SPIR-V text error: {0}")]
    Text(#[from] TextError),

    #[error("SPIR-V text is not valid UTF-8")]
    NonUtf8Text(#[from] std::str::Utf8Error),

    #[error(transparent)]
    SpecConst(#[from] SpecConstError),

    #[error(transparent)]
    Extension(#[from] ExtensionError),

    #[error("{0} requires an LLVM translation backend, none is linked into this build")]
    BackendUnavailable(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
