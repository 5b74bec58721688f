use std::path::{Path, PathBuf};

use spirv_bridge::Conversion;

/// What a single invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// LLVM bitcode to SPIR-V.
    Forward,
    /// SPIR-V to LLVM bitcode.
    Reverse,
    /// LLVM bitcode to SPIR-V-representable LLVM bitcode.
    Regularize,
    /// SPIR-V binary to text or back.
    Convert(Conversion),
    /// Print the module's specialization constants.
    SpecConstInfo,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModeFlags {
    pub reverse: bool,
    pub regularize: bool,
    pub to_text: bool,
    pub to_binary: bool,
    pub spec_const_info: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
    #[error("Cannot use --to-text with --to-binary, -r, -s")]
    ToTextConflict,
    #[error("Cannot use --to-binary with --to-text, -r, -s")]
    ToBinaryConflict,
    #[error("Cannot have both -r and -s options")]
    ReverseAndRegularize,
}

impl Mode {
    pub fn select(flags: ModeFlags) -> Result<Self, ModeError> {
        let ModeFlags {
            reverse,
            regularize,
            to_text,
            to_binary,
            spec_const_info,
        } = flags;

        if to_text && (to_binary || reverse || regularize) {
            return Err(ModeError::ToTextConflict);
        }
        if to_binary && (to_text || reverse || regularize) {
            return Err(ModeError::ToBinaryConflict);
        }
        if to_text {
            return Ok(Self::Convert(Conversion::ToText));
        }
        if to_binary {
            return Ok(Self::Convert(Conversion::ToBinary));
        }

        match (reverse, regularize) {
            (true, true) => Err(ModeError::ReverseAndRegularize),
            (true, false) => Ok(Self::Reverse),
            (false, true) => Ok(Self::Regularize),
            (false, false) if spec_const_info => Ok(Self::SpecConstInfo),
            (false, false) => Ok(Self::Forward),
        }
    }

    /// Extension given to the output when no `-o` is passed.
    fn output_extension(self, spirv_text: bool) -> Option<&'static str> {
        match self {
            Self::Forward if spirv_text => Some("spt"),
            Self::Forward | Self::Convert(Conversion::ToBinary) => Some("spv"),
            Self::Convert(Conversion::ToText) => Some("spt"),
            Self::Reverse => Some("bc"),
            Self::Regularize => Some("regularized.bc"),
            Self::SpecConstInfo => None,
        }
    }
}

pub fn is_stdio(path: &Path) -> bool {
    path == Path::new("-")
}

/// Output path derived from the input: stdout for stdin, otherwise the input
/// with its extension replaced. `None` for modes that write no module.
pub fn default_output(input: &Path, mode: Mode, spirv_text: bool) -> Option<PathBuf> {
    let extension = mode.output_extension(spirv_text)?;
    if is_stdio(input) {
        return Some(PathBuf::from("-"));
    }
    Some(input.with_extension(extension))
}
