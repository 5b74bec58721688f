//! SPIR-V module reading and writing, on top of `rspirv`'s data
//! representation.
//!
//! `rspirv` only loads little-endian word streams, so byte order is settled
//! here from the magic number before the words are handed over.

mod spec_info;
mod text;

use rspirv::binary::{Assemble, ParseState};
use rspirv::dr;
use rspirv::spirv::MAGIC_NUMBER;

pub use spec_info::spec_const_info;
pub use text::TextError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("module is {len} bytes, too short to hold a magic number")]
    TooShort { len: usize },

    #[error("module length {len} is not a multiple of 4 bytes")]
    Misaligned { len: usize },

    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),

    #[error("malformed module: {0}")]
    Parse(String),
}

// `ParseState` can carry a non-`Sync` consumer error, so only its message is
// kept.
impl From<ParseState> for DecodeError {
    fn from(state: ParseState) -> Self {
        Self::Parse(state.to_string())
    }
}

/// A loaded SPIR-V module.
#[derive(Debug)]
pub struct SpirvModule {
    module: dr::Module,
}

impl From<dr::Module> for SpirvModule {
    fn from(module: dr::Module) -> Self {
        Self { module }
    }
}

impl SpirvModule {
    /// Decode a binary module. Byte order is taken from the magic number.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() % 4 != 0 {
            return Err(DecodeError::Misaligned { len: bytes.len() });
        }
        let Some(first) = bytes.first_chunk::<4>() else {
            return Err(DecodeError::TooShort { len: bytes.len() });
        };

        let little = u32::from_le_bytes(*first);
        let big_endian = if little == MAGIC_NUMBER {
            false
        } else if little.swap_bytes() == MAGIC_NUMBER {
            true
        } else {
            return Err(DecodeError::BadMagic(little));
        };

        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| {
                let word = [c[0], c[1], c[2], c[3]];
                if big_endian {
                    u32::from_be_bytes(word)
                } else {
                    u32::from_le_bytes(word)
                }
            })
            .collect();

        let module = Self::from_words(&words)?;
        tracing::debug!(
            version = ?module.version(),
            bound = ?module.bound(),
            instructions = module.instructions().count(),
            big_endian,
            "decoded SPIR-V module"
        );
        Ok(module)
    }

    /// Load from host-order words. The first word must be the magic number.
    pub fn from_words(words: &[u32]) -> Result<Self, DecodeError> {
        match words.first() {
            None => return Err(DecodeError::TooShort { len: 0 }),
            Some(&magic) if magic != MAGIC_NUMBER => return Err(DecodeError::BadMagic(magic)),
            Some(_) => {}
        }
        let module = dr::load_words(words)?;
        Ok(Self { module })
    }

    #[must_use]
    pub fn module(&self) -> &dr::Module {
        &self.module
    }

    /// `(major, minor)` from the header.
    #[must_use]
    pub fn version(&self) -> Option<(u8, u8)> {
        self.module.header.as_ref().map(dr::ModuleHeader::version)
    }

    #[must_use]
    pub fn bound(&self) -> Option<u32> {
        self.module.header.as_ref().map(|header| header.bound)
    }

    /// Every instruction in logical layout order.
    pub fn instructions(&self) -> impl Iterator<Item = &dr::Instruction> {
        self.module.all_inst_iter()
    }

    /// Host-order word stream, header first.
    #[must_use]
    pub fn words(&self) -> Vec<u32> {
        self.module.assemble()
    }

    /// Encode as a little-endian binary module.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        self.words()
            .into_iter()
            .flat_map(u32::to_le_bytes)
            .collect()
    }
}
