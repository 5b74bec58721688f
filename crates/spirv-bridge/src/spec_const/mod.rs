//! Specialization-constant overrides given on the command line.
//!
//! An override string is a space separated list of `id:type:value` entries,
//! for example `"0:i32:42 1:f64:3.5"`. Each entry is checked against the
//! table of specialization constants the module declares and turned into the
//! 64-bit pattern the translator stores for that constant.

pub mod float;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use float::{FloatFormat, convert_decimal};

/// Value syntax of the `--spec-const` option.
pub const SPEC_CONST_GRAMMAR: &str = "id1:type1:value1 id2:type2:value2 ...";

const ALLOWED_TYPES: &str = "i1, i8, i16, i32, i64, f16, f32, f64";

/// A specialization constant declared by a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecConstDescriptor {
    pub id: u32,
    pub size_bytes: usize,
}

/// Sizes of a module's specialization constants, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecConstTable {
    sizes: HashMap<u32, usize>,
}

impl SpecConstTable {
    /// Build the table from descriptors in module order. If an id repeats,
    /// the first descriptor is kept.
    pub fn new(descriptors: impl IntoIterator<Item = SpecConstDescriptor>) -> Self {
        let mut sizes = HashMap::new();
        for SpecConstDescriptor { id, size_bytes } in descriptors {
            if let Some(&kept) = sizes.get(&id) {
                tracing::warn!(
                    id,
                    kept,
                    ignored = size_bytes,
                    "duplicate specialization constant id in module"
                );
                continue;
            }
            sizes.insert(id, size_bytes);
        }
        Self { sizes }
    }

    #[must_use]
    pub fn size_of(&self, id: u32) -> Option<usize> {
        self.sizes.get(&id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

impl FromIterator<SpecConstDescriptor> for SpecConstTable {
    fn from_iter<I: IntoIterator<Item = SpecConstDescriptor>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Resolved overrides: spec constant id to zero-extended bit pattern.
pub type SpecConstOverrides = BTreeMap<u32, u64>;

/// A single validated override entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOverride {
    pub id: u32,
    pub bits: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Integer,
    Float,
}

impl fmt::Display for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("floating point"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecConstError {
    #[error(
        "invalid format of --spec-const option: \"{entry}\". Expected format: --spec-const \"<{grammar}>\"",
        grammar = SPEC_CONST_GRAMMAR
    )]
    MalformedEntry { entry: String },

    #[error(
        "invalid id for --spec-const option! In \"{entry}\": \"{id}\" must be a 32-bit unsigned integer"
    )]
    InvalidId { entry: String, id: String },

    #[error(
        "CL_INVALID_SPEC_ID. \"{entry}\": there is no specialization constant with id = {id} in the SPIR-V module"
    )]
    UnknownSpecId { entry: String, id: u32 },

    #[error(
        "invalid type for --spec-const option! In \"{entry}\": \"{ty}\" - is not allowed type. Allowed types are: {allowed}",
        allowed = ALLOWED_TYPES
    )]
    UnsupportedType { entry: String, ty: String },

    #[error(
        "CL_INVALID_VALUE. In \"{entry}\": size of type i{width} ({size} bytes) does not match the size of the specialization constant in the module ({expected} bytes)"
    )]
    SizeMismatch {
        entry: String,
        width: u32,
        size: usize,
        expected: usize,
    },

    #[error(
        "invalid value for --spec-const option! In \"{entry}\": \"{value}\" does not fit in a {width}-bit integer number"
    )]
    ValueRange {
        entry: String,
        value: String,
        width: u32,
    },

    #[error(
        "invalid value for --spec-const option! In \"{entry}\": can't convert \"{value}\" to {width}-bit {kind} number"
    )]
    ValueConversion {
        entry: String,
        value: String,
        width: u32,
        kind: NumberKind,
    },
}

/// Parse a full override string against `table`.
///
/// Entries are processed left to right and the first invalid one aborts the
/// whole request. When an id is given more than once the last value wins.
pub fn parse_spec_consts(
    text: &str,
    table: &SpecConstTable,
) -> Result<SpecConstOverrides, SpecConstError> {
    let mut overrides = SpecConstOverrides::new();
    for entry in text.split(' ').filter(|e| !e.is_empty()) {
        let ResolvedOverride { id, bits } = parse_entry(entry, table)?;
        if let Some(previous) = overrides.insert(id, bits) {
            tracing::warn!(
                id,
                previous,
                bits,
                "specialization constant given more than once, using the later value"
            );
        }
    }
    tracing::debug!(count = overrides.len(), "parsed specialization constant overrides");
    Ok(overrides)
}

/// Parse and validate one `id:type:value` entry.
pub fn parse_entry(entry: &str, table: &SpecConstTable) -> Result<ResolvedOverride, SpecConstError> {
    let mut fields = entry.splitn(3, ':');
    let (Some(id_text), Some(ty), Some(value)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(SpecConstError::MalformedEntry {
            entry: entry.to_string(),
        });
    };

    let id: u32 = parse_unsigned(id_text).ok_or_else(|| SpecConstError::InvalidId {
        entry: entry.to_string(),
        id: id_text.to_string(),
    })?;

    let expected = table
        .size_of(id)
        .ok_or_else(|| SpecConstError::UnknownSpecId {
            entry: entry.to_string(),
            id,
        })?;

    let unsupported = || SpecConstError::UnsupportedType {
        entry: entry.to_string(),
        ty: ty.to_string(),
    };

    let bits = if let Some(width) = ty.strip_prefix('i') {
        let width = parse_unsigned::<u32>(width)
            .filter(|w| matches!(*w, 1 | 8 | 16 | 32 | 64))
            .ok_or_else(unsupported)?;
        integer_bits(entry, width, value, expected)?
    } else if let Some(width) = ty.strip_prefix('f') {
        let format = parse_unsigned::<u32>(width)
            .and_then(FloatFormat::from_width)
            .ok_or_else(unsupported)?;
        float_bits(entry, format, value)?
    } else {
        return Err(unsupported());
    };

    Ok(ResolvedOverride { id, bits })
}

fn integer_bits(entry: &str, width: u32, value: &str, expected: usize) -> Result<u64, SpecConstError> {
    let size = if width < 8 { 1 } else { (width / 8) as usize };
    if size != expected {
        return Err(SpecConstError::SizeMismatch {
            entry: entry.to_string(),
            width,
            size,
            expected,
        });
    }

    if !is_decimal_digits(value) {
        return Err(SpecConstError::ValueConversion {
            entry: entry.to_string(),
            value: value.to_string(),
            width,
            kind: NumberKind::Integer,
        });
    }

    let out_of_range = || SpecConstError::ValueRange {
        entry: entry.to_string(),
        value: value.to_string(),
        width,
    };
    // Digits only at this point, so a parse failure can only be overflow.
    let bits: u64 = value.parse().map_err(|_| out_of_range())?;
    if width < 64 && bits >> width != 0 {
        return Err(out_of_range());
    }
    Ok(bits)
}

fn float_bits(entry: &str, format: FloatFormat, value: &str) -> Result<u64, SpecConstError> {
    let conversion_error = || SpecConstError::ValueConversion {
        entry: entry.to_string(),
        value: value.to_string(),
        width: format.width(),
        kind: NumberKind::Float,
    };

    let converted = convert_decimal(value, format).map_err(|_| conversion_error())?;
    if !converted.status.is_acceptable() {
        tracing::debug!(status = ?converted.status, entry, "rejected floating point override");
        return Err(conversion_error());
    }
    if converted.status.inexact {
        tracing::debug!(entry, bits = converted.bits, "floating point override rounded");
    }
    Ok(converted.bits)
}

fn is_decimal_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Base-10 unsigned number made of ASCII digits only (no sign, no spaces).
fn parse_unsigned<T: std::str::FromStr>(text: &str) -> Option<T> {
    if is_decimal_digits(text) {
        text.parse().ok()
    } else {
        None
    }
}
