use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::spec_const::SpecConstOverrides;

/// Highest SPIR-V version the translator may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum SpirvVersion {
    V1_0,
    #[default]
    V1_1,
}

impl SpirvVersion {
    pub const MAXIMUM: Self = Self::V1_1;

    /// `(major, minor)` as written into a module header.
    #[must_use]
    pub fn major_minor(self) -> (u8, u8) {
        match self {
            Self::V1_0 => (1, 0),
            Self::V1_1 => (1, 1),
        }
    }
}

impl fmt::Display for SpirvVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1_0 => f.write_str("1.0"),
            Self::V1_1 => f.write_str("1.1"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported SPIR-V version '{0}', expected 1.0 or 1.1")]
pub struct UnknownVersion(pub String);

impl FromStr for SpirvVersion {
    type Err = UnknownVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1.0" => Ok(Self::V1_0),
            "1.1" => Ok(Self::V1_1),
            _ => Err(UnknownVersion(s.to_string())),
        }
    }
}

macro_rules! extensions {
    ($($name:ident),* $(,)?) => {
        /// SPIR-V extensions the translator knows about.
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Extension {
            $($name,)*
        }

        impl Extension {
            pub const ALL: &'static [Extension] = &[$(Extension::$name,)*];

            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(Extension::$name => stringify!($name),)*
                }
            }

            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($name) => Some(Extension::$name),)*
                    _ => None,
                }
            }
        }
    };
}

extensions! {
    SPV_KHR_no_integer_wrap_decoration,
    SPV_KHR_float_controls,
    SPV_INTEL_subgroups,
    SPV_INTEL_media_block_io,
    SPV_INTEL_device_side_avc_motion_estimation,
    SPV_INTEL_fpga_loop_controls,
    SPV_INTEL_fpga_memory_attributes,
    SPV_INTEL_fpga_reg,
    SPV_INTEL_blocking_pipes,
    SPV_INTEL_function_pointers,
    SPV_INTEL_kernel_attributes,
    SPV_INTEL_io_pipes,
    SPV_INTEL_inline_assembly,
    SPV_INTEL_optimization_hints,
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Allowed/disallowed state of every known extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionStatus {
    allowed: BTreeMap<Extension, bool>,
}

impl ExtensionStatus {
    /// Every known extension set to `allowed`.
    #[must_use]
    pub fn all(allowed: bool) -> Self {
        Self {
            allowed: Extension::ALL.iter().map(|&ext| (ext, allowed)).collect(),
        }
    }

    pub fn set(&mut self, ext: Extension, allowed: bool) {
        self.allowed.insert(ext, allowed);
    }

    pub fn set_all(&mut self, allowed: bool) {
        for state in self.allowed.values_mut() {
            *state = allowed;
        }
    }

    #[must_use]
    pub fn is_allowed(&self, ext: Extension) -> bool {
        self.allowed.get(&ext).copied().unwrap_or(false)
    }

    pub fn allowed(&self) -> impl Iterator<Item = Extension> + '_ {
        self.allowed
            .iter()
            .filter_map(|(&ext, &allowed)| allowed.then_some(ext))
    }
}

impl Default for ExtensionStatus {
    fn default() -> Self {
        Self::all(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtensionError {
    #[error(
        "invalid value '{0}' of --spirv-ext, expected format is: --spirv-ext=+EXT_NAME,-EXT_NAME"
    )]
    InvalidFormat(String),

    #[error("unknown extension '{0}' was specified via --spirv-ext option")]
    Unknown(String),
}

/// Apply `--spirv-ext` items (`+NAME`, `-NAME`, `+all`, `-all`) in order.
///
/// Known extensions start out allowed when consuming SPIR-V (`reverse`) and
/// disallowed when producing it.
pub fn parse_extensions<'a>(
    items: impl IntoIterator<Item = &'a str>,
    reverse: bool,
) -> Result<ExtensionStatus, ExtensionError> {
    let mut status = ExtensionStatus::all(reverse);

    for item in items {
        let (allowed, name) = if let Some(name) = item.strip_prefix('+') {
            (true, name)
        } else if let Some(name) = item.strip_prefix('-') {
            (false, name)
        } else {
            return Err(ExtensionError::InvalidFormat(item.to_string()));
        };

        if name.is_empty() {
            return Err(ExtensionError::InvalidFormat(item.to_string()));
        }

        if name == "all" {
            status.set_all(allowed);
        } else {
            let ext =
                Extension::from_name(name).ok_or_else(|| ExtensionError::Unknown(name.to_string()))?;
            status.set(ext, allowed);
        }
    }

    Ok(status)
}

/// Configuration handed to the translator, built once per invocation.
#[derive(Debug, Clone, Default)]
pub struct TranslatorOptions {
    max_version: SpirvVersion,
    extensions: ExtensionStatus,
    gen_kernel_arg_name_md: bool,
    text_format: bool,
    spec_consts: SpecConstOverrides,
}

impl TranslatorOptions {
    #[must_use]
    pub fn new(max_version: SpirvVersion, extensions: ExtensionStatus) -> Self {
        Self {
            max_version,
            extensions,
            ..Self::default()
        }
    }

    /// Emit OpenCL kernel argument name metadata on reverse translation.
    #[must_use]
    pub fn with_kernel_arg_name_md(mut self, enabled: bool) -> Self {
        self.gen_kernel_arg_name_md = enabled;
        self
    }

    /// Write SPIR-V in the textual form instead of binary.
    #[must_use]
    pub fn with_text_format(mut self, enabled: bool) -> Self {
        self.text_format = enabled;
        self
    }

    #[must_use]
    pub fn with_spec_consts(mut self, spec_consts: SpecConstOverrides) -> Self {
        self.spec_consts = spec_consts;
        self
    }

    #[must_use]
    pub fn max_version(&self) -> SpirvVersion {
        self.max_version
    }

    #[must_use]
    pub fn extensions(&self) -> &ExtensionStatus {
        &self.extensions
    }

    #[must_use]
    pub fn is_allowed(&self, ext: Extension) -> bool {
        self.extensions.is_allowed(ext)
    }

    #[must_use]
    pub fn gen_kernel_arg_name_md(&self) -> bool {
        self.gen_kernel_arg_name_md
    }

    #[must_use]
    pub fn text_format(&self) -> bool {
        self.text_format
    }

    #[must_use]
    pub fn spec_consts(&self) -> &SpecConstOverrides {
        &self.spec_consts
    }

    /// Override for spec constant `id`, if one was given.
    #[must_use]
    pub fn spec_const(&self, id: u32) -> Option<u64> {
        self.spec_consts.get(&id).copied()
    }
}
