//! Textual form of a SPIR-V word stream, for `--to-text` / `--to-binary`.
//!
//! ```text
//! ; SPIR-V 1.0, bound 3
//! 119734787 65536 983040 3 0
//! 131089 6 ; OpCapability Kernel
//! 262165 1 32 0 ; %1 = OpTypeInt 32 0
//! ```
//!
//! The header words come first, then one instruction per line, all in
//! decimal. Everything after a `;` is a comment; the disassembly written
//! there is for reading only and is ignored when loading.

use std::fmt::Write;

use rspirv::binary::{Assemble, Disassemble};

use super::{DecodeError, SpirvModule};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

fn write_words(out: &mut String, words: &[u32]) {
    let mut separator = "";
    for word in words {
        // Writing to a String cannot fail.
        let _ = write!(out, "{separator}{word}");
        separator = " ";
    }
}

impl SpirvModule {
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if let Some(header) = &self.module().header {
            let (major, minor) = header.version();
            let _ = writeln!(out, "; SPIR-V {major}.{minor}, bound {}", header.bound);
            write_words(&mut out, &header.assemble());
            out.push('\n');
        }
        for inst in self.instructions() {
            write_words(&mut out, &inst.assemble());
            let _ = writeln!(out, " ; {}", inst.disassemble());
        }
        out
    }

    pub fn from_text(text: &str) -> Result<Self, TextError> {
        let mut words = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let content = raw.split_once(';').map_or(raw, |(code, _)| code);
            for token in content.split_ascii_whitespace() {
                let word = token.parse::<u32>().map_err(|_| TextError::InvalidNumber {
                    line: index + 1,
                    token: token.to_string(),
                })?;
                words.push(word);
            }
        }
        Ok(SpirvModule::from_words(&words)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_harness::ModuleBuilder;
    use rspirv::spirv::MAGIC_NUMBER;

    #[test]
    fn test_to_text_layout() {
        let text = ModuleBuilder::new().spec_int(3, 32, 9).build().to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("; SPIR-V 1.0"), "{text}");
        assert!(lines[1].starts_with(&format!("{MAGIC_NUMBER} 65536 ")), "{text}");
        assert!(lines.iter().any(|l| l.ends_with("OpCapability Kernel")), "{text}");
        assert!(lines.iter().any(|l| l.contains("OpDecorate") && l.contains("SpecId 3")), "{text}");
    }

    #[test]
    fn test_text_round_trip() {
        let module = ModuleBuilder::new()
            .spec_float(0, 64, 1.5f64.to_bits())
            .spec_bool(1, false)
            .build();
        let reloaded = SpirvModule::from_text(&module.to_text()).unwrap();
        assert_eq!(reloaded.encode(), module.encode());
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let words = ModuleBuilder::new().build().words();
        let (header, body) = words.split_at(5);
        let mut text = String::from("; header\n");
        write_words(&mut text, header);
        text.push_str("\n\n   ; body\n");
        for word in body {
            let _ = writeln!(text, "{word} ; one word per line");
        }
        let module = SpirvModule::from_text(&text).unwrap();
        assert_eq!(module.words(), words);
    }

    #[test]
    fn test_text_errors() {
        assert_eq!(
            SpirvModule::from_text("119734787 65536\n0 x\n").unwrap_err(),
            TextError::InvalidNumber {
                line: 2,
                token: "x".to_string()
            }
        );
        assert_eq!(
            SpirvModule::from_text("1 65536 0 4 0\n").unwrap_err(),
            TextError::Decode(DecodeError::BadMagic(1))
        );
        assert!(matches!(
            SpirvModule::from_text("119734787 65536\n"),
            Err(TextError::Decode(DecodeError::Parse(_)))
        ));
        assert_eq!(
            SpirvModule::from_text("; nothing\n").unwrap_err(),
            TextError::Decode(DecodeError::TooShort { len: 0 })
        );
    }
}
