mod mode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use spirv_bridge::spec_const::SPEC_CONST_GRAMMAR;
use spirv_bridge::{
    NativeTranslator, SpecConstDescriptor, SpecConstTable, SpirvVersion, Translator,
    TranslatorOptions, parse_extensions, parse_spec_consts,
};

use mode::{Mode, ModeFlags, default_output, is_stdio};

#[derive(Parser)]
#[command(name = "spirv-bridge")]
#[command(about = "LLVM/SPIR-V translator")]
struct Cli {
    #[arg(default_value = "-", help = "Input file, or - for stdin")]
    input: PathBuf,

    #[arg(short, long, value_name = "FILENAME", help = "Override output filename")]
    output: Option<PathBuf>,

    #[arg(short = 'r', help = "Reverse translation (SPIR-V to LLVM)")]
    reverse: bool,

    #[arg(short = 's', help = "Regularize LLVM to be representable by SPIR-V")]
    regularize: bool,

    #[arg(
        long = "spirv-max-version",
        default_value_t = SpirvVersion::MAXIMUM,
        help = "Choose maximum SPIR-V version which can be emitted (1.0 or 1.1)"
    )]
    max_version: SpirvVersion,

    #[arg(
        long = "spirv-ext",
        value_delimiter = ',',
        allow_hyphen_values = true,
        value_name = "+SPV_extension1_name,-SPV_extension2_name",
        help = "Specify list of allowed/disallowed extensions"
    )]
    extensions: Vec<String>,

    #[arg(long, help = "Enable generating OpenCL kernel argument name metadata")]
    spirv_gen_kernel_arg_name_md: bool,

    #[arg(long, help = "Emit SPIR-V in the textual format")]
    spirv_text: bool,

    #[arg(long, help = "Convert input SPIR-V binary to the textual format")]
    to_text: bool,

    #[arg(long, help = "Convert input SPIR-V in the textual format to binary")]
    to_binary: bool,

    #[arg(
        long,
        value_name = SPEC_CONST_GRAMMAR,
        help = "Translate SPIR-V to LLVM with constant specialization. \
                All ids must be valid specialization constant ids for the input SPIR-V module \
                (see --spec-const-info). For duplicate ids the later one takes precedence. \
                Supported types are: i1, i8, i16, i32, i64, f16, f32, f64"
    )]
    spec_const: Option<String>,

    #[arg(
        long,
        help = "Display id of constants available for specialization and their size in bytes"
    )]
    spec_const_info: bool,
}

impl Cli {
    fn mode_flags(&self) -> ModeFlags {
        ModeFlags {
            reverse: self.reverse,
            regularize: self.regularize,
            to_text: self.to_text,
            to_binary: self.to_binary,
            spec_const_info: self.spec_const_info,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli, &NativeTranslator)
}

fn run(cli: &Cli, translator: &dyn Translator) -> Result<()> {
    if !is_stdio(&cli.input) && is_file_empty(&cli.input) {
        bail!("Can't translate, file is empty");
    }

    let extensions = parse_extensions(cli.extensions.iter().map(String::as_str), cli.reverse)?;
    let mut options = TranslatorOptions::new(cli.max_version, extensions)
        .with_kernel_arg_name_md(cli.spirv_gen_kernel_arg_name_md)
        .with_text_format(cli.spirv_text);

    let mode = Mode::select(cli.mode_flags())?;
    tracing::debug!(?mode, input = %cli.input.display(), "selected mode");

    let input = read_input(&cli.input)?;

    let spec_const = cli.spec_const.as_deref().filter(|s| !s.is_empty());
    if let Some(spec_const) = spec_const {
        if mode == Mode::Reverse {
            let table: SpecConstTable = translator
                .spec_const_info(&input)
                .context("Fails to read specialization constants")?
                .into_iter()
                .collect();
            options = options.with_spec_consts(parse_spec_consts(spec_const, &table)?);
        } else {
            tracing::warn!("--spec-const only applies to reverse translation (-r), ignoring");
        }
    }

    let output = match mode {
        Mode::SpecConstInfo => {
            let descriptors = translator
                .spec_const_info(&input)
                .context("Fails to read specialization constants")?;
            write_spec_const_info(&mut io::stdout().lock(), &descriptors)?;
            return Ok(());
        }
        Mode::Forward => translator
            .write_spirv(&input, &options)
            .context("Fails to save LLVM as SPIR-V")?,
        Mode::Reverse => translator
            .read_spirv(&input, &options)
            .context("Fails to load SPIR-V as LLVM Module")?,
        Mode::Regularize => translator
            .regularize(&input)
            .context("Fails to regularize LLVM for SPIR-V")?,
        Mode::Convert(conversion) => translator
            .convert_spirv(&input, conversion)
            .context("Fails to convert SPIR-V")?,
    };

    let destination = match &cli.output {
        Some(path) => path.clone(),
        None => default_output(&cli.input, mode, cli.spirv_text)
            .context("no output file for this mode")?,
    };
    write_output(&destination, &output)
}

fn is_file_empty(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() == 0)
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if is_stdio(path) {
        let mut buf = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if is_stdio(path) {
        let mut out = io::stdout().lock();
        out.write_all(bytes).context("Failed to write stdout")?;
        return out.flush().context("Failed to write stdout");
    }
    fs::write(path, bytes).with_context(|| format!("Fails to open output file {}", path.display()))
}

fn write_spec_const_info(out: &mut impl Write, descriptors: &[SpecConstDescriptor]) -> io::Result<()> {
    writeln!(
        out,
        "Number of scalar specialization constants in the module = {}",
        descriptors.len()
    )?;
    for SpecConstDescriptor { id, size_bytes } in descriptors {
        writeln!(out, "Spec const id = {id}, size in bytes = {size_bytes}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use spirv_bridge::{Conversion, Error as BridgeError, SpecConstOverrides};
    use std::cell::RefCell;

    /// Records the options it was called with.
    #[derive(Default)]
    struct RecordingTranslator {
        descriptors: Vec<SpecConstDescriptor>,
        seen: RefCell<Option<SpecConstOverrides>>,
    }

    impl Translator for RecordingTranslator {
        fn write_spirv(&self, bitcode: &[u8], _: &TranslatorOptions) -> spirv_bridge::Result<Vec<u8>> {
            Ok(bitcode.to_vec())
        }

        fn read_spirv(&self, spirv: &[u8], options: &TranslatorOptions) -> spirv_bridge::Result<Vec<u8>> {
            *self.seen.borrow_mut() = Some(options.spec_consts().clone());
            Ok(spirv.to_vec())
        }

        fn regularize(&self, _: &[u8]) -> spirv_bridge::Result<Vec<u8>> {
            Err(BridgeError::BackendUnavailable("LLVM regularization"))
        }

        fn convert_spirv(&self, input: &[u8], _: Conversion) -> spirv_bridge::Result<Vec<u8>> {
            Ok(input.to_vec())
        }

        fn spec_const_info(&self, _: &[u8]) -> spirv_bridge::Result<Vec<SpecConstDescriptor>> {
            Ok(self.descriptors.clone())
        }
    }

    fn scratch_file(name: &str, contents: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("spirv-bridge-cli-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("spirv-bridge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_defaults() {
        let cli = parse(&[]);
        assert!(is_stdio(&cli.input));
        assert_eq!(cli.max_version, SpirvVersion::MAXIMUM);
        assert!(cli.extensions.is_empty());
        assert!(cli.spec_const.is_none());
    }

    #[test]
    fn test_parse_extension_list() {
        let cli = parse(&["--spirv-ext=+SPV_INTEL_fpga_reg,-SPV_KHR_float_controls", "in.bc"]);
        assert_eq!(
            cli.extensions,
            vec!["+SPV_INTEL_fpga_reg", "-SPV_KHR_float_controls"]
        );
        assert_eq!(cli.input, PathBuf::from("in.bc"));
    }

    #[test]
    fn test_parse_version() {
        let cli = parse(&["--spirv-max-version", "1.0"]);
        assert_eq!(cli.max_version, SpirvVersion::V1_0);
        assert!(
            Cli::try_parse_from(["spirv-bridge", "--spirv-max-version", "2.0"]).is_err()
        );
    }

    #[test]
    fn test_spec_const_info_report() {
        let mut out = Vec::new();
        write_spec_const_info(
            &mut out,
            &[
                SpecConstDescriptor { id: 0, size_bytes: 4 },
                SpecConstDescriptor { id: 7, size_bytes: 1 },
            ],
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Number of scalar specialization constants in the module = 2\n\
             Spec const id = 0, size in bytes = 4\n\
             Spec const id = 7, size in bytes = 1\n"
        );
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let input = scratch_file("empty.spv", b"");
        let cli = parse(&["-r", input.to_str().unwrap()]);
        let err = run(&cli, &RecordingTranslator::default()).unwrap_err();
        assert_eq!(err.to_string(), "Can't translate, file is empty");
    }

    #[test]
    fn test_reverse_applies_spec_consts() {
        let input = scratch_file("reverse.spv", b"module");
        let output = input.with_extension("out.bc");
        let cli = parse(&[
            "-r",
            "--spec-const",
            "0:i32:42 1:f64:3.5",
            "-o",
            output.to_str().unwrap(),
            input.to_str().unwrap(),
        ]);
        let translator = RecordingTranslator {
            descriptors: vec![
                SpecConstDescriptor { id: 0, size_bytes: 4 },
                SpecConstDescriptor { id: 1, size_bytes: 8 },
            ],
            ..RecordingTranslator::default()
        };

        run(&cli, &translator).unwrap();

        let seen = translator.seen.borrow().clone().unwrap();
        assert_eq!(seen, SpecConstOverrides::from([(0, 42), (1, 3.5f64.to_bits())]));
        assert_eq!(fs::read(&output).unwrap(), b"module");
    }

    #[test]
    fn test_reverse_rejects_unknown_spec_id() {
        let input = scratch_file("unknown.spv", b"module");
        let cli = parse(&["-r", "--spec-const", "5:i32:1", input.to_str().unwrap()]);
        let err = run(&cli, &RecordingTranslator::default()).unwrap_err();
        assert!(err.to_string().contains("CL_INVALID_SPEC_ID"), "{err}");
        assert!(err.to_string().contains("id = 5"), "{err}");
    }

    #[test]
    fn test_conflicting_modes() {
        let input = scratch_file("conflict.bc", b"module");
        let cli = parse(&["-r", "-s", input.to_str().unwrap()]);
        let err = run(&cli, &RecordingTranslator::default()).unwrap_err();
        assert_eq!(err.to_string(), "Cannot have both -r and -s options");
    }

    #[test]
    fn test_default_output_next_to_input() {
        let input = scratch_file("forward.bc", b"bitcode");
        let cli = parse(&[input.to_str().unwrap()]);
        run(&cli, &RecordingTranslator::default()).unwrap();
        assert_eq!(fs::read(input.with_extension("spv")).unwrap(), b"bitcode");
    }

    #[test]
    fn test_translator_errors_get_context() {
        let input = scratch_file("regularize.bc", b"bitcode");
        let cli = parse(&["-s", input.to_str().unwrap()]);
        let err = run(&cli, &RecordingTranslator::default()).unwrap_err();
        assert_eq!(err.to_string(), "Fails to regularize LLVM for SPIR-V");
        assert!(format!("{err:#}").contains("LLVM regularization"));
    }

    #[test]
    fn test_bad_extension_fails() {
        let input = scratch_file("ext.bc", b"bitcode");
        let cli = parse(&["--spirv-ext=SPV_INTEL_fpga_reg", input.to_str().unwrap()]);
        assert!(run(&cli, &RecordingTranslator::default()).is_err());
    }
}
