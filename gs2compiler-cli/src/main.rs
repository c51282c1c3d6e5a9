//! Entrypoint for CLI
use std::{
    env,
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use gs2compiler::{
    lex::{debug_print_lexer, Lexer},
    prelude::*,
};
use log::{debug, error, info, LevelFilter};
use serde::Deserialize;

const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

static USAGE: &str = r#"
usage: gs2c [OPTIONS] INPUT...

options:
    -o, --output PATH     output file (single input) or directory
    -t, --type TYPE       script type for the header (default weapon)
    -n, --name NAME       script name (default: input file stem)
        --no-header       compile without header
    -c, --config PATH     YAML compiler configuration
        --tokens          print the token stream instead of compiling
        --dis             disassemble an existing .gs2bc image
    -v, --verbose         debug logging

examples:
    gs2c weapons/
    gs2c -t npc -n Banker banker.gs2 -o banker.gs2bc
    gs2c --dis banker.gs2bc
"#;

const SOURCE_EXTENSION: &str = "gs2";
const OUTPUT_EXTENSION: &str = "gs2bc";

fn main() -> Result<(), Box<dyn Error>> {
    let opts = match parse_args(env::args().skip(1)) {
        Some(opts) => opts,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    };

    let level = if opts.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    simple_logger::SimpleLogger::new().with_level(level).env().init()?;

    let config = match &opts.config {
        Some(path) => load_config(path)?,
        None => ConfigFile::default(),
    };

    let inputs = collect_inputs(&opts.inputs)?;
    if inputs.is_empty() {
        error!("no input files");
        std::process::exit(64)
    }

    let mut failed = 0;
    for input in &inputs {
        let ok = match opts.mode {
            Mode::Compile => compile_file(input, inputs.len(), &opts, &config)?,
            Mode::Tokens => {
                let source = fs::read_to_string(input)?;
                debug_print_lexer(Lexer::new(&source));
                true
            }
            Mode::Disassemble => {
                let bytecode = fs::read(input)?;
                match Disassembler::new(&bytecode).print_bytecode() {
                    Ok(()) => true,
                    Err(err) => {
                        error!("{}: {}", input.display(), err);
                        false
                    }
                }
            }
        };

        if !ok {
            failed += 1;
        }
    }

    if failed > 0 {
        error!("{} of {} files failed", failed, inputs.len());
        std::process::exit(1)
    }

    Ok(())
}

/// Returns whether the file compiled.
fn compile_file(input: &Path, input_count: usize, opts: &Opts, config: &ConfigFile) -> Result<bool, Box<dyn Error>> {
    let source = fs::read_to_string(input)?;
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut ctx = Context::with_conf(config.compiler.clone());
    let result = if opts.no_header {
        ctx.compile_raw(&source)?
    } else {
        let script_type = opts
            .script_type
            .as_deref()
            .or(config.script_type.as_deref())
            .unwrap_or("weapon");
        let script_name = opts.script_name.as_deref().unwrap_or(&stem);
        debug!("compiling {} as {} '{}'", input.display(), script_type, script_name);
        ctx.compile(&source, script_type, script_name)?
    };

    match result {
        CompileResult::Success { bytecode, .. } => {
            let output = output_path(input, &stem, input_count, opts.output.as_deref())?;
            fs::write(&output, bytecode)?;
            info!("{} -> {} ({} bytes)", input.display(), output.display(), bytecode.len());
            Ok(true)
        }
        CompileResult::Failure(diag) => {
            eprint!("{}: {}", input.display(), diag);
            Ok(false)
        }
    }
}

fn output_path(input: &Path, stem: &str, input_count: usize, output: Option<&Path>) -> std::io::Result<PathBuf> {
    match output {
        Some(dir) if input_count > 1 || dir.is_dir() => {
            fs::create_dir_all(dir)?;
            Ok(dir.join(stem).with_extension(OUTPUT_EXTENSION))
        }
        Some(file) => Ok(file.to_path_buf()),
        None => Ok(input.with_extension(OUTPUT_EXTENSION)),
    }
}

/// Directories are scanned for source files, one level deep.
fn collect_inputs(paths: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    let mut inputs = vec![];

    for path in paths {
        if path.is_dir() {
            let mut found = vec![];
            for entry in fs::read_dir(path)? {
                let file = entry?.path();
                if file.is_file() && file.extension().map_or(false, |ext| ext == SOURCE_EXTENSION) {
                    found.push(file);
                }
            }
            found.sort();
            inputs.extend(found);
        } else {
            inputs.push(path.clone());
        }
    }

    Ok(inputs)
}

fn load_config(path: &Path) -> Result<ConfigFile, Box<dyn Error>> {
    let file = fs::File::open(path)?;
    let config: ConfigFile = serde_yaml::from_reader(file)?;
    debug!("loaded config {:?}", config);
    Ok(config)
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Option<Opts> {
    let mut opts = Opts::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => opts.output = Some(consume_arg(&mut args)?.into()),
            "-t" | "--type" => opts.script_type = Some(consume_arg(&mut args)?),
            "-n" | "--name" => opts.script_name = Some(consume_arg(&mut args)?),
            "-c" | "--config" => opts.config = Some(consume_arg(&mut args)?.into()),
            "--no-header" => opts.no_header = true,
            "--tokens" => opts.mode = Mode::Tokens,
            "--dis" => opts.mode = Mode::Disassemble,
            "-v" | "--verbose" => opts.verbose = true,
            "-h" | "--help" => return None,
            flag if flag.starts_with('-') => return None,
            _ => opts.inputs.push(arg.into()),
        }
    }

    if opts.inputs.is_empty() {
        return None;
    }

    Some(opts)
}

/// Consumes the value of an option, failing when it doesn't exist.
fn consume_arg(args: &mut impl Iterator<Item = String>) -> Option<String> {
    args.next().filter(|arg| !arg.starts_with('-'))
}

fn print_usage() {
    println!("gs2c v{IMPL_VERSION}");
    println!("{USAGE}");
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Mode {
    #[default]
    Compile,
    Tokens,
    Disassemble,
}

#[derive(Debug, Default)]
struct Opts {
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    script_type: Option<String>,
    script_name: Option<String>,
    no_header: bool,
    config: Option<PathBuf>,
    mode: Mode,
    verbose: bool,
}

/// Contents of a `--config` file.
///
/// ```yaml
/// script_type: npc
/// compiler:
///   max_nesting_depth: 64
///   save_to_disk: false
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    script_type: Option<String>,
    compiler: CompilerConf,
}
