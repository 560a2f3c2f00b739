// ABOUTME: CLI driver wiring the preprocessor to the downstream evaluator

use clap::{Parser, ValueEnum};
use lisp_preprocess::backend::{self, RecompileMode};
use lisp_preprocess::diagnostics::report;
use lisp_preprocess::preprocessor::Preprocessor;
use log::{debug, error, info};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::{exit, Command};

/// Canonicalize a sugared Lisp dialect and hand it to the evaluator
#[derive(Parser, Debug)]
#[command(name = "lisp-preprocess")]
#[command(version)]
#[command(about = "Run the lisp")]
struct CliArgs {
    /// The lisp file to run
    #[arg(value_name = "ORIGIN")]
    origin: Option<PathBuf>,

    /// Code to execute instead of running from a file
    #[arg(short = 'c', long = "code", conflicts_with = "origin")]
    code: Option<String>,

    /// Dump the canonicalized output and exit
    #[arg(long)]
    dump: bool,

    /// When to recompile the evaluator executable
    #[arg(long, value_enum, default_value_t = RecompileMode::Never)]
    recompile: RecompileMode,

    /// Run without the evaluator's safety checks
    #[arg(long = "unsafe")]
    unsafe_mode: bool,

    /// Logging level
    #[arg(long = "log", value_enum, default_value_t = LogLevel::Error)]
    log: LogLevel,

    /// Arguments to pass to the Lisp program
    #[arg(short = 'a', long = "args", num_args = 0.., value_name = "ARGS")]
    args: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn main() {
    let args = CliArgs::parse();
    env_logger::Builder::new()
        .filter_level(args.log.filter())
        .init();

    let mut processor = Preprocessor::new();
    let contents = match read_input(&args, &mut processor) {
        Ok(contents) => contents,
        Err(code) => exit(code),
    };

    let canon = match processor.make_canon(&contents) {
        Ok(canon) => canon,
        Err(err) => {
            let ansi = std::io::stderr().is_terminal();
            eprintln!("{}", report(&err, processor.source(), ansi));
            exit(1);
        }
    };

    if args.dump {
        println!("{}", canon);
        exit(0);
    }

    let temp_path = match write_canon(&canon) {
        Ok(path) => path,
        Err(code) => exit(code),
    };

    let root = backend::install_root();
    if let Err(err) = backend::recompile_if_necessary(args.recompile, &root) {
        error!("Recompilation failed: {}", err);
        exit(1);
    }

    let evaluator = root.join("lisp");
    if !evaluator.exists() {
        error!("Could not find evaluator (searched '{}').", evaluator.display());
        if args.recompile != RecompileMode::Always {
            error!("Try rerunning with the `--recompile always` option.");
        }
        exit(1);
    }

    info!("Running evaluator.");
    let status = Command::new(&evaluator)
        .arg(&temp_path)
        .arg("0")
        .arg(if args.unsafe_mode { "0" } else { "1" })
        .args(&args.args)
        .status();

    match status {
        Ok(status) => exit(status.code().unwrap_or(1)),
        Err(err) => {
            error!("Failed to run evaluator: {}", err);
            exit(1);
        }
    }
}

/// Read the program text from the origin file or the `-c` literal, and
/// seed the preprocessor's context stack for file-relative includes.
fn read_input(args: &CliArgs, processor: &mut Preprocessor) -> Result<String, i32> {
    match (&args.origin, &args.code) {
        (Some(origin), _) => {
            if !origin.exists() {
                error!("File '{}' does not exist.", origin.display());
                return Err(1);
            }
            let contents = std::fs::read_to_string(origin).map_err(|err| {
                error!("Could not read '{}': {}", origin.display(), err);
                1
            })?;
            processor.set_origin(origin.clone());
            Ok(contents)
        }
        (None, Some(code)) => Ok(code.clone()),
        (None, None) => {
            error!("Either an origin file or code passed with -c must be provided.");
            Err(1)
        }
    }
}

/// Write the canonical text to its content-addressed temp path, stable
/// across runs for identical programs.
fn write_canon(canon: &str) -> Result<PathBuf, i32> {
    let digest = format!("{:x}", md5::compute(canon.as_bytes()));
    let dir = PathBuf::from("/tmp/lisp");
    if let Err(err) = std::fs::create_dir_all(&dir) {
        error!("Could not create '{}': {}", dir.display(), err);
        return Err(1);
    }

    let path = dir.join(format!("{}.lisp", digest));
    if let Err(err) = std::fs::write(&path, canon) {
        error!("Could not write '{}': {}", path.display(), err);
        return Err(1);
    }
    debug!("Wrote canonical form to '{}'.", path.display());
    Ok(path)
}
