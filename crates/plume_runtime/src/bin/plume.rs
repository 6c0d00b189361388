//! Plume CLI entry point.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use plume_foundation::GcStats;
use plume_runtime::{RuntimeConfig, init_tracing, load};

/// CLI configuration parsed from arguments.
#[derive(Default)]
struct CliConfig {
    file: Option<PathBuf>,
    program_args: Vec<String>,
    show_help: bool,
    show_version: bool,
    trace: bool,
    stats: bool,
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliConfig, Box<dyn std::error::Error>> {
    let mut config = CliConfig::default();

    let mut args = args.into_iter().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => config.show_help = true,
            "-V" | "--version" => config.show_version = true,
            "--trace" => config.trace = true,
            "--stats" => config.stats = true,
            "--" => {
                if let Some(path) = args.next() {
                    config.file = Some(PathBuf::from(path));
                }
                break;
            }
            arg if arg.starts_with('-') => {
                return Err(format!("unknown option: {arg}").into());
            }
            path => {
                config.file = Some(PathBuf::from(path));
                break;
            }
        }
    }
    // Everything after the file belongs to the program.
    config.program_args = args.collect();

    Ok(config)
}

fn run(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = parse_args(args)?;

    if config.show_help {
        print_help();
        return Ok(());
    }

    if config.show_version {
        println!("plume {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let Some(file) = config.file else {
        print_help();
        return Err("no bytecode file given".into());
    };

    let runtime = RuntimeConfig::from_env()
        .with_trace(config.trace)
        .with_stats(config.stats);
    init_tracing(runtime.trace);

    let mut vm = load(&file, config.program_args, &runtime)?;
    let result = vm.run();

    if runtime.stats {
        print_stats(&vm.gc_stats(), vm.native_resolutions());
    }

    result?;
    Ok(())
}

fn print_stats(stats: &GcStats, resolutions: u64) {
    eprintln!("collections:  {}", stats.collections);
    eprintln!("allocated:    {}", stats.allocated);
    eprintln!("freed:        {}", stats.freed);
    eprintln!("live:         {} ({} bytes)", stats.live, stats.live_bytes);
    eprintln!("threshold:    {}", stats.threshold);
    eprintln!("natives:      {resolutions} resolved");
}

fn print_help() {
    println!(
        "\x1b[1mPlume\x1b[0m - Bytecode virtual machine

\x1b[1mUSAGE:\x1b[0m
    plume [OPTIONS] <FILE> [ARGS...]

\x1b[1mARGUMENTS:\x1b[0m
    <FILE>       Bytecode file to run
    [ARGS...]    Arguments passed to the program

\x1b[1mOPTIONS:\x1b[0m
    -h, --help       Print help information
    -V, --version    Print version information
    --trace          Log every executed instruction (unless RUST_LOG is set)
    --stats          Print collector statistics to stderr after the run

\x1b[1mENVIRONMENT:\x1b[0m
    PLUME_PATH       Directory holding the standard libraries
    RUST_LOG         Log filter, e.g. plume_vm=debug

\x1b[1mEXAMPLES:\x1b[0m
    plume hello.plb                  Run hello.plb
    plume main.plb one two           Run main.plb with two arguments
    plume --stats --trace loop.plb   Trace a run and report the heap"
    );
}
