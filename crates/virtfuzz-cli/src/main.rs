//! CLI entry point for the virtfuzz replay driver.

mod input;
mod logging;

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

#[cfg(test)]
use tempfile as _;
use virtfuzz_core::{
    load_description, run_iteration_with, DeviceDescription, FaultPolicy, HarnessConfig,
    InterfaceRegistry, LoadError, MessageSequence, RegisterMapModel, ReplayReport,
};

const USAGE_TEXT: &str = "\
Usage: virtfuzz -f <device-model.json> -n <name> [options]

Options:
  -f, --file <path>      Device model description (JSON)
  -n, --name <name>      Device name
  -s, --seed <u64>       Seed for generated input (default: random)
  -i, --input <path>     Replay a saved input instead of generating one
  -c, --continue         Keep replaying after a model fault
  -v, --verbose          Print every decoded message
      --log-level <dir>  Diagnostic log filter (default: RUST_LOG or warn)
  -h, --help             Show this help message

Examples:
  virtfuzz -f config/dbm/e1000.json -n e1000
  virtfuzz -f config/dbm/e1000.json -n e1000 --seed 7 --verbose
";

/// Exit code for a run that observed a model fault.
const EXIT_MODEL_FAULT: i32 = 2;

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    file: PathBuf,
    name: String,
    seed: Option<u64>,
    input: Option<PathBuf>,
    keep_going: bool,
    verbose: bool,
    log_level: Option<String>,
}

#[derive(Debug)]
enum ParseResult {
    Run(RunArgs),
    Help,
}

fn next_value(args: &mut impl Iterator<Item = OsString>, flag: &str) -> Result<String, String> {
    args.next()
        .map(|value| value.to_string_lossy().to_string())
        .ok_or_else(|| format!("missing value for {flag}"))
}

#[allow(clippy::while_let_on_iterator)]
fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut file: Option<PathBuf> = None;
    let mut name: Option<String> = None;
    let mut seed: Option<u64> = None;
    let mut input: Option<PathBuf> = None;
    let mut keep_going = false;
    let mut verbose = false;
    let mut log_level: Option<String> = None;

    while let Some(arg) = args.next() {
        let flag = arg.to_string_lossy().to_string();
        match flag.as_str() {
            "-h" | "--help" => return Ok(ParseResult::Help),
            "-f" | "--file" => file = Some(PathBuf::from(next_value(&mut args, &flag)?)),
            "-n" | "--name" => name = Some(next_value(&mut args, &flag)?),
            "-s" | "--seed" => {
                let value = next_value(&mut args, &flag)?;
                seed = Some(
                    parse_seed(&value).ok_or_else(|| format!("invalid seed: {value}"))?,
                );
            }
            "-i" | "--input" => input = Some(PathBuf::from(next_value(&mut args, &flag)?)),
            "-c" | "--continue" => keep_going = true,
            "-v" | "--verbose" => verbose = true,
            "--log-level" => log_level = Some(next_value(&mut args, &flag)?),
            other => return Err(format!("unknown option: {other}")),
        }
    }

    Ok(ParseResult::Run(RunArgs {
        file: file.ok_or_else(|| "missing required option -f/--file".to_string())?,
        name: name.ok_or_else(|| "missing required option -n/--name".to_string())?,
        seed,
        input,
        keep_going,
        verbose,
        log_level,
    }))
}

fn parse_seed(value: &str) -> Option<u64> {
    value.strip_prefix("0x").map_or_else(
        || value.parse().ok(),
        |hex| u64::from_str_radix(hex, 16).ok(),
    )
}

fn load_model(args: &RunArgs) -> Result<DeviceDescription, i32> {
    println!("Device Model File: {}", args.file.display());
    println!("Device Name: {}", args.name);
    match load_description(&args.file) {
        Ok(description) => {
            println!("Device model initialized successfully");
            Ok(description)
        }
        Err(error @ LoadError::NotFound { .. }) => {
            eprintln!("Error: {error}!");
            Err(1)
        }
        Err(error) => {
            eprintln!("error: {error}");
            Err(1)
        }
    }
}

fn print_report(report: &ReplayReport) {
    println!(
        "[REPLAY] replayed: {}, skipped: {}, faults: {}.",
        report.replayed,
        report.skipped(),
        report.faults.len()
    );
    for record in &report.faults {
        println!(
            "[FAULT] message {}: {} {} offset=0x{:x} payload={}: {}",
            record.index,
            record.operation,
            record.interface_id,
            record.offset,
            hex::encode(&record.payload),
            record.fault
        );
    }
}

fn run(args: &RunArgs) -> Result<(), i32> {
    if let Err(error) = logging::init_logging(args.log_level.as_deref()) {
        eprintln!("error: {error}");
        return Err(1);
    }

    let description = load_model(args)?;
    let mut config = description.harness_config();
    if args.keep_going {
        config.fault_policy = FaultPolicy::Continue;
    }

    let mut registry = InterfaceRegistry::new();
    if let Err(error) = description.register_interfaces(&mut registry) {
        eprintln!("error: {error}");
        return Err(1);
    }
    registry.freeze();
    println!("\nAvailable interfaces:");
    print!("{registry}");

    let data = match &args.input {
        Some(path) => input::read_input(path).map_err(|error| {
            eprintln!("error: {error}");
            1
        })?,
        None => {
            let seed = input::resolve_seed(args.seed);
            println!("Seed: {seed}");
            input::seeded_input(seed, config.input_len)
        }
    };
    tracing::info!(bytes = data.len(), device = %args.name, "fuzz input ready");

    replay_input(&data, &registry, &description, &config, args.verbose)
}

fn print_sequence(sequence: &MessageSequence, registry: &InterfaceRegistry, verbose: bool) {
    println!("\n[FUZZ] num_messages: {}.", sequence.len());
    if verbose {
        for (index, message) in sequence.iter().enumerate() {
            println!("  [{index}] {}", message.display(registry));
        }
    }
}

fn replay_input(
    data: &[u8],
    registry: &InterfaceRegistry,
    description: &DeviceDescription,
    config: &HarnessConfig,
    verbose: bool,
) -> Result<(), i32> {
    let mut model = RegisterMapModel::new(registry, description);
    let iteration = run_iteration_with(data, registry, &mut model, config, |sequence| {
        print_sequence(sequence, registry, verbose);
    })
    .map_err(|error| {
        eprintln!("error: {error}");
        1
    })?;
    tracing::debug!(
        messages = iteration.released.messages,
        payload_bytes = iteration.released.payload_bytes,
        "released message sequence"
    );
    print_report(&iteration.report);

    if iteration.is_clean() {
        Ok(())
    } else {
        Err(EXIT_MODEL_FAULT)
    }
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Run(args)) => match run(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{USAGE_TEXT}");
            1
        }
    };

    std::process::exit(exit_code);
}
