//! kparam-check entry point.
//!
//! ## CLI Subcommands
//!
//! - `kparam-check` or `kparam-check run` - Run the scenario catalogue (default)
//! - `kparam-check check` - Exit 0 if the module is loaded
//! - `kparam-check show` - Print current parameter values
//! - `kparam-check config show|defaults|validate` - Inspect configuration

use std::process::ExitCode;

use kparam_check::accessor;
use kparam_check::cli::{self, config_cmd, CliArgs, EXIT_USAGE};
use kparam_check::config as kp_config;
use kparam_check::telemetry;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let parsed = match cli::parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}", e);
            print_usage();
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let mut env = kp_config::load();
    if let Some(module) = &parsed.module {
        env.accessor.module = module.clone();
    }

    if let Err(e) = telemetry::init_logging(&env.log) {
        eprintln!("Logging disabled: {}", e);
    }
    for entry in &env.ignored {
        tracing::warn!(entry = %entry, "ignoring unparseable configuration value");
    }

    let code = dispatch(&parsed, env).await;
    ExitCode::from(code)
}

async fn dispatch(parsed: &CliArgs, env: kp_config::EnvConfig) -> u8 {
    match parsed.command() {
        "run" => cli::run_suite(env, parsed.run_options()).await,
        "check" => {
            let store = accessor::create_store(env.accessor);
            cli::run_check(&store).await
        }
        "show" => {
            let params = match parsed.selected_params() {
                Ok(params) => params,
                Err(e) => {
                    eprintln!("{}", e);
                    print_command_help("show");
                    return EXIT_USAGE;
                }
            };
            let lines = env.orchestrator.final_log_lines;
            let store = accessor::create_store(env.accessor);
            cli::run_show(&store, &params, lines).await
        }
        "config" => match parsed.subcommand().unwrap_or("show") {
            "show" => {
                config_cmd::run_show(&env);
                0
            }
            "defaults" => {
                config_cmd::run_defaults();
                0
            }
            "validate" => config_cmd::run_validate(&env),
            other => {
                eprintln!("Unknown config subcommand: {}", other);
                print_command_help("config");
                EXIT_USAGE
            }
        },
        "help" => {
            match parsed.subcommand() {
                Some(topic) => print_command_help(topic),
                None => print_usage(),
            }
            0
        }
        "version" => {
            println!("kparam-check {}", env!("CARGO_PKG_VERSION"));
            0
        }
        other => {
            eprintln!("{}", cli::CliError::UnknownCommand(other.to_string()));
            print_usage();
            EXIT_USAGE
        }
    }
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "kparam-check - kernel module parameter conformance harness v{}

USAGE:
    kparam-check [COMMAND] [OPTIONS]

COMMANDS:
    run          Run the scenario catalogue (default when no command given)
    check        Exit 0 if the module is loaded, 3 otherwise
    show         Print parameter values and recent module log (show [idx|ch_val|my_str]...)
    config       Inspect configuration (show, defaults, validate)
    version      Show version information
    help         Show this help message

OPTIONS:
    -m, --module NAME  Module under test (overrides KPARAM_MODULE)
    -y, --yes          Do not ask for confirmation when running as root
    --json             Print the run report as JSON
    --extended         Also run boundary checks (idx=64, ch_val=256, ch_val=-1)
    -h, --help         Show help for command
    -V, --version      Show version information

ENVIRONMENT:
    KPARAM_MODULE         Module name (default: my_module)
    KPARAM_ELEVATE        Elevation program for writes (default: sudo, empty = direct)
    KPARAM_SETTLE_MS      Pause before each observation (default: 100)
    KPARAM_PAUSE_MS       Pause between scenarios (default: 500)
    KPARAM_OP_TIMEOUT_MS  Timeout for any single read, write or command (default: 10000)
    KPARAM_LOG            Harness log filter (default: warn)

EXIT CODES:
    0  All scenarios passed
    1  At least one scenario failed
    2  Usage or configuration error
    3  Module not loaded
",
        version
    );
}

/// Print detailed help for a specific command.
fn print_command_help(command: &str) {
    match command {
        "run" => {
            eprintln!(
                "kparam-check run - Run the scenario catalogue

USAGE:
    kparam-check run [--module NAME] [--yes] [--json] [--extended]

DESCRIPTION:
    Clears the kernel log, then runs each scenario in order: snapshot the
    parameters it touches, write, wait, re-read, check the kernel log,
    restore the snapshot and verify the restore. Writes go through
    KPARAM_ELEVATE (sudo by default).

    The run refuses to start if the module is not loaded (exit 3).
"
            );
        }
        "config" => {
            eprintln!(
                "kparam-check config - Inspect configuration

USAGE:
    kparam-check config [show|defaults|validate]

SUBCOMMANDS:
    show       Print effective configuration (default)
    defaults   Print built-in defaults
    validate   Check paths and values, exit 1 on warnings
"
            );
        }
        "check" | "show" => {
            eprintln!(
                "kparam-check {} - Read-only inspection

USAGE:
    kparam-check {} [--module NAME]{}

DESCRIPTION:
    Never writes to the module and never clears the kernel log.
",
                command,
                command,
                if command == "show" { " [PARAM...]" } else { "" }
            );
        }
        _ => print_usage(),
    }
}
