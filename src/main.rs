// Shadow Exec - run a command with secrets injected into its environment
//
// This is the main entry point for the application.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shadow_exec::config::{self, Config};
use shadow_exec::environment::Environment;
use shadow_exec::exec::{execute, ExecRequest};
use shadow_exec::launcher::ProcessLauncher;
use shadow_exec::policy::PolicyFlags;
use shadow_exec::store::Engine;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Shadow Exec - run a command with secrets injected into its environment
#[derive(Parser, Debug)]
#[command(name = "shadow-exec")]
#[command(author = "Yanis <yanis@example.com>")]
#[command(version)]
#[command(about = "Run a command with secrets injected into its environment", long_about = None)]
struct Cli {
    /// Print mode announcements and the injected variable names
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file (default: shadow-exec.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Secret store directory (overrides the configuration file)
    #[arg(long, global = true, env = "SHADOW_EXEC_STORE")]
    store: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check prerequisites and store configuration
    Doctor,

    /// Execute a command with secrets loaded into the environment
    #[command(after_help = EXEC_EXAMPLES)]
    Exec {
        /// Services whose secrets are injected, in order
        #[arg(required = true)]
        services: Vec<String>,

        /// Only use variables from the store; do not inherit the environment
        #[arg(long)]
        pristine: bool,

        /// Only fill env vars set to <STRICT_VALUE>, failing if any has no secret
        #[arg(long)]
        strict: bool,

        /// Value to expect in --strict mode
        #[arg(long)]
        strict_value: Option<String>,

        /// Never overwrite existing environment variables
        #[arg(long, alias = "noclobber")]
        no_clobber: bool,

        /// Command to run and its arguments, after `--`
        #[arg(last = true, required = true, num_args = 1..)]
        command: Vec<String>,
    },
}

const EXEC_EXAMPLES: &str = "\
Examples:
  --strict fails on unfilled env vars
    $ DB_USERNAME=chamberme EXTRA=chamberme shadow-exec exec --strict app -- env
    shadow-exec: extra unfilled env var EXTRA

  --pristine takes effect after checking for --strict values
    $ HOME=/tmp DB_USERNAME=chamberme shadow-exec exec --strict --pristine app -- env

  --no-clobber does not overwrite existing environment variables
    $ DB_USERNAME=bert shadow-exec exec --no-clobber app -- env";

fn load_config(cli_config: Option<&Path>, cli_store: Option<&str>) -> Result<Config> {
    let mut config = Config::load(cli_config)?;
    if let Some(store) = cli_store {
        config.store.path = store.to_string();
    }
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

fn run_doctor(cli_config: Option<&Path>, cli_store: Option<&str>) -> Result<()> {
    println!("🔍 Shadow Exec Doctor");
    println!("Checking prerequisites...\n");

    let mut all_checks_passed = true;

    // Check 1: configuration
    print!("1. Checking configuration... ");
    let config = match load_config(cli_config, cli_store) {
        Ok(config) => {
            println!("✓");
            Some(config)
        }
        Err(e) => {
            println!("✗");
            println!("   ❌ {:#}", e);
            all_checks_passed = false;
            None
        }
    };

    if let Some(config) = config {
        // Check 2: store directory
        print!("2. Checking store directory... ");
        match config.store_path() {
            Ok(path) if path.is_dir() => println!("✓ ({})", path.display()),
            Ok(path) => {
                println!("✗");
                println!("   ❌ Store directory not found: {}", path.display());
                println!("   💡 Create it or set $SHADOW_EXEC_STORE");
                all_checks_passed = false;
            }
            Err(e) => {
                println!("✗");
                println!("   ❌ Error resolving store path: {}", e);
                all_checks_passed = false;
            }
        }

        // Check 3: sops installation, only needed for the sops engine
        print!("3. Checking if 'sops' is installed... ");
        match config.engine() {
            Ok(Engine::Sops) if check_binary("sops") => println!("✓"),
            Ok(Engine::Sops) => {
                println!("✗");
                println!("   ❌ 'sops' is not installed or not in PATH");
                println!("   📦 Install from: https://github.com/getsops/sops/releases");
                all_checks_passed = false;
            }
            _ => {
                println!("⊘");
                println!("   ⚠️  Skipped (store engine is not sops)");
            }
        }
    }

    // Check 4: key mode
    if config::no_paths_from_env() {
        println!("4. Key mode: flat (${} is set)", config::NO_PATHS_ENV);
    } else {
        println!("4. Key mode: hierarchical");
    }

    println!();
    if all_checks_passed {
        println!("✅ All checks passed! Your system is ready.");
        Ok(())
    } else {
        println!("❌ Some checks failed. Please fix the issues above.");
        Err(anyhow::anyhow!("Doctor checks failed"))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    shadow_exec::logging::init(cli.verbose);

    match cli.command {
        Commands::Doctor => {
            if let Err(e) = run_doctor(cli.config.as_deref(), cli.store.as_deref()) {
                eprintln!("\nError: {}", e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Commands::Exec {
            services,
            pristine,
            strict,
            strict_value,
            no_clobber,
            mut command,
        } => {
            let config = match load_config(cli.config.as_deref(), cli.store.as_deref()) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("shadow-exec: {:#}", e);
                    return exit_code(shadow_exec::error::EXIT_INJECTION_FAILED);
                }
            };
            let store = match config.open_store() {
                Ok(store) => store,
                Err(e) => {
                    eprintln!("shadow-exec: {:#}", e);
                    return exit_code(shadow_exec::error::EXIT_INJECTION_FAILED);
                }
            };

            let flags = PolicyFlags::new()
                .with_pristine(pristine)
                .with_strict(strict)
                .with_no_clobber(no_clobber)
                .with_strict_value(strict_value.unwrap_or(config.strict_value))
                .with_no_paths(config::no_paths_from_env());

            let program = command.remove(0);
            let request = ExecRequest {
                services,
                command: program,
                args: command,
                flags,
            };

            let result = execute(
                &request,
                &Environment::capture(),
                &store,
                &ProcessLauncher::new(),
                |collision| eprintln!("warning: {}", collision),
            );

            match result {
                Ok(code) => exit_code(code),
                Err(e) => {
                    eprintln!("shadow-exec: {}", e);
                    exit_code(e.exit_code())
                }
            }
        }
    }
}

/// Codes outside 0..=255 cannot be reported as-is and become 1.
fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
