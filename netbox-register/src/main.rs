//! netbox-register - registers this system with NetBox
//!
//! Exactly one action per invocation:
//! - `--register` creates the VM record with its interfaces and addresses
//! - `--compare` prints a diff between this system and its record
//! - `--delete` removes the record
//! - `--update` deletes and registers again

use clap::error::ErrorKind;
use clap::{ArgGroup, Parser};
use netbox_register::config::{Config, DEFAULT_CONFIG_PATH};
use netbox_register::discovery::{self, InterfaceFilter, SystemFacts};
use netbox_register::error::{RegisterError, EXIT_FAILURE, EXIT_MISMATCH, EXIT_OK};
use netbox_register::lifecycle::{Registrar, RegistrationReport};
use netbox_register::report::render_table;
use netbox_register::NetboxClient;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "netbox-register", version)]
#[command(about = "Registers this system with NetBox and keeps the record in line")]
#[command(arg_required_else_help = true)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["register", "compare", "delete", "update"])
))]
struct Cli {
    /// Registers the system with netbox
    #[arg(short, long)]
    register: bool,

    /// Compares the system parameters with its registration on netbox
    #[arg(short, long)]
    compare: bool,

    /// Deletes the system from netbox
    #[arg(short, long)]
    delete: bool,

    /// Updates the system parameters on netbox
    #[arg(short, long)]
    update: bool,

    /// Configuration file
    #[arg(long, env = "NETBOX_REGISTER_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Register,
    Compare,
    Delete,
    Update,
}

impl Cli {
    fn action(&self) -> Action {
        if self.register {
            Action::Register
        } else if self.compare {
            Action::Compare
        } else if self.delete {
            Action::Delete
        } else {
            Action::Update
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return ExitCode::from(usage_error(e)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("netbox_register=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if !nix::unistd::geteuid().is_root() {
        eprintln!("Error. must be root to execute.\nExiting.");
        return ExitCode::from(EXIT_FAILURE);
    }

    match run(cli.action(), &cli.config) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{e}\nExiting.");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Print a clap error and pick the exit code; help and version are not failures
fn usage_error(err: clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            EXIT_OK
        }
        ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            println!("No arguments were specified.\nExiting.");
            let _ = err.print();
            EXIT_FAILURE
        }
        _ => {
            let _ = err.print();
            EXIT_FAILURE
        }
    }
}

fn run(action: Action, config_path: &Path) -> Result<u8, RegisterError> {
    let config = Config::load(config_path)?;
    let client = NetboxClient::new(&config.host, &config.token)?;
    let registrar = Registrar::new(&client, &config.register);
    let filter = InterfaceFilter::new(config.register.interface_prefix.as_str());

    match action {
        Action::Compare => {
            println!("[comparing system]");
            let facts = SystemFacts::discover(&filter)?;
            let comparison = registrar.compare(&facts)?;
            println!("\n{}\n", render_table(&comparison));

            if comparison.all_match() {
                println!("No Differences occured.\nExiting.");
                Ok(EXIT_OK)
            } else {
                eprintln!("A difference between Netbox and this System has been detected.");
                eprintln!("Run netbox-register --update for updating this system onto netbox");
                Ok(EXIT_MISMATCH)
            }
        }
        Action::Delete => {
            println!("[deleting system]");
            let hostname = discovery::hostname()?;
            registrar.delete(&hostname)?;
            Ok(EXIT_OK)
        }
        Action::Register => {
            println!("[register system]");
            let facts = SystemFacts::discover(&filter)?;
            let report = registrar.register(&facts)?;
            print_registration(&report);
            Ok(EXIT_OK)
        }
        Action::Update => {
            println!("[updating system]");
            let facts = SystemFacts::discover(&filter)?;
            let report = registrar.update(&facts)?;
            print_registration(&report);
            Ok(EXIT_OK)
        }
    }
}

fn print_registration(report: &RegistrationReport) {
    for failure in &report.failures {
        warn!(
            "{} of \"{}\" was not registered: {}",
            failure.step, failure.name, failure.error
        );
    }

    if report.is_complete() {
        println!("Successfully registered \"{}\".", report.vm.name);
    } else {
        println!(
            "Registered \"{}\" with {} failed step(s).",
            report.vm.name,
            report.failures.len()
        );
    }
    info!(
        "{} interface(s) registered for \"{}\"",
        report.interfaces.len(),
        report.vm.name
    );
}
