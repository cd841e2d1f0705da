mod cli; // Declare the cli module

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use switchboard_core::kernel::constants::DEFAULT_STORE_FILE;
use switchboard_core::{
    FileOptionStore, Framework, KernelError, Mode, ModuleKey, PassReport, SiteManifest, StaticHost,
};
use tracing_subscriber::EnvFilter;

/// Switchboard: switch a site's modules on, pause them or turn them off
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Site manifest describing spaces, modules, dependencies and host state
    #[arg(long)]
    site: PathBuf,

    /// File holding persisted modes, states and module options
    #[arg(long, global = true, default_value = DEFAULT_STORE_FILE)]
    store: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Handle one request: report state changes, run the lifecycle, then end the request
    Run,
    /// Show every module's mode, state and unmet dependencies
    Status,
    /// Set the mode of a module; it takes effect on the next run
    SetMode {
        /// ID of the space owning the module
        space: String,
        /// ID of the module
        module: String,
        /// The requested mode
        #[arg(value_enum)]
        mode: ModeArg,
    },
    /// The framework is being deactivated: force every module off
    Deactivate,
    /// The framework is being uninstalled: uninstall every module
    Uninstall,
    /// A plugin is being deactivated: force off the modules it ships
    PluginDeactivated {
        /// Plugin file, e.g. "shop-pack/shop-pack.php"
        file: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Off,
    Pause,
    On,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Off => Mode::Off,
            ModeArg::Pause => Mode::Pause,
            ModeArg::On => Mode::On,
        }
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    match execute(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Send tracing output and bridged `log` records to stderr.
///
/// `RUST_LOG` overrides the level chosen by `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {}", e);
        return;
    }
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records to tracing: {}", e);
    }
}

fn execute(args: &CliArgs) -> Result<(), KernelError> {
    let mut framework = open_framework(&args.site, &args.store)?;

    match &args.command {
        Commands::Run => {
            let report = framework.handle_request()?;
            print_pass(&report.pass);
            let ended = framework.end_request();
            print_pass(&ended);
            if report.pass.is_empty() && ended.is_empty() {
                println!("No lifecycle changes.");
            }
        }
        Commands::Status => print_status(&framework)?,
        Commands::SetMode { space, module, mode } => {
            let key = ModuleKey::new(space, module);
            let mode = Mode::from(*mode);
            if framework.set_mode(&key, mode)? {
                println!("Mode of {} set to {}.", key, mode);
            } else {
                println!("Mode of {} is already {}.", key, mode);
            }
        }
        Commands::Deactivate => print_pass(&framework.on_framework_deactivated()?),
        Commands::Uninstall => print_pass(&framework.on_framework_uninstalled()?),
        Commands::PluginDeactivated { file } => {
            let report = framework.on_plugin_deactivated(file)?;
            if report.deactivated.is_empty() {
                println!("No modules are hosted by plugin '{}'.", file);
            }
            print_pass(&report);
        }
    }
    Ok(())
}

fn open_framework(site: &Path, store: &Path) -> Result<Framework, KernelError> {
    info!("Loading site manifest from {}", site.display());
    let manifest = SiteManifest::load(site)?;
    let store = FileOptionStore::new(store.to_path_buf())?;

    let mut framework = Framework::new(Box::new(store), Box::new(StaticHost::new()));
    framework.register_connector(Box::new(cli::CliConnector));
    manifest.install(&mut framework)?;
    Ok(framework)
}

fn print_keys(label: &str, keys: &[ModuleKey]) {
    for key in keys {
        println!("{}: {}", label, key);
    }
}

fn print_pass(report: &PassReport) {
    print_keys("Activated", &report.activated);
    print_keys("Started", &report.started);
    print_keys("Resumed", &report.resumed);
    print_keys("Paused", &report.paused);
    print_keys("Deactivated", &report.deactivated);
    print_keys("Uninstalled", &report.uninstalled);
    print_keys("Shut down", &report.shut_down);
    for failure in &report.failures {
        println!("Failed: {}", failure);
    }
}

fn print_status(framework: &Framework) -> Result<(), KernelError> {
    let statuses = framework.statuses()?;
    if statuses.is_empty() {
        println!("No modules registered.");
        return Ok(());
    }

    println!("Modules:");
    for status in statuses {
        println!(
            "  - {} ({}): mode {}, state {} (saved {})",
            status.key, status.name, status.mode, status.current_state, status.saved_state
        );
        if !status.unmet.is_empty() {
            println!("      unmet dependencies: {}", status.unmet.join(", "));
        }
    }
    Ok(())
}
