use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};

use ffdroid_builder::config::loader::{load_patch_from_file, parse_override, save_config_to_file};
use ffdroid_builder::log_collector::get_global_logs_path;
use ffdroid_builder::ui::console;
use ffdroid_builder::ui::log_sink::LogSink;
use ffdroid_builder::{AppController, HttpBackend, LogCollector, SettingsManager};

#[derive(Parser)]
#[command(name = "ffdroid_builder")]
#[command(version)]
#[command(about = "Configure and compile FFmpeg for Android through a build server")]
struct Cli {
    /// Build server base URL (overrides settings)
    #[arg(short, long, global = true)]
    server: Option<String>,

    /// Settings file (default: ~/.config/ffdroid-builder/settings.toml)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Debug-level diagnostic logging
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive configuration wizard (default)
    Wizard,

    /// List the presets offered by the server
    Presets,

    /// Save a configuration on the server
    Save {
        #[command(flatten)]
        config: ConfigArgs,

        /// Also write the configuration to a local JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a build script on the server
    Script {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Start a compilation and follow it until it finishes
    Compile {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the server's stored compile log
    Logs {
        /// Clear the stored log instead of printing it
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
}

/// Non-interactive configuration source, applied in order:
/// preset, then file, then `--set` overrides.
#[derive(Args)]
struct ConfigArgs {
    /// Preset id to start from
    #[arg(short, long)]
    preset: Option<String>,

    /// JSON configuration file merged over the preset
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Field override, e.g. `--set decoders=h264,hevc` (repeatable)
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    overrides: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // =========================================================================
    // SETTINGS AND LOGGING - MUST BE FIRST
    // =========================================================================
    let mut settings = SettingsManager::load(cli.settings.as_deref());
    if let Some(server) = cli.server.clone() {
        settings.server_url = server;
    }

    let log_dir = get_global_logs_path(&settings.log_dir)
        .map_err(|e| anyhow!("Failed to determine logs directory: {}", e))?;
    let log_collector = LogCollector::new(&log_dir)
        .map_err(|e| anyhow!("LogCollector initialization failed: {}", e))?;

    let max_level = if cli.debug || settings.debug_logging {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    if let Err(e) = log_collector.install(max_level) {
        eprintln!("[Main] WARNING: {}", e);
    }
    log::info!(
        "ffdroid_builder {} started, server {}",
        ffdroid_builder::VERSION,
        settings.server_url
    );

    // =========================================================================
    // CONTROLLER SETUP
    // =========================================================================
    let backend = HttpBackend::new(settings.server_url.clone(), settings.request_timeout())
        .context("Failed to create HTTP client")?;
    let mut controller = AppController::new(Arc::new(backend), settings);
    controller.initialize().await;

    let result = run(cli.command.unwrap_or(Commands::Wizard), &mut controller).await;

    controller.shutdown();
    log::info!("ffdroid_builder shutting down");
    if let Err(e) = log_collector.wait_for_empty().await {
        eprintln!("[Main] WARNING: log flush failed: {}", e);
    }
    result
}

async fn run(command: Commands, controller: &mut AppController) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Wizard => {
            console::run_wizard(controller).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Presets => {
            if controller.presets().is_empty() {
                println!("No presets available from {}", controller.settings().server_url);
                return Ok(ExitCode::FAILURE);
            }
            for preset in controller.presets().iter() {
                println!("{:<12} {}  {}", preset.id, preset.name, preset.description);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Save { config, output } => {
            apply_config_args(controller, &config).await?;
            if let Some(path) = output {
                save_config_to_file(controller.config(), &path)?;
                println!("Configuration written to {}", path.display());
            }
            let ok = controller.save_config().await.is_ok();
            report(controller, ok)
        }
        Commands::Script { config } => {
            apply_config_args(controller, &config).await?;
            let ok = controller.generate_script().await.is_ok();
            report(controller, ok)
        }
        Commands::Compile { config } => {
            apply_config_args(controller, &config).await?;
            if let Err(e) = controller.start_compilation().await {
                print_notifications(controller);
                eprintln!("{}", e.user_message());
                return Ok(ExitCode::FAILURE);
            }
            match console::follow_compilation(controller).await {
                Some(outcome) => {
                    print_notifications(controller);
                    Ok(if outcome.success {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::FAILURE
                    })
                }
                None => {
                    eprintln!("Interrupted; the server job keeps running");
                    Ok(ExitCode::from(130))
                }
            }
        }
        Commands::Logs { clear } => {
            if clear {
                let ok = controller.clear_server_logs().await.is_ok();
                return report(controller, ok);
            }
            match controller.fetch_log_history().await {
                Ok(events) => {
                    for event in &events {
                        println!("{}", LogSink::render_line(event));
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(_) => report(controller, false),
            }
        }
    }
}

/// Build the configuration from a preset, a file and `--set` overrides.
async fn apply_config_args(controller: &mut AppController, args: &ConfigArgs) -> anyhow::Result<()> {
    if let Some(preset) = &args.preset {
        controller
            .select_preset(preset)
            .await
            .map_err(|e| anyhow!(e.user_message()))?;
    }
    if let Some(path) = &args.config {
        let patch = load_patch(path)?;
        controller.apply_patch(&patch);
    }
    for raw in &args.overrides {
        let (field, value) = parse_override(raw)?;
        controller
            .set_field(field, value)
            .map_err(|e| anyhow!("--set {}: {}", raw, e.user_message()))?;
    }
    Ok(())
}

fn load_patch(path: &Path) -> anyhow::Result<ffdroid_builder::ConfigPatch> {
    load_patch_from_file(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn print_notifications(controller: &AppController) {
    for line in console::render_notifications(controller) {
        println!("{}", line);
    }
}

fn report(controller: &AppController, ok: bool) -> anyhow::Result<ExitCode> {
    print_notifications(controller);
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
