pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crosssell_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use crosssell_core::cross_selling::ResolutionMode;

use crate::commands::resolve::ResolveRequest;

#[derive(Debug, Parser)]
#[command(
    name = "crosssell",
    about = "Product cross-selling operator CLI",
    long_about = "Migrate and seed the cross-selling catalog, inspect configuration, and resolve the cross-selling groups of a product.",
    after_help = "Examples:\n  crosssell migrate\n  crosssell seed\n  crosssell resolve --product-id demo-camera-x100\n  crosssell --database-url sqlite::memory: resolve --seed --product-id demo-camera-x100 --mode concurrent"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Read configuration from this TOML file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override database.url")]
    database_url: Option<String>,
    #[arg(long, global = true, help = "Override logging.level")]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load and verify the deterministic demo catalog")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Resolve the cross-selling groups of a product as JSON")]
    Resolve {
        #[arg(long, help = "Main product whose cross-sellings are resolved")]
        product_id: String,
        #[arg(long, help = "Sales channel the request runs under")]
        sales_channel: Option<String>,
        #[arg(long, help = "Group resolution mode: sequential or concurrent")]
        mode: Option<ResolutionMode>,
        #[arg(long, help = "Migrate and load the demo catalog before resolving")]
        seed: bool,
    },
}

impl GlobalArgs {
    fn load_options(&self, overrides: ConfigOverrides) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config.clone(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                log_level: self.log_level.clone(),
                ..overrides
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let command_overrides = match &cli.command {
        Command::Resolve { sales_channel, mode, .. } => ConfigOverrides {
            resolution_mode: *mode,
            default_sales_channel: sales_channel.clone(),
            ..ConfigOverrides::default()
        },
        _ => ConfigOverrides::default(),
    };
    let options = cli.global.load_options(command_overrides);

    // A broken config is reported by the command itself.
    if let Ok(config) = AppConfig::load(options.clone()) {
        if let Err(error) = logging::init(&config.logging) {
            eprintln!("warning: {error:#}");
        }
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(options),
        Command::Seed => commands::seed::run(options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Resolve { product_id, seed, .. } => {
            commands::resolve::run(options, ResolveRequest { product_id, seed })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
