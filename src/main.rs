//! Binary entrypoint for the menuflow CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml` and sample locale files
//! - `check` - build and compile the configured menu, print a JSON report
//! - `console [--locale <l>] [--recipient <id>]` - drive the menu from the terminal
//!
//! See the library crate docs for module-level details: `menuflow::`.
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use menuflow::config::{build_menu, sample_locale, Config};
use menuflow::i18n::{Catalog, TextResolver};
use menuflow::menu::{Menu, NodeId};
use menuflow::metrics;
use menuflow::transport::memory::MemoryTransport;

#[derive(Parser)]
#[command(name = "menuflow")]
#[command(about = "Conversational inline menus for chat bots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration and locale files
    Init,
    /// Compile the configured menu for every locale and report
    Check,
    /// Navigate the configured menu from the terminal
    Console {
        /// Locale to start in (defaults to bot.default_locale)
        #[arg(short, long)]
        locale: Option<String>,

        /// Recipient id used for the dialog
        #[arg(short, long, default_value = "console")]
        recipient: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            info!("Initializing new menuflow configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);

            let cfg = Config::default();
            tokio::fs::create_dir_all(&cfg.bot.locale_dir).await?;
            for locale in &cfg.bot.locales {
                let Some(sample) = sample_locale(locale) else {
                    continue;
                };
                let path = Path::new(&cfg.bot.locale_dir).join(format!("{locale}.toml"));
                tokio::fs::write(&path, sample).await?;
                info!("Locale file created at {}", path.display());
            }
        }
        Commands::Check => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            let catalog = Arc::new(Catalog::load_dir(&config.bot.locale_dir).await?);
            let transport = Arc::new(MemoryTransport::new());
            match build_menu(&config, transport.clone(), catalog) {
                Ok(menu) => {
                    let root_options: serde_json::Map<String, serde_json::Value> = menu
                        .locales()
                        .into_iter()
                        .map(|locale| {
                            let labels = menu
                                .option_set(NodeId::ROOT, &locale)
                                .map(|set| {
                                    set.labels().into_iter().map(str::to_string).collect()
                                })
                                .unwrap_or_else(Vec::<String>::new);
                            (locale, serde_json::json!(labels))
                        })
                        .collect();
                    let payload = serde_json::json!({
                        "status": "ok",
                        "flow_id": menu.id(),
                        "node_count": menu.node_count(),
                        "locales": menu.locales(),
                        "handlers": transport.handler_count(),
                        "root_options": root_options,
                    });
                    println!("{}", payload);
                }
                Err(e) => {
                    error!("menu {} failed to compile: {}", config.bot.flow_id, e);
                    let payload = serde_json::json!({
                        "status": "error",
                        "flow_id": config.bot.flow_id,
                        "error": e.to_string(),
                    });
                    println!("{}", payload);
                    std::process::exit(1);
                }
            }
        }
        Commands::Console { locale, recipient } => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            let catalog = Arc::new(Catalog::load_dir(&config.bot.locale_dir).await?);
            let transport = Arc::new(MemoryTransport::new());
            let menu = build_menu(&config, transport.clone(), catalog.clone())?;
            let locale = locale.unwrap_or_else(|| config.bot.default_locale.clone());
            let greeting = catalog.resolve(&config.bot.greeting, &locale);
            menu.start(&recipient, &greeting, &locale)?;
            info!("Console session for {} in {}", recipient, locale);
            run_console(menu, transport, &recipient).await?;
            println!("{}", serde_json::json!(metrics::snapshot()));
        }
    }

    Ok(())
}

async fn run_console(menu: Arc<Menu>, transport: Arc<MemoryTransport>, recipient: &str) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let labels = render(&transport, recipient);
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.eq_ignore_ascii_case("q") {
            break;
        }
        let label = match input.parse::<usize>() {
            Ok(n) if (1..=labels.len()).contains(&n) => labels[n - 1].clone(),
            _ => {
                println!("Pick 1-{} or q", labels.len());
                continue;
            }
        };
        let transport = transport.clone();
        let sender = recipient.to_string();
        let pressed = tokio::task::spawn_blocking(move || transport.press_label(&sender, &label))
            .await
            .map_err(|e| anyhow!("selection task failed: {}", e))?;
        if let Err(e) = pressed {
            warn!("selection not delivered: {}", e);
        }
    }
    menu.stop(recipient)?;
    Ok(())
}

/// Print the recipient's current message and return its option labels.
fn render(transport: &MemoryTransport, recipient: &str) -> Vec<String> {
    let Some(displayed) = transport.displayed(recipient) else {
        return Vec::new();
    };
    println!();
    println!("{}", displayed.text);
    let labels: Vec<String> = displayed
        .options
        .labels()
        .into_iter()
        .map(str::to_string)
        .collect();
    for (i, label) in labels.iter().enumerate() {
        println!("  {}. {}", i + 1, label);
    }
    labels
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });
    if let Some(f) = log_file {
        let write_mutex = Arc::new(std::sync::Mutex::new(f));
        // Only echo to the console when stdout is a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
