use std::env;
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use log::{LevelFilter, debug, info, warn};
use tokio::net::TcpListener;

use userapi::api;
use userapi::db::Database;
use userapi::settings::{self, APP_NAME, AppConfig, AppPaths};
use userapi::user::SqliteUserRepository;

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = RuntimeContext::new(cli.global)?;

    if matches!(cli.command, Command::Serve(_)) {
        ctx.init_tracing();
    } else {
        ctx.init_cli_logging();
    }
    debug!("resolved paths: {}", ctx.paths);

    match cli.command {
        Command::Serve(cmd) => run_server(ctx, cmd),
        Command::Init { force } => handle_init(&ctx, force),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Userapi - user records REST service.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct GlobalOpts {
    /// Config file or directory holding config.toml
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// -v for debug, -vv for trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Plain log output (also honours NO_COLOR)
    #[arg(long = "no-color", global = true)]
    no_color: bool,
    /// Log one JSON object per line
    #[arg(long = "json-logs", global = true)]
    json_logs: bool,
    /// Report file writes instead of doing them
    #[arg(long = "dry-run", global = true)]
    dry_run: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeCommand),
    /// Write the default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Inspect and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct ServeCommand {
    /// Host address to bind to (overrides config)
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
    /// SQLite database file (overrides config)
    #[arg(long, value_name = "PATH", conflicts_with = "in_memory")]
    database: Option<PathBuf>,
    /// Keep users in memory only
    #[arg(long = "in-memory")]
    in_memory: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show {
        #[arg(long, value_enum, default_value_t = ShowFormat::Toml)]
        format: ShowFormat,
    },
    /// Print the resolved config file path
    Path,
    /// Overwrite the config file with defaults
    Reset,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShowFormat {
    Toml,
    Json,
    Yaml,
}

struct RuntimeContext {
    global: GlobalOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(global: GlobalOpts) -> Result<Self> {
        let paths = AppPaths::discover(global.config.clone())?;
        let config = settings::load_or_init_config(&paths, global.dry_run)?;
        Ok(Self {
            global,
            paths,
            config,
        })
    }

    /// Server logging: tracing spans from the handlers and tower-http,
    /// with `log` records from this binary forwarded into the same output.
    fn init_tracing(&self) {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        let level = self.log_level().as_str().to_lowercase();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("userapi={level},tower_http={level}")));

        let registry = tracing_subscriber::registry().with(filter);
        if self.global.json_logs {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .ok();
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_ansi(self.use_color()))
                .try_init()
                .ok();
        }
    }

    /// One-shot commands only emit a few `log` lines.
    fn init_cli_logging(&self) {
        let style = if self.use_color() {
            env_logger::WriteStyle::Auto
        } else {
            env_logger::WriteStyle::Never
        };
        env_logger::Builder::new()
            .filter_level(self.log_level())
            .parse_default_env()
            .write_style(style)
            .try_init()
            .ok();
    }

    fn use_color(&self) -> bool {
        !self.global.no_color && env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal()
    }

    fn log_level(&self) -> LevelFilter {
        if self.global.quiet {
            return LevelFilter::Error;
        }
        match self.global.verbose {
            0 => self
                .config
                .logging
                .level
                .parse()
                .unwrap_or(LevelFilter::Info),
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn handle_init(ctx: &RuntimeContext, force: bool) -> Result<()> {
    let path = &ctx.paths.config_file;
    if path.exists() && !force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        ));
    }

    if ctx.global.dry_run {
        info!("dry-run: would write default config to {}", path.display());
        return Ok(());
    }

    settings::write_default_config(path)?;
    info!("Wrote default config to {}", path.display());
    Ok(())
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show { format } => {
            let rendered = match format {
                ShowFormat::Toml => {
                    toml::to_string_pretty(&ctx.config).context("serializing config to TOML")?
                }
                ShowFormat::Json => serde_json::to_string_pretty(&ctx.config)
                    .context("serializing config to JSON")?,
                ShowFormat::Yaml => {
                    serde_yaml::to_string(&ctx.config).context("serializing config to YAML")?
                }
            };
            println!("{}", rendered.trim_end());
        }
        ConfigCommand::Path => println!("{}", ctx.paths.config_file.display()),
        ConfigCommand::Reset => {
            if ctx.global.dry_run {
                info!(
                    "dry-run: would reset config at {}",
                    ctx.paths.config_file.display()
                );
            } else {
                settings::write_default_config(&ctx.paths.config_file)?;
            }
        }
    }
    Ok(())
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    Ok(())
}

#[tokio::main]
async fn run_server(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    let database = if cmd.in_memory || (cmd.database.is_none() && ctx.config.database.in_memory)
    {
        info!("Using in-memory database; users are lost on exit");
        Database::in_memory().await?
    } else {
        let db_path = match cmd.database {
            Some(path) => path,
            None => ctx.config.database_path(&ctx.paths)?,
        };
        info!("Database path: {}", db_path.display());
        Database::new(&db_path, ctx.config.database.max_connections).await?
    };

    let users = Arc::new(SqliteUserRepository::new(database.pool().clone()));
    let state =
        api::AppState::new(users).with_allowed_origins(ctx.config.cors.allowed_origins.clone());
    let app = api::create_router(state);

    let host = cmd.host.unwrap_or_else(|| ctx.config.server.host.clone());
    let port = cmd.port.unwrap_or(ctx.config.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_stop())
        .await
        .context("running server")?;

    database.pool().close().await;
    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn wait_for_stop() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable, stopping on Ctrl+C only: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Stop signal received, draining connections");
}
