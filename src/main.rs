use std::fs;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, info};

use tollgate::api::{self, AppState};
use tollgate::auth::{AuthConfig, TokenCodec};
use tollgate::db::Database;
use tollgate::user::{CreateUserRequest, Role, UserRepository, UserService};

const APP_NAME: &str = "tollgate";
const DB_FILE: &str = "tollgate.db";

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_serve(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    handle_serve(&ctx, cmd).await
}

#[tokio::main]
async fn async_users(ctx: RuntimeContext, cmd: UsersCommand) -> Result<()> {
    handle_users(&ctx, cmd).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging();
    debug!("resolved paths: {:#?}", ctx.paths);

    match cli.command {
        Command::Serve(cmd) => async_serve(ctx, cmd),
        Command::Users { command } => async_users(ctx, command),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Tollgate - stateless JWT authentication service.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Enable debug logging (equivalent to -vv)
    #[arg(long, global = true)]
    debug: bool,
    /// Output machine readable JSON logs
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP authentication server
    Serve(ServeCommand),
    /// Manage users in the identity directory
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },
    /// Inspect the resolved configuration
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
    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,
    /// Port to bind (overrides config)
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Debug, Subcommand)]
enum UsersCommand {
    /// Add a user to the directory
    Add(UsersAddCommand),
    /// List users, including deactivated ones
    List,
    /// Reactivate a user
    Activate { email: String },
    /// Deactivate a user (soft delete)
    Deactivate { email: String },
}

#[derive(Debug, Clone, Args)]
struct UsersAddCommand {
    /// Email address (unique login identifier)
    #[arg(long)]
    email: String,
    /// Given name
    #[arg(long)]
    name: String,
    /// Family name
    #[arg(long)]
    surname: String,
    /// Password (stored as a bcrypt hash)
    #[arg(long)]
    password: String,
    /// Roles: ADMIN, MANAGER, CASHIER (comma-separated)
    #[arg(long, value_delimiter = ',', required = true)]
    roles: Vec<Role>,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the resolved configuration
    Show,
    /// Print the config file path
    Path,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ServerConfig {
    /// Address to bind.
    host: String,
    /// Port to bind.
    port: u16,
    /// Allowed CORS origins. Empty disables cross-origin access.
    allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct LoggingConfig {
    /// Log level when no flag or RUST_LOG overrides it.
    level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct PathsConfig {
    /// Override the data directory (supports ~ and $VARS).
    data_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct AppConfig {
    logging: LoggingConfig,
    server: ServerConfig,
    paths: PathsConfig,
    auth: AuthConfig,
}

#[derive(Debug, Clone)]
struct AppPaths {
    config_file: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    fn discover(override_path: Option<PathBuf>) -> Result<Self> {
        let config_file = match override_path {
            Some(path) => path,
            None => dirs::config_dir()
                .ok_or_else(|| anyhow!("cannot determine config directory"))?
                .join(APP_NAME)
                .join("config.toml"),
        };

        if config_file.parent().is_none() {
            return Err(anyhow!("invalid config file path: {config_file:?}"));
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("cannot determine data directory"))?
            .join(APP_NAME);

        Ok(Self {
            config_file,
            data_dir,
        })
    }

    fn apply_overrides(mut self, cfg: &AppConfig) -> Result<Self> {
        if let Some(ref data_override) = cfg.paths.data_dir {
            self.data_dir = expand_str_path(data_override)?;
        }
        Ok(self)
    }
}

fn expand_str_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .map_err(|e| anyhow!("expanding path {path:?}: {e}"))?
        .into_owned();
    Ok(PathBuf::from(expanded))
}

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let paths = AppPaths::discover(common.config.clone())?;
        let config = load_or_init_config(&paths)?;
        let paths = paths.apply_overrides(&config)?;

        let ctx = Self {
            common,
            paths,
            config,
        };
        ctx.ensure_directories()?;
        Ok(ctx)
    }

    fn effective_level(&self) -> &str {
        if self.common.quiet {
            "error"
        } else if self.common.verbose >= 2 {
            "trace"
        } else if self.common.debug || self.common.verbose == 1 {
            "debug"
        } else {
            self.config.logging.level.as_deref().unwrap_or("info")
        }
    }

    fn init_logging(&self) {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        let level = self.effective_level();
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{APP_NAME}={level},tower_http={level}")));

        if self.common.json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .ok();
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init()
                .ok();
        }
    }

    fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.paths.data_dir).with_context(|| {
            format!("creating data directory {}", self.paths.data_dir.display())
        })
    }
}

fn load_or_init_config(paths: &AppPaths) -> Result<AppConfig> {
    if !paths.config_file.exists() {
        write_default_config(&paths.config_file)?;
    }

    let built = Config::builder()
        .add_source(
            File::from(paths.config_file.as_path())
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(Environment::with_prefix("TOLLGATE").separator("__"))
        .build()
        .context("loading configuration")?;

    let config: AppConfig = built
        .try_deserialize()
        .context("deserializing configuration")?;

    Ok(config)
}

fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let config = AppConfig::default();
    let toml = toml::to_string_pretty(&config).context("serializing default config to TOML")?;
    let mut body = String::new();
    body.push_str("# Configuration for ");
    body.push_str(APP_NAME);
    body.push('\n');
    body.push_str("# File: ");
    body.push_str(&path.display().to_string());
    body.push_str("\n\n");
    body.push_str(&toml);
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

async fn open_directory(ctx: &RuntimeContext) -> Result<(Database, UserService)> {
    let db_path = ctx.paths.data_dir.join(DB_FILE);
    let database = Database::new(&db_path).await?;
    let users = UserService::new(UserRepository::new(database.pool().clone()));
    Ok((database, users))
}

async fn handle_serve(ctx: &RuntimeContext, cmd: ServeCommand) -> Result<()> {
    info!("Starting authentication server...");

    // A bad secret or expiration must stop the process before it binds.
    ctx.config
        .auth
        .validate()
        .context("Invalid auth configuration")?;

    let (_database, users) = open_directory(ctx).await?;
    let codec = TokenCodec::from_config(&ctx.config.auth)?;
    let state = AppState::new(codec, users);

    let app = api::create_router(state, &ctx.config.server.allowed_origins);

    let host = cmd
        .host
        .unwrap_or_else(|| ctx.config.server.host.clone());
    let port = cmd.port.unwrap_or(ctx.config.server.port);
    let addr: SocketAddr = format!("{host}:{port}").parse().context("invalid address")?;

    info!("Listening on http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .context("binding to address")?;

    let shutdown_signal = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("running server")?;

    info!("Shutdown complete");
    Ok(())
}

async fn handle_users(ctx: &RuntimeContext, cmd: UsersCommand) -> Result<()> {
    let (_database, users) = open_directory(ctx).await?;

    match cmd {
        UsersCommand::Add(add) => {
            let user = users
                .create_user(
                    CreateUserRequest {
                        name: add.name,
                        surname: add.surname,
                        email: add.email,
                        password: add.password,
                        roles: add.roles,
                    },
                    "cli",
                )
                .await?;
            println!("Created user {} (id {})", user.email, user.id);
        }
        UsersCommand::List => {
            let all = users.list_users().await?;
            if all.is_empty() {
                println!("No users in the directory.");
                return Ok(());
            }
            for user in all {
                let roles: Vec<String> = user.roles.iter().map(|r| r.to_string()).collect();
                let status = if user.is_active { "active" } else { "inactive" };
                println!(
                    "{:<6} {:<32} {:<9} {}",
                    user.id,
                    user.email,
                    status,
                    roles.join(",")
                );
            }
        }
        UsersCommand::Activate { email } => {
            users.set_active(&email, true, "cli").await?;
            println!("Activated {email}");
        }
        UsersCommand::Deactivate { email } => {
            users.set_active(&email, false, "cli").await?;
            println!("Deactivated {email}");
        }
    }

    Ok(())
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            if ctx.common.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ctx.config)
                        .context("serializing config to JSON")?
                );
            } else {
                println!("{:#?}", ctx.config);
            }
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
            Ok(())
        }
    }
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    Ok(())
}
