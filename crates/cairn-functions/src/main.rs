//! cairn-functions binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `CAIRN_`
//! environment variables, opens the SQLite store and either serves the
//! callable functions over HTTP or runs an administrative command.
//!
//! ```text
//! cairn-functions serve
//! cairn-functions bootstrap-admin <uid>
//! cairn-functions create-account --email hiker@example.com < password.txt
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use cairn_core::auth::{AuthService, NewAccount};
use cairn_functions::{AppState, RoleService, ServerConfig};
use cairn_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Cairn callable functions")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the callable functions (the default).
  Serve,
  /// Grant the admin role to `uid` without a calling admin.
  BootstrapAdmin { uid: String },
  /// Create an account; the password is read from stdin.
  CreateAccount {
    #[arg(long)]
    email:        String,
    #[arg(long)]
    display_name: Option<String>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg: ServerConfig = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CAIRN"))
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(server_cfg, store).await,
    Command::BootstrapAdmin { uid } => {
      let change = RoleService::new(Arc::clone(&store), store)
        .bootstrap_admin(&uid)
        .await
        .context("failed to bootstrap admin")?;
      println!("{}", change.message);
      Ok(())
    }
    Command::CreateAccount { email, display_name } => {
      let password = read_password()?;
      let user = store
        .create_account(NewAccount { email, password, display_name, photo_url: None })
        .await
        .context("failed to create account")?;
      println!("{}", user.uid);
      Ok(())
    }
  }
}

async fn serve(server_cfg: ServerConfig, store: Arc<SqliteStore>) -> anyhow::Result<()> {
  let app = cairn_functions::router(AppState::new(Arc::clone(&store), store));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line).context("failed to read password")?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
