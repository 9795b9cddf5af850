//! `wirechat`: terminal client for the wirechat real-time channel.

mod config;
mod console;
mod session;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;
use wirechat_client::{ChannelManager, Endpoint, WsTransport};
use wirechat_gate::{DASHBOARD_PATH, Decision, RouteTable, SessionGate, resume_target};

use crate::config::Config;
use crate::console::Console;
use crate::session::FileSession;
use crate::store::ContactsStore;

#[derive(Parser)]
#[command(name = "wirechat", version, about = "Terminal client for wirechat")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to ./wirechat.toml).
    #[arg(long, global = true, env = config::CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Application origin, e.g. https://app.example.com.
    #[arg(long, global = true, env = "WIRECHAT_ORIGIN")]
    origin: Option<Url>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a view and keep the channel running (default).
    Run {
        /// Location to open, e.g. /chat/42.
        #[arg(default_value = DASHBOARD_PATH)]
        path: String,
    },
    /// Store a session token.
    Login {
        token: String,
        /// Login location that sent you here; prints where to resume.
        #[arg(long)]
        from: Option<String>,
    },
    /// Forget the stored session token.
    Logout,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = Config::discover(cli.config.as_deref())?;
    let session = Arc::new(FileSession::new(config.session.credentials_path()));

    match cli.command {
        Some(Commands::Login { token, from }) => {
            session.login(&token)?;
            if let Some(from) = from {
                println!("{}", resume_target(&from));
            }
            Ok(())
        }
        Some(Commands::Logout) => session.logout(),
        Some(Commands::Run { path }) => run(cli.origin, config, session, &path).await,
        None => run(cli.origin, config, session, DASHBOARD_PATH).await,
    }
}

async fn run(
    origin: Option<Url>,
    config: Config,
    session: Arc<FileSession>,
    path: &str,
) -> anyhow::Result<()> {
    let routes = RouteTable::new()?;
    let gate = SessionGate::new(session.clone());

    let mut target = routes.resolve(path);
    match gate.check(&target) {
        Decision::Proceed => {}
        Decision::RedirectToDashboard => target = routes.resolve(DASHBOARD_PATH),
        decision @ Decision::RedirectToLogin { .. } => {
            let login = decision.location().unwrap_or_default();
            bail!("not signed in; run `wirechat login <token> --from '{login}'`");
        }
    }
    if !target.requires_auth {
        bail!("sign in with `wirechat login <token>`");
    }
    info!(route = %target.name, path = %target.full_path, "opened");

    let token = session.token().context("session holds no token")?;
    let origin = origin
        .or(config.origin)
        .context("no origin configured; set `origin` in wirechat.toml or pass --origin")?;
    let endpoint = Endpoint::from_origin(&origin)?;

    let store = Arc::new(ContactsStore::new());
    if let Some(peer) = target.contact_id {
        store.focus(Some(peer.parse()?));
    }

    let manager = ChannelManager::new(endpoint, config.channel, WsTransport, store.clone());
    manager.connect(token.clone())?;

    Console::new(manager, store, token)
        .run(BufReader::new(tokio::io::stdin()))
        .await
}
