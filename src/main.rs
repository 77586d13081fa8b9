//! mangashelf server entry point.

use clap::Parser;
use mangashelf::{
    auth::AuthService,
    catalog::CatalogSource,
    config::{Cli, Command, Config, UserCommand},
    db::Database,
    server,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Find or load config
    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let config = if let Some(ref path) = config_path {
        Config::load(path)?
    } else {
        Config::default()
    };

    match cli.command {
        Some(Command::Init { force }) => cmd_init(force).await,
        Some(Command::User { action }) => cmd_user(action, &config).await,
        Some(Command::Catalog { series }) => cmd_catalog(series, &config).await,
        Some(Command::Serve { bind, content }) => cmd_serve(config, bind, content).await,
        None => cmd_serve(config, None, None).await,
    }
}

/// Initialize config and data files.
async fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());

    let config = Config::default();
    let db = Database::open(&config.storage.data_dir)?;
    for file in db.init_files()? {
        println!("Created {}", db.dir().join(file).display());
    }
    std::fs::create_dir_all(&config.storage.content_dir)?;
    std::fs::create_dir_all(config.storage.avatars_dir())?;

    let index = config.storage.index_path();
    if !index.exists() {
        std::fs::write(&index, "{\n  \"series\": []\n}\n")?;
        println!("Created {}", index.display());
    }

    println!(
        "\nAdd series to {} and chapters under {}.",
        index.display(),
        config.storage.content_dir.display()
    );
    println!("Then run: mangashelf serve");

    Ok(())
}

/// User management commands.
async fn cmd_user(action: UserCommand, config: &Config) -> anyhow::Result<()> {
    let db = Database::open(&config.storage.data_dir)?;
    let auth = AuthService::new(
        db,
        config.auth.session_days,
        config.auth.registration_enabled(),
    );

    match action {
        UserCommand::Add { username, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password("Password: ")?,
            };

            let user = auth.create_user(&username, &password)?;
            println!("Created user: {} (id: {})", user.username, user.id);
        }

        UserCommand::Del { username } => {
            if auth.delete_user(&username)? {
                println!("Deleted user: {}", username);
            } else {
                println!("User not found: {}", username);
            }
        }

        UserCommand::List => {
            let users = auth.list_users()?;
            if users.is_empty() {
                println!("No users found.");
            } else {
                println!("{:<24} {:<38} CREATED", "USERNAME", "ID");
                println!("{}", "-".repeat(90));
                for user in users {
                    println!(
                        "{:<24} {:<38} {}",
                        user.username,
                        user.id,
                        user.created_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }

        UserCommand::Passwd { username, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password("New password: ")?,
            };

            if auth.change_password(&username, &password)? {
                println!("Password changed for user: {}", username);
            } else {
                println!("User not found: {}", username);
            }
        }
    }

    Ok(())
}

/// Print the built catalog, or one series, as JSON.
async fn cmd_catalog(series: Option<String>, config: &Config) -> anyhow::Result<()> {
    let source = CatalogSource::from_config(config);

    let json = match series {
        Some(id) => match source.load_series(&id)? {
            Some(series) => serde_json::to_string_pretty(&series)?,
            None => anyhow::bail!("Series not found: {}", id),
        },
        None => serde_json::to_string_pretty(&source.load()?)?,
    };

    println!("{}", json);
    Ok(())
}

/// Start the server.
async fn cmd_serve(
    mut config: Config,
    bind: Option<std::net::SocketAddr>,
    content: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(addr) = bind {
        config.server.bind = addr;
    }
    if let Some(dir) = content {
        config.storage.content_dir = dir;
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mangashelf=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = Database::open(&config.storage.data_dir)?;
    let created = db.init_files()?;
    if !created.is_empty() {
        tracing::info!(files = ?created, "Created empty data files");
    }

    if !config.storage.index_path().exists() {
        tracing::warn!(
            path = %config.storage.index_path().display(),
            "Series metadata file not found; the catalog will fail until it exists"
        );
    }

    let auth = AuthService::new(
        db.clone(),
        config.auth.session_days,
        config.auth.registration_enabled(),
    );

    tracing::info!(
        bind = %config.server.bind,
        data = %config.storage.data_dir.display(),
        content = %config.storage.content_dir.display(),
        "Starting mangashelf server"
    );

    let bind_addr = config.server.bind;
    let state = server::AppState::new_with_db(config, db, auth);
    let app = server::create_router(state);

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!(address = %bind_addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Prompt for password input.
fn prompt_password(prompt: &str) -> anyhow::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;

    Ok(password.trim().to_string())
}
