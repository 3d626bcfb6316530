use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use vigil::{config, App, Credentials, Enrollment, ListenerEvent, SignupForm};
use vigil_client::TrainedData;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(
    version,
    about = "Client for the vigil camera backend - streams, face enrollment and intrusion alerts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change the backend address
    Server {
        #[command(subcommand)]
        action: ServerAction,
    },
    /// Create an account
    Signup {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        /// Repeat the password
        #[arg(short, long)]
        confirm: String,
    },
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// End the session
    Logout,
    /// Register this device's push token
    Token {
        token: String,
    },
    /// Manage camera streams
    Streams {
        #[command(subcommand)]
        action: StreamAction,
    },
    /// Upload face images for a person
    Enroll {
        /// Person's name
        #[arg(short, long)]
        name: String,
        /// Captured images, sent in order
        images: Vec<PathBuf>,
    },
    /// Manage people the backend has face data for
    Trained {
        #[command(subcommand)]
        action: TrainedAction,
    },
    /// Print intrusion notifications until Ctrl+C
    Watch,
    /// Open config file in editor
    Config,
}

#[derive(Subcommand)]
enum ServerAction {
    /// Print the stored address
    Show,
    /// Probe the address and store it if it answers
    Set { host: String, port: String },
}

#[derive(Subcommand)]
enum StreamAction {
    List,
    Add { name: String, url: String },
    Delete { name: String },
}

#[derive(Subcommand)]
enum TrainedAction {
    List,
    Delete { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let mut app = App::open(None, None)?;

    match cli.command {
        Commands::Server { action } => server(&mut app, action).await,
        Commands::Signup {
            email,
            password,
            confirm,
        } => {
            let form = SignupForm {
                email,
                password,
                confirm_password: confirm,
            };
            let message = app.signup(&form).await?;
            info!("✓ {}", message);
            Ok(())
        }
        Commands::Login { email, password } => {
            let session = app
                .login(&Credentials::new(email, password))
                .await
                .context("Login failed")?;
            info!("✓ Logged in as user {}", session.user_id);
            Ok(())
        }
        Commands::Logout => {
            match app.logout().await.context("Logout failed")? {
                Some(message) => info!("✓ {}", message),
                None => warn!("Local session cleared, but the server did not confirm the logout"),
            }
            Ok(())
        }
        Commands::Token { token } => {
            app.register_device(&token)
                .await
                .context("Unable to send token to server")?;
            info!("✓ Device token registered");
            Ok(())
        }
        Commands::Streams { action } => streams(&app, action).await,
        Commands::Enroll { name, images } => enroll(&app, name, images).await,
        Commands::Trained { action } => trained(&app, action).await,
        Commands::Watch => watch(&app).await,
        Commands::Config => open_config(),
    }
}

async fn server(app: &mut App, action: ServerAction) -> Result<()> {
    match action {
        ServerAction::Show => {
            let endpoint = app.server();
            if endpoint.is_configured() {
                info!("Server: {}:{}", endpoint.host, endpoint.port);
            } else {
                info!("No server configured. Run 'server set <host> <port>'.");
            }
        }
        ServerAction::Set { host, port } => {
            let endpoint = app
                .set_server(&host, &port)
                .await
                .context("Server settings were not changed")?;
            info!("✓ Server set to {}:{}", endpoint.host, endpoint.port);
        }
    }
    Ok(())
}

async fn streams(app: &App, action: StreamAction) -> Result<()> {
    let api = app.client()?;
    let mut registry = app.stream_registry();

    let entries = match action {
        StreamAction::List => registry.list(&api).await.context("Failed to fetch streams")?,
        StreamAction::Add { name, url } => registry
            .add(&api, &name, &url)
            .await
            .context("Failed to add stream")?,
        StreamAction::Delete { name } => registry
            .delete(&api, &name)
            .await
            .context("Failed to delete stream")?,
    };

    if entries.is_empty() {
        info!("No streams added");
    }
    for entry in entries {
        info!("{}  {}", entry.name, entry.url);
    }
    Ok(())
}

async fn enroll(app: &App, name: String, images: Vec<PathBuf>) -> Result<()> {
    let mut enrollment = Enrollment::new(name);
    for path in images {
        enrollment.add_image(path);
    }
    let count = enrollment.images().len();

    app.upload(&mut enrollment)
        .await
        .context("Error uploading images")?;
    info!("✓ Uploaded {} image(s)", count);
    Ok(())
}

async fn trained(app: &App, action: TrainedAction) -> Result<()> {
    let api = app.client()?;
    let mut trained = TrainedData::new();

    match action {
        TrainedAction::List => {
            let names = trained.list(&api).await.context("Error fetching data")?;
            if names.is_empty() {
                info!("No trained data");
            }
            for name in names {
                info!("{}", name);
            }
        }
        TrainedAction::Delete { name } => {
            trained
                .delete(&api, &name)
                .await
                .context("Error deleting name")?;
            info!("✓ Deleted {}", name);
        }
    }
    Ok(())
}

async fn watch(app: &App) -> Result<()> {
    let mut listener = app
        .listen()
        .await
        .context("Failed to open notification socket")?;
    info!("Listening for notifications. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = listener.next_event() => match event {
                Some(ListenerEvent::Detection(event)) => info!("{}", event),
                Some(ListenerEvent::Escalation { camera_id, count }) => warn!(
                    "Multiple Unknown Identities Detected - Camera ID: {} ({} times)",
                    camera_id, count
                ),
                None => break,
            }
        }
    }

    let stats = listener.stats();
    listener.close().await;
    info!(
        "Received {} notification(s), {} unknown since last alert",
        stats.received(),
        stats.unknown()
    );
    Ok(())
}

fn open_config() -> Result<()> {
    let config_path = config::CONFIG_PATH.as_os_str();
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    if !config::CONFIG_PATH.exists() {
        config::save_config(&config::Config::default(), None)?;
    }
    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
