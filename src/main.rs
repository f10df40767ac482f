use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod api;
mod auth;
mod config;
mod db;
mod error;
mod narration;
mod provider;
mod rewrite;
mod speech;

use api::routes::{create_router, AppState, Settings};
use config::Config;
use db::schema::Dialect;
use db::{Database, NewHistory, ProfileFields, Project};
use error::AppError;
use rewrite::RewriteService;
use speech::{AudioStore, SpeechService};

#[derive(Parser)]
#[command(name = "tonecast-server", version, about = "Tone rewriting and text-to-speech server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the database schema for a SQL dialect
    Schema {
        #[arg(long, default_value = "sqlite")]
        dialect: Dialect,
    },
    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "admin")]
        role: String,
    },
    /// Insert a demo user with a filled profile and some history
    SeedDemo,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().expect("Invalid configuration");

    let result = match cli.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await
        }
        Command::Schema { dialect } => {
            print!("{}", db::schema::render_script(dialect));
            Ok(())
        }
        Command::CreateAdmin {
            name,
            email,
            password,
            role,
        } => create_admin(&config, &name, &email, &password, &role).await,
        Command::SeedDemo => seed_demo(&config).await,
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn serve(config: Config) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|_| AppError::Internal(format!("Invalid address {}", config.bind_address())))?;

    tracing::info!("Tonecast Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Database: {}", config.database_url);
    tracing::info!("Audio directory: {}", config.audio_dir.display());

    let db = Database::connect(&config.database_url).await?;

    let rewriter = RewriteService::from_config(&config);
    let speech = SpeechService::from_config(&config);
    tracing::info!("Rewrite providers: {:?}", rewriter.provider_names());
    tracing::info!("Speech providers: {:?}", speech.provider_names());

    let audio = AudioStore::new(&config.audio_dir);
    audio.ensure_dir().await?;

    let state = Arc::new(AppState {
        db,
        rewriter,
        speech,
        audio,
        settings: Settings {
            default_user_email: config.default_user_email.clone(),
            admin_session_hours: config.admin_session_hours,
            static_dir: config.static_dir.clone(),
        },
        started_at: Instant::now(),
    });

    let app = create_router(state);

    tracing::info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn create_admin(
    config: &Config,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::BadRequest("Password must not be empty".into()));
    }

    let db = Database::connect(&config.database_url).await?;
    let hash = auth::hash_password(password)?;
    let id = db.create_admin(name, email, &hash, role).await?;
    println!("Created admin {} <{}> with id {}", name, email, id);
    Ok(())
}

const DEMO_EMAIL: &str = "demo@tonecast.local";

async fn seed_demo(config: &Config) -> Result<(), AppError> {
    let db = Database::connect(&config.database_url).await?;
    let user = db.get_or_create_user(DEMO_EMAIL, "Demo Student").await?;

    let profile = ProfileFields {
        location: Some("Bengaluru".into()),
        university: Some("Tonecast University".into()),
        course: Some("Computer Science".into()),
        year: Some("3".into()),
        gpa: Some(3.8),
        bio: Some("Turns lecture notes into audiobooks.".into()),
        ..ProfileFields::default()
    };
    db.update_user(user.id, None, &profile).await?;

    let skills = vec!["Rust".to_string(), "Public speaking".to_string()];
    let interests = vec!["Audiobooks".to_string(), "Podcasting".to_string()];
    let achievements = vec!["Dean's list".to_string()];
    let projects = vec![Project {
        name: "Lecture Narrator".into(),
        description: Some("Reads course notes aloud".into()),
        tech: Some("Rust, SQLite".into()),
        url: None,
    }];
    db.apply_profile_lists(
        user.id,
        Some(skills.as_slice()),
        Some(interests.as_slice()),
        Some(achievements.as_slice()),
        Some(projects.as_slice()),
    )
    .await?;

    if db.list_history(user.id, 1).await?.is_empty() {
        let samples = [
            (
                "The storm rolled in over the hills.",
                "The storm crept silently over the darkening hills...",
                "suspenseful",
                "david",
            ),
            (
                "You can finish this course.",
                "You have everything it takes to finish this course!",
                "inspiring",
                "zira",
            ),
        ];
        for (original_text, rewritten_text, tone, voice) in samples {
            db.save_history(&NewHistory {
                user_id: user.id,
                original_text,
                rewritten_text,
                tone,
                voice,
            })
            .await?;
        }
    }

    println!("Demo user ready: {} (id {})", DEMO_EMAIL, user.id);
    Ok(())
}
