use clap::{Parser, Subcommand};

mod browser;
mod commands;

#[derive(Parser)]
#[command(name = "mockview-cli", version, about = "Mockview CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Sign in / out of the hosted backend
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Token balance and checkout
    Tokens {
        #[command(subcommand)]
        action: commands::tokens::TokensAction,
    },
    /// Interview management
    Interview {
        #[command(subcommand)]
        action: commands::interview::InterviewAction,
    },
    /// Interview questions
    Question {
        #[command(subcommand)]
        action: commands::question::QuestionAction,
    },
    /// Interview answers
    Answer {
        #[command(subcommand)]
        action: commands::answer::AnswerAction,
    },
    /// Notifications
    Notification {
        #[command(subcommand)]
        action: commands::notification::NotificationAction,
    },
    /// Admin dashboard (requires the admin role)
    Admin {
        #[command(subcommand)]
        action: commands::admin::AdminAction,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Config { action } => commands::config::run(action),
        Commands::Auth { action } => commands::auth::run(action),
        Commands::Tokens { action } => commands::tokens::run(action).await,
        Commands::Interview { action } => commands::interview::run(action).await,
        Commands::Question { action } => commands::question::run(action).await,
        Commands::Answer { action } => commands::answer::run(action).await,
        Commands::Notification { action } => commands::notification::run(action).await,
        Commands::Admin { action } => commands::admin::run(action).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
