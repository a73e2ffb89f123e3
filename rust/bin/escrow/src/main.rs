//! `escrow`: command-line client for the escrow marketplace.
//!
//! Signs in and works the notification feed from a terminal.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use escrow_client::{RegisterRequest, Role};

use crate::config::Environment;

/// Escrow marketplace CLI.
#[derive(Parser, Debug)]
#[command(name = "escrow", about = "Escrow marketplace CLI client")]
struct Cli {
    /// Path to client config file (default: ~/.escrow/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Output format: table or json.
    #[arg(long = "output", short = 'o', global = true, default_value = "table")]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show or change client settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Sign in and store the credential.
    Login {
        /// Account email.
        #[arg(long)]
        email: Option<String>,
        /// Password (prefer the interactive prompt).
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account and sign in.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        /// client or company.
        #[arg(long, default_value = "client")]
        role: Role,
    },

    /// Sign out and forget the credential.
    Logout,

    /// Show the signed-in identity and its navigation.
    Whoami,

    /// Work with notifications.
    #[command(alias = "n")]
    Notifications {
        #[command(subcommand)]
        action: NotificationAction,
    },

    /// Show version.
    Version,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Set properties.
    Set {
        #[arg(long)]
        server: Option<String>,
        /// development or production.
        #[arg(long)]
        environment: Option<Environment>,
    },
}

#[derive(Subcommand, Debug)]
enum NotificationAction {
    /// List one page of notifications.
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Mark one notification as read.
    Read { id: String },
    /// Mark every notification as read.
    ReadAll,
    /// Delete a notification.
    Delete {
        id: String,
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
    /// Poll like the bell does and print changes.
    Watch {
        /// Keep the dropdown open so each tick also refreshes the first page.
        #[arg(long)]
        open: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(config::ClientConfig::default_path);
    let json_output = cli.output == "json";

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&config_path)?,
            ConfigAction::Set {
                server,
                environment,
            } => commands::config::set(server.as_deref(), environment, &config_path)?,
        },

        Commands::Login { email, password } => {
            let email = match email {
                Some(e) => e,
                None => {
                    eprint!("Email: ");
                    let mut s = String::new();
                    std::io::stdin().read_line(&mut s)?;
                    s.trim().to_string()
                }
            };
            let password = match password {
                Some(p) => p,
                None => rpassword::prompt_password("Password: ")?,
            };
            if email.is_empty() || password.is_empty() {
                anyhow::bail!("Email and password are required.");
            }
            commands::auth::login(&email, &password, &config_path).await?;
        }

        Commands::Register {
            name,
            email,
            phone,
            role,
        } => {
            if role == Role::Admin {
                anyhow::bail!("Admin accounts cannot be self-registered.");
            }
            let password = rpassword::prompt_password("Password: ")?;
            let password_confirmation = rpassword::prompt_password("Confirm password: ")?;
            if password.is_empty() {
                anyhow::bail!("Password cannot be empty.");
            }
            let req = RegisterRequest {
                name,
                email,
                phone,
                password,
                password_confirmation,
                role,
            };
            commands::auth::register(req, &config_path).await?;
        }

        Commands::Logout => commands::auth::logout(&config_path).await?,

        Commands::Whoami => commands::auth::whoami(json_output, &config_path).await?,

        Commands::Notifications { action } => match action {
            NotificationAction::List { page } => {
                commands::notifications::list(page, json_output, &config_path).await?
            }
            NotificationAction::Read { id } => {
                commands::notifications::read(&id, &config_path).await?
            }
            NotificationAction::ReadAll => {
                commands::notifications::read_all(&config_path).await?
            }
            NotificationAction::Delete { id, yes } => {
                commands::notifications::delete(&id, yes, &config_path).await?
            }
            NotificationAction::Watch { open } => {
                commands::notifications::watch(open, &config_path).await?
            }
        },

        Commands::Version => {
            println!("escrow cli v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
