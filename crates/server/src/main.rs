//! Depot Server
//!
//! Serves a directory tree as a remote, authenticated filesystem, and
//! manages the local users file without starting the server.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use server::auth::{hash_password, UserRecord, UserStore, UserUpdate};
use server::config::Config;
use server::files::FileGateway;
use server::http::{router, AppState};

/// Depot server - authenticated remote filesystem over HTTP.
#[derive(Parser, Debug)]
#[command(name = "depot-server")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the server.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the Depot server
    Start {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory for uploaded files
        #[arg(short, long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Path to the users file
        #[arg(long, value_name = "FILE")]
        users: Option<PathBuf>,
    },

    /// Manage the local users file without starting the server
    #[command(subcommand)]
    User(UserCommands),

    /// Manage roles in the local users file
    #[command(subcommand)]
    Role(RoleCommands),
}

/// Subcommands for user management.
#[derive(Subcommand, Debug, Clone)]
pub enum UserCommands {
    /// Add a new user
    Add {
        /// Username
        username: String,

        /// Role assigned to the user
        role: String,

        /// Password (prompted on stdin when omitted)
        #[arg(long)]
        password: Option<String>,

        /// Path to the users file
        #[arg(long, value_name = "FILE")]
        users: Option<PathBuf>,
    },

    /// Update an existing user
    Update {
        /// Username to update
        username: String,

        /// New role
        #[arg(long)]
        role: Option<String>,

        /// New password
        #[arg(long)]
        password: Option<String>,

        /// Path to the users file
        #[arg(long, value_name = "FILE")]
        users: Option<PathBuf>,
    },

    /// Remove a user
    Delete {
        /// Username to delete
        username: String,

        /// Path to the users file
        #[arg(long, value_name = "FILE")]
        users: Option<PathBuf>,
    },
}

/// Subcommands for role management.
#[derive(Subcommand, Debug, Clone)]
pub enum RoleCommands {
    /// Add a new role
    Add {
        /// Role name
        role: String,

        /// Permissions granted to the role
        permissions: Vec<String>,

        /// Path to the users file
        #[arg(long, value_name = "FILE")]
        users: Option<PathBuf>,
    },

    /// Replace an existing role's permissions
    Update {
        /// Role name
        role: String,

        /// Permissions granted to the role
        permissions: Vec<String>,

        /// Path to the users file
        #[arg(long, value_name = "FILE")]
        users: Option<PathBuf>,
    },

    /// Remove a role
    Delete {
        /// Role name
        role: String,

        /// Path to the users file
        #[arg(long, value_name = "FILE")]
        users: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration before logging so the configured level applies.
    let mut config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?
    };
    config.apply_env_overrides();

    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.server.log_level.clone()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Start { port, root, users } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(root) = root {
                config.storage.root = root;
            }
            if let Some(users) = users {
                config.auth.users_file = users;
            }
            config.validate()?;

            run_server(config).await?;
        }
        Commands::User(cmd) => run_user_command(cmd, &config)?,
        Commands::Role(cmd) => run_role_command(cmd, &config)?,
    }

    Ok(())
}

/// Start the HTTP server and block until a shutdown signal arrives.
async fn run_server(config: Config) -> anyhow::Result<()> {
    let gateway = Arc::new(FileGateway::new(&config.storage.root)?);
    let store = Arc::new(UserStore::load(&config.auth.users_file)?);
    let app = router(
        AppState::new(gateway.clone(), store),
        config.storage.max_upload_size,
    );

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Depot server listening on {}", listener.local_addr()?);
    tracing::info!("Uploads root: {}", gateway.root().display());
    tracing::info!("Users file: {}", config.auth.users_file.display());

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }
}

/// Open the users file named on the command line, or the configured one.
fn open_store(override_path: Option<PathBuf>, config: &Config) -> anyhow::Result<UserStore> {
    let path = override_path.unwrap_or_else(|| config.auth.users_file.clone());
    Ok(UserStore::load(path)?)
}

/// Prompt for a password on stdin.
fn prompt_password(username: &str) -> anyhow::Result<String> {
    eprint!("Enter password for user \"{username}\": ");
    std::io::stderr().flush()?;
    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("empty password, aborting");
    }
    Ok(password)
}

fn run_user_command(cmd: UserCommands, config: &Config) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Add {
            username,
            role,
            password,
            users,
        } => {
            let store = open_store(users, config)?;
            let password = match password {
                Some(p) => p,
                None => prompt_password(&username)?,
            };
            store.add_user(UserRecord {
                username: username.clone(),
                hashed_password: hash_password(&password)?,
                role,
            })?;
            println!("User \"{username}\" added");
        }
        UserCommands::Update {
            username,
            role,
            password,
            users,
        } => {
            let store = open_store(users, config)?;
            let hashed_password = match password {
                Some(p) => Some(hash_password(&p)?),
                None => None,
            };
            store.update_user(
                &username,
                UserUpdate {
                    hashed_password,
                    role,
                },
            )?;
            println!("User \"{username}\" updated");
        }
        UserCommands::Delete { username, users } => {
            let store = open_store(users, config)?;
            store.remove_user(&username)?;
            println!("User \"{username}\" deleted");
        }
    }
    Ok(())
}

fn run_role_command(cmd: RoleCommands, config: &Config) -> anyhow::Result<()> {
    match cmd {
        RoleCommands::Add {
            role,
            permissions,
            users,
        } => {
            let store = open_store(users, config)?;
            store.add_role(&role, permissions.clone())?;
            println!("Role \"{role}\" added with permissions [{}]", permissions.join(", "));
        }
        RoleCommands::Update {
            role,
            permissions,
            users,
        } => {
            let store = open_store(users, config)?;
            store.update_role(&role, permissions.clone())?;
            println!("Role \"{role}\" updated with permissions [{}]", permissions.join(", "));
        }
        RoleCommands::Delete { role, users } => {
            let store = open_store(users, config)?;
            store.remove_role(&role)?;
            println!("Role \"{role}\" removed");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_start_command_defaults() {
        let cli = Cli::try_parse_from(["depot-server", "start"]).unwrap();
        match cli.command {
            Commands::Start { port, root, users } => {
                assert!(port.is_none());
                assert!(root.is_none());
                assert!(users.is_none());
            }
            _ => panic!("Expected Start command"),
        }
    }

    #[test]
    fn test_start_with_flags() {
        let cli = Cli::try_parse_from([
            "depot-server",
            "start",
            "--port",
            "8080",
            "--root",
            "/srv/depot",
            "--users",
            "/etc/depot/users.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Start { port, root, users } => {
                assert_eq!(port, Some(8080));
                assert_eq!(root, Some(PathBuf::from("/srv/depot")));
                assert_eq!(users, Some(PathBuf::from("/etc/depot/users.json")));
            }
            _ => panic!("Expected Start command"),
        }
    }

    #[test]
    fn test_user_add_command() {
        let cli = Cli::try_parse_from([
            "depot-server",
            "user",
            "add",
            "alice",
            "editor",
            "--password",
            "pw",
        ])
        .unwrap();
        match cli.command {
            Commands::User(UserCommands::Add {
                username,
                role,
                password,
                ..
            }) => {
                assert_eq!(username, "alice");
                assert_eq!(role, "editor");
                assert_eq!(password.as_deref(), Some("pw"));
            }
            _ => panic!("Expected User Add command"),
        }
    }

    #[test]
    fn test_user_update_command() {
        let cli =
            Cli::try_parse_from(["depot-server", "user", "update", "alice", "--role", "viewer"])
                .unwrap();
        match cli.command {
            Commands::User(UserCommands::Update {
                username,
                role,
                password,
                ..
            }) => {
                assert_eq!(username, "alice");
                assert_eq!(role.as_deref(), Some("viewer"));
                assert!(password.is_none());
            }
            _ => panic!("Expected User Update command"),
        }
    }

    #[test]
    fn test_user_delete_command() {
        let cli = Cli::try_parse_from(["depot-server", "user", "delete", "alice"]).unwrap();
        match cli.command {
            Commands::User(UserCommands::Delete { username, .. }) => {
                assert_eq!(username, "alice");
            }
            _ => panic!("Expected User Delete command"),
        }
    }

    #[test]
    fn test_role_add_with_permissions() {
        let cli =
            Cli::try_parse_from(["depot-server", "role", "add", "editor", "read", "write"])
                .unwrap();
        match cli.command {
            Commands::Role(RoleCommands::Add {
                role, permissions, ..
            }) => {
                assert_eq!(role, "editor");
                assert_eq!(permissions, vec!["read", "write"]);
            }
            _ => panic!("Expected Role Add command"),
        }
    }

    #[test]
    fn test_role_delete_command() {
        let cli = Cli::try_parse_from(["depot-server", "role", "delete", "editor"]).unwrap();
        match cli.command {
            Commands::Role(RoleCommands::Delete { role, .. }) => {
                assert_eq!(role, "editor");
            }
            _ => panic!("Expected Role Delete command"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["depot-server", "--config", "/etc/depot.toml", "start"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/depot.toml")));
    }

    #[test]
    fn test_global_verbose_flag() {
        let cli = Cli::try_parse_from(["depot-server", "start", "--verbose"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["depot-server"]).is_err());
    }

    #[test]
    fn test_user_without_subcommand_fails() {
        assert!(Cli::try_parse_from(["depot-server", "user"]).is_err());
    }

    #[test]
    fn test_user_add_requires_role() {
        assert!(Cli::try_parse_from(["depot-server", "user", "add", "alice"]).is_err());
    }
}
