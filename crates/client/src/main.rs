//! Depot CLI
//!
//! Command-line client for a Depot server: store credentials, browse, and
//! transfer files.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use client::{upload_file, Credentials, DepotClient};

/// Depot CLI - interact with a Depot server.
#[derive(Parser, Debug)]
#[command(name = "depot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to credentials file (default: ~/.depot/credentials.json)
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub credentials: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Store credentials for a server
    Login {
        /// Server endpoint URL (e.g. http://localhost:3000)
        endpoint: String,

        /// Username to authenticate as
        username: String,

        /// Password (prompted on stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// List files in a remote directory
    Ls {
        /// Directory to list
        #[arg(default_value = "/")]
        dir: String,
    },

    /// Download a remote file
    Download {
        /// Remote file path
        remote: String,

        /// Local destination (defaults to the remote basename)
        local: Option<PathBuf>,
    },

    /// Upload a local file
    Upload {
        /// Local file to upload
        local: PathBuf,

        /// Remote directory to place it in
        #[arg(default_value = "/")]
        remote_dir: String,
    },

    /// Create a remote directory
    Mkdir {
        /// Directory to create
        dir: String,

        /// Create missing parents
        #[arg(long, short)]
        recursive: bool,
    },

    /// Manage users on the server (requires manageUsers)
    #[command(subcommand)]
    User(UserCommands),

    /// Manage roles on the server (requires manageUsers)
    #[command(subcommand)]
    Role(RoleCommands),
}

/// Remote user administration.
#[derive(Subcommand, Debug, Clone)]
pub enum UserCommands {
    /// Add a user
    Add {
        username: String,
        role: String,
        /// Password for the new user (prompted on stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Update a user's role and/or password
    Update {
        username: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },

    /// Delete a user
    Delete { username: String },
}

/// Remote role administration.
#[derive(Subcommand, Debug, Clone)]
pub enum RoleCommands {
    /// Add a role
    Add {
        role: String,
        permissions: Vec<String>,
    },

    /// Replace a role's permissions
    Update {
        role: String,
        permissions: Vec<String>,
    },

    /// Delete a role
    Delete { role: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Login {
            endpoint,
            username,
            password,
        } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password(&username)?,
            };
            let creds = Credentials::new(endpoint, username.clone(), password);
            let path = creds.save(cli.credentials.as_deref())?;
            println!("Credentials saved for {} at {}", username, path.display());
            return Ok(());
        }
        command => {
            let depot = connect(cli.credentials.as_deref())?;
            run_command(command, &depot).await?;
        }
    }

    Ok(())
}

fn connect(credentials_file: Option<&std::path::Path>) -> anyhow::Result<DepotClient> {
    let credentials = Credentials::resolve(None, None, None, credentials_file)?;
    Ok(DepotClient::new(credentials)?)
}

async fn run_command(command: Commands, depot: &DepotClient) -> anyhow::Result<()> {
    match command {
        Commands::Login { .. } => unreachable!("handled before connecting"),
        Commands::Ls { dir } => {
            for name in depot.list(&dir).await? {
                println!("{name}");
            }
        }
        Commands::Download { remote, local } => {
            let local = local.unwrap_or_else(|| {
                PathBuf::from(remote.rsplit('/').next().unwrap_or(remote.as_str()))
            });
            let file = tokio::fs::File::create(&local).await?;
            let bytes = depot.download_to(&remote, file).await?;
            println!("Downloaded {} ({} bytes)", local.display(), bytes);
        }
        Commands::Upload { local, remote_dir } => {
            let name = local
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("local path has no file name"))?
                .to_string_lossy();
            let remote_path = format!("{}/{}", remote_dir.trim_end_matches('/'), name);
            upload_file(depot, &local, &remote_path).await?;
            println!("Uploaded {} to {}", local.display(), remote_path);
        }
        Commands::Mkdir { dir, recursive } => {
            depot.mkdir(&dir, recursive).await?;
            println!("Directory created: {dir}");
        }
        Commands::User(cmd) => match cmd {
            UserCommands::Add {
                username,
                role,
                password,
            } => {
                let password = match password {
                    Some(p) => p,
                    None => prompt_password(&username)?,
                };
                println!("{}", depot.add_user(&username, &password, &role).await?);
            }
            UserCommands::Update {
                username,
                role,
                password,
            } => {
                println!(
                    "{}",
                    depot
                        .update_user(&username, password.as_deref(), role.as_deref())
                        .await?
                );
            }
            UserCommands::Delete { username } => {
                println!("{}", depot.delete_user(&username).await?);
            }
        },
        Commands::Role(cmd) => match cmd {
            RoleCommands::Add { role, permissions } => {
                println!("{}", depot.add_role(&role, &permissions).await?);
            }
            RoleCommands::Update { role, permissions } => {
                println!("{}", depot.update_role(&role, &permissions).await?);
            }
            RoleCommands::Delete { role } => {
                println!("{}", depot.delete_role(&role).await?);
            }
        },
    }
    Ok(())
}

/// Prompt for a password on stdin.
fn prompt_password(username: &str) -> anyhow::Result<String> {
    eprint!("Enter password for {username}: ");
    std::io::stderr().flush()?;
    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("empty password, aborting");
    }
    Ok(password)
}
