use bazaar::{
    config::Settings,
    db,
    models::User,
    repositories::SqliteUserRepository,
    services::{
        user_service::{CreateUserRequest, UpdatePasswordRequest, UserService},
        SqliteSessionIssuer,
    },
};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "bazaar-cli")]
#[command(about = "Administrative tasks for the Bazaar shop backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User management commands
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Session token maintenance
    Tokens {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create an account without the email verification round-trip
    Create {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,

        /// Leave the account inactive until it is activated
        #[arg(long)]
        inactive: bool,

        /// Grant staff access to catalog management
        #[arg(long)]
        staff: bool,
    },

    /// Create an active staff superuser
    CreateSuperuser {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// List users, newest first
    List {
        /// Maximum number of users to display
        #[arg(short, long, default_value_t = 100)]
        limit: i64,

        /// Offset for pagination
        #[arg(short = 'o', long, default_value_t = 0)]
        offset: i64,
    },

    /// Activate (or deactivate) an account
    Activate {
        #[arg(short, long)]
        email: String,

        #[arg(long)]
        deactivate: bool,
    },

    /// Set a new password for a user
    SetPassword {
        #[arg(short, long)]
        email: String,

        /// New password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Delete a user together with their carts, comments and tokens
    Delete {
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Remove expired access and refresh tokens
    Purge,
}

fn get_password(prompt: &str) -> anyhow::Result<String> {
    use std::io::{self, Write};
    print!("{}: ", prompt);
    io::stdout().flush()?;

    Ok(rpassword::read_password()?)
}

/// Uses the flag value when given, otherwise prompts twice.
fn password_pair(flag: Option<String>, prompt: &str) -> anyhow::Result<(String, String)> {
    match flag {
        Some(pw) => Ok((pw.clone(), pw)),
        None => {
            let password = get_password(prompt)?;
            let confirm = get_password("Confirm password")?;
            Ok((password, confirm))
        }
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("❌ {}", message);
    std::process::exit(1);
}

async fn find_user(service: &UserService, email: &str) -> User {
    match service.find_user_by_email(email).await {
        Ok(Some(user)) => user,
        Ok(None) => fail(format!("User '{}' not found", email)),
        Err(err) => fail(format!("Failed to find user: {}", err)),
    }
}

fn joined(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

async fn create(service: &UserService, request: CreateUserRequest) {
    match service.create_user(request).await {
        Ok(user) => {
            println!("✅ User created successfully!");
            println!("  ID: {}", user.id);
            println!("  Username: {}", user.username);
            println!("  Email: {}", user.email);
            println!("  Active: {}", user.is_active);
            println!("  Staff: {}", user.is_staff);
        }
        Err(err) => fail(format!("Failed to create user: {}", err)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    // Connect to database
    let pool = db::create_pool(&settings.database_url).await?;
    db::run_migrations(&pool).await?;

    let user_service = UserService::new(Arc::new(SqliteUserRepository::new(pool.clone())));

    match cli.command {
        Commands::User { command } => match command {
            UserCommands::Create {
                username,
                email,
                password,
                inactive,
                staff,
            } => {
                let (password, password_confirm) = password_pair(password, "Password")?;
                let request = CreateUserRequest {
                    username,
                    email,
                    password,
                    password_confirm: Some(password_confirm),
                    is_active: !inactive,
                    is_staff: staff,
                    is_superuser: false,
                };
                create(&user_service, request).await;
            }

            UserCommands::CreateSuperuser {
                username,
                email,
                password,
            } => {
                let (password, password_confirm) = password_pair(password, "Password")?;
                let mut request = CreateUserRequest::superuser(username, email, password);
                request.password_confirm = Some(password_confirm);
                create(&user_service, request).await;
            }

            UserCommands::List { limit, offset } => {
                let users = match user_service.list_users(Some(limit), Some(offset)).await {
                    Ok(users) => users,
                    Err(err) => fail(format!("Failed to list users: {}", err)),
                };

                if users.is_empty() {
                    println!("No users found.");
                    return Ok(());
                }

                println!(
                    "{:<5} {:<20} {:<35} {:<7} {:<6} {:<16}",
                    "ID", "Username", "Email", "Active", "Staff", "Joined"
                );
                println!("{}", "-".repeat(92));
                for user in users {
                    println!(
                        "{:<5} {:<20} {:<35} {:<7} {:<6} {:<16}",
                        user.id,
                        user.username,
                        user.email,
                        if user.is_active { "Yes" } else { "No" },
                        if user.is_staff || user.is_superuser { "Yes" } else { "No" },
                        joined(user.date_joined)
                    );
                }
            }

            UserCommands::Activate { email, deactivate } => {
                let user = find_user(&user_service, &email).await;
                let active = !deactivate;

                if user.is_active == active {
                    println!(
                        "ℹ️  User '{}' is already {}",
                        email,
                        if active { "active" } else { "inactive" }
                    );
                    return Ok(());
                }

                match user_service.set_active(user.id, active).await {
                    Ok(()) => println!(
                        "✅ User '{}' {}",
                        email,
                        if active { "activated" } else { "deactivated" }
                    ),
                    Err(err) => fail(format!("Failed to update user: {}", err)),
                }
            }

            UserCommands::SetPassword { email, password } => {
                let user = find_user(&user_service, &email).await;
                let (new_password, confirm) = password_pair(password, "New password")?;

                let request = UpdatePasswordRequest {
                    user_id: user.id,
                    new_password,
                    new_password_confirm: Some(confirm),
                };

                match user_service.update_password(request).await {
                    Ok(()) => println!("✅ Password updated successfully for '{}'!", email),
                    Err(err) => fail(format!("Failed to update password: {}", err)),
                }
            }

            UserCommands::Delete { email } => {
                let user = find_user(&user_service, &email).await;
                match user_service.delete_user(user.id).await {
                    Ok(()) => println!("✅ User '{}' deleted successfully!", email),
                    Err(err) => fail(format!("Failed to delete user: {}", err)),
                }
            }
        },

        Commands::Tokens { command } => match command {
            TokenCommands::Purge => {
                let issuer = SqliteSessionIssuer::new(
                    pool.clone(),
                    settings.access_token_ttl_secs,
                    settings.refresh_token_ttl_secs,
                );
                match issuer.purge_expired().await {
                    Ok(removed) => println!("✅ Removed {} expired tokens", removed),
                    Err(err) => fail(format!("Failed to purge tokens: {}", err)),
                }
            }
        },
    }

    Ok(())
}
