//! User administration command handlers

use std::io::{BufRead, Write};
use std::sync::Arc;

use crate::config::Config;
use crate::services::{AuthError, AuthService};
use crate::state::SharedState;

async fn auth_service(config: &Config) -> anyhow::Result<Arc<dyn AuthService>> {
    let shared = SharedState::new(config.clone()).await?;
    Ok(shared.auth_service)
}

/// Uses the flag value when given, otherwise reads one line from stdin.
fn resolve_password(password: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    print!("Password: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn cmd_user_add(
    config: &Config,
    name: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let password = resolve_password(password)?;
    let service = auth_service(config).await?;

    match service.register(name, &password).await {
        Ok(user) => {
            println!("✓ Created user '{}' (ID: {})", user.name, user.id);
            Ok(())
        }
        Err(AuthError::Conflict(_)) => {
            println!("A user named '{name}' already exists.");
            Ok(())
        }
        Err(AuthError::Validation(msg)) => {
            println!("Invalid input: {msg}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn cmd_user_list(config: &Config) -> anyhow::Result<()> {
    let service = auth_service(config).await?;
    let users = service.list_users().await?;

    if users.is_empty() {
        println!("No users.");
        println!();
        println!("Add one with: warden user add <name>");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<70}", "");

    for user in users {
        println!("{:>5}  {}", user.id, user.name);
        println!(
            "       created {} | updated {}",
            user.created_at.format("%Y-%m-%d %H:%M:%S"),
            user.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}

pub async fn cmd_user_remove(config: &Config, name: &str, yes: bool) -> anyhow::Result<()> {
    let service = auth_service(config).await?;

    let Some(user) = service.find_by_name(name).await? else {
        println!("User '{name}' not found.");
        return Ok(());
    };

    if !yes {
        println!("Remove user '{}' (ID: {})?", user.name, user.id);
        println!("Enter 'y' to confirm, anything else to cancel:");

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    match service.remove_user(name).await {
        Ok(()) => println!("✓ Removed: {name}"),
        Err(AuthError::NotFound) => println!("User '{name}' not found."),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

pub async fn cmd_user_passwd(
    config: &Config,
    name: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let password = resolve_password(password)?;
    let service = auth_service(config).await?;

    match service.change_password(name, &password).await {
        Ok(_) => println!("✓ Password updated for '{name}'"),
        Err(AuthError::NotFound) => println!("User '{name}' not found."),
        Err(AuthError::Validation(msg)) => println!("Invalid input: {msg}"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

pub async fn cmd_user_rotate_key(config: &Config, name: &str) -> anyhow::Result<()> {
    let service = auth_service(config).await?;

    match service.rotate_auth_key(name).await {
        Ok(user) => {
            println!("✓ Auth key rotated for '{}'", user.name);
            println!("New key: {}", user.auth_key);
        }
        Err(AuthError::NotFound) => println!("User '{name}' not found."),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

pub async fn cmd_user_verify_key(config: &Config, name: &str, key: &str) -> anyhow::Result<()> {
    let service = auth_service(config).await?;

    match service.validate_auth_key(name, key).await {
        Ok(true) => println!("✓ Auth key matches"),
        Ok(false) => println!("✗ Auth key does not match"),
        Err(AuthError::NotFound) => println!("User '{name}' not found."),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

pub async fn cmd_user_verify_password(
    config: &Config,
    name: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let password = resolve_password(password)?;
    let service = auth_service(config).await?;

    if service.validate_password(name, &password).await? {
        println!("✓ Password matches");
    } else {
        println!("✗ Password does not match");
    }

    Ok(())
}
