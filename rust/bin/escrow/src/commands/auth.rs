//! Login / register / logout / whoami.

use std::path::Path;

use anyhow::Result;
use escrow_client::{RegisterRequest, Role};
use escrow_session::{navigation_for, Session};

use super::Client;

pub async fn login(email: &str, password: &str, config_path: &Path) -> Result<()> {
    let client = Client::open(config_path)?;
    let session = client
        .auth_flow()
        .login(email, password)
        .await
        .map_err(|e| anyhow::anyhow!("Login failed: {}", e.user_message()))?;
    println!(
        "Signed in as {} ({}).",
        session.identity.name, session.role
    );
    Ok(())
}

pub async fn register(req: RegisterRequest, config_path: &Path) -> Result<()> {
    let client = Client::open(config_path)?;
    let session = client
        .auth_flow()
        .register(req)
        .await
        .map_err(|e| anyhow::anyhow!("Registration failed: {}", e.user_message()))?;
    println!(
        "Registered and signed in as {} ({}).",
        session.identity.name, session.role
    );
    Ok(())
}

pub async fn logout(config_path: &Path) -> Result<()> {
    let client = Client::open(config_path)?;
    client.auth_flow().logout().await;
    println!("Signed out.");
    Ok(())
}

pub async fn whoami(json: bool, config_path: &Path) -> Result<()> {
    let client = Client::open(config_path)?;
    let session = client.require_session().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&session.identity)?);
        return Ok(());
    }
    print_session(&session);
    Ok(())
}

fn print_session(session: &Session) {
    let user = &session.identity;
    println!("id:    {}", user.id);
    println!("name:  {}", user.name);
    if !user.email.is_empty() {
        println!("email: {}", user.email);
    }
    if let Some(phone) = &user.phone {
        println!("phone: {}", phone);
    }
    println!("role:  {}", session.role);
    if session.role == Role::Unresolved {
        println!("(role not yet assigned; showing the default navigation)");
    }
    println!();
    println!("Navigation:");
    for item in navigation_for(session.role) {
        println!("  {:<20} {}", item.label, item.route);
    }
}
