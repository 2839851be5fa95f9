// src/cli/account.rs — `pomotask adduser`

use crate::api::handlers::validate_registration;
use crate::auth::hash_password;
use crate::infra::config::Config;
use crate::store;

pub async fn run_adduser(config: &Config, name: &str) -> anyhow::Result<()> {
    let username = name.trim();
    let password = super::read_password("Password:")?;
    let confirmation = if std::env::var("POMOTASK_PASSWORD").is_ok() {
        password.clone()
    } else {
        super::read_password("Confirm password:")?
    };
    validate_registration(username, &password, &confirmation)?;

    let store = store::open(&config.database.resolved_path())?;
    if store.find_user_by_username(username)?.is_some() {
        anyhow::bail!("Username already exists.");
    }
    let id = store.insert_user(username, &hash_password(&password)?)?;
    println!("Created user {username} (id {id}).");
    Ok(())
}
