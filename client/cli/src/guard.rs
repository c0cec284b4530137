//! Master password and confirmation prompts for destructive commands.

use crate::config::Config;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::io::{self, BufRead, Write};

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn prompt_password(prompt: &str) -> anyhow::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    Ok(rpassword::read_password()?)
}

/// Ask for a new master password twice.
pub fn prompt_new_password() -> anyhow::Result<String> {
    let password = prompt_password("New master password: ")?;
    let confirm = prompt_password("Confirm password: ")?;

    if password != confirm {
        anyhow::bail!("Passwords do not match");
    }
    if password.len() < 4 {
        anyhow::bail!("Password must be at least 4 characters");
    }
    Ok(password)
}

fn prompt_yes_no(question: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Gate a destructive action.
///
/// With a master password configured the password is always required,
/// `assume_yes` or not. Otherwise the user confirms unless `assume_yes`.
pub fn confirm_destructive(config: &Config, question: &str, assume_yes: bool) -> anyhow::Result<bool> {
    if let Some(hash) = &config.master_password_hash {
        let password = prompt_password("Master password: ")?;
        if !verify_password(&password, hash)? {
            tracing::warn!("Rejected destructive action: wrong master password");
            anyhow::bail!("Incorrect master password");
        }
        return Ok(true);
    }

    if assume_yes {
        return Ok(true);
    }
    prompt_yes_no(question)
}
