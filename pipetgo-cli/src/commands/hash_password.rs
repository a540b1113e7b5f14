//! Produce an Argon2id hash for seeding accounts by hand

use std::io::BufRead;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;

use pipetgo_server::auth::hash_password;
use pipetgo_server::models::check_password_policy;

#[derive(Parser, Debug)]
pub struct HashPasswordArgs {
    /// Password to hash; read from stdin when omitted
    pub password: Option<String>,

    /// Hash even if the password fails the account policy
    #[arg(long)]
    pub skip_policy: bool,
}

pub fn run_hash_password(args: HashPasswordArgs) -> Result<()> {
    let password = match args.password {
        Some(p) => p,
        None => read_line().context("failed to read password from stdin")?,
    };
    if password.is_empty() {
        bail!("password is empty");
    }
    if !args.skip_policy {
        check_password_policy(&password).map_err(|e| anyhow!("{e}"))?;
    }

    let hash = hash_password(&password)?;
    println!("{hash}");
    Ok(())
}

fn read_line() -> std::io::Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
