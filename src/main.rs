#![deny(rust_2018_idioms, clippy::all, clippy::pedantic)]

use std::{num::NonZeroU64, path::PathBuf, time::UNIX_EPOCH};

use anyhow::{Context, Result};
use log::info;
use secrecy::{ExposeSecret, SecretString};
use tinytotp_core::store::{self, record_offset, SecretStore};
use tinytotp_gen::Totp;
use tinytotp_store::{FileStore, DEFAULT_SIZE};
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, Opt, TimeArgs};

mod cli;

fn main() -> Result<()> {
    let opt = Opt::parse();

    init_logging(opt.verbose);

    match opt.cmd {
        Command::Code { slot, secret, time } => {
            code(opt.store, opt.step, (!secret).then_some(slot), &time)
        }
        Command::Save { slot } => save(opt.store, slot),
        Command::Erase { slot } => erase(opt.store, slot),
        Command::Completions { shell } => cli::completions(shell),
        Command::Manpages { dir } => cli::manpages(&dir),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(path: Option<PathBuf>) -> Result<FileStore> {
    match path {
        Some(path) => FileStore::open(&path, DEFAULT_SIZE)
            .with_context(|| format!("failed opening the store at `{}`", path.display())),
        None => FileStore::open_default().context("failed opening the default store"),
    }
}

fn prompt_secret() -> Result<SecretString> {
    Ok(SecretString::new(rpassword::prompt_password(
        "Secret (Base32):",
    )?))
}

fn code(
    store: Option<PathBuf>,
    step: NonZeroU64,
    slot: Option<usize>,
    time: &TimeArgs,
) -> Result<()> {
    let mut totp = Totp::with_step(step);

    match slot {
        Some(slot) => {
            let mut store = open_store(store)?;
            totp.load_secret(&mut store, record_offset(slot))
                .with_context(|| format!("no valid secret in slot {slot}"))?;
        }
        None => {
            let secret = prompt_secret()?;
            totp.update_secret(secret.expose_secret().trim())?;
        }
    }

    let (code, timestamp) = match (time.time, &time.date) {
        (Some(timestamp), _) => (totp.generate(timestamp)?, timestamp),
        (None, Some(date)) => {
            let code = totp.generate_at(date)?;
            // generate_at already rejected dates before the epoch.
            (code, u64::try_from(date.to_timestamp()).unwrap_or_default())
        }
        (None, None) => {
            let timestamp = UNIX_EPOCH.elapsed()?.as_secs();
            (totp.generate(timestamp)?, timestamp)
        }
    };

    println!("{code}");
    println!("valid for {}s", totp.remaining(timestamp));

    Ok(())
}

fn save(store: Option<PathBuf>, slot: usize) -> Result<()> {
    let mut store = open_store(store)?;
    let offset = record_offset(slot);

    if store::load_record(&mut store, offset).is_ok() {
        println!("Slot {slot} already contains a secret");

        let resp = rprompt::prompt_reply("Overwrite? [yN] ")?;

        if !matches!(resp.as_str(), "y" | "Y") {
            println!("Save cancelled");
            return Ok(());
        }
    }

    let secret = prompt_secret()?;
    let mut totp = Totp::new();
    totp.update_secret(secret.expose_secret().trim())
        .context("invalid secret")?;
    totp.save_secret(&mut store, offset)?;

    println!("Saved secret into slot {slot}");

    Ok(())
}

fn erase(store: Option<PathBuf>, slot: usize) -> Result<()> {
    let mut store = open_store(store)?;
    store::erase_record(&mut store, record_offset(slot))?;

    info!("erased slot {slot} of {} bytes store", store.size());
    println!("Erased slot {slot}");

    Ok(())
}
