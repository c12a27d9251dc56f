use std::{
    fs::OpenOptions,
    io::{self, Write},
    num::NonZeroU64,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use clap::{ArgAction, ArgGroup, Args, CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::Shell;
use indoc::indoc;
use tinytotp_core::CalendarTime;
use tinytotp_gen::DEFAULT_STEP;
use tinytotp_store::DEFAULT_SLOTS;

const LONG_ABOUT: &str = indoc! {"
    Generate time based one-time passwords (TOTP, RFC 6238).

    Secrets are either entered on demand or kept in a small store file with a fixed amount of
    slots. Codes are always 6 digits long and use HMAC-SHA1, which is what almost every service
    hands out.

    Set RUST_LOG (or pass -v) to get details about what is going on.
"};

#[derive(Parser)]
#[command(about, author, version, long_about = LONG_ABOUT, propagate_version = true)]
pub struct Opt {
    /// Location of the secret store. Defaults to `secrets.bin` in the user's data folder.
    #[arg(long, global = true, env = "TINYTOTP_STORE", value_hint = ValueHint::FilePath)]
    pub store: Option<PathBuf>,
    /// Length of a single time step, in seconds.
    #[arg(long, global = true, env = "TINYTOTP_STEP", default_value_t = DEFAULT_STEP)]
    pub step: NonZeroU64,
    /// Print more details about the operations. Can be given multiple times.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub cmd: Command,
}

impl Opt {
    pub fn parse() -> Self {
        <Opt as Parser>::parse()
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the current code and the seconds until it changes.
    #[command(group(ArgGroup::new("source").args(["slot", "secret"])))]
    Code {
        /// Store slot to load the secret from.
        #[arg(short, long, default_value_t = 0, value_parser = parse_slot)]
        slot: usize,
        /// Ask for the secret instead of loading it from the store.
        #[arg(long)]
        secret: bool,
        #[command(flatten)]
        time: TimeArgs,
    },
    /// Save a secret into a store slot.
    Save {
        /// Store slot to save the secret into.
        #[arg(short, long, value_parser = parse_slot)]
        slot: usize,
    },
    /// Remove the secret from a store slot.
    Erase {
        /// Store slot to erase.
        #[arg(short, long, value_parser = parse_slot)]
        slot: usize,
    },
    /// Generate auto-completion scripts for various shells.
    Completions {
        /// Shell to generate an auto-completion script for.
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Generate man pages into the given directory.
    Manpages {
        /// Target directory, that must already exist and be empty. If the any file with the same
        /// name as any of the man pages already exist, it'll not be overwritten, but instead an
        /// error be returned.
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
    },
}

/// Point in time to generate the code for. Defaults to the current system time.
#[derive(Args)]
#[group(multiple = false)]
pub struct TimeArgs {
    /// Unix timestamp in seconds.
    #[arg(long)]
    pub time: Option<u64>,
    /// Date and time like `2009-02-13 23:31:30`, optionally followed by `Z` or `±HH:MM`.
    #[arg(long)]
    pub date: Option<CalendarTime>,
}

fn parse_slot(value: &str) -> Result<usize, String> {
    let slot = value.parse::<usize>().map_err(|e| e.to_string())?;
    if slot < DEFAULT_SLOTS {
        Ok(slot)
    } else {
        Err(format!("the store only has slots 0 to {}", DEFAULT_SLOTS - 1))
    }
}

#[allow(clippy::unnecessary_wraps)]
pub fn completions(shell: Shell) -> Result<()> {
    clap_complete::generate(
        shell,
        &mut Opt::command(),
        env!("CARGO_PKG_NAME"),
        &mut io::stdout().lock(),
    );
    Ok(())
}

pub fn manpages(dir: &Path) -> Result<()> {
    fn print(dir: &Path, app: &clap::Command) -> Result<()> {
        let name = app.get_display_name().unwrap_or_else(|| app.get_name());
        let out = dir.join(format!("{name}.1"));
        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&out)
            .with_context(|| format!("the file `{}` already exists", out.display()))?;

        clap_mangen::Man::new(app.clone()).render(&mut out)?;
        out.flush()?;

        for sub in app.get_subcommands() {
            print(dir, sub)?;
        }

        Ok(())
    }

    ensure!(dir.try_exists()?, "target directory doesn't exist");

    let mut app = Opt::command();
    app.build();

    print(dir, &app)
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    use super::*;

    fn try_parse(args: &[&str]) -> Result<Opt, clap::Error> {
        Opt::try_parse_from(std::iter::once("tinytotp").chain(args.iter().copied()))
    }

    #[test]
    fn verify_cli() {
        Opt::command().debug_assert();
    }

    #[test]
    fn code_defaults() {
        let opt = try_parse(&["code"]).unwrap();
        assert_eq!(30, opt.step.get());

        match opt.cmd {
            Command::Code { slot, secret, time } => {
                assert_eq!(0, slot);
                assert!(!secret);
                assert_eq!(None, time.time);
                assert_eq!(None, time.date);
            }
            _ => panic!("expected the code command"),
        }
    }

    #[test]
    fn code_with_date() {
        let opt = try_parse(&["--step", "60", "code", "--date", "2009-02-13 23:31:30"]).unwrap();
        assert_eq!(60, opt.step.get());

        match opt.cmd {
            Command::Code { time, .. } => {
                assert_eq!(Some(CalendarTime::utc(2009, 2, 13, 23, 31, 30)), time.date);
            }
            _ => panic!("expected the code command"),
        }
    }

    #[test]
    fn conflicting_args() {
        let err = try_parse(&["code", "--time", "59", "--date", "2009-02-13 23:31:30"])
            .err()
            .unwrap();
        assert_eq!(ErrorKind::ArgumentConflict, err.kind());

        let err = try_parse(&["code", "--slot", "1", "--secret"]).err().unwrap();
        assert_eq!(ErrorKind::ArgumentConflict, err.kind());
    }

    #[test]
    fn secret_alone_ignores_default_slot() {
        let opt = try_parse(&["code", "--secret"]).unwrap();

        match opt.cmd {
            Command::Code { slot, secret, .. } => {
                assert!(secret);
                assert_eq!(0, slot);
            }
            _ => panic!("expected the code command"),
        }

        assert!(try_parse(&["code", "--secret", "--time", "59"]).is_ok());
    }

    #[test]
    fn invalid_values() {
        assert!(try_parse(&["save", "--slot", "8"]).is_err());
        assert!(try_parse(&["save"]).is_err());
        assert!(try_parse(&["--step", "0", "code"]).is_err());
        assert!(try_parse(&["erase", "--slot", "7"]).is_ok());
    }
}
