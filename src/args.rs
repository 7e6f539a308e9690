/*
 * args.rs
 *
 * Hand-rolled argv parsing, not a derive-macro crate: flags come before the
 * command and everything from the first non-flag token onward belongs to the
 * child's argv verbatim (spec §6), which rules out the usual "trailing
 * varargs" clap idiom anyway. Errors are returned, not printed - main.rs
 * decides how to report them, matching the teacher's separation between
 * parsing and its caller.
 */

use crate::error::{Result, SupervisorError};
use crate::interval::{self, Interval};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub daemonize: bool,
    pub name: Option<String>,
    pub restart_initial: Interval,
    pub cooloff: Interval,
    pub maximum: Interval,
    pub command: Vec<String>,
}

const DEFAULT_RESTART: u64 = 1_000;
const DEFAULT_COOLOFF: u64 = 900_000;
const DEFAULT_MAXIMUM: u64 = 3_600_000;

/// Parse `argv[1..]` (the program name itself is not included).
///
/// Grammar (spec §6):
/// `[-d] [-c cooloff] [-m maximum] [-n name] [-t restart] command [args...]`
pub fn parse(argv: &[String]) -> Result<Config> {
    let mut daemonize = false;
    let mut name = None;
    let mut restart_initial = Interval::from_millis(DEFAULT_RESTART);
    let mut cooloff = Interval::from_millis(DEFAULT_COOLOFF);
    let mut maximum = Interval::from_millis(DEFAULT_MAXIMUM);

    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "-d" => {
                daemonize = true;
                i += 1;
            }
            "-n" => {
                name = Some(take_value(argv, &mut i, "-n")?);
            }
            "-c" => {
                cooloff = interval::parse(&take_value(argv, &mut i, "-c")?)?;
            }
            "-m" => {
                maximum = interval::parse(&take_value(argv, &mut i, "-m")?)?;
            }
            "-t" => {
                restart_initial = interval::parse(&take_value(argv, &mut i, "-t")?)?;
            }
            "--" => {
                i += 1;
                break;
            }
            s if s.starts_with('-') && s != "-" => {
                return Err(SupervisorError::InvalidArgument(format!(
                    "unknown flag '{s}'"
                )));
            }
            _ => break,
        }
    }

    if i >= argv.len() {
        return Err(SupervisorError::InvalidArgument(
            "missing command to supervise".to_string(),
        ));
    }

    let command = argv[i..].to_vec();

    Ok(Config {
        daemonize,
        name,
        restart_initial,
        cooloff,
        maximum,
        command,
    })
}

fn take_value(argv: &[String], i: &mut usize, flag: &str) -> Result<String> {
    let value_idx = *i + 1;
    if value_idx >= argv.len() {
        return Err(SupervisorError::InvalidArgument(format!(
            "flag '{flag}' requires a value"
        )));
    }
    *i += 2;
    Ok(argv[value_idx].clone())
}
