use crate::chained_hashing::DEFAULT_NUM_BUCKETS;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_COMMANDS_PATH: &str = "commands.txt";
pub const DEFAULT_LOG_PATH: &str = "output.txt";
/// Pause between WAITING and AWAKENED; only widens the window in which tasks interleave.
pub const DEFAULT_TASK_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing value for {0}")]
    MissingValue(String),
    #[error("Invalid value {value:?} for {flag}")]
    InvalidValue { flag: String, value: String },
    #[error("Unknown argument {0:?}")]
    UnknownArgument(String),
    #[error("The table needs at least one bucket")]
    ZeroBuckets,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub commands_path: PathBuf,
    pub log_path: PathBuf,
    pub num_buckets: usize,
    pub task_delay: Duration,
    /// `None` runs one thread per command; `Some(n)` feeds `n` workers from a queue.
    pub workers: Option<NonZeroUsize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            commands_path: PathBuf::from(DEFAULT_COMMANDS_PATH),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            num_buckets: DEFAULT_NUM_BUCKETS,
            task_delay: DEFAULT_TASK_DELAY,
            workers: None,
        }
    }
}

impl Config {
    /**
        Builds a config from command-line arguments, program name excluded:
        `[COMMANDS_FILE] [--log PATH] [--buckets N] [--delay-ms N] [--workers N]`.
    */
    pub fn from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();
        let mut commands_path = None;
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--log" => config.log_path = PathBuf::from(value_for(&arg, args.next())?),
                "--buckets" => {
                    config.num_buckets = parse_value(&arg, args.next())?;
                    if config.num_buckets == 0 {
                        return Err(ConfigError::ZeroBuckets);
                    }
                }
                "--delay-ms" => {
                    config.task_delay = Duration::from_millis(parse_value(&arg, args.next())?)
                }
                "--workers" => config.workers = Some(parse_value(&arg, args.next())?),
                flag if flag.starts_with("--") => {
                    return Err(ConfigError::UnknownArgument(arg));
                }
                _ if commands_path.is_none() => commands_path = Some(PathBuf::from(arg)),
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }
        if let Some(path) = commands_path {
            config.commands_path = path;
        }
        Ok(config)
    }
}

fn value_for(flag: &str, value: Option<String>) -> Result<String, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T, ConfigError> {
    let value = value_for(flag, value)?;
    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag: flag.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_args(Vec::new()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.commands_path, PathBuf::from("commands.txt"));
        assert_eq!(config.log_path, PathBuf::from("output.txt"));
        assert_eq!(config.num_buckets, 100);
        assert_eq!(config.workers, None);
    }

    #[test]
    fn test_all_flags() {
        let config = Config::from_args(args(&[
            "cmds.txt",
            "--log",
            "audit.log",
            "--buckets",
            "7",
            "--delay-ms",
            "0",
            "--workers",
            "3",
        ]))
        .unwrap();
        assert_eq!(config.commands_path, PathBuf::from("cmds.txt"));
        assert_eq!(config.log_path, PathBuf::from("audit.log"));
        assert_eq!(config.num_buckets, 7);
        assert_eq!(config.task_delay, Duration::ZERO);
        assert_eq!(config.workers, NonZeroUsize::new(3));
    }

    #[test]
    fn test_bad_arguments() {
        assert_eq!(
            Config::from_args(args(&["--buckets", "0"])),
            Err(ConfigError::ZeroBuckets)
        );
        assert_eq!(
            Config::from_args(args(&["--workers", "0"])),
            Err(ConfigError::InvalidValue {
                flag: "--workers".to_string(),
                value: "0".to_string()
            })
        );
        assert_eq!(
            Config::from_args(args(&["--log"])),
            Err(ConfigError::MissingValue("--log".to_string()))
        );
        assert_eq!(
            Config::from_args(args(&["--verbose"])),
            Err(ConfigError::UnknownArgument("--verbose".to_string()))
        );
        assert_eq!(
            Config::from_args(args(&["a.txt", "b.txt"])),
            Err(ConfigError::UnknownArgument("b.txt".to_string()))
        );
    }
}
