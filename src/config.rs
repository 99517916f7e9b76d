use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::{fmt, io};

const RC_FILE: &str = "~/.mshrc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub prompt: String,
    pub history_file: PathBuf,
    pub history_max: usize,
    /// Sanity limit on one input line; longer lines are rejected, not
    /// truncated.
    pub max_line_len: usize,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn default_config() -> Config {
        Config {
            prompt: "msh> ".to_string(),
            history_file: expand_home("~/.msh_history"),
            history_max: 500,
            max_line_len: 4096,
        }
    }

    /// Reads `~/.mshrc` when it exists. A broken file is reported and
    /// the defaults are used; startup never fails over configuration.
    pub fn load() -> Config {
        let path = expand_home(RC_FILE);
        if !path.exists() {
            return Self::default_config();
        }
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("msh: {}: {}", path.display(), e);
                Self::default_config()
            }
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let mut src = String::new();
        for line in BufReader::new(file).lines() {
            src.push_str(&line?);
            src.push('\n');
        }
        Self::load_from_str(&src)
    }

    /// `key=value` lines; `#` starts a comment. Unset keys keep their
    /// defaults.
    pub fn load_from_str(src: &str) -> Result<Config, ConfigError> {
        let mut config = Self::default_config();

        for (lineno, line) in src.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Parse(format!(
                    "line {}: no '=' found: {}",
                    lineno + 1,
                    line
                )));
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "prompt" => config.prompt = value.to_string(),
                "history_file" => config.history_file = expand_home(value),
                "history_max" => config.history_max = parse_count(lineno, key, value)?,
                "max_line_len" => config.max_line_len = parse_count(lineno, key, value)?,
                _ => {
                    return Err(ConfigError::Parse(format!(
                        "line {}: unknown key: {}",
                        lineno + 1,
                        key
                    )));
                }
            }
        }
        Ok(config)
    }
}

fn parse_count(lineno: usize, key: &str, value: &str) -> Result<usize, ConfigError> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Parse(format!(
            "line {}: {} wants a positive number, got: {}",
            lineno + 1,
            key,
            value
        ))),
    }
}

/// A leading `~/` is replaced with `$HOME`; anything else is kept as
/// written.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), env::var_os("HOME")) {
        (Some(rest), Some(home)) => Path::new(&home).join(rest),
        _ => PathBuf::from(path),
    }
}
