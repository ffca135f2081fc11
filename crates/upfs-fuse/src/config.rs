//! Command line and mount configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use upfs_types::Account;

/// API root used unless `--api-base` says otherwise.
pub const DEFAULT_API_BASE: &str = "https://api.up.com.au/api/v1";

/// Default token file, relative to the working directory.
pub const DEFAULT_TOKEN_FILE: &str = "token";

/// Environment variable that overrides the token file.
pub const TOKEN_ENV: &str = "UP_TOKEN";

/// Mount an Up Bank account as a filesystem.
#[derive(Parser, Debug)]
#[command(name = "upfs")]
#[command(about = "Mount Up Bank accounts, balances and transactions as a filesystem")]
pub struct Cli {
    /// Directory to mount on
    pub mountpoint: PathBuf,

    /// File holding the personal access token (UP_TOKEN takes priority)
    #[arg(long, default_value = DEFAULT_TOKEN_FILE)]
    pub token_file: String,

    /// Up API root
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Account that funds allocations (repeatable; default: every spending account)
    #[arg(long = "pool-account")]
    pub pool_accounts: Vec<String>,

    /// Per-call timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Transactions fetched per page (1-100)
    #[arg(long, default_value_t = 100)]
    pub page_size: u32,

    /// Mount a built-in demo account instead of the live API
    #[arg(long)]
    pub demo: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("timeout must be at least one second")]
    ZeroTimeout,

    #[error("page size must be between 1 and 100, got {0}")]
    PageSize(u32),

    #[error("cannot read token file {path}: {source}")]
    TokenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("token file {0} is empty")]
    EmptyToken(PathBuf),

    #[error("pool account {0} does not exist")]
    UnknownPoolAccount(String),
}

/// Where account data comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// The live Up API.
    Live { token: String, api_base: String },
    /// The in-memory demo fixture.
    Demo,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live { api_base, .. } => f
                .debug_struct("Live")
                .field("api_base", api_base)
                .field("token", &"[REDACTED]")
                .finish(),
            Self::Demo => write!(f, "Demo"),
        }
    }
}

/// Validated mount settings.
#[derive(Debug, Clone)]
pub struct MountConfig {
    pub mountpoint: PathBuf,
    pub source: SourceConfig,
    /// Empty means every spending account.
    pub pool_accounts: Vec<String>,
    pub timeout: Duration,
    pub page_size: u32,
}

impl MountConfig {
    /// Resolve the command line. `env_token` is the value of `UP_TOKEN`, if set.
    pub fn from_cli(cli: Cli, env_token: Option<String>) -> Result<Self, ConfigError> {
        let source = if cli.demo {
            SourceConfig::Demo
        } else {
            let token_file = PathBuf::from(shellexpand::tilde(&cli.token_file).into_owned());
            SourceConfig::Live {
                token: load_token(env_token, &token_file)?,
                api_base: cli.api_base,
            }
        };
        let config = Self {
            mountpoint: cli.mountpoint,
            source,
            pool_accounts: cli.pool_accounts,
            timeout: Duration::from_secs(cli.timeout_secs),
            page_size: cli.page_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if !(1..=100).contains(&self.page_size) {
            return Err(ConfigError::PageSize(self.page_size));
        }
        Ok(())
    }

    pub fn is_demo(&self) -> bool {
        matches!(self.source, SourceConfig::Demo)
    }
}

/// The token from `UP_TOKEN` if set and non-blank, else the first line of `path`.
pub fn load_token(env_token: Option<String>, path: &Path) -> Result<String, ConfigError> {
    if let Some(token) = env_token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        return Ok(token);
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::TokenFile {
        path: path.to_path_buf(),
        source,
    })?;
    contents
        .lines()
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::EmptyToken(path.to_path_buf()))
}

/// Accounts that fund the pool, in ledger order.
///
/// With no explicit list, every spending account in the bank's order.
/// Otherwise the named accounts, in the order given.
pub fn pool_accounts(accounts: &[Account], wanted: &[String]) -> Result<Vec<Account>, ConfigError> {
    if wanted.is_empty() {
        return Ok(accounts.iter().filter(|a| a.is_spending()).cloned().collect());
    }
    wanted
        .iter()
        .map(|id| {
            accounts
                .iter()
                .find(|a| &a.id == id)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownPoolAccount(id.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use upfs_types::AccountKind;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("upfs").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&["/mnt/up"]);
        assert_eq!(cli.mountpoint, PathBuf::from("/mnt/up"));
        assert_eq!(cli.token_file, "token");
        assert_eq!(cli.api_base, DEFAULT_API_BASE);
        assert!(cli.pool_accounts.is_empty());
        assert_eq!(cli.timeout_secs, 10);
        assert_eq!(cli.page_size, 100);
        assert!(!cli.demo);
    }

    #[test]
    fn test_cli_repeated_pool_accounts() {
        let cli = parse(&["/mnt/up", "--pool-account", "a", "--pool-account", "b"]);
        assert_eq!(cli.pool_accounts, vec!["a", "b"]);
    }

    #[test]
    fn test_demo_needs_no_token() {
        let config = MountConfig::from_cli(parse(&["/mnt/up", "--demo"]), None).unwrap();
        assert!(config.is_demo());
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_env_token_wins() {
        let config = MountConfig::from_cli(
            parse(&["/mnt/up", "--token-file", "/definitely/missing"]),
            Some("up:yeah:abc".to_string()),
        )
        .unwrap();
        assert_eq!(
            config.source,
            SourceConfig::Live {
                token: "up:yeah:abc".to_string(),
                api_base: DEFAULT_API_BASE.to_string(),
            }
        );
    }

    #[test]
    fn test_token_file_first_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  up:yeah:from-file  ").unwrap();
        writeln!(file, "ignored").unwrap();
        assert_eq!(load_token(None, file.path()).unwrap(), "up:yeah:from-file");
        // Blank env var falls through to the file.
        assert_eq!(
            load_token(Some("   ".to_string()), file.path()).unwrap(),
            "up:yeah:from-file"
        );
    }

    #[test]
    fn test_token_file_errors() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(load_token(None, file.path()), Err(ConfigError::EmptyToken(_))));

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("token");
        assert!(matches!(
            load_token(None, &missing),
            Err(ConfigError::TokenFile { .. })
        ));
    }

    #[test]
    fn test_validation() {
        let err = MountConfig::from_cli(parse(&["/mnt/up", "--demo", "--timeout-secs", "0"]), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroTimeout));
        let err = MountConfig::from_cli(parse(&["/mnt/up", "--demo", "--page-size", "101"]), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::PageSize(101)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let source = SourceConfig::Live {
            token: "up:yeah:secret".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        };
        assert!(!format!("{:?}", source).contains("secret"));
    }

    #[test]
    fn test_pool_accounts_selection() {
        let accounts = vec![
            Account::new("s1", "Spending", AccountKind::Transactional, 100),
            Account::new("v1", "Saver", AccountKind::Saver, 200),
            Account::new("s2", "Joint", AccountKind::Transactional, 300),
        ];
        let ids = |v: Vec<Account>| v.into_iter().map(|a| a.id).collect::<Vec<_>>();

        assert_eq!(ids(pool_accounts(&accounts, &[]).unwrap()), vec!["s1", "s2"]);
        assert_eq!(
            ids(pool_accounts(&accounts, &["v1".to_string(), "s1".to_string()]).unwrap()),
            vec!["v1", "s1"]
        );
        assert!(matches!(
            pool_accounts(&accounts, &["nope".to_string()]),
            Err(ConfigError::UnknownPoolAccount(_))
        ));
    }
}
