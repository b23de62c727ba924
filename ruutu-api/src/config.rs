//! Service configuration from flags, environment and `.env`.

use std::path::PathBuf;

use clap::Parser;
use ruutu_core::RETAIN_LIMIT;

/// Ruutupaperi highscore service
#[derive(Debug, Clone, Parser)]
#[command(name = "ruutu-api", version, about)]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "RUUTU_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// SQLite database file
    #[arg(long, env = "RUUTU_DB", default_value = "data/highscores.db")]
    pub db: PathBuf,

    /// Records kept after each submission
    #[arg(long, env = "RUUTU_RETAIN", default_value_t = RETAIN_LIMIT)]
    pub retain: usize,
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::parse_from([
            "ruutu-api",
            "--bind",
            "127.0.0.1",
            "--port",
            "8080",
            "--db",
            "/tmp/hs.db",
        ]);
        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.db, PathBuf::from("/tmp/hs.db"));
        assert_eq!(config.retain, RETAIN_LIMIT);
    }
}
