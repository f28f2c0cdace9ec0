use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Baud rates the controller can be configured for.
pub const BAUD_RATES: [u32; 9] = [300, 1200, 2400, 4800, 9600, 19200, 28800, 38400, 57600];

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Serial device, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,
    pub baud_rate: u32,
    pub update_interval_ms: u64,
    pub commit_interval_ms: u64,
    pub auto_update: bool,
    pub auto_commit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_owned(),
            baud_rate: 19200,
            update_interval_ms: 100,
            commit_interval_ms: 1000,
            auto_update: true,
            auto_commit: true,
        }
    }
}

impl Config {
    /// Read the configuration from a TOML or JSON file, chosen by extension.
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let config: Config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                serde_json::from_reader(BufReader::new(file))
                    .with_context(|| format!("Failed to parse JSON {}", path.display()))?
            }
            Some("toml") => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Self::from_toml(&content)
                    .with_context(|| format!("Failed to parse TOML {}", path.display()))?
            }
            _ => bail!("Unsupported configuration file {}", path.display()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow!("{}", e))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port.is_empty() {
            bail!("No serial port specified");
        }
        if !BAUD_RATES.contains(&self.baud_rate) {
            bail!(
                "Unsupported baud rate {} (supported: {:?})",
                self.baud_rate,
                BAUD_RATES
            );
        }
        if self.update_interval_ms == 0 || self.commit_interval_ms == 0 {
            bail!("Intervals must be at least 1 ms");
        }
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn commit_interval(&self) -> Duration {
        Duration::from_millis(self.commit_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use std::time::Duration;

    #[test]
    fn ut_config_defaults() {
        let config = Config::from_toml("port = \"/dev/ttyS1\"").unwrap();
        assert_eq!(config.port, "/dev/ttyS1");
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.update_interval(), Duration::from_millis(100));
        assert_eq!(config.commit_interval(), Duration::from_secs(1));
        assert!(config.auto_update);
        assert!(config.auto_commit);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ut_config_full() {
        let config = Config::from_toml(
            r#"
            port = "COM3"
            baud_rate = 9600
            update_interval_ms = 250
            commit_interval_ms = 500
            auto_update = false
            auto_commit = false
            "#,
        )
        .unwrap();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.update_interval(), Duration::from_millis(250));
        assert!(!config.auto_update);
        assert!(!config.auto_commit);
    }

    #[test]
    fn ut_config_unknown_key() {
        assert!(Config::from_toml("timeout_ms = 10").is_err());
    }

    #[test]
    fn ut_config_validate() {
        let config = Config {
            baud_rate: 115200,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            commit_interval_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
