use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_thread_name() -> String {
    "vmscope".to_string()
}

fn default_refresh_ms() -> u64 {
    250
}

fn default_bytes_per_line() -> usize {
    16
}

fn default_memory_window() -> String {
    "256B".to_string()
}

fn default_max_stack_frames() -> usize {
    16
}

/// Settings consumed by the monitor itself.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// Prefix for worker thread names and scratch files.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
    /// Where the memory worker asks the provider to write core dumps.
    /// Falls back to the OS temp dir.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
            scratch_dir: None,
        }
    }
}

impl MonitorConfig {
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Settings for the text view of the `vmscope` binary.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ViewConfig {
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
    #[serde(default = "default_bytes_per_line")]
    pub bytes_per_line: usize,
    /// Bytes of the memory dump shown per refresh, e.g. "256B" or "1KiB".
    #[serde(default = "default_memory_window")]
    pub memory_window: String,
    #[serde(default = "default_max_stack_frames")]
    pub max_stack_frames: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            refresh_ms: default_refresh_ms(),
            bytes_per_line: default_bytes_per_line(),
            memory_window: default_memory_window(),
            max_stack_frames: default_max_stack_frames(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

impl ScopeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open config at {:?}", path.as_ref()))?;
        let config: Self =
            serde_yaml::from_reader(f).context("Failed to parse VMScope config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.monitor.thread_name.trim().is_empty() {
            anyhow::bail!("'monitor.thread_name' cannot be empty");
        }

        if self.monitor.thread_name.contains('\0') {
            anyhow::bail!("'monitor.thread_name' cannot contain NUL bytes");
        }

        if self.view.refresh_ms == 0 {
            anyhow::bail!("'view.refresh_ms' must be greater than zero");
        }

        if self.view.bytes_per_line == 0 {
            anyhow::bail!("'view.bytes_per_line' must be greater than zero");
        }

        let window = self
            .memory_window_bytes()
            .context("Invalid 'view.memory_window'")?;
        if window == 0 {
            anyhow::bail!("'view.memory_window' must be greater than zero");
        }

        Ok(())
    }

    pub fn memory_window_bytes(&self) -> Result<u64> {
        parse_size(&self.view.memory_window)
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let yaml = r#"
monitor:
  thread_name: "inspector"
  scratch_dir: "/var/tmp/vmscope"
view:
  refresh_ms: 100
  bytes_per_line: 8
  memory_window: "1KiB"
  max_stack_frames: 4
"#;
        let config: ScopeConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.monitor.thread_name, "inspector");
        assert_eq!(
            config.monitor.scratch_dir(),
            PathBuf::from("/var/tmp/vmscope")
        );
        assert_eq!(config.view.bytes_per_line, 8);
        assert_eq!(config.memory_window_bytes().unwrap(), 1024);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: ScopeConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ScopeConfig::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.monitor.scratch_dir(), std::env::temp_dir());
        assert_eq!(config.memory_window_bytes().unwrap(), 256);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
monitor:
  poll_interval_ms: 10
"#;
        assert!(serde_yaml::from_str::<ScopeConfig>(yaml).is_err());
    }

    #[test]
    fn test_invalid_refresh() {
        let yaml = r#"
view:
  refresh_ms: 0
"#;
        let config: ScopeConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("refresh_ms"));
    }

    #[test]
    fn test_empty_thread_name() {
        let yaml = r#"
monitor:
  thread_name: "  "
"#;
        let config: ScopeConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("thread_name"));
    }

    #[test]
    fn test_nul_in_thread_name() {
        let yaml = r#"
monitor:
  thread_name: "vm\0scope"
"#;
        let config: ScopeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.monitor.thread_name, "vm\0scope");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("NUL"));
    }

    #[test]
    fn test_bad_memory_window() {
        let yaml = r#"
view:
  memory_window: "lots"
"#;
        let config: ScopeConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("memory_window"));
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4KiB").unwrap(), 4096);
        assert_eq!(parse_size("64B").unwrap(), 64);
        assert!(parse_size("sixty").is_err());
    }
}
