//! # Host Configuration
//!
//! [`ShellConfig`] holds the knobs of the host runtime. It deserializes from
//! any serde format (missing fields fall back to defaults) and can be read
//! from the startup arguments the host passes to the application:
//!
//! ```text
//! --channel-capacity=64 --host-queue-capacity=16 --close-services-on-quit=false
//! ```

use crate::framework::ShellError;
use serde::{Deserialize, Serialize};

/// Host runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Per-direction frame queue of every message pipe.
    pub channel_capacity: usize,
    /// Queue of requests waiting for the host loop.
    pub host_queue_capacity: usize,
    /// Abort still-running service instances when the host quits. When
    /// `false`, instances keep serving until their endpoint closes.
    pub close_services_on_quit: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 32,
            host_queue_capacity: 32,
            close_services_on_quit: true,
        }
    }
}

impl ShellConfig {
    /// Reads `--key=value` flags from `args` on top of the defaults.
    ///
    /// Arguments that are not host flags are left for the application and
    /// ignored here. A host flag with a missing or malformed value is an error.
    pub fn from_args(args: &[String]) -> Result<Self, ShellError> {
        let mut config = Self::default();
        for arg in args {
            let Some(flag) = arg.strip_prefix("--") else {
                continue;
            };
            let (key, value) = match flag.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (flag, None),
            };
            match key {
                "channel-capacity" => config.channel_capacity = parse_count(key, value)?,
                "host-queue-capacity" => config.host_queue_capacity = parse_count(key, value)?,
                "close-services-on-quit" => {
                    config.close_services_on_quit = match value {
                        None | Some("true") => true,
                        Some("false") => false,
                        Some(other) => {
                            return Err(ShellError::InvalidArgument(format!(
                                "--{key} expects true or false, got {other:?}"
                            )))
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(config)
    }
}

fn parse_count(key: &str, value: Option<&str>) -> Result<usize, ShellError> {
    let value = value.ok_or_else(|| ShellError::InvalidArgument(format!("--{key} needs a value")))?;
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ShellError::InvalidArgument(format!(
            "--{key} expects a positive integer, got {value:?}"
        ))),
    }
}
