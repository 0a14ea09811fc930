// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bridge configuration

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Default debugger port
pub const DEFAULT_DEBUGGER_PORT: u16 = 5001;

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "SPACEY_";

/// Remote debugger settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggerConfig {
    /// Port the debug server listens on
    pub port: u16,
    /// Transport channel name (e.g. "websocket", "rawpacket")
    pub channel: String,
    /// Wait for the client to send the program instead of reading it from disk
    pub wait_source: bool,
    /// Reset the engine context when the client disconnects
    pub context_reset: bool,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_DEBUGGER_PORT,
            channel: "websocket".to_string(),
            wait_source: false,
            context_reset: false,
        }
    }
}

/// Configuration for a [`ModuleBridge`](crate::ModuleBridge)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Debugger settings; `None` runs without a debugger
    pub debugger: Option<DebuggerConfig>,
    /// Report module load statistics
    pub loadstat: bool,
}

impl BridgeConfig {
    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by `SPACEY_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(std::env::vars());
        config
    }

    /// Apply `SPACEY_*` variables from `vars`; everything else is ignored.
    pub fn apply_env<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                let config_key = config_key.to_lowercase().replace('_', "-");
                self.set(&config_key, &value);
            }
        }
    }

    /// Set a configuration value by key. Unknown keys and unparsable values
    /// are ignored.
    pub fn set(&mut self, key: &str, value: &str) {
        match key {
            "debugger" => {
                if is_truthy(value) {
                    self.debugger.get_or_insert_with(DebuggerConfig::default);
                } else {
                    self.debugger = None;
                }
            }
            "debugger-port" => {
                if let Ok(port) = value.parse() {
                    self.debugger_mut().port = port;
                }
            }
            "debugger-channel" => self.debugger_mut().channel = value.to_string(),
            "debugger-wait-source" => self.debugger_mut().wait_source = is_truthy(value),
            "debugger-context-reset" => self.debugger_mut().context_reset = is_truthy(value),
            "loadstat" => self.loadstat = is_truthy(value),
            _ => tracing::trace!(key = key, "ignoring unknown configuration key"),
        }
    }

    /// Whether the host should wait for a debugger client to send source
    pub fn debugger_wait_source(&self) -> bool {
        self.debugger.as_ref().is_some_and(|d| d.wait_source)
    }

    fn debugger_mut(&mut self) -> &mut DebuggerConfig {
        self.debugger.get_or_insert_with(DebuggerConfig::default)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "yes" | "on")
}
