//! Scenario files: a JSON snapshot of invoices and payments.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use settle_core::invoice::Invoice;
use settle_core::payment::{InMemoryGateway, Payment};

/// Invoices and payments loaded into the in-memory gateway.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl Scenario {
    /// Reads a scenario from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid scenario {}", path.display()))
    }

    /// Parses a scenario from JSON text.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Writes the scenario as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw).with_context(|| format!("failed to write scenario {}", path.display()))
    }

    /// Seeds a gateway with this scenario.
    pub fn into_gateway(self) -> InMemoryGateway {
        InMemoryGateway::new(self.invoices, self.payments)
    }

    /// Captures the gateway's current state.
    pub fn from_gateway(gateway: &InMemoryGateway) -> anyhow::Result<Self> {
        Ok(Self {
            invoices: gateway.invoices()?,
            payments: gateway.payments()?,
        })
    }
}
