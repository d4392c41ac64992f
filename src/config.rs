use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub ws_rpc_url: String,
    pub contract_address: Address,
    pub start_block: Option<u64>,
    pub max_reconnect_attempts: usize,
    pub reconnect_base_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let ws_rpc_url = std::env::var("WS_RPC_URL")
            .context("WS_RPC_URL must be set in .env")?;

        let contract_address_str = std::env::var("CONTRACT_ADDRESS")
            .context("CONTRACT_ADDRESS must be set in .env")?;

        let contract_address = Address::from_str(&contract_address_str)
            .context("Invalid CONTRACT_ADDRESS format")?;

        let start_block = match std::env::var("START_BLOCK") {
            Ok(value) => Some(value.parse().context("Invalid START_BLOCK value")?),
            Err(_) => None,
        };

        let max_reconnect_attempts = match std::env::var("MAX_RECONNECT_ATTEMPTS") {
            Ok(value) => value.parse().context("Invalid MAX_RECONNECT_ATTEMPTS value")?,
            Err(_) => 10,
        };

        let reconnect_base_delay_ms = match std::env::var("RECONNECT_BASE_DELAY_MS") {
            Ok(value) => value.parse().context("Invalid RECONNECT_BASE_DELAY_MS value")?,
            Err(_) => 500,
        };

        Ok(Config {
            ws_rpc_url,
            contract_address,
            start_block,
            max_reconnect_attempts,
            reconnect_base_delay_ms,
        })
    }
}
