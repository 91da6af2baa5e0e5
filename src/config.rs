use serde::Deserialize;
use std::{path::Path, time::Duration};

use alloy::primitives::utils::parse_units;

use crate::{network::Network, random::Range};

const CONFIG_FILE_PATH: &str = "data/config.toml";

/// `sync` finishes a wallet before starting the next one, `async` does not
/// wait for the previous wallet.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Sync,
    Async,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PerNetwork<T> {
    pub ethereum: T,
    pub linea: T,
}

impl<T> PerNetwork<T> {
    pub fn get(&self, network: Network) -> &T {
        match network {
            Network::Ethereum => &self.ethereum,
            Network::Linea => &self.linea,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RepeatedMint {
    pub amount: usize,
    pub delay: Range,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    pub mode: Mode,
    pub retry_count: usize,
    /// Gas price ceilings in gwei, kept as decimal strings.
    pub max_gwei: PerNetwork<String>,
    pub mint_ethereum: bool,
    pub mint_linea: RepeatedMint,
    pub sleep_between_wallets: Range,
    pub rpc_urls: PerNetwork<String>,
    #[serde(default)]
    pub voucher_wait_timeout_secs: Option<u64>,
}

impl Config {
    async fn read_from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let cfg_str = tokio::fs::read_to_string(path).await?;
        Self::from_toml(&cfg_str)
    }

    pub fn from_toml(cfg_str: &str) -> eyre::Result<Self> {
        let config: Self = toml::from_str(cfg_str)?;
        for network in Network::ALL {
            config.max_gas_price(network)?;
        }
        Ok(config)
    }

    pub async fn read_default() -> eyre::Result<Self> {
        Self::read_from_file(CONFIG_FILE_PATH).await
    }

    /// Gas ceiling for `network` in wei.
    pub fn max_gas_price(&self, network: Network) -> eyre::Result<u128> {
        let gwei = self.max_gwei.get(network);
        let wei = parse_units(gwei, "gwei")
            .map_err(|e| eyre::eyre!("invalid MAX_GWEI for {network} ({gwei}): {e}"))?
            .get_absolute();

        u128::try_from(wei).map_err(|_| eyre::eyre!("MAX_GWEI for {network} is out of range"))
    }

    pub fn is_enabled(&self, network: Network) -> bool {
        match network {
            Network::Ethereum => self.mint_ethereum,
            Network::Linea => self.mint_linea.amount > 0,
        }
    }

    pub fn voucher_wait_timeout(&self) -> Option<Duration> {
        self.voucher_wait_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
pub(crate) const SAMPLE_CONFIG: &str = r#"
MODE = "async"
RETRY_COUNT = 5
MINT_ETHEREUM = true
SLEEP_BETWEEN_WALLETS = { FROM = 300, TO = 1200 }

[MAX_GWEI]
ETHEREUM = "65"
LINEA = "2.5"

[MINT_LINEA]
AMOUNT = 3
DELAY = { FROM = 15, TO = 30 }

[RPC_URLS]
ETHEREUM = "https://ethereum.blockpi.network/v1/rpc/public"
LINEA = "https://rpc.linea.build"
"#;
