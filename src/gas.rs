use std::sync::Mutex;

use alloy::primitives::{utils::format_units, U256};
use tokio::time::Instant;

use crate::{
    chain::ChainReader,
    constants::{GAS_LOG_INTERVAL, GAS_POLL_INTERVAL},
    network::Network,
    web3::get_last_gas_price,
};

/// Holds submissions back until the network's gas price drops to the
/// configured ceiling.
///
/// The last-logged timestamp only throttles the "waiting" line. Concurrent
/// waiters may race on it; that can duplicate or drop a log line and nothing
/// else.
#[derive(Debug)]
pub struct GasGate {
    network: Network,
    max_gas_price: u128,
    last_logged: Mutex<Option<Instant>>,
}

impl GasGate {
    pub fn new(network: Network, max_gas_price: u128) -> Self {
        Self {
            network,
            max_gas_price,
            last_logged: Mutex::new(None),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub async fn wait_for_acceptable_gas_price<C: ChainReader + ?Sized>(
        &self,
        client: &C,
    ) -> eyre::Result<()> {
        loop {
            let current = get_last_gas_price(client).await?;
            if current <= self.max_gas_price {
                return Ok(());
            }

            if self.should_log(Instant::now()) {
                tracing::info!(
                    "wait {} gwei. Want: {} Have: {}",
                    self.network,
                    gwei(self.max_gas_price),
                    gwei(current)
                );
            }

            tokio::time::sleep(GAS_POLL_INTERVAL).await;
        }
    }

    fn should_log(&self, now: Instant) -> bool {
        let Ok(mut last_logged) = self.last_logged.lock() else {
            return true;
        };

        match *last_logged {
            Some(at) if now.duration_since(at) < GAS_LOG_INTERVAL => false,
            _ => {
                *last_logged = Some(now);
                true
            }
        }
    }
}

fn gwei(wei: u128) -> String {
    format_units(U256::from(wei), "gwei").unwrap_or_else(|_| wei.to_string())
}
