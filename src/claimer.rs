use std::{collections::HashMap, sync::Arc, time::Duration};

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, TxHash, U256},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};
use tokio::time::Instant;

use crate::{
    chain::{ChainSigner, DencunNft::mintWithVoucherCall},
    config::Config,
    constants::{CLAIM_RETRY_DELAY, STALE_VOUCHER_DELAY},
    errors::WaitTimeout,
    gas::GasGate,
    network::Network,
    voucher::{check_eligibility, Voucher, VoucherService},
    web3::{last_used_nonce, submit_transaction, GasMultipliers},
};

#[derive(Clone, Copy, Debug)]
pub struct ClaimSettings {
    /// Failed attempts retried after the first one; a claim runs at most
    /// `retry_count + 1` times.
    pub retry_count: usize,
    pub retry_delay: Duration,
    pub stale_voucher_delay: Duration,
    /// `None` keeps re-fetching stale vouchers indefinitely.
    pub voucher_wait_timeout: Option<Duration>,
}

impl ClaimSettings {
    pub fn new(retry_count: usize) -> Self {
        Self {
            retry_count,
            retry_delay: CLAIM_RETRY_DELAY,
            stale_voucher_delay: STALE_VOUCHER_DELAY,
            voucher_wait_timeout: None,
        }
    }
}

/// Runs one wallet's claim on one network: gas gate, eligibility, voucher,
/// nonce freshness, submission, with bounded retries around the lot.
pub struct Claimer {
    vouchers: Arc<dyn VoucherService>,
    gas_gates: HashMap<Network, GasGate>,
    settings: ClaimSettings,
}

impl Claimer {
    pub fn new(
        vouchers: Arc<dyn VoucherService>,
        gas_gates: impl IntoIterator<Item = GasGate>,
        settings: ClaimSettings,
    ) -> Self {
        Self {
            vouchers,
            gas_gates: gas_gates
                .into_iter()
                .map(|gate| (gate.network(), gate))
                .collect(),
            settings,
        }
    }

    pub fn from_config(config: &Config, vouchers: Arc<dyn VoucherService>) -> eyre::Result<Self> {
        let gas_gates = Network::ALL
            .into_iter()
            .map(|network| Ok(GasGate::new(network, config.max_gas_price(network)?)))
            .collect::<eyre::Result<Vec<_>>>()?;

        let settings = ClaimSettings {
            voucher_wait_timeout: config.voucher_wait_timeout(),
            ..ClaimSettings::new(config.retry_count)
        };

        Ok(Self::new(vouchers, gas_gates, settings))
    }

    /// Ethereum gas is the expensive one, so its price bump is kept small.
    pub fn gas_multipliers(network: Network) -> GasMultipliers {
        match network {
            Network::Ethereum => GasMultipliers::new(1.05, 1.15),
            Network::Linea => GasMultipliers::new(1.15, 1.15),
        }
    }

    /// Returns the mint transaction hash, or `None` when there was nothing
    /// to mint or every attempt failed. Failures never reach the caller.
    pub async fn check_and_claim(
        &self,
        id: usize,
        chain: &dyn ChainSigner,
        network: Network,
        proxy: Option<&str>,
    ) -> Option<TxHash> {
        let address = chain.address();
        let mut retries = 0;

        loop {
            match self.attempt_claim(id, chain, network, proxy).await {
                Ok(hash) => return hash,
                Err(e) if retries >= self.settings.retry_count => {
                    tracing::error!("{e}");
                    tracing::error!(
                        "[{id}] {address} could not mint nft on {network} in {} tries",
                        retries + 1
                    );
                    return None;
                }
                Err(e) => {
                    retries += 1;
                    tracing::warn!("{e}");
                    tracing::warn!("[{id}] {address} could not mint nft on {network} [{retries}]");
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
            }
        }
    }

    async fn attempt_claim(
        &self,
        id: usize,
        chain: &dyn ChainSigner,
        network: Network,
        proxy: Option<&str>,
    ) -> eyre::Result<Option<TxHash>> {
        let address = chain.address();

        self.gas_gate(network)?
            .wait_for_acceptable_gas_price(chain)
            .await?;

        let eligibility =
            check_eligibility(chain, self.vouchers.as_ref(), address, network, proxy).await?;

        if !eligibility.can_claim() {
            tracing::info!("[{id}] {address} Not eligible to mint {network} NFT");
            return Ok(None);
        }

        tracing::info!(
            "[{id}] {address} eligible to mint {network} NFT. Already minted: {}",
            eligibility.quantity_claimed
        );

        self.claim_nft(chain, network, proxy).await.map(Some)
    }

    async fn claim_nft(
        &self,
        chain: &dyn ChainSigner,
        network: Network,
        proxy: Option<&str>,
    ) -> eyre::Result<TxHash> {
        let address = chain.address();
        let mut voucher = self.vouchers.request_voucher(address, network, proxy).await?;

        if network.checks_voucher_nonce() {
            voucher = self
                .fresh_voucher(chain, network, proxy, voucher)
                .await?;
        }

        let input = mintWithVoucherCall {
            voucher: voucher.data.voucher.to_onchain(),
            signature: voucher.data.signature.clone(),
        }
        .abi_encode();

        let tx = TransactionRequest::default()
            .with_to(network.nft_address())
            .with_input(input)
            .with_value(U256::ZERO);

        submit_transaction(chain, tx, Self::gas_multipliers(network), true).await
    }

    /// Re-fetches the voucher until its nonce is above the last one the
    /// contract consumed for this wallet.
    async fn fresh_voucher(
        &self,
        chain: &dyn ChainSigner,
        network: Network,
        proxy: Option<&str>,
        mut voucher: Voucher,
    ) -> eyre::Result<Voucher> {
        let address: Address = chain.address();
        let last_nonce = last_used_nonce(chain, network.nft_address(), address).await?;
        let started = Instant::now();

        while voucher.is_stale(last_nonce) {
            if let Some(timeout) = self.settings.voucher_wait_timeout {
                if started.elapsed() >= timeout {
                    return Err(WaitTimeout {
                        what: "fresh voucher",
                        waited: started.elapsed(),
                    }
                    .into());
                }
            }

            tracing::info!(
                "{address} voucher nonce {} is not above last used {last_nonce}, refetching",
                voucher.nonce()
            );
            tokio::time::sleep(self.settings.stale_voucher_delay).await;
            voucher = self.vouchers.request_voucher(address, network, proxy).await?;
        }

        Ok(voucher)
    }

    fn gas_gate(&self, network: Network) -> eyre::Result<&GasGate> {
        self.gas_gates
            .get(&network)
            .ok_or_else(|| eyre::eyre!("no gas ceiling configured for {network}"))
    }
}
