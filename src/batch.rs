use std::{future::Future, sync::Arc};

use alloy::{
    network::{Ethereum, EthereumWallet, NetworkWallet},
    primitives::{Address, TxHash},
};
use tokio::task::JoinSet;

use crate::{
    chain::ChainSigner,
    claimer::Claimer,
    config::{Config, Mode, RepeatedMint},
    constants::AFTER_ETHEREUM_MINT_DELAY,
    network::Network,
    random::{random_delay, random_element},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Minted {
    pub wallet: usize,
    pub address: Address,
    pub network: Network,
    pub hash: TxHash,
}

async fn mint_once(
    claimer: Arc<Claimer>,
    id: usize,
    chain: Arc<dyn ChainSigner>,
    network: Network,
    proxy: Option<String>,
) -> Vec<Minted> {
    let address = chain.address();
    let hash = claimer
        .check_and_claim(id, chain.as_ref(), network, proxy.as_deref())
        .await;

    hash.map(|hash| {
        tracing::info!("[{id}] {address} {}", network.tx_url(hash));
        Minted {
            wallet: id,
            address,
            network,
            hash,
        }
    })
    .into_iter()
    .collect()
}

/// Claims `mint.amount` times in a row, pausing a random delay after each
/// attempt whether or not it minted.
async fn mint_repeatedly(
    claimer: Arc<Claimer>,
    id: usize,
    chain: Arc<dyn ChainSigner>,
    network: Network,
    proxy: Option<String>,
    mint: RepeatedMint,
) -> Vec<Minted> {
    let address = chain.address();
    let mut minted = vec![];

    for attempt in 1..=mint.amount {
        let hash = claimer
            .check_and_claim(id, chain.as_ref(), network, proxy.as_deref())
            .await;

        if let Some(hash) = hash {
            tracing::info!(
                "[{id}] {address} {} [{attempt}/{}]",
                network.tx_url(hash),
                mint.amount
            );
            minted.push(Minted {
                wallet: id,
                address,
                network,
                hash,
            });
        }

        tokio::time::sleep(random_delay(mint.delay)).await;
    }

    minted
}

/// Awaits `work` in sync mode, or hands it to `handles` in async mode.
async fn dispatch<F>(
    mode: Mode,
    handles: &mut JoinSet<Vec<Minted>>,
    minted: &mut Vec<Minted>,
    work: F,
) where
    F: Future<Output = Vec<Minted>> + Send + 'static,
{
    match mode {
        Mode::Sync => minted.extend(work.await),
        Mode::Async => {
            handles.spawn(work);
        }
    }
}

/// Walks every wallet through every enabled network. In async mode the
/// per-wallet work runs concurrently and is joined before returning.
pub async fn claim_for_all<F>(
    config: &Config,
    claimer: Arc<Claimer>,
    wallets: Vec<Arc<EthereumWallet>>,
    proxies: Vec<String>,
    connect: F,
) -> Vec<Minted>
where
    F: Fn(Network, Arc<EthereumWallet>) -> Arc<dyn ChainSigner>,
{
    let mut handles = JoinSet::new();
    let mut minted = vec![];

    for (index, wallet) in wallets.into_iter().enumerate() {
        let id = index + 1;
        let address =
            <EthereumWallet as NetworkWallet<Ethereum>>::default_signer_address(&wallet);

        if config.is_enabled(Network::Ethereum) {
            let chain = connect(Network::Ethereum, wallet.clone());
            let proxy = random_element(&proxies);
            tracing::info!("starting ethereum mint for wallet #{id} {address}");

            let work = mint_once(claimer.clone(), id, chain, Network::Ethereum, proxy);
            dispatch(config.mode, &mut handles, &mut minted, work).await;

            tokio::time::sleep(AFTER_ETHEREUM_MINT_DELAY).await;
        }

        if config.is_enabled(Network::Linea) {
            let chain = connect(Network::Linea, wallet.clone());
            let proxy = random_element(&proxies);
            tracing::info!("starting linea mint for wallet #{id} {address}");

            let work = mint_repeatedly(
                claimer.clone(),
                id,
                chain,
                Network::Linea,
                proxy,
                config.mint_linea.clone(),
            );
            dispatch(config.mode, &mut handles, &mut minted, work).await;
        }

        tokio::time::sleep(random_delay(config.sleep_between_wallets)).await;
    }

    while let Some(res) = handles.join_next().await {
        match res {
            Ok(task_minted) => minted.extend(task_minted),
            Err(e) => tracing::error!("Mint task failed: {e}"),
        }
    }

    minted
}

#[cfg(test)]
mod tests {
    use alloy::signers::local::PrivateKeySigner;
    use tokio::time::Instant;

    use super::*;
    use crate::{
        claimer::ClaimSettings,
        config::SAMPLE_CONFIG,
        gas::GasGate,
        random::Range,
        testing::{FakeChain, FakeVouchers},
    };

    struct Chains {
        ethereum: Arc<FakeChain>,
        linea: Arc<FakeChain>,
    }

    impl Chains {
        fn new() -> Self {
            let linea = FakeChain::new();
            linea.set_last_nonce(0);
            Self {
                ethereum: Arc::new(FakeChain::new()),
                linea: Arc::new(linea),
            }
        }

        fn connect(&self) -> impl Fn(Network, Arc<EthereumWallet>) -> Arc<dyn ChainSigner> {
            let ethereum = self.ethereum.clone();
            let linea = self.linea.clone();
            move |network, _wallet| match network {
                Network::Ethereum => ethereum.clone() as Arc<dyn ChainSigner>,
                Network::Linea => linea.clone() as Arc<dyn ChainSigner>,
            }
        }
    }

    fn config(mode: Mode, linea_amount: usize) -> Config {
        let mut config = Config::from_toml(SAMPLE_CONFIG).unwrap();
        config.mode = mode;
        config.mint_linea.amount = linea_amount;
        config.mint_linea.delay = Range::new(15.0, 15.0);
        config.sleep_between_wallets = Range::new(60.0, 60.0);
        config
    }

    fn wallets(n: usize) -> Vec<Arc<EthereumWallet>> {
        (0..n)
            .map(|_| Arc::new(EthereumWallet::new(PrivateKeySigner::random())))
            .collect()
    }

    fn claimer(vouchers: Arc<FakeVouchers>) -> Arc<Claimer> {
        Arc::new(Claimer::new(
            vouchers,
            Network::ALL.map(|network| GasGate::new(network, u128::MAX)),
            ClaimSettings::new(2),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn sync_mode_runs_every_unit_in_order() {
        let chains = Chains::new();
        let vouchers = Arc::new(FakeVouchers::new());
        vouchers.set_eligibility(crate::voucher::EligibilityResponse {
            is_eligible: true,
            quantity_allowed: alloy::primitives::U256::from(10),
            quantity_claimed: alloy::primitives::U256::ZERO,
        });
        let start = Instant::now();

        let minted = claim_for_all(
            &config(Mode::Sync, 2),
            claimer(vouchers.clone()),
            wallets(2),
            vec![],
            chains.connect(),
        )
        .await;

        let networks: Vec<_> = minted.iter().map(|m| (m.wallet, m.network)).collect();
        assert_eq!(
            networks,
            vec![
                (1, Network::Ethereum),
                (1, Network::Linea),
                (1, Network::Linea),
                (2, Network::Ethereum),
                (2, Network::Linea),
                (2, Network::Linea),
            ]
        );
        assert_eq!(chains.ethereum.sent().len(), 2);
        assert_eq!(chains.linea.sent().len(), 4);
        // per wallet: 10s after ethereum, 2 x 15s linea delays, 60s between wallets
        assert_eq!(start.elapsed(), 2 * std::time::Duration::from_secs(100));
    }

    #[tokio::test(start_paused = true)]
    async fn async_mode_joins_outstanding_work() {
        let chains = Chains::new();
        let vouchers = Arc::new(FakeVouchers::new());
        let start = Instant::now();

        let minted = claim_for_all(
            &config(Mode::Async, 1),
            claimer(vouchers.clone()),
            wallets(3),
            vec!["10.0.0.1:8080".to_string()],
            chains.connect(),
        )
        .await;

        assert_eq!(minted.len(), 6);
        assert_eq!(vouchers.voucher_calls(), 6);
        // the driver only paces itself (10s + 60s per wallet); the 15s linea
        // delays overlap with it. Sync mode would take 3 x 85s.
        assert_eq!(start.elapsed(), std::time::Duration::from_secs(210));
        assert_eq!(
            minted.iter().filter(|m| m.network == Network::Linea).count(),
            3
        );
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_networks_are_skipped() {
        let chains = Chains::new();
        let vouchers = Arc::new(FakeVouchers::new());
        let mut config = config(Mode::Sync, 0);
        config.mint_ethereum = false;

        let minted = claim_for_all(
            &config,
            claimer(vouchers.clone()),
            wallets(2),
            vec![],
            chains.connect(),
        )
        .await;

        assert!(minted.is_empty());
        assert_eq!(vouchers.eligibility_calls(), 0);
        assert!(chains.ethereum.sent().is_empty());
    }
}
