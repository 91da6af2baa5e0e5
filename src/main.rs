use std::sync::Arc;

use dencun_minter::{
    batch::claim_for_all,
    chain::{connect_http, ChainSigner, HttpTransport, SigningClient},
    claimer::Claimer,
    config::Config,
    constants::{PRIVATE_KEYS_FILE_PATH, PROXIES_FILE_PATH},
    logger::init_default_logger,
    network::Network,
    random::shuffled,
    utils::{read_private_keys, read_proxies},
    voucher::ConsensysApi,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let _guard = init_default_logger();

    let config = Config::read_default().await?;

    let wallets = shuffled(read_private_keys(PRIVATE_KEYS_FILE_PATH).await?);
    let proxies = shuffled(read_proxies(PROXIES_FILE_PATH).await?);
    tracing::info!("Loaded {} wallets and {} proxies", wallets.len(), proxies.len());

    let ethereum = connect_http(config.rpc_urls.get(Network::Ethereum), Network::Ethereum)?;
    let linea = connect_http(config.rpc_urls.get(Network::Linea), Network::Linea)?;

    let claimer = Arc::new(Claimer::from_config(
        &config,
        Arc::new(ConsensysApi::default()),
    )?);

    let minted = claim_for_all(&config, claimer, wallets, proxies, |network, wallet| {
        let provider = match network {
            Network::Ethereum => ethereum.clone(),
            Network::Linea => linea.clone(),
        };
        let client = SigningClient::<_, HttpTransport>::new(provider, wallet, network.chain_id());
        Arc::new(client) as Arc<dyn ChainSigner>
    })
    .await;

    tracing::info!("Finished, minted {} NFTs", minted.len());

    Ok(())
}
