use alloy::network::{Ethereum, EthereumWallet, NetworkWallet};

use dencun_minter::{
    chain::{connect_http, HttpTransport, ReadOnlyClient},
    checker::report_balances,
    config::Config,
    constants::PRIVATE_KEYS_FILE_PATH,
    logger::init_default_logger,
    network::Network,
    utils::read_private_keys,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let _guard = init_default_logger();

    let config = Config::read_default().await?;
    let addresses: Vec<_> = read_private_keys(PRIVATE_KEYS_FILE_PATH)
        .await?
        .iter()
        .map(|wallet| {
            <EthereumWallet as NetworkWallet<Ethereum>>::default_signer_address(wallet)
        })
        .collect();

    let provider = connect_http(config.rpc_urls.get(Network::Linea), Network::Linea)?;
    let client = ReadOnlyClient::<_, HttpTransport>::new(provider);

    report_balances(&client, Network::Linea, &addresses).await?;

    Ok(())
}
