use std::time::Duration;

use alloy::primitives::{Address, U256};

use crate::{
    chain::ChainReader, constants::NFT_TOKEN_ID, network::Network,
    web3::get_multi_token_balance,
};

const CHECK_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HolderBalance {
    pub address: Address,
    pub balance: U256,
}

/// Reads how many NFTs each address holds on `network`, logging one line per
/// wallet and the total.
pub async fn report_balances<C: ChainReader + ?Sized>(
    client: &C,
    network: Network,
    addresses: &[Address],
) -> eyre::Result<Vec<HolderBalance>> {
    let mut stats = Vec::with_capacity(addresses.len());

    for (index, address) in addresses.iter().enumerate() {
        let balance =
            get_multi_token_balance(client, *address, network.nft_address(), NFT_TOKEN_ID).await?;
        tracing::info!("#{} {address} --> {balance}", index + 1);

        stats.push(HolderBalance {
            address: *address,
            balance,
        });
        tokio::time::sleep(CHECK_DELAY).await;
    }

    let total: U256 = stats.iter().map(|s| s.balance).sum();
    tracing::info!("TOTAL {total}");

    Ok(stats)
}
