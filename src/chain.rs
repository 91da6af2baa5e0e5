use std::{marker::PhantomData, sync::Arc};

use alloy::{
    network::{Ethereum, EthereumWallet, NetworkWallet, TransactionBuilder},
    primitives::{Address, Bytes, TxHash, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::{client::ClientBuilder, types::TransactionRequest},
    sol,
    transports::{
        http::Http,
        layers::{RetryBackoffLayer, RetryBackoffService},
        Transport,
    },
};
use async_trait::async_trait;

use crate::network::Network;

sol! {
    contract IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
    }

    contract IERC1155 {
        function balanceOf(address account, uint256 id) external view returns (uint256);
    }

    #[derive(Debug, PartialEq, Eq)]
    contract DencunNft {
        struct MintVoucher {
            address netRecipient;
            address initialRecipient;
            uint256 initialRecipientAmount;
            uint256 tokenId;
            uint256 quantity;
            uint256 nonce;
            uint256 expiry;
            uint256 price;
            address currency;
        }

        function getLastNonce(address account) external view returns (uint256);
        function mintWithVoucher(MintVoucher calldata voucher, bytes calldata signature) external payable;
    }
}

/// Transport produced by `connect_http`: HTTP wrapped in the retry layer.
pub type HttpTransport = RetryBackoffService<Http<reqwest::Client>>;

/// Fee fields reported by a node. Any of them may be missing depending on
/// whether the chain supports EIP-1559.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeData {
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

/// Read access to a chain: everything a claim needs short of signing.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn native_balance(&self, account: Address) -> eyre::Result<U256>;

    /// `eth_call` against `to` with ABI-encoded `input`.
    async fn call(&self, to: Address, input: Bytes) -> eyre::Result<Bytes>;

    async fn fee_data(&self) -> eyre::Result<FeeData>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> eyre::Result<u64>;

    /// `Some(status)` once a receipt exists, `None` while the transaction is unknown or pending.
    async fn receipt_status(&self, hash: TxHash) -> eyre::Result<Option<bool>>;
}

/// A chain reader bound to one wallet that can sign and broadcast.
#[async_trait]
pub trait ChainSigner: ChainReader {
    fn address(&self) -> Address;

    /// Signs `tx` (fees and gas limit already set) and broadcasts it.
    async fn send_transaction(&self, tx: TransactionRequest) -> eyre::Result<TxHash>;
}

pub struct ReadOnlyClient<P, T> {
    provider: Arc<P>,
    _transport: PhantomData<fn() -> T>,
}

impl<P, T> Clone for ReadOnlyClient<P, T> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            _transport: PhantomData,
        }
    }
}

impl<P, T> ReadOnlyClient<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            _transport: PhantomData,
        }
    }
}

#[async_trait]
impl<P, T> ChainReader for ReadOnlyClient<P, T>
where
    P: Provider<T, Ethereum> + 'static,
    T: Transport + Clone,
{
    async fn native_balance(&self, account: Address) -> eyre::Result<U256> {
        Ok(self.provider.get_balance(account).await?)
    }

    async fn call(&self, to: Address, input: Bytes) -> eyre::Result<Bytes> {
        let tx = TransactionRequest::default().with_to(to).with_input(input);
        Ok(self.provider.call(&tx).await?)
    }

    async fn fee_data(&self) -> eyre::Result<FeeData> {
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .inspect_err(|e| tracing::debug!("eth_gasPrice failed: {e}"))
            .ok();
        let eip1559 = self
            .provider
            .estimate_eip1559_fees(None)
            .await
            .inspect_err(|e| tracing::debug!("EIP-1559 fee estimation failed: {e}"))
            .ok();

        Ok(FeeData {
            gas_price,
            max_fee_per_gas: eip1559.map(|fees| fees.max_fee_per_gas),
            max_priority_fee_per_gas: eip1559.map(|fees| fees.max_priority_fee_per_gas),
        })
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> eyre::Result<u64> {
        Ok(self.provider.estimate_gas(tx).await?)
    }

    async fn receipt_status(&self, hash: TxHash) -> eyre::Result<Option<bool>> {
        let receipt = self.provider.get_transaction_receipt(hash).await?;
        Ok(receipt.map(|receipt| receipt.status()))
    }
}

pub struct SigningClient<P, T> {
    reader: ReadOnlyClient<P, T>,
    wallet: Arc<EthereumWallet>,
    chain_id: u64,
}

impl<P, T> SigningClient<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    pub fn new(provider: Arc<P>, wallet: Arc<EthereumWallet>, chain_id: u64) -> Self {
        Self {
            reader: ReadOnlyClient::new(provider),
            wallet,
            chain_id,
        }
    }
}

#[async_trait]
impl<P, T> ChainReader for SigningClient<P, T>
where
    P: Provider<T, Ethereum> + 'static,
    T: Transport + Clone,
{
    async fn native_balance(&self, account: Address) -> eyre::Result<U256> {
        self.reader.native_balance(account).await
    }

    async fn call(&self, to: Address, input: Bytes) -> eyre::Result<Bytes> {
        self.reader.call(to, input).await
    }

    async fn fee_data(&self) -> eyre::Result<FeeData> {
        self.reader.fee_data().await
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> eyre::Result<u64> {
        self.reader.estimate_gas(tx).await
    }

    async fn receipt_status(&self, hash: TxHash) -> eyre::Result<Option<bool>> {
        self.reader.receipt_status(hash).await
    }
}

#[async_trait]
impl<P, T> ChainSigner for SigningClient<P, T>
where
    P: Provider<T, Ethereum> + 'static,
    T: Transport + Clone,
{
    fn address(&self) -> Address {
        <EthereumWallet as NetworkWallet<Ethereum>>::default_signer_address(&self.wallet)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> eyre::Result<TxHash> {
        let from = self.address();
        let nonce = self.reader.provider.get_transaction_count(from).await?;

        let tx_request = tx
            .with_from(from)
            .with_nonce(nonce)
            .with_chain_id(self.chain_id);

        let signed_transaction = tx_request.build(&*self.wallet).await?;
        let pending_tx = self
            .reader
            .provider
            .send_tx_envelope(signed_transaction)
            .await?;

        Ok(*pending_tx.tx_hash())
    }
}

/// HTTP provider for `network` with transport-level retries, shared by all
/// wallets on that network.
pub fn connect_http(
    rpc_url: &str,
    network: Network,
) -> eyre::Result<Arc<impl Provider<HttpTransport, Ethereum> + 'static>> {
    let retry_layer = RetryBackoffLayer::new(10, 2, 500);

    let client = ClientBuilder::default()
        .layer(retry_layer)
        .transport(Http::new(rpc_url.parse()?), false);

    Ok(Arc::new(
        ProviderBuilder::new()
            .with_recommended_fillers()
            .with_chain(network.named_chain())
            .on_provider(RootProvider::new(client)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn http_provider_fits_the_client_transport() {
        let provider = connect_http("http://127.0.0.1:8545", Network::Linea).unwrap();

        let _reader: Arc<dyn ChainReader> =
            Arc::new(ReadOnlyClient::<_, HttpTransport>::new(provider.clone()));
        let signer: Arc<dyn ChainSigner> = Arc::new(SigningClient::<_, HttpTransport>::new(
            provider,
            Arc::new(EthereumWallet::new(
                alloy::signers::local::PrivateKeySigner::random(),
            )),
            Network::Linea.chain_id(),
        ));

        assert_ne!(signer.address(), Address::ZERO);
    }

    #[test]
    fn bad_rpc_url_is_an_error() {
        assert!(connect_http("not a url", Network::Ethereum).is_err());
    }
}
