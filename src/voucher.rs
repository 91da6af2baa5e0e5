use std::{collections::HashMap, str::FromStr, time::Duration};

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use reqwest::{Client, Method, Proxy};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    chain::{ChainReader, DencunNft},
    constants::{CLAIM_URL, ELIGIBILITY_URL, HTTP_TIMEOUT, NFT_TOKEN_ID, VOUCHER_PROVIDER},
    network::Network,
    web3::multi_token_balance,
};

/// Eligibility as reported by the listing API. Quantities arrive either as
/// numbers or as decimal strings.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResponse {
    pub is_eligible: bool,
    #[serde(default, deserialize_with = "lenient_u256")]
    pub quantity_allowed: U256,
    #[serde(default, deserialize_with = "lenient_u256")]
    pub quantity_claimed: U256,
}

/// Eligibility with the claimed quantity read live from the NFT contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Eligibility {
    pub is_eligible: bool,
    pub quantity_allowed: U256,
    pub quantity_claimed: U256,
}

impl Eligibility {
    pub fn can_claim(&self) -> bool {
        self.is_eligible && self.quantity_claimed < self.quantity_allowed
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct VoucherFields {
    pub currency: Address,
    #[serde(deserialize_with = "lenient_u256")]
    pub expiry: U256,
    pub initial_recipient: Address,
    #[serde(deserialize_with = "lenient_u256")]
    pub initial_recipient_amount: U256,
    pub net_recipient: Address,
    #[serde(deserialize_with = "lenient_u256")]
    pub nonce: U256,
    #[serde(deserialize_with = "lenient_u256")]
    pub price: U256,
    #[serde(deserialize_with = "lenient_u256")]
    pub quantity: U256,
    #[serde(deserialize_with = "lenient_u256")]
    pub token_id: U256,
    #[serde(default)]
    pub token_uri: Option<serde_json::Value>,
}

impl VoucherFields {
    pub fn to_onchain(&self) -> DencunNft::MintVoucher {
        DencunNft::MintVoucher {
            netRecipient: self.net_recipient,
            initialRecipient: self.initial_recipient,
            initialRecipientAmount: self.initial_recipient_amount,
            tokenId: self.token_id,
            quantity: self.quantity,
            nonce: self.nonce,
            expiry: self.expiry,
            price: self.price,
            currency: self.currency,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct SignedVoucher {
    #[serde(default)]
    pub contract: Option<String>,
    #[serde(default)]
    pub minter: Option<String>,
    #[serde(default)]
    pub network_id: Option<u64>,
    pub signature: Bytes,
    pub voucher: VoucherFields,
}

/// Purchase intent returned by the claim endpoint, passed through as issued.
#[derive(Deserialize, Clone, Debug)]
pub struct Voucher {
    pub data: SignedVoucher,
    #[serde(default)]
    pub expires_at: Option<String>,
    pub id: String,
}

impl Voucher {
    pub fn nonce(&self) -> U256 {
        self.data.voucher.nonce
    }

    /// Stale once the contract has already consumed this nonce or a later one.
    pub fn is_stale(&self, last_used_nonce: U256) -> bool {
        self.nonce() <= last_used_nonce
    }
}

#[derive(Serialize, Debug)]
struct Buyer {
    eth_address: String,
}

#[derive(Serialize, Debug)]
struct PurchaseIntent<'a> {
    buyer: Buyer,
    listing_id: &'a str,
    provider: &'a str,
    quantity: u64,
}

/// Off-chain API that reports eligibility and hands out signed vouchers.
#[async_trait]
pub trait VoucherService: Send + Sync {
    async fn eligibility(
        &self,
        account: Address,
        network: Network,
        proxy: Option<&str>,
    ) -> eyre::Result<EligibilityResponse>;

    async fn request_voucher(
        &self,
        account: Address,
        network: Network,
        proxy: Option<&str>,
    ) -> eyre::Result<Voucher>;
}

pub struct RequestParams<'a, S: Serialize> {
    pub url: &'a str,
    pub method: Method,
    pub body: Option<S>,
    pub query_args: Option<HashMap<&'a str, String>>,
}

/// Client for the Phosphor / Consensys NFT voucher API.
#[derive(Clone, Debug)]
pub struct ConsensysApi {
    eligibility_url: String,
    claim_url: String,
    timeout: Duration,
}

impl Default for ConsensysApi {
    fn default() -> Self {
        Self::new(ELIGIBILITY_URL, CLAIM_URL)
    }
}

impl ConsensysApi {
    pub fn new(eligibility_url: impl Into<String>, claim_url: impl Into<String>) -> Self {
        Self {
            eligibility_url: eligibility_url.into(),
            claim_url: claim_url.into(),
            timeout: HTTP_TIMEOUT,
        }
    }

    fn client(&self, proxy: Option<&str>) -> eyre::Result<Client> {
        let mut builder = Client::builder().timeout(self.timeout);

        if let Some(proxy) = proxy {
            let url = if proxy.contains("://") {
                proxy.to_string()
            } else {
                format!("http://{proxy}")
            };
            builder = builder.proxy(Proxy::all(url)?);
        }

        Ok(builder.build()?)
    }

    async fn send_http_request(
        &self,
        request_params: &RequestParams<'_, impl Serialize>,
        proxy: Option<&str>,
    ) -> eyre::Result<String> {
        let client = self.client(proxy)?;

        let mut request = client.request(request_params.method.clone(), request_params.url);

        if let Some(params) = &request_params.query_args {
            request = request.query(&params);
        }

        if let Some(body) = &request_params.body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .inspect_err(|e| tracing::debug!("Request failed: {}", e))?
            .error_for_status()
            .inspect_err(|e| tracing::debug!("Non-successful status code: {}", e))?;

        let text = response
            .text()
            .await
            .inspect_err(|e| tracing::debug!("Failed to retrieve response text: {}", e))?;

        Ok(text)
    }
}

#[async_trait]
impl VoucherService for ConsensysApi {
    async fn eligibility(
        &self,
        account: Address,
        network: Network,
        proxy: Option<&str>,
    ) -> eyre::Result<EligibilityResponse> {
        let query_args = HashMap::from([
            ("listingId", network.listing_id().to_string()),
            ("ethAddress", account.to_string()),
        ]);

        let request_params = RequestParams::<()> {
            url: &self.eligibility_url,
            method: Method::GET,
            body: None,
            query_args: Some(query_args),
        };

        let response = self.send_http_request(&request_params, proxy).await?;
        Ok(serde_json::from_str(&response)?)
    }

    async fn request_voucher(
        &self,
        account: Address,
        network: Network,
        proxy: Option<&str>,
    ) -> eyre::Result<Voucher> {
        let request_params = RequestParams {
            url: &self.claim_url,
            method: Method::POST,
            body: Some(PurchaseIntent {
                buyer: Buyer {
                    eth_address: account.to_string(),
                },
                listing_id: network.listing_id(),
                provider: VOUCHER_PROVIDER,
                quantity: 1,
            }),
            query_args: None,
        };

        let response = self.send_http_request(&request_params, proxy).await?;
        Ok(serde_json::from_str(&response)?)
    }
}

/// On Ethereum every wallet may hold one token; on Linea the listing API
/// decides. The claimed quantity always comes from the contract.
pub async fn check_eligibility<C, V>(
    chain: &C,
    vouchers: &V,
    account: Address,
    network: Network,
    proxy: Option<&str>,
) -> eyre::Result<Eligibility>
where
    C: ChainReader + ?Sized,
    V: VoucherService + ?Sized,
{
    let (is_eligible, quantity_allowed) = match network {
        Network::Ethereum => (true, U256::from(1)),
        Network::Linea => {
            let response = vouchers.eligibility(account, network, proxy).await?;
            (response.is_eligible, response.quantity_allowed)
        }
    };

    let quantity_claimed =
        multi_token_balance(chain, network.nft_address(), account, NFT_TOKEN_ID).await?;

    Ok(Eligibility {
        is_eligible,
        quantity_allowed,
        quantity_claimed,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

fn lenient_u256<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(U256::ZERO),
        Some(NumberOrString::Number(n)) => Ok(U256::from(n)),
        Some(NumberOrString::String(s)) => U256::from_str(s.trim()).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
pub(crate) fn sample_voucher_json(nonce: u64) -> serde_json::Value {
    serde_json::json!({
        "data": {
            "contract": "0x9F44028C2F8959a5b15776e2FD936D5DC141B554",
            "minter": "0x0000000000000000000000000000000000000001",
            "network_id": 59144,
            "signature": "0xdeadbeef",
            "voucher": {
                "currency": "0x0000000000000000000000000000000000000000",
                "expiry": 1710000000,
                "initial_recipient": "0x0000000000000000000000000000000000000002",
                "initial_recipient_amount": "0",
                "net_recipient": "0x0000000000000000000000000000000000000003",
                "nonce": nonce,
                "price": "0",
                "quantity": 1,
                "token_id": "1",
                "token_uri": null
            }
        },
        "expires_at": "2024-03-13T00:00:00Z",
        "id": "intent-1"
    })
}
