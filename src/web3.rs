use std::time::Duration;

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes, TxHash, U256},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};

use crate::{
    chain::{ChainReader, ChainSigner, DencunNft, FeeData, IERC1155, IERC20},
    constants::{BALANCE_POLL_INTERVAL, RECEIPT_MAX_WAIT, RECEIPT_POLL_INTERVAL},
    errors::WaitTimeout,
    retry::{retry, RetryPolicy},
};

/// Fixed-point multiplier with three decimals, so that scaling on-chain
/// amounts never goes through floating point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Multiplier {
    per_mille: u128,
}

impl Multiplier {
    pub fn new(factor: f64) -> Self {
        Self {
            per_mille: (factor * 1000.0).round() as u128,
        }
    }

    pub fn apply(self, value: u128) -> u128 {
        value.saturating_mul(self.per_mille) / 1000
    }

    pub fn apply_gas(self, gas: u64) -> u64 {
        u64::try_from(self.apply(u128::from(gas))).unwrap_or(u64::MAX)
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Self::new(1.3)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasMultipliers {
    pub price: Multiplier,
    pub limit: Multiplier,
}

impl GasMultipliers {
    pub fn new(price: f64, limit: f64) -> Self {
        Self {
            price: Multiplier::new(price),
            limit: Multiplier::new(limit),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GasPrice {
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
    Legacy {
        gas_price: u128,
    },
}

impl GasPrice {
    /// Scales the node's fee data, preferring the EIP-1559 pair when both
    /// halves are present.
    pub fn from_fee_data(fee: FeeData, multiplier: Multiplier) -> eyre::Result<Self> {
        match fee {
            FeeData {
                max_fee_per_gas: Some(max_fee),
                max_priority_fee_per_gas: Some(priority_fee),
                ..
            } => Ok(GasPrice::Eip1559 {
                max_fee_per_gas: multiplier.apply(max_fee),
                max_priority_fee_per_gas: multiplier.apply(priority_fee),
            }),
            FeeData {
                gas_price: Some(gas_price),
                ..
            } => Ok(GasPrice::Legacy {
                gas_price: multiplier.apply(gas_price),
            }),
            _ => eyre::bail!("Could not get gas price data"),
        }
    }

    pub fn apply_to(self, tx: TransactionRequest) -> TransactionRequest {
        match self {
            GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => tx
                .with_max_fee_per_gas(max_fee_per_gas)
                .with_max_priority_fee_per_gas(max_priority_fee_per_gas),
            GasPrice::Legacy { gas_price } => tx.with_gas_price(gas_price),
        }
    }
}

/// Single representative price: legacy gas price, else base plus priority,
/// else whichever half exists.
pub fn representative_gas_price(fee: FeeData) -> eyre::Result<u128> {
    match fee {
        FeeData {
            gas_price: Some(gas_price),
            ..
        } => Ok(gas_price),
        FeeData {
            max_fee_per_gas: Some(max_fee),
            max_priority_fee_per_gas: Some(priority_fee),
            ..
        } => Ok(max_fee.saturating_add(priority_fee)),
        FeeData {
            max_fee_per_gas: Some(max_fee),
            ..
        } => Ok(max_fee),
        FeeData {
            max_priority_fee_per_gas: Some(priority_fee),
            ..
        } => Ok(priority_fee),
        _ => eyre::bail!("Could not get gas price data"),
    }
}

async fn call_contract<C, Call>(
    client: &C,
    to: Address,
    call: Call,
) -> eyre::Result<Call::Return>
where
    C: ChainReader + ?Sized,
    Call: SolCall,
{
    let output = client.call(to, Bytes::from(call.abi_encode())).await?;
    Ok(Call::abi_decode_returns(&output, true)?)
}

pub async fn erc20_balance<C: ChainReader + ?Sized>(
    client: &C,
    token: Address,
    account: Address,
) -> eyre::Result<U256> {
    Ok(call_contract(client, token, IERC20::balanceOfCall { account }).await?._0)
}

pub async fn multi_token_balance<C: ChainReader + ?Sized>(
    client: &C,
    token: Address,
    account: Address,
    id: u64,
) -> eyre::Result<U256> {
    let call = IERC1155::balanceOfCall {
        account,
        id: U256::from(id),
    };
    Ok(call_contract(client, token, call).await?._0)
}

/// Last voucher nonce the NFT contract has consumed for `account`.
pub async fn last_used_nonce<C: ChainReader + ?Sized>(
    client: &C,
    contract: Address,
    account: Address,
) -> eyre::Result<U256> {
    let call = DencunNft::getLastNonceCall { account };
    Ok(call_contract(client, contract, call).await?._0)
}

/// Native balance, or the ERC-20 balance of `token` when given.
pub async fn get_balance<C: ChainReader + ?Sized>(
    client: &C,
    account: Address,
    token: Option<Address>,
) -> eyre::Result<U256> {
    retry(RetryPolicy::READ, || async {
        match token {
            Some(token) => erc20_balance(client, token, account).await,
            None => client.native_balance(account).await,
        }
    })
    .await
}

pub async fn get_multi_token_balance<C: ChainReader + ?Sized>(
    client: &C,
    account: Address,
    token: Address,
    id: u64,
) -> eyre::Result<U256> {
    retry(RetryPolicy::READ, || multi_token_balance(client, token, account, id)).await
}

/// Polls until the balance rises above `baseline`. With `timeout: None` this
/// waits indefinitely.
pub async fn wait_for_balance_increase<C: ChainReader + ?Sized>(
    client: &C,
    account: Address,
    baseline: U256,
    token: Option<Address>,
    timeout: Option<Duration>,
) -> eyre::Result<U256> {
    let started = tokio::time::Instant::now();

    loop {
        let current = get_balance(client, account, token).await?;
        if current > baseline {
            return Ok(current);
        }

        if let Some(timeout) = timeout {
            if started.elapsed() >= timeout {
                return Err(WaitTimeout {
                    what: "balance increase",
                    waited: started.elapsed(),
                }
                .into());
            }
        }

        tokio::time::sleep(BALANCE_POLL_INTERVAL).await;
    }
}

pub async fn needs_approval<C: ChainReader + ?Sized>(
    client: &C,
    token: Address,
    owner: Address,
    spender: Address,
    min_allowance: U256,
) -> eyre::Result<bool> {
    retry(RetryPolicy::READ, || async {
        let call = IERC20::allowanceCall { owner, spender };
        let allowance = call_contract(client, token, call).await?._0;
        tracing::debug!("allowance: {allowance}, want allowance: {min_allowance}");
        Ok(allowance < min_allowance)
    })
    .await
}

/// Approves `spender` for `amount` of `token`. Returns `None` without sending
/// anything when `min_allowance` is given and already covered.
pub async fn approve<C: ChainSigner + ?Sized>(
    client: &C,
    token: Address,
    spender: Address,
    amount: U256,
    min_allowance: Option<U256>,
) -> eyre::Result<Option<TxHash>> {
    if let Some(min_allowance) = min_allowance {
        if !needs_approval(client, token, client.address(), spender, min_allowance).await? {
            return Ok(None);
        }
    }

    let input = IERC20::approveCall { spender, amount }.abi_encode();
    let tx = TransactionRequest::default()
        .with_to(token)
        .with_input(input);

    submit_transaction(client, tx, GasMultipliers::default(), true)
        .await
        .map(Some)
}

/// Sends `amount` of `token` to `to`, or native currency when `token` is `None`.
pub async fn transfer<C: ChainSigner + ?Sized>(
    client: &C,
    to: Address,
    amount: U256,
    token: Option<Address>,
) -> eyre::Result<TxHash> {
    let tx = match token {
        Some(token) => TransactionRequest::default()
            .with_to(token)
            .with_input(IERC20::transferCall { to, amount }.abi_encode()),
        None => TransactionRequest::default().with_to(to).with_value(amount),
    };

    submit_transaction(client, tx, GasMultipliers::default(), true).await
}

pub async fn get_gas_price<C: ChainReader + ?Sized>(
    client: &C,
    multiplier: Multiplier,
) -> eyre::Result<GasPrice> {
    retry(RetryPolicy::READ, || async {
        GasPrice::from_fee_data(client.fee_data().await?, multiplier)
    })
    .await
}

pub async fn get_last_gas_price<C: ChainReader + ?Sized>(client: &C) -> eyre::Result<u128> {
    retry(RetryPolicy::READ, || async {
        representative_gas_price(client.fee_data().await?)
    })
    .await
}

pub async fn estimate_transaction<C: ChainReader + ?Sized>(
    client: &C,
    tx: &TransactionRequest,
    multiplier: Multiplier,
) -> eyre::Result<u64> {
    retry(RetryPolicy::READ, || async {
        Ok(multiplier.apply_gas(client.estimate_gas(tx).await?))
    })
    .await
}

/// Fills in gas limit and fees, broadcasts, and optionally waits for a
/// successful receipt.
pub async fn submit_transaction<C: ChainSigner + ?Sized>(
    client: &C,
    tx: TransactionRequest,
    multipliers: GasMultipliers,
    wait_for_confirmation: bool,
) -> eyre::Result<TxHash> {
    let tx = tx.with_from(client.address());
    let gas_limit = estimate_transaction(client, &tx, multipliers.limit).await?;
    let fee = get_gas_price(client, multipliers.price).await?;
    let tx = fee.apply_to(tx.with_gas_limit(gas_limit));

    let hash = retry(RetryPolicy::SUBMIT, || client.send_transaction(tx.clone())).await?;
    tracing::debug!("Submitted transaction {hash}");

    if wait_for_confirmation {
        poll_transaction_status(client, hash, RECEIPT_MAX_WAIT).await
    } else {
        Ok(hash)
    }
}

/// Waits for a receipt with success status. Each inner wait is bounded by
/// `max_wait`; the whole poll is retried with the read policy.
pub async fn poll_transaction_status<C: ChainReader + ?Sized>(
    client: &C,
    hash: TxHash,
    max_wait: Duration,
) -> eyre::Result<TxHash> {
    retry(RetryPolicy::READ, || async {
        let mut waited = Duration::ZERO;
        while waited < max_wait {
            if client.receipt_status(hash).await? == Some(true) {
                return Ok(hash);
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
            waited += RECEIPT_POLL_INTERVAL;
        }

        tracing::warn!(
            "could not get tx status in {:.1} minutes",
            max_wait.as_secs_f64() / 60.0
        );
        eyre::bail!("Tx failed or receipt not found")
    })
    .await
}
