//! In-memory chain and voucher API used by the unit tests.

use std::{
    collections::VecDeque,
    io,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use alloy::{
    primitives::{address, Address, Bytes, TxHash, U256},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};
use async_trait::async_trait;

use crate::{
    chain::{ChainReader, ChainSigner, DencunNft, FeeData, IERC1155, IERC20},
    network::Network,
    voucher::{sample_voucher_json, EligibilityResponse, Voucher, VoucherService},
};

/// Pops the next scripted value, repeating the last one forever.
fn next<T: Clone>(queue: &Mutex<VecDeque<T>>) -> T {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front().unwrap()
    } else {
        queue.front().cloned().expect("scripted queue is never empty")
    }
}

fn replace<T>(queue: &Mutex<VecDeque<T>>, items: impl IntoIterator<Item = T>) {
    let items: VecDeque<T> = items.into_iter().collect();
    assert!(!items.is_empty());
    *queue.lock().unwrap() = items;
}

pub struct FakeChain {
    pub address: Address,
    pub token_balance: Mutex<U256>,
    pub allowance: Mutex<U256>,
    pub nft_balance: Mutex<U256>,
    pub last_nonce: Mutex<U256>,
    pub send_failures: AtomicUsize,
    pub send_attempts: AtomicUsize,
    pub truncated_returns: AtomicBool,
    fees: Mutex<VecDeque<FeeData>>,
    native_balances: Mutex<VecDeque<U256>>,
    receipts: Mutex<VecDeque<Option<bool>>>,
    gas_estimate: u64,
    fee_reads: AtomicUsize,
    sent: Mutex<Vec<TransactionRequest>>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            address: address!("00000000000000000000000000000000000000aa"),
            token_balance: Mutex::new(U256::ZERO),
            allowance: Mutex::new(U256::ZERO),
            nft_balance: Mutex::new(U256::ZERO),
            last_nonce: Mutex::new(U256::ZERO),
            send_failures: AtomicUsize::new(0),
            send_attempts: AtomicUsize::new(0),
            truncated_returns: AtomicBool::new(false),
            fees: Mutex::new(VecDeque::from([FeeData {
                gas_price: Some(1_000_000_000),
                ..FeeData::default()
            }])),
            native_balances: Mutex::new(VecDeque::from([U256::ZERO])),
            receipts: Mutex::new(VecDeque::from([Some(true)])),
            gas_estimate: 21_000,
            fee_reads: AtomicUsize::new(0),
            sent: Mutex::new(vec![]),
        }
    }

    pub fn with_gas_estimate(mut self, gas: u64) -> Self {
        self.gas_estimate = gas;
        self
    }

    pub fn set_fees(&self, fee: FeeData) {
        replace(&self.fees, [fee]);
    }

    pub fn push_fees(&self, fees: impl IntoIterator<Item = FeeData>) {
        replace(&self.fees, fees);
    }

    pub fn push_native_balances(&self, balances: impl IntoIterator<Item = U256>) {
        replace(&self.native_balances, balances);
    }

    pub fn push_receipts(&self, receipts: impl IntoIterator<Item = Option<bool>>) {
        replace(&self.receipts, receipts);
    }

    pub fn set_last_nonce(&self, nonce: u64) {
        *self.last_nonce.lock().unwrap() = U256::from(nonce);
    }

    pub fn set_claimed(&self, claimed: u64) {
        *self.nft_balance.lock().unwrap() = U256::from(claimed);
    }

    pub fn hash_of(&self, index: usize) -> TxHash {
        TxHash::with_last_byte(index as u8 + 1)
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fee_reads(&self) -> usize {
        self.fee_reads.load(Ordering::SeqCst)
    }
}

fn word(value: U256) -> Bytes {
    Bytes::from(value.to_be_bytes::<32>().to_vec())
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn native_balance(&self, _account: Address) -> eyre::Result<U256> {
        Ok(next(&self.native_balances))
    }

    async fn call(&self, _to: Address, input: Bytes) -> eyre::Result<Bytes> {
        let selector = &input[..4];
        let value = if selector == IERC20::balanceOfCall::SELECTOR {
            *self.token_balance.lock().unwrap()
        } else if selector == IERC20::allowanceCall::SELECTOR {
            *self.allowance.lock().unwrap()
        } else if selector == IERC1155::balanceOfCall::SELECTOR {
            *self.nft_balance.lock().unwrap()
        } else if selector == DencunNft::getLastNonceCall::SELECTOR {
            *self.last_nonce.lock().unwrap()
        } else {
            eyre::bail!("unexpected call {input}")
        };

        if self.truncated_returns.load(Ordering::SeqCst) {
            return Ok(Bytes::from(value.to_be_bytes::<32>()[..4].to_vec()));
        }
        Ok(word(value))
    }

    async fn fee_data(&self) -> eyre::Result<FeeData> {
        self.fee_reads.fetch_add(1, Ordering::SeqCst);
        Ok(next(&self.fees))
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> eyre::Result<u64> {
        Ok(self.gas_estimate)
    }

    async fn receipt_status(&self, _hash: TxHash) -> eyre::Result<Option<bool>> {
        Ok(next(&self.receipts))
    }
}

#[async_trait]
impl ChainSigner for FakeChain {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> eyre::Result<TxHash> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.send_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.send_failures.store(remaining - 1, Ordering::SeqCst);
            eyre::bail!("nonce too low");
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(tx);
        Ok(self.hash_of(sent.len() - 1))
    }
}

pub struct FakeVouchers {
    pub eligibility_failures: AtomicUsize,
    eligibility: Mutex<EligibilityResponse>,
    nonces: Mutex<VecDeque<u64>>,
    eligibility_calls: AtomicUsize,
    voucher_calls: AtomicUsize,
}

impl FakeVouchers {
    pub fn new() -> Self {
        Self {
            eligibility_failures: AtomicUsize::new(0),
            eligibility: Mutex::new(EligibilityResponse {
                is_eligible: true,
                quantity_allowed: U256::from(1),
                quantity_claimed: U256::ZERO,
            }),
            nonces: Mutex::new(VecDeque::from([1])),
            eligibility_calls: AtomicUsize::new(0),
            voucher_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_eligibility(&self, response: EligibilityResponse) {
        *self.eligibility.lock().unwrap() = response;
    }

    pub fn push_nonces(&self, nonces: impl IntoIterator<Item = u64>) {
        replace(&self.nonces, nonces);
    }

    pub fn eligibility_calls(&self) -> usize {
        self.eligibility_calls.load(Ordering::SeqCst)
    }

    pub fn voucher_calls(&self) -> usize {
        self.voucher_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoucherService for FakeVouchers {
    async fn eligibility(
        &self,
        _account: Address,
        _network: Network,
        _proxy: Option<&str>,
    ) -> eyre::Result<EligibilityResponse> {
        self.eligibility_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.eligibility_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.eligibility_failures.store(remaining - 1, Ordering::SeqCst);
            eyre::bail!("operation timed out");
        }
        Ok(self.eligibility.lock().unwrap().clone())
    }

    async fn request_voucher(
        &self,
        _account: Address,
        _network: Network,
        _proxy: Option<&str>,
    ) -> eyre::Result<Voucher> {
        self.voucher_calls.fetch_add(1, Ordering::SeqCst);
        let nonce = next(&self.nonces);
        Ok(serde_json::from_value(sample_voucher_json(nonce))?)
    }
}

/// Collects formatted log lines emitted on the current thread while the
/// returned guard is alive.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let logs = Self::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();

        (logs, tracing::subscriber::set_default(subscriber))
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.lines().iter().filter(|line| line.contains(needle)).count()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
