use std::time::Duration;

use alloy::primitives::{address, Address};

pub const ETHEREUM_NFT_ADDRESS: Address = address!("Af9ba9f9d7Db062A119371Ea923ED274E3981163");
pub const LINEA_NFT_ADDRESS: Address = address!("9F44028C2F8959a5b15776e2FD936D5DC141B554");

pub const ETHEREUM_LISTING_ID: &str = "acb40976-f770-4bc5-b3f5-9305ec7c92f3";
pub const LINEA_LISTING_ID: &str = "717d7853-49e0-4f71-b351-50900c0a143e";

pub const ETHEREUM_EXPLORER_URL: &str = "https://etherscan.io/tx/";
pub const LINEA_EXPLORER_URL: &str = "https://lineascan.build/tx/";

pub const ETHEREUM_CHAIN_ID: u64 = 1;
pub const LINEA_CHAIN_ID: u64 = 59144;

pub const ELIGIBILITY_URL: &str = "https://app.phosphor.xyz/api/listing-eligibility";
pub const CLAIM_URL: &str = "https://public-api.consensys-nft.com/v1/purchase-intents";
pub const VOUCHER_PROVIDER: &str = "MINT_VOUCHER";
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

// Token id minted by both NFT contracts
pub const NFT_TOKEN_ID: u64 = 1;

// FILES
pub const PRIVATE_KEYS_FILE_PATH: &str = "data/private_keys.txt";
pub const PROXIES_FILE_PATH: &str = "data/proxies.txt";
pub const LOGS_DIR: &str = "data/logs";

pub const PLACEHOLDER_PROXY: &str = "login:pass@ip:port";

// TIMINGS
pub const CLAIM_RETRY_DELAY: Duration = Duration::from_secs(10);
pub const STALE_VOUCHER_DELAY: Duration = Duration::from_secs(120);
pub const GAS_POLL_INTERVAL: Duration = Duration::from_secs(15);
pub const GAS_LOG_INTERVAL: Duration = Duration::from_secs(20);
pub const BALANCE_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const RECEIPT_MAX_WAIT: Duration = Duration::from_secs(5 * 60);
pub const AFTER_ETHEREUM_MINT_DELAY: Duration = Duration::from_secs(10);
