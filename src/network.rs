use std::fmt;

use alloy::primitives::Address;
use alloy_chains::NamedChain;
use serde::Deserialize;

use crate::constants::{
    ETHEREUM_CHAIN_ID, ETHEREUM_EXPLORER_URL, ETHEREUM_LISTING_ID, ETHEREUM_NFT_ADDRESS,
    LINEA_CHAIN_ID, LINEA_EXPLORER_URL, LINEA_LISTING_ID, LINEA_NFT_ADDRESS,
};

/// The two chains the NFT can be minted on. Ethereum is the primary chain
/// (eligibility is implicit), Linea the secondary one (eligibility and
/// voucher nonces are checked).
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Ethereum,
    Linea,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Ethereum, Network::Linea];

    pub fn chain_id(self) -> u64 {
        match self {
            Network::Ethereum => ETHEREUM_CHAIN_ID,
            Network::Linea => LINEA_CHAIN_ID,
        }
    }

    pub fn named_chain(self) -> NamedChain {
        match self {
            Network::Ethereum => NamedChain::Mainnet,
            Network::Linea => NamedChain::Linea,
        }
    }

    pub fn nft_address(self) -> Address {
        match self {
            Network::Ethereum => ETHEREUM_NFT_ADDRESS,
            Network::Linea => LINEA_NFT_ADDRESS,
        }
    }

    pub fn listing_id(self) -> &'static str {
        match self {
            Network::Ethereum => ETHEREUM_LISTING_ID,
            Network::Linea => LINEA_LISTING_ID,
        }
    }

    pub fn explorer_url(self) -> &'static str {
        match self {
            Network::Ethereum => ETHEREUM_EXPLORER_URL,
            Network::Linea => LINEA_EXPLORER_URL,
        }
    }

    pub fn tx_url(self, hash: impl fmt::Display) -> String {
        format!("{}{hash}", self.explorer_url())
    }

    /// Only the secondary chain hands out vouchers whose nonce can fall behind
    /// the wallet's on-chain nonce.
    pub fn checks_voucher_nonce(self) -> bool {
        matches!(self, Network::Linea)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Ethereum => f.write_str("ethereum"),
            Network::Linea => f.write_str("linea"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_are_distinct_per_network() {
        assert_eq!(Network::Ethereum.chain_id(), 1);
        assert_eq!(Network::Linea.chain_id(), 59144);
        assert_ne!(Network::Ethereum.nft_address(), Network::Linea.nft_address());
        assert_ne!(Network::Ethereum.listing_id(), Network::Linea.listing_id());
        assert!(Network::Linea.checks_voucher_nonce());
        assert!(!Network::Ethereum.checks_voucher_nonce());
    }

    #[test]
    fn tx_url_uses_explorer_prefix() {
        assert_eq!(
            Network::Linea.tx_url("0xabc"),
            "https://lineascan.build/tx/0xabc"
        );
    }
}
