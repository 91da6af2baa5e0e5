pub mod batch;
pub mod chain;
pub mod checker;
pub mod claimer;
pub mod config;
pub mod constants;
pub mod errors;
pub mod gas;
pub mod logger;
pub mod network;
pub mod random;
pub mod retry;
pub mod utils;
pub mod voucher;
pub mod web3;

#[cfg(test)]
mod testing;
