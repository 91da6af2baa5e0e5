use std::{path::Path, str::FromStr, sync::Arc};

use alloy::{network::EthereumWallet, signers::local::PrivateKeySigner};

use tokio::io::AsyncBufReadExt;

use crate::{constants::PLACEHOLDER_PROXY, errors::InputError};

/// Non-empty lines of `path`, paired with their 1-based line number. Blank
/// lines are skipped rather than rejected, so an empty line in the keys file
/// is not an invalid key.
pub async fn read_file_lines(path: impl AsRef<Path>) -> Result<Vec<(usize, String)>, InputError> {
    let path = path.as_ref();
    let read_error = |source| InputError::Read {
        path: path.display().to_string(),
        source,
    };

    let file = tokio::fs::read(path).await.map_err(read_error)?;
    let mut lines = file.lines();

    let mut contents = vec![];
    let mut number = 0;
    while let Some(line) = lines.next_line().await.map_err(read_error)? {
        number += 1;
        let line = line.trim();
        if !line.is_empty() {
            contents.push((number, line.to_string()));
        }
    }

    Ok(contents)
}

pub fn parse_private_keys(
    lines: &[(usize, String)],
) -> Result<Vec<Arc<EthereumWallet>>, InputError> {
    lines
        .iter()
        .map(|(line, pk)| {
            let signer =
                PrivateKeySigner::from_str(pk).map_err(|e| InputError::InvalidPrivateKey {
                    line: *line,
                    reason: e.to_string(),
                })?;
            Ok(Arc::new(EthereumWallet::new(signer)))
        })
        .collect()
}

pub fn parse_proxies(lines: &[(usize, String)]) -> Result<Vec<String>, InputError> {
    lines
        .iter()
        .map(|(line, proxy)| {
            if proxy.contains(PLACEHOLDER_PROXY) {
                return Err(InputError::PlaceholderProxy {
                    line: *line,
                    placeholder: PLACEHOLDER_PROXY,
                });
            }
            Ok(proxy.clone())
        })
        .collect()
}

pub async fn read_private_keys(
    path: impl AsRef<Path>,
) -> Result<Vec<Arc<EthereumWallet>>, InputError> {
    parse_private_keys(&read_file_lines(path).await?)
}

/// A missing proxies file means running without proxies.
pub async fn read_proxies(path: impl AsRef<Path>) -> Result<Vec<String>, InputError> {
    match read_file_lines(path).await {
        Ok(lines) => parse_proxies(&lines),
        Err(InputError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            Ok(vec![])
        }
        Err(e) => Err(e),
    }
}
