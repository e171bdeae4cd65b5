//! Async worker - runs in Tokio runtime and handles RPC operations

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{B256, U256};
use alloy::rpc::types::TransactionRequest;
use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::domain::metadata::parse_token_uri;
use crate::domain::party::Connection;
use crate::infrastructure::ethereum::{ChainReader, EthereumProvider};
use crate::infrastructure::runtime::bridge::{RuntimeCommand, RuntimeEvent};
use crate::sync::{aggregate, Epoch, Ticket, WriteOp};

/// How often a pending receipt is polled
const RECEIPT_POLL: Duration = Duration::from_secs(1);

/// Delay before retrying an unreachable endpoint
const RECONNECT_DELAY: Duration = Duration::from_millis(900);

/// Run the async worker loop
pub async fn run_async_worker(
    config: AppConfig,
    provider: Arc<dyn EthereumProvider>,
    cmd_rx: Receiver<RuntimeCommand>,
    evt_tx: Sender<RuntimeEvent>,
) -> Result<()> {
    let reader = ChainReader::new(provider.clone(), config.contract, config.read_timeout);

    // Wait for the endpoint before anything else
    loop {
        match connect(&config, provider.as_ref(), &evt_tx).await {
            Ok(()) => break,
            Err(err) if err.is::<ChainMismatch>() => return Err(err),
            Err(err) => {
                let _ = evt_tx.send(RuntimeEvent::Error {
                    message: format!("Connection failed ({}): {:#}", provider.endpoint_name(), err),
                });
                if shutdown_requested(&cmd_rx) {
                    return Ok(());
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }

    let mut aggregation: Option<JoinHandle<()>> = None;
    let mut last_poll: Option<Instant> = None;
    let mut tick = interval(Duration::from_millis(25));

    loop {
        // Process commands (non-blocking)
        while let Ok(cmd) = cmd_rx.try_recv() {
            match cmd {
                RuntimeCommand::Shutdown => {
                    if let Some(handle) = aggregation.take() {
                        handle.abort();
                    }
                    return Ok(());
                }

                RuntimeCommand::Aggregate {
                    epoch,
                    party_count,
                    connection,
                } => {
                    // A newer run supersedes the one in flight
                    if let Some(handle) = aggregation.take() {
                        handle.abort();
                    }
                    aggregation = Some(tokio::spawn(run_aggregation(
                        reader.clone(),
                        evt_tx.clone(),
                        epoch,
                        party_count,
                        connection,
                    )));
                }

                RuntimeCommand::Submit { ticket, op } => {
                    tokio::spawn(submit(
                        provider.clone(),
                        config.clone(),
                        evt_tx.clone(),
                        ticket,
                        op,
                    ));
                }

                RuntimeCommand::FetchMetadata { token_id } => {
                    tokio::spawn(fetch_metadata(reader.clone(), evt_tx.clone(), token_id));
                }

                RuntimeCommand::RefreshChainState => {
                    last_poll = None;
                }
            }
        }

        if last_poll.map_or(true, |at| at.elapsed() >= config.poll_interval) {
            tokio::spawn(poll_chain_state(reader.clone(), evt_tx.clone()));
            last_poll = Some(Instant::now());
        }

        tick.tick().await;
    }
}

#[derive(Debug, thiserror::Error)]
#[error("endpoint serves chain {actual}, expected {expected}")]
struct ChainMismatch {
    expected: u64,
    actual: u64,
}

async fn connect(
    config: &AppConfig,
    provider: &dyn EthereumProvider,
    evt_tx: &Sender<RuntimeEvent>,
) -> Result<()> {
    let chain_id = provider
        .chain_id()
        .await
        .context("Failed to get chain id")?;
    if chain_id != config.network.chain_id {
        return Err(ChainMismatch {
            expected: config.network.chain_id,
            actual: chain_id,
        }
        .into());
    }

    info!(chain_id, endpoint = %provider.endpoint_name(), "connected");
    let _ = evt_tx.send(RuntimeEvent::Connected {
        endpoint: provider.endpoint_name(),
        chain_id,
        account: provider.signer_address(),
    });
    Ok(())
}

fn shutdown_requested(cmd_rx: &Receiver<RuntimeCommand>) -> bool {
    while let Ok(cmd) = cmd_rx.try_recv() {
        if matches!(cmd, RuntimeCommand::Shutdown) {
            return true;
        }
    }
    false
}

async fn poll_chain_state(reader: ChainReader, evt_tx: Sender<RuntimeEvent>) {
    let (count, owner) = futures::join!(reader.party_count(), reader.owner());
    if let Err(err) = &count {
        warn!(error = %err, "partyCount read failed");
    }
    if let Err(err) = &owner {
        warn!(error = %err, "owner read failed");
    }
    let _ = evt_tx.send(RuntimeEvent::ChainState {
        party_count: count.ok(),
        owner: owner.ok(),
    });
}

async fn run_aggregation(
    reader: ChainReader,
    evt_tx: Sender<RuntimeEvent>,
    epoch: Epoch,
    hint: u64,
    connection: Connection,
) {
    // The count may have moved since the trigger was issued
    let party_count = match reader.party_count().await {
        Ok(count) => count,
        Err(err) => {
            debug!(epoch, error = %err, "partyCount read failed, using hint {hint}");
            hint
        }
    };

    let started = Instant::now();
    if let Some(aggregation) = aggregate(&reader, party_count, connection).await {
        debug!(
            epoch,
            party_count,
            failures = aggregation.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregation finished"
        );
        let _ = evt_tx.send(RuntimeEvent::AggregationReady {
            epoch,
            party_count,
            aggregation,
        });
    }
}

async fn submit(
    provider: Arc<dyn EthereumProvider>,
    config: AppConfig,
    evt_tx: Sender<RuntimeEvent>,
    ticket: Ticket,
    op: WriteOp,
) {
    let mut request = TransactionRequest::default()
        .to(config.contract)
        .input(op.calldata().into());
    let value = op.value();
    if !value.is_zero() {
        request = request.value(value);
    }
    if let Some(from) = provider.signer_address() {
        request = request.from(from);
    }

    let sent = tokio::time::timeout(config.read_timeout, provider.send_transaction(request)).await;
    let hash = match sent {
        Ok(Ok(hash)) => hash,
        Ok(Err(err)) => {
            let _ = evt_tx.send(RuntimeEvent::TxSubmitFailed {
                ticket,
                error: format!("{:#}", err),
            });
            return;
        }
        Err(_) => {
            warn!(ticket, timeout = ?config.read_timeout, "submission got no answer");
            let _ = evt_tx.send(RuntimeEvent::TxSubmitFailed {
                ticket,
                error: format!("No response from the node after {:?}", config.read_timeout),
            });
            return;
        }
    };
    let _ = evt_tx.send(RuntimeEvent::TxSubmitted { ticket, hash });

    let waited = wait_for_receipt(
        provider.as_ref(),
        hash,
        config.read_timeout,
        config.confirmation_timeout,
    )
    .await;
    let event = match waited {
        Some(success) => RuntimeEvent::TxConfirmed {
            ticket,
            hash,
            success,
        },
        None => RuntimeEvent::TxTimedOut { ticket, hash },
    };
    let _ = evt_tx.send(event);
}

/// Poll until the receipt shows up or `limit` elapses. Each poll is bounded by
/// `per_call`, and the whole wait by `limit` even if a poll never answers.
async fn wait_for_receipt(
    provider: &dyn EthereumProvider,
    hash: B256,
    per_call: Duration,
    limit: Duration,
) -> Option<bool> {
    let deadline = tokio::time::Instant::now() + limit;
    let poll = async {
        loop {
            match tokio::time::timeout(per_call, provider.receipt_status(hash)).await {
                Ok(Ok(Some(success))) => return Some(success),
                Ok(Ok(None)) => {}
                Ok(Err(err)) => debug!(tx_hash = %hash, error = %err, "receipt poll failed"),
                Err(_) => debug!(tx_hash = %hash, timeout = ?per_call, "receipt poll timed out"),
            }
            if tokio::time::Instant::now() + RECEIPT_POLL > deadline {
                return None;
            }
            tokio::time::sleep(RECEIPT_POLL).await;
        }
    };
    tokio::time::timeout_at(deadline, poll).await.ok().flatten()
}

async fn fetch_metadata(reader: ChainReader, evt_tx: Sender<RuntimeEvent>, token_id: U256) {
    let result = match reader.token_uri(token_id).await {
        Ok(uri) => parse_token_uri(&uri).map_err(|err| {
            debug!(%token_id, error = %err, "token metadata unparseable");
            format!("Failed to parse NFT data: {err}")
        }),
        Err(err) => Err(format!("Failed to load NFT data: {err}")),
    };
    let _ = evt_tx.send(RuntimeEvent::MetadataReady { token_id, result });
}
