//! Runtime bridge - connects the sync TUI thread with the async Tokio runtime
//!
//! The UI thread owns all view state. It sends [`RuntimeCommand`]s to the
//! worker and drains [`RuntimeEvent`]s once per frame; no state is shared
//! between the two sides.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use alloy::primitives::{Address, B256, U256};
use tokio::runtime::Runtime;

use crate::config::AppConfig;
use crate::domain::metadata::TokenMetadata;
use crate::domain::party::Connection;
use crate::infrastructure::ethereum::EthereumProvider;
use crate::infrastructure::runtime::worker::run_async_worker;
use crate::sync::{Aggregation, Epoch, Ticket, WriteOp};

/// Commands sent from the TUI to the async worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCommand {
    /// Start an aggregation run, superseding any run in flight
    Aggregate {
        epoch: Epoch,
        party_count: u64,
        connection: Connection,
    },
    /// Submit a write and wait for its receipt
    Submit { ticket: Ticket, op: WriteOp },
    /// Read and parse `tokenURI`
    FetchMetadata { token_id: U256 },
    /// Re-read party count and owner now
    RefreshChainState,
    /// Shutdown the worker
    Shutdown,
}

/// Events sent from the async worker to the TUI
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Endpoint answered and serves the expected chain
    Connected {
        endpoint: String,
        chain_id: u64,
        account: Option<Address>,
    },
    /// Latest party count and owner; `None` where the read failed
    ChainState {
        party_count: Option<u64>,
        owner: Option<Address>,
    },
    /// An aggregation run finished
    AggregationReady {
        epoch: Epoch,
        party_count: u64,
        aggregation: Aggregation,
    },
    TxSubmitted { ticket: Ticket, hash: B256 },
    TxSubmitFailed { ticket: Ticket, error: String },
    TxConfirmed {
        ticket: Ticket,
        hash: B256,
        success: bool,
    },
    TxTimedOut { ticket: Ticket, hash: B256 },
    MetadataReady {
        token_id: U256,
        result: Result<TokenMetadata, String>,
    },
    /// Error occurred
    Error { message: String },
}

/// Bridge between sync TUI thread and async Tokio runtime
pub struct RuntimeBridge {
    cmd_tx: Sender<RuntimeCommand>,
    evt_rx: Receiver<RuntimeEvent>,
}

impl RuntimeBridge {
    pub fn new(config: AppConfig, provider: Arc<dyn EthereumProvider>) -> anyhow::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<RuntimeCommand>();
        let (evt_tx, evt_rx) = mpsc::channel::<RuntimeEvent>();

        // Spawn the worker thread with its own Tokio runtime
        thread::Builder::new()
            .name("partytea-worker".to_string())
            .spawn(move || {
                let rt = match Runtime::new() {
                    Ok(rt) => rt,
                    Err(err) => {
                        let _ = evt_tx.send(RuntimeEvent::Error {
                            message: format!("Failed to create Tokio runtime: {err}"),
                        });
                        return;
                    }
                };
                rt.block_on(async {
                    if let Err(err) = run_async_worker(config, provider, cmd_rx, evt_tx.clone()).await
                    {
                        let _ = evt_tx.send(RuntimeEvent::Error {
                            message: format!("Worker exited: {:#}", err),
                        });
                    }
                });
            })?;

        Ok(Self { cmd_tx, evt_rx })
    }

    /// Send a command to the async worker
    pub fn send(&self, cmd: RuntimeCommand) -> anyhow::Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| anyhow::anyhow!("Worker channel closed"))
    }

    /// Poll for events (non-blocking)
    pub fn poll_events(&self) -> Vec<RuntimeEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.evt_rx.try_recv() {
            events.push(evt);
        }
        events
    }
}

impl Drop for RuntimeBridge {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(RuntimeCommand::Shutdown);
    }
}
