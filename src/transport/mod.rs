//! Wires the four worker subprocesses (W1-W4) into named handles the
//! orchestrator's flow code calls by name, rather than importing each
//! worker's own crate.

use std::time::Duration;

use notary402_rpc::{WorkerConfig, WorkerHandle};

use crate::config::Config;

/// Default per-call deadline for a worker RPC; individual call sites
/// (certification polling, in particular) override this where §4.2's
/// own timing budget applies instead.
pub const DEFAULT_CALL_DEADLINE: Duration = Duration::from_secs(10);

pub struct WorkerRegistry {
    pub payment: WorkerHandle,
    pub certify: WorkerHandle,
    pub pricing: WorkerHandle,
    pub encode: WorkerHandle,
}

impl WorkerRegistry {
    pub async fn spawn(config: &Config) -> Result<Self, notary402_rpc::TransportError> {
        let payment = WorkerHandle::spawn(WorkerConfig {
            name: "payment".to_string(),
            program: config.cli.worker_payment_bin.clone(),
            args: Vec::new(),
            max_in_flight: 16,
            queue_capacity: 256,
        })
        .await?;
        let certify = WorkerHandle::spawn(WorkerConfig {
            name: "certify".to_string(),
            program: config.cli.worker_certify_bin.clone(),
            args: Vec::new(),
            max_in_flight: 8,
            queue_capacity: 128,
        })
        .await?;
        let pricing = WorkerHandle::spawn(WorkerConfig {
            name: "pricing".to_string(),
            program: config.cli.worker_pricing_bin.clone(),
            args: Vec::new(),
            max_in_flight: 16,
            queue_capacity: 256,
        })
        .await?;
        let encode = WorkerHandle::spawn(WorkerConfig {
            name: "encode".to_string(),
            program: config.cli.worker_encode_bin.clone(),
            args: Vec::new(),
            max_in_flight: 16,
            queue_capacity: 256,
        })
        .await?;
        Ok(WorkerRegistry {
            payment,
            certify,
            pricing,
            encode,
        })
    }

    pub fn shutdown(&self) {
        self.payment.shutdown();
        self.certify.shutdown();
        self.pricing.shutdown();
        self.encode.shutdown();
    }
}
