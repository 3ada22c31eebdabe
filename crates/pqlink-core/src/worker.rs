//! One-shot signing off the caller's thread
//!
//! Key derivation and SLH-DSA signing take long enough to stall an
//! interactive loop. [`spawn_signing_job`] moves one request onto a named
//! thread and hands back a [`SigningJob`] that receives exactly one reply.
//!
//! Cancelling drops the receiving end; the thread still runs to completion
//! and its `Zeroizing` buffers are wiped when it exits, but nothing waits
//! for that to happen.

use std::sync::mpsc::{self, Receiver};
use std::thread;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::address::PqNetwork;
use crate::signer::{generate_signed_messages, SignedMessageBundle, SigningError};

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error("Signing worker exited without replying")]
    Disconnected,
    #[error("Failed to spawn signing worker: {0}")]
    Spawn(String),
}

/// Input for one signing job.
pub struct SigningRequest {
    pub mnemonic: Zeroizing<String>,
    pub bitcoin_address: String,
    pub network: PqNetwork,
}

/// Handle to an in-flight signing job.
pub struct SigningJob {
    reply: Receiver<Result<SignedMessageBundle, SigningError>>,
}

impl SigningJob {
    /// Block until the worker replies.
    pub fn wait(self) -> Result<SignedMessageBundle, WorkerError> {
        match self.reply.recv() {
            Ok(result) => result.map_err(WorkerError::from),
            Err(_) => Err(WorkerError::Disconnected),
        }
    }

    /// Stop listening for the reply.
    pub fn cancel(self) {
        log::debug!("Signing job cancelled");
    }
}

/// Run [`generate_signed_messages`] for `request` on a dedicated thread.
pub fn spawn_signing_job(request: SigningRequest) -> Result<SigningJob, WorkerError> {
    let (tx, rx) = mpsc::sync_channel(1);

    thread::Builder::new()
        .name("pqlink-signer".into())
        .spawn(move || {
            let SigningRequest {
                mnemonic,
                bitcoin_address,
                network,
            } = request;

            let result = generate_signed_messages(&mnemonic, &bitcoin_address, network);
            drop(mnemonic);

            if tx.send(result).is_err() {
                log::debug!("Signing job finished after its handle was dropped");
            }
        })
        .map_err(|e| WorkerError::Spawn(e.to_string()))?;

    Ok(SigningJob { reply: rx })
}
