//! Test doubles for inspecting what a [`Reporter`][crate::Reporter] sends.
//!
//! [`DebuggingClient`] captures every payload written to it instead of sending it anywhere. Since the client itself is
//! handed over to the reporter, inspection happens through a [`Snapshotter`], which shares the captured state.
//!
//! ```
//! # use measures::{debugging::DebuggingClient, dimensions, Reporter};
//! let client = DebuggingClient::new();
//! let snapshotter = client.snapshotter();
//!
//! let mut reporter = Reporter::new("tests", "");
//! reporter.set_client(client);
//! reporter.count("sizes", 3, &dimensions! { "XL" => 20 }).unwrap();
//!
//! assert_eq!(snapshotter.payloads(), vec![r#"{"XL":20,"client":"tests","count":3,"metric":"sizes"}"#]);
//! ```
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{Client, Error};

#[derive(Debug, Default)]
struct Captured {
    payloads: Vec<Vec<u8>>,
    connects: usize,
    disconnects: usize,
}

fn lock(captured: &Mutex<Captured>) -> MutexGuard<'_, Captured> {
    captured.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A client that captures payloads in memory.
///
/// Writes always succeed.
#[derive(Debug, Default)]
pub struct DebuggingClient {
    captured: Arc<Mutex<Captured>>,
}

impl DebuggingClient {
    /// Creates a new `DebuggingClient`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a `Snapshotter` for inspecting what this client has captured.
    pub fn snapshotter(&self) -> Snapshotter {
        Snapshotter { captured: Arc::clone(&self.captured) }
    }
}

impl Client for DebuggingClient {
    fn connect(&mut self) -> Result<(), Error> {
        lock(&self.captured).connects += 1;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), Error> {
        lock(&self.captured).disconnects += 1;
        Ok(())
    }

    fn write(&mut self, payload: &[u8]) -> Result<usize, Error> {
        lock(&self.captured).payloads.push(payload.to_vec());
        Ok(payload.len())
    }
}

/// Inspects the state captured by a [`DebuggingClient`].
#[derive(Clone, Debug)]
pub struct Snapshotter {
    captured: Arc<Mutex<Captured>>,
}

impl Snapshotter {
    /// Returns every payload written so far, in order.
    ///
    /// Payloads that are not valid UTF-8 are converted lossily.
    pub fn payloads(&self) -> Vec<String> {
        lock(&self.captured)
            .payloads
            .iter()
            .map(|payload| String::from_utf8_lossy(payload).into_owned())
            .collect()
    }

    /// Returns the most recently written payload, if any.
    pub fn last_payload(&self) -> Option<String> {
        lock(&self.captured)
            .payloads
            .last()
            .map(|payload| String::from_utf8_lossy(payload).into_owned())
    }

    /// Returns the number of times the client was explicitly connected.
    pub fn connects(&self) -> usize {
        lock(&self.captured).connects
    }

    /// Returns the number of times the client was disconnected.
    pub fn disconnects(&self) -> usize {
        lock(&self.captured).disconnects
    }

    /// Discards everything captured so far.
    pub fn clear(&self) {
        let mut captured = lock(&self.captured);
        captured.payloads.clear();
        captured.connects = 0;
        captured.disconnects = 0;
    }
}
