use std::{
    fmt,
    time::{Duration, Instant},
};

use tracing::debug;

use crate::{Client, Dimensions, Error, UdpClient};

const CLIENT_KEY: &str = "client";
const METRIC_KEY: &str = "metric";
const COUNT_KEY: &str = "count";
const TIME_KEY: &str = "time";

/// Reports counters and timings to a collector.
///
/// Every call to [`count`][Reporter::count] or [`time`][Reporter::time] merges the caller's dimensions with the
/// reserved `client`, `metric`, and `count`/`time` fields, encodes the result as a JSON object with sorted keys, and
/// writes it through the configured [`Client`] as a single payload. Reserved fields always take precedence over
/// caller-supplied dimensions with the same key.
///
/// Nothing is batched, queued, or retried beyond what the client itself does.
pub struct Reporter {
    client_name: String,
    client: Option<Box<dyn Client>>,
}

impl Reporter {
    /// Creates a new `Reporter`.
    ///
    /// When `address` is not empty, a [`UdpClient`] for that address is configured. The address is not resolved until
    /// the first measure is sent. When `address` is empty, a client must be provided with
    /// [`set_client`][Reporter::set_client] before any measure can be sent.
    pub fn new<N>(client_name: N, address: &str) -> Self
    where
        N: Into<String>,
    {
        let client = if address.is_empty() {
            None
        } else {
            Some(Box::new(UdpClient::new(address)) as Box<dyn Client>)
        };

        Reporter::from_parts(client_name.into(), client)
    }

    pub(crate) fn from_parts(client_name: String, client: Option<Box<dyn Client>>) -> Self {
        Reporter { client_name, client }
    }

    /// Replaces the client used to send measures.
    ///
    /// The previous client, if any, is dropped without being disconnected first.
    pub fn set_client<C>(&mut self, client: C)
    where
        C: Client + 'static,
    {
        self.client = Some(Box::new(client));
    }

    /// Returns the client name included in every measure.
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Returns `true` if a client is configured.
    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Reports a counter.
    ///
    /// # Errors
    ///
    /// If the dimensions cannot be encoded, [`Error::Serialization`] is returned. If no client is configured,
    /// [`Error::NoClient`] is returned. Otherwise, any error from the client is returned unchanged.
    pub fn count(&mut self, metric: &str, count: i64, dimensions: &Dimensions) -> Result<(), Error> {
        let mut payload = dimensions.clone();
        payload.insert(COUNT_KEY, count);
        self.send(metric, payload)
    }

    /// Reports the time elapsed since `start`.
    ///
    /// The elapsed time is measured when this method is called, and sent as fractional seconds. Callers typically
    /// capture `start` at the beginning of the operation being measured and call this method once it completes.
    ///
    /// # Errors
    ///
    /// Same as [`count`][Reporter::count].
    pub fn time(&mut self, metric: &str, start: Instant, dimensions: &Dimensions) -> Result<(), Error> {
        self.record_time(metric, start.elapsed(), dimensions)
    }

    /// Reports an already-measured duration.
    ///
    /// # Errors
    ///
    /// Same as [`count`][Reporter::count].
    pub fn record_time(&mut self, metric: &str, elapsed: Duration, dimensions: &Dimensions) -> Result<(), Error> {
        let mut payload = dimensions.clone();
        payload.insert(TIME_KEY, elapsed.as_secs_f64());
        self.send(metric, payload)
    }

    /// Disconnects the client.
    ///
    /// Failures to disconnect are ignored, so tearing down a reporter never fails.
    pub fn clean_up(&mut self) {
        if let Some(client) = self.client.as_mut() {
            if let Err(e) = client.disconnect() {
                debug!(error = %e, "Ignoring failure to disconnect client during clean up.");
            }
        }
    }

    fn send(&mut self, metric: &str, mut payload: Dimensions) -> Result<(), Error> {
        payload.insert(CLIENT_KEY, self.client_name.as_str());
        payload.insert(METRIC_KEY, metric);

        let buf = payload.to_json()?;
        let client = self.client.as_mut().ok_or(Error::NoClient)?;
        client.write(&buf)?;
        Ok(())
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("client_name", &self.client_name)
            .field("has_client", &self.has_client())
            .finish()
    }
}
