use std::{net::ToSocketAddrs as _, time::Duration};

use thiserror::Error;

use crate::{recorder::MeasuresRecorder, Client, Reporter, UdpClient};

const DEFAULT_CLIENT_NAME: &str = "measures";
const DEFAULT_REMOTE_ADDRESS: &str = "127.0.0.1:3593";

/// Errors that could occur while building a reporter or installing a recorder.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Failed to parse the remote address.
    #[error("invalid remote address: {reason}")]
    InvalidRemoteAddress {
        /// Details about the parsing failure.
        reason: String,
    },

    /// Failed to install the recorder due to an existing global recorder already being installed.
    #[error("failed to install recorder as global recorder")]
    FailedToInstall,
}

/// Builder for a [`Reporter`].
///
/// Unlike [`Reporter::new`], the builder validates the remote address up front.
#[derive(Debug)]
pub struct ReporterBuilder {
    client_name: String,
    remote_addr: String,
    write_timeout: Option<Duration>,
}

impl ReporterBuilder {
    /// Set the client name included in every measure.
    ///
    /// Defaults to `measures`.
    #[must_use]
    pub fn with_client_name<N>(mut self, client_name: N) -> Self
    where
        N: Into<String>,
    {
        self.client_name = client_name.into();
        self
    }

    /// Set the remote address to send measures to.
    ///
    /// The address needs to be in the format of `<host>:<port>`. It is resolved here to check that it is valid, and
    /// then resolved again whenever the client (re)connects.
    ///
    /// Defaults to `127.0.0.1:3593`.
    ///
    /// # Errors
    ///
    /// If the given address cannot be resolved to at least one socket address, an error will be returned indicating
    /// the reason.
    pub fn with_remote_address<A>(mut self, addr: A) -> Result<Self, BuildError>
    where
        A: AsRef<str>,
    {
        let addr = addr.as_ref();
        let mut resolved = addr
            .to_socket_addrs()
            .map_err(|e| BuildError::InvalidRemoteAddress { reason: e.to_string() })?;
        if resolved.next().is_none() {
            return Err(BuildError::InvalidRemoteAddress {
                reason: format!("'{addr}' did not resolve to any socket address"),
            });
        }

        self.remote_addr = addr.to_owned();
        Ok(self)
    }

    /// Set the write timeout for sending measures.
    ///
    /// When the write timeout is reached, the write fails, and is retried once after reconnecting.
    ///
    /// Defaults to no timeout.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Builds the reporter.
    pub fn build(self) -> Reporter {
        let mut client = UdpClient::new(self.remote_addr);
        if let Some(timeout) = self.write_timeout {
            client = client.with_write_timeout(timeout);
        }

        Reporter::from_parts(self.client_name, Some(Box::new(client) as Box<dyn Client>))
    }

    /// Builds a recorder that reports through a new reporter.
    ///
    /// The recorder must be manually installed by the caller.
    pub fn build_recorder(self) -> MeasuresRecorder {
        MeasuresRecorder::new(self.build())
    }

    /// Builds a recorder and installs it as the global recorder.
    ///
    /// # Errors
    ///
    /// If a global recorder is already installed, an error will be returned.
    pub fn install(self) -> Result<(), BuildError> {
        let recorder = self.build_recorder();

        metrics::set_global_recorder(recorder).map_err(|_| BuildError::FailedToInstall)
    }
}

impl Default for ReporterBuilder {
    fn default() -> Self {
        ReporterBuilder {
            client_name: DEFAULT_CLIENT_NAME.to_owned(),
            remote_addr: DEFAULT_REMOTE_ADDRESS.to_owned(),
            write_timeout: None,
        }
    }
}
