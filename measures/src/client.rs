use std::{
    fmt, io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs as _, UdpSocket},
    time::Duration,
};

use tracing::{debug, trace, warn};

use crate::Error;

/// A transport for sending payloads to a collector.
///
/// Each call to [`write`][Client::write] sends exactly one payload. Implementations are expected to connect lazily
/// when written to before [`connect`][Client::connect] has been called.
pub trait Client: Send {
    /// Establishes the connection to the collector.
    ///
    /// Calling this while already connected replaces the existing connection.
    ///
    /// # Errors
    ///
    /// If the connection cannot be established, [`Error::Connection`] is returned.
    fn connect(&mut self) -> Result<(), Error>;

    /// Closes the connection to the collector, if one is open.
    ///
    /// # Errors
    ///
    /// If the connection cannot be closed cleanly, [`Error::Close`] is returned.
    fn disconnect(&mut self) -> Result<(), Error>;

    /// Sends `payload` as a single message, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// If the client is not connected and cannot connect, [`Error::Connection`] is returned. If the payload cannot be
    /// sent, [`Error::Send`] is returned.
    fn write(&mut self, payload: &[u8]) -> Result<usize, Error>;
}

impl<C: Client + ?Sized> Client for Box<C> {
    fn connect(&mut self) -> Result<(), Error> {
        (**self).connect()
    }

    fn disconnect(&mut self) -> Result<(), Error> {
        (**self).disconnect()
    }

    fn write(&mut self, payload: &[u8]) -> Result<usize, Error> {
        (**self).write(payload)
    }
}

#[derive(Debug)]
enum ClientState {
    // No socket has been opened yet, or it was explicitly closed.
    Disconnected,

    // Socket is open and connected to the collector.
    Ready(UdpSocket),
}

impl ClientState {
    fn send(&self, payload: &[u8]) -> io::Result<usize> {
        match self {
            ClientState::Disconnected => Err(io::ErrorKind::NotConnected.into()),
            ClientState::Ready(socket) => socket.send(payload),
        }
    }
}

type OpenSocket = fn(&str, Option<Duration>) -> io::Result<UdpSocket>;

fn open_socket(address: &str, write_timeout: Option<Duration>) -> io::Result<UdpSocket> {
    let mut addrs = address.to_socket_addrs()?.peekable();
    let Some(first) = addrs.peek().copied() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("address '{address}' did not resolve to any socket address"),
        ));
    };

    // Only consider addresses that the local socket's family can reach.
    let remote_addrs: Vec<SocketAddr> = addrs.filter(|addr| addr.is_ipv4() == first.is_ipv4()).collect();
    let local_addr: SocketAddr = if first.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };

    let socket = UdpSocket::bind(local_addr)?;
    socket.connect(&remote_addrs[..])?;
    socket.set_write_timeout(write_timeout)?;
    Ok(socket)
}

/// A client that sends each payload as a UDP datagram.
///
/// The address is resolved, and the socket opened, on the first write (or an explicit [`Client::connect`]). When a
/// write fails, the client reconnects and retries the write exactly once: this covers the common case of a collector
/// restart invalidating the socket, without ever looping.
pub struct UdpClient {
    address: String,
    write_timeout: Option<Duration>,
    state: ClientState,
    open: OpenSocket,
}

impl UdpClient {
    /// Creates a new `UdpClient` for the given `host:port` address.
    ///
    /// The address is not resolved until the client connects.
    pub fn new<A>(address: A) -> Self
    where
        A: Into<String>,
    {
        UdpClient { address: address.into(), write_timeout: None, state: ClientState::Disconnected, open: open_socket }
    }

    /// Sets the write timeout of the socket.
    ///
    /// A zero duration is rejected by the operating system, and surfaces as a connection error.
    ///
    /// Defaults to no timeout.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Returns the address of the collector.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns `true` if the client currently holds an open socket.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, ClientState::Ready(_))
    }

    #[cfg(test)]
    #[must_use]
    fn with_open(mut self, open: OpenSocket) -> Self {
        self.open = open;
        self
    }
}

impl fmt::Debug for UdpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdpClient")
            .field("address", &self.address)
            .field("write_timeout", &self.write_timeout)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Client for UdpClient {
    fn connect(&mut self) -> Result<(), Error> {
        // The previous socket, if any, is closed before the new one is opened.
        self.state = ClientState::Disconnected;

        let socket = (self.open)(&self.address, self.write_timeout).map_err(Error::Connection)?;
        debug!(address = %self.address, local_addr = ?socket.local_addr().ok(), "Connected to collector.");
        self.state = ClientState::Ready(socket);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), Error> {
        if let ClientState::Ready(socket) = std::mem::replace(&mut self.state, ClientState::Disconnected) {
            debug!(address = %self.address, "Disconnecting from collector.");
            drop(socket);
        }

        Ok(())
    }

    fn write(&mut self, payload: &[u8]) -> Result<usize, Error> {
        if !self.is_connected() {
            self.connect()?;
        }

        match self.state.send(payload) {
            Ok(written) => {
                trace!(written, "Sent payload.");
                Ok(written)
            }
            Err(e) => {
                warn!(address = %self.address, error = %e, "Failed to send payload. Reconnecting and retrying once.");
                self.connect()?;
                self.state.send(payload).map_err(Error::Send)
            }
        }
    }
}
