//! A TCP byte stream that can be cancelled from another thread.
//!
//! [`SocketStream`] blocks for at most one poll interval at a time, checking a
//! [`CancellationToken`] in between. It is a plain [`Read`] + [`Write`] stream, so it can be
//! wrapped in a [`BufferedReader`](crate::BufferedReader) or
//! [`BufferedWriter`](crate::BufferedWriter) like any other.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::InputStream;

/// How long a [`SocketStream`] waits on the socket before checking for cancellation again.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A flag that asks blocked socket operations to give up.
///
/// Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. This cannot be undone.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` if [`cancel`](Self::cancel) has been called on this token or a clone of it.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// The error carried by the [`io::Error`] that a cancelled [`SocketStream`] operation returns.
#[derive(Copy, Clone, Eq, PartialEq, Debug, thiserror::Error)]
#[error("socket operation was cancelled")]
pub struct Cancelled;

/// Returns `true` if `e` is the error of a cancelled [`SocketStream`] operation.
pub fn is_cancelled(e: &io::Error) -> bool {
    e.get_ref().is_some_and(|inner| inner.is::<Cancelled>())
}

/// A TCP stream whose blocking reads and writes can be cancelled.
#[derive(Debug)]
pub struct SocketStream {
    socket: TcpStream,
    token: CancellationToken,
    poll_interval: Duration,
}

impl SocketStream {
    /// Wraps `socket`. This sets the socket's read and write timeouts to the poll interval.
    pub fn new(socket: TcpStream, token: CancellationToken) -> io::Result<Self> {
        let mut stream = Self {
            socket,
            token,
            poll_interval: DEFAULT_POLL_INTERVAL,
        };
        stream.set_poll_interval(DEFAULT_POLL_INTERVAL)?;
        Ok(stream)
    }

    /// Connects to `addr`, trying each address it resolves to in turn, and wraps the socket.
    ///
    /// The connection is made on a helper thread while this thread checks `token` every poll
    /// interval. If `token` is cancelled first, this returns the [`Cancelled`] error and the
    /// helper thread drops whatever socket it ends up with.
    pub fn connect<A: ToSocketAddrs>(addr: A, token: CancellationToken) -> io::Result<Self> {
        let addrs: Vec<SocketAddr> = addr.to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "address did not resolve to anything",
            ));
        }
        if token.is_cancelled() {
            return Err(io::Error::other(Cancelled));
        }

        let (done, result) = mpsc::channel();
        thread::spawn(move || {
            // The receiver is gone if the connect was cancelled.
            let _ = done.send(TcpStream::connect(&addrs[..]));
        });

        loop {
            match result.recv_timeout(DEFAULT_POLL_INTERVAL) {
                Ok(socket) => return Self::new(socket?, token),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if token.is_cancelled() {
                        debug!("connect cancelled");
                        return Err(io::Error::other(Cancelled));
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(io::Error::other("connect thread exited without a result"));
                }
            }
        }
    }

    /// Changes how often blocked operations check for cancellation.
    pub fn set_poll_interval(&mut self, interval: Duration) -> io::Result<()> {
        // Zero timeouts are rejected by the socket.
        let interval = interval.max(Duration::from_micros(1));
        self.socket.set_read_timeout(Some(interval))?;
        self.socket.set_write_timeout(Some(interval))?;
        self.poll_interval = interval;
        Ok(())
    }

    /// The current poll interval.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// The token checked by this stream.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Accesses the socket.
    pub fn get_ref(&self) -> &TcpStream {
        &self.socket
    }

    /// Extracts the socket. Its timeouts are left as they are.
    pub fn into_inner(self) -> TcpStream {
        self.socket
    }

    fn check_cancelled(&self) -> io::Result<()> {
        if self.token.is_cancelled() {
            debug!("socket operation cancelled");
            return Err(io::Error::other(Cancelled));
        }
        Ok(())
    }
}

fn is_poll_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

impl Read for SocketStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            self.check_cancelled()?;
            match self.socket.read(buf) {
                Err(e) if is_poll_timeout(&e) => continue,
                result => return result,
            }
        }
    }
}

impl Write for SocketStream {
    /// Sends some of `buf`. [`Write::write_all`] loops over this until everything is sent.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        loop {
            self.check_cancelled()?;
            match self.socket.write(buf) {
                Err(e) if is_poll_timeout(&e) => continue,
                result => return result,
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.socket.flush()
    }
}

impl InputStream for SocketStream {}
