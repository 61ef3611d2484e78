//! Transport primitives for the appender.

use std::{
    io::{self, Write},
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    time::Duration,
};

use native_tls::{TlsConnector, TlsStream};

/// Transport targeted by the appender.
#[derive(Clone, Debug)]
pub enum SocketTransport {
    /// TCP transport with optional TLS.
    Tcp(TcpTransport),
    /// Scriptable in-memory transport used by tests.
    #[cfg(any(test, feature = "test-util"))]
    Mock(mock::MockTransport),
}

/// TCP transport configuration.
#[derive(Clone, Debug)]
pub struct TcpTransport {
    /// Hostname or IP address to connect to.
    pub host: String,
    /// TCP port number.
    pub port: u16,
    /// Optional TLS configuration.
    pub tls: Option<TlsOptions>,
}

impl TcpTransport {
    fn socket_addrs(&self) -> io::Result<Vec<SocketAddr>> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map(|iter| iter.collect())
    }
}

/// TLS connection options.
#[derive(Clone, Debug)]
pub struct TlsOptions {
    /// Domain name presented during the TLS handshake.
    pub domain: String,
    /// Skip certificate validation when true (intended for tests).
    pub insecure_skip_verify: bool,
}

impl TlsOptions {
    fn connector(&self) -> io::Result<TlsConnector> {
        let mut builder = TlsConnector::builder();
        if self.insecure_skip_verify {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        builder.build().map_err(io::Error::other)
    }
}

/// Active socket connection state.
pub enum ActiveConnection {
    PlainTcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    #[cfg(any(test, feature = "test-util"))]
    Mock(mock::MockConnection),
}

impl ActiveConnection {
    /// Update the write timeout for the underlying socket.
    pub fn set_write_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        match self {
            ActiveConnection::PlainTcp(stream) => stream.set_write_timeout(Some(timeout)),
            ActiveConnection::Tls(stream) => stream.get_ref().set_write_timeout(Some(timeout)),
            #[cfg(any(test, feature = "test-util"))]
            ActiveConnection::Mock(_) => Ok(()),
        }
    }

    /// Write a full buffer to the socket.
    pub fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            ActiveConnection::PlainTcp(stream) => stream.write_all(buf),
            ActiveConnection::Tls(stream) => stream.write_all(buf),
            #[cfg(any(test, feature = "test-util"))]
            ActiveConnection::Mock(conn) => conn.write_all(buf),
        }
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        match self {
            ActiveConnection::PlainTcp(stream) => stream.flush(),
            ActiveConnection::Tls(stream) => stream.flush(),
            #[cfg(any(test, feature = "test-util"))]
            ActiveConnection::Mock(_) => Ok(()),
        }
    }
}

fn connect_tcp(config: &TcpTransport, timeout: Duration) -> io::Result<TcpStream> {
    let addrs = config.socket_addrs()?;
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_nonblocking(false)?;
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no addresses resolved for {}:{}", config.host, config.port),
        )
    }))
}

/// Establish a connection using the provided transport definition.
pub fn connect_transport(
    transport: &SocketTransport,
    connect_timeout: Duration,
) -> io::Result<ActiveConnection> {
    match transport {
        SocketTransport::Tcp(config) => {
            let stream = connect_tcp(config, connect_timeout)?;
            if let Some(tls) = &config.tls {
                let connector = tls.connector()?;
                stream.set_read_timeout(Some(connect_timeout))?;
                stream.set_write_timeout(Some(connect_timeout))?;
                let stream = connector
                    .connect(&tls.domain, stream)
                    .map_err(io::Error::other)?;
                let tcp_ref = stream.get_ref();
                tcp_ref.set_read_timeout(None)?;
                tcp_ref.set_write_timeout(None)?;
                Ok(ActiveConnection::Tls(Box::new(stream)))
            } else {
                Ok(ActiveConnection::PlainTcp(stream))
            }
        }
        #[cfg(any(test, feature = "test-util"))]
        SocketTransport::Mock(config) => config.dial().map(ActiveConnection::Mock),
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    //! In-memory transport whose connections can be scripted to fail, for
    //! exercising reconnect and retransmission behaviour without a network.

    use std::{io, sync::Arc};

    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct MockState {
        bytes: Vec<u8>,
        attempts: usize,
        connects: usize,
        connect_failures: usize,
        write_failures: usize,
    }

    /// Shared handle over a scripted wire.
    ///
    /// Cloning shares the underlying state, so a test can keep one handle for
    /// assertions while the appender owns another.
    #[derive(Clone, Debug, Default)]
    pub struct MockTransport {
        state: Arc<Mutex<MockState>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail the next `count` connection attempts.
        pub fn fail_connects(self, count: usize) -> Self {
            self.state.lock().connect_failures = count;
            self
        }

        /// Fail the next `count` writes, regardless of connection.
        pub fn fail_writes(self, count: usize) -> Self {
            self.state.lock().write_failures = count;
            self
        }

        /// Every byte successfully written so far.
        pub fn bytes(&self) -> Vec<u8> {
            self.state.lock().bytes.clone()
        }

        /// Number of successful connection attempts so far.
        pub fn connect_count(&self) -> usize {
            self.state.lock().connects
        }

        /// Number of connection attempts so far, failed ones included.
        pub fn attempt_count(&self) -> usize {
            self.state.lock().attempts
        }

        pub(crate) fn dial(&self) -> io::Result<MockConnection> {
            let mut state = self.state.lock();
            state.attempts += 1;
            if state.connect_failures > 0 {
                state.connect_failures -= 1;
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "scripted connect failure",
                ));
            }
            state.connects += 1;
            Ok(MockConnection {
                state: Arc::clone(&self.state),
            })
        }
    }

    /// One scripted connection handed to the dispatcher.
    #[derive(Debug)]
    pub struct MockConnection {
        state: Arc<Mutex<MockState>>,
    }

    impl MockConnection {
        pub(crate) fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
            let mut state = self.state.lock();
            if state.write_failures > 0 {
                state.write_failures -= 1;
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "scripted write failure",
                ));
            }
            state.bytes.extend_from_slice(buf);
            Ok(())
        }
    }
}
