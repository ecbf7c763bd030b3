//! Transport customization hook.
//!
//! Lets an application tune sockets the client opens (buffer sizes, keepalive,
//! `TCP_NODELAY`) without the client knowing about those options.

use std::io;

use tokio::net::{TcpSocket, TcpStream};

/// # Hook applied to every transport the client opens.
///
/// Both methods default to no-ops. An error aborts the connection attempt.
///
/// # Example
/// ```
/// use clientres::TransportCustomizer;
/// use tokio::net::TcpStream;
///
/// #[derive(Debug)]
/// struct NoDelay;
///
/// impl TransportCustomizer for NoDelay {
///     fn after_connect(&self, stream: &TcpStream) -> std::io::Result<()> {
///         stream.set_nodelay(true)
///     }
/// }
/// ```
pub trait TransportCustomizer: Send + Sync + std::fmt::Debug + 'static {
    /// Called on the socket before it connects.
    fn configure_socket(&self, _socket: &TcpSocket) -> io::Result<()> {
        Ok(())
    }

    /// Called on the stream right after it connected.
    fn after_connect(&self, _stream: &TcpStream) -> io::Result<()> {
        Ok(())
    }
}

/// Customizer that leaves every transport untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCustomizer;

impl TransportCustomizer for NoopCustomizer {}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[derive(Debug)]
    struct Tuned;

    impl TransportCustomizer for Tuned {
        fn configure_socket(&self, socket: &TcpSocket) -> io::Result<()> {
            socket.set_nodelay(true)
        }
    }

    #[tokio::test]
    async fn test_hooks_apply_to_real_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let socket = TcpSocket::new_v4().expect("socket");
        Tuned.configure_socket(&socket).expect("configure");
        assert!(socket.nodelay().expect("nodelay"));

        let stream = socket.connect(addr).await.expect("connect");
        NoopCustomizer.after_connect(&stream).expect("after_connect");
    }
}
