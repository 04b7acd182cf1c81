use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use tracing::info;

use crate::protocol::SockError;
use crate::transport::{ConnectionIo, Transport};

/// [`Transport`] over a blocking `std::net::TcpListener`.
#[derive(Debug)]
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    pub fn bind<A: ToSocketAddrs>(address: A) -> Result<Self, SockError> {
        let listener = TcpListener::bind(address).map_err(SockError::bind)?;
        if let Ok(local) = listener.local_addr() {
            info!(address = %local, "start listening");
        }
        Ok(Self { listener })
    }

    /// Binds every IPv4 interface on `port`; port 0 picks a free one.
    pub fn bind_port(port: u16) -> Result<Self, SockError> {
        Self::bind((Ipv4Addr::UNSPECIFIED, port))
    }
}

impl Transport for TcpTransport {
    type Conn = TcpStream;

    fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.listener.accept()
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    // a throwaway connection to ourselves; the accepting side drops it
    fn wake(&self) -> io::Result<()> {
        let mut address = self.listener.local_addr()?;
        if address.ip().is_unspecified() {
            let loopback = match address.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            };
            address.set_ip(loopback);
        }
        TcpStream::connect(address).map(drop)
    }
}

// `&TcpStream` implements `Read` and `Write`, which is what lets reads and writes share one
// stream without a lock around the whole socket.
impl ConnectionIo for TcpStream {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(&mut &*self, buf)
    }

    fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        let mut stream = self;
        Write::write_all(&mut stream, bytes)?;
        Write::flush(&mut stream)
    }

    fn shutdown_read(&self) -> io::Result<()> {
        self.shutdown(Shutdown::Read)
    }

    fn close(&self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_to_taken_port_is_bind_error() {
        let transport = TcpTransport::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let address = transport.local_addr().unwrap();

        let result = TcpTransport::bind(address);
        assert!(matches!(result, Err(SockError::Bind { .. })));
    }

    #[test]
    fn accepted_stream_reads_and_writes() {
        let transport = TcpTransport::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let address = transport.local_addr().unwrap();

        let mut client = TcpStream::connect(address).unwrap();
        let (server, peer) = transport.accept().unwrap();
        assert_eq!(peer, client.local_addr().unwrap());

        client.write_all(b"ping").unwrap();
        let mut buf = [0u8; 16];
        let n = ConnectionIo::read(&server, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"ping");

        ConnectionIo::write_all(&server, b"pong").unwrap();
        let mut reply = [0u8; 4];
        client.read_exact(&mut reply).unwrap();
        assert_eq!(&reply, b"pong");

        ConnectionIo::close(&server).unwrap();
        let n = client.read(&mut buf).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn wake_unblocks_a_pending_accept() {
        let transport = std::sync::Arc::new(TcpTransport::bind_port(0).unwrap());
        let accepting = std::sync::Arc::clone(&transport);
        let waiter = std::thread::spawn(move || accepting.accept().map(|(_, peer)| peer));

        transport.wake().unwrap();
        let peer = waiter.join().unwrap().unwrap();
        assert!(peer.ip().is_loopback());
    }

    #[test]
    fn read_shutdown_keeps_the_write_side() {
        let transport = TcpTransport::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let mut client = TcpStream::connect(transport.local_addr().unwrap()).unwrap();
        let (server, _) = transport.accept().unwrap();

        client.shutdown(Shutdown::Write).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(ConnectionIo::read(&server, &mut buf).unwrap(), 0);
        ConnectionIo::shutdown_read(&server).unwrap();

        ConnectionIo::write_all(&server, b"late").unwrap();
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"late");
    }
}
