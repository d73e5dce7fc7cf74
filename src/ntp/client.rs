// UDP client - one request/reply exchange per offset query

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::ntp::packet::{MODE_SERVER, NTP_PORT, NtpPacket, NtpTimestamp};
use crate::ntp::{NtpError, NtpResult};
use crate::timecode::source::system_time_us;

/// Something that can measure `server_time - local_time` once
pub trait OffsetSource {
    fn query_offset(&mut self) -> NtpResult<i64>;
}

/// Resolves `host`, `host:port`, `ip` or `ip:port`; IPv4 results are preferred
pub fn resolve_server(server: &str) -> NtpResult<SocketAddr> {
    let server = server.trim();
    if server.is_empty() {
        return Err(NtpError::Resolve(server.to_string()));
    }

    if let Ok(addr) = server.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = server.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, NTP_PORT));
    }

    let candidates: Vec<SocketAddr> = match server.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => server.to_socket_addrs(),
        _ => (server, NTP_PORT).to_socket_addrs(),
    }
    .map_err(|_| NtpError::Resolve(server.to_string()))?
    .collect();

    candidates
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| candidates.first())
        .copied()
        .ok_or_else(|| NtpError::Resolve(server.to_string()))
}

/// Socket bound for the lifetime of one synchronization
pub struct UdpOffsetSource {
    socket: UdpSocket,
    server: SocketAddr,
    timeout: Duration,
}

impl UdpOffsetSource {
    pub fn connect(server: &str, timeout: Duration) -> NtpResult<Self> {
        let server = resolve_server(server)?;
        let bind_addr = if server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };

        let socket = UdpSocket::bind(bind_addr)?;
        socket.connect(server)?;
        socket.set_read_timeout(Some(timeout))?;

        Ok(Self {
            socket,
            server,
            timeout,
        })
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }
}

impl OffsetSource for UdpOffsetSource {
    fn query_offset(&mut self) -> NtpResult<i64> {
        let transmit = NtpTimestamp::from_unix_us(system_time_us(SystemTime::now()));
        let request = NtpPacket::client_request(transmit);
        self.socket.send(&request.to_bytes())?;

        let mut buf = [0u8; 512];
        let len = match self.socket.recv(&mut buf) {
            Ok(len) => len,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Err(NtpError::Timeout(self.timeout));
            }
            Err(e) => return Err(e.into()),
        };
        let received_us = system_time_us(SystemTime::now());

        let reply = NtpPacket::from_bytes(&buf[..len])?;
        validate_reply(&reply, transmit)?;

        let offset = reply.transmit.to_unix_us() - received_us;
        debug!(server = %self.server, stratum = reply.stratum, offset_us = offset, "NTP sample");
        Ok(offset)
    }
}

fn validate_reply(reply: &NtpPacket, sent: NtpTimestamp) -> NtpResult<()> {
    if reply.mode() != MODE_SERVER {
        return Err(NtpError::MalformedReply(format!("unexpected mode {}", reply.mode())));
    }
    if reply.origin != sent {
        return Err(NtpError::MalformedReply("origin timestamp does not match request".into()));
    }
    if reply.transmit.is_zero() {
        return Err(NtpError::MalformedReply("empty transmit timestamp".into()));
    }
    Ok(())
}
