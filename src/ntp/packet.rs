// NTP wire format - the 48-byte client/server packet (RFC 5905 layout)
//
// Only the header byte and the timestamps are interpreted; everything else is
// carried as zero in requests and ignored in replies.

use crate::ntp::NtpError;
use crate::timecode::rate::MICROS_PER_SECOND;

pub const NTP_PORT: u16 = 123;
pub const NTP_PACKET_LEN: usize = 48;

/// Seconds between 1900-01-01 (NTP era 0) and 1970-01-01
pub const NTP_UNIX_EPOCH_DELTA: i64 = 2_208_988_800;

/// LI = 0, VN = 4, Mode = 3 (client)
pub const LI_VN_MODE_CLIENT: u8 = 0x23;
pub const MODE_CLIENT: u8 = 3;
pub const MODE_SERVER: u8 = 4;

/// 32.32 fixed-point seconds since 1900
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NtpTimestamp {
    pub seconds: u32,
    pub fraction: u32,
}

impl NtpTimestamp {
    pub fn from_unix_us(unix_us: i64) -> Self {
        let unix_secs = unix_us.div_euclid(MICROS_PER_SECOND);
        let micros = unix_us.rem_euclid(MICROS_PER_SECOND) as u64;
        Self {
            seconds: (unix_secs + NTP_UNIX_EPOCH_DELTA) as u32,
            fraction: ((micros << 32) / MICROS_PER_SECOND as u64) as u32,
        }
    }

    pub fn to_unix_us(&self) -> i64 {
        let unix_secs = self.seconds as i64 - NTP_UNIX_EPOCH_DELTA;
        let micros = ((self.fraction as u64 * MICROS_PER_SECOND as u64) >> 32) as i64;
        unix_secs * MICROS_PER_SECOND + micros
    }

    pub fn is_zero(&self) -> bool {
        self.seconds == 0 && self.fraction == 0
    }

    fn read(bytes: &[u8]) -> Self {
        Self {
            seconds: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            fraction: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    fn write(&self, bytes: &mut [u8]) {
        bytes[0..4].copy_from_slice(&self.seconds.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.fraction.to_be_bytes());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NtpPacket {
    pub li_vn_mode: u8,
    pub stratum: u8,
    pub poll: u8,
    pub precision: i8,
    pub root_delay: u32,
    pub root_dispersion: u32,
    pub reference_id: u32,
    pub reference: NtpTimestamp,
    pub origin: NtpTimestamp,
    pub receive: NtpTimestamp,
    pub transmit: NtpTimestamp,
}

impl NtpPacket {
    /// Client request carrying our own transmit time
    pub fn client_request(transmit: NtpTimestamp) -> Self {
        Self {
            li_vn_mode: LI_VN_MODE_CLIENT,
            transmit,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> u8 {
        self.li_vn_mode & 0x07
    }

    pub fn version(&self) -> u8 {
        (self.li_vn_mode >> 3) & 0x07
    }

    pub fn to_bytes(&self) -> [u8; NTP_PACKET_LEN] {
        let mut bytes = [0u8; NTP_PACKET_LEN];
        bytes[0] = self.li_vn_mode;
        bytes[1] = self.stratum;
        bytes[2] = self.poll;
        bytes[3] = self.precision as u8;
        bytes[4..8].copy_from_slice(&self.root_delay.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.root_dispersion.to_be_bytes());
        bytes[12..16].copy_from_slice(&self.reference_id.to_be_bytes());
        self.reference.write(&mut bytes[16..24]);
        self.origin.write(&mut bytes[24..32]);
        self.receive.write(&mut bytes[32..40]);
        self.transmit.write(&mut bytes[40..48]);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, NtpError> {
        if bytes.len() < NTP_PACKET_LEN {
            return Err(NtpError::MalformedReply(format!(
                "short packet: {} bytes",
                bytes.len()
            )));
        }

        let word = |at: usize| u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

        Ok(Self {
            li_vn_mode: bytes[0],
            stratum: bytes[1],
            poll: bytes[2],
            precision: bytes[3] as i8,
            root_delay: word(4),
            root_dispersion: word(8),
            reference_id: word(12),
            reference: NtpTimestamp::read(&bytes[16..24]),
            origin: NtpTimestamp::read(&bytes[24..32]),
            receive: NtpTimestamp::read(&bytes[32..40]),
            transmit: NtpTimestamp::read(&bytes[40..48]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch_maps_to_ntp_delta() {
        let ts = NtpTimestamp::from_unix_us(0);
        assert_eq!(ts.seconds as i64, NTP_UNIX_EPOCH_DELTA);
        assert_eq!(ts.fraction, 0);
    }

    #[test]
    fn test_half_second_fraction() {
        let ts = NtpTimestamp::from_unix_us(1_500_000);
        assert_eq!(ts.fraction, 1 << 31);
        assert_eq!(ts.to_unix_us(), 1_500_000);
    }

    #[test]
    fn test_timestamp_microsecond_precision() {
        let unix_us = 1_709_967_942_123_456;
        let back = NtpTimestamp::from_unix_us(unix_us).to_unix_us();
        // 32-bit fractions truncate, at most one microsecond is lost
        assert!((unix_us - back).abs() <= 1);
    }

    #[test]
    fn test_client_request_header() {
        let packet = NtpPacket::client_request(NtpTimestamp::from_unix_us(0));
        let bytes = packet.to_bytes();
        assert_eq!(bytes[0], 0x23);
        assert_eq!(packet.mode(), MODE_CLIENT);
        assert_eq!(packet.version(), 4);
        assert_eq!(&bytes[40..44], &(NTP_UNIX_EPOCH_DELTA as u32).to_be_bytes());
    }

    #[test]
    fn test_parse_server_reply() {
        let mut reply = NtpPacket::client_request(NtpTimestamp { seconds: 1, fraction: 2 });
        reply.li_vn_mode = 0x24;
        reply.stratum = 2;
        reply.origin = NtpTimestamp { seconds: 1, fraction: 2 };
        reply.transmit = NtpTimestamp { seconds: 3, fraction: 4 };

        let parsed = NtpPacket::from_bytes(&reply.to_bytes()).unwrap();
        assert_eq!(parsed.mode(), MODE_SERVER);
        assert_eq!(parsed.stratum, 2);
        assert_eq!(parsed.origin, NtpTimestamp { seconds: 1, fraction: 2 });
        assert_eq!(parsed.transmit, NtpTimestamp { seconds: 3, fraction: 4 });
    }

    #[test]
    fn test_short_packet_rejected() {
        assert!(matches!(
            NtpPacket::from_bytes(&[0u8; 12]),
            Err(NtpError::MalformedReply(_))
        ));
    }
}
