//! Request identity.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use sha2::digest::Update;

/// Longest host accepted from the proxy, in bytes.
pub const MAX_HOST_LEN: usize = 256;

/// The identity a token or challenge is bound to.
///
/// Built per request from untrusted transport fields. It is not secret; it
/// is the material hashed into every signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestIdentifier<'a> {
    /// Client address as seen by the proxy
    pub src_addr: IpAddr,
    /// Requested host, raw bytes
    pub host: &'a [u8],
    /// Requested level, 1-based
    pub level: u8,
}

impl<'a> RequestIdentifier<'a> {
    /// Creates an identifier.
    #[must_use]
    pub const fn new(src_addr: IpAddr, host: &'a [u8], level: u8) -> Self {
        Self {
            src_addr,
            host,
            level,
        }
    }

    /// Feeds `host || address octets` into `into`.
    ///
    /// The address is always written as 16 octets, IPv4 in its mapped
    /// `::ffff:a.b.c.d` form. Token verification needs this prefix on its
    /// own because the level byte it signs comes from the token.
    pub fn write_host_and_addr(&self, into: &mut impl Update) {
        into.update(self.host);
        let octets = match self.src_addr {
            IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
            IpAddr::V6(v6) => v6.octets(),
        };
        into.update(&octets);
    }

    /// Feeds `host || address octets || level` into `into`.
    ///
    /// No delimiters are written. The address and level have fixed widths,
    /// so the host length is implied. An IPv4 client and the same client
    /// seen through its mapped IPv6 address are one identity.
    pub fn write_identity_digest(&self, into: &mut impl Update) {
        self.write_host_and_addr(into);
        into.update(&[self.level]);
    }
}

/// Parses raw address octets: 4 bytes for IPv4, 16 for IPv6.
#[must_use]
pub fn addr_from_octets(octets: &[u8]) -> Option<IpAddr> {
    if let Ok(v4) = <[u8; 4]>::try_from(octets) {
        return Some(IpAddr::V4(Ipv4Addr::from(v4)));
    }
    if let Ok(v6) = <[u8; 16]>::try_from(octets) {
        return Some(IpAddr::V6(Ipv6Addr::from(v6)));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<u8>);

    impl Update for Recorder {
        fn update(&mut self, data: &[u8]) {
            self.0.extend_from_slice(data);
        }
    }

    #[test]
    fn test_identity_digest_order() {
        let id = RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), b"example.com", 2);
        let mut rec = Recorder::default();
        id.write_identity_digest(&mut rec);
        let mut expected = b"example.com".to_vec();
        expected.extend_from_slice(&[0; 10]);
        expected.extend_from_slice(&[0xff, 0xff, 1, 2, 3, 4, 2]);
        assert_eq!(rec.0, expected);
    }

    #[test]
    fn test_mapped_ipv6_matches_ipv4() {
        let v4 = RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), b"h", 1);
        let mapped = RequestIdentifier::new(
            IpAddr::V6(Ipv4Addr::new(1, 2, 3, 4).to_ipv6_mapped()),
            b"h",
            1,
        );
        let (mut a, mut b) = (Recorder::default(), Recorder::default());
        v4.write_identity_digest(&mut a);
        mapped.write_identity_digest(&mut b);
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn test_host_cannot_absorb_address_bytes() {
        // 2001:db8::102:304 under host "x" against 1.2.3.4 under a host
        // that carries the first 12 bytes of that address.
        let v6: Ipv6Addr = "2001:db8::102:304".parse().unwrap();
        let mut long_host = b"x".to_vec();
        long_host.extend_from_slice(&v6.octets()[..12]);

        let a = RequestIdentifier::new(IpAddr::V6(v6), b"x", 1);
        let b = RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), &long_host, 1);
        let (mut ra, mut rb) = (Recorder::default(), Recorder::default());
        a.write_identity_digest(&mut ra);
        b.write_identity_digest(&mut rb);
        assert_ne!(ra.0, rb.0);
    }

    #[test]
    fn test_ipv6_writes_sixteen_octets() {
        let id = RequestIdentifier::new(IpAddr::V6(Ipv6Addr::LOCALHOST), b"h", 1);
        let mut rec = Recorder::default();
        id.write_identity_digest(&mut rec);
        assert_eq!(rec.0.len(), 1 + 16 + 1);
        assert_eq!(rec.0[16], 1);
    }

    #[test]
    fn test_addr_from_octets() {
        assert_eq!(
            addr_from_octets(&[10, 0, 0, 1]),
            Some(IpAddr::from([10, 0, 0, 1]))
        );
        assert_eq!(
            addr_from_octets(&Ipv6Addr::LOCALHOST.octets()),
            Some(IpAddr::V6(Ipv6Addr::LOCALHOST))
        );
        assert_eq!(addr_from_octets(&[1, 2, 3]), None);
        assert_eq!(addr_from_octets(&[]), None);
    }
}
