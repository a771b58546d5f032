//! Byte-level DNS query classification.
//!
//! Frames are raw IPv4 packets as read from the tunnel. All offsets assume a
//! 20-byte IPv4 header without options followed by an 8-byte UDP header.
//! Packets carrying IP options are misread; at worst such a query slips
//! through unfiltered, forwarded traffic is never altered.
//!
//! Nothing in this module panics on short or garbage input: a frame that
//! cannot be read is simply "not a query" or "no domain".

use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::udp::UdpPacket;

/// IPv4 header size in bytes (without options).
pub const IPV4_HEADER_SIZE: usize = 20;
/// UDP header size in bytes.
pub const UDP_HEADER_SIZE: usize = 8;
/// Start of the DNS message.
pub const DNS_OFFSET: usize = IPV4_HEADER_SIZE + UDP_HEADER_SIZE;
/// Start of the two DNS header flag bytes.
pub const FLAGS_OFFSET: usize = DNS_OFFSET + 2;
/// Where the question name is read from.
pub const QUESTION_OFFSET: usize = DNS_OFFSET;
/// Shortest frame that can be classified.
pub const MIN_QUERY_LEN: usize = DNS_OFFSET;
/// Shortest frame a question name is extracted from.
pub const MIN_QUESTION_LEN: usize = DNS_OFFSET + 12;
/// Well-known DNS port.
pub const DNS_PORT: u16 = 53;

/// Check whether `frame` is a UDP datagram addressed to port 53.
///
/// Reads the protocol byte (offset 9) and the UDP destination port
/// (offsets 22-23, big-endian).
pub fn is_dns_query(frame: &[u8]) -> bool {
    if frame.len() < MIN_QUERY_LEN {
        return false;
    }

    let Some(ipv4) = Ipv4Packet::new(frame) else {
        return false;
    };
    if ipv4.get_next_level_protocol() != IpNextHeaderProtocols::Udp {
        return false;
    }

    UdpPacket::new(&frame[IPV4_HEADER_SIZE..]).is_some_and(|udp| udp.get_destination() == DNS_PORT)
}

/// Extract the lowercase question name from a query frame.
///
/// Returns `None` only for frames shorter than [`MIN_QUESTION_LEN`] and for
/// a label whose declared length runs past the end of the frame. A frame
/// that ends before the zero label yields the labels read so far. Every
/// length byte is taken as a plain length, and bytes outside ASCII decode
/// to U+FFFD so the rest of the name still matches.
pub fn extract_domain(frame: &[u8]) -> Option<String> {
    decode_name(frame).map(|(name, _)| name)
}

/// Decode the label sequence at [`QUESTION_OFFSET`].
///
/// Returns the name and the offset just past the last byte consumed.
fn decode_name(frame: &[u8]) -> Option<(String, usize)> {
    if frame.len() < MIN_QUESTION_LEN {
        return None;
    }

    let mut name = String::new();
    let mut pos = QUESTION_OFFSET;
    while let Some(&len) = frame.get(pos) {
        pos += 1;
        if len == 0 {
            break;
        }

        let label = frame.get(pos..pos + usize::from(len))?;
        if !name.is_empty() {
            name.push('.');
        }
        name.extend(label.iter().map(|&b| {
            if b.is_ascii() {
                char::from(b.to_ascii_lowercase())
            } else {
                char::REPLACEMENT_CHARACTER
            }
        }));
        pos += usize::from(len);
    }

    Some((name, pos))
}

/// Where each layer starts inside a query frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderOffsets {
    pub ip: usize,
    pub udp: usize,
    pub dns: usize,
    pub flags: usize,
    pub question: usize,
    /// One past the last byte of the question name.
    pub question_end: usize,
}

/// A DNS query decoded from a tunnel frame. Lives for one loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDnsQuery {
    pub transaction_id: u16,
    pub question_name: String,
    pub offsets: HeaderOffsets,
}

impl ParsedDnsQuery {
    /// Decode `frame`, or `None` if it is not a readable DNS query.
    pub fn parse(frame: &[u8]) -> Option<Self> {
        if !is_dns_query(frame) {
            return None;
        }
        let (question_name, question_end) = decode_name(frame)?;

        Some(Self {
            transaction_id: u16::from_be_bytes([frame[DNS_OFFSET], frame[DNS_OFFSET + 1]]),
            question_name,
            offsets: HeaderOffsets {
                ip: 0,
                udp: IPV4_HEADER_SIZE,
                dns: DNS_OFFSET,
                flags: FLAGS_OFFSET,
                question: QUESTION_OFFSET,
                question_end,
            },
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pnet::packet::ip::IpNextHeaderProtocol;
    use pnet::packet::ipv4::MutableIpv4Packet;
    use pnet::packet::udp::MutableUdpPacket;
    use std::net::Ipv4Addr;

    /// Encode `domain` as a label sequence followed by QTYPE=A, QCLASS=IN.
    pub fn question(domain: &str) -> Vec<u8> {
        let mut bytes = Vec::new();
        for label in domain.split('.') {
            bytes.push(u8::try_from(label.len()).unwrap());
            bytes.extend_from_slice(label.as_bytes());
        }
        bytes.push(0);
        bytes.extend_from_slice(&[0, 1, 0, 1]);
        bytes
    }

    /// Build an IPv4 frame carrying `payload` with the given transport.
    pub fn ipv4_frame(protocol: IpNextHeaderProtocol, dst_port: u16, payload: &[u8]) -> Vec<u8> {
        let mut buffer = vec![0u8; DNS_OFFSET + payload.len()];
        {
            let mut ipv4 = MutableIpv4Packet::new(&mut buffer).unwrap();
            ipv4.set_version(4);
            ipv4.set_header_length(5);
            ipv4.set_total_length(u16::try_from(DNS_OFFSET + payload.len()).unwrap());
            ipv4.set_ttl(64);
            ipv4.set_next_level_protocol(protocol);
            ipv4.set_source(Ipv4Addr::new(10, 0, 0, 2));
            ipv4.set_destination(Ipv4Addr::new(1, 1, 1, 1));
        }
        {
            let mut udp = MutableUdpPacket::new(&mut buffer[IPV4_HEADER_SIZE..]).unwrap();
            udp.set_source(40_000);
            udp.set_destination(dst_port);
            udp.set_length(u16::try_from(UDP_HEADER_SIZE + payload.len()).unwrap());
            udp.set_payload(payload);
        }
        buffer
    }

    /// A UDP/53 frame whose question name starts at [`QUESTION_OFFSET`].
    pub fn query_frame(domain: &str) -> Vec<u8> {
        ipv4_frame(IpNextHeaderProtocols::Udp, DNS_PORT, &question(domain))
    }

    #[test]
    fn should_classify_udp_port_53_as_query() {
        assert!(is_dns_query(&query_frame("a.b.com")));
    }

    #[test]
    fn should_reject_other_ports() {
        let payload = question("example.com");
        for port in [0, 52, 54, 443, 5353, 53 << 8] {
            let frame = ipv4_frame(IpNextHeaderProtocols::Udp, port, &payload);
            assert!(!is_dns_query(&frame), "port {port} classified as DNS");
        }
    }

    #[test]
    fn should_reject_non_udp_protocols() {
        let payload = question("example.com");
        for protocol in [IpNextHeaderProtocols::Tcp, IpNextHeaderProtocols::Icmp] {
            let frame = ipv4_frame(protocol, DNS_PORT, &payload);
            assert!(!is_dns_query(&frame));
        }
    }

    #[test]
    fn should_reject_short_frames() {
        let frame = query_frame("example.com");
        assert!(!is_dns_query(&frame[..MIN_QUERY_LEN - 1]));
        assert!(is_dns_query(&frame[..MIN_QUERY_LEN]));
        assert!(!is_dns_query(&[]));
    }

    #[test]
    fn should_extract_question_name() {
        assert_eq!(
            extract_domain(&query_frame("a.b.com")).as_deref(),
            Some("a.b.com")
        );
        assert_eq!(
            extract_domain(&query_frame("mail.example.com")).as_deref(),
            Some("mail.example.com")
        );
    }

    #[test]
    fn should_lowercase_extracted_name() {
        assert_eq!(
            extract_domain(&query_frame("Example.COM")).as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn should_not_extract_from_frames_under_40_bytes() {
        let frame = query_frame("example.com");
        assert!(frame.len() >= MIN_QUESTION_LEN);
        assert_eq!(extract_domain(&frame[..MIN_QUESTION_LEN - 1]), None);
    }

    #[test]
    fn should_abort_when_label_overruns_frame() {
        let mut payload = question("example.com");
        payload[0] = 60;
        let frame = ipv4_frame(IpNextHeaderProtocols::Udp, DNS_PORT, &payload);

        assert_eq!(extract_domain(&frame), None);
    }

    #[test]
    fn should_keep_labels_read_before_frame_ends() {
        let mut payload = b"\x03www\x07pornhub\x03com".to_vec();
        let frame = ipv4_frame(IpNextHeaderProtocols::Udp, DNS_PORT, &payload);
        assert_eq!(frame.len(), 44);
        assert_eq!(extract_domain(&frame).as_deref(), Some("www.pornhub.com"));

        payload.truncate(12);
        let frame = ipv4_frame(IpNextHeaderProtocols::Udp, DNS_PORT, &payload);
        assert_eq!(extract_domain(&frame).as_deref(), Some("www.pornhub"));
    }

    #[test]
    fn should_treat_high_length_bytes_as_plain_lengths() {
        let mut payload = vec![64];
        payload.extend_from_slice(&[b'a'; 64]);
        payload.extend_from_slice(&question("pornhub.com"));
        let frame = ipv4_frame(IpNextHeaderProtocols::Udp, DNS_PORT, &payload);

        let domain = extract_domain(&frame).unwrap();
        assert_eq!(domain, format!("{}.pornhub.com", "a".repeat(64)));
    }

    #[test]
    fn should_abort_when_compression_pointer_overruns_frame() {
        let mut payload = vec![0xC0, 0x0C];
        payload.extend_from_slice(&[0; 12]);
        let frame = ipv4_frame(IpNextHeaderProtocols::Udp, DNS_PORT, &payload);

        assert_eq!(extract_domain(&frame), None);
    }

    #[test]
    fn should_decode_non_ascii_bytes_lossily() {
        let mut payload = b"\x02\xff\xfe\x07pornhub\x03com\x00".to_vec();
        payload.extend_from_slice(&[0, 1, 0, 1]);
        let frame = ipv4_frame(IpNextHeaderProtocols::Udp, DNS_PORT, &payload);

        assert_eq!(
            extract_domain(&frame).as_deref(),
            Some("\u{fffd}\u{fffd}.pornhub.com")
        );
    }

    #[test]
    fn should_return_empty_root_name() {
        let frame = ipv4_frame(IpNextHeaderProtocols::Udp, DNS_PORT, &[0; 16]);
        assert_eq!(extract_domain(&frame).as_deref(), Some(""));
    }

    #[test]
    fn should_parse_query_with_offsets() {
        let frame = query_frame("a.b.com");
        let query = ParsedDnsQuery::parse(&frame).unwrap();

        assert_eq!(query.question_name, "a.b.com");
        // The name is read from the DNS header position, so its first
        // bytes double as the transaction id.
        assert_eq!(query.transaction_id, u16::from_be_bytes([1, b'a']));
        assert_eq!(query.offsets.udp, 20);
        assert_eq!(query.offsets.flags, 30);
        assert_eq!(query.offsets.question_end, QUESTION_OFFSET + 9);
    }

    #[test]
    fn should_not_parse_non_queries() {
        let frame = ipv4_frame(IpNextHeaderProtocols::Udp, 443, &question("example.com"));
        assert_eq!(ParsedDnsQuery::parse(&frame), None);
    }

    #[test]
    fn should_survive_garbage_input() {
        let mut seed: u32 = 0x1234_5678;
        for len in 0..128 {
            let frame: Vec<u8> = (0..len)
                .map(|_| {
                    seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                    (seed >> 24) as u8
                })
                .collect();
            let _ = is_dns_query(&frame);
            let _ = extract_domain(&frame);
            let _ = ParsedDnsQuery::parse(&frame);
        }
    }
}
