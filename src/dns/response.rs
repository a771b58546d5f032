//! Synthetic "blocked" replies.

use super::parser::FLAGS_OFFSET;

/// QR bit in the high flags byte: the message is a response.
pub const QR_FLAG: u8 = 0x80;
/// RCODE bits in the low flags byte.
pub const RCODE_MASK: u8 = 0x0F;
/// Response code for a non-existent domain.
pub const RCODE_NXDOMAIN: u8 = 3;

/// Turn a query frame into an NXDOMAIN-flagged frame of the same length.
///
/// Only the two DNS flag bytes change: QR is set in the first and RCODE is
/// set to NXDOMAIN in the second. IP and UDP addressing are kept as in the
/// query, source and destination are not swapped. Frames too short to hold
/// a flag byte keep that byte as is.
pub fn build_blocked_response(query: &[u8]) -> Vec<u8> {
    let mut response = query.to_vec();

    if let Some(flags) = response.get_mut(FLAGS_OFFSET) {
        *flags |= QR_FLAG;
    }
    if let Some(flags) = response.get_mut(FLAGS_OFFSET + 1) {
        *flags = (*flags & !RCODE_MASK) | RCODE_NXDOMAIN;
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::parser::tests::query_frame;
    use crate::dns::parser::{DNS_OFFSET, IPV4_HEADER_SIZE};

    fn assert_only_flags_changed(query: &[u8], response: &[u8]) {
        assert_eq!(query.len(), response.len());
        for (i, (before, after)) in query.iter().zip(response).enumerate() {
            if i != FLAGS_OFFSET && i != FLAGS_OFFSET + 1 {
                assert_eq!(before, after, "byte {i} changed");
            }
        }
    }

    #[test]
    fn should_set_response_and_nxdomain_flags() {
        let query = query_frame("pornhub.com");
        let response = build_blocked_response(&query);

        assert_only_flags_changed(&query, &response);
        assert_eq!(response[FLAGS_OFFSET] & QR_FLAG, QR_FLAG);
        assert_eq!(response[FLAGS_OFFSET + 1] & RCODE_MASK, RCODE_NXDOMAIN);
    }

    #[test]
    fn should_overwrite_existing_rcode_and_keep_other_flag_bits() {
        let mut query = query_frame("pornhub.com");
        query[FLAGS_OFFSET] = 0x01;
        query[FLAGS_OFFSET + 1] = 0xA5;

        let response = build_blocked_response(&query);

        assert_eq!(response[FLAGS_OFFSET], 0x81);
        assert_eq!(response[FLAGS_OFFSET + 1], 0xA3);
    }

    #[test]
    fn should_hold_for_any_frame_length() {
        let query: Vec<u8> = (0..64u8).collect();
        for len in 0..=query.len() {
            let response = build_blocked_response(&query[..len]);
            assert_only_flags_changed(&query[..len], &response);
            if len > FLAGS_OFFSET + 1 {
                assert_eq!(response[FLAGS_OFFSET] & QR_FLAG, QR_FLAG);
                assert_eq!(response[FLAGS_OFFSET + 1] & RCODE_MASK, RCODE_NXDOMAIN);
            }
        }
    }

    #[test]
    fn should_leave_short_frames_untouched() {
        let query = vec![0u8; FLAGS_OFFSET];
        assert_eq!(build_blocked_response(&query), query);
    }

    // Whether the reply should swap addressing to reach the querying socket
    // is undecided; until then the query's addressing is kept on purpose.
    #[test]
    fn should_keep_query_addressing_unswapped() {
        let query = query_frame("pornhub.com");
        let response = build_blocked_response(&query);

        assert_eq!(response[12..20], query[12..20]);
        assert_eq!(
            response[IPV4_HEADER_SIZE..DNS_OFFSET],
            query[IPV4_HEADER_SIZE..DNS_OFFSET]
        );
    }
}
