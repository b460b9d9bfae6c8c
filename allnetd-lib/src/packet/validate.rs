use crate::packet::datareq::{bit_counts, data_req_len, DATA_REQ_FIXED_SIZE};
use crate::packet::header::{Header, HEADER_SIZE, MESSAGE_TYPE_DATA_REQ, MESSAGE_TYPE_MGMT, SIG_ALGO_NONE};
use crate::packet::mgmt::MGMT_HEADER_SIZE;
use crate::packet::transport::variable_region_len;

/// Signature length trailer width: a big-endian `u16` at the very end of
/// the packet.
const SIG_LEN_FIELD: usize = 2;

/// `is_valid_message(buf)`: true iff `buf` is at least the fixed
/// header size, its declared transport sub-fields fit, its signature
/// trailer (if any) fits, and any message-type-specific fixed region fits
/// within whatever remains before the signature trailer.
///
/// This is the one place the original implementation's signature-length
/// decode bug (operator precedence between `<<` and `|`) must not be
/// reproduced: the length is parsed as a plain big-endian `u16`, and a
/// signature that claims more bytes than are present is rejected here
/// rather than silently forwarded (DESIGN.md open questions).
pub fn is_valid_message(buf: &[u8]) -> bool {
    if buf.len() < HEADER_SIZE {
        return false;
    }
    let header = Header::parse(buf);
    let hs = HEADER_SIZE + variable_region_len(header.transport);
    if buf.len() < hs {
        return false;
    }

    let payload_end = if header.sig_algo != SIG_ALGO_NONE {
        if buf.len() < hs + SIG_LEN_FIELD {
            return false;
        }
        let sig_len = u16::from_be_bytes([buf[buf.len() - 2], buf[buf.len() - 1]]) as usize;
        match hs.checked_add(sig_len).and_then(|n| n.checked_add(SIG_LEN_FIELD)) {
            Some(total) if total <= buf.len() => buf.len() - sig_len - SIG_LEN_FIELD,
            _ => return false,
        }
    } else {
        buf.len()
    };

    match header.message_type {
        MESSAGE_TYPE_MGMT => hs + MGMT_HEADER_SIZE <= payload_end,
        MESSAGE_TYPE_DATA_REQ => {
            if hs + DATA_REQ_FIXED_SIZE > payload_end {
                return false;
            }
            let (dst_bits, src_bits, mid_bits) = bit_counts(&buf[hs..]);
            hs + data_req_len(dst_bits, src_bits, mid_bits) <= payload_end
        }
        _ => true,
    }
}
