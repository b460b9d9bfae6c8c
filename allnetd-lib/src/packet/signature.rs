use crate::packet::header::{Header, HEADER_SIZE, SIG_ALGO_NONE};

/// Split an already-validated packet into its signed region and trailing
/// signature bytes: "the signed region is everything between the
/// fixed header and the signature length field." The fixed header itself
/// (including the `hops` byte, which mutates on every forward) is excluded,
/// so re-signing-region lookup survives a hop-count increment unchanged.
///
/// Returns `None` if `header.sig_algo == SIG_ALGO_NONE`. Callers must only
/// pass buffers `is_valid_message` has already accepted.
pub fn split_signature<'a>(buf: &'a [u8], header: &Header) -> Option<(&'a [u8], &'a [u8])> {
    if header.sig_algo == SIG_ALGO_NONE {
        return None;
    }
    let sig_len = u16::from_be_bytes([buf[buf.len() - 2], buf[buf.len() - 1]]) as usize;
    let sig_start = buf.len() - 2 - sig_len;
    Some((&buf[HEADER_SIZE..sig_start], &buf[sig_start..buf.len() - 2]))
}
