use crate::packet::header::HEADER_SIZE;

/// Width of `Fingerprint` in bytes — 256-bit BLAKE3.
pub const FINGERPRINT_LEN: usize = 32;

pub type Fingerprint = [u8; FINGERPRINT_LEN];

/// Index of the `hops` byte within the fixed header.
const HOPS_OFFSET: usize = 2;

/// Digest `buf` with the hop-count byte excluded, so a packet's fingerprint
/// does not change as it crosses hops.
///
/// `buf` must be at least `HEADER_SIZE` bytes; this is only ever called
/// after `is_valid_message` has confirmed that.
pub fn fingerprint(buf: &[u8]) -> Fingerprint {
    debug_assert!(buf.len() >= HEADER_SIZE);
    let mut hasher = blake3::Hasher::new();
    hasher.update(&buf[..HOPS_OFFSET]);
    hasher.update(&buf[HOPS_OFFSET + 1..]);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet_with_hops(hops: u8) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_SIZE + 4];
        buf[0] = 4;
        buf[1] = 1;
        buf[HOPS_OFFSET] = hops;
        buf[HEADER_SIZE..].copy_from_slice(b"data");
        buf
    }

    #[test]
    fn invariant_under_hop_increment() {
        let a = packet_with_hops(0);
        let b = packet_with_hops(1);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn differs_on_payload_change() {
        let mut a = packet_with_hops(0);
        let b = packet_with_hops(0);
        a[HEADER_SIZE] = b'X';
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
