/// Pure priority computer.
///
/// Packs five independently-scaled fields into non-overlapping bit ranges
/// of a `u32`, highest-significance first: social tier, remaining hop
/// budget, inverse rate fraction, address specificity, size. Because the
/// fields never overlap, two distinct quantized input tuples can never
/// produce the same packed value — the ordering is total by construction,
/// not by tie-breaking after the fact.
///
/// Local submissions always receive the maximum priority; in practice the
/// dispatcher never calls this for local packets (it preserves the
/// submitter's own priority instead), but the function is kept total over
/// its documented domain so it remains independently testable.
const SOCIAL_BITS: u32 = 8;
const HOP_BITS: u32 = 8;
const RATE_BITS: u32 = 8;
const ADDR_BITS: u32 = 6;
const SIZE_BITS: u32 = 2;

const ADDR_SHIFT: u32 = SIZE_BITS;
const RATE_SHIFT: u32 = ADDR_SHIFT + ADDR_BITS;
const HOP_SHIFT: u32 = RATE_SHIFT + RATE_BITS;
const SOCIAL_SHIFT: u32 = HOP_SHIFT + HOP_BITS;

const ADDR_MAX: u8 = (1u16 << ADDR_BITS) as u8 - 1;
const SIZE_MAX: u8 = (1u16 << SIZE_BITS) as u8 - 1;

#[allow(clippy::too_many_arguments)]
pub fn compute_priority(
    is_local: bool,
    size: usize,
    src_nbits: u8,
    dst_nbits: u8,
    hops: u8,
    max_hops: u8,
    social_tier: u8,
    rate_fraction: f64,
) -> u32 {
    if is_local {
        return u32::MAX;
    }

    let social_inv = u8::MAX - social_tier;
    let hop_budget = max_hops.saturating_sub(hops);
    let rate_frac_u8 = (rate_fraction.clamp(0.0, 1.0) * u8::MAX as f64).round() as u8;
    let rate_inv = u8::MAX - rate_frac_u8;
    let addr = (((src_nbits as u16 + dst_nbits as u16) / 2) as u8).min(ADDR_MAX);
    let size_bucket = size_log2_bucket(size).min(SIZE_MAX);

    (social_inv as u32) << SOCIAL_SHIFT
        | (hop_budget as u32) << HOP_SHIFT
        | (rate_inv as u32) << RATE_SHIFT
        | (addr as u32) << ADDR_SHIFT
        | (size_bucket as u32)
}

fn size_log2_bucket(size: usize) -> u8 {
    let bits = usize::BITS - size.max(1).leading_zeros();
    (bits / 8) as u8
}
