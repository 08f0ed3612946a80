//! Per-stream IV derivation.
//!
//! Each field is written byte by byte from the masked value rather than by
//! shifting, so a byte holds `(value & mask) as u8`. For the upper bytes of a
//! field the mask selects bits that the cast then discards, which leaves them
//! zero: only the low byte of the column id, kind code and stripe index reach
//! the IV. Files written by other ORC implementations use the same bytes, so
//! the layout must not be "fixed" here.

use common::{ProtectError, StreamKind};

pub const IV_LENGTH: usize = 16;
pub const COLUMN_ID_LENGTH: usize = 3;
pub const KIND_LENGTH: usize = 2;
pub const STRIPE_ID_LENGTH: usize = 3;
/// Bytes left for the block counter.
pub const MIN_COUNT_BYTES: usize = 8;

pub const MAX_COLUMN: u64 = 0xff_ffff;
pub const MAX_KIND: u64 = 0xffff;
pub const MAX_STRIPE: u64 = 0xff_ffff;

const KIND_OFFSET: usize = COLUMN_ID_LENGTH;
const STRIPE_OFFSET: usize = COLUMN_ID_LENGTH + KIND_LENGTH;
const COUNTER_OFFSET: usize = STRIPE_OFFSET + STRIPE_ID_LENGTH;

const _: () = assert!(COUNTER_OFFSET + MIN_COUNT_BYTES == IV_LENGTH);

/// Zero the block-counter half of `iv`.
pub fn clear_counter(iv: &mut [u8; IV_LENGTH]) {
    iv[COUNTER_OFFSET..].fill(0);
}

/// Point `iv` at stripe `stripe_index` and restart its counter.
///
/// # Errors
///
/// Returns [`ProtectError::OutOfRange`] unless `1 <= stripe_index <= MAX_STRIPE`.
pub fn modify_iv_for_stripe(iv: &mut [u8; IV_LENGTH], stripe_index: u64) -> Result<(), ProtectError> {
    if !(1..=MAX_STRIPE).contains(&stripe_index) {
        return Err(ProtectError::OutOfRange(format!(
            "stripe index {stripe_index} outside 1..={MAX_STRIPE}"
        )));
    }
    iv[STRIPE_OFFSET] = (stripe_index & 0xff_0000) as u8;
    iv[STRIPE_OFFSET + 1] = (stripe_index & 0xff00) as u8;
    iv[STRIPE_OFFSET + 2] = (stripe_index & 0xff) as u8;
    clear_counter(iv);
    Ok(())
}

/// Derive the initial IV of one stream.
///
/// # Errors
///
/// Returns [`ProtectError::OutOfRange`] for a stripe index outside
/// `1..=MAX_STRIPE`.
pub fn derive_stream_iv(
    column_id: u64,
    kind: StreamKind,
    stripe_index: u64,
) -> Result<[u8; IV_LENGTH], ProtectError> {
    let kind = u64::from(kind.code());
    let mut iv = [0u8; IV_LENGTH];
    iv[0] = (column_id & 0xff_0000) as u8;
    iv[1] = (column_id & 0xff00) as u8;
    iv[2] = (column_id & 0xff) as u8;
    iv[KIND_OFFSET] = (kind & 0xff00) as u8;
    iv[KIND_OFFSET + 1] = (kind & 0xff) as u8;
    modify_iv_for_stripe(&mut iv, stripe_index)?;
    Ok(iv)
}
