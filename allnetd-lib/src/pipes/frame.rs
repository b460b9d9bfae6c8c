use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// 4-byte ASCII magic prefixing every frame.
pub const MAGIC: [u8; 4] = *b"ALLN";

/// Historical AllNet MTU: the largest `length` a frame may declare before
/// it is treated as a framing error rather than a validator-level drop.
pub const MAX_FRAME_LEN: usize = 12_288;

const FRAME_PREFIX_LEN: usize = 4 + 4 + 4; // magic + length + priority

#[derive(Error, Debug)]
pub enum FrameError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("bad magic (expected ALLN)")]
    BadMagic,
    #[error("declared frame length {0} exceeds ALLNET_MTU ({MAX_FRAME_LEN})")]
    TooLarge(usize),
}

/// Read one frame: 4-byte magic, 4-byte BE length, 4-byte BE priority,
/// then `length` payload bytes.
pub async fn read_frame<R: tokio::io::AsyncRead + Unpin>(r: &mut R) -> Result<(Vec<u8>, u32), FrameError> {
    let mut prefix = [0u8; FRAME_PREFIX_LEN];
    r.read_exact(&mut prefix).await?;

    if prefix[0..4] != MAGIC {
        return Err(FrameError::BadMagic);
    }
    let len = u32::from_be_bytes(prefix[4..8].try_into().unwrap()) as usize;
    let priority = u32::from_be_bytes(prefix[8..12].try_into().unwrap());
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }

    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload).await?;
    Ok((payload, priority))
}

/// Write one frame. A closed pipe surfaces as an `Err`; callers (the
/// dispatcher's output step) treat that as "send returned false" and
/// continue with the remaining pipes rather than propagating it.
pub async fn write_frame<W: tokio::io::AsyncWrite + Unpin>(
    w: &mut W,
    payload: &[u8],
    priority: u32,
) -> Result<(), FrameError> {
    let mut header = [0u8; FRAME_PREFIX_LEN];
    header[0..4].copy_from_slice(&MAGIC);
    header[4..8].copy_from_slice(&(payload.len() as u32).to_be_bytes());
    header[8..12].copy_from_slice(&priority.to_be_bytes());
    w.write_all(&header).await?;
    w.write_all(payload).await?;
    Ok(())
}
