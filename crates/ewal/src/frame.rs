//! WAL frame encode/decode: `frame_len u32 | lsn u64 | op u8 | payload | crc32`.

use crate::entry::WalEntry;
use crate::error::WalError;

/// One physical frame on disk: an LSN-stamped, CRC-protected entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalFrame {
    /// Monotonic log sequence number, assigned by the writer.
    pub lsn: u64,
    /// The logical mutation this frame carries.
    pub entry: WalEntry,
}

/// Encode a frame to its on-disk byte representation.
///
/// `frame_len` counts every byte that follows it, including the trailing
/// CRC, matching the entity record's `record_len` convention in `edb-format`
/// so both formats share one mental model for "length-prefixed, checksummed
/// unit."
pub fn encode_frame(frame: &WalFrame) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&frame.lsn.to_le_bytes());
    body.push(frame.entry.op_byte());
    body.extend_from_slice(&frame.entry.encode_payload());

    let frame_len = (body.len() + 4) as u32;
    let mut out = Vec::with_capacity(4 + body.len() + 4);
    out.extend_from_slice(&frame_len.to_le_bytes());
    out.extend_from_slice(&body);
    let crc = crc32fast::hash(&out);
    out.extend_from_slice(&crc.to_le_bytes());
    out
}

/// Decode one frame from the front of `bytes`, returning it plus the number
/// of bytes consumed.
///
/// `offset` is the absolute file offset `bytes` starts at, used only to
/// annotate errors so the caller knows where to truncate.
pub fn decode_frame(bytes: &[u8], offset: u64) -> Result<(WalFrame, usize), WalError> {
    if bytes.len() < 4 {
        return Err(WalError::TornFrame { offset });
    }
    let frame_len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let total_len = 4 + frame_len;
    if frame_len < 9 || bytes.len() < total_len {
        return Err(WalError::TornFrame { offset });
    }

    let crc_offset = total_len - 4;
    let expected_crc = u32::from_le_bytes(bytes[crc_offset..total_len].try_into().unwrap());
    let actual_crc = crc32fast::hash(&bytes[..crc_offset]);
    if expected_crc != actual_crc {
        // The full frame is present — this isn't a crash-truncated tail, the
        // bytes that are there don't match their own checksum.
        return Err(WalError::Corrupt { offset });
    }

    let lsn = u64::from_le_bytes(bytes[4..12].try_into().unwrap());
    let op = bytes[12];
    let payload = &bytes[13..crc_offset];
    let entry = WalEntry::decode(op, payload).map_err(|e| match e {
        WalError::UnknownOp { op, .. } => WalError::UnknownOp { op, offset },
        other => other,
    })?;

    Ok((WalFrame { lsn, entry }, total_len))
}
