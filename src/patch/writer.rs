//! Materializes the output image: splices the extension into the input
//! bytes, then applies the two patch streams.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::patch::mm::MemoryManager;

/// Builds the output bytes. Header patches carry pre-extension positions
/// (they were computed while the input was being parsed) and are shifted
/// past the splice; inline patches were placed by the memory manager and
/// land verbatim.
pub(crate) fn materialize(
    data: &[u8],
    mm: &MemoryManager,
    patches: &BTreeMap<u64, Vec<u8>>,
    inline: &BTreeMap<u64, Vec<u8>>,
) -> Result<Vec<u8>> {
    let mut out = if mm.extended() {
        let threshold = mm
            .threshold()
            .ok_or_else(|| Error::Malformed("extension planned without a threshold".into()))?
            as usize;
        if threshold > data.len() {
            return Err(Error::Malformed(format!(
                "mapped image ends at 0x{:x}, past the end of the file",
                threshold
            )));
        }
        let extend = mm.extend_size() as usize;
        let mut out = Vec::with_capacity(data.len() + extend);
        out.extend_from_slice(&data[..threshold]);
        // zeroed gap the allocations are written into
        out.resize(threshold + extend, 0);
        out.extend_from_slice(&data[threshold..]);
        out
    } else {
        data.to_vec()
    };
    for (&pos, bytes) in patches {
        write_at(&mut out, mm.extended_offset(pos), bytes)?;
    }
    for (&pos, bytes) in inline {
        write_at(&mut out, pos, bytes)?;
    }
    Ok(out)
}

fn write_at(out: &mut [u8], pos: u64, bytes: &[u8]) -> Result<()> {
    let start = pos as usize;
    let end = start
        .checked_add(bytes.len())
        .filter(|&end| end <= out.len())
        .ok_or_else(|| {
            Error::Malformed(format!(
                "patch of {} bytes at 0x{:x} falls outside the output image",
                bytes.len(),
                pos
            ))
        })?;
    out[start..end].copy_from_slice(bytes);
    Ok(())
}
