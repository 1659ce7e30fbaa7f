//! # Ring Buffer Sizing
//!
//! Derives the `TPACKET_V3` ring geometry from a target size in megabytes,
//! the requested snapshot length and the system page size:
//!
//! ```text
//! frame_size  = snaplen rounded to a page-aligned quantum
//! block_size  = frame_size × BLOCK_FANOUT   (rounded up to whole pages)
//! block_count = target_bytes / block_size   (must be ≥ 1)
//! ```
//!
//! Snapshot lengths below one page share a page between a power-of-two number
//! of frames, so the frame always divides the page evenly and every block stays
//! page aligned. Longer snapshots take the next whole multiple of the page size.
//!
//! A target too small for a single block is rejected here, before any socket
//! or mapping exists.

use crate::domain::ConfigError;

/// Frames per ring block
pub const BLOCK_FANOUT: usize = 128;

/// Smallest frame handed to the kernel; it must hold the `tpacket3_hdr` and
/// the link-level sockaddr that precede the packet data.
pub const MIN_FRAME_SIZE: usize = 128;

const MEGABYTE: usize = 1024 * 1024;

/// Ring geometry accepted by `PACKET_RX_RING`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingLayout {
    pub frame_size: usize,
    pub block_size: usize,
    pub block_count: usize,
}

impl RingLayout {
    /// Compute the ring geometry.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidSnaplen`] for a zero snapshot length
    /// - [`ConfigError::InvalidPageSize`] unless the page size is a power of two
    /// - [`ConfigError::BufferOverflow`] if the target size does not fit in `usize`
    /// - [`ConfigError::BufferTooSmall`] if not even one block fits the target
    pub fn compute(
        target_mb: usize,
        snaplen: usize,
        page_size: usize,
    ) -> Result<Self, ConfigError> {
        if snaplen == 0 {
            return Err(ConfigError::InvalidSnaplen);
        }
        if !page_size.is_power_of_two() {
            return Err(ConfigError::InvalidPageSize(page_size));
        }

        let frame_size = if snaplen < page_size {
            // Largest power of two number of frames that still fit a snapshot each
            let per_page = prev_power_of_two(page_size / snaplen);
            (page_size / per_page).max(MIN_FRAME_SIZE.min(page_size))
        } else {
            (snaplen / page_size + 1) * page_size
        };

        let block_size = (frame_size * BLOCK_FANOUT).next_multiple_of(page_size);

        let target_bytes =
            target_mb.checked_mul(MEGABYTE).ok_or(ConfigError::BufferOverflow(target_mb))?;
        let block_count = target_bytes / block_size;

        if block_count == 0 {
            return Err(ConfigError::BufferTooSmall { target_bytes, block_size });
        }

        Ok(Self { frame_size, block_size, block_count })
    }

    /// Bytes of the whole mapping
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.block_size * self.block_count
    }

    /// Nominal frames per block (`tp_frame_nr` is this × block count)
    #[must_use]
    pub fn frames_per_block(&self) -> usize {
        self.block_size / self.frame_size
    }
}

/// Largest power of two ≤ `n` (`n` ≥ 1)
fn prev_power_of_two(n: usize) -> usize {
    1 << (usize::BITS - 1 - n.leading_zeros())
}

/// System memory page size
#[must_use]
#[allow(unsafe_code, clippy::cast_sign_loss)]
pub fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}
