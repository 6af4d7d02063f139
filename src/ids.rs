//! Id generation.

use std::sync::atomic::{AtomicU64, Ordering};

use jiff::Timestamp;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Mint a time-based id in the legacy `{prefix}_{millis}` shape.
///
/// A process-wide counter keeps two ids minted in the same millisecond
/// distinct.
pub(crate) fn timestamped(prefix: &str) -> String {
    let millis = Timestamp::now().as_millisecond();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);

    format!("{prefix}_{millis}_{seq}")
}
