//! MIME boundary generation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Per-process sequence so boundaries differ even within one clock tick.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh multipart boundary.
///
/// Format: `----=_Part_<unix seconds>_<subsecond nanos>_<sequence>`.
/// Every call returns a different value for the lifetime of the process.
pub fn generate_boundary() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);

    format!(
        "----=_Part_{}_{}_{}",
        now.as_secs(),
        now.subsec_nanos(),
        sequence
    )
}
