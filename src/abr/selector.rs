//! Bitrate selection for the next segment request.

/// Safety margin against throughput estimation noise. A fixed design
/// constant of the selection algorithm, not a tunable.
pub const HEADROOM: f64 = 1.5;

/// Pick a bitrate for the next segment.
///
/// Scans `rates` from the highest index downward and selects the first rate
/// sustainable at `throughput_kbps / 1.5`; falls back to the first listed
/// rate when none qualifies. `rates` keeps manifest document order, which is
/// only "lowest to highest" when the origin lists them ascending (see
/// DESIGN.md). Returns `None` only for an empty list.
pub fn select_bitrate(rates: &[u32], throughput_kbps: f64) -> Option<u32> {
    let fallback = *rates.first()?;
    for &rate in rates.iter().rev() {
        if throughput_kbps / HEADROOM >= f64::from(rate) {
            return Some(rate);
        }
    }
    Some(fallback)
}
