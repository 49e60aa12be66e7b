/// Emitted as soon as the stream opens
pub const STARTED: u8 = 5;
/// Emitted once match endings are resolved
pub const ENDINGS_RESOLVED: u8 = 15;
/// Share of the bar spread across the per-match steps
pub const MATCH_SPAN: u8 = 80;
/// Emitted after aggregation, right before the result
pub const FINISHED: u8 = 100;

/// Largest match count for which every per-match step still moves the bar
pub const MAX_TRACKED_MATCHES: usize = MATCH_SPAN as usize;

/// Progress after finishing match `index` (zero-based) of `total`
///
/// `15 + floor((index + 1) * 80 / total)`, reaching 95 on the last match.
pub fn match_progress(index: usize, total: usize) -> u8 {
    if total == 0 {
        return ENDINGS_RESOLVED;
    }
    let done = (index + 1).min(total);
    let step = done * MATCH_SPAN as usize / total;
    ENDINGS_RESOLVED + step as u8
}
