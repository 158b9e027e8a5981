//! Translates an HTTP `Range` header into the byte window to send.
//!
//! Only single `bytes` ranges are honoured. Anything this module cannot
//! parse is ignored and the whole blob is served, which HTTP permits.

const UNIT: &str = "bytes";

/// The resolved portion of a blob to send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangePlan {
    /// No usable range was requested: send everything.
    Full { length: u64 },

    /// Send the inclusive interval `start..=end`.
    Partial { start: u64, end: u64, length: u64 },

    /// The range lies outside the blob.
    Unsatisfiable,
}

impl RangePlan {
    /// Returns the `(offset, length)` window to read, if any.
    pub fn window(&self) -> Option<(u64, u64)> {
        match *self {
            RangePlan::Full { length } => Some((0, length)),
            RangePlan::Partial { start, length, .. } => Some((start, length)),
            RangePlan::Unsatisfiable => None,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, RangePlan::Partial { .. })
    }
}

/// Resolves `header` against a blob of `total_length` bytes.
pub fn resolve(header: Option<&str>, total_length: u64) -> RangePlan {
    let full = RangePlan::Full {
        length: total_length,
    };

    let spec = match header.and_then(parse) {
        Some(spec) => spec,
        None => return full,
    };

    let (start, end) = match spec {
        Spec::Suffix(0) => return RangePlan::Unsatisfiable,
        Spec::Suffix(n) => (total_length.saturating_sub(n), total_length.saturating_sub(1)),
        Spec::From(start) => (start, total_length.saturating_sub(1)),
        Spec::Between(start, end) => (start, end.min(total_length.saturating_sub(1))),
    };

    if start >= total_length || start > end {
        return RangePlan::Unsatisfiable;
    }

    RangePlan::Partial {
        start,
        end,
        length: end - start + 1,
    }
}

#[derive(Debug, PartialEq)]
enum Spec {
    /// `bytes=N-`
    From(u64),

    /// `bytes=N-M`
    Between(u64, u64),

    /// `bytes=-N`
    Suffix(u64),
}

fn parse(header: &str) -> Option<Spec> {
    let (unit, ranges) = header.trim().split_once('=')?;

    if !unit.trim().eq_ignore_ascii_case(UNIT) || ranges.contains(',') {
        return None;
    }

    let (start, end) = ranges.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    match (start.is_empty(), end.is_empty()) {
        (true, true) => None,
        (true, false) => end.parse().ok().map(Spec::Suffix),
        (false, true) => start.parse().ok().map(Spec::From),
        (false, false) => Some(Spec::Between(start.parse().ok()?, end.parse().ok()?)),
    }
}
