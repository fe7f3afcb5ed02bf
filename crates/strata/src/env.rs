use std::env;
use std::sync::OnceLock;

static STRATA_MAX_ALLOCATION_BYTES: OnceLock<usize> = OnceLock::new();
static STRATA_TRACE_CONTENTS: OnceLock<bool> = OnceLock::new();

fn parse_bool(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
}

/// Upper bound, in bytes, for a single fresh host allocation.
pub(crate) fn max_allocation_bytes() -> usize {
    *STRATA_MAX_ALLOCATION_BYTES.get_or_init(|| match env::var("STRATA_MAX_ALLOCATION_BYTES") {
        Ok(value) if !value.trim().is_empty() => parse_bytes(&value).unwrap_or_else(|| {
            tracing::warn!(
                value = %value,
                "ignoring unparsable STRATA_MAX_ALLOCATION_BYTES; allocations are unbounded"
            );
            isize::MAX as usize
        }),
        _ => isize::MAX as usize,
    })
}

fn parse_bytes(value: &str) -> Option<usize> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .map(|bytes| bytes.min(isize::MAX as usize))
}

/// Whether contents records log their creation and release.
pub(crate) fn trace_contents_enabled() -> bool {
    *STRATA_TRACE_CONTENTS.get_or_init(|| match env::var("STRATA_TRACE_CONTENTS") {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value),
        _ => false,
    })
}
