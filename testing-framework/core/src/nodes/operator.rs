use std::sync::LazyLock;

use regex::Regex;

/// Human-readable part of validator operator addresses.
pub const OPERATOR_ADDRESS_PREFIX: &str = "bbnvaloper";

/// The bech32 data part that follows the prefix: the `1` separator plus a
/// 38 character payload and checksum.
const OPERATOR_ADDRESS_SUFFIX_LEN: usize = 39;

static OPERATOR_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        "{OPERATOR_ADDRESS_PREFIX}(.{{{OPERATOR_ADDRESS_SUFFIX_LEN}}})"
    ))
    .expect("operator address pattern is valid")
});

/// Scrapes the first operator address out of `debug addr` diagnostics.
///
/// Matches `bbnvaloper` followed by exactly 39 characters on a single line
/// and returns the whole address. Output without the prefix yields an empty
/// string rather than an error.
#[must_use]
pub fn extract_operator_address(output: &str) -> String {
    OPERATOR_ADDRESS
        .find(output)
        .map(|found| found.as_str().trim_end_matches('\n').to_owned())
        .unwrap_or_default()
}
