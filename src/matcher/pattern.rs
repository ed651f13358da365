//! Stored pattern text to compiled regex.
//!
//! Rule patterns are stored in the Perl delimiter form `/body/si`. The
//! wrapper is stripped and the body compiled case-insensitive with `.`
//! matching newlines, which is what the `si` flags ask for.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

static PERL_WRAPPER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^/?(.*?)/si$").ok());

/// Strip the `/…/si` wrapper. Text without the wrapper is returned unchanged.
pub fn unperlize(stored: &str) -> &str {
    PERL_WRAPPER
        .as_ref()
        .and_then(|wrapper| wrapper.captures(stored))
        .and_then(|caps| caps.get(1))
        .map_or(stored, |body| body.as_str())
}

/// Compile stored pattern text.
pub fn compile_pattern(stored: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(unperlize(stored))
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
}

/// First capture group of a match, `""` when the group is absent or did not participate.
pub fn first_group<'h>(captures: &regex::Captures<'h>) -> &'h str {
    captures.get(1).map_or("", |m| m.as_str())
}
