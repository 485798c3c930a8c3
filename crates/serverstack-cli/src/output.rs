//! Formatted output helpers for CLI commands.

use serverstack_common::types::Capability;

/// Width of the rule printed under command headings.
const RULE_WIDTH: usize = 35;

/// A heavy horizontal rule.
#[must_use]
pub fn rule() -> String {
    "\u{2550}".repeat(RULE_WIDTH)
}

/// Formats a capability set as `{read, write}`.
#[must_use]
pub fn format_capabilities<'a>(capabilities: impl IntoIterator<Item = &'a Capability>) -> String {
    let names: Vec<String> = capabilities.into_iter().map(ToString::to_string).collect();
    format!("{{{}}}", names.join(", "))
}

/// Pads `value` on the right to `width` characters.
#[must_use]
pub fn pad(value: &str, width: usize) -> String {
    format!("{value:<width$}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_capabilities_braces_list() {
        assert_eq!(
            format_capabilities(&[Capability::Read, Capability::Write]),
            "{read, write}"
        );
    }

    #[test]
    fn format_capabilities_empty_set() {
        assert_eq!(format_capabilities(std::iter::empty()), "{}");
    }

    #[test]
    fn pad_fills_to_width() {
        assert_eq!(pad("GET", 6), "GET   ");
        assert_eq!(pad("DELETE", 3), "DELETE");
    }

    #[test]
    fn rule_has_fixed_width() {
        assert_eq!(rule().chars().count(), RULE_WIDTH);
    }
}
