//! Spellings: validation of C identifiers and synthesis of names for anonymous types.

use regex::Regex;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

// clang spells anonymous tags as e.g. `struct (unnamed at foo.c:3:5)` or
// `union (anonymous union at foo.c:7:3)`.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(struct|union|enum) \((unnamed|anonymous)( (struct|union|enum))? at .*\)$")
        .expect("placeholder pattern is valid")
});

/// The declared name behind a front-end spelling; empty for anonymous entities.
pub fn normalize(spelling: &str) -> &str {
    if PLACEHOLDER.is_match(spelling) {
        ""
    } else {
        spelling
    }
}

pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Name of the `n`th anonymous type of a unit, first used where `hint` is declared.
pub fn anonymous(hint: Option<&str>, n: usize) -> String {
    match hint {
        Some(hint) if is_identifier(hint) => format!("__anontype_{hint}_{n}"),
        _ => format!("__anontype_{n}"),
    }
}

/// Name of a function-local static, tag or typedef hoisted to file scope when its plain name is
/// taken. `n` counts earlier attempts whose names were taken as well.
pub fn hoisted_local(function: &str, name: &str, n: usize) -> String {
    match n {
        0 => format!("{function}__{name}"),
        n => format!("{function}__{name}_{n}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_anonymous() {
        assert_eq!(normalize("struct (unnamed at list.c:3:5)"), "");
        assert_eq!(normalize("union (anonymous union at list.c:7:3)"), "");
        assert_eq!(normalize("enum (anonymous at /usr/include/x.h:1:1)"), "");
        assert_eq!(normalize("list"), "list");
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("_private1"));
        assert!(is_identifier("x"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn anonymous_names() {
        assert_eq!(anonymous(Some("inner"), 0), "__anontype_inner_0");
        assert_eq!(anonymous(None, 3), "__anontype_3");
        assert_eq!(hoisted_local("tick", "count", 0), "tick__count");
        assert_eq!(hoisted_local("tick", "count", 2), "tick__count_2");
    }
}
