//! Export-condition algebra.
//!
//! Export map leaves are reached through a chain of condition keys. The chain
//! canonicalizes to a single condition, and conditions have a total priority
//! order (lower = more general) used both for deterministic sorting and for
//! choosing the most-general condition when a module is reachable several
//! ways.

/// The canonical `default` condition.
pub const DEFAULT_CONDITION: &str = "default";

/// Environment conditions recognized alongside `types`.
const ENVIRONMENT_CONDITIONS: &[&str] = &[
    "node",
    "browser",
    "import",
    "require",
    "workerd",
    "react-native",
];

/// Conditions recognized when no `default`/`types` key is present, in
/// preference order.
const RECOGNIZED_CONDITIONS: &[&str] = &[
    "import",
    "require",
    "node",
    "browser",
    "workerd",
    "react-native",
    "development",
    "production",
];

/// Priority of a canonical condition. Lower values are more general.
pub fn condition_priority(condition: &str) -> u8 {
    match condition {
        "default" => 0,
        "types" => 1,
        "import" => 2,
        "require" => 3,
        "node" => 4,
        "browser" => 5,
        "production" => 6,
        "development" => 7,
        _ => 100,
    }
}

/// Collapse an ordered condition chain into one canonical condition.
///
/// An empty chain (string leaf or legacy field) is `default`.
pub fn canonicalize_condition(chain: &[String]) -> String {
    if chain.is_empty() || chain.iter().any(|c| c == DEFAULT_CONDITION) {
        return DEFAULT_CONDITION.to_string();
    }

    let has_types = chain.iter().any(|c| c == "types");
    if has_types {
        // `types` next to an environment condition describes declarations for
        // that environment; the environment wins.
        if let Some(env) = chain
            .iter()
            .find(|c| ENVIRONMENT_CONDITIONS.contains(&c.as_str()))
        {
            return env.clone();
        }
        return "types".to_string();
    }

    for recognized in RECOGNIZED_CONDITIONS {
        if chain.iter().any(|c| c == recognized) {
            return (*recognized).to_string();
        }
    }

    chain.last().cloned().unwrap_or_else(|| DEFAULT_CONDITION.to_string())
}

/// The more general (lower-priority) of two canonical conditions.
pub fn most_general<'a>(a: &'a str, b: &'a str) -> &'a str {
    if condition_priority(b) < condition_priority(a) {
        b
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_empty_chain_is_default() {
        assert_eq!(canonicalize_condition(&[]), "default");
    }

    #[test]
    fn test_default_wins_everywhere() {
        assert_eq!(canonicalize_condition(&chain(&["node", "default"])), "default");
        assert_eq!(canonicalize_condition(&chain(&["default"])), "default");
    }

    #[test]
    fn test_types_with_environment() {
        assert_eq!(canonicalize_condition(&chain(&["import", "types"])), "import");
        assert_eq!(canonicalize_condition(&chain(&["types", "node"])), "node");
        assert_eq!(
            canonicalize_condition(&chain(&["types", "react-native"])),
            "react-native"
        );
    }

    #[test]
    fn test_types_alone() {
        assert_eq!(canonicalize_condition(&chain(&["types"])), "types");
        assert_eq!(canonicalize_condition(&chain(&["types", "custom"])), "types");
    }

    #[test]
    fn test_recognized_fallback() {
        assert_eq!(canonicalize_condition(&chain(&["require"])), "require");
        assert_eq!(canonicalize_condition(&chain(&["custom", "browser"])), "browser");
        assert_eq!(canonicalize_condition(&chain(&["development"])), "development");
    }

    #[test]
    fn test_unrecognized_chain_uses_last_key() {
        assert_eq!(canonicalize_condition(&chain(&["deno", "bun"])), "bun");
    }

    #[test]
    fn test_priority_order() {
        let order = [
            "default",
            "types",
            "import",
            "require",
            "node",
            "browser",
            "production",
            "development",
        ];
        for pair in order.windows(2) {
            assert!(
                condition_priority(pair[0]) < condition_priority(pair[1]),
                "{} should be more general than {}",
                pair[0],
                pair[1]
            );
        }
        assert_eq!(condition_priority("workerd"), 100);
    }

    #[test]
    fn test_most_general() {
        assert_eq!(most_general("import", "default"), "default");
        assert_eq!(most_general("default", "import"), "default");
        assert_eq!(most_general("node", "node"), "node");
        // Ties keep the first argument.
        assert_eq!(most_general("workerd", "custom"), "workerd");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn condition_key() -> impl Strategy<Value = String> {
            prop_oneof![
                Just("default".to_string()),
                Just("types".to_string()),
                Just("import".to_string()),
                Just("require".to_string()),
                Just("node".to_string()),
                Just("browser".to_string()),
                Just("workerd".to_string()),
                Just("development".to_string()),
                Just("production".to_string()),
                "[a-z]{1,8}",
            ]
        }

        proptest! {
            /// Canonicalization is a pure function of the chain.
            #[test]
            fn canonicalize_is_deterministic(keys in prop::collection::vec(condition_key(), 0..6)) {
                prop_assert_eq!(canonicalize_condition(&keys), canonicalize_condition(&keys));
            }

            /// The canonical condition is `default`, `types`, a member of the
            /// chain, or (for empty chains) `default`.
            #[test]
            fn canonical_comes_from_chain(keys in prop::collection::vec(condition_key(), 0..6)) {
                let canonical = canonicalize_condition(&keys);
                prop_assert!(
                    canonical == "default"
                        || canonical == "types"
                        || keys.contains(&canonical)
                );
            }

            /// `most_general` always returns the side with the lower priority.
            #[test]
            fn most_general_minimizes_priority(a in condition_key(), b in condition_key()) {
                let winner = most_general(&a, &b);
                prop_assert!(condition_priority(winner) <= condition_priority(&a));
                prop_assert!(condition_priority(winner) <= condition_priority(&b));
            }
        }
    }
}
