//! Snippets and cache-defeating expansion
//!
//! Hosts cache aggressively on literal content. Chrome, for example, keeps
//! parsed `data:image/svg+xml` URLs around, so rendering the same markup twice
//! measures the cache rather than the parser. [`expand`] gives every repeated
//! copy of a snippet a textually unique body by rewriting each literal
//! occurrence of the snippet's name into a run-unique token.

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// Logical name of the synthetic snippet used to estimate harness overhead.
pub const NOOP_NAME: &str = "__noop";

/// A named unit of markup whose rendering cost is measured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Logical identifier shared by every expanded copy
    pub name: String,
    /// Host-renderable markup
    pub markup: String,
}

impl Snippet {
    pub fn new(name: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markup: markup.into(),
        }
    }

    /// The minimal snippet measured only to characterize fixed overhead
    pub fn noop() -> Self {
        Self::new(NOOP_NAME, "<div></div>")
    }

    pub fn is_noop(&self) -> bool {
        self.name == NOOP_NAME
    }
}

/// One physical sample to render: a snippet copy with run-unique markup.
///
/// `name` keeps the logical name so samples can be grouped again after
/// shuffling; `token` is the unique replacement used in `markup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedSnippet {
    pub name: String,
    pub token: String,
    pub markup: String,
}

impl ExpandedSnippet {
    pub fn is_noop(&self) -> bool {
        self.name == NOOP_NAME
    }
}

/// Unique token for copy `repeat_index` of `name` in run `run_counter`.
pub fn unique_token(name: &str, repeat_index: u32, run_counter: u64) -> String {
    format!("{}_{}_{}", name, repeat_index, run_counter)
}

/// Expand each snippet into `repeat_count` textually unique copies.
///
/// Output is grouped by input order (`s0#0, s0#1, .., s1#0, ..`); shuffling
/// is a separate step. `run_counter` must come from durable storage and
/// increase across runs so that two runs never produce the same token.
///
/// # Errors
///
/// Returns [`BenchError::Configuration`] if `repeat_count` is zero.
///
/// # Example
///
/// ```
/// use snippet_bench::snippet::{expand, Snippet};
///
/// let expanded = expand(&[Snippet::new("a", "<a>a</a>")], 2, 1).unwrap();
/// assert_eq!(expanded[0].markup, "<a>a_0_1</a>");
/// assert_eq!(expanded[1].markup, "<a>a_1_1</a>");
/// assert!(expanded.iter().all(|s| s.name == "a"));
/// ```
pub fn expand(
    snippets: &[Snippet],
    repeat_count: u32,
    run_counter: u64,
) -> Result<Vec<ExpandedSnippet>> {
    if repeat_count == 0 {
        return Err(BenchError::config("repeat_count must be greater than zero"));
    }

    let mut expanded = Vec::with_capacity(snippets.len() * repeat_count as usize);
    for snippet in snippets {
        for i in 0..repeat_count {
            let token = unique_token(&snippet.name, i, run_counter);
            // An empty pattern would splice the token between every character.
            let markup = if snippet.name.is_empty() {
                snippet.markup.clone()
            } else {
                snippet.markup.replace(&snippet.name, &token)
            };
            expanded.push(ExpandedSnippet {
                name: snippet.name.clone(),
                token,
                markup,
            });
        }
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_expand_replaces_every_occurrence() {
        let snippets = vec![Snippet::new(
            "foo",
            "<div class='foo'><svg name=foo></svg>foo</div>",
        )];
        let expanded = expand(&snippets, 1, 1432).unwrap();

        assert_eq!(
            expanded[0].markup,
            "<div class='foo_0_1432'><svg name=foo_0_1432></svg>foo_0_1432</div>"
        );
        assert_eq!(expanded[0].token, "foo_0_1432");
        assert_eq!(expanded[0].name, "foo");
    }

    #[test]
    fn test_expand_order_is_grouped_by_input() {
        let snippets = vec![Snippet::new("a", "a"), Snippet::new("b", "b")];
        let expanded = expand(&snippets, 3, 7).unwrap();

        let markups: Vec<_> = expanded.iter().map(|s| s.markup.as_str()).collect();
        assert_eq!(markups, vec!["a_0_7", "a_1_7", "a_2_7", "b_0_7", "b_1_7", "b_2_7"]);
    }

    #[test]
    fn test_expand_name_absent_from_markup() {
        let snippets = vec![Snippet::new("missing", "<p>static</p>")];
        let expanded = expand(&snippets, 2, 1).unwrap();

        assert_eq!(expanded.len(), 2);
        assert!(expanded.iter().all(|s| s.markup == "<p>static</p>"));
    }

    #[test]
    fn test_expand_zero_repeat_is_configuration_error() {
        let err = expand(&[Snippet::new("a", "a")], 0, 1).unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
    }

    #[test]
    fn test_expand_empty_input() {
        assert!(expand(&[], 5, 1).unwrap().is_empty());
    }

    #[test]
    fn test_noop_snippet() {
        let noop = Snippet::noop();
        assert!(noop.is_noop());
        assert!(!Snippet::new("a", "a").is_noop());
    }

    proptest! {
        #[test]
        fn prop_expand_yields_k_copies_per_snippet(
            names in proptest::collection::hash_set("[a-z]{1,6}", 1..5),
            k in 1u32..8,
        ) {
            let snippets: Vec<_> = names.iter().map(|n| Snippet::new(n.clone(), n.clone())).collect();
            let expanded = expand(&snippets, k, 1).unwrap();

            prop_assert_eq!(expanded.len(), snippets.len() * k as usize);
            for snippet in &snippets {
                let copies = expanded.iter().filter(|e| e.name == snippet.name).count();
                prop_assert_eq!(copies, k as usize);
            }
        }

        #[test]
        fn prop_tokens_disjoint_across_run_counters(
            names in proptest::collection::hash_set("[a-z]{1,6}", 1..5),
            k in 1u32..6,
            run_a in 0u64..10_000,
            delta in 1u64..10_000,
        ) {
            let snippets: Vec<_> = names.iter().map(|n| Snippet::new(n.clone(), "x")).collect();
            let first: HashSet<_> = expand(&snippets, k, run_a)
                .unwrap()
                .into_iter()
                .map(|e| e.token)
                .collect();
            let second: HashSet<_> = expand(&snippets, k, run_a + delta)
                .unwrap()
                .into_iter()
                .map(|e| e.token)
                .collect();

            prop_assert_eq!(first.len(), snippets.len() * k as usize);
            prop_assert!(first.is_disjoint(&second));
        }

        #[test]
        fn prop_no_bare_name_survives_expansion(
            name in "[a-z]{3,6}",
            filler in "[<>/ =0-9]{0,12}",
            repeats in 1usize..4,
        ) {
            let markup = format!("{}{}", filler, name).repeat(repeats);
            let expanded = expand(&[Snippet::new(name.clone(), markup)], 2, 9).unwrap();

            for e in &expanded {
                // Every occurrence of the name must be the start of a token.
                let bare = e.markup.matches(name.as_str()).count();
                let tokens = e.markup.matches(e.token.as_str()).count();
                prop_assert_eq!(bare, tokens);
                prop_assert_eq!(tokens, repeats);
            }
        }
    }
}
