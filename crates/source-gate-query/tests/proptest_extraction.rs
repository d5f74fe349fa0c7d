//! Source extraction property-based tests.
//!
//! ## Purpose
//! These tests drive the extractor with randomized queries. They show that
//! pinning is all-or-nothing and that arbitrary input never panics.
//!
//! ## What is covered
//! - Extracted sets equal the union of pinned selector ids regardless of the
//!   operators joining the selectors.
//! - One unpinned selector rejects the whole query.
//! - Arbitrary text returns a result without panicking.
// crates/source-gate-query/tests/proptest_extraction.rs
// ============================================================================
// Module: Extraction Property-Based Tests
// Description: Fuzz-like checks for `source_id` extraction.
// Purpose: Ensure extraction is compositional and fails closed.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeSet;

use proptest::prelude::*;
use source_gate_query::ExtractError;
use source_gate_query::extract_source_ids;

/// Wraps a selector in a randomly chosen composition.
fn wrap(selector: &str, shape: u8) -> String {
    match shape % 6 {
        0 => selector.to_string(),
        1 => format!("sum by (job) ({selector})"),
        2 => format!("rate({selector}[5m])"),
        3 => format!("max_over_time({selector}[1h:1m])"),
        4 => format!("-({selector})"),
        _ => format!("topk(3, {selector} offset 5m)"),
    }
}

/// Binary operator chosen by index.
fn operator(index: u8) -> &'static str {
    const OPS: [&str; 8] = ["+", "-", "*", "/", " and ", " or ", " unless ", " > bool "];
    OPS[usize::from(index) % OPS.len()]
}

proptest! {
    #[test]
    fn extraction_collects_every_pinned_source(
        terms in prop::collection::vec(("[a-z][a-z0-9-]{0,12}", any::<u8>(), any::<u8>()), 1..8)
    ) {
        let mut query = String::new();
        let mut expected = BTreeSet::new();
        for (index, (id, shape, op)) in terms.iter().enumerate() {
            if index > 0 {
                query.push_str(operator(*op));
            }
            query.push_str(&wrap(&format!("m{{source_id=\"{id}\"}}"), *shape));
            expected.insert(id.clone());
        }
        let got = extract_source_ids(&query).unwrap();
        let got: BTreeSet<String> = got.into_iter().map(|id| id.as_str().to_string()).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn one_unpinned_selector_rejects_query(
        ids in prop::collection::vec("[a-z]{1,8}", 0..5),
        unpinned_at in any::<usize>(),
        shape in any::<u8>(),
    ) {
        let mut terms: Vec<String> =
            ids.iter().map(|id| format!("m{{source_id=\"{id}\"}}")).collect();
        let slot = unpinned_at % (terms.len() + 1);
        terms.insert(slot, wrap("m{job=\"x\"}", shape));
        let query = terms.join(" + ");
        prop_assert_eq!(extract_source_ids(&query), Err(ExtractError::MissingSourceId));
    }

    #[test]
    fn arbitrary_input_never_panics(raw in ".{0,256}") {
        let _ = extract_source_ids(&raw);
    }
}
