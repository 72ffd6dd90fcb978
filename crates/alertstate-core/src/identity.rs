//! Instance identity: label merging and canonical cache keys.

use crate::types::{AlertRule, EvalResult, Labels};

pub const RULE_UID_LABEL: &str = "__alert_rule_uid__";
pub const NAMESPACE_UID_LABEL: &str = "__alert_rule_namespace_uid__";
pub const RULE_TITLE_LABEL: &str = "__alert_rule_title__";

/// Merge two label sets. On duplicate names the value from `a` is kept.
pub fn merge_labels(a: &Labels, b: &Labels) -> Labels {
    let mut merged = a.clone();
    for (k, v) in b {
        merged.entry(k.clone()).or_insert_with(|| v.clone());
    }
    merged
}

/// Full label set of the instance `result` describes for `rule`.
///
/// Rule labels take precedence over instance labels, and the synthetic rule
/// identity labels overwrite both.
pub fn resolve_labels(rule: &AlertRule, result: &EvalResult) -> Labels {
    let mut labels = merge_labels(&rule.labels, &result.instance);
    labels.insert(RULE_UID_LABEL.to_string(), rule.uid.clone());
    labels.insert(NAMESPACE_UID_LABEL.to_string(), rule.namespace_uid.clone());
    labels.insert(RULE_TITLE_LABEL.to_string(), rule.title.clone());
    labels
}

/// Canonical key for a label set: `{name=value, name=value}` sorted by name.
///
/// Reserved characters are backslash-escaped so two different label sets
/// never render to the same key.
pub fn instance_key(labels: &Labels) -> String {
    let mut pairs: Vec<(&String, &String)> = labels.iter().collect();
    pairs.sort_unstable();

    let mut key = String::with_capacity(2 + pairs.len() * 16);
    key.push('{');
    for (i, (name, value)) in pairs.into_iter().enumerate() {
        if i > 0 {
            key.push_str(", ");
        }
        push_escaped(&mut key, name);
        key.push('=');
        push_escaped(&mut key, value);
    }
    key.push('}');
    key
}

fn push_escaped(out: &mut String, s: &str) {
    for c in s.chars() {
        if matches!(c, '\\' | ',' | '=' | '{' | '}') {
            out.push('\\');
        }
        out.push(c);
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
        proptest::collection::vec(("[a-z_]{1,6}", "[a-zA-Z0-9,={}\\\\ ]{0,8}"), 0..12)
    }

    proptest! {
        /// Insertion order never changes the key.
        #[test]
        fn key_is_order_independent(pairs in arb_pairs()) {
            let forward: Labels = pairs.iter().cloned().collect();
            let mut reversed = Labels::new();
            for (k, v) in pairs.iter().rev() {
                reversed.entry(k.clone()).or_insert_with(|| forward[k].clone());
            }
            prop_assert_eq!(instance_key(&forward), instance_key(&reversed));
        }

        /// Every overlapping name keeps the first set's value.
        #[test]
        fn merge_prefers_first_set(a in arb_pairs(), b in arb_pairs()) {
            let a: Labels = a.into_iter().collect();
            let b: Labels = b.into_iter().collect();
            let merged = merge_labels(&a, &b);
            for (k, v) in &a {
                prop_assert_eq!(&merged[k], v);
            }
            for (k, v) in &b {
                if !a.contains_key(k) {
                    prop_assert_eq!(&merged[k], v);
                }
            }
            prop_assert!(merged.len() <= a.len() + b.len());
        }

        /// Distinct label sets never share a key.
        #[test]
        fn distinct_sets_have_distinct_keys(a in arb_pairs(), b in arb_pairs()) {
            let a: Labels = a.into_iter().collect();
            let b: Labels = b.into_iter().collect();
            if a != b {
                prop_assert_ne!(instance_key(&a), instance_key(&b));
            }
        }
    }
}
