//! Trigger matching
//!
//! Evaluates stored trigger definitions against an incoming event. A
//! trigger matches iff its event type matches, its source filter (when
//! set) matches, and **all** of its conditions hold. Unknown operators and
//! unresolvable field paths make that single condition false (fail-closed)
//! rather than raising an error, so one malformed trigger cannot block
//! evaluation of the others.

use serde_json::Value;

use crate::trigger::{ConditionOperator, Trigger, TriggerCondition};

/// Stateless trigger matcher
pub struct TriggerMatcher;

impl TriggerMatcher {
    /// Select the triggers matching an event, ordered by priority descending
    pub fn match_triggers<'a>(
        event_type: &str,
        source: Option<&str>,
        payload: &Value,
        triggers: &'a [Trigger],
    ) -> Vec<&'a Trigger> {
        let mut matched: Vec<&Trigger> = triggers
            .iter()
            .filter(|t| t.active)
            .filter(|t| t.event_type == event_type)
            .filter(|t| match (&t.source, source) {
                (Some(wanted), Some(actual)) => wanted == actual,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter(|t| t.conditions.iter().all(|c| evaluate_condition(c, payload)))
            .collect();

        matched.sort_by(|a, b| b.priority.cmp(&a.priority));
        matched
    }
}

/// Evaluate a single condition against the payload; fail-closed
fn evaluate_condition(condition: &TriggerCondition, payload: &Value) -> bool {
    let Some(actual) = resolve_field(payload, &condition.field) else {
        return false;
    };

    match condition.operator {
        ConditionOperator::Equals => actual == &condition.value,
        ConditionOperator::NotEquals => actual != &condition.value,
        ConditionOperator::GreaterThan => compare(actual, &condition.value)
            .map(|o| o == std::cmp::Ordering::Greater)
            .unwrap_or(false),
        ConditionOperator::LessThan => compare(actual, &condition.value)
            .map(|o| o == std::cmp::Ordering::Less)
            .unwrap_or(false),
        ConditionOperator::In => condition
            .value
            .as_array()
            .map(|candidates| candidates.contains(actual))
            .unwrap_or(false),
        ConditionOperator::Contains => match (actual, &condition.value) {
            (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
            (Value::Array(items), needle) => items.contains(needle),
            _ => false,
        },
        ConditionOperator::Unknown => false,
    }
}

/// Resolve a dot-path with optional `[idx]` array indexing into the payload
fn resolve_field<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut current = payload;
    for segment in path.split('.') {
        let (field, indices) = match segment.find('[') {
            Some(pos) => (&segment[..pos], &segment[pos..]),
            None => (segment, ""),
        };

        if !field.is_empty() {
            current = current.get(field)?;
        }

        let mut rest = indices;
        while let Some(stripped) = rest.strip_prefix('[') {
            let end = stripped.find(']')?;
            let index: usize = stripped[..end].parse().ok()?;
            current = current.get(index)?;
            rest = &stripped[end + 1..];
        }
    }
    Some(current)
}

/// Ordering between two JSON values: numeric when both are numbers,
/// lexicographic when both are strings
fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trigger_with_conditions(conditions: Vec<TriggerCondition>) -> Trigger {
        let mut trigger = Trigger::new("t1", "chat.message", "wf-1");
        trigger.conditions = conditions;
        trigger
    }

    #[test]
    fn test_and_semantics_both_fields_must_match() {
        let trigger = trigger_with_conditions(vec![
            TriggerCondition::new("data.mode", ConditionOperator::Equals, json!("rag")),
            TriggerCondition::new("data.user_id", ConditionOperator::Equals, json!(1)),
        ]);
        let triggers = vec![trigger];

        let payload = json!({"data": {"mode": "rag", "user_id": 1}});
        assert_eq!(
            TriggerMatcher::match_triggers("chat.message", None, &payload, &triggers).len(),
            1
        );

        // Changing either field to a non-matching value yields a non-match
        let payload = json!({"data": {"mode": "plain", "user_id": 1}});
        assert!(TriggerMatcher::match_triggers("chat.message", None, &payload, &triggers).is_empty());

        let payload = json!({"data": {"mode": "rag", "user_id": 2}});
        assert!(TriggerMatcher::match_triggers("chat.message", None, &payload, &triggers).is_empty());
    }

    #[test]
    fn test_empty_conditions_match_every_event_of_type() {
        let triggers = vec![Trigger::new("t1", "chat.message", "wf-1")];
        let matched =
            TriggerMatcher::match_triggers("chat.message", None, &json!({"anything": 1}), &triggers);
        assert_eq!(matched.len(), 1);

        let matched =
            TriggerMatcher::match_triggers("other.event", None, &json!({"anything": 1}), &triggers);
        assert!(matched.is_empty());
    }

    #[test]
    fn test_inactive_triggers_excluded() {
        let triggers = vec![Trigger::new("t1", "chat.message", "wf-1").inactive()];
        assert!(TriggerMatcher::match_triggers("chat.message", None, &json!({}), &triggers).is_empty());
    }

    #[test]
    fn test_priority_ordering_descending() {
        let triggers = vec![
            Trigger::new("low", "e", "wf-1").with_priority(1),
            Trigger::new("high", "e", "wf-2").with_priority(10),
            Trigger::new("mid", "e", "wf-3").with_priority(5),
        ];
        let matched = TriggerMatcher::match_triggers("e", None, &json!({}), &triggers);
        let ids: Vec<&str> = matched.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_source_filter() {
        let mut trigger = Trigger::new("t1", "e", "wf-1");
        trigger.source = Some("webhook".to_string());
        let triggers = vec![trigger];

        assert_eq!(
            TriggerMatcher::match_triggers("e", Some("webhook"), &json!({}), &triggers).len(),
            1
        );
        assert!(TriggerMatcher::match_triggers("e", Some("chat"), &json!({}), &triggers).is_empty());
        assert!(TriggerMatcher::match_triggers("e", None, &json!({}), &triggers).is_empty());
    }

    #[test]
    fn test_unresolvable_path_fails_closed() {
        let triggers = vec![trigger_with_conditions(vec![TriggerCondition::new(
            "data.missing.deep",
            ConditionOperator::NotEquals,
            json!("anything"),
        )])];
        assert!(
            TriggerMatcher::match_triggers("chat.message", None, &json!({"data": {}}), &triggers)
                .is_empty()
        );
    }

    #[test]
    fn test_unknown_operator_fails_closed_without_blocking_others() {
        let broken = trigger_with_conditions(vec![TriggerCondition::new(
            "data.mode",
            ConditionOperator::Unknown,
            json!("rag"),
        )]);
        let mut healthy = Trigger::new("t2", "chat.message", "wf-2");
        healthy.conditions = vec![TriggerCondition::new(
            "data.mode",
            ConditionOperator::Equals,
            json!("rag"),
        )];

        let triggers = vec![broken, healthy];
        let payload = json!({"data": {"mode": "rag"}});
        let matched = TriggerMatcher::match_triggers("chat.message", None, &payload, &triggers);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "t2");
    }

    #[test]
    fn test_numeric_comparisons() {
        let gt = trigger_with_conditions(vec![TriggerCondition::new(
            "data.count",
            ConditionOperator::GreaterThan,
            json!(5),
        )]);
        let triggers = vec![gt];

        assert_eq!(
            TriggerMatcher::match_triggers("chat.message", None, &json!({"data": {"count": 6}}), &triggers).len(),
            1
        );
        assert!(TriggerMatcher::match_triggers(
            "chat.message",
            None,
            &json!({"data": {"count": 5}}),
            &triggers
        )
        .is_empty());
        // Type mismatch fails closed
        assert!(TriggerMatcher::match_triggers(
            "chat.message",
            None,
            &json!({"data": {"count": "six"}}),
            &triggers
        )
        .is_empty());
    }

    #[test]
    fn test_in_and_contains_operators() {
        let in_trigger = trigger_with_conditions(vec![TriggerCondition::new(
            "data.mode",
            ConditionOperator::In,
            json!(["rag", "plain"]),
        )]);
        assert_eq!(
            TriggerMatcher::match_triggers(
                "chat.message",
                None,
                &json!({"data": {"mode": "rag"}}),
                &[in_trigger]
            )
            .len(),
            1
        );

        let contains_trigger = trigger_with_conditions(vec![TriggerCondition::new(
            "data.text",
            ConditionOperator::Contains,
            json!("urgent"),
        )]);
        assert_eq!(
            TriggerMatcher::match_triggers(
                "chat.message",
                None,
                &json!({"data": {"text": "this is urgent please"}}),
                &[contains_trigger]
            )
            .len(),
            1
        );
    }

    #[test]
    fn test_array_index_in_path() {
        let trigger = trigger_with_conditions(vec![TriggerCondition::new(
            "data.tags[0]",
            ConditionOperator::Equals,
            json!("first"),
        )]);
        assert_eq!(
            TriggerMatcher::match_triggers(
                "chat.message",
                None,
                &json!({"data": {"tags": ["first", "second"]}}),
                &[trigger]
            )
            .len(),
            1
        );
    }
}
