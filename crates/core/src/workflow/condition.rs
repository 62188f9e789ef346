//! Step conditions: simple field/comparator/value predicates.
//!
//! A condition is evaluated against the instance's merged `form_data` (first)
//! and `variables` (fallback) each time its step is considered for
//! activation. Nothing is cached between evaluations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::JsonMap;

/// Comparator applied between the looked-up field and the condition value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Exists,
    NotExists,
    Truthy,
}

/// A predicate deciding whether a step is eligible or auto-skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCondition {
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: Value,
}

impl StepCondition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Shorthand for the common `field == value` condition.
    pub fn equals(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, ConditionOperator::Eq, value)
    }
}

/// Evaluate a condition against the instance data.
///
/// A missing (or `null`) field fails every operator except `ne`, `not_in`
/// and `not_exists`.
pub fn evaluate_condition(condition: &StepCondition, form_data: &JsonMap, variables: &JsonMap) -> bool {
    let field_value = form_data
        .get(&condition.field)
        .or_else(|| variables.get(&condition.field))
        .filter(|v| !v.is_null());

    let Some(actual) = field_value else {
        return matches!(
            condition.operator,
            ConditionOperator::Ne | ConditionOperator::NotIn | ConditionOperator::NotExists
        );
    };

    let expected = &condition.value;
    match condition.operator {
        ConditionOperator::Eq => values_equal(actual, expected),
        ConditionOperator::Ne => !values_equal(actual, expected),
        ConditionOperator::Gt => compare_numbers(actual, expected, |a, b| a > b),
        ConditionOperator::Gte => compare_numbers(actual, expected, |a, b| a >= b),
        ConditionOperator::Lt => compare_numbers(actual, expected, |a, b| a < b),
        ConditionOperator::Lte => compare_numbers(actual, expected, |a, b| a <= b),
        ConditionOperator::In => expected
            .as_array()
            .is_some_and(|options| options.iter().any(|o| values_equal(actual, o))),
        ConditionOperator::NotIn => expected
            .as_array()
            .map_or(true, |options| !options.iter().any(|o| values_equal(actual, o))),
        ConditionOperator::Exists => true,
        ConditionOperator::NotExists => false,
        ConditionOperator::Truthy => is_truthy(actual),
    }
}

/// JSON equality that treats `1` and `1.0` as the same number.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare_numbers(a: &Value, b: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => cmp(x, y),
        _ => false,
    }
}

/// Numbers, and strings holding numbers (HTML forms submit those).
fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(pairs: &[(&str, Value)]) -> JsonMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn eval(cond: StepCondition, form: JsonMap) -> bool {
        evaluate_condition(&cond, &form, &JsonMap::new())
    }

    #[test]
    fn eq_matches_boolean_flag() {
        let cond = StepCondition::equals("needs_background_check", json!(true));
        assert!(eval(cond.clone(), data(&[("needs_background_check", json!(true))])));
        assert!(!eval(cond, data(&[("needs_background_check", json!(false))])));
    }

    #[test]
    fn eq_treats_integer_and_float_as_equal() {
        let cond = StepCondition::equals("level", json!(3));
        assert!(eval(cond, data(&[("level", json!(3.0))])));
    }

    #[test]
    fn missing_field_fails_eq_but_passes_ne() {
        assert!(!eval(StepCondition::equals("x", json!(1)), JsonMap::new()));
        assert!(eval(
            StepCondition::new("x", ConditionOperator::Ne, json!(1)),
            JsonMap::new()
        ));
    }

    #[test]
    fn null_counts_as_missing() {
        let cond = StepCondition::new("x", ConditionOperator::Exists, Value::Null);
        assert!(!eval(cond, data(&[("x", Value::Null)])));
    }

    #[test]
    fn numeric_comparators_accept_numeric_strings() {
        let cond = StepCondition::new("offer_amount", ConditionOperator::Gt, json!(10000));
        assert!(eval(cond.clone(), data(&[("offer_amount", json!("12500"))])));
        assert!(!eval(cond, data(&[("offer_amount", json!(9000))])));
    }

    #[test]
    fn non_numeric_values_fail_ordering() {
        let cond = StepCondition::new("grade", ConditionOperator::Lte, json!(5));
        assert!(!eval(cond, data(&[("grade", json!("senior"))])));
    }

    #[test]
    fn in_and_not_in_check_membership() {
        let cond = StepCondition::new("level", ConditionOperator::In, json!(["p7", "p8"]));
        assert!(eval(cond.clone(), data(&[("level", json!("p8"))])));
        assert!(!eval(cond, data(&[("level", json!("p5"))])));

        let cond = StepCondition::new("level", ConditionOperator::NotIn, json!(["p7", "p8"]));
        assert!(eval(cond, data(&[("level", json!("p5"))])));
    }

    #[test]
    fn falls_back_to_variables() {
        let cond = StepCondition::equals("region", json!("emea"));
        let vars = data(&[("region", json!("emea"))]);
        assert!(evaluate_condition(&cond, &JsonMap::new(), &vars));
    }

    #[test]
    fn form_data_shadows_variables() {
        let cond = StepCondition::equals("region", json!("emea"));
        let form = data(&[("region", json!("apac"))]);
        let vars = data(&[("region", json!("emea"))]);
        assert!(!evaluate_condition(&cond, &form, &vars));
    }

    #[test]
    fn truthy_rejects_empty_and_zero() {
        let cond = StepCondition::new("notes", ConditionOperator::Truthy, Value::Null);
        assert!(!eval(cond.clone(), data(&[("notes", json!(""))])));
        assert!(!eval(cond.clone(), data(&[("notes", json!(0))])));
        assert!(eval(cond, data(&[("notes", json!("see attachment"))])));
    }

    #[test]
    fn condition_deserializes_from_template_json() {
        let cond: StepCondition = serde_json::from_value(json!({
            "field": "needs_background_check",
            "operator": "eq",
            "value": true
        }))
        .unwrap();
        assert_eq!(cond.operator, ConditionOperator::Eq);
        assert_eq!(cond.value, json!(true));
    }
}
