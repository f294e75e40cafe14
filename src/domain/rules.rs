//! Rule definition model
//!
//! A [`RuleSet`] holds the mapping logic for one structural level of a document
//! and, recursively, for its children. Expressions are compiled while the rule
//! set is deserialised; a rule whose expression fails to compile is still loaded
//! and reports the failure through [`RuleSet::compile_errors`].

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::errors::{ExpressionError, RuleError};
use super::ids::{canonical_key, NodeId};
use crate::expr::{Expression, FieldMapping};

/// Mapping logic for one structural level and its children
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSet {
    /// Structural id of the document node this rule set applies to
    pub id: NodeId,

    /// Level label, informational only
    #[serde(default)]
    pub level: Option<String>,

    /// Rules evaluated against every node matched at this level
    #[serde(default)]
    pub rule_set: Option<Vec<Rule>>,

    /// Rule sets for the children of matched nodes
    #[serde(default)]
    pub child_rules: Option<Vec<RuleSet>>,
}

/// One projection from a document node into an output record
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    /// Optional rule id used in logs
    #[serde(default)]
    pub id: Option<NodeId>,

    /// Firing condition; the rule fires when absent or truthy
    #[serde(default, deserialize_with = "deserialize_condition")]
    pub condition: Option<Expression>,

    /// Destination table of the produced record
    #[serde(deserialize_with = "deserialize_table")]
    pub target_table: String,

    /// Output channel; the dispatcher default is used when absent
    #[serde(default)]
    pub queue: Option<String>,

    /// Assignments into the output record, applied in order
    #[serde(default)]
    pub field_map: Vec<FieldMapping>,
}

/// An expression in a rule set that did not compile
#[derive(Debug, Clone, PartialEq)]
pub struct CompileIssue {
    pub rule_set: NodeId,
    pub target_table: String,
    pub source: String,
    pub error: ExpressionError,
}

impl Rule {
    /// Label used in log records: the rule id if set, else the target table
    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => id.to_string(),
            None => self.target_table.clone(),
        }
    }
}

impl RuleSet {
    /// Total number of rules at this level and below
    pub fn rule_count(&self) -> usize {
        let own = self.rule_set.as_ref().map_or(0, Vec::len);
        let children: usize = self
            .child_rules
            .iter()
            .flatten()
            .map(RuleSet::rule_count)
            .sum();
        own + children
    }

    /// Every expression at this level and below that failed to compile
    pub fn compile_errors(&self) -> Vec<CompileIssue> {
        let mut issues = Vec::new();
        self.collect_compile_errors(&mut issues);
        issues
    }

    fn collect_compile_errors(&self, issues: &mut Vec<CompileIssue>) {
        for rule in self.rule_set.iter().flatten() {
            let condition = rule
                .condition
                .iter()
                .filter_map(|c| c.compile_error().map(|e| (c.source(), e)));
            let mappings = rule
                .field_map
                .iter()
                .filter_map(|m| m.compile_error().map(|e| (m.source(), e)));

            for (source, error) in condition.chain(mappings) {
                issues.push(CompileIssue {
                    rule_set: self.id.clone(),
                    target_table: rule.target_table.clone(),
                    source: source.to_string(),
                    error: error.clone(),
                });
            }
        }
        for child in self.child_rules.iter().flatten() {
            child.collect_compile_errors(issues);
        }
    }
}

/// Parses rule definitions held as one RuleSet object or an array of them
pub fn parse_rule_sets(text: &str, origin: &str) -> Result<Vec<RuleSet>, RuleError> {
    let value: Value = serde_json::from_str(text).map_err(|e| RuleError::Malformed {
        origin: origin.to_string(),
        message: e.to_string(),
    })?;

    let parsed = match value {
        Value::Array(_) => serde_json::from_value::<Vec<RuleSet>>(value),
        other => serde_json::from_value::<RuleSet>(other).map(|set| vec![set]),
    };

    parsed.map_err(|e| RuleError::Malformed {
        origin: origin.to_string(),
        message: e.to_string(),
    })
}

fn deserialize_condition<'de, D>(deserializer: D) -> Result<Option<Expression>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(source) => Ok(Some(Expression::compile(&source))),
        literal @ (Value::Bool(_) | Value::Number(_)) => Ok(Some(Expression::constant(literal))),
        other => Err(serde::de::Error::custom(format!(
            "condition must be a string, boolean or null, got {other}"
        ))),
    }
}

fn deserialize_table<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    canonical_key(&value)
        .filter(|table| !table.trim().is_empty())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid target_table: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules_json() -> Value {
        json!({
            "id": 100,
            "level": "template",
            "rule_set": [
                {
                    "target_table": "visit",
                    "queue": "x",
                    "condition": "e.ID_INSTANCIA_PLANT != null",
                    "field_map": ["t.VISIT_ID = e.ID_INSTANCIA_PLANT"]
                }
            ],
            "child_rules": [
                {
                    "id": "A",
                    "rule_set": [
                        {"id": 1, "target_table": "measurement", "condition": true, "field_map": []},
                        {"target_table": "note", "condition": null}
                    ]
                }
            ]
        })
    }

    #[test]
    fn test_rule_set_deserialization() {
        let set: RuleSet = serde_json::from_value(rules_json()).unwrap();
        assert_eq!(set.id.as_str(), "100");
        assert_eq!(set.level.as_deref(), Some("template"));
        assert_eq!(set.rule_count(), 3);

        let top = &set.rule_set.as_ref().unwrap()[0];
        assert_eq!(top.target_table, "visit");
        assert_eq!(top.queue.as_deref(), Some("x"));
        assert!(top.condition.is_some());
        assert_eq!(top.field_map.len(), 1);

        let child = &set.child_rules.as_ref().unwrap()[0];
        let rules = child.rule_set.as_ref().unwrap();
        assert_eq!(rules[0].label(), "1");
        assert!(rules[1].condition.is_none());
        assert_eq!(rules[1].label(), "note");
        assert!(rules[1].field_map.is_empty());
    }

    #[test]
    fn test_numeric_target_table() {
        let rule: Rule = serde_json::from_value(json!({"target_table": 12})).unwrap();
        assert_eq!(rule.target_table, "12");
    }

    #[test]
    fn test_missing_target_table_is_malformed() {
        let result = serde_json::from_value::<Rule>(json!({"field_map": []}));
        assert!(result.is_err());
    }

    #[test]
    fn test_compile_errors_are_collected_not_fatal() {
        let set: RuleSet = serde_json::from_value(json!({
            "id": 1,
            "rule_set": [{
                "target_table": "broken",
                "condition": "e.VALOR ==",
                "field_map": ["t.A = 1", "t.B = (", "e.VALOR"]
            }]
        }))
        .unwrap();

        let issues = set.compile_errors();
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.target_table == "broken"));
        assert_eq!(issues[0].source, "e.VALOR ==");
    }

    #[test]
    fn test_parse_rule_sets_object_and_array() {
        let single = parse_rule_sets(r#"{"id": 1}"#, "one.json").unwrap();
        assert_eq!(single.len(), 1);

        let many = parse_rule_sets(r#"[{"id": 1}, {"id": "2"}]"#, "many.json").unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[1].id.as_str(), "2");
    }

    #[test]
    fn test_parse_rule_sets_malformed() {
        let err = parse_rule_sets("{not json", "bad.json").unwrap_err();
        assert!(matches!(err, RuleError::Malformed { ref origin, .. } if origin == "bad.json"));

        let err = parse_rule_sets(r#"{"level": "no id"}"#, "noid.json").unwrap_err();
        assert!(matches!(err, RuleError::Malformed { .. }));
    }
}
