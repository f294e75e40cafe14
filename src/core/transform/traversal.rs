//! Lock-step walk of a document tree and a rule tree
//!
//! Traversal is synchronous and has no side effects besides logging: derived
//! records are appended to a [`TraversalOutput`] buffer that the engine hands
//! to the dispatcher afterwards.

use crate::domain::document::DocumentNode;
use crate::domain::message::OutputMessage;
use crate::domain::rules::{Rule, RuleSet};
use serde_json::{Map, Value};

/// Counters collected while walking one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Elements that were matched against a rule set
    pub elements_visited: usize,
    /// Rules whose condition held
    pub rules_fired: usize,
    /// Rules whose condition was false or failed
    pub rules_skipped: usize,
    /// Conditions that failed to evaluate
    pub condition_errors: usize,
    /// Field mappings that failed to evaluate
    pub field_errors: usize,
}

impl TraversalStats {
    /// Adds another set of counters to this one
    pub fn merge(&mut self, other: &TraversalStats) {
        self.elements_visited += other.elements_visited;
        self.rules_fired += other.rules_fired;
        self.rules_skipped += other.rules_skipped;
        self.condition_errors += other.condition_errors;
        self.field_errors += other.field_errors;
    }
}

/// Records derived from one document, in emission order
#[derive(Debug, Clone, Default)]
pub struct TraversalOutput {
    pub messages: Vec<OutputMessage>,
    pub stats: TraversalStats,
}

/// Applies a rule set to a whole document, starting at its root
///
/// # Examples
///
/// ```
/// use ehr2row::core::transform::traverse;
/// use ehr2row::domain::rules::parse_rule_sets;
/// use serde_json::json;
///
/// let rules = parse_rule_sets(r#"{
///     "id": 1,
///     "child_rules": [{
///         "id": "A",
///         "rule_set": [{"target_table": "measurement", "field_map": ["t.VALUE = e.VALOR"]}]
///     }]
/// }"#, "inline").unwrap();
///
/// let document = json!({"id": 1, "content": [{"id": "A", "VALOR": 5}, {"id": "B"}]});
/// let output = traverse(&document, &rules[0]);
///
/// assert_eq!(output.messages.len(), 1);
/// assert_eq!(output.messages[0].record, json!({"VALUE": 5}));
/// ```
pub fn traverse(document: &Value, rule_set: &RuleSet) -> TraversalOutput {
    let mut output = TraversalOutput::default();
    process_element(document, rule_set, document, &mut output);
    output
}

/// Applies `rule_set` to `element`, then recurses into the children selected
/// by each child rule set
///
/// A child rule set whose id matches no child is a no-op.
pub fn process_element(
    document: &Value,
    rule_set: &RuleSet,
    element: &Value,
    output: &mut TraversalOutput,
) {
    output.stats.elements_visited += 1;

    if let Some(rules) = &rule_set.rule_set {
        process_rules(document, rules, element, output);
    }

    if let Some(child_rules) = &rule_set.child_rules {
        let node = DocumentNode::new(element);
        for child_rule_set in child_rules {
            for child in node.select_children(&child_rule_set.id) {
                process_element(document, child_rule_set, child, output);
            }
        }
    }
}

/// Evaluates each rule against `element`, in declared order
///
/// Every rule whose condition holds produces one message, so an element may
/// yield several records.
pub fn process_rules(document: &Value, rules: &[Rule], element: &Value, output: &mut TraversalOutput) {
    for rule in rules {
        if !condition_holds(document, rule, element, output) {
            output.stats.rules_skipped += 1;
            continue;
        }

        output.stats.rules_fired += 1;
        let record = build_record(document, rule, element, output);
        output
            .messages
            .push(OutputMessage::row(rule.target_table.clone(), rule.queue.clone(), record));
    }
}

fn condition_holds(document: &Value, rule: &Rule, element: &Value, output: &mut TraversalOutput) -> bool {
    let Some(condition) = &rule.condition else {
        return true;
    };

    match condition.test(document, element) {
        Ok(holds) => holds,
        Err(e) => {
            output.stats.condition_errors += 1;
            crate::log_rule_skipped!(document_label(document), rule.label(), e);
            false
        }
    }
}

fn build_record(document: &Value, rule: &Rule, element: &Value, output: &mut TraversalOutput) -> Value {
    let mut record = Value::Object(Map::new());

    for mapping in &rule.field_map {
        if let Err(e) = mapping.apply(document, element, &mut record) {
            output.stats.field_errors += 1;
            tracing::warn!(
                template_id = %document_label(document),
                rule_id = %rule.label(),
                target_table = %rule.target_table,
                mapping = %mapping.source(),
                error = %e,
                "Field mapping failed, field left unset"
            );
        }
    }

    record
}

fn document_label(document: &Value) -> String {
    DocumentNode::new(document)
        .id()
        .map_or_else(|| "<no id>".to_string(), |id| id.to_string())
}
