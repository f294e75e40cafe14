//! Clinical document model
//!
//! Documents are kept as raw `serde_json::Value` trees so expressions can read any
//! attribute a producer puts on a node. [`DocumentNode`] is a borrowed view that
//! exposes the structural fields the traversal relies on: `id`, `level` and
//! `content`.

use serde_json::Value;

use super::ids::{NodeId, TemplateId};

/// Attribute holding the template instance identifier of a root document
pub const INSTANCE_ID_FIELD: &str = "ID_INSTANCIA_PLANT";

/// Attribute holding the record state (`"C"` marks a confirmed datum)
pub const STATE_FIELD: &str = "ESTADO";

/// State value for confirmed data
pub const CONFIRMED_STATE: &str = "C";

/// Borrowed view of one node of a clinical document
#[derive(Debug, Clone, Copy)]
pub struct DocumentNode<'a> {
    value: &'a Value,
}

impl<'a> DocumentNode<'a> {
    /// Wraps a JSON value as a document node
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    /// The underlying JSON value
    pub fn value(&self) -> &'a Value {
        self.value
    }

    /// Structural identifier of the node, if present
    pub fn id(&self) -> Option<NodeId> {
        self.value.get("id").and_then(NodeId::from_json)
    }

    /// Template identifier, when this node is a document root
    pub fn template_id(&self) -> Option<TemplateId> {
        self.id().map(TemplateId::from)
    }

    /// Structural level label
    pub fn level(&self) -> Option<&'a str> {
        self.value.get("level").and_then(Value::as_str)
    }

    /// Template instance identifier used for log correlation
    pub fn instance_id(&self) -> Option<String> {
        match self.value.get(INSTANCE_ID_FIELD)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Child nodes; empty when `content` is absent or a terminal payload
    pub fn children(&self) -> &'a [Value] {
        match self.value.get("content") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        }
    }

    /// Children whose `id` equals the given identifier, in document order
    pub fn select_children<'b>(&self, id: &'b NodeId) -> impl Iterator<Item = &'a Value> + 'b
    where
        'a: 'b,
    {
        select_by_id(self.children(), id)
    }
}

/// All elements of `items` whose `id` equals `id`
pub fn select_by_id<'a, 'b>(
    items: &'a [Value],
    id: &'b NodeId,
) -> impl Iterator<Item = &'a Value> + 'b
where
    'a: 'b,
{
    items
        .iter()
        .filter(move |item| item.get("id").is_some_and(|v| id.matches(v)))
}

/// First element of `items` whose `id` equals `id`
pub fn find_by_id<'a>(items: &'a [Value], id: &Value) -> Option<&'a Value> {
    let id = NodeId::from_json(id)?;
    let found = select_by_id(items, &id).next();
    found
}

/// First element of `items` whose `id` equals `id` and whose state equals `state`
pub fn find_by_id_and_state<'a>(items: &'a [Value], id: &Value, state: &str) -> Option<&'a Value> {
    let id = NodeId::from_json(id)?;
    let found = select_by_id(items, &id).find(|item| {
        item.get(STATE_FIELD)
            .and_then(Value::as_str)
            .is_some_and(|s| s == state)
    });
    found
}
