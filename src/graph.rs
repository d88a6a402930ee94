//! Graph entities carried by the codec.
//!
//! Nodes, relationships, and paths travel as tagged structs on the wire. A
//! path is held in memory in traversal form: the node sequence visited and
//! the relationship taken at each step. The deduplicated entity lists and the
//! signed index array described by the wire format are produced inside the
//! packer and consumed by the unpacker.

use crate::value::ValueMap;

/// A graph node: identity, labels, properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: i64,
    pub labels: Vec<String>,
    pub properties: ValueMap,
}

impl Node {
    pub fn new(id: i64, labels: Vec<String>, properties: ValueMap) -> Self {
        Node {
            id,
            labels,
            properties,
        }
    }
}

/// A relationship bound to its start and end nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: i64,
    pub start_node_id: i64,
    pub end_node_id: i64,
    pub rel_type: String,
    pub properties: ValueMap,
}

impl Relationship {
    pub fn new(
        id: i64,
        start_node_id: i64,
        end_node_id: i64,
        rel_type: String,
        properties: ValueMap,
    ) -> Self {
        Relationship {
            id,
            start_node_id,
            end_node_id,
            rel_type,
            properties,
        }
    }

    /// Strip the endpoint ids for serialization inside a path, where they are
    /// recoverable from traversal order.
    pub fn to_unbound(&self) -> UnboundRelationship {
        UnboundRelationship {
            id: self.id,
            rel_type: self.rel_type.clone(),
            properties: self.properties.clone(),
        }
    }
}

/// A relationship without endpoint ids, as serialized inside paths.
#[derive(Debug, Clone, PartialEq)]
pub struct UnboundRelationship {
    pub id: i64,
    pub rel_type: String,
    pub properties: ValueMap,
}

impl UnboundRelationship {
    pub fn new(id: i64, rel_type: String, properties: ValueMap) -> Self {
        UnboundRelationship {
            id,
            rel_type,
            properties,
        }
    }
}

/// A traversal of k steps: k+1 nodes in visit order and the k relationships
/// taken between them. Entities may repeat; `nodes[0]` is the start.
///
/// Relationship direction is recoverable by comparing endpoint ids with the
/// adjacent nodes, so a traversal can follow a relationship against its
/// natural direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
}

impl Path {
    pub fn new(nodes: Vec<Node>, relationships: Vec<Relationship>) -> Self {
        Path {
            nodes,
            relationships,
        }
    }

    /// A path of a single node and no steps.
    pub fn singular(node: Node) -> Self {
        Path {
            nodes: vec![node],
            relationships: Vec::new(),
        }
    }

    /// Number of steps (relationships) in the traversal.
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// True for a single-node path.
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    pub fn start(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn end(&self) -> Option<&Node> {
        self.nodes.last()
    }
}

/// Failure modes reported by a [`PropertySupplier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityReadError {
    /// The entity was deleted inside the current transaction. Swallowed only
    /// while reading relationship properties for a path; the codec
    /// substitutes an empty map there and propagates everywhere else.
    DeletedInThisTransaction,
    /// The entity was deleted by a concurrent transaction. Always propagated.
    DeletedByOtherTransaction,
    /// The underlying store failed.
    ReadFailed(String),
}

impl EntityReadError {
    pub(crate) fn message(&self) -> String {
        match self {
            EntityReadError::DeletedInThisTransaction => {
                "deleted in this transaction".to_string()
            }
            EntityReadError::DeletedByOtherTransaction => {
                "deleted by another transaction".to_string()
            }
            EntityReadError::ReadFailed(message) => message.clone(),
        }
    }
}

/// External source of entity content, consulted while encoding.
///
/// The storage engine sits behind this seam; the codec itself never touches
/// storage. Implementations must resolve ids within the transaction the
/// enclosing message belongs to.
pub trait PropertySupplier {
    fn node_labels(&self, node_id: i64) -> Result<Vec<String>, EntityReadError>;

    fn node_properties(&self, node_id: i64) -> Result<ValueMap, EntityReadError>;

    fn relationship_type(&self, rel_id: i64) -> Result<String, EntityReadError>;

    fn relationship_properties(&self, rel_id: i64) -> Result<ValueMap, EntityReadError>;
}
