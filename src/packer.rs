//! Value encoder.
//!
//! The packer turns values into marker bytes, length prefixes, and payloads,
//! always choosing the smallest size class that holds the value losslessly.
//! It also owns the graph struct writers, including path serialization with
//! its entity deduplication scratch state.

use crate::error::{PackStreamError, PackStreamResult};
use crate::graph::{
    EntityReadError, Node, Path, PropertySupplier, Relationship, UnboundRelationship,
};
use crate::marker;
use crate::stream::PackOutput;
use crate::value::{Value, ValueMap};
use crate::version::{signatures, VersionTable};

/// Element kinds accepted by `begin_array`. Byte arrays have their own
/// encoding and go through `write_bytes` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    Bool,
    Int,
    Float,
    String,
}

/// The capability set a value source streams into.
///
/// Containers are length-prefixed, not length-discovered: callers must know
/// the size before `begin_*`. The `end_*` calls are advisory no-ops kept for
/// symmetry at the call sites.
pub trait ValueWriter {
    fn write_null(&mut self) -> PackStreamResult<()>;
    fn write_bool(&mut self, value: bool) -> PackStreamResult<()>;
    fn write_int(&mut self, value: i64) -> PackStreamResult<()>;
    fn write_float(&mut self, value: f64) -> PackStreamResult<()>;
    fn write_bytes(&mut self, value: &[u8]) -> PackStreamResult<()>;
    fn write_string(&mut self, value: &str) -> PackStreamResult<()>;
    fn begin_list(&mut self, len: usize) -> PackStreamResult<()>;
    fn end_list(&mut self) -> PackStreamResult<()>;
    fn begin_map(&mut self, len: usize) -> PackStreamResult<()>;
    fn end_map(&mut self) -> PackStreamResult<()>;
    fn begin_array(&mut self, len: usize, kind: ArrayKind) -> PackStreamResult<()>;
    fn end_array(&mut self) -> PackStreamResult<()>;
    fn write_node(&mut self, node: &Node) -> PackStreamResult<()>;
    fn write_relationship(&mut self, rel: &Relationship) -> PackStreamResult<()>;
    fn write_unbound_relationship(&mut self, rel: &UnboundRelationship) -> PackStreamResult<()>;
    fn write_path(&mut self, path: &Path) -> PackStreamResult<()>;
    fn write_node_reference(&mut self, node_id: i64) -> PackStreamResult<()>;
    fn write_relationship_reference(&mut self, rel_id: i64) -> PackStreamResult<()>;
    fn write_path_reference(&mut self, node_ids: &[i64], rel_ids: &[i64])
        -> PackStreamResult<()>;
}

/// Version-bound encoder over a [`PackOutput`].
///
/// Not re-entrant; one packer serves one thread at a time. The path scratch
/// maps below are reset at the start of every path write.
pub struct Packer<O: PackOutput> {
    out: O,
    table: &'static VersionTable,
    path_nodes: IdIndexMap,
    path_rels: IdIndexMap,
}

impl<O: PackOutput> Packer<O> {
    pub(crate) fn new(out: O, table: &'static VersionTable) -> Self {
        Packer {
            out,
            table,
            path_nodes: IdIndexMap::new(),
            path_rels: IdIndexMap::new(),
        }
    }

    /// Encode one whole value.
    ///
    /// Values outside this version's type universe fail with
    /// `TypeNotSupportedInThisVersion` before any byte is emitted.
    pub fn pack(&mut self, value: &Value) -> PackStreamResult<()> {
        match value {
            Value::Null => self.write_null(),
            Value::Bool(v) => self.write_bool(*v),
            Value::Int(v) => self.write_int(*v),
            Value::Float(v) => self.write_float(*v),
            Value::Bytes(v) => self.write_bytes(v),
            Value::String(v) => self.write_string(v),
            Value::List(items) => {
                self.begin_list(items.len())?;
                for item in items {
                    self.pack(item)?;
                }
                self.end_list()
            }
            Value::Map(map) => self.write_value_map(map),
            Value::Struct(s) => {
                self.write_struct_header(s.fields.len(), s.signature)?;
                for field in &s.fields {
                    self.pack(field)?;
                }
                Ok(())
            }
            Value::Node(node) => self.write_node(node),
            Value::Relationship(rel) => self.write_relationship(rel),
            Value::UnboundRelationship(rel) => self.write_unbound_relationship(rel),
            Value::Path(path) => self.write_path(path),
            Value::EndOfStream => self.write_end_of_stream(),
            // Temporal and spatial encoders arrive with the protocol version
            // that lists their signatures; no current version does.
            Value::Date(_)
            | Value::LocalTime(_)
            | Value::Time { .. }
            | Value::LocalDateTime(_)
            | Value::DateTime(_)
            | Value::Duration { .. }
            | Value::Point2D { .. }
            | Value::Point3D { .. } => Err(PackStreamError::TypeNotSupportedInThisVersion {
                type_name: value.type_name(),
                version: self.table.version,
            }),
        }
    }

    /// Emit a struct header: marker, field count, signature byte.
    pub fn write_struct_header(&mut self, size: usize, signature: u8) -> PackStreamResult<()> {
        if size <= marker::TINY_SIZE_MAX {
            self.out.write_u8(marker::TINY_STRUCT | size as u8)?;
        } else if size <= 0xFF {
            self.out.write_u8(marker::STRUCT_8)?;
            self.out.write_u8(size as u8)?;
        } else if size <= 0xFFFF {
            self.out.write_u8(marker::STRUCT_16)?;
            self.out.write_u16(size as u16)?;
        } else {
            return Err(oversize("struct", size));
        }
        self.out.write_u8(signature)
    }

    /// Emit the streaming sentinel that terminates an unbounded record batch.
    pub fn write_end_of_stream(&mut self) -> PackStreamResult<()> {
        self.out.write_u8(marker::END_OF_STREAM)
    }

    /// Encode a node whose content is served by an external supplier.
    pub fn write_node_with<S: PropertySupplier>(
        &mut self,
        node_id: i64,
        supplier: &S,
    ) -> PackStreamResult<()> {
        let labels = supplier
            .node_labels(node_id)
            .map_err(|e| entity_read_failure("node", node_id, e))?;
        let properties = supplier
            .node_properties(node_id)
            .map_err(|e| entity_read_failure("node", node_id, e))?;

        self.write_struct_header(3, signatures::NODE)?;
        self.write_int(node_id)?;
        self.begin_list(labels.len())?;
        for label in &labels {
            self.write_string(label)?;
        }
        self.write_value_map(&properties)
    }

    /// Encode a relationship whose content is served by an external supplier.
    pub fn write_relationship_with<S: PropertySupplier>(
        &mut self,
        rel_id: i64,
        start_node_id: i64,
        end_node_id: i64,
        supplier: &S,
    ) -> PackStreamResult<()> {
        let rel_type = supplier
            .relationship_type(rel_id)
            .map_err(|e| entity_read_failure("relationship", rel_id, e))?;
        let properties = supplier
            .relationship_properties(rel_id)
            .map_err(|e| entity_read_failure("relationship", rel_id, e))?;

        self.write_struct_header(5, signatures::RELATIONSHIP)?;
        self.write_int(rel_id)?;
        self.write_int(start_node_id)?;
        self.write_int(end_node_id)?;
        self.write_string(&rel_type)?;
        self.write_value_map(&properties)
    }

    /// Encode a path whose entity content is served by an external supplier.
    ///
    /// Entity ids and topology come from the traversal; labels, types, and
    /// properties are read through `supplier` at serialization time. A
    /// relationship whose properties come back as deleted-in-this-transaction
    /// is packed with an empty property map; every other supplier failure
    /// propagates.
    pub fn write_path_with<S: PropertySupplier>(
        &mut self,
        path: &Path,
        supplier: &S,
    ) -> PackStreamResult<()> {
        let steps = path.relationships.len();
        if path.nodes.is_empty() {
            return Err(PackStreamError::malformed(
                "a path must contain at least one node",
            ));
        }
        if path.nodes.len() != steps + 1 {
            return Err(PackStreamError::malformed(format!(
                "a path of {} relationships must contain {} nodes, got {}",
                steps,
                steps + 1,
                path.nodes.len()
            )));
        }

        // Resolve the traversal direction of every step before emitting
        // anything, so a disconnected traversal fails with no bytes written.
        let mut forward = Vec::with_capacity(steps);
        for (i, rel) in path.relationships.iter().enumerate() {
            let prev = &path.nodes[i];
            let next = &path.nodes[i + 1];
            if rel.start_node_id == prev.id && rel.end_node_id == next.id {
                forward.push(true);
            } else if rel.start_node_id == next.id && rel.end_node_id == prev.id {
                forward.push(false);
            } else {
                return Err(PackStreamError::malformed(format!(
                    "relationship {} does not connect nodes {} and {}",
                    rel.id, prev.id, next.id
                )));
            }
        }

        log::trace!("packing path of {steps} steps");
        self.path_nodes.clear();
        self.path_rels.clear();

        // Unique nodes in first-seen order, 0-based.
        let mut unique_node_ids = Vec::with_capacity(path.nodes.len());
        for node in &path.nodes {
            let (_, inserted) = self.path_nodes.get_or_insert(node.id);
            if inserted {
                unique_node_ids.push(node.id);
            }
        }

        self.write_struct_header(3, signatures::PATH)?;
        self.begin_list(self.path_nodes.len())?;
        for id in &unique_node_ids {
            self.write_node_with(*id, supplier)?;
        }

        // A single-node path carries an empty relationship list and an empty
        // index array; return before touching any relationship properties.
        if steps == 0 {
            self.begin_list(0)?;
            self.begin_list(0)?;
            return Ok(());
        }

        // Unique relationships in first-seen order, 1-based on the wire.
        let mut unique_rel_ids = Vec::with_capacity(steps);
        for rel in &path.relationships {
            let (_, inserted) = self.path_rels.get_or_insert(rel.id);
            if inserted {
                unique_rel_ids.push(rel.id);
            }
        }

        self.begin_list(self.path_rels.len())?;
        for id in &unique_rel_ids {
            self.write_path_relationship(*id, supplier)?;
        }

        // Two integers per step: the signed 1-based relationship index
        // (negative when traversed against its natural direction) and the
        // 0-based index of the node reached.
        self.begin_list(2 * steps)?;
        for (i, rel) in path.relationships.iter().enumerate() {
            let (rel_index, _) = self.path_rels.get_or_insert(rel.id);
            let signed = if forward[i] {
                i64::from(rel_index) + 1
            } else {
                -(i64::from(rel_index) + 1)
            };
            self.write_int(signed)?;
            let (node_index, _) = self.path_nodes.get_or_insert(path.nodes[i + 1].id);
            self.write_int(i64::from(node_index))?;
        }
        Ok(())
    }

    /// Serialize one relationship of a path as an UnboundRelationship,
    /// substituting an empty property map when the supplier reports the
    /// relationship deleted within the current transaction.
    fn write_path_relationship<S: PropertySupplier>(
        &mut self,
        rel_id: i64,
        supplier: &S,
    ) -> PackStreamResult<()> {
        let rel_type = supplier
            .relationship_type(rel_id)
            .map_err(|e| entity_read_failure("relationship", rel_id, e))?;
        let properties = match supplier.relationship_properties(rel_id) {
            Ok(map) => map,
            Err(EntityReadError::DeletedInThisTransaction) => {
                log::debug!(
                    "relationship {rel_id} deleted in this transaction; packing empty properties"
                );
                ValueMap::new()
            }
            Err(e) => return Err(entity_read_failure("relationship", rel_id, e)),
        };

        self.write_struct_header(3, signatures::UNBOUND_RELATIONSHIP)?;
        self.write_int(rel_id)?;
        self.write_string(&rel_type)?;
        self.write_value_map(&properties)
    }

    fn write_value_map(&mut self, map: &ValueMap) -> PackStreamResult<()> {
        self.begin_map(map.len())?;
        for (key, value) in map.iter() {
            self.write_string(key)?;
            self.pack(value)?;
        }
        self.end_map()
    }

    pub fn flush(&mut self) -> PackStreamResult<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> O {
        self.out
    }
}

impl<O: PackOutput> ValueWriter for Packer<O> {
    fn write_null(&mut self) -> PackStreamResult<()> {
        self.out.write_u8(marker::NULL)
    }

    fn write_bool(&mut self, value: bool) -> PackStreamResult<()> {
        self.out
            .write_u8(if value { marker::TRUE } else { marker::FALSE })
    }

    fn write_int(&mut self, value: i64) -> PackStreamResult<()> {
        if (marker::TINY_INT_MIN..=marker::TINY_INT_MAX).contains(&value) {
            self.out.write_u8(value as u8)
        } else if i64::from(i8::MIN) <= value && value <= i64::from(i8::MAX) {
            self.out.write_u8(marker::INT_8)?;
            self.out.write_i8(value as i8)
        } else if i64::from(i16::MIN) <= value && value <= i64::from(i16::MAX) {
            self.out.write_u8(marker::INT_16)?;
            self.out.write_i16(value as i16)
        } else if i64::from(i32::MIN) <= value && value <= i64::from(i32::MAX) {
            self.out.write_u8(marker::INT_32)?;
            self.out.write_i32(value as i32)
        } else {
            self.out.write_u8(marker::INT_64)?;
            self.out.write_i64(value)
        }
    }

    fn write_float(&mut self, value: f64) -> PackStreamResult<()> {
        self.out.write_u8(marker::FLOAT_64)?;
        self.out.write_f64(value)
    }

    fn write_bytes(&mut self, value: &[u8]) -> PackStreamResult<()> {
        let len = value.len();
        if len <= 0xFF {
            self.out.write_u8(marker::BYTES_8)?;
            self.out.write_u8(len as u8)?;
        } else if len <= 0xFFFF {
            self.out.write_u8(marker::BYTES_16)?;
            self.out.write_u16(len as u16)?;
        } else if len <= marker::SIZE_32_MAX {
            self.out.write_u8(marker::BYTES_32)?;
            self.out.write_u32(len as u32)?;
        } else {
            return Err(oversize("byte array", len));
        }
        self.out.write_slice(value)
    }

    fn write_string(&mut self, value: &str) -> PackStreamResult<()> {
        let bytes = value.as_bytes();
        let len = bytes.len();
        if len <= marker::TINY_SIZE_MAX {
            self.out.write_u8(marker::TINY_STRING | len as u8)?;
        } else if len <= 0xFF {
            self.out.write_u8(marker::STRING_8)?;
            self.out.write_u8(len as u8)?;
        } else if len <= 0xFFFF {
            self.out.write_u8(marker::STRING_16)?;
            self.out.write_u16(len as u16)?;
        } else if len <= marker::SIZE_32_MAX {
            self.out.write_u8(marker::STRING_32)?;
            self.out.write_u32(len as u32)?;
        } else {
            return Err(oversize("string", len));
        }
        self.out.write_slice(bytes)
    }

    fn begin_list(&mut self, len: usize) -> PackStreamResult<()> {
        if len <= marker::TINY_SIZE_MAX {
            self.out.write_u8(marker::TINY_LIST | len as u8)
        } else if len <= 0xFF {
            self.out.write_u8(marker::LIST_8)?;
            self.out.write_u8(len as u8)
        } else if len <= 0xFFFF {
            self.out.write_u8(marker::LIST_16)?;
            self.out.write_u16(len as u16)
        } else if len <= marker::SIZE_32_MAX {
            self.out.write_u8(marker::LIST_32)?;
            self.out.write_u32(len as u32)
        } else {
            Err(oversize("list", len))
        }
    }

    fn end_list(&mut self) -> PackStreamResult<()> {
        Ok(())
    }

    fn begin_map(&mut self, len: usize) -> PackStreamResult<()> {
        if len <= marker::TINY_SIZE_MAX {
            self.out.write_u8(marker::TINY_MAP | len as u8)
        } else if len <= 0xFF {
            self.out.write_u8(marker::MAP_8)?;
            self.out.write_u8(len as u8)
        } else if len <= 0xFFFF {
            self.out.write_u8(marker::MAP_16)?;
            self.out.write_u16(len as u16)
        } else if len <= marker::SIZE_32_MAX {
            self.out.write_u8(marker::MAP_32)?;
            self.out.write_u32(len as u32)
        } else {
            Err(oversize("map", len))
        }
    }

    fn end_map(&mut self) -> PackStreamResult<()> {
        Ok(())
    }

    /// Arrays have no dedicated encoding in this version; they travel as
    /// lists of their element type.
    fn begin_array(&mut self, len: usize, _kind: ArrayKind) -> PackStreamResult<()> {
        self.begin_list(len)
    }

    fn end_array(&mut self) -> PackStreamResult<()> {
        Ok(())
    }

    fn write_node(&mut self, node: &Node) -> PackStreamResult<()> {
        self.write_struct_header(3, signatures::NODE)?;
        self.write_int(node.id)?;
        self.begin_list(node.labels.len())?;
        for label in &node.labels {
            self.write_string(label)?;
        }
        self.write_value_map(&node.properties)
    }

    fn write_relationship(&mut self, rel: &Relationship) -> PackStreamResult<()> {
        self.write_struct_header(5, signatures::RELATIONSHIP)?;
        self.write_int(rel.id)?;
        self.write_int(rel.start_node_id)?;
        self.write_int(rel.end_node_id)?;
        self.write_string(&rel.rel_type)?;
        self.write_value_map(&rel.properties)
    }

    fn write_unbound_relationship(&mut self, rel: &UnboundRelationship) -> PackStreamResult<()> {
        self.write_struct_header(3, signatures::UNBOUND_RELATIONSHIP)?;
        self.write_int(rel.id)?;
        self.write_string(&rel.rel_type)?;
        self.write_value_map(&rel.properties)
    }

    fn write_path(&mut self, path: &Path) -> PackStreamResult<()> {
        self.write_path_with(path, &InlineProperties { path })
    }

    fn write_node_reference(&mut self, _node_id: i64) -> PackStreamResult<()> {
        Err(PackStreamError::ReferenceNotSerializable { entity: "Node" })
    }

    fn write_relationship_reference(&mut self, _rel_id: i64) -> PackStreamResult<()> {
        Err(PackStreamError::ReferenceNotSerializable {
            entity: "Relationship",
        })
    }

    fn write_path_reference(
        &mut self,
        _node_ids: &[i64],
        _rel_ids: &[i64],
    ) -> PackStreamResult<()> {
        Err(PackStreamError::ReferenceNotSerializable { entity: "Path" })
    }
}

/// Serves entity content straight from a materialized path.
struct InlineProperties<'a> {
    path: &'a Path,
}

impl PropertySupplier for InlineProperties<'_> {
    fn node_labels(&self, node_id: i64) -> Result<Vec<String>, EntityReadError> {
        self.find_node(node_id).map(|n| n.labels.clone())
    }

    fn node_properties(&self, node_id: i64) -> Result<ValueMap, EntityReadError> {
        self.find_node(node_id).map(|n| n.properties.clone())
    }

    fn relationship_type(&self, rel_id: i64) -> Result<String, EntityReadError> {
        self.find_relationship(rel_id).map(|r| r.rel_type.clone())
    }

    fn relationship_properties(&self, rel_id: i64) -> Result<ValueMap, EntityReadError> {
        self.find_relationship(rel_id).map(|r| r.properties.clone())
    }
}

impl InlineProperties<'_> {
    fn find_node(&self, node_id: i64) -> Result<&Node, EntityReadError> {
        self.path
            .nodes
            .iter()
            .find(|n| n.id == node_id)
            .ok_or_else(|| {
                EntityReadError::ReadFailed(format!("node {node_id} is not part of the path"))
            })
    }

    fn find_relationship(&self, rel_id: i64) -> Result<&Relationship, EntityReadError> {
        self.path
            .relationships
            .iter()
            .find(|r| r.id == rel_id)
            .ok_or_else(|| {
                EntityReadError::ReadFailed(format!(
                    "relationship {rel_id} is not part of the path"
                ))
            })
    }
}

fn entity_read_failure(entity: &'static str, id: i64, error: EntityReadError) -> PackStreamError {
    PackStreamError::EntityReadFailure {
        entity,
        id,
        message: error.message(),
    }
}

fn oversize(what: &str, len: usize) -> PackStreamError {
    PackStreamError::malformed(format!(
        "{what} of length {len} exceeds the largest size class"
    ))
}

const LINEAR_SCAN_MAX: usize = 32;
const EMPTY_SLOT: u32 = u32::MAX;

/// Insertion-ordered map from 64-bit entity id to dense index.
///
/// Parallel arrays keep the keys unboxed and the first-seen order intact. A
/// linear scan serves typical path sizes; an open-addressed slot table takes
/// over past `LINEAR_SCAN_MAX` entries.
#[derive(Debug, Default)]
pub(crate) struct IdIndexMap {
    keys: Vec<i64>,
    slots: Vec<u32>,
}

impl IdIndexMap {
    pub(crate) fn new() -> Self {
        IdIndexMap::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn clear(&mut self) {
        self.keys.clear();
        self.slots.clear();
    }

    /// Dense index assigned to `id`, inserting at the next index if absent.
    /// The flag is true when the id was newly inserted.
    pub(crate) fn get_or_insert(&mut self, id: i64) -> (u32, bool) {
        if self.slots.is_empty() {
            if let Some(pos) = self.keys.iter().position(|&k| k == id) {
                return (pos as u32, false);
            }
            let index = self.keys.len() as u32;
            self.keys.push(id);
            if self.keys.len() > LINEAR_SCAN_MAX {
                self.rebuild_slots();
            }
            return (index, true);
        }

        let mask = self.slots.len() - 1;
        let mut slot = Self::spread(id) & mask;
        loop {
            match self.slots[slot] {
                EMPTY_SLOT => {
                    let index = self.keys.len() as u32;
                    self.slots[slot] = index;
                    self.keys.push(id);
                    // Keep the table under 70% load.
                    if self.keys.len() * 10 >= self.slots.len() * 7 {
                        self.rebuild_slots();
                    }
                    return (index, true);
                }
                occupied if self.keys[occupied as usize] == id => return (occupied, false),
                _ => slot = (slot + 1) & mask,
            }
        }
    }

    fn spread(id: i64) -> usize {
        // Fibonacci multiplier; sequential store ids land in distinct slots.
        ((id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 32) as usize
    }

    fn rebuild_slots(&mut self) {
        let capacity = (self.keys.len() * 4).next_power_of_two();
        self.slots.clear();
        self.slots.resize(capacity, EMPTY_SLOT);
        let mask = capacity - 1;
        for (index, &key) in self.keys.iter().enumerate() {
            let mut slot = Self::spread(key) & mask;
            while self.slots[slot] != EMPTY_SLOT {
                slot = (slot + 1) & mask;
            }
            self.slots[slot] = index as u32;
        }
    }
}
