//! Value decoder.
//!
//! A pull parser over a [`PackInput`]: `unpack_one` reads the next marker,
//! dispatches on its type, and recursively reads children. Struct signatures
//! are resolved through the active version table; recognized domain structs
//! come back as typed values and everything else is an error, never an opaque
//! struct. Every declared size is checked against the remaining input before
//! the decoder allocates for it.

use crate::error::{PackStreamError, PackStreamResult};
use crate::graph::{Node, Path, Relationship, UnboundRelationship};
use crate::marker;
use crate::stream::PackInput;
use crate::value::{Value, ValueMap};
use crate::version::{StructKind, VersionTable};

/// Logical type of the next encoded value, derived from its marker byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackType {
    Null,
    Boolean,
    Integer,
    Float,
    Bytes,
    String,
    List,
    Map,
    Struct,
    EndOfStream,
}

/// Version-bound decoder over a [`PackInput`].
pub struct Unpacker<I: PackInput> {
    input: I,
    table: &'static VersionTable,
}

impl<I: PackInput> Unpacker<I> {
    pub(crate) fn new(input: I, table: &'static VersionTable) -> Self {
        Unpacker { input, table }
    }

    /// Classify the next value without consuming anything.
    pub fn peek_type(&mut self) -> PackStreamResult<PackType> {
        let offset = self.input.position();
        let m = self.input.peek_u8()?;
        marker_type(m).ok_or_else(|| {
            PackStreamError::malformed_at(format!("unknown marker byte 0x{m:02X}"), offset)
        })
    }

    /// Decode the next whole value.
    ///
    /// Returns `Value::EndOfStream` when the input is positioned on the
    /// streaming sentinel; the marker is consumed either way.
    pub fn unpack_one(&mut self) -> PackStreamResult<Value> {
        match self.peek_type()? {
            PackType::Null => {
                self.input.read_u8()?;
                Ok(Value::Null)
            }
            PackType::Boolean => {
                let m = self.input.read_u8()?;
                Ok(Value::Bool(m == marker::TRUE))
            }
            PackType::Integer => self.unpack_int().map(Value::Int),
            PackType::Float => self.unpack_float().map(Value::Float),
            PackType::Bytes => self.unpack_bytes().map(Value::Bytes),
            PackType::String => self.unpack_string().map(Value::String),
            PackType::List => self.unpack_list().map(Value::List),
            PackType::Map => self.unpack_map().map(Value::Map),
            PackType::Struct => self.unpack_struct(),
            PackType::EndOfStream => {
                self.input.read_u8()?;
                Ok(Value::EndOfStream)
            }
        }
    }

    /// Decode a value in a position where the streaming sentinel is invalid.
    fn unpack_nested(&mut self) -> PackStreamResult<Value> {
        let offset = self.input.position();
        let value = self.unpack_one()?;
        if matches!(value, Value::EndOfStream) {
            return Err(PackStreamError::malformed_at(
                "unexpected END_OF_STREAM inside a value",
                offset,
            ));
        }
        Ok(value)
    }

    /// Decode an integer of any size class, widened to 64 bits.
    pub fn unpack_int(&mut self) -> PackStreamResult<i64> {
        let offset = self.input.position();
        let m = self.input.read_u8()?;
        match m {
            0x00..=0x7F => Ok(i64::from(m)),
            0xF0..=0xFF => Ok(i64::from(m as i8)),
            marker::INT_8 => Ok(i64::from(self.input.read_i8()?)),
            marker::INT_16 => Ok(i64::from(self.input.read_i16()?)),
            marker::INT_32 => Ok(i64::from(self.input.read_i32()?)),
            marker::INT_64 => self.input.read_i64(),
            _ => Err(PackStreamError::malformed_at(
                format!("expected an integer, found marker 0x{m:02X}"),
                offset,
            )),
        }
    }

    /// Decode a 64-bit float.
    pub fn unpack_float(&mut self) -> PackStreamResult<f64> {
        let offset = self.input.position();
        let m = self.input.read_u8()?;
        if m != marker::FLOAT_64 {
            return Err(PackStreamError::malformed_at(
                format!("expected a float, found marker 0x{m:02X}"),
                offset,
            ));
        }
        self.input.read_f64()
    }

    /// Decode a string of any size class.
    pub fn unpack_string(&mut self) -> PackStreamResult<String> {
        let offset = self.input.position();
        let m = self.input.read_u8()?;
        let len = match m {
            _ if (m & 0xF0) == marker::TINY_STRING => usize::from(m & 0x0F),
            marker::STRING_8 => usize::from(self.input.read_u8()?),
            marker::STRING_16 => usize::from(self.input.read_u16()?),
            marker::STRING_32 => self.input.read_u32()? as usize,
            _ => {
                return Err(PackStreamError::malformed_at(
                    format!("expected a string, found marker 0x{m:02X}"),
                    offset,
                ))
            }
        };
        self.check_size(len, "string", offset)?;

        let mut buf = vec![0u8; len];
        self.input.read_exact(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|_| PackStreamError::malformed_at("invalid UTF-8 in string", offset))
    }

    /// Decode a byte array of any size class.
    pub fn unpack_bytes(&mut self) -> PackStreamResult<Vec<u8>> {
        let offset = self.input.position();
        let m = self.input.read_u8()?;
        let len = match m {
            marker::BYTES_8 => usize::from(self.input.read_u8()?),
            marker::BYTES_16 => usize::from(self.input.read_u16()?),
            marker::BYTES_32 => self.input.read_u32()? as usize,
            _ => {
                return Err(PackStreamError::malformed_at(
                    format!("expected a byte array, found marker 0x{m:02X}"),
                    offset,
                ))
            }
        };
        self.check_size(len, "byte array", offset)?;

        let mut buf = vec![0u8; len];
        self.input.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a list header and return the declared item count.
    pub fn unpack_list_header(&mut self) -> PackStreamResult<usize> {
        let offset = self.input.position();
        let m = self.input.read_u8()?;
        let len = match m {
            _ if (m & 0xF0) == marker::TINY_LIST => usize::from(m & 0x0F),
            marker::LIST_8 => usize::from(self.input.read_u8()?),
            marker::LIST_16 => usize::from(self.input.read_u16()?),
            marker::LIST_32 => self.input.read_u32()? as usize,
            _ => {
                return Err(PackStreamError::malformed_at(
                    format!("expected a list, found marker 0x{m:02X}"),
                    offset,
                ))
            }
        };
        // Every item costs at least one byte.
        self.check_size(len, "list", offset)?;
        Ok(len)
    }

    /// Read a map header and return the declared entry count.
    pub fn unpack_map_header(&mut self) -> PackStreamResult<usize> {
        let offset = self.input.position();
        let m = self.input.read_u8()?;
        let len = match m {
            _ if (m & 0xF0) == marker::TINY_MAP => usize::from(m & 0x0F),
            marker::MAP_8 => usize::from(self.input.read_u8()?),
            marker::MAP_16 => usize::from(self.input.read_u16()?),
            marker::MAP_32 => self.input.read_u32()? as usize,
            _ => {
                return Err(PackStreamError::malformed_at(
                    format!("expected a map, found marker 0x{m:02X}"),
                    offset,
                ))
            }
        };
        // Every entry costs at least two bytes, one per key and value.
        let need = len.checked_mul(2).ok_or_else(|| {
            PackStreamError::malformed_at(format!("map size {len} overflows"), offset)
        })?;
        self.check_size(need, "map", offset)?;
        Ok(len)
    }

    /// Read a struct header and return the declared field count and the
    /// signature byte.
    pub fn unpack_struct_header(&mut self) -> PackStreamResult<(usize, u8)> {
        let offset = self.input.position();
        let m = self.input.read_u8()?;
        let size = match m {
            _ if (m & 0xF0) == marker::TINY_STRUCT => usize::from(m & 0x0F),
            marker::STRUCT_8 => usize::from(self.input.read_u8()?),
            marker::STRUCT_16 => usize::from(self.input.read_u16()?),
            _ => {
                return Err(PackStreamError::malformed_at(
                    format!("expected a struct, found marker 0x{m:02X}"),
                    offset,
                ))
            }
        };
        let signature = self.input.read_u8()?;
        // Every field costs at least one byte.
        self.check_size(size, "struct", offset)?;
        Ok((size, signature))
    }

    /// Decode a full map, enforcing unique non-null string keys.
    pub fn unpack_map(&mut self) -> PackStreamResult<ValueMap> {
        let len = self.unpack_map_header()?;
        let mut map = ValueMap::with_capacity(len);
        for _ in 0..len {
            let key_offset = self.input.position();
            match self.peek_type()? {
                PackType::String => {}
                other => {
                    return Err(PackStreamError::malformed_at(
                        format!("map key must be a string, got {other:?}"),
                        key_offset,
                    ))
                }
            }
            let key = self.unpack_string()?;
            let value = self.unpack_nested()?;
            if !map.insert_unique(key.clone(), value) {
                return Err(PackStreamError::malformed_at(
                    format!("Duplicate map key '{key}'"),
                    key_offset,
                ));
            }
        }
        Ok(map)
    }

    fn unpack_list(&mut self) -> PackStreamResult<Vec<Value>> {
        let len = self.unpack_list_header()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.unpack_nested()?);
        }
        Ok(items)
    }

    fn unpack_struct(&mut self) -> PackStreamResult<Value> {
        let (size, signature) = self.unpack_struct_header()?;
        log::trace!("decoding struct 0x{signature:02X} with {size} fields");
        match self.table.struct_kind(signature) {
            Some(kind) => {
                if size != kind.arity() {
                    return Err(PackStreamError::malformed(format!(
                        "{} struct expects {} fields, got {}",
                        kind.name(),
                        kind.arity(),
                        size
                    )));
                }
                match kind {
                    StructKind::Node => self.unpack_node().map(Value::Node),
                    StructKind::Relationship => {
                        self.unpack_relationship().map(Value::Relationship)
                    }
                    StructKind::UnboundRelationship => self
                        .unpack_unbound_relationship()
                        .map(Value::UnboundRelationship),
                    StructKind::Path => self.unpack_path().map(Value::Path),
                }
            }
            None if VersionTable::is_known_signature(signature) => {
                Err(PackStreamError::StructNotSupportedInThisVersion {
                    signature,
                    version: self.table.version,
                })
            }
            None => Err(PackStreamError::StructSignatureUnknown { signature }),
        }
    }

    fn unpack_node(&mut self) -> PackStreamResult<Node> {
        let id = self.unpack_int()?;
        let label_count = self.unpack_list_header()?;
        let mut labels = Vec::with_capacity(label_count);
        for _ in 0..label_count {
            labels.push(self.unpack_string()?);
        }
        let properties = self.unpack_map()?;
        Ok(Node::new(id, labels, properties))
    }

    fn unpack_relationship(&mut self) -> PackStreamResult<Relationship> {
        let id = self.unpack_int()?;
        let start_node_id = self.unpack_int()?;
        let end_node_id = self.unpack_int()?;
        let rel_type = self.unpack_string()?;
        let properties = self.unpack_map()?;
        Ok(Relationship::new(
            id,
            start_node_id,
            end_node_id,
            rel_type,
            properties,
        ))
    }

    fn unpack_unbound_relationship(&mut self) -> PackStreamResult<UnboundRelationship> {
        let id = self.unpack_int()?;
        let rel_type = self.unpack_string()?;
        let properties = self.unpack_map()?;
        Ok(UnboundRelationship::new(id, rel_type, properties))
    }

    /// Decode the three path fields and rebuild the traversal by walking the
    /// signed index array with a running previous-node pointer.
    fn unpack_path(&mut self) -> PackStreamResult<Path> {
        let node_count = self.unpack_list_header()?;
        let mut unique_nodes = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            match self.unpack_nested()? {
                Value::Node(node) => unique_nodes.push(node),
                other => {
                    return Err(PackStreamError::malformed(format!(
                        "path nodes must be Node structs, got {}",
                        other.type_name()
                    )))
                }
            }
        }

        let rel_count = self.unpack_list_header()?;
        let mut unique_rels = Vec::with_capacity(rel_count);
        for _ in 0..rel_count {
            match self.unpack_nested()? {
                Value::UnboundRelationship(rel) => unique_rels.push(rel),
                other => {
                    return Err(PackStreamError::malformed(format!(
                        "path relationships must be UnboundRelationship structs, got {}",
                        other.type_name()
                    )))
                }
            }
        }

        let index_count = self.unpack_list_header()?;
        let mut indices = Vec::with_capacity(index_count);
        for _ in 0..index_count {
            indices.push(self.unpack_int()?);
        }

        if indices.len() % 2 != 0 {
            return Err(PackStreamError::malformed(format!(
                "path index array length {} is odd",
                indices.len()
            )));
        }
        if unique_rels.is_empty() && !indices.is_empty() {
            return Err(PackStreamError::malformed(
                "path with no relationships cannot have traversal indices",
            ));
        }
        let Some(start) = unique_nodes.first() else {
            return Err(PackStreamError::malformed(
                "path must contain at least one node",
            ));
        };

        let steps = indices.len() / 2;
        let mut nodes = Vec::with_capacity(steps + 1);
        let mut relationships = Vec::with_capacity(steps);
        nodes.push(start.clone());
        let mut prev = start;

        for pair in indices.chunks(2) {
            let rel_index = pair[0];
            let node_index = pair[1];

            if rel_index == 0 || rel_index.unsigned_abs() > unique_rels.len() as u64 {
                return Err(PackStreamError::malformed(format!(
                    "path relationship index {} out of range 1..={}",
                    rel_index,
                    unique_rels.len()
                )));
            }
            if node_index < 0 || node_index >= unique_nodes.len() as i64 {
                return Err(PackStreamError::malformed(format!(
                    "path node index {} out of range 0..{}",
                    node_index,
                    unique_nodes.len()
                )));
            }

            let rel = &unique_rels[(rel_index.unsigned_abs() - 1) as usize];
            let next = &unique_nodes[node_index as usize];
            let (start_node_id, end_node_id) = if rel_index > 0 {
                (prev.id, next.id)
            } else {
                (next.id, prev.id)
            };

            relationships.push(Relationship::new(
                rel.id,
                start_node_id,
                end_node_id,
                rel.rel_type.clone(),
                rel.properties.clone(),
            ));
            nodes.push(next.clone());
            prev = next;
        }

        Ok(Path::new(nodes, relationships))
    }

    fn check_size(&self, declared: usize, what: &str, offset: u64) -> PackStreamResult<()> {
        let remaining = self.input.remaining();
        if declared > remaining {
            return Err(PackStreamError::malformed_at(
                format!("{what} size {declared} exceeds the {remaining} bytes remaining"),
                offset,
            ));
        }
        Ok(())
    }

    pub fn into_inner(self) -> I {
        self.input
    }
}

fn marker_type(m: u8) -> Option<PackType> {
    match m {
        0x00..=0x7F | 0xF0..=0xFF => Some(PackType::Integer),
        0x80..=0x8F => Some(PackType::String),
        0x90..=0x9F => Some(PackType::List),
        0xA0..=0xAF => Some(PackType::Map),
        0xB0..=0xBF => Some(PackType::Struct),
        marker::NULL => Some(PackType::Null),
        marker::FLOAT_64 => Some(PackType::Float),
        marker::FALSE | marker::TRUE => Some(PackType::Boolean),
        marker::INT_8..=marker::INT_64 => Some(PackType::Integer),
        marker::BYTES_8..=marker::BYTES_32 => Some(PackType::Bytes),
        marker::STRING_8..=marker::STRING_32 => Some(PackType::String),
        marker::LIST_8..=marker::LIST_32 => Some(PackType::List),
        marker::MAP_8..=marker::MAP_32 => Some(PackType::Map),
        marker::STRUCT_8 | marker::STRUCT_16 => Some(PackType::Struct),
        marker::END_OF_STREAM => Some(PackType::EndOfStream),
        _ => None,
    }
}
