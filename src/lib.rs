//! PackStream value codec for the Bolt graph wire protocol.
//!
//! This crate packs and unpacks the self-describing, type-tagged binary
//! format carried between graph database clients and servers: the base type
//! universe (null, booleans, integers, floats, bytes, strings, lists, maps,
//! structs) plus the graph composites (nodes, relationships, paths). It is
//! the value layer only; message framing, transport, and request dispatch
//! belong to the session protocol around it and reach the codec through the
//! [`PackInput`] / [`PackOutput`] seams.
//!
//! All multi-byte scalars are big-endian and every encoder picks the
//! smallest size class that holds its value losslessly, so the emitted bytes
//! are exactly what third-party drivers expect.
//!
//! # Example
//!
//! ```
//! use packstream::{ByteReader, Codec, Value};
//!
//! # fn main() -> packstream::PackStreamResult<()> {
//! let codec = Codec::v1();
//!
//! let mut packer = codec.new_packer(Vec::new());
//! packer.pack(&Value::Int(42))?;
//! let bytes = packer.into_inner();
//! assert_eq!(bytes, vec![0x2A]);
//!
//! let mut unpacker = codec.new_unpacker(ByteReader::new(bytes));
//! assert_eq!(unpacker.unpack_one()?, Value::Int(42));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod graph;
pub mod json;
pub mod marker;
pub mod packer;
pub mod stream;
pub mod unpacker;
pub mod value;
pub mod version;

pub use error::{PackStreamError, PackStreamResult};
pub use graph::{
    EntityReadError, Node, Path, PropertySupplier, Relationship, UnboundRelationship,
};
pub use packer::{ArrayKind, Packer, ValueWriter};
pub use stream::{ByteReader, PackInput, PackOutput, WriteOutput};
pub use unpacker::{PackType, Unpacker};
pub use value::{Struct, Value, ValueMap};
pub use version::{signatures, Codec};
