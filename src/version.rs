//! Protocol version gating.
//!
//! Each codec version carries an immutable table of the struct signatures it
//! decodes. Signatures introduced by later versions are registered here so a
//! version-1 reader can distinguish "known to a newer version" from "unknown
//! to every version". The encode-time allow list is the complement: version 1
//! packs the base universe and the graph composites, and refuses the
//! temporal and spatial family (enforced in [`Packer::pack`]).
//!
//! [`Packer::pack`]: crate::packer::Packer::pack

use crate::packer::Packer;
use crate::stream::{PackInput, PackOutput};
use crate::unpacker::Unpacker;

/// Struct signature bytes, chosen to be ASCII for readability in dumps.
pub mod signatures {
    pub const NODE: u8 = 0x4E; // 'N'
    pub const RELATIONSHIP: u8 = 0x52; // 'R'
    pub const UNBOUND_RELATIONSHIP: u8 = 0x72; // 'r'
    pub const PATH: u8 = 0x50; // 'P'

    // Known to later protocol versions only.
    pub const DATE: u8 = 0x44; // 'D'
    pub const TIME: u8 = 0x54; // 'T'
    pub const LOCAL_TIME: u8 = 0x74; // 't'
    pub const LOCAL_DATE_TIME: u8 = 0x64; // 'd'
    pub const DATE_TIME: u8 = 0x46; // 'F'
    pub const DURATION: u8 = 0x45; // 'E'
    pub const POINT_2D: u8 = 0x58; // 'X'
    pub const POINT_3D: u8 = 0x59; // 'Y'
}

/// Domain struct kinds the decoder can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StructKind {
    Node,
    Relationship,
    UnboundRelationship,
    Path,
}

/// Expected field count per struct kind.
impl StructKind {
    pub(crate) fn arity(self) -> usize {
        match self {
            StructKind::Node => 3,
            StructKind::Relationship => 5,
            StructKind::UnboundRelationship => 3,
            StructKind::Path => 3,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            StructKind::Node => "Node",
            StructKind::Relationship => "Relationship",
            StructKind::UnboundRelationship => "UnboundRelationship",
            StructKind::Path => "Path",
        }
    }
}

/// Signatures registered by any version, current or future.
const KNOWN_SIGNATURES: &[u8] = &[
    signatures::NODE,
    signatures::RELATIONSHIP,
    signatures::UNBOUND_RELATIONSHIP,
    signatures::PATH,
    signatures::DATE,
    signatures::TIME,
    signatures::LOCAL_TIME,
    signatures::LOCAL_DATE_TIME,
    signatures::DATE_TIME,
    signatures::DURATION,
    signatures::POINT_2D,
    signatures::POINT_3D,
];

/// Immutable per-version decode table. Constructed once, shareable across
/// threads.
#[derive(Debug)]
pub(crate) struct VersionTable {
    pub(crate) version: u32,
    structs: &'static [(u8, StructKind)],
}

impl VersionTable {
    pub(crate) fn struct_kind(&self, signature: u8) -> Option<StructKind> {
        self.structs
            .iter()
            .find(|(sig, _)| *sig == signature)
            .map(|(_, kind)| *kind)
    }

    pub(crate) fn is_known_signature(signature: u8) -> bool {
        KNOWN_SIGNATURES.contains(&signature)
    }
}

static V1: VersionTable = VersionTable {
    version: 1,
    structs: &[
        (signatures::NODE, StructKind::Node),
        (signatures::RELATIONSHIP, StructKind::Relationship),
        (
            signatures::UNBOUND_RELATIONSHIP,
            StructKind::UnboundRelationship,
        ),
        (signatures::PATH, StructKind::Path),
    ],
};

/// Factory for version-bound packers and unpackers.
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    table: &'static VersionTable,
}

impl Codec {
    /// Version 1: the base type universe plus Node, Relationship,
    /// UnboundRelationship, and Path.
    pub fn v1() -> Self {
        Codec { table: &V1 }
    }

    pub fn version(&self) -> u32 {
        self.table.version
    }

    pub fn new_packer<O: PackOutput>(&self, output: O) -> Packer<O> {
        Packer::new(output, self.table)
    }

    pub fn new_unpacker<I: PackInput>(&self, input: I) -> Unpacker<I> {
        Unpacker::new(input, self.table)
    }
}
