//! C type model (component D, type-tree half).
//!
//! Grounded on the original implementation's `SdTypenode`/`SdType`
//! (`original_source/src/spray_dwarf.h`): a flat buffer of nodes rather
//! than a tree of borrowed DIE references. The teacher's later
//! `debugee/dwarf/type.rs` builds a `ContextualDieRef`/namespace-aware
//! compound-type graph; that machinery is out of scope here, where
//! compound/aggregate types are explicitly unsupported and every type
//! bottoms out at a base type, an unspecified type, or a typedef.
//!
//! A [`TypeChain`] is walked from index 0: node *n+1* qualifies node
//! *n* (pointer-to-X, const-X, ...), matching the DWARF attribute chain
//! that produced it.

use crate::debugger::dwarf::R;
use gimli::DwAte;

/// One of the C base types this core understands, per DWARF 5 §5.1
/// (`DW_AT_encoding` + byte size).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseTypeTag {
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    LongDouble,
}

/// A qualifier or modifier applied to the node that precedes it in a
/// [`TypeChain`]. Matches DWARF 5 §5.3's modified-type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeModifier {
    Atomic,
    Const,
    Pointer,
    Restrict,
    Volatile,
}

/// One node in a flattened type chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode {
    BaseType { tag: BaseTypeTag, byte_size: u8 },
    Modifier(TypeModifier),
    /// `DW_TAG_unspecified_type` (DWARF 5 §5.2): `void`, or a type the
    /// compiler declined to describe further.
    Unspecified,
    /// `DW_TAG_typedef` (DWARF 5 §5.4); the node after it is the
    /// aliased type.
    Typedef { name: Option<String> },
}

/// A type, represented as a flat sequence walked from node 0. Built by
/// following a `DW_AT_type` reference chain until it bottoms out at a
/// base or unspecified type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeChain {
    nodes: Vec<TypeNode>,
}

impl TypeChain {
    pub fn nodes(&self) -> &[TypeNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The innermost base type in the chain, if one was reached. Most
    /// callers rendering a scalar value want this rather than walking
    /// the whole chain themselves.
    pub fn base_type(&self) -> Option<(BaseTypeTag, u8)> {
        self.nodes.iter().find_map(|node| match node {
            TypeNode::BaseType { tag, byte_size } => Some((*tag, *byte_size)),
            _ => None,
        })
    }

    /// True if any node in the chain is a pointer modifier -- the
    /// caller needs this to decide whether a resolved location holds a
    /// value directly or an address to dereference.
    pub fn is_pointer(&self) -> bool {
        self.nodes
            .iter()
            .any(|n| matches!(n, TypeNode::Modifier(TypeModifier::Pointer)))
    }
}

/// Classify a `DW_TAG_base_type` DIE's `DW_AT_encoding` + `DW_AT_byte_size`
/// (plus, where needed, its `DW_AT_name`) into one of the fixed C
/// base-type tags.
///
/// The single-byte `DW_ATE_signed`/`DW_ATE_unsigned_char` cases resolve
/// the same way C's plain `char` signedness is platform-defined:
/// compilers emit `DW_ATE_signed_char` for plain `char` on x86-64 Linux,
/// so that encoding maps to [`BaseTypeTag::Char`] rather than
/// [`BaseTypeTag::SignedChar`].
///
/// On x86-64 Linux, `long` and `long long` are both emitted as an
/// 8-byte `DW_ATE_signed`/`DW_ATE_unsigned` -- there's no wider 8-byte
/// integer to reserve for one or the other, so `name` (`"long int"` vs
/// `"long long int"`, and their unsigned equivalents) is what actually
/// tells them apart.
pub fn classify_base_type(encoding: DwAte, byte_size: u64, name: Option<&str>) -> Option<BaseTypeTag> {
    use gimli::constants::*;
    let tag = match (encoding, byte_size) {
        (DW_ATE_signed_char, 1) => BaseTypeTag::Char,
        (DW_ATE_unsigned_char, 1) => BaseTypeTag::UnsignedChar,
        (DW_ATE_signed, 1) => BaseTypeTag::SignedChar,
        (DW_ATE_signed, 2) => BaseTypeTag::Short,
        (DW_ATE_unsigned, 2) => BaseTypeTag::UnsignedShort,
        (DW_ATE_signed, 4) => BaseTypeTag::Int,
        (DW_ATE_unsigned, 4) => BaseTypeTag::UnsignedInt,
        (DW_ATE_signed, 8) if is_long_long_name(name) => BaseTypeTag::LongLong,
        (DW_ATE_signed, 8) => BaseTypeTag::Long,
        (DW_ATE_unsigned, 8) if is_long_long_name(name) => BaseTypeTag::UnsignedLongLong,
        (DW_ATE_unsigned, 8) => BaseTypeTag::UnsignedLong,
        (DW_ATE_float, 4) => BaseTypeTag::Float,
        (DW_ATE_float, 8) => BaseTypeTag::Double,
        (DW_ATE_float, 16) => BaseTypeTag::LongDouble,
        (DW_ATE_boolean, _) => BaseTypeTag::UnsignedChar,
        _ => return None,
    };
    Some(tag)
}

fn is_long_long_name(name: Option<&str>) -> bool {
    name.map(|n| n.contains("long long")).unwrap_or(false)
}

/// `DW_TAG_*` to [`TypeModifier`] mapping for the tags DWARF 5 §5.3
/// lists as modified types.
pub fn modifier_for_tag(tag: gimli::DwTag) -> Option<TypeModifier> {
    match tag {
        gimli::DW_TAG_atomic_type => Some(TypeModifier::Atomic),
        gimli::DW_TAG_const_type => Some(TypeModifier::Const),
        gimli::DW_TAG_pointer_type => Some(TypeModifier::Pointer),
        gimli::DW_TAG_restrict_type => Some(TypeModifier::Restrict),
        gimli::DW_TAG_volatile_type => Some(TypeModifier::Volatile),
        _ => None,
    }
}

pub(super) struct TypeChainBuilder {
    nodes: Vec<TypeNode>,
}

impl TypeChainBuilder {
    pub(super) fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub(super) fn push_modifier(&mut self, m: TypeModifier) {
        self.nodes.push(TypeNode::Modifier(m));
    }

    pub(super) fn push_typedef(&mut self, name: Option<String>) {
        self.nodes.push(TypeNode::Typedef { name });
    }

    pub(super) fn push_base_type(&mut self, tag: BaseTypeTag, byte_size: u8) {
        self.nodes.push(TypeNode::BaseType { tag, byte_size });
    }

    pub(super) fn push_unspecified(&mut self) {
        self.nodes.push(TypeNode::Unspecified);
    }

    pub(super) fn finish(self) -> TypeChain {
        TypeChain { nodes: self.nodes }
    }
}

/// Read a DIE's `DW_AT_name` as an owned string, if present. A small
/// shared helper so `TypeChain` construction in `mod.rs` doesn't need
/// to duplicate the string-attribute dance done everywhere else.
pub(super) fn attr_name_string(
    dwarf: &gimli::Dwarf<R>,
    unit: &gimli::Unit<R>,
    die: &gimli::DebuggingInformationEntry<R>,
) -> gimli::Result<Option<String>> {
    Ok(die
        .attr(gimli::DW_AT_name)?
        .and_then(|attr| dwarf.attr_string(unit, attr.value()).ok())
        .and_then(|s| s.to_string_lossy().ok().map(|s| s.into_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_plain_char_is_char_not_signed_char() {
        assert_eq!(
            classify_base_type(gimli::constants::DW_ATE_signed_char, 1, Some("char")),
            Some(BaseTypeTag::Char)
        );
    }

    #[test]
    fn classify_unknown_encoding_is_none() {
        assert_eq!(
            classify_base_type(gimli::constants::DW_ATE_complex_float, 8, None),
            None
        );
    }

    #[test]
    fn classify_long_vs_long_long_by_name() {
        assert_eq!(
            classify_base_type(gimli::constants::DW_ATE_signed, 8, Some("long int")),
            Some(BaseTypeTag::Long)
        );
        assert_eq!(
            classify_base_type(gimli::constants::DW_ATE_signed, 8, Some("long long int")),
            Some(BaseTypeTag::LongLong)
        );
        assert_eq!(
            classify_base_type(gimli::constants::DW_ATE_unsigned, 8, Some("long unsigned int")),
            Some(BaseTypeTag::UnsignedLong)
        );
        assert_eq!(
            classify_base_type(
                gimli::constants::DW_ATE_unsigned,
                8,
                Some("long long unsigned int")
            ),
            Some(BaseTypeTag::UnsignedLongLong)
        );
    }

    #[test]
    fn classify_long_without_name_defaults_to_long() {
        assert_eq!(
            classify_base_type(gimli::constants::DW_ATE_signed, 8, None),
            Some(BaseTypeTag::Long)
        );
    }

    #[test]
    fn chain_base_type_and_pointer_detection() {
        let mut builder = TypeChainBuilder::new();
        builder.push_modifier(TypeModifier::Pointer);
        builder.push_modifier(TypeModifier::Const);
        builder.push_base_type(BaseTypeTag::Int, 4);
        let chain = builder.finish();
        assert!(chain.is_pointer());
        assert_eq!(chain.base_type(), Some((BaseTypeTag::Int, 4)));
        assert_eq!(chain.nodes().len(), 3);
    }

    #[test]
    fn empty_chain_has_no_base_type() {
        let chain = TypeChain::default();
        assert!(chain.is_empty());
        assert_eq!(chain.base_type(), None);
        assert!(!chain.is_pointer());
    }
}
