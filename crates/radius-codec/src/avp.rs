//! Attribute-value pairs
//!
//! [`Avp`] couples a leaf descriptor with a value in its natural Rust form;
//! [`AvpList`] owns an ordered chain of pairs and hands out the cursor the
//! encoder consumes. Pairs are read-only while a buffer is being encoded.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use thiserror::Error;

use crate::dictionary::{AttrDef, ValueKind};

/// Scratch size for [`Value::network_bytes`]: the largest rendering that
/// does not borrow from the value itself (an IPv6 prefix).
pub const SCRATCH_LEN: usize = 18;

/// RFC 2868 tags are 1..=31; 0 and 32..=255 are "no tag"
pub fn tag_valid(tag: u8) -> bool {
    tag > 0 && tag < 0x20
}

#[derive(Debug, Clone, Error)]
pub enum AvpError {
    #[error("descriptor {0} is not a leaf attribute")]
    NotALeaf(String),
    #[error("value kind {got:?} does not match {name} ({expected:?})")]
    KindMismatch {
        name: String,
        expected: ValueKind,
        got: ValueKind,
    },
    #[error("tag {0} out of range 1..=31")]
    InvalidTag(u8),
}

/// A leaf attribute's payload, stored in natural form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Octets(Vec<u8>),
    Ipv4Addr(Ipv4Addr),
    Ipv6Addr(Ipv6Addr),
    Ipv4Prefix { prefix_len: u8, addr: Ipv4Addr },
    Ipv6Prefix { prefix_len: u8, addr: Ipv6Addr },
    InterfaceId([u8; 8]),
    Ethernet([u8; 6]),
    Abinary(Vec<u8>),
    ComboIp(IpAddr),
    Byte(u8),
    Short(u16),
    Integer(u32),
    Integer64(u64),
    Date(u32),
    Signed(i32),
    Boolean(bool),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Octets(_) => ValueKind::Octets,
            Value::Ipv4Addr(_) => ValueKind::Ipv4Addr,
            Value::Ipv6Addr(_) => ValueKind::Ipv6Addr,
            Value::Ipv4Prefix { .. } => ValueKind::Ipv4Prefix,
            Value::Ipv6Prefix { .. } => ValueKind::Ipv6Prefix,
            Value::InterfaceId(_) => ValueKind::InterfaceId,
            Value::Ethernet(_) => ValueKind::Ethernet,
            Value::Abinary(_) => ValueKind::Abinary,
            Value::ComboIp(_) => ValueKind::ComboIp,
            Value::Byte(_) => ValueKind::Byte,
            Value::Short(_) => ValueKind::Short,
            Value::Integer(_) => ValueKind::Integer,
            Value::Integer64(_) => ValueKind::Integer64,
            Value::Date(_) => ValueKind::Date,
            Value::Signed(_) => ValueKind::Signed,
            Value::Boolean(_) => ValueKind::Boolean,
        }
    }

    /// Octets this value occupies on the wire, before any tag or
    /// obfuscation overhead.
    pub fn wire_len(&self) -> usize {
        match self {
            Value::String(s) => s.len(),
            Value::Octets(v) | Value::Abinary(v) => v.len(),
            Value::Ipv4Addr(_) => 4,
            Value::Ipv6Addr(_) => 16,
            Value::Ipv4Prefix { .. } => 6,
            Value::Ipv6Prefix { .. } => 18,
            Value::InterfaceId(_) => 8,
            Value::Ethernet(_) => 6,
            Value::ComboIp(IpAddr::V4(_)) => 4,
            Value::ComboIp(IpAddr::V6(_)) => 16,
            Value::Byte(_) | Value::Boolean(_) => 1,
            Value::Short(_) => 2,
            Value::Integer(_) | Value::Date(_) | Value::Signed(_) => 4,
            Value::Integer64(_) => 8,
        }
    }

    /// Network byte order rendering of this value.
    ///
    /// Strings, octets and fixed byte arrays borrow from the value's own
    /// storage; everything else is rendered big-endian into `scratch` and
    /// borrowed from there. The returned slice is valid as long as both
    /// borrows live.
    pub fn network_bytes<'a>(&'a self, scratch: &'a mut [u8; SCRATCH_LEN]) -> &'a [u8] {
        match self {
            Value::String(s) => s.as_bytes(),
            Value::Octets(v) | Value::Abinary(v) => v,
            Value::InterfaceId(b) => b,
            Value::Ethernet(b) => b,
            Value::Ipv4Addr(addr) => {
                scratch[..4].copy_from_slice(&addr.octets());
                &scratch[..4]
            }
            Value::Ipv6Addr(addr) => {
                scratch[..16].copy_from_slice(&addr.octets());
                &scratch[..16]
            }
            Value::Ipv4Prefix { prefix_len, addr } => {
                scratch[0] = 0;
                scratch[1] = *prefix_len;
                scratch[2..6].copy_from_slice(&addr.octets());
                &scratch[..6]
            }
            Value::Ipv6Prefix { prefix_len, addr } => {
                scratch[0] = 0;
                scratch[1] = *prefix_len;
                scratch[2..18].copy_from_slice(&addr.octets());
                &scratch[..18]
            }
            Value::ComboIp(IpAddr::V4(addr)) => {
                scratch[..4].copy_from_slice(&addr.octets());
                &scratch[..4]
            }
            Value::ComboIp(IpAddr::V6(addr)) => {
                scratch[..16].copy_from_slice(&addr.octets());
                &scratch[..16]
            }
            Value::Byte(v) => {
                scratch[0] = *v;
                &scratch[..1]
            }
            Value::Boolean(v) => {
                scratch[0] = u8::from(*v) & 0x01;
                &scratch[..1]
            }
            Value::Short(v) => {
                scratch[..2].copy_from_slice(&v.to_be_bytes());
                &scratch[..2]
            }
            Value::Integer(v) | Value::Date(v) => {
                scratch[..4].copy_from_slice(&v.to_be_bytes());
                &scratch[..4]
            }
            Value::Signed(v) => {
                scratch[..4].copy_from_slice(&v.to_be_bytes());
                &scratch[..4]
            }
            Value::Integer64(v) => {
                scratch[..8].copy_from_slice(&v.to_be_bytes());
                &scratch[..8]
            }
        }
    }
}

/// One attribute-value pair in the encoder's input list
#[derive(Debug)]
pub struct Avp {
    def: Arc<AttrDef>,
    value: Value,
    tag: u8,
    next: Option<Box<Avp>>,
}

impl Avp {
    /// Create an untagged pair; the value kind must match the descriptor.
    pub fn new(def: Arc<AttrDef>, value: Value) -> Result<Avp, AvpError> {
        let expected = def
            .value_kind()
            .ok_or_else(|| AvpError::NotALeaf(def.name.clone()))?;
        if value.kind() != expected {
            return Err(AvpError::KindMismatch {
                name: def.name.clone(),
                expected,
                got: value.kind(),
            });
        }
        Ok(Avp {
            def,
            value,
            tag: 0,
            next: None,
        })
    }

    /// Create a tagged pair (RFC 2868); the tag must be 1..=31.
    pub fn tagged(def: Arc<AttrDef>, tag: u8, value: Value) -> Result<Avp, AvpError> {
        if !tag_valid(tag) {
            return Err(AvpError::InvalidTag(tag));
        }
        let mut avp = Avp::new(def, value)?;
        avp.tag = tag;
        Ok(avp)
    }

    pub fn def(&self) -> &Arc<AttrDef> {
        &self.def
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn tag(&self) -> u8 {
        self.tag
    }

    pub fn next(&self) -> Option<&Avp> {
        self.next.as_deref()
    }
}

/// An owned, ordered list of pairs
///
/// The encoder walks the list through an `Option<&Avp>` cursor obtained
/// from [`AvpList::cursor`]; each successful encode advances the cursor to
/// the next unencoded pair.
#[derive(Debug, Default)]
pub struct AvpList {
    head: Option<Box<Avp>>,
}

impl AvpList {
    pub fn new() -> Self {
        AvpList::default()
    }

    /// Append a pair at the tail.
    pub fn push(&mut self, avp: Avp) {
        let mut slot = &mut self.head;
        while let Some(node) = slot {
            slot = &mut node.next;
        }
        *slot = Some(Box::new(avp));
    }

    /// Cursor at the first pair.
    pub fn cursor(&self) -> Option<&Avp> {
        self.head.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head.as_deref(),
        }
    }
}

pub struct Iter<'a> {
    next: Option<&'a Avp>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Avp;

    fn next(&mut self) -> Option<&'a Avp> {
        let cur = self.next?;
        self.next = cur.next();
        Some(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{AttrFlags, Dictionary};

    fn leaf(kind: ValueKind) -> Arc<AttrDef> {
        let mut dict = Dictionary::new();
        dict.define_attribute("Test-Attr", 1, kind, AttrFlags::default())
            .unwrap()
    }

    #[test]
    fn test_integer_network_bytes() {
        let mut scratch = [0u8; SCRATCH_LEN];
        let value = Value::Integer(0x0102_0304);
        assert_eq!(value.network_bytes(&mut scratch), &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(value.wire_len(), 4);
    }

    #[test]
    fn test_string_borrows_own_storage() {
        let mut scratch = [0u8; SCRATCH_LEN];
        let value = Value::String("bob".into());
        let bytes = value.network_bytes(&mut scratch);
        assert_eq!(bytes, b"bob");
    }

    #[test]
    fn test_ipv6_prefix_layout() {
        let mut scratch = [0u8; SCRATCH_LEN];
        let value = Value::Ipv6Prefix {
            prefix_len: 64,
            addr: "2001:db8::".parse().unwrap(),
        };
        let bytes = value.network_bytes(&mut scratch);
        assert_eq!(bytes.len(), 18);
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1], 64);
        assert_eq!(&bytes[2..6], &[0x20, 0x01, 0x0d, 0xb8]);
    }

    #[test]
    fn test_boolean_low_bit_only() {
        let mut scratch = [0u8; SCRATCH_LEN];
        assert_eq!(Value::Boolean(true).network_bytes(&mut scratch), &[0x01]);
        assert_eq!(Value::Boolean(false).network_bytes(&mut scratch), &[0x00]);
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let def = leaf(ValueKind::String);
        assert!(matches!(
            Avp::new(def, Value::Integer(1)),
            Err(AvpError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_tag_range() {
        let def = leaf(ValueKind::String);
        assert!(Avp::tagged(def.clone(), 0, Value::String("x".into())).is_err());
        assert!(Avp::tagged(def.clone(), 32, Value::String("x".into())).is_err());
        assert!(Avp::tagged(def, 31, Value::String("x".into())).is_ok());
    }

    #[test]
    fn test_list_preserves_order() {
        let def = leaf(ValueKind::String);
        let mut list = AvpList::new();
        for name in ["a", "b", "c"] {
            list.push(Avp::new(def.clone(), Value::String(name.into())).unwrap());
        }
        let collected: Vec<_> = list
            .iter()
            .map(|vp| match vp.value() {
                Value::String(s) => s.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(collected, ["a", "b", "c"]);
        assert_eq!(list.len(), 3);
    }
}
