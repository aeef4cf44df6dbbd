//! Attribute encoding
//!
//! [`encode_pair`] is the single entry point. It materialises the
//! descriptor path of the attribute under the cursor into a fixed-size
//! stack, dispatches on the root descriptor's kind, and reports how many
//! octets the outer encoder produced. The cursor is left on the first
//! unencoded pair, so callers loop:
//!
//! ```text
//! while cursor.is_some() {
//!     let n = encode_pair(&mut out[used..], &packet, None, secret, &mut cursor)?;
//!     if n == 0 && cursor stayed put { /* buffer full: flush */ }
//!     used += n;
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::avp::Avp;
use crate::dictionary::{AttrDef, AttrKind, MAX_TLV_STACK};
use crate::packet::PacketCtx;

mod extended;
mod rfc;
mod shift;
mod tlv;
mod value;
mod vsa;

/// Nested attribute structures cannot exceed one attribute's length octet.
pub(crate) const ATTR_MAX_LEN: usize = 255;

#[derive(Debug, Clone, Error)]
pub enum EncodeError {
    #[error("attribute depth {0} exceeds the maximum nesting depth {max}", max = MAX_TLV_STACK)]
    StackOverflow(usize),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),
    #[error("nested attribute structure too large to encode")]
    TooLarge,
}

/// Read-only inputs shared by every encoder in one run
pub(crate) struct EncodeCtx<'a> {
    pub packet: &'a PacketCtx,
    pub original: Option<&'a PacketCtx>,
    pub secret: &'a str,
}

/// The next pair to encode; `None` once the list is exhausted
pub(crate) type Cursor<'a> = Option<&'a Avp>;

/// The descriptor path of the pair under encoding, root at index 0
///
/// Rebuilt after every emission so that nested encoders can tell whether
/// the next pair still belongs to the same parent.
pub(crate) struct TlvStack {
    nodes: [Option<Arc<AttrDef>>; MAX_TLV_STACK + 2],
}

impl TlvStack {
    pub fn new() -> Self {
        TlvStack {
            nodes: std::array::from_fn(|_| None),
        }
    }

    pub fn build(&mut self, leaf: Option<&Arc<AttrDef>>) {
        for slot in self.nodes.iter_mut() {
            *slot = None;
        }
        let Some(leaf) = leaf else { return };
        let mut node = leaf.clone();
        loop {
            let depth = usize::from(node.depth);
            if depth >= self.nodes.len() {
                return;
            }
            let parent = node.parent().cloned();
            self.nodes[depth] = Some(node);
            match parent {
                Some(p) => node = p,
                None => break,
            }
        }
    }

    pub fn get(&self, depth: usize) -> Option<&Arc<AttrDef>> {
        self.nodes.get(depth).and_then(|slot| slot.as_ref())
    }
}

/// Move the cursor past `vp` and rebuild the stack for the new leaf.
pub(crate) fn advance<'a>(cursor: &mut Cursor<'a>, stack: &mut TlvStack, vp: &'a Avp) {
    *cursor = vp.next();
    stack.build(cursor.map(|next| next.def()));
}

pub(crate) fn invalid(msg: impl Into<String>) -> EncodeError {
    EncodeError::InvalidInput(msg.into())
}

/// Encode the attribute under `cursor` into `out`.
///
/// Returns the octet count written. `Ok(0)` with the cursor unchanged means
/// the buffer has no room left for this attribute; `Ok(0)` with the cursor
/// advanced means the attribute produced no octets (empty value, or a
/// non-protocol attribute that was skipped). The cursor never moves past an
/// attribute that was not fully planned into the buffer.
pub fn encode_pair<'a>(
    out: &mut [u8],
    packet: &PacketCtx,
    original: Option<&PacketCtx>,
    secret: &str,
    cursor: &mut Option<&'a Avp>,
) -> Result<usize, EncodeError> {
    if out.len() <= 2 {
        return Ok(0);
    }
    let vp = cursor.ok_or_else(|| invalid("no attribute to encode"))?;

    let depth = usize::from(vp.def().depth);
    if depth > MAX_TLV_STACK {
        return Err(EncodeError::StackOverflow(depth));
    }

    let mut stack = TlvStack::new();
    stack.build(Some(vp.def()));
    let root = stack
        .get(0)
        .cloned()
        .ok_or_else(|| invalid("descriptor chain has no root"))?;

    let ctx = EncodeCtx {
        packet,
        original,
        secret,
    };

    // Nested structures are bounded by the one-octet length field, so most
    // encoders see at most 255 octets of window. Formats that fragment
    // (long-extended, WiMAX) or repeat (concat) plan over the whole buffer.
    let window = out.len().min(ATTR_MAX_LEN);

    let written = match root.kind {
        AttrKind::Leaf(_) => {
            if root.attr > 255 && !root.flags.concat {
                // Non-protocol attribute: skip it.
                *cursor = vp.next();
                return Ok(0);
            }
            if root.flags.concat {
                rfc::encode_concat(out, &mut stack, 0, cursor)?
            } else {
                rfc::encode_rfc_hdr(&mut out[..window], &ctx, &mut stack, 0, cursor)?
            }
        }
        AttrKind::Vsa => {
            if vp.def().flags.wimax {
                vsa::encode_wimax_hdr(out, &ctx, &mut stack, 0, cursor)?
            } else {
                vsa::encode_vsa_hdr(&mut out[..window], &ctx, &mut stack, 0, cursor)?
            }
        }
        AttrKind::Tlv => tlv::encode_tlv_hdr(&mut out[..window], &ctx, &mut stack, 0, cursor)?,
        AttrKind::Extended => {
            extended::encode_extended_hdr(&mut out[..window], &ctx, &mut stack, 0, cursor)?
        }
        AttrKind::LongExtended => {
            extended::encode_extended_hdr(out, &ctx, &mut stack, 0, cursor)?
        }
        AttrKind::Evs => return Err(invalid("top level \"evs\" attribute is invalid")),
        AttrKind::Vendor(_) => return Err(invalid("top level \"vendor\" attribute is invalid")),
    };

    match *cursor {
        Some(now) if std::ptr::eq(now, vp) => Err(EncodeError::TooLarge),
        _ => Ok(written),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avp::Value;
    use crate::dictionary::{AttrFlags, Dictionary, ValueKind, VendorFormat};

    #[test]
    fn test_stack_build_walks_to_root() {
        let mut dict = Dictionary::new();
        dict.define_vendor("Acme", 6100, VendorFormat::RFC).unwrap();
        let tlv = dict.define_vendor_tlv(6100, "Acme-Group", 3).unwrap();
        let leaf = dict
            .define_tlv_attribute(&tlv, "Acme-Member", 1, ValueKind::Integer, AttrFlags::default())
            .unwrap();

        let mut stack = TlvStack::new();
        stack.build(Some(&leaf));

        assert!(matches!(stack.get(0).unwrap().kind, AttrKind::Vsa));
        assert!(matches!(stack.get(1).unwrap().kind, AttrKind::Vendor(_)));
        assert!(matches!(stack.get(2).unwrap().kind, AttrKind::Tlv));
        assert!(Arc::ptr_eq(stack.get(3).unwrap(), &leaf));
        assert!(stack.get(4).is_none());
    }

    #[test]
    fn test_stack_build_none_clears() {
        let mut dict = Dictionary::new();
        let leaf = dict
            .define_attribute("User-Name", 1, ValueKind::String, AttrFlags::default())
            .unwrap();
        let mut stack = TlvStack::new();
        stack.build(Some(&leaf));
        assert!(stack.get(0).is_some());
        stack.build(None);
        assert!(stack.get(0).is_none());
    }

    #[test]
    fn test_nonprotocol_attribute_skipped() {
        let mut dict = Dictionary::new();
        let internal = dict
            .define_attribute("Internal-State", 1000, ValueKind::String, AttrFlags::default())
            .unwrap();
        let packet = PacketCtx::new(crate::packet::Code::AccessRequest, [0u8; 16]);

        let mut list = crate::avp::AvpList::new();
        list.push(Avp::new(internal, Value::String("x".into())).unwrap());

        let mut out = [0u8; 64];
        let mut cursor = list.cursor();
        let written = encode_pair(&mut out, &packet, None, "secret", &mut cursor).unwrap();
        assert_eq!(written, 0);
        assert!(cursor.is_none());
        assert!(out.iter().all(|&b| b == 0));
    }
}
