//! Nested Type-Length-Value sub-attributes
//!
//! A TLV container encodes as `[attr, length]` followed by its children in
//! RFC format (or further TLV containers). Consecutive pairs that still
//! belong to the same container after a stack rebuild are packed into one
//! header.

use std::sync::Arc;

use tracing::trace;

use super::{invalid, rfc, Cursor, EncodeCtx, EncodeError, TlvStack};
use crate::dictionary::AttrKind;

/// Smallest useful TLV: container header plus a child header plus one octet
const TLV_MIN: usize = 5;

/// Largest child payload a one-octet container length can describe
const TLV_MAX_INNER: usize = 253;

pub(crate) fn encode_tlv_hdr<'a>(
    out: &mut [u8],
    ctx: &EncodeCtx<'_>,
    stack: &mut TlvStack,
    depth: usize,
    cursor: &mut Cursor<'a>,
) -> Result<usize, EncodeError> {
    let da = stack
        .get(depth)
        .cloned()
        .ok_or_else(|| invalid("descriptor stack exhausted"))?;

    if !matches!(da.kind, AttrKind::Tlv) {
        return Err(invalid(format!(
            "expected type \"tlv\" got \"{}\"",
            da.kind.name()
        )));
    }
    if stack.get(depth + 1).is_none() {
        return Err(invalid("cannot encode an empty tlv"));
    }
    if out.len() < TLV_MIN {
        return Ok(0);
    }

    out[0] = (da.attr & 0xff) as u8;
    out[1] = 2;

    let len = encode_tlv_hdr_internal(&mut out[2..], ctx, stack, depth, cursor)?;
    if len == 0 {
        return Ok(0);
    }
    if len > TLV_MAX_INNER {
        return Ok(0);
    }

    out[1] += len as u8;
    trace!(attr = da.attr, len = out[1], "encoded tlv container");
    Ok(usize::from(out[1]))
}

/// Encode the children of the container at `depth`, packing as many
/// consecutive same-parent pairs as fit.
pub(crate) fn encode_tlv_hdr_internal<'a>(
    out: &mut [u8],
    ctx: &EncodeCtx<'_>,
    stack: &mut TlvStack,
    depth: usize,
    cursor: &mut Cursor<'a>,
) -> Result<usize, EncodeError> {
    let mut vp: &'a _ = cursor.ok_or_else(|| invalid("no attribute to encode"))?;
    let da = stack
        .get(depth)
        .cloned()
        .ok_or_else(|| invalid("descriptor stack exhausted"))?;

    let mut written = 0;
    while out.len() - written >= TLV_MIN {
        let Some(child) = stack.get(depth + 1) else {
            break;
        };
        let len = if matches!(child.kind, AttrKind::Tlv) {
            encode_tlv_hdr(&mut out[written..], ctx, stack, depth + 1, cursor)?
        } else {
            rfc::encode_rfc_hdr_internal(&mut out[written..], ctx, stack, depth + 1, cursor)?
        };
        if len == 0 {
            break;
        }
        written += len;

        // Stop once the list is exhausted or the cursor stalled.
        let Some(next) = *cursor else { break };
        if std::ptr::eq(next, vp) {
            break;
        }
        // Keep going only while the rebuilt stack still has this container
        // at our depth, meaning the next pair is a sibling.
        match stack.get(depth) {
            Some(here) if Arc::ptr_eq(here, &da) => {}
            _ => break,
        }
        vp = next;
    }

    Ok(written)
}
