//! RFC 6929 extended and long-extended attributes
//!
//! ```text
//! short:  | type | length | ext-type | value |
//! long:   | type | length | ext-type | flags | value |        M-bit = flags & 0x80
//! EVS:    | type | length | 26 | 0x00 | vendor (3) | evs-type | value |
//! ```
//!
//! Short extended attributes truncate an oversized value; long extended
//! attributes fragment it, chaining fragments with the M-bit.

use tracing::trace;

use crate::dictionary::{AttrKind, VENDOR_SPECIFIC};

use super::{invalid, shift, value, Cursor, EncodeCtx, EncodeError, TlvStack, ATTR_MAX_LEN};

/// Per-fragment header of the long form: type, length, ext-type, flags
const LONG_EXT_HDR: usize = 4;

/// Octet carrying the M-bit
const FLAG_OFFSET: usize = 3;

pub(crate) fn encode_extended_hdr<'a>(
    out: &mut [u8],
    ctx: &EncodeCtx<'_>,
    stack: &mut TlvStack,
    mut depth: usize,
    cursor: &mut Cursor<'a>,
) -> Result<usize, EncodeError> {
    let vp: &'a _ = cursor.ok_or_else(|| invalid("no attribute to encode"))?;
    let da = stack
        .get(depth)
        .cloned()
        .ok_or_else(|| invalid("descriptor stack exhausted"))?;

    if !matches!(da.kind, AttrKind::Extended | AttrKind::LongExtended) {
        return Err(invalid(format!(
            "called for non-extended attribute type \"{}\"",
            da.kind.name()
        )));
    }

    let long = vp.def().flags.long_extended;
    let hdr = if long { 4 } else { 3 };
    if out.len() < hdr {
        return Ok(0);
    }

    out[0] = (da.attr & 0xff) as u8;
    out[1] = hdr as u8;
    out[2] = (vp.def().attr & 0xff) as u8;
    if long {
        out[3] = 0; // flags octet; the M-bit is set during fragmentation
    }
    depth += 1;

    // Only the long form may spill past one attribute.
    let cap = if long {
        out.len()
    } else {
        out.len().min(ATTR_MAX_LEN)
    };

    if matches!(stack.get(depth).map(|d| &d.kind), Some(AttrKind::Evs)) {
        if out.len() < hdr + 5 {
            return Ok(0);
        }
        depth += 1; // the EVS node's vendor
        out[2] = VENDOR_SPECIFIC;
        out[hdr] = 0;
        let vendor = vp.def().vendor;
        out[hdr + 1] = (vendor >> 16) as u8;
        out[hdr + 2] = (vendor >> 8) as u8;
        out[hdr + 3] = vendor as u8;
        out[hdr + 4] = (vp.def().attr & 0xff) as u8;
        out[1] += 5;
        depth += 1; // the leaf
    }
    let hdr_len = usize::from(out[1]);

    let mut len = value::encode_value(&mut out[hdr_len..cap], ctx, stack, depth, cursor)?;
    if len == 0 {
        return Ok(0);
    }

    if len > ATTR_MAX_LEN - hdr_len {
        if long {
            let used = shift::attr_shift(out, LONG_EXT_HDR, len, FLAG_OFFSET, 0);
            trace!(attr = da.attr, len = used, "fragmented long-extended attribute");
            return Ok(used);
        }
        len = ATTR_MAX_LEN - hdr_len; // truncate to fit
    }

    out[1] += len as u8;
    trace!(attr = da.attr, len = out[1], "encoded extended attribute");
    Ok(usize::from(out[1]))
}
