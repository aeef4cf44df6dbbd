//! Standard RFC 2865 attribute format, plus the `concat` splitter
//!
//! ```text
//!  0                   1                   2
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Type      |    Length     |  Value ...
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use tracing::trace;

use crate::avp::Value;
use crate::dictionary::{CHARGEABLE_USER_IDENTITY, MESSAGE_AUTHENTICATOR};

use super::{advance, invalid, value, Cursor, EncodeCtx, EncodeError, TlvStack, ATTR_MAX_LEN};

/// Encode a standard attribute (1..255) at the top level.
///
/// Two attributes get hard-coded treatment: a zero-length
/// Chargeable-User-Identity is a bare header (its defined empty form), and
/// Message-Authenticator is reserved as 16 zero octets for the packet
/// builder to fill with the HMAC once the whole packet exists.
pub(crate) fn encode_rfc_hdr<'a>(
    out: &mut [u8],
    ctx: &EncodeCtx<'_>,
    stack: &mut TlvStack,
    depth: usize,
    cursor: &mut Cursor<'a>,
) -> Result<usize, EncodeError> {
    let vp: &'a _ = cursor.ok_or_else(|| invalid("no attribute to encode"))?;
    let da = stack
        .get(depth)
        .cloned()
        .ok_or_else(|| invalid("descriptor stack exhausted"))?;

    if da.kind.is_structural() {
        return Err(invalid(format!(
            "expected a leaf type, got \"{}\"",
            da.kind.name()
        )));
    }
    if vp.def().attr == 0 || vp.def().attr > 255 {
        return Err(invalid(format!(
            "called with non-standard attribute {}",
            vp.def().attr
        )));
    }

    if vp.value().wire_len() == 0 && vp.def().attr == u32::from(CHARGEABLE_USER_IDENTITY) {
        out[0] = CHARGEABLE_USER_IDENTITY;
        out[1] = 2;
        advance(cursor, stack, vp);
        return Ok(2);
    }

    if vp.def().vendor == 0 && vp.def().attr == u32::from(MESSAGE_AUTHENTICATOR) {
        if out.len() < 18 {
            return Ok(0);
        }
        out[0] = MESSAGE_AUTHENTICATOR;
        out[1] = 18;
        out[2..18].fill(0);
        trace!("reserved message-authenticator placeholder");
        advance(cursor, stack, vp);
        return Ok(18);
    }

    encode_rfc_hdr_internal(out, ctx, stack, depth, cursor)
}

/// Encode an RFC-format header and value at any nesting level.
///
/// This is also the encoding for TLV sub-attributes and for vendor
/// attributes whose vendor uses the default 1/1 field widths.
pub(crate) fn encode_rfc_hdr_internal<'a>(
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

    if da.kind.is_structural() {
        return Err(invalid(format!(
            "called with structural type \"{}\"",
            da.kind.name()
        )));
    }
    if da.attr == 0 || da.attr > 255 {
        return Err(invalid(format!(
            "called with non-standard attribute {}",
            da.attr
        )));
    }

    if out.len() <= 2 {
        return Ok(0);
    }

    out[0] = (da.attr & 0xff) as u8;
    out[1] = 2;

    let window = (out.len() - 2).min(ATTR_MAX_LEN - 2);
    let len = value::encode_value(&mut out[2..2 + window], ctx, stack, depth, cursor)?;
    if len == 0 {
        return Ok(0);
    }

    out[1] += len as u8;
    trace!(attr = da.attr, len = out[1], "encoded rfc attribute");
    Ok(usize::from(out[1]))
}

/// Encode an octets attribute flagged `concat`: the value is split across
/// as many same-type sibling attributes as it needs (and the buffer fits).
/// The pair is consumed even if the tail had to be dropped.
pub(crate) fn encode_concat<'a>(
    out: &mut [u8],
    stack: &mut TlvStack,
    depth: usize,
    cursor: &mut Cursor<'a>,
) -> Result<usize, EncodeError> {
    let vp: &'a _ = cursor.ok_or_else(|| invalid("no attribute to encode"))?;
    let da = stack
        .get(depth)
        .cloned()
        .ok_or_else(|| invalid("descriptor stack exhausted"))?;

    let data: &[u8] = match vp.value() {
        Value::Octets(v) => v,
        Value::String(s) => s.as_bytes(),
        _ => return Err(invalid("concat attributes must carry octets")),
    };

    let attr = (da.attr & 0xff) as u8;
    let mut written = 0;
    let mut offset = 0;

    while offset < data.len() {
        let freespace = out.len() - written;
        if freespace <= 2 {
            break;
        }
        let chunk = (data.len() - offset)
            .min(ATTR_MAX_LEN - 2)
            .min(freespace - 2);

        out[written] = attr;
        out[written + 1] = (2 + chunk) as u8;
        out[written + 2..written + 2 + chunk].copy_from_slice(&data[offset..offset + chunk]);

        written += 2 + chunk;
        offset += chunk;
    }

    trace!(attr, total = written, "encoded concat attribute");
    advance(cursor, stack, vp);
    Ok(written)
}
