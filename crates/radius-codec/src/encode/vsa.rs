//! Vendor-Specific attributes
//!
//! ```text
//! | 26 | length | vendor id (4) | vendor type (1/2/4) | [vendor length (0/1/2)] | value |
//! ```
//!
//! The inner field widths come from the vendor descriptor. WiMAX uses its
//! own inner header `[type, length, continuation]` and may fragment across
//! several VSAs, chaining them with the C-bit.

use tracing::trace;

use crate::dictionary::{AttrKind, VENDOR_SPECIFIC, VENDOR_WIMAX};

use super::{invalid, rfc, shift, tlv, value, Cursor, EncodeCtx, EncodeError, TlvStack, ATTR_MAX_LEN};

/// Outer VSA header: type, length, vendor id
const VSA_HDR: usize = 6;

/// WiMAX per-fragment header: VSA header plus `[type, length, continuation]`
const WIMAX_HDR: usize = 9;

pub(crate) fn encode_vsa_hdr<'a>(
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

    if !matches!(da.kind, AttrKind::Vsa) {
        return Err(invalid(format!(
            "expected type \"vsa\" got \"{}\"",
            da.kind.name()
        )));
    }
    if vp.def().flags.wimax {
        return encode_wimax_hdr(out, ctx, stack, depth, cursor);
    }
    if out.len() < VSA_HDR {
        return Ok(0);
    }

    let vendor = stack
        .get(depth + 1)
        .cloned()
        .ok_or_else(|| invalid("vsa without a vendor definition"))?;
    if !matches!(vendor.kind, AttrKind::Vendor(_)) {
        return Err(invalid(format!(
            "expected type \"vendor\" got \"{}\"",
            vendor.kind.name()
        )));
    }

    out[0] = VENDOR_SPECIFIC;
    out[1] = VSA_HDR as u8;
    out[2..6].copy_from_slice(&vendor.attr.to_be_bytes());

    let window = (out.len() - VSA_HDR).min(ATTR_MAX_LEN - VSA_HDR);
    let len = encode_vendor_attr_hdr(&mut out[VSA_HDR..VSA_HDR + window], ctx, stack, depth + 2, cursor)?;
    if len == 0 {
        return Ok(0);
    }

    out[1] += len as u8;
    trace!(vendor = vendor.attr, len = out[1], "encoded vsa");
    Ok(usize::from(out[1]))
}

/// Encode the vendor's inner header and payload.
///
/// Vendors with the default 1/1 widths encode leaves exactly like RFC
/// attributes. Everything else gets the explicit type and length fields,
/// with the length field (when present) patched after the payload.
pub(crate) fn encode_vendor_attr_hdr<'a>(
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

    let format = da.parent().and_then(|parent| match parent.kind {
        AttrKind::Vendor(format) => Some(format),
        _ => None,
    });
    // Unknown vendor, or a plain leaf in the default 1/1 layout: encode it
    // exactly like an RFC attribute.
    let format = match format {
        None => return rfc::encode_rfc_hdr_internal(out, ctx, stack, depth, cursor),
        Some(format) if format.is_rfc() && !matches!(da.kind, AttrKind::Tlv) => {
            return rfc::encode_rfc_hdr_internal(out, ctx, stack, depth, cursor)
        }
        Some(format) => format,
    };

    let type_width = usize::from(format.type_width);
    let length_width = usize::from(format.length_width);
    let hdr = type_width + length_width;
    if out.len() < hdr {
        return Ok(0);
    }

    match type_width {
        4 => {
            // 24-bit number, leading octet always zero
            out[0] = 0;
            out[1] = (da.attr >> 16) as u8;
            out[2] = (da.attr >> 8) as u8;
            out[3] = da.attr as u8;
        }
        2 => {
            out[0] = (da.attr >> 8) as u8;
            out[1] = da.attr as u8;
        }
        1 => out[0] = da.attr as u8,
        _ => {
            return Err(EncodeError::UnsupportedValue(format!(
                "vendor type width {}",
                type_width
            )))
        }
    }

    match length_width {
        0 => {}
        1 => out[type_width] = (type_width + 1) as u8,
        2 => {
            out[type_width] = 0;
            out[type_width + 1] = (type_width + 2) as u8;
        }
        _ => {
            return Err(EncodeError::UnsupportedValue(format!(
                "vendor length width {}",
                length_width
            )))
        }
    }

    let window = (out.len() - hdr).min(ATTR_MAX_LEN - hdr);
    let len = if matches!(da.kind, AttrKind::Tlv) {
        tlv::encode_tlv_hdr_internal(&mut out[hdr..hdr + window], ctx, stack, depth, cursor)?
    } else {
        value::encode_value(&mut out[hdr..hdr + window], ctx, stack, depth, cursor)?
    };
    if len == 0 {
        return Ok(0);
    }

    if length_width > 0 {
        out[hdr - 1] += len as u8;
    }
    Ok(hdr + len)
}

/// Encode a WiMAX VSA, fragmenting with the continuation octet's C-bit
/// when the value exceeds one attribute.
pub(crate) fn encode_wimax_hdr<'a>(
    out: &mut [u8],
    ctx: &EncodeCtx<'_>,
    stack: &mut TlvStack,
    mut depth: usize,
    cursor: &mut Cursor<'a>,
) -> Result<usize, EncodeError> {
    let vp: &'a _ = cursor.ok_or_else(|| invalid("no attribute to encode"))?;

    if !vp.def().flags.wimax {
        return Err(invalid("called for a non-wimax vsa"));
    }
    if out.len() < WIMAX_HDR {
        return Ok(0);
    }

    let vsa = stack
        .get(depth)
        .ok_or_else(|| invalid("descriptor stack exhausted"))?;
    if vsa.attr != u32::from(VENDOR_SPECIFIC) {
        return Err(invalid(
            "wimax stack must start at Vendor-Specific (26)",
        ));
    }
    depth += 1;

    let vendor = stack
        .get(depth)
        .ok_or_else(|| invalid("descriptor stack exhausted"))?;
    if vendor.attr != VENDOR_WIMAX {
        return Err(invalid(format!(
            "wimax stack level 2 must be vendor {}",
            VENDOR_WIMAX
        )));
    }
    depth += 1;

    let inner = stack
        .get(depth)
        .cloned()
        .ok_or_else(|| invalid("wimax vsa without an inner attribute"))?;

    out[0] = VENDOR_SPECIFIC;
    out[1] = WIMAX_HDR as u8;
    out[2..6].copy_from_slice(&vp.def().vendor.to_be_bytes());
    out[6] = (inner.attr & 0xff) as u8;
    out[7] = 3;
    out[8] = 0; // continuation octet, C-bit clear

    let len = if matches!(inner.kind, AttrKind::Tlv) {
        tlv::encode_tlv_hdr_internal(&mut out[WIMAX_HDR..], ctx, stack, depth, cursor)?
    } else {
        value::encode_value(&mut out[WIMAX_HDR..], ctx, stack, depth, cursor)?
    };
    if len == 0 {
        return Ok(0);
    }

    if len > ATTR_MAX_LEN - WIMAX_HDR {
        let used = shift::attr_shift(out, WIMAX_HDR, len, 8, 7);
        trace!(len = used, "fragmented wimax vsa");
        return Ok(used);
    }

    out[1] += len as u8;
    out[7] += len as u8;
    trace!(len = out[1], "encoded wimax vsa");
    Ok(usize::from(out[1]))
}
