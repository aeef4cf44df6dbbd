//! Leaf value serialization
//!
//! Marshals one pair's payload into network byte order, applies the RFC
//! 2868 tag octet and any obfuscation the descriptor calls for, then
//! advances the cursor and rebuilds the stack for the next pair.

use std::sync::Arc;

use tracing::trace;

use crate::avp::{tag_valid, SCRATCH_LEN};
use crate::crypt;
use crate::dictionary::{AttrKind, Encrypt, ValueKind};
use crate::packet::Code;

use super::{advance, invalid, tlv, Cursor, EncodeCtx, EncodeError, TlvStack};

/// Tunnel-Password needs room for the salt and one cipher block before it
/// can emit anything at all.
const TUNNEL_PASSWORD_MIN: usize = 18;

pub(crate) fn encode_value<'a>(
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

    // A TLV in value position is the nested sub-attribute case.
    if matches!(da.kind, AttrKind::Tlv) {
        return tlv::encode_tlv_hdr(out, ctx, stack, depth, cursor);
    }

    if stack.get(depth + 1).is_some() {
        return Err(invalid("encoding a value below the top of the stack"));
    }
    if !Arc::ptr_eq(vp.def(), &da) {
        return Err(invalid(
            "top of the stack does not match the attribute under encoding",
        ));
    }
    let AttrKind::Leaf(kind) = da.kind else {
        return Err(invalid(format!(
            "called with structural type \"{}\"",
            da.kind.name()
        )));
    };

    let mut scratch = [0u8; SCRATCH_LEN];
    let data = vp.value().network_bytes(&mut scratch);
    let mut len = data.len();

    // Nothing to emit; consume the pair.
    if len == 0 {
        advance(cursor, stack, vp);
        return Ok(0);
    }

    // No room to emit anything; leave the pair for a fresh buffer.
    if out.is_empty() {
        return Ok(0);
    }

    if len > out.len() {
        len = out.len();
    }

    let written = match da.flags.encrypt {
        Encrypt::UserPassword => {
            crypt::encrypt_user_password(out, &data[..len], ctx.secret, &ctx.packet.authenticator)
        }

        Encrypt::TunnelPassword => {
            let tag_len = usize::from(da.flags.has_tag);
            if out.len() < TUNNEL_PASSWORD_MIN + tag_len {
                return Ok(0);
            }
            // Request codes key the keystream off this packet's own vector;
            // replies use the matching request's vector.
            let vector = match ctx.packet.code {
                Code::AccountingRequest | Code::DisconnectRequest | Code::CoaRequest => {
                    &ctx.packet.authenticator
                }
                _ => {
                    let original = ctx.original.ok_or_else(|| {
                        invalid(format!("no request packet, cannot encrypt {}", da.name))
                    })?;
                    &original.authenticator
                }
            };
            if tag_len == 1 {
                out[0] = if tag_valid(vp.tag()) { vp.tag() } else { 0 };
            }
            crypt::encrypt_tunnel_password(&mut out[tag_len..], &data[..len], ctx.secret, vector)
                + tag_len
        }

        Encrypt::AscendSecret => {
            if len != 16 {
                return Ok(0);
            }
            let mut cipher = [0u8; 16];
            crypt::make_secret(&mut cipher, &data[..16], ctx.secret, &ctx.packet.authenticator);
            out[..16].copy_from_slice(&cipher);
            16
        }

        Encrypt::None => {
            let mut offset = 0;
            if da.flags.has_tag && tag_valid(vp.tag()) && kind == ValueKind::String {
                if len > out.len() - 1 {
                    len = out.len() - 1;
                }
                out[0] = vp.tag();
                offset = 1;
            }
            out[offset..offset + len].copy_from_slice(&data[..len]);
            // Tagged integers lose their top octet to the tag.
            if da.flags.has_tag && tag_valid(vp.tag()) && kind == ValueKind::Integer {
                out[0] = vp.tag();
            }
            offset + len
        }
    };

    trace!(attr = da.attr, vendor = da.vendor, len = written, "encoded value");

    advance(cursor, stack, vp);
    Ok(written)
}
