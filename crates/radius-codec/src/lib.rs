//! RADIUS Attribute Wire Encoding
//!
//! This crate serializes in-memory attribute-value pairs into the attribute
//! region of a RADIUS packet, as defined in RFC 2865 and extended by
//! RFC 2868 (tagged/obfuscated tunnel attributes), RFC 6929
//! (extended and long-extended attributes) and the WiMAX forum VSA format.
//!
//! # Features
//!
//! - Standard, Vendor-Specific, TLV, extended and WiMAX attribute formats
//! - Per-vendor type/length field widths (1/2/4 and 0/1/2 octets)
//! - Fragmentation of oversized values with M-bit / C-bit continuation
//! - User-Password, Tunnel-Password and Ascend-Secret obfuscation
//! - Partial-encode semantics: the caller's cursor stops at the first
//!   attribute that did not fit
//!
//! The dictionary *loader* is out of scope: the encoder consumes resolved
//! descriptor trees built through [`Dictionary`]. Packet framing (code,
//! identifier, authenticators, Message-Authenticator HMAC) belongs to the
//! packet builder; the encoder only reserves the 18-octet placeholder.
//!
//! # Example
//!
//! ```rust
//! use radius_codec::{
//!     encode_pair, AttrFlags, Avp, AvpList, Code, Dictionary, PacketCtx, Value, ValueKind,
//! };
//!
//! let mut dict = Dictionary::new();
//! let user_name = dict
//!     .define_attribute("User-Name", 1, ValueKind::String, AttrFlags::default())
//!     .unwrap();
//!
//! let mut list = AvpList::new();
//! list.push(Avp::new(user_name, Value::String("bob".into())).unwrap());
//!
//! let packet = PacketCtx::new(Code::AccessRequest, [0u8; 16]);
//! let mut out = [0u8; 4096];
//! let mut cursor = list.cursor();
//! let written = encode_pair(&mut out, &packet, None, "s3cr3t", &mut cursor).unwrap();
//!
//! assert_eq!(&out[..written], &[0x01, 0x05, b'b', b'o', b'b']);
//! assert!(cursor.is_none());
//! ```

pub mod avp;
pub mod crypt;
pub mod dictionary;
pub mod encode;
pub mod packet;

pub use avp::{Avp, AvpError, AvpList, Value};
pub use dictionary::{
    AttrDef, AttrFlags, AttrKind, Dictionary, DictionaryError, Encrypt, ValueKind, VendorFormat,
};
pub use encode::{encode_pair, EncodeError};
pub use packet::{Code, PacketCtx};
