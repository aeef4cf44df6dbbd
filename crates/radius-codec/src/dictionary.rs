//! Attribute descriptor trees
//!
//! The encoder is driven entirely by immutable descriptor nodes ([`AttrDef`])
//! arranged in parent chains: an RFC attribute is a single root leaf, a
//! vendor attribute hangs under `Vendor-Specific (26)` and a vendor node, a
//! TLV sub-attribute under its container, and so on. [`Dictionary`] builds
//! and interns those chains and answers lookup-by-number queries.
//!
//! Loading definitions from dictionary files is a separate concern and not
//! part of this crate.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Vendor-Specific (26) - RFC 2865
pub const VENDOR_SPECIFIC: u8 = 26;
/// Tunnel-Password (69) - RFC 2868
pub const TUNNEL_PASSWORD: u8 = 69;
/// Message-Authenticator (80) - RFC 2869
pub const MESSAGE_AUTHENTICATOR: u8 = 80;
/// Chargeable-User-Identity (89) - RFC 4372
pub const CHARGEABLE_USER_IDENTITY: u8 = 89;
/// WiMAX forum enterprise number; its VSAs carry a continuation octet
pub const VENDOR_WIMAX: u32 = 24757;

/// Maximum descriptor nesting depth the encoder supports
pub const MAX_TLV_STACK: usize = 16;

/// Largest attribute number expressible on the wire (24-bit vendor types)
const ATTR_MAX: u32 = 0x00ff_ffff;

#[derive(Debug, Clone, Error)]
pub enum DictionaryError {
    #[error("invalid vendor format: type width {type_width}, length width {length_width}")]
    InvalidVendorFormat { type_width: u8, length_width: u8 },
    #[error("attribute number {0} out of range 1..={1}")]
    AttrOutOfRange(u32, u32),
    #[error("attribute nesting depth exceeds the maximum of {}", MAX_TLV_STACK)]
    TooDeep,
    #[error("vendor {0} is not defined")]
    UnknownVendor(u32),
    #[error("duplicate definition of {0}")]
    Duplicate(String),
    #[error("{0} cannot contain child attributes")]
    NotAContainer(String),
}

/// Leaf payload kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Octets,
    Ipv4Addr,
    Ipv6Addr,
    Ipv4Prefix,
    Ipv6Prefix,
    InterfaceId,
    Ethernet,
    Abinary,
    ComboIp,
    Byte,
    Short,
    Integer,
    Integer64,
    Date,
    Signed,
    Boolean,
}

/// Obfuscation applied to a leaf value on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encrypt {
    #[default]
    None,
    /// RFC 2865 Section 5.2 MD5-chain XOR keyed by the request authenticator
    UserPassword,
    /// RFC 2868 Section 3.5, salted variant of the same keystream
    TunnelPassword,
    /// Single-block `MD5(secret || authenticator)` XOR (Ascend)
    AscendSecret,
}

/// Wire-format flags carried by a descriptor
#[derive(Debug, Clone, Copy, Default)]
pub struct AttrFlags {
    /// RFC 2868 tag octet precedes (string) or overlays (integer) the value
    pub has_tag: bool,
    /// Oversized octets split across same-type sibling attributes
    pub concat: bool,
    /// RFC 6929 long-extended format with M-bit continuation
    pub long_extended: bool,
    /// WiMAX VSA format with C-bit continuation
    pub wimax: bool,
    /// Lives inside an RFC 6929 Extended-Vendor-Specific block
    pub evs: bool,
    pub encrypt: Encrypt,
}

/// Widths of the type and length fields inside a vendor's VSA payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorFormat {
    /// 1, 2 or 4 octets (4 encodes a 24-bit number with a zero lead octet)
    pub type_width: u8,
    /// 0, 1 or 2 octets
    pub length_width: u8,
}

impl VendorFormat {
    /// The default `type(1) length(1)` layout shared with RFC attributes
    pub const RFC: VendorFormat = VendorFormat {
        type_width: 1,
        length_width: 1,
    };

    pub fn new(type_width: u8, length_width: u8) -> Result<Self, DictionaryError> {
        if !matches!(type_width, 1 | 2 | 4) || length_width > 2 {
            return Err(DictionaryError::InvalidVendorFormat {
                type_width,
                length_width,
            });
        }
        Ok(VendorFormat {
            type_width,
            length_width,
        })
    }

    pub fn header_len(&self) -> usize {
        usize::from(self.type_width) + usize::from(self.length_width)
    }

    pub fn is_rfc(&self) -> bool {
        self.type_width == 1 && self.length_width == 1
    }

    /// Largest attribute number the type field can carry
    pub fn max_attr(&self) -> u32 {
        match self.type_width {
            1 => 0xff,
            2 => 0xffff,
            _ => ATTR_MAX,
        }
    }
}

impl Default for VendorFormat {
    fn default() -> Self {
        VendorFormat::RFC
    }
}

/// Structural role of a descriptor node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Leaf(ValueKind),
    /// Container of nested type-length-value sub-attributes
    Tlv,
    /// Vendor-Specific (26) envelope
    Vsa,
    /// Vendor namespace under a VSA; carries the vendor's field widths
    Vendor(VendorFormat),
    /// Extended-Vendor-Specific block inside an extended attribute
    Evs,
    /// RFC 6929 short extended attribute
    Extended,
    /// RFC 6929 long extended attribute (fragmentable)
    LongExtended,
}

impl AttrKind {
    pub fn is_structural(&self) -> bool {
        !matches!(self, AttrKind::Leaf(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttrKind::Leaf(_) => "leaf",
            AttrKind::Tlv => "tlv",
            AttrKind::Vsa => "vsa",
            AttrKind::Vendor(_) => "vendor",
            AttrKind::Evs => "evs",
            AttrKind::Extended => "extended",
            AttrKind::LongExtended => "long-extended",
        }
    }
}

/// One node of a resolved attribute descriptor tree
///
/// Nodes are immutable once built and shared through `Arc`; child nodes hold
/// their parent chain, the encoder walks it to materialise the TLV stack.
#[derive(Debug)]
pub struct AttrDef {
    /// Name for diagnostics only; never consulted for encoding
    pub name: String,
    /// Number within the parent namespace
    pub attr: u32,
    /// Enterprise number, 0 for IETF-space attributes
    pub vendor: u32,
    pub kind: AttrKind,
    pub flags: AttrFlags,
    /// Root is 0
    pub depth: u8,
    parent: Option<Arc<AttrDef>>,
}

impl AttrDef {
    fn root(name: &str, attr: u32, kind: AttrKind, flags: AttrFlags) -> Arc<AttrDef> {
        Arc::new(AttrDef {
            name: name.to_owned(),
            attr,
            vendor: 0,
            kind,
            flags,
            depth: 0,
            parent: None,
        })
    }

    fn child(
        parent: &Arc<AttrDef>,
        name: &str,
        attr: u32,
        vendor: u32,
        kind: AttrKind,
        mut flags: AttrFlags,
    ) -> Result<Arc<AttrDef>, DictionaryError> {
        let depth = usize::from(parent.depth) + 1;
        if depth > MAX_TLV_STACK {
            return Err(DictionaryError::TooDeep);
        }
        // Format flags are inherited: everything under a WiMAX vendor or a
        // long-extended root encodes in that outer format.
        flags.wimax |= parent.flags.wimax;
        flags.evs |= parent.flags.evs;
        flags.long_extended |= parent.flags.long_extended;
        Ok(Arc::new(AttrDef {
            name: name.to_owned(),
            attr,
            vendor,
            kind,
            flags,
            depth: depth as u8,
            parent: Some(parent.clone()),
        }))
    }

    pub fn parent(&self) -> Option<&Arc<AttrDef>> {
        self.parent.as_ref()
    }

    pub fn value_kind(&self) -> Option<ValueKind> {
        match self.kind {
            AttrKind::Leaf(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        !self.kind.is_structural()
    }
}

impl fmt::Display for AttrDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Registry of resolved descriptors with lookup by number
#[derive(Debug, Default)]
pub struct Dictionary {
    attrs: HashMap<(u32, u32), Arc<AttrDef>>,
    vendors: HashMap<u32, Arc<AttrDef>>,
    formats: HashMap<u32, VendorFormat>,
}

impl Dictionary {
    pub fn new() -> Self {
        Dictionary::default()
    }

    fn register(&mut self, def: &Arc<AttrDef>) {
        self.attrs
            .entry((def.vendor, def.attr))
            .or_insert_with(|| def.clone());
    }

    fn check_attr(attr: u32, max: u32) -> Result<(), DictionaryError> {
        if attr == 0 || attr > max {
            return Err(DictionaryError::AttrOutOfRange(attr, max));
        }
        Ok(())
    }

    /// Define a top-level IETF attribute.
    ///
    /// Numbers above 255 are legal for internal bookkeeping attributes; the
    /// encoder skips them.
    pub fn define_attribute(
        &mut self,
        name: &str,
        attr: u32,
        kind: ValueKind,
        flags: AttrFlags,
    ) -> Result<Arc<AttrDef>, DictionaryError> {
        Self::check_attr(attr, ATTR_MAX)?;
        let def = AttrDef::root(name, attr, AttrKind::Leaf(kind), flags);
        self.register(&def);
        Ok(def)
    }

    /// Define a top-level TLV container.
    pub fn define_tlv(&mut self, name: &str, attr: u32) -> Result<Arc<AttrDef>, DictionaryError> {
        Self::check_attr(attr, 255)?;
        let def = AttrDef::root(name, attr, AttrKind::Tlv, AttrFlags::default());
        self.register(&def);
        Ok(def)
    }

    /// Define a nested TLV container under `parent` (a vendor or TLV node).
    pub fn define_tlv_container(
        &mut self,
        parent: &Arc<AttrDef>,
        name: &str,
        attr: u32,
    ) -> Result<Arc<AttrDef>, DictionaryError> {
        if !matches!(parent.kind, AttrKind::Tlv | AttrKind::Vendor(_)) {
            return Err(DictionaryError::NotAContainer(parent.name.clone()));
        }
        Self::check_attr(attr, 255)?;
        let def = AttrDef::child(parent, name, attr, parent.vendor, AttrKind::Tlv, AttrFlags::default())?;
        self.register(&def);
        Ok(def)
    }

    /// Define a leaf sub-attribute under a TLV container.
    pub fn define_tlv_attribute(
        &mut self,
        parent: &Arc<AttrDef>,
        name: &str,
        attr: u32,
        kind: ValueKind,
        flags: AttrFlags,
    ) -> Result<Arc<AttrDef>, DictionaryError> {
        if !matches!(parent.kind, AttrKind::Tlv) {
            return Err(DictionaryError::NotAContainer(parent.name.clone()));
        }
        Self::check_attr(attr, 255)?;
        let def = AttrDef::child(parent, name, attr, parent.vendor, AttrKind::Leaf(kind), flags)?;
        self.register(&def);
        Ok(def)
    }

    /// Define a vendor namespace and its `Vendor-Specific` chain.
    ///
    /// Returns the vendor node; vendor attributes are defined against the
    /// enterprise number. Vendor 24757 (WiMAX) automatically encodes with
    /// the continuation-octet VSA format.
    pub fn define_vendor(
        &mut self,
        name: &str,
        pec: u32,
        format: VendorFormat,
    ) -> Result<Arc<AttrDef>, DictionaryError> {
        if self.vendors.contains_key(&pec) {
            return Err(DictionaryError::Duplicate(name.to_owned()));
        }
        let flags = AttrFlags {
            wimax: pec == VENDOR_WIMAX,
            ..AttrFlags::default()
        };
        let vsa = AttrDef::root("Vendor-Specific", u32::from(VENDOR_SPECIFIC), AttrKind::Vsa, flags);
        let vendor = AttrDef::child(&vsa, name, pec, pec, AttrKind::Vendor(format), flags)?;
        self.vendors.insert(pec, vendor.clone());
        self.formats.insert(pec, format);
        Ok(vendor)
    }

    /// Define a leaf attribute in a vendor's namespace.
    pub fn define_vendor_attribute(
        &mut self,
        pec: u32,
        name: &str,
        attr: u32,
        kind: ValueKind,
        flags: AttrFlags,
    ) -> Result<Arc<AttrDef>, DictionaryError> {
        let vendor = self
            .vendors
            .get(&pec)
            .cloned()
            .ok_or(DictionaryError::UnknownVendor(pec))?;
        let AttrKind::Vendor(format) = vendor.kind else {
            return Err(DictionaryError::NotAContainer(vendor.name.clone()));
        };
        Self::check_attr(attr, format.max_attr())?;
        let def = AttrDef::child(&vendor, name, attr, pec, AttrKind::Leaf(kind), flags)?;
        self.register(&def);
        Ok(def)
    }

    /// Define a TLV container in a vendor's namespace.
    pub fn define_vendor_tlv(
        &mut self,
        pec: u32,
        name: &str,
        attr: u32,
    ) -> Result<Arc<AttrDef>, DictionaryError> {
        let vendor = self
            .vendors
            .get(&pec)
            .cloned()
            .ok_or(DictionaryError::UnknownVendor(pec))?;
        self.define_tlv_container(&vendor, name, attr)
    }

    /// Define an RFC 6929 extended attribute root (241..244 short,
    /// 245..246 long).
    pub fn define_extended(
        &mut self,
        name: &str,
        attr: u32,
        long: bool,
    ) -> Result<Arc<AttrDef>, DictionaryError> {
        Self::check_attr(attr, 255)?;
        let kind = if long {
            AttrKind::LongExtended
        } else {
            AttrKind::Extended
        };
        let flags = AttrFlags {
            long_extended: long,
            ..AttrFlags::default()
        };
        let def = AttrDef::root(name, attr, kind, flags);
        self.register(&def);
        Ok(def)
    }

    /// Define a leaf directly under an extended attribute root.
    pub fn define_extended_attribute(
        &mut self,
        ext: &Arc<AttrDef>,
        name: &str,
        attr: u32,
        kind: ValueKind,
        flags: AttrFlags,
    ) -> Result<Arc<AttrDef>, DictionaryError> {
        if !matches!(ext.kind, AttrKind::Extended | AttrKind::LongExtended) {
            return Err(DictionaryError::NotAContainer(ext.name.clone()));
        }
        Self::check_attr(attr, 255)?;
        let def = AttrDef::child(ext, name, attr, 0, AttrKind::Leaf(kind), flags)?;
        self.register(&def);
        Ok(def)
    }

    /// Define an Extended-Vendor-Specific block under an extended root.
    ///
    /// Returns the vendor node EVS attributes are defined against.
    pub fn define_evs(
        &mut self,
        ext: &Arc<AttrDef>,
        name: &str,
        pec: u32,
    ) -> Result<Arc<AttrDef>, DictionaryError> {
        if !matches!(ext.kind, AttrKind::Extended | AttrKind::LongExtended) {
            return Err(DictionaryError::NotAContainer(ext.name.clone()));
        }
        let flags = AttrFlags {
            evs: true,
            ..AttrFlags::default()
        };
        let evs = AttrDef::child(ext, "Extended-Vendor-Specific", u32::from(VENDOR_SPECIFIC), 0, AttrKind::Evs, flags)?;
        let vendor = AttrDef::child(&evs, name, pec, pec, AttrKind::Vendor(VendorFormat::RFC), flags)?;
        Ok(vendor)
    }

    /// Define a leaf inside an Extended-Vendor-Specific block.
    pub fn define_evs_attribute(
        &mut self,
        evs_vendor: &Arc<AttrDef>,
        name: &str,
        attr: u32,
        kind: ValueKind,
        flags: AttrFlags,
    ) -> Result<Arc<AttrDef>, DictionaryError> {
        if !matches!(evs_vendor.kind, AttrKind::Vendor(_)) || !evs_vendor.flags.evs {
            return Err(DictionaryError::NotAContainer(evs_vendor.name.clone()));
        }
        Self::check_attr(attr, 255)?;
        let def = AttrDef::child(evs_vendor, name, attr, evs_vendor.vendor, AttrKind::Leaf(kind), flags)?;
        self.register(&def);
        Ok(def)
    }

    /// Look up a descriptor by `(vendor, attribute)` number.
    pub fn find(&self, vendor: u32, attr: u32) -> Option<&Arc<AttrDef>> {
        self.attrs.get(&(vendor, attr))
    }

    /// Wire format of a vendor's VSA payload.
    pub fn vendor_format(&self, pec: u32) -> Option<VendorFormat> {
        self.formats.get(&pec).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_format_validation() {
        assert!(VendorFormat::new(1, 0).is_ok());
        assert!(VendorFormat::new(2, 2).is_ok());
        assert!(VendorFormat::new(4, 1).is_ok());
        assert!(VendorFormat::new(3, 1).is_err());
        assert!(VendorFormat::new(1, 3).is_err());
    }

    #[test]
    fn test_rfc_attribute_depth() {
        let mut dict = Dictionary::new();
        let def = dict
            .define_attribute("User-Name", 1, ValueKind::String, AttrFlags::default())
            .unwrap();
        assert_eq!(def.depth, 0);
        assert_eq!(def.vendor, 0);
        assert!(def.is_leaf());
    }

    #[test]
    fn test_vendor_chain_shape() {
        let mut dict = Dictionary::new();
        dict.define_vendor("Cisco", 9, VendorFormat::RFC).unwrap();
        let avpair = dict
            .define_vendor_attribute(9, "Cisco-AVPair", 1, ValueKind::String, AttrFlags::default())
            .unwrap();

        assert_eq!(avpair.depth, 2);
        assert_eq!(avpair.vendor, 9);
        let vendor = avpair.parent().unwrap();
        assert_eq!(vendor.attr, 9);
        assert!(matches!(vendor.kind, AttrKind::Vendor(f) if f.is_rfc()));
        let vsa = vendor.parent().unwrap();
        assert_eq!(vsa.attr, u32::from(VENDOR_SPECIFIC));
        assert!(matches!(vsa.kind, AttrKind::Vsa));
    }

    #[test]
    fn test_wimax_flag_propagates() {
        let mut dict = Dictionary::new();
        dict.define_vendor("WiMAX", VENDOR_WIMAX, VendorFormat::RFC)
            .unwrap();
        let def = dict
            .define_vendor_attribute(
                VENDOR_WIMAX,
                "WiMAX-Capability",
                1,
                ValueKind::Octets,
                AttrFlags::default(),
            )
            .unwrap();
        assert!(def.flags.wimax);
    }

    #[test]
    fn test_long_extended_flag_propagates() {
        let mut dict = Dictionary::new();
        let ext = dict.define_extended("Extended-Attribute-5", 245, true).unwrap();
        let leaf = dict
            .define_extended_attribute(&ext, "Frag-Data", 1, ValueKind::Octets, AttrFlags::default())
            .unwrap();
        assert!(leaf.flags.long_extended);

        let evs_vendor = dict.define_evs(&ext, "Example-EVS", 32473).unwrap();
        let evs_leaf = dict
            .define_evs_attribute(&evs_vendor, "Example-Data", 1, ValueKind::Octets, AttrFlags::default())
            .unwrap();
        assert!(evs_leaf.flags.long_extended);
        assert!(evs_leaf.flags.evs);
        assert_eq!(evs_leaf.depth, 3);
    }

    #[test]
    fn test_vendor_attr_range_follows_type_width() {
        let mut dict = Dictionary::new();
        dict.define_vendor("USR", 429, VendorFormat::new(4, 0).unwrap())
            .unwrap();
        assert!(dict
            .define_vendor_attribute(429, "USR-Big", 0x00c8_0000 - 1, ValueKind::Integer, AttrFlags::default())
            .is_ok());

        dict.define_vendor("Narrow", 6001, VendorFormat::RFC).unwrap();
        assert!(matches!(
            dict.define_vendor_attribute(6001, "Too-Big", 300, ValueKind::Integer, AttrFlags::default()),
            Err(DictionaryError::AttrOutOfRange(300, 255))
        ));
    }

    #[test]
    fn test_nesting_depth_limit() {
        let mut dict = Dictionary::new();
        dict.define_vendor("Deep", 6002, VendorFormat::RFC).unwrap();
        let mut parent = dict.define_vendor_tlv(6002, "Deep-Tlv-1", 1).unwrap();
        let mut outcome = Ok(());
        for i in 0..MAX_TLV_STACK {
            match dict.define_tlv_container(&parent, &format!("Deep-Tlv-{}", i + 2), 1) {
                Ok(def) => parent = def,
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }
        assert!(matches!(outcome, Err(DictionaryError::TooDeep)));
    }

    #[test]
    fn test_lookup_by_number() {
        let mut dict = Dictionary::new();
        dict.define_attribute("User-Name", 1, ValueKind::String, AttrFlags::default())
            .unwrap();
        dict.define_vendor("Cisco", 9, VendorFormat::RFC).unwrap();
        dict.define_vendor_attribute(9, "Cisco-AVPair", 1, ValueKind::String, AttrFlags::default())
            .unwrap();

        assert_eq!(dict.find(0, 1).unwrap().name, "User-Name");
        assert_eq!(dict.find(9, 1).unwrap().name, "Cisco-AVPair");
        assert!(dict.find(9, 2).is_none());
        assert_eq!(dict.vendor_format(9), Some(VendorFormat::RFC));
        assert_eq!(dict.vendor_format(10), None);
    }

    #[test]
    fn test_duplicate_vendor_rejected() {
        let mut dict = Dictionary::new();
        dict.define_vendor("Cisco", 9, VendorFormat::RFC).unwrap();
        assert!(matches!(
            dict.define_vendor("Cisco", 9, VendorFormat::RFC),
            Err(DictionaryError::Duplicate(_))
        ));
    }
}
