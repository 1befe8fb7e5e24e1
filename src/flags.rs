//! Field kind and flag-bit representations.
//!
//! `FieldKind` is the interpreted type of a field (spec §3.1); `FieldFlags`
//! mirrors the PDF field-flag integer's individual bits (the `/Ff` entry) as
//! a bitset, the way the teacher's dependency stack models PDF bit flags
//! (`bitflags`, already pulled in by `acroform-pdf`'s `FieldDictionary`).

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Text,
    Checkbox,
    Radio,
    Dropdown,
    Listbox,
    Signature,
    Pushbutton,
    Unknown,
}

impl FieldKind {
    /// Maps to the fixed database-type vocabulary used by the `_database_ready.csv` output (spec §6.2).
    pub fn database_type(self) -> &'static str {
        match self {
            FieldKind::Text => "TextField",
            FieldKind::Checkbox => "Checkbox",
            FieldKind::Radio => "RadioButton",
            FieldKind::Dropdown | FieldKind::Listbox => "Choice",
            FieldKind::Signature => "Signature",
            FieldKind::Pushbutton => "Button",
            FieldKind::Unknown => "TextField",
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FieldFlags: u32 {
        const READONLY        = 1 << 0;
        const REQUIRED         = 1 << 1;
        const NO_EXPORT        = 1 << 2;
        const MULTILINE        = 1 << 3;
        const PASSWORD         = 1 << 4;
        const RADIO_BEHAVIOR   = 1 << 5;
        const PUSHBUTTON       = 1 << 6;
        const COMBO            = 1 << 7;
    }
}

impl FieldFlags {
    /// Field-flag bit positions as defined by the PDF specification's `/Ff` entry (1-based, per spec).
    const BIT_READONLY: u32 = 1;
    const BIT_REQUIRED: u32 = 1 << 1;
    const BIT_NO_EXPORT: u32 = 1 << 2;
    const BIT_RADIO: u32 = 1 << 15;
    const BIT_PUSHBUTTON: u32 = 1 << 16;
    const BIT_COMBO: u32 = 1 << 17;
    const BIT_MULTILINE: u32 = 1 << 12;
    const BIT_PASSWORD: u32 = 1 << 13;

    /// Decode a raw PDF `/Ff` integer into the crate's flag bitset.
    pub fn from_raw(ff: u32) -> Self {
        let mut out = FieldFlags::empty();
        out.set(FieldFlags::READONLY, ff & Self::BIT_READONLY != 0);
        out.set(FieldFlags::REQUIRED, ff & Self::BIT_REQUIRED != 0);
        out.set(FieldFlags::NO_EXPORT, ff & Self::BIT_NO_EXPORT != 0);
        out.set(FieldFlags::MULTILINE, ff & Self::BIT_MULTILINE != 0);
        out.set(FieldFlags::PASSWORD, ff & Self::BIT_PASSWORD != 0);
        out.set(FieldFlags::RADIO_BEHAVIOR, ff & Self::BIT_RADIO != 0);
        out.set(FieldFlags::PUSHBUTTON, ff & Self::BIT_PUSHBUTTON != 0);
        out.set(FieldFlags::COMBO, ff & Self::BIT_COMBO != 0);
        out
    }

    pub fn is_radio(self) -> bool {
        self.contains(FieldFlags::RADIO_BEHAVIOR)
    }

    pub fn is_pushbutton(self) -> bool {
        self.contains(FieldFlags::PUSHBUTTON)
    }

    pub fn is_combo(self) -> bool {
        self.contains(FieldFlags::COMBO)
    }
}

impl Default for FieldFlags {
    fn default() -> Self {
        FieldFlags::empty()
    }
}

/// Flat, serializable view of [`FieldFlags`] used wherever a report needs
/// named booleans instead of a bitset (JSON reports, CSV reasoning columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFlagsView {
    pub readonly: bool,
    pub required: bool,
    pub no_export: bool,
    pub multiline: bool,
    pub password: bool,
    pub radio_behavior: bool,
    pub pushbutton: bool,
    pub combo: bool,
}

impl From<FieldFlags> for FieldFlagsView {
    fn from(flags: FieldFlags) -> Self {
        FieldFlagsView {
            readonly: flags.contains(FieldFlags::READONLY),
            required: flags.contains(FieldFlags::REQUIRED),
            no_export: flags.contains(FieldFlags::NO_EXPORT),
            multiline: flags.contains(FieldFlags::MULTILINE),
            password: flags.contains(FieldFlags::PASSWORD),
            radio_behavior: flags.contains(FieldFlags::RADIO_BEHAVIOR),
            pushbutton: flags.contains(FieldFlags::PUSHBUTTON),
            combo: flags.contains(FieldFlags::COMBO),
        }
    }
}
