//! Supported bed models.
//!
//! Every supported controller is described by a [`ModelDescriptor`]: its
//! command table, the characteristic commands are written to, the reads
//! needed after connecting to unlock control, the optional no-op used for
//! keepalive, and (for controllers without position telemetry) the motion
//! profile used to estimate actuator positions.
//!
//! A single [`ConnectionEngine`](crate::ConnectionEngine) drives all of
//! them; nothing here performs I/O.
//!
//! The payloads were captured from the vendors' control apps and must stay
//! bit-exact.
//!
//! | Model | Address | Write attribute | Keepalive | Derived state |
//! |-------|---------|-----------------|-----------|---------------|
//! | `serta` | public | handle `0x0020` | - | - |
//! | `jiecang` | public | UUID `ff01` | - | - |
//! | `dewertokin` | random | handle `0x0013` | `Keepalive NOOP` | - |
//! | `dewertokin-old` | public | handle `0x0013` | - | - |
//! | `linak` | random | handle `0x000e` | - | head/foot/light |

use crate::address::AddressType;
use crate::codec::CommandTable;
use crate::traits::AttributeId;
use crate::tracker::{Axis, Effect, MotionProfile, Switch};

/// A supported bed controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BedModel {
    /// Serta Motion Perfect III.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "serta"))]
    Serta,
    /// Jiecang controller (memory presets only).
    #[cfg_attr(feature = "serde", serde(rename = "jiecang"))]
    Jiecang,
    /// DewertOkin HE150, as fitted to A.H. Beard bases.
    #[cfg_attr(feature = "serde", serde(rename = "dewertokin"))]
    DewertOkin,
    /// Older DewertOkin protocol (HankookGallery bases).
    #[cfg_attr(feature = "serde", serde(rename = "dewertokin-old"))]
    DewertOkinOld,
    /// Linak bed base.
    #[cfg_attr(feature = "serde", serde(rename = "linak"))]
    Linak,
}

impl BedModel {
    /// Every supported model.
    pub const ALL: [BedModel; 5] = [
        BedModel::Serta,
        BedModel::Jiecang,
        BedModel::DewertOkin,
        BedModel::DewertOkinOld,
        BedModel::Linak,
    ];

    /// Config/CLI identifier of the model.
    ///
    /// ```
    /// use mqtt_bed::BedModel;
    ///
    /// assert_eq!(BedModel::DewertOkinOld.as_str(), "dewertokin-old");
    /// ```
    pub const fn as_str(&self) -> &'static str {
        match self {
            BedModel::Serta => "serta",
            BedModel::Jiecang => "jiecang",
            BedModel::DewertOkin => "dewertokin",
            BedModel::DewertOkinOld => "dewertokin-old",
            BedModel::Linak => "linak",
        }
    }

    /// Parse a model identifier (trimmed, case-insensitive, `_` or `-`).
    ///
    /// ```
    /// use mqtt_bed::BedModel;
    ///
    /// assert_eq!(BedModel::from_text("Linak"), Some(BedModel::Linak));
    /// assert_eq!(BedModel::from_text("dewertokin_old"), Some(BedModel::DewertOkinOld));
    /// assert_eq!(BedModel::from_text("tempur"), None);
    /// ```
    pub fn from_text(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "serta" => Some(BedModel::Serta),
            "jiecang" => Some(BedModel::Jiecang),
            "dewertokin" | "okin" => Some(BedModel::DewertOkin),
            "dewertokin-old" => Some(BedModel::DewertOkinOld),
            "linak" => Some(BedModel::Linak),
            _ => None,
        }
    }

    /// Static descriptor for the model.
    pub fn descriptor(&self) -> &'static ModelDescriptor {
        match self {
            BedModel::Serta => &SERTA,
            BedModel::Jiecang => &JIECANG,
            BedModel::DewertOkin => &DEWERTOKIN,
            BedModel::DewertOkinOld => &DEWERTOKIN_OLD,
            BedModel::Linak => &LINAK,
        }
    }
}

/// Everything the engine needs to know about one controller model.
#[derive(Debug)]
pub struct ModelDescriptor {
    /// Which model this describes.
    pub model: BedModel,
    /// Manufacturer name, for logs and discovery metadata.
    pub manufacturer: &'static str,
    /// Product name, for logs and discovery metadata.
    pub product: &'static str,
    /// Addressing mode the controller advertises.
    pub address_type: AddressType,
    /// Characteristic every command payload is written to.
    pub write_attribute: AttributeId,
    /// Whether writes wait for an ATT write response.
    pub write_with_response: bool,
    /// Characteristics read once after connecting to enable control.
    pub enable_control: &'static [AttributeId],
    /// Command whose payload has no physical effect, used for keepalive.
    pub keepalive: Option<&'static str>,
    /// `(name, payload)` pairs.
    pub commands: &'static [(&'static str, &'static [u8])],
    /// Position estimation for controllers without telemetry.
    pub motion: Option<&'static MotionProfile>,
}

impl ModelDescriptor {
    /// Build the lookup table for this model.
    pub fn command_table(&self) -> CommandTable {
        CommandTable::new(self.commands)
    }
}

// ============================================================================
// Serta
// ============================================================================

const SERTA_COMMANDS: &[(&str, &[u8])] = &[
    ("Flat Preset", &[0xE5, 0xFE, 0x16, 0x00, 0x00, 0x00, 0x08, 0xFE]),
    ("ZeroG Preset", &[0xE5, 0xFE, 0x16, 0x00, 0x10, 0x00, 0x00, 0xF6]),
    ("TV Preset", &[0xE5, 0xFE, 0x16, 0x00, 0x40, 0x00, 0x00, 0xC6]),
    ("Head Up Preset", &[0xE5, 0xFE, 0x16, 0x00, 0x80, 0x00, 0x00, 0x86]),
    ("Lounge Preset", &[0xE5, 0xFE, 0x16, 0x00, 0x20, 0x00, 0x00, 0xE6]),
    ("Massage Head Add", &[0xE5, 0xFE, 0x16, 0x00, 0x08, 0x00, 0x00, 0xFE]),
    ("Massage Head Min", &[0xE5, 0xFE, 0x16, 0x00, 0x00, 0x80, 0x00, 0x86]),
    ("Massage Foot Add", &[0xE5, 0xFE, 0x16, 0x00, 0x04, 0x00, 0x00, 0x02]),
    ("Massage Foot Min", &[0xE5, 0xFE, 0x16, 0x00, 0x00, 0x00, 0x01, 0x05]),
    ("Head and Foot Massage On", &[0xE5, 0xFE, 0x16, 0x00, 0x01, 0x00, 0x00, 0x05]),
    ("Massage Timer", &[0xE5, 0xFE, 0x16, 0x00, 0x02, 0x00, 0x00, 0x04]),
    ("Lift Head", &[0xE5, 0xFE, 0x16, 0x01, 0x00, 0x00, 0x00, 0x05]),
    ("Lower Head", &[0xE5, 0xFE, 0x16, 0x02, 0x00, 0x00, 0x00, 0x04]),
    ("Lift Foot", &[0xE5, 0xFE, 0x16, 0x04, 0x00, 0x00, 0x00, 0x02]),
    ("Lower Foot", &[0xE5, 0xFE, 0x16, 0x08, 0x00, 0x00, 0x00, 0xFE]),
];

static SERTA: ModelDescriptor = ModelDescriptor {
    model: BedModel::Serta,
    manufacturer: "Serta",
    product: "Motion Perfect III",
    address_type: AddressType::Public,
    write_attribute: AttributeId::Handle(0x0020),
    write_with_response: true,
    enable_control: &[],
    keepalive: None,
    commands: SERTA_COMMANDS,
    motion: None,
};

// ============================================================================
// Jiecang
// ============================================================================

const JIECANG_COMMANDS: &[(&str, &[u8])] = &[
    ("Memory 1", &[0xF1, 0xF1, 0x0B, 0x01, 0x01, 0x0D, 0x7E]),
    ("Memory 2", &[0xF1, 0xF1, 0x0D, 0x01, 0x01, 0x0F, 0x7E]),
    ("Flat", &[0xF1, 0xF1, 0x08, 0x01, 0x01, 0x0A, 0x7E]),
    ("Zero G", &[0xF1, 0xF1, 0x07, 0x01, 0x01, 0x09, 0x7E]),
];

static JIECANG: ModelDescriptor = ModelDescriptor {
    model: BedModel::Jiecang,
    manufacturer: "Jiecang",
    product: "Jiecang",
    address_type: AddressType::Public,
    write_attribute: AttributeId::Uuid("0000ff01-0000-1000-8000-00805f9b34fb"),
    write_with_response: false,
    enable_control: &[],
    keepalive: None,
    commands: JIECANG_COMMANDS,
    motion: None,
};

// ============================================================================
// DewertOkin
// ============================================================================

const DEWERTOKIN_COMMANDS: &[(&str, &[u8])] = &[
    ("Flat Preset", &[0x04, 0x02, 0x10, 0x00, 0x00, 0x00]),
    ("ZeroG Preset", &[0x04, 0x02, 0x00, 0x00, 0x40, 0x00]),
    ("TV Position", &[0x04, 0x02, 0x00, 0x00, 0x30, 0x00]),
    ("Quiet Sleep", &[0x04, 0x02, 0x00, 0x00, 0x80, 0x00]),
    ("Memory 1", &[0x04, 0x02, 0x00, 0x00, 0x10, 0x00]),
    ("Memory 2", &[0x04, 0x02, 0x00, 0x00, 0x20, 0x00]),
    ("Underlight", &[0x04, 0x02, 0x00, 0x02, 0x00, 0x00]),
    ("Lift Head", &[0x04, 0x02, 0x00, 0x00, 0x00, 0x01]),
    ("Lower Head", &[0x04, 0x02, 0x00, 0x00, 0x00, 0x02]),
    ("Lift Foot", &[0x04, 0x02, 0x00, 0x00, 0x00, 0x04]),
    ("Lower Foot", &[0x04, 0x02, 0x00, 0x00, 0x00, 0x08]),
    // Cycles high, medium, low, off.
    ("Wave Massage Cycle", &[0x04, 0x02, 0x80, 0x00, 0x00, 0x00]),
    // Cycles low, medium, high, off.
    ("Head Massage Cycle", &[0x04, 0x02, 0x00, 0x00, 0x08, 0x00]),
    ("Foot Massage Cycle", &[0x04, 0x02, 0x00, 0x40, 0x00, 0x00]),
    ("Massage Off", &[0x04, 0x02, 0x02, 0x00, 0x00, 0x00]),
    ("Keepalive NOOP", &[0x04, 0x02, 0x00, 0x00, 0x00, 0x00]),
];

const DEWERTOKIN_ENABLE_CONTROL: &[AttributeId] =
    &[AttributeId::Handle(0x001E), AttributeId::Handle(0x0020)];

static DEWERTOKIN: ModelDescriptor = ModelDescriptor {
    model: BedModel::DewertOkin,
    manufacturer: "DewertOkin",
    product: "A H Beard",
    address_type: AddressType::Random,
    write_attribute: AttributeId::Handle(0x0013),
    write_with_response: true,
    enable_control: DEWERTOKIN_ENABLE_CONTROL,
    keepalive: Some("Keepalive NOOP"),
    commands: DEWERTOKIN_COMMANDS,
    motion: None,
};

const DEWERTOKIN_OLD_COMMANDS: &[(&str, &[u8])] = &[
    ("Flat Preset", &[0xE5, 0xFE, 0x16, 0x01, 0x00, 0x00, 0x02, 0x03]),
    ("ZeroG Preset", &[0xE5, 0xFE, 0x16, 0x01, 0x00, 0x00, 0x01, 0x04]),
    ("Memory 1", &[0xE5, 0xFE, 0x16, 0x01, 0x00, 0x00, 0x08, 0xFD]),
    ("Memory 2", &[0xE5, 0xFE, 0x16, 0x01, 0x00, 0x00, 0x09, 0xFC]),
];

static DEWERTOKIN_OLD: ModelDescriptor = ModelDescriptor {
    model: BedModel::DewertOkinOld,
    manufacturer: "DewertOkin",
    product: "HankookGallery",
    address_type: AddressType::Public,
    write_attribute: AttributeId::Handle(0x0013),
    write_with_response: true,
    enable_control: DEWERTOKIN_ENABLE_CONTROL,
    keepalive: None,
    commands: DEWERTOKIN_OLD_COMMANDS,
    motion: None,
};

// ============================================================================
// Linak
// ============================================================================

const LINAK_COMMANDS: &[(&str, &[u8])] = &[
    ("Head Up", &[0x0B, 0x00]),
    ("Head Down", &[0x0A, 0x00]),
    ("Feet Up", &[0x09, 0x00]),
    ("Feet Down", &[0x08, 0x00]),
    ("Both Up", &[0x01, 0x00]),
    ("Both Down", &[0x00, 0x00]),
    ("Light", &[0x94, 0x00]),
];

/// One button press moves the head actuator 1/85 and the foot actuator
/// 1/60 of full travel.
const LINAK_MOTION: MotionProfile = MotionProfile {
    head_steps: 85,
    foot_steps: 60,
    effects: &[
        ("Head Up", &[Effect::Raise(Axis::Head)]),
        ("Head Down", &[Effect::Lower(Axis::Head)]),
        ("Feet Up", &[Effect::Raise(Axis::Foot)]),
        ("Feet Down", &[Effect::Lower(Axis::Foot)]),
        ("Both Up", &[Effect::Raise(Axis::Head), Effect::Raise(Axis::Foot)]),
        ("Both Down", &[Effect::Lower(Axis::Head), Effect::Lower(Axis::Foot)]),
        ("Light", &[Effect::Toggle(Switch::Light)]),
    ],
};

static LINAK: ModelDescriptor = ModelDescriptor {
    model: BedModel::Linak,
    manufacturer: "Linak",
    product: "Linak",
    address_type: AddressType::Random,
    write_attribute: AttributeId::Handle(0x000E),
    write_with_response: false,
    enable_control: &[AttributeId::Handle(0x000D)],
    keepalive: None,
    commands: LINAK_COMMANDS,
    motion: Some(&LINAK_MOTION),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_round_trips_through_text() {
        for model in BedModel::ALL {
            assert_eq!(BedModel::from_text(model.as_str()), Some(model));
            assert_eq!(model.descriptor().model, model);
        }
    }

    #[test]
    fn every_table_has_uniform_width() {
        let widths: Vec<_> = BedModel::ALL
            .iter()
            .map(|m| m.descriptor().command_table().payload_width())
            .collect();
        assert_eq!(widths, [Some(8), Some(7), Some(6), Some(8), Some(2)]);
    }

    #[test]
    fn keepalive_resolves_in_own_table() {
        for model in BedModel::ALL {
            let desc = model.descriptor();
            if let Some(name) = desc.keepalive {
                assert!(desc.command_table().contains(name), "{name} missing for {model:?}");
            }
        }
    }

    #[test]
    fn dewertokin_keepalive_is_noop_payload() {
        let table = BedModel::DewertOkin.descriptor().command_table();
        assert_eq!(
            table.lookup("Keepalive NOOP"),
            Some(&[0x04, 0x02, 0x00, 0x00, 0x00, 0x00][..])
        );
    }

    #[test]
    fn motion_effects_name_real_commands() {
        for model in BedModel::ALL {
            let desc = model.descriptor();
            let Some(motion) = desc.motion else { continue };
            let table = desc.command_table();
            for (name, _) in motion.effects {
                assert!(table.contains(name), "{name} missing for {model:?}");
            }
        }
    }

    #[test]
    fn serta_payloads_match_capture() {
        let table = BedModel::Serta.descriptor().command_table();
        assert_eq!(hex::encode(table.lookup("Flat Preset").unwrap()), "e5fe1600000008fe");
        assert_eq!(hex::encode(table.lookup("Lower Foot").unwrap()), "e5fe1608000000fe");
        assert_eq!(table.lookup("lower_headboard_fast"), None);
    }

    #[test]
    fn jiecang_writes_by_uuid_without_response() {
        let desc = BedModel::Jiecang.descriptor();
        assert_eq!(
            desc.write_attribute,
            AttributeId::Uuid("0000ff01-0000-1000-8000-00805f9b34fb")
        );
        assert!(!desc.write_with_response);
        assert_eq!(
            hex::encode(desc.command_table().lookup("Zero G").unwrap()),
            "f1f1070101097e"
        );
    }

    #[test]
    fn dewertokin_old_payloads_match_capture() {
        let table = BedModel::DewertOkinOld.descriptor().command_table();
        assert_eq!(hex::encode(table.lookup("Memory 1").unwrap()), "e5fe1601000008fd");
    }

    #[test]
    fn address_types() {
        assert_eq!(BedModel::Serta.descriptor().address_type, AddressType::Public);
        assert_eq!(BedModel::DewertOkin.descriptor().address_type, AddressType::Random);
        assert_eq!(BedModel::DewertOkinOld.descriptor().address_type, AddressType::Public);
        assert_eq!(BedModel::Linak.descriptor().address_type, AddressType::Random);
    }
}
