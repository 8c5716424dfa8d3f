//! Module kinds
//!
//! [`ModuleKind`] is the closed set of deployable module types. Its numeric
//! tags match the on-chain `moduleType()` numbering and are persisted, so
//! they are never renumbered; new kinds take the next free tag.

use std::fmt::{self, Display, Formatter};

/// Deployable module type
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum ModuleKind {
    /// Delegates by origin domain
    Routing = 1,
    /// m-of-n over child modules
    Aggregation = 2,
    /// Multisig over a merkle root checkpoint
    MerkleRootMultisig = 4,
    /// Multisig over a message id checkpoint
    MessageIdMultisig = 5,
    /// Native-bridge verification (OP Stack)
    OpStack = 6,
    /// Accepts everything
    Null = 7,
}

impl ModuleKind {
    /// All kinds in tag order
    pub const ALL: [ModuleKind; 6] = [
        ModuleKind::Routing,
        ModuleKind::Aggregation,
        ModuleKind::MerkleRootMultisig,
        ModuleKind::MessageIdMultisig,
        ModuleKind::OpStack,
        ModuleKind::Null,
    ];

    /// Stable numeric tag
    #[inline]
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Name used as the `type` field of the serialized form
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ModuleKind::Routing => "routing",
            ModuleKind::Aggregation => "aggregation",
            ModuleKind::MerkleRootMultisig => "merkleRootMultisig",
            ModuleKind::MessageIdMultisig => "messageIdMultisig",
            ModuleKind::OpStack => "opStack",
            ModuleKind::Null => "null",
        }
    }

    /// Kind whose serialized `type` name is `name`
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Whether this is one of the multisig kinds
    #[inline]
    #[must_use]
    pub const fn is_multisig(self) -> bool {
        matches!(
            self,
            ModuleKind::MerkleRootMultisig | ModuleKind::MessageIdMultisig
        )
    }
}

impl Display for ModuleKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<ModuleKind> for u8 {
    fn from(kind: ModuleKind) -> Self {
        kind.tag()
    }
}

impl TryFrom<u8> for ModuleKind {
    type Error = KindError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(ModuleKind::Routing),
            2 => Ok(ModuleKind::Aggregation),
            4 => Ok(ModuleKind::MerkleRootMultisig),
            5 => Ok(ModuleKind::MessageIdMultisig),
            6 => Ok(ModuleKind::OpStack),
            7 => Ok(ModuleKind::Null),
            0 | 3 => Err(KindError::Retired(tag)),
            other => Err(KindError::Unknown(other)),
        }
    }
}

/// Errors decoding a module kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KindError {
    /// Tag belongs to a kind that is no longer deployable
    #[error("module kind tag {0} is retired")]
    Retired(u8),

    /// Tag was never assigned
    #[error("unknown module kind tag {0}")]
    Unknown(u8),
}

/// Which checkpoint a multisig module verifies against
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum RootMode {
    /// Validators sign merkle roots
    MerkleRoot,
    /// Validators sign message ids
    #[default]
    MessageId,
}

impl RootMode {
    /// Module kind deployed for this mode
    #[inline]
    #[must_use]
    pub const fn kind(self) -> ModuleKind {
        match self {
            RootMode::MerkleRoot => ModuleKind::MerkleRootMultisig,
            RootMode::MessageId => ModuleKind::MessageIdMultisig,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_stable() {
        let tags: Vec<u8> = ModuleKind::ALL.iter().map(|k| k.tag()).collect();
        assert_eq!(tags, vec![1, 2, 4, 5, 6, 7]);
    }

    #[test]
    fn tag_roundtrip() {
        for kind in ModuleKind::ALL {
            assert_eq!(ModuleKind::try_from(kind.tag()), Ok(kind));
        }
    }

    #[test]
    fn retired_and_unknown_tags_rejected() {
        assert_eq!(ModuleKind::try_from(0), Err(KindError::Retired(0)));
        assert_eq!(ModuleKind::try_from(3), Err(KindError::Retired(3)));
        assert_eq!(ModuleKind::try_from(42), Err(KindError::Unknown(42)));
    }

    #[test]
    fn kind_serializes_as_number() {
        let json = serde_json::to_string(&ModuleKind::MessageIdMultisig).unwrap();
        assert_eq!(json, "5");
        assert!(serde_json::from_str::<ModuleKind>("3").is_err());
    }

    #[test]
    fn names_resolve_to_kinds() {
        for kind in ModuleKind::ALL {
            assert_eq!(ModuleKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ModuleKind::from_name("legacyMultisig"), None);
        assert_eq!(ModuleKind::from_name("Routing"), None);
    }

    #[test]
    fn root_mode_selects_kind() {
        assert_eq!(RootMode::MerkleRoot.kind(), ModuleKind::MerkleRootMultisig);
        assert_eq!(RootMode::MessageId.kind(), ModuleKind::MessageIdMultisig);
    }
}
