//! Collaborator store traits and identifier newtypes.
//!
//! The engine never owns persistence. It talks to three narrow seams:
//! an [`AssetStore`] for image bytes and registration, a [`GroupStore`] for
//! group membership and the persisted canonical-ratio override, and a
//! [`ReferenceStore`] for the records that point at assets. Production
//! backends and test fakes implement the same traits.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ratio::RatioKey;
use crate::transform::Provenance;

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

id_newtype!(
    /// Opaque identifier of a stored image asset.
    AssetId
);
id_newtype!(
    /// Opaque identifier of a group (the membership scope for a canonical ratio).
    GroupId
);
id_newtype!(
    /// Opaque identifier of a record that points at an image asset.
    EntityId
);

/// On-disk encoding of an asset, as far as this engine cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AssetFormat {
    Jpeg,
    Png,
    /// Decodable but not one of the formats we re-encode to.
    #[default]
    Other,
}

/// Dimensions and format of a stored asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAssetInfo {
    /// Width in pixels. Zero means the store could not measure the asset.
    pub width: u32,
    /// Height in pixels. Zero means the store could not measure the asset.
    pub height: u32,
    pub format: AssetFormat,
}

/// Failures surfaced by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown group: {0}")]
    UnknownGroup(GroupId),

    #[error("unknown asset: {0}")]
    UnknownAsset(AssetId),

    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Read and register image assets. Sources are never mutated through this
/// trait; the only write is registering a new derived asset.
pub trait AssetStore {
    /// Raw encoded bytes of the asset.
    fn read_bytes(&self, asset: &AssetId) -> Result<Vec<u8>, StoreError>;

    /// Dimensions and format of the asset.
    fn asset_info(&self, asset: &AssetId) -> Result<ImageAssetInfo, StoreError>;

    /// Register a new derived asset. `name` is the deterministic derived
    /// filename; registering the same name twice must return the existing id
    /// rather than duplicating the asset.
    fn create_asset(
        &mut self,
        name: &str,
        bytes: Vec<u8>,
        format: AssetFormat,
        provenance: &Provenance,
    ) -> Result<AssetId, StoreError>;

    /// Copy descriptive metadata (alt text, title) from one asset to another.
    fn copy_descriptive_metadata(&mut self, from: &AssetId, to: &AssetId)
        -> Result<(), StoreError>;
}

/// Group membership and the persisted canonical-ratio override.
pub trait GroupStore {
    /// All group ids, for worklist scans.
    fn group_ids(&self) -> Result<Vec<GroupId>, StoreError>;

    /// Human-readable group name, used only for worklist ordering.
    fn display_name(&self, group: &GroupId) -> Result<String, StoreError>;

    /// Member assets of the group, derived from its referencing entities.
    fn members_of(&self, group: &GroupId) -> Result<Vec<AssetId>, StoreError>;

    fn canonical_ratio_override(&self, group: &GroupId) -> Result<Option<RatioKey>, StoreError>;

    fn set_canonical_ratio_override(
        &mut self,
        group: &GroupId,
        ratio: RatioKey,
    ) -> Result<(), StoreError>;
}

/// The records pointing at assets, scoped per group.
pub trait ReferenceStore {
    /// Entities inside `group` whose pointer is `asset`.
    fn referencing_entities(
        &self,
        asset: &AssetId,
        group: &GroupId,
    ) -> Result<Vec<EntityId>, StoreError>;

    /// Current asset pointer of an entity.
    fn asset_pointer(&self, entity: &EntityId) -> Result<AssetId, StoreError>;

    /// Set the pointer; returns whether the stored value actually changed.
    fn set_asset_pointer(&mut self, entity: &EntityId, asset: &AssetId)
        -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_roundtrip() {
        let id = AssetId::new("img-42");
        assert_eq!(id.as_str(), "img-42");
        assert_eq!(id.to_string(), "img-42");
        assert_eq!(AssetId::from("img-42"), id);
    }

    #[test]
    fn test_ids_are_distinct_types() {
        // Compile-time property really, but keep the constructors covered.
        let group = GroupId::new("g1");
        let entity = EntityId::new("g1");
        assert_eq!(group.as_str(), entity.as_str());
    }
}
