//! Repointing referencing entities from a source asset to its derived asset.

use crate::stores::{AssetId, EntityId, GroupId, ReferenceStore};
use crate::NormalizeError;

/// Point every entity in `entities` at `derived`, skipping entities that
/// already point there. Returns the number of entities actually changed.
///
/// The entity list must already be scoped to `group` (it comes from
/// `ReferenceStore::referencing_entities`); entities in other groups that
/// reference the same source are deliberately untouched, so a shared source
/// never leaks a group-specific derived asset elsewhere.
pub fn repoint<R: ReferenceStore>(
    references: &mut R,
    group: &GroupId,
    source: &AssetId,
    derived: &AssetId,
    entities: &[EntityId],
) -> Result<u32, NormalizeError> {
    let mut changed = 0;
    for entity in entities {
        let current = references.asset_pointer(entity).map_err(|e| {
            NormalizeError::ReferenceUpdateFailed {
                entity: entity.clone(),
                reason: format!("reading pointer in group {group}: {e}"),
            }
        })?;
        if current == *derived {
            continue;
        }
        let did_change = references.set_asset_pointer(entity, derived).map_err(|e| {
            NormalizeError::ReferenceUpdateFailed {
                entity: entity.clone(),
                reason: format!("repointing {source} -> {derived} in group {group}: {e}"),
            }
        })?;
        if did_change {
            changed += 1;
        }
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::StoreError;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Pointers {
        map: HashMap<EntityId, AssetId>,
    }

    impl ReferenceStore for Pointers {
        fn referencing_entities(
            &self,
            asset: &AssetId,
            _group: &GroupId,
        ) -> Result<Vec<EntityId>, StoreError> {
            let mut ids: Vec<EntityId> = self
                .map
                .iter()
                .filter(|(_, a)| *a == asset)
                .map(|(e, _)| e.clone())
                .collect();
            ids.sort();
            Ok(ids)
        }

        fn asset_pointer(&self, entity: &EntityId) -> Result<AssetId, StoreError> {
            self.map
                .get(entity)
                .cloned()
                .ok_or_else(|| StoreError::UnknownEntity(entity.clone()))
        }

        fn set_asset_pointer(
            &mut self,
            entity: &EntityId,
            asset: &AssetId,
        ) -> Result<bool, StoreError> {
            match self.map.get_mut(entity) {
                Some(current) if current == asset => Ok(false),
                Some(current) => {
                    *current = asset.clone();
                    Ok(true)
                }
                None => Err(StoreError::UnknownEntity(entity.clone())),
            }
        }
    }

    fn pointers(pairs: &[(&str, &str)]) -> Pointers {
        Pointers {
            map: pairs
                .iter()
                .map(|(e, a)| (EntityId::from(*e), AssetId::from(*a)))
                .collect(),
        }
    }

    #[test]
    fn test_repoint_changes_and_counts() {
        let mut store = pointers(&[("e1", "src"), ("e2", "src")]);
        let changed = repoint(
            &mut store,
            &GroupId::from("g"),
            &AssetId::from("src"),
            &AssetId::from("derived"),
            &[EntityId::from("e1"), EntityId::from("e2")],
        )
        .unwrap();
        assert_eq!(changed, 2);
        assert_eq!(store.map[&EntityId::from("e1")], AssetId::from("derived"));
    }

    #[test]
    fn test_repoint_is_idempotent() {
        let mut store = pointers(&[("e1", "derived"), ("e2", "src")]);
        let changed = repoint(
            &mut store,
            &GroupId::from("g"),
            &AssetId::from("src"),
            &AssetId::from("derived"),
            &[EntityId::from("e1"), EntityId::from("e2")],
        )
        .unwrap();
        assert_eq!(changed, 1, "already-correct pointer must be skipped");
    }

    #[test]
    fn test_repoint_surfaces_store_failure() {
        let mut store = pointers(&[]);
        let err = repoint(
            &mut store,
            &GroupId::from("g"),
            &AssetId::from("src"),
            &AssetId::from("derived"),
            &[EntityId::from("ghost")],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::ReferenceUpdateFailed { .. }
        ));
    }
}
