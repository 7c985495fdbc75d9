//! Per-group ratio bucketing, canonical-ratio selection, and offender
//! classification.
//!
//! A [`Report`] is recomputed from current store state on every call; nothing
//! here is cached across requests. Canonical resolution order: an explicit
//! override argument wins over the group's persisted override, which wins
//! over the computed majority.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{default_crop_box, CropBox};
use crate::ratio::{ratio_value, within_tolerance, RatioKey};
use crate::stores::{AssetId, AssetStore, EntityId, GroupId, GroupStore, ReferenceStore};
use crate::{NormalizeError, Tolerances};

/// Aggregate of one ratio within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioBucket {
    pub key: RatioKey,
    /// Number of member assets at this ratio.
    pub attachment_count: u32,
    /// Number of entities referencing those assets; tie-break weight.
    pub entity_weight: u32,
}

/// A group member whose ratio falls outside tolerance of the canonical
/// ratio, with everything needed to fix it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffendingImage {
    pub asset: AssetId,
    pub width: u32,
    pub height: u32,
    pub ratio_key: RatioKey,
    pub ratio_value: f64,
    pub referencing_entities: Vec<EntityId>,
    /// Centered crop at the canonical ratio, as a starting point for edits.
    pub suggested_crop: CropBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportTotals {
    pub member_count: usize,
    pub matching_count: usize,
    pub offending_count: usize,
}

/// The normalization state of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub group: GroupId,
    pub canonical_ratio: RatioKey,
    /// Buckets sorted by the canonical tie-break order (attachment count
    /// descending, entity weight descending, key ascending).
    pub distribution: Vec<RatioBucket>,
    pub offending: Vec<OffendingImage>,
    pub totals: ReportTotals,
}

/// Build the normalization report for a group.
///
/// Members without measurable dimensions are left out of the distribution
/// and are never flagged; they cannot be cropped or padded anyway. A group
/// with no measurable members has no canonical ratio and is an error.
pub fn build_report<A, G, R>(
    assets: &A,
    groups: &G,
    references: &R,
    group: &GroupId,
    override_ratio: Option<&RatioKey>,
    tolerances: &Tolerances,
) -> Result<Report, NormalizeError>
where
    A: AssetStore,
    G: GroupStore,
    R: ReferenceStore,
{
    let members = groups
        .members_of(group)
        .map_err(|e| NormalizeError::InvalidInput(e.to_string()))?;

    struct Member {
        asset: AssetId,
        width: u32,
        height: u32,
        key: RatioKey,
        entities: Vec<EntityId>,
    }

    let mut measured = Vec::with_capacity(members.len());
    for asset in &members {
        let info = match assets.asset_info(asset) {
            Ok(info) => info,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(asset = %asset, group = %group, error = %_e, "skipping unmeasurable member");
                continue;
            }
        };
        let Some(key) = RatioKey::from_dimensions(info.width, info.height) else {
            continue;
        };
        let entities = references.referencing_entities(asset, group)?;
        measured.push(Member {
            asset: asset.clone(),
            width: info.width,
            height: info.height,
            key,
            entities,
        });
    }

    let mut buckets: HashMap<RatioKey, RatioBucket> = HashMap::new();
    for member in &measured {
        let bucket = buckets.entry(member.key).or_insert(RatioBucket {
            key: member.key,
            attachment_count: 0,
            entity_weight: 0,
        });
        bucket.attachment_count += 1;
        bucket.entity_weight += member.entities.len() as u32;
    }

    let mut distribution: Vec<RatioBucket> = buckets.into_values().collect();
    distribution.sort_by(|a, b| {
        b.attachment_count
            .cmp(&a.attachment_count)
            .then(b.entity_weight.cmp(&a.entity_weight))
            .then_with(|| a.key.to_string().cmp(&b.key.to_string()))
    });

    let canonical = match override_ratio {
        Some(key) => *key,
        None => match groups.canonical_ratio_override(group)? {
            Some(key) => key,
            None => {
                distribution
                    .first()
                    .ok_or_else(|| {
                        NormalizeError::InvalidInput(format!(
                            "group {group} has no measurable images"
                        ))
                    })?
                    .key
            }
        },
    };
    let canonical_value = canonical.value();

    let mut offending = Vec::new();
    let mut matching_count = 0;
    for member in measured {
        let value = ratio_value(member.width, member.height);
        if within_tolerance(value, canonical_value, tolerances.ratio_epsilon) {
            matching_count += 1;
            continue;
        }
        offending.push(OffendingImage {
            suggested_crop: default_crop_box(member.width, member.height, canonical_value),
            asset: member.asset,
            width: member.width,
            height: member.height,
            ratio_key: member.key,
            ratio_value: value,
            referencing_entities: member.entities,
        });
    }

    let totals = ReportTotals {
        member_count: members.len(),
        matching_count,
        offending_count: offending.len(),
    };

    Ok(Report {
        group: group.clone(),
        canonical_ratio: canonical,
        distribution,
        offending,
        totals,
    })
}
