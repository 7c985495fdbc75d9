//! Scanning all groups for those that need normalization.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{build_report, Report};
use crate::ratio::RatioKey;
use crate::stores::{AssetStore, GroupId, GroupStore, ReferenceStore};
use crate::{NormalizeError, Tolerances};

/// One group that has offending images, ranked for the worklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorklistEntry {
    pub group: GroupId,
    pub display_name: String,
    pub offending_count: usize,
    pub total_count: usize,
    pub canonical_ratio: RatioKey,
}

/// Report memo for a single scan.
///
/// Constructed fresh per request and passed in explicitly; there is no
/// process-wide cache, so two scans never see each other's stale reports.
#[derive(Default)]
pub struct ReportCache {
    reports: HashMap<GroupId, Report>,
}

impl ReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the group's report once and reuse it for the rest of the scan.
    pub fn get_or_build<A, G, R>(
        &mut self,
        assets: &A,
        groups: &G,
        references: &R,
        group: &GroupId,
        tolerances: &Tolerances,
    ) -> Result<&Report, NormalizeError>
    where
        A: AssetStore,
        G: GroupStore,
        R: ReferenceStore,
    {
        if !self.reports.contains_key(group) {
            let report = build_report(assets, groups, references, group, None, tolerances)?;
            self.reports.insert(group.clone(), report);
        }
        Ok(&self.reports[group])
    }
}

/// Scan every group and list those with offending images, sorted by
/// offending count descending, then display name ascending.
///
/// Groups whose report cannot be computed (for example, no measurable
/// members) simply do not need normalization and are skipped; store-level
/// failures propagate.
pub fn list_groups_needing_normalization<A, G, R>(
    assets: &A,
    groups: &G,
    references: &R,
    tolerances: &Tolerances,
    cache: &mut ReportCache,
) -> Result<Vec<WorklistEntry>, NormalizeError>
where
    A: AssetStore,
    G: GroupStore,
    R: ReferenceStore,
{
    let mut entries = Vec::new();
    for group in groups.group_ids()? {
        let report = match cache.get_or_build(assets, groups, references, &group, tolerances) {
            Ok(report) => report,
            Err(NormalizeError::InvalidInput(_)) => continue,
            Err(e) => return Err(e),
        };
        if report.offending.is_empty() {
            continue;
        }
        entries.push(WorklistEntry {
            group: group.clone(),
            display_name: groups.display_name(&group)?,
            offending_count: report.offending.len(),
            total_count: report.totals.member_count,
            canonical_ratio: report.canonical_ratio,
        });
    }
    entries.sort_by(|a, b| {
        b.offending_count
            .cmp(&a.offending_count)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
    Ok(entries)
}
