//! Batch application of a normalization: transform each offending image,
//! repoint its references, and persist the canonical ratio.
//!
//! Each call is stateless given current store contents. Per-image failures
//! become warnings and the batch continues; re-running a partially failed
//! batch is safe because transforms are keyed deterministically and
//! repointing skips already-correct pointers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{build_report, Report};
use crate::codec::{DynamicCodec, ImageCodec};
use crate::geometry::{sanitize_crop_box, CropBoxEdit};
use crate::ratio::RatioKey;
use crate::rewrite::repoint;
use crate::stores::{AssetId, AssetStore, GroupId, GroupStore, ReferenceStore};
use crate::transform::{crop_asset, pad_asset, TransformOp};
use crate::worklist::{list_groups_needing_normalization, ReportCache, WorklistEntry};
use crate::{NormalizeError, Tolerances};

/// Taxonomy of a per-image warning, for callers that retry selectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    MissingSource,
    DecodeFailed,
    SaveFailed,
    ReferenceUpdateFailed,
}

/// A per-image failure recorded during a batch; the batch itself succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyWarning {
    pub asset: AssetId,
    pub kind: WarningKind,
    pub message: String,
}

impl ApplyWarning {
    fn from_error(asset: &AssetId, error: &NormalizeError) -> Self {
        let kind = match error {
            NormalizeError::MissingSource(_) => WarningKind::MissingSource,
            NormalizeError::DecodeFailed { .. } => WarningKind::DecodeFailed,
            NormalizeError::ReferenceUpdateFailed { .. } => WarningKind::ReferenceUpdateFailed,
            _ => WarningKind::SaveFailed,
        };
        Self {
            asset: asset.clone(),
            kind,
            message: error.to_string(),
        }
    }
}

/// Result of one `apply` batch. Non-empty `warnings` with successes is a
/// partial success, not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplyOutcome {
    /// Offending images successfully transformed.
    pub processed_count: u32,
    /// Referencing entities whose pointer actually changed.
    pub updated_reference_count: u32,
    pub warnings: Vec<ApplyWarning>,
}

/// The normalization engine, bound to its three collaborator stores and an
/// image codec.
pub struct Normalizer<A, G, R, C = DynamicCodec> {
    assets: A,
    groups: G,
    references: R,
    codec: C,
    tolerances: Tolerances,
}

impl<A, G, R> Normalizer<A, G, R, DynamicCodec>
where
    A: AssetStore,
    G: GroupStore,
    R: ReferenceStore,
{
    /// Engine with the default `image`-crate codec and default tolerances.
    pub fn new(assets: A, groups: G, references: R) -> Self {
        Self::with_codec(assets, groups, references, DynamicCodec)
    }
}

impl<A, G, R, C> Normalizer<A, G, R, C>
where
    A: AssetStore,
    G: GroupStore,
    R: ReferenceStore,
    C: ImageCodec,
{
    pub fn with_codec(assets: A, groups: G, references: R, codec: C) -> Self {
        Self {
            assets,
            groups,
            references,
            codec,
            tolerances: Tolerances::default(),
        }
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Current normalization report for a group. `override_ratio` wins over
    /// the group's persisted canonical ratio for this computation only.
    pub fn build_group_report(
        &self,
        group: &GroupId,
        override_ratio: Option<&RatioKey>,
    ) -> Result<Report, NormalizeError> {
        build_report(
            &self.assets,
            &self.groups,
            &self.references,
            group,
            override_ratio,
            &self.tolerances,
        )
    }

    /// All groups with offending images, ranked for review.
    pub fn list_groups_needing_normalization(
        &self,
    ) -> Result<Vec<WorklistEntry>, NormalizeError> {
        let mut cache = ReportCache::new();
        list_groups_needing_normalization(
            &self.assets,
            &self.groups,
            &self.references,
            &self.tolerances,
            &mut cache,
        )
    }

    /// Normalize a group to `ratio` with the given operation.
    ///
    /// The offender set is recomputed here; a stale client-side list cannot
    /// cause a matching image to be transformed. `crop_overrides` supplies
    /// user-edited crop boxes per asset (sanitized before use, crop only);
    /// `target_filter`, when given, restricts the batch to those asset ids,
    /// which is also the retry path after a partial failure.
    ///
    /// The resolved canonical ratio is persisted on the group exactly once,
    /// even when there is nothing to transform.
    pub fn apply(
        &mut self,
        group: &GroupId,
        ratio: RatioKey,
        operation: TransformOp,
        crop_overrides: &HashMap<AssetId, CropBoxEdit>,
        target_filter: Option<&[AssetId]>,
    ) -> Result<ApplyOutcome, NormalizeError> {
        let report = self.build_group_report(group, Some(&ratio))?;

        let targets: Vec<_> = report
            .offending
            .into_iter()
            .filter(|off| {
                target_filter
                    .map(|ids| ids.contains(&off.asset))
                    .unwrap_or(true)
            })
            .collect();

        let mut outcome = ApplyOutcome::default();
        for offender in &targets {
            let transformed = match operation {
                TransformOp::Crop => {
                    let area = match crop_overrides.get(&offender.asset) {
                        Some(edit) => sanitize_crop_box(
                            edit,
                            offender.width,
                            offender.height,
                            ratio.value(),
                            &self.tolerances,
                        ),
                        None => offender.suggested_crop,
                    };
                    crop_asset(
                        &mut self.assets,
                        &self.codec,
                        &offender.asset,
                        &area,
                        group,
                        &ratio,
                    )
                }
                TransformOp::Pad => pad_asset(
                    &mut self.assets,
                    &self.codec,
                    &offender.asset,
                    group,
                    &ratio,
                ),
            };

            let derived = match transformed {
                Ok(derived) => derived,
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(asset = %offender.asset, group = %group, error = %e, "transform failed");
                    outcome.warnings.push(ApplyWarning::from_error(&offender.asset, &e));
                    continue;
                }
            };
            outcome.processed_count += 1;

            match repoint(
                &mut self.references,
                group,
                &offender.asset,
                &derived,
                &offender.referencing_entities,
            ) {
                Ok(changed) => outcome.updated_reference_count += changed,
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(asset = %offender.asset, group = %group, error = %e, "repoint failed");
                    outcome.warnings.push(ApplyWarning::from_error(&offender.asset, &e));
                }
            }
        }

        // Persisted once per batch so future reports treat this ratio as the
        // group's canonical override.
        self.groups
            .set_canonical_ratio_override(group, report.canonical_ratio)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            group = %group,
            processed = outcome.processed_count,
            updated = outcome.updated_reference_count,
            warnings = outcome.warnings.len(),
            "apply batch finished"
        );

        Ok(outcome)
    }

    /// Release the stores, e.g. to inspect them after a batch in tests.
    pub fn into_parts(self) -> (A, G, R) {
        (self.assets, self.groups, self.references)
    }
}
