//! The reconciliation run.
//!
//! One run walks every job folder under the root, turns each into a
//! [`Decision`] and applies it, then folds the composite rollup in a
//! second pass. All database writes land in a single run-scoped
//! transaction committed at the very end; a folder that fails is logged
//! and abandoned without stopping the walk.

use std::collections::HashMap;
use std::path::Path;

use chrono::Local;
use tracing::{debug, error, info, info_span, warn};

use crate::config::{Config, DuplicatePolicy};
use crate::db::{image_repo, pos_repo, render_repo, Database};
use crate::error::Result;
use crate::joblog::{scan_log, LogScan};
use crate::manifest::{read_manifest, JobManifest};
use crate::notify::{ChatGateway, Notifier};
use crate::publish::{find_preview, PreviewTransport};
use crate::resolve::name_prefix;
use crate::scanner::{JobFolder, JobFolderScanner};
use crate::status::{classify, RenderStatus};
use crate::timestamp;

use super::decision::{decide, Decision, PriorAttempt};
use super::rollup::{self, JobOutcome, RollupMap};

/// Run-level knobs lifted out of the configuration.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Status-group label marking composite multi-sub-job images.
    pub composite_group: String,
    /// Remote directory for awaiting-approval preview refreshes.
    pub base_path: String,
    /// Remote prefix for normal-flow previews.
    pub preview_prefix: String,
    pub duplicate_policy: DuplicatePolicy,
    /// Compute everything, then roll the transaction back.
    pub dry_run: bool,
}

impl RunOptions {
    pub fn from_config(config: &Config, dry_run: bool) -> Self {
        Self {
            composite_group: config.composite_group.clone(),
            base_path: config.remote.base_path.clone(),
            preview_prefix: config.remote.preview_prefix.clone(),
            duplicate_policy: config.notifications.duplicate_recipients,
            dry_run,
        }
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub folders_seen: usize,
    pub excluded: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub notifications_sent: usize,
    pub previews_published: usize,
    pub composites_aggregated: usize,
}

enum FolderOutcome {
    Processed,
    Skipped,
}

/// Everything resolved about one job folder before effects run.
struct JobContext {
    imagem_id: i64,
    /// Stored display name, used in notification text.
    image_name: String,
    status_id: i64,
    composite: bool,
    responsavel_id: Option<i64>,
    manifest: JobManifest,
    scan: LogScan,
    complete_is_yes: bool,
    prior_row: Option<render_repo::RenderAttemptRow>,
}

pub struct Reconciler<'a> {
    db: &'a Database,
    transport: &'a dyn PreviewTransport,
    gateway: &'a dyn ChatGateway,
    options: RunOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        db: &'a Database,
        transport: &'a dyn PreviewTransport,
        gateway: &'a dyn ChatGateway,
        options: RunOptions,
    ) -> Self {
        Self {
            db,
            transport,
            gateway,
            options,
        }
    }

    /// Run a full reconciliation: walk, aggregate, commit. On a dry run
    /// the transaction is rolled back instead of committed.
    pub fn run(&self, scanner: &JobFolderScanner) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        self.db.begin_run()?;

        let rollups = {
            let _span = info_span!("walk", root = %scanner.root().display()).entered();
            self.walk(scanner, &mut summary)
        };
        {
            let _span = info_span!("aggregate").entered();
            self.aggregate(rollups, &mut summary);
        }

        if self.options.dry_run {
            self.db.rollback_run()?;
            info!("Dry run: all writes rolled back");
        } else {
            self.db.commit_run()?;
        }
        Ok(summary)
    }

    /// First pass: visit every folder, feeding composite outcomes into
    /// the returned per-run rollup map.
    fn walk(&self, scanner: &JobFolderScanner, summary: &mut RunSummary) -> RollupMap {
        let report = scanner.scan();
        summary.folders_seen = report.folders.len();
        summary.excluded = report.excluded;

        let mut rollups = RollupMap::new();
        let mut composite_priors = HashMap::new();
        for folder in &report.folders {
            match self.process_folder(folder, &mut rollups, &mut composite_priors, summary) {
                Ok(FolderOutcome::Processed) => summary.processed += 1,
                Ok(FolderOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!("Abandoning folder {}: {}", folder.display(), e);
                }
            }
        }
        rollups
    }

    fn process_folder(
        &self,
        path: &Path,
        rollups: &mut RollupMap,
        composite_priors: &mut HashMap<i64, Option<PriorAttempt>>,
        summary: &mut RunSummary,
    ) -> Result<FolderOutcome> {
        let folder = JobFolder::locate(path)?;
        let _span = info_span!("job_folder", folder = %folder.name()).entered();

        let Some(manifest_path) = folder.manifest.as_deref() else {
            warn!("No manifest in {}", path.display());
            return Ok(FolderOutcome::Skipped);
        };
        let Some(log_path) = folder.log.as_deref() else {
            warn!("No job log in {}", path.display());
            return Ok(FolderOutcome::Skipped);
        };

        let manifest = read_manifest(manifest_path)?;
        let scan = scan_log(log_path)?;

        let Some(ctx) = self.resolve_context(manifest, scan)? else {
            return Ok(FolderOutcome::Skipped);
        };

        let candidate = classify(
            ctx.manifest.active.as_deref(),
            ctx.manifest.complete.as_deref(),
            ctx.scan.has_error,
        );
        let live_prior = ctx.prior_row.as_ref().map(|row| PriorAttempt {
            status: RenderStatus::parse(&row.status),
            has_preview: row.previa_jpg.is_some(),
        });
        // Composite sub-jobs share one image row. Their decisions use
        // the row as it stood when the run first met the image, so a
        // sibling written earlier in the same walk cannot short-circuit
        // a later sub-job out of the rollup feed.
        let prior = if ctx.composite {
            composite_priors
                .entry(ctx.imagem_id)
                .or_insert_with(|| live_prior.clone())
                .clone()
        } else {
            live_prior
        };
        let decision = decide(prior.as_ref(), candidate, ctx.complete_is_yes);
        debug!("Decision for image {}: {:?}", ctx.imagem_id, decision);

        match decision {
            Decision::NoOp => {
                debug!("Terminal status on image {}; nothing to do", ctx.imagem_id);
                Ok(FolderOutcome::Processed)
            }
            Decision::UpdatePreviewOnly => {
                self.refresh_preview(&ctx, summary)?;
                Ok(FolderOutcome::Processed)
            }
            Decision::Persist(status) => {
                self.persist(&ctx, status, false, rollups, summary)?;
                Ok(FolderOutcome::Processed)
            }
            Decision::PersistAndNotify(status) => {
                self.persist(&ctx, status, true, rollups, summary)?;
                Ok(FolderOutcome::Processed)
            }
        }
    }

    /// Resolves the manifest against the image registry. `None` means
    /// skip-with-warning; the warning has already been logged.
    fn resolve_context(
        &self,
        manifest: JobManifest,
        scan: LogScan,
    ) -> Result<Option<JobContext>> {
        let Some(job_name) = manifest.name.clone() else {
            warn!("Manifest carries no job name; skipping");
            return Ok(None);
        };

        let Some(imagem_id) = self.resolve_image(&job_name)? else {
            warn!("No image record matches '{}'", job_name);
            return Ok(None);
        };
        let image_name = image_repo::image_name(self.db, imagem_id)?.unwrap_or(job_name);

        let Some(status_id) = image_repo::status_group_id(self.db, imagem_id)? else {
            warn!("Image {} has no status group; skipping", imagem_id);
            return Ok(None);
        };
        let composite = image_repo::status_group_label(self.db, status_id)?.as_deref()
            == Some(self.options.composite_group.as_str());

        let responsavel_id =
            image_repo::responsible_for_role(self.db, imagem_id, image_repo::RENDER_ROLE_ID)?;
        let prior_row = render_repo::latest_for(self.db, imagem_id, status_id)?;

        let complete_is_yes = manifest
            .complete
            .as_deref()
            .map(|c| c.trim().eq_ignore_ascii_case("yes"))
            .unwrap_or(false);

        Ok(Some(JobContext {
            imagem_id,
            image_name,
            status_id,
            composite,
            responsavel_id,
            manifest,
            scan,
            complete_is_yes,
            prior_row,
        }))
    }

    /// Exact name first, then the whitespace-stripped prefix.
    fn resolve_image(&self, job_name: &str) -> Result<Option<i64>> {
        if let Some(id) = image_repo::find_id_by_exact_name(self.db, job_name)? {
            return Ok(Some(id));
        }
        let prefix = name_prefix(job_name);
        if prefix.is_empty() {
            return Ok(None);
        }
        Ok(image_repo::find_id_by_prefix(self.db, &prefix)?)
    }

    /// The awaiting-preview short circuit: publish a newly available
    /// preview under the renders base path and touch only the preview
    /// column. No preview on disk means nothing happens this pass.
    fn refresh_preview(&self, ctx: &JobContext, summary: &mut RunSummary) -> Result<()> {
        // The decision only picks this branch with a prior row on file.
        let Some(row) = ctx.prior_row.as_ref() else {
            return Ok(());
        };
        let Some(output_dir) = ctx.manifest.output_directory() else {
            debug!("Image {} has no output directory yet", ctx.imagem_id);
            return Ok(());
        };
        let Some(preview) = find_preview(&output_dir) else {
            debug!("Awaiting preview for image {}", ctx.imagem_id);
            return Ok(());
        };

        let remote = format!("{}{}", self.options.base_path, preview);
        match self.transport.upload(&output_dir.join(&preview), &remote) {
            Ok(()) => {
                render_repo::update_preview(self.db, row.id, &preview)?;
                summary.previews_published += 1;
                info!("Preview {} attached to awaiting image {}", preview, ctx.imagem_id);
            }
            Err(e) => {
                warn!("Preview upload failed, database left untouched: {}", e);
            }
        }
        Ok(())
    }

    /// Applies a Persist / PersistAndNotify decision.
    fn persist(
        &self,
        ctx: &JobContext,
        decided: RenderStatus,
        notify: bool,
        rollups: &mut RollupMap,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let output_dir = ctx.manifest.output_directory();
        let preview = self.publish_preview(ctx, output_dir.as_deref(), summary);

        // Composite sub-jobs keep the prior visible status; the rollup
        // pass owns status changes for the group. A first sighting has
        // no prior to preserve, so the candidate goes in.
        let stored_status = if ctx.composite {
            ctx.prior_row
                .as_ref()
                .map(|row| row.status.clone())
                .unwrap_or_else(|| decided.label().to_string())
        } else {
            decided.label().to_string()
        };

        let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let attempt = render_repo::NewRenderAttempt {
            imagem_id: ctx.imagem_id,
            responsavel_id: ctx.responsavel_id,
            status_id: ctx.status_id,
            status: stored_status,
            data: now.clone(),
            computer: ctx.manifest.computer.clone(),
            submitted: ctx
                .manifest
                .submitted
                .as_deref()
                .and_then(timestamp::normalize),
            last_updated: ctx
                .manifest
                .last_updated
                .as_deref()
                .and_then(timestamp::normalize),
            has_error: ctx.scan.has_error,
            errors: (!ctx.scan.error_text.is_empty()).then(|| ctx.scan.error_text.clone()),
            job_folder: output_dir
                .as_deref()
                .map(|d| d.to_string_lossy().into_owned()),
            previa_jpg: preview.clone(),
            numero_bg: ctx.manifest.description.clone(),
        };
        render_repo::upsert(self.db, &attempt)?;

        let render_id = render_repo::latest_for(self.db, ctx.imagem_id, ctx.status_id)?
            .map(|row| row.id);
        if let (Some(render_id), Some(preview)) = (render_id, preview.as_deref()) {
            render_repo::record_preview(self.db, render_id, preview)?;
        }

        if ctx.composite {
            let outcome = if decided == RenderStatus::Failed {
                JobOutcome::Failed
            } else if ctx.complete_is_yes {
                JobOutcome::Completed
            } else {
                JobOutcome::Incomplete
            };
            rollup::record(rollups, ctx.imagem_id, ctx.responsavel_id, outcome);
            debug!(
                "Composite sub-job recorded for image {} ({:?})",
                ctx.imagem_id, outcome
            );
            return Ok(());
        }

        let pos_responsavel =
            image_repo::responsible_for_role(self.db, ctx.imagem_id, image_repo::POST_ROLE_ID)?;
        pos_repo::upsert(
            self.db,
            &pos_repo::PosProducaoLink {
                render_id,
                imagem_id: ctx.imagem_id,
                obra_id: image_repo::obra_id(self.db, ctx.imagem_id)?,
                colaborador_id: ctx.responsavel_id,
                caminho_pasta: attempt.job_folder.clone(),
                numero_bg: ctx.manifest.description.clone(),
                status_id: ctx.status_id,
                responsavel_id: pos_responsavel,
            },
        )?;

        if notify {
            if let Some(responsavel_id) = ctx.responsavel_id {
                let notifier =
                    Notifier::new(self.db, self.gateway, self.options.duplicate_policy);
                if notifier.notify(responsavel_id, &decided, &ctx.image_name)? {
                    summary.notifications_sent += 1;
                }
            }
        }

        // Approval hand-off: the render role is done and the image moves
        // to the rendered substatus. Idempotent, so a repeat pass is fine.
        if decided == RenderStatus::AwaitingApproval {
            image_repo::finalize_render_role(self.db, ctx.imagem_id, &now)?;
            image_repo::set_substatus(self.db, ctx.imagem_id, image_repo::SUBSTATUS_RENDERED)?;
        }

        Ok(())
    }

    /// Uploads the normal-flow preview. Returns the filename only when
    /// the upload succeeded, so a failed transfer never reaches the
    /// database.
    fn publish_preview(
        &self,
        ctx: &JobContext,
        output_dir: Option<&Path>,
        summary: &mut RunSummary,
    ) -> Option<String> {
        let dir = output_dir?;
        let preview = find_preview(dir)?;
        let remote = format!("{}{}", self.options.preview_prefix, preview);
        match self.transport.upload(&dir.join(&preview), &remote) {
            Ok(()) => {
                summary.previews_published += 1;
                Some(preview)
            }
            Err(e) => {
                warn!(
                    "Preview upload for image {} failed, column withheld: {}",
                    ctx.imagem_id, e
                );
                None
            }
        }
    }

    /// Second pass: fold each composite image's accumulated outcomes and
    /// change the visible status at most once. A failing image is logged
    /// and skipped, like a failing folder in the walk.
    fn aggregate(&self, rollups: RollupMap, summary: &mut RunSummary) {
        for (imagem_id, entry) in rollups {
            if let Err(e) = self.aggregate_image(imagem_id, &entry, summary) {
                error!("Composite aggregation failed for image {}: {}", imagem_id, e);
            }
        }
    }

    fn aggregate_image(
        &self,
        imagem_id: i64,
        entry: &rollup::RollupEntry,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let Some(status_id) = image_repo::status_group_id(self.db, imagem_id)? else {
            return Ok(());
        };
        let Some(row) = render_repo::latest_for(self.db, imagem_id, status_id)? else {
            return Ok(());
        };

        let prior = RenderStatus::parse(&row.status);
        if prior.is_terminal() {
            debug!("Composite image {} is terminal; skipping", imagem_id);
            return Ok(());
        }

        let aggregated = entry.aggregate();
        if aggregated == prior {
            debug!(
                "Composite image {} unchanged at '{}' ({} sub-jobs)",
                imagem_id, prior, entry.total_jobs
            );
            return Ok(());
        }

        render_repo::update_status(self.db, imagem_id, status_id, aggregated.label())?;
        summary.composites_aggregated += 1;
        info!(
            "Composite image {}: '{}' -> '{}' over {} sub-jobs",
            imagem_id, prior, aggregated, entry.total_jobs
        );

        if let Some(responsavel_id) = entry.responsavel_id {
            let image_name = image_repo::image_name(self.db, imagem_id)?
                .unwrap_or_else(|| imagem_id.to_string());
            let notifier = Notifier::new(self.db, self.gateway, self.options.duplicate_policy);
            if notifier.notify(responsavel_id, &aggregated, &image_name)? {
                summary.notifications_sent += 1;
            }
        }
        Ok(())
    }
}
