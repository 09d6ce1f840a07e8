//! In-memory console state: the camera roster plus everything the operator
//! has learned about each camera since the last refresh.

use async_trait::async_trait;
use camera_client::{
    ApiError, CameraBackend, ConfigTarget, ConfigurationError, CsvImportSummary, CsvSelection,
    ImportOutcome, ValidationExport, VlcTarget,
};
use common::cameras::{Camera, CameraId, CameraStatus, ConfigRequest, ExpectedConfig, NewCamera};
use common::matching::{MatchRules, ValidationReport};
use common::pagination::Paginator;
use common::validation::{validate_config_request, validate_new_camera};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::connection::ReconnectHandler;
use crate::error::ConsoleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraAction {
    Check,
    Validate,
    Configure,
    Delete,
    Vlc,
}

/// Which cameras a batch action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    All,
    Page,
    Selected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraFailure {
    pub camera_id: CameraId,
    pub error: String,
    /// The backend never answered.
    #[serde(skip)]
    pub unreachable: bool,
}

impl CameraFailure {
    fn from_api(camera_id: CameraId, error: &ApiError) -> Self {
        Self {
            camera_id,
            error: error.user_message(),
            unreachable: error.is_network(),
        }
    }
}

/// Per-camera outcome of a fan-out. Failures never abort the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub succeeded: Vec<CameraId>,
    pub failed: Vec<CameraFailure>,
    /// Simulated cameras excluded from stream-dependent actions.
    pub skipped: Vec<CameraId>,
}

impl BatchSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// At least one camera failed because the backend did not respond.
    pub fn backend_unreachable(&self) -> bool {
        self.failed.iter().any(|f| f.unreachable)
    }

    pub fn message(&self) -> String {
        let mut message = format!(
            "{} succeeded, {} failed",
            self.succeeded.len(),
            self.failed.len()
        );
        if !self.skipped.is_empty() {
            message.push_str(&format!(", {} skipped", self.skipped.len()));
        }
        if !self.failed.is_empty() {
            let failed: Vec<String> = self
                .failed
                .iter()
                .map(|f| format!("{} ({})", f.camera_id, f.error))
                .collect();
            message.push_str(&format!(": {}", failed.join(", ")));
        }
        message
    }

    fn record(&mut self, camera_id: CameraId, result: Result<(), ApiError>) {
        match result {
            Ok(()) => self.succeeded.push(camera_id),
            Err(error) => self.failed.push(CameraFailure::from_api(camera_id, &error)),
        }
    }
}

/// Result of validating or reconfiguring a set of cameras.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamOutcome {
    pub summary: BatchSummary,
    pub reports: Vec<ValidationReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub configuration_errors: Vec<ConfigurationError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFailure {
    pub camera_id: CameraId,
    pub error: String,
    #[serde(skip)]
    pub source: ApiError,
}

/// Bulk delete stops at the first failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub deleted: Vec<CameraId>,
    pub failed: Option<DeleteFailure>,
    pub not_attempted: Vec<CameraId>,
}

impl DeleteOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }

    pub fn message(&self) -> String {
        match &self.failed {
            None => format!("Deleted {} camera(s)", self.deleted.len()),
            Some(failure) => format!(
                "Deleted {} camera(s); failed to delete {}: {}; {} not attempted",
                self.deleted.len(),
                failure.camera_id,
                failure.error,
                self.not_attempted.len()
            ),
        }
    }
}

/// Outcome of choosing cameras from a CSV of IPs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvChoice {
    pub selected: Vec<CameraId>,
    pub backend: CsvSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraRow {
    pub camera: Camera,
    pub status: Option<CameraStatus>,
    pub validation: Option<ValidationReport>,
    pub selected: bool,
    pub loading: Vec<CameraAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub total_cameras: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub selected_count: usize,
    pub rows: Vec<CameraRow>,
}

#[derive(Debug, Default)]
struct ConsoleState {
    roster: Vec<Camera>,
    statuses: HashMap<CameraId, CameraStatus>,
    validations: HashMap<CameraId, ValidationReport>,
    selection: BTreeSet<CameraId>,
    loading: HashSet<(CameraId, CameraAction)>,
    paginator: Paginator,
}

impl ConsoleState {
    fn camera(&self, id: &CameraId) -> Option<&Camera> {
        self.roster.iter().find(|camera| &camera.id == id)
    }

    /// Swap in a freshly fetched roster and drop everything keyed by ids
    /// that no longer exist.
    fn replace_roster(&mut self, roster: Vec<Camera>) {
        let ids_changed = !self
            .roster
            .iter()
            .map(|c| &c.id)
            .eq(roster.iter().map(|c| &c.id));
        let keep: HashSet<CameraId> = roster.iter().map(|c| c.id.clone()).collect();

        self.selection.retain(|id| keep.contains(id));
        self.statuses.retain(|id, _| keep.contains(id));
        self.validations.retain(|id, _| keep.contains(id));
        self.loading.retain(|(id, _)| keep.contains(id));
        if ids_changed {
            self.paginator.reset();
        }
        self.roster = roster;
    }

    /// Ids in roster order for the requested scope.
    fn scope_ids(&self, scope: Scope) -> Vec<CameraId> {
        match scope {
            Scope::All => self.roster.iter().map(|c| c.id.clone()).collect(),
            Scope::Page => self
                .paginator
                .page(&self.roster)
                .items
                .iter()
                .map(|c| c.id.clone())
                .collect(),
            Scope::Selected => self.selected_in_order(),
        }
    }

    fn selected_in_order(&self) -> Vec<CameraId> {
        self.roster
            .iter()
            .filter(|c| self.selection.contains(&c.id))
            .map(|c| c.id.clone())
            .collect()
    }

    fn row(&self, camera: &Camera) -> CameraRow {
        let mut loading: Vec<CameraAction> = self
            .loading
            .iter()
            .filter(|(id, _)| id == &camera.id)
            .map(|(_, action)| *action)
            .collect();
        loading.sort();

        CameraRow {
            camera: camera.clone(),
            status: self.statuses.get(&camera.id).cloned(),
            validation: self.validations.get(&camera.id).cloned(),
            selected: self.selection.contains(&camera.id),
            loading,
        }
    }
}

/// Shared console state. Lock sections are synchronous; no backend call is
/// ever awaited while the lock is held.
pub struct CameraConsole {
    backend: Arc<dyn CameraBackend>,
    rules: MatchRules,
    state: RwLock<ConsoleState>,
}

impl CameraConsole {
    pub fn new(backend: Arc<dyn CameraBackend>, rules: MatchRules, page_size: NonZeroUsize) -> Self {
        let state = ConsoleState {
            paginator: Paginator::new(page_size),
            ..ConsoleState::default()
        };
        Self {
            backend,
            rules,
            state: RwLock::new(state),
        }
    }

    pub async fn cameras(&self) -> Vec<Camera> {
        self.state.read().await.roster.clone()
    }

    pub async fn selection(&self) -> Vec<CameraId> {
        self.state.read().await.selected_in_order()
    }

    pub async fn status(&self, id: &CameraId) -> Option<CameraStatus> {
        self.state.read().await.statuses.get(id).cloned()
    }

    pub async fn validation(&self, id: &CameraId) -> Option<ValidationReport> {
        self.state.read().await.validations.get(id).cloned()
    }

    pub async fn is_loading(&self, id: &CameraId, action: CameraAction) -> bool {
        self.state
            .read()
            .await
            .loading
            .contains(&(id.clone(), action))
    }

    pub async fn current_page(&self) -> usize {
        self.state.read().await.paginator.current_page()
    }

    /// Render a page of rows. `page` overrides the cursor for this read only.
    pub async fn page_view(&self, page: Option<usize>) -> PageView {
        let state = self.state.read().await;
        let page = common::pagination::paginate(
            &state.roster,
            state.paginator.page_size(),
            page.unwrap_or_else(|| state.paginator.current_page()),
        );

        PageView {
            total_cameras: state.roster.len(),
            total_pages: page.total_pages,
            current_page: page.current_page,
            start_index: page.start_index,
            end_index: page.end_index,
            selected_count: state.selection.len(),
            rows: page.items.iter().map(|camera| state.row(camera)).collect(),
        }
    }

    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<usize, ConsoleError> {
        let roster = self.backend.list_cameras().await?;
        let count = roster.len();
        self.state.write().await.replace_roster(roster);
        info!(count, "camera roster refreshed");
        Ok(count)
    }

    pub async fn jump_page(&self, input: &str) -> Result<usize, ConsoleError> {
        let mut state = self.state.write().await;
        let count = state.roster.len();
        Ok(state.paginator.jump(input, count)?)
    }

    pub async fn next_page(&self) -> usize {
        let mut state = self.state.write().await;
        let count = state.roster.len();
        state.paginator.next(count)
    }

    pub async fn previous_page(&self) -> usize {
        self.state.write().await.paginator.previous()
    }

    /// Replace the selection. Every id must name a loaded camera.
    pub async fn set_selection(&self, ids: Vec<CameraId>) -> Result<usize, ConsoleError> {
        let mut state = self.state.write().await;
        if let Some(unknown) = ids.iter().find(|id| state.camera(id).is_none()) {
            return Err(ConsoleError::UnknownCamera(unknown.clone()));
        }
        state.selection = ids.into_iter().collect();
        Ok(state.selection.len())
    }

    pub async fn clear_selection(&self) {
        self.state.write().await.selection.clear();
    }

    async fn begin(&self, ids: &[CameraId], action: CameraAction) {
        let mut state = self.state.write().await;
        for id in ids {
            state.loading.insert((id.clone(), action));
        }
    }

    async fn finish(&self, id: &CameraId, action: CameraAction) {
        self.state.write().await.loading.remove(&(id.clone(), action));
    }

    /// Check connectivity of every camera in `scope` concurrently.
    #[instrument(skip(self))]
    pub async fn check(&self, scope: Scope) -> BatchSummary {
        let ids = self.state.read().await.scope_ids(scope);
        self.begin(&ids, CameraAction::Check).await;

        let results = join_all(ids.iter().map(|id| async move {
            let result = self.backend.check_camera(id).await;
            let outcome = {
                let mut state = self.state.write().await;
                state.loading.remove(&(id.clone(), CameraAction::Check));
                let known = state.camera(id).is_some();
                match result {
                    Ok(status) => {
                        if known {
                            state.statuses.insert(id.clone(), status);
                        }
                        Ok(())
                    }
                    Err(err) => {
                        warn!(camera_id = %id, error = %err, "camera check failed");
                        if known {
                            state
                                .statuses
                                .insert(id.clone(), CameraStatus::failed(id.clone(), err.user_message()));
                        }
                        Err(err)
                    }
                }
            };
            (id.clone(), outcome)
        }))
        .await;

        let mut summary = BatchSummary::default();
        for (id, outcome) in results {
            summary.record(id, outcome);
        }
        info!(summary = %summary.message(), "camera check finished");
        summary
    }

    /// Validate the live stream of every real camera in `scope`.
    #[instrument(skip(self, expected))]
    pub async fn validate(&self, scope: Scope, expected: ExpectedConfig) -> StreamOutcome {
        let (ids, skipped) = {
            let state = self.state.read().await;
            let mut ids = Vec::new();
            let mut skipped = Vec::new();
            for id in state.scope_ids(scope) {
                match state.camera(&id) {
                    Some(camera) if camera.has_stream() => ids.push(id),
                    _ => skipped.push(id),
                }
            }
            (ids, skipped)
        };
        self.begin(&ids, CameraAction::Validate).await;

        let expected = &expected;
        let results = join_all(ids.iter().map(|id| async move {
            let result = self.backend.validate_stream(id, expected).await;
            let mut state = self.state.write().await;
            state.loading.remove(&(id.clone(), CameraAction::Validate));
            match result {
                Ok(mut result) => {
                    result.camera_id.get_or_insert_with(|| id.clone());
                    fill_expected(&mut result, expected);
                    let report = self.rules.evaluate(&result);
                    if state.camera(id).is_some() {
                        state.validations.insert(id.clone(), report.clone());
                    }
                    (id.clone(), Ok(report))
                }
                Err(err) => {
                    warn!(camera_id = %id, error = %err, "stream validation failed");
                    (id.clone(), Err(err))
                }
            }
        }))
        .await;

        let mut outcome = StreamOutcome {
            summary: BatchSummary {
                skipped,
                ..BatchSummary::default()
            },
            ..StreamOutcome::default()
        };
        for (id, result) in results {
            match result {
                Ok(report) => {
                    outcome.summary.succeeded.push(id);
                    outcome.reports.push(report);
                }
                Err(error) => outcome
                    .summary
                    .failed
                    .push(CameraFailure::from_api(id, &error)),
            }
        }
        outcome
    }

    /// Push `config` to every selected camera, one request per camera in
    /// list order, and record the validation each reply carries.
    #[instrument(skip(self))]
    pub async fn apply_config_to_selection(
        &self,
        config: ConfigRequest,
    ) -> Result<StreamOutcome, ConsoleError> {
        validate_config_request(&config).map_err(|e| ConsoleError::InvalidInput(e.to_string()))?;
        let ids = self.state.read().await.selected_in_order();
        if ids.is_empty() {
            return Err(ConsoleError::InvalidInput("no cameras selected".to_string()));
        }
        self.begin(&ids, CameraAction::Configure).await;

        let expected = ExpectedConfig::from(config);
        let expected = &expected;
        let config = &config;
        let results = join_all(ids.iter().map(|id| async move {
            let target = ConfigTarget::Single(id.clone());
            let result = self.backend.apply_config(&target, config).await;
            let mut state = self.state.write().await;
            state.loading.remove(&(id.clone(), CameraAction::Configure));
            match result {
                Ok(response) => {
                    let known = state.camera(id).is_some();
                    let mut reports = Vec::with_capacity(response.validation.len());
                    for mut result in response.validation {
                        result.camera_id.get_or_insert_with(|| id.clone());
                        fill_expected(&mut result, expected);
                        let report = self.rules.evaluate(&result);
                        if known {
                            state.validations.insert(id.clone(), report.clone());
                        }
                        reports.push(report);
                    }
                    (id.clone(), Ok((reports, response.configuration_errors)))
                }
                Err(err) => {
                    warn!(camera_id = %id, error = %err, "apply config failed");
                    (id.clone(), Err(err))
                }
            }
        }))
        .await;

        let mut outcome = StreamOutcome::default();
        for (id, result) in results {
            match result {
                Ok((reports, errors)) if errors.is_empty() => {
                    outcome.summary.succeeded.push(id);
                    outcome.reports.extend(reports);
                }
                Ok((reports, errors)) => {
                    let error = errors
                        .iter()
                        .map(|e| e.message.as_str())
                        .collect::<Vec<_>>()
                        .join("; ");
                    outcome.summary.failed.push(CameraFailure {
                        camera_id: id.clone(),
                        error,
                        unreachable: false,
                    });
                    outcome.reports.extend(reports);
                    outcome
                        .configuration_errors
                        .extend(errors.into_iter().map(|mut e| {
                            e.camera_id.get_or_insert_with(|| id.clone());
                            e
                        }));
                }
                Err(error) => outcome
                    .summary
                    .failed
                    .push(CameraFailure::from_api(id, &error)),
            }
        }
        info!(summary = %outcome.summary.message(), "apply config finished");
        Ok(outcome)
    }

    /// Delete the selected cameras one at a time, stopping at the first
    /// failure, then reload the roster.
    #[instrument(skip(self))]
    pub async fn delete_selected(&self) -> Result<DeleteOutcome, ConsoleError> {
        let ids = self.state.read().await.selected_in_order();
        if ids.is_empty() {
            return Err(ConsoleError::InvalidInput("no cameras selected".to_string()));
        }

        let mut outcome = DeleteOutcome::default();
        let mut remaining = ids.into_iter();
        for id in remaining.by_ref() {
            self.begin(std::slice::from_ref(&id), CameraAction::Delete).await;
            let result = self.backend.delete_camera(&id).await;
            self.finish(&id, CameraAction::Delete).await;

            match result {
                Ok(()) => outcome.deleted.push(id),
                Err(err) => {
                    warn!(camera_id = %id, error = %err, "delete failed, aborting bulk delete");
                    outcome.failed = Some(DeleteFailure {
                        camera_id: id,
                        error: err.user_message(),
                        source: err,
                    });
                    break;
                }
            }
        }
        outcome.not_attempted = remaining.collect();

        if let Err(err) = self.refresh().await {
            warn!(error = %err, "roster refresh after delete failed");
        }
        info!(message = %outcome.message(), "bulk delete finished");
        Ok(outcome)
    }

    #[instrument(skip(self, camera), fields(ip = %camera.ip))]
    pub async fn add_camera(&self, camera: NewCamera) -> Result<Camera, ConsoleError> {
        validate_new_camera(&camera).map_err(|e| ConsoleError::InvalidInput(e.to_string()))?;
        let created = self.backend.add_camera(&camera).await?;
        info!(camera_id = %created.id, "camera added");
        self.refresh().await?;
        Ok(created)
    }

    pub async fn launch_vlc(&self, id: &CameraId) -> Result<String, ConsoleError> {
        {
            let state = self.state.read().await;
            let camera = state
                .camera(id)
                .ok_or_else(|| ConsoleError::UnknownCamera(id.clone()))?;
            if !camera.has_stream() {
                return Err(ConsoleError::FakeCamera(id.clone()));
            }
        }

        self.begin(std::slice::from_ref(id), CameraAction::Vlc).await;
        let result = self.backend.launch_vlc(&VlcTarget::Camera(id.clone())).await;
        self.finish(id, CameraAction::Vlc).await;
        Ok(result?)
    }

    /// Upload a camera CSV. The roster is reloaded unless nothing was
    /// imported.
    #[instrument(skip(self, contents), fields(bytes = contents.len()))]
    pub async fn import_csv(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<CsvImportSummary, ConsoleError> {
        let summary = self.backend.import_csv(file_name, contents).await?;
        match summary.outcome {
            ImportOutcome::Failed => {
                warn!(errors = summary.error_count, "csv import imported nothing")
            }
            _ => {
                info!(
                    imported = summary.success_count,
                    errors = summary.error_count,
                    "csv import finished"
                );
                self.refresh().await?;
            }
        }
        Ok(summary)
    }

    /// Replace the selection with the cameras the backend matched from a
    /// CSV of IP addresses.
    pub async fn choose_from_csv(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<CsvChoice, ConsoleError> {
        let backend = self.backend.choose_from_csv(file_name, contents).await?;
        let mut state = self.state.write().await;
        state.selection = backend
            .selected_camera_ids
            .iter()
            .filter(|id| state.camera(id).is_some())
            .cloned()
            .collect();
        let selected = state.selected_in_order();
        info!(
            matched = backend.matched_count,
            unmatched = backend.unmatched_count,
            selected = selected.len(),
            "selection chosen from csv"
        );
        Ok(CsvChoice { selected, backend })
    }

    /// Export the stored validation results, in roster order.
    pub async fn export_validation(&self) -> Result<ValidationExport, ConsoleError> {
        let results: Vec<_> = {
            let state = self.state.read().await;
            state
                .roster
                .iter()
                .filter_map(|c| state.validations.get(&c.id))
                .map(|report| report.result.clone())
                .collect()
        };
        if results.is_empty() {
            return Err(ConsoleError::InvalidInput(
                "no validation results to export".to_string(),
            ));
        }
        Ok(self.backend.export_validation_csv(&results).await?)
    }

    /// Export and write the CSV into `dir`, returning the written path.
    pub async fn save_validation_export(
        &self,
        dir: &Path,
    ) -> Result<(PathBuf, ValidationExport), ConsoleError> {
        let export = self.export_validation().await?;
        let path = dir.join(&export.file_name);
        tokio::fs::write(&path, &export.contents)
            .await
            .map_err(|e| ConsoleError::Io(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "validation results exported");
        Ok((path, export))
    }
}

/// Fill in expectations the backend left out of its reply.
fn fill_expected(result: &mut common::cameras::ValidationResult, expected: &ExpectedConfig) {
    result.expected_width = result.expected_width.or(expected.width);
    result.expected_height = result.expected_height.or(expected.height);
    result.expected_fps = result.expected_fps.or(expected.fps);
    result.expected_bitrate = result.expected_bitrate.or(expected.bitrate);
    if result.expected_encoding.is_none() {
        result.expected_encoding = expected.encoding.clone();
    }
}

#[async_trait]
impl ReconnectHandler for CameraConsole {
    async fn on_reconnect(&self) {
        if let Err(err) = self.refresh().await {
            warn!(error = %err, "refresh after reconnect failed");
        }
    }
}
