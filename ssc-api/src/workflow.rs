//! Multi-step operations.
//!
//! [`Workflow`] chains async steps, each receiving the previous step's
//! output. The first failing step ends the chain and its error is returned
//! unchanged; later steps are never invoked. [`SscWorkflow`] builds the
//! version and report workflows on top of it.

use log::{debug, error, info};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::project::{
    CreateProjectVersionRequest, DEFAULT_ISSUE_TEMPLATE, Project, ProjectVersion, VersionAttribute,
};
use crate::reporting::{
    ISSUE_REPORT_TYPE, ReportDefinition, ReportFormat, ReportProjectRef, ReportVersionRef,
    SavedReport, SavedReportRequest, compose_report_parameters,
};
use crate::validation::EntityName;
use crate::{SscClient, SscError};

type StepFuture<'a, S, E> = Pin<Box<dyn Future<Output = Result<S, E>> + Send + 'a>>;

/// A lazily evaluated chain of named async steps.
///
/// ```
/// # use ssc_platform::{SscError, Workflow};
/// # tokio_test::block_on(async {
/// let rendered = Workflow::start("demo", 20u32)
///     .then("double", |n| async move { Ok::<_, SscError>(n * 2) })
///     .then("render", |n| async move { Ok::<_, SscError>(n.to_string()) })
///     .run()
///     .await?;
/// assert_eq!(rendered, "40");
/// # Ok::<(), SscError>(())
/// # });
/// ```
pub struct Workflow<'a, S, E = SscError> {
    name: Arc<str>,
    steps: usize,
    state: StepFuture<'a, S, E>,
}

impl<'a, S, E> Workflow<'a, S, E>
where
    S: Send + 'a,
    E: fmt::Display + Send + 'a,
{
    /// Start a workflow whose first step receives `input`.
    pub fn start(name: &str, input: S) -> Self {
        Self {
            name: Arc::from(name),
            steps: 0,
            state: Box::pin(async move { Ok(input) }),
        }
    }

    /// Append a step.
    pub fn then<T, F, Fut>(self, step: &'static str, f: F) -> Workflow<'a, T, E>
    where
        T: Send + 'a,
        F: FnOnce(S) -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, E>> + Send + 'a,
    {
        let number = self.steps.saturating_add(1);
        let name = Arc::clone(&self.name);
        let previous = self.state;

        Workflow {
            name: self.name,
            steps: number,
            state: Box::pin(async move {
                let input = match previous.await {
                    Ok(input) => input,
                    Err(e) => return Err(e),
                };
                debug!("{name}: step {number} '{step}' started");
                match f(input).await {
                    Ok(output) => {
                        debug!("{name}: step {number} '{step}' completed");
                        Ok(output)
                    }
                    Err(e) => {
                        error!("❌ {name}: step {number} '{step}' failed: {e}");
                        Err(e)
                    }
                }
            }),
        }
    }

    /// Number of steps appended so far.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps
    }

    /// Execute the chain.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step.
    pub async fn run(self) -> Result<S, E> {
        let Workflow { name, steps, state } = self;
        info!("▶️  {name}: running {steps} steps");
        let result = state.await;
        if result.is_ok() {
            info!("✅ {name} completed");
        }
        result
    }
}

/// Options for creating a project version.
#[derive(Debug, Clone)]
pub struct CreateVersionOptions {
    pub name: String,
    pub description: String,
    pub project_name: String,
    pub project_description: String,
    /// Existing project to create the version under; a new project is
    /// created when `None`
    pub project_id: Option<u64>,
    pub issue_template_id: String,
    pub attributes: Vec<VersionAttribute>,
    /// Copy issue state from this version once committed
    pub copy_state_from: Option<u64>,
}

impl CreateVersionOptions {
    pub fn new(project_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            project_name: project_name.into(),
            project_description: String::new(),
            project_id: None,
            issue_template_id: DEFAULT_ISSUE_TEMPLATE.to_string(),
            attributes: Vec::new(),
            copy_state_from: None,
        }
    }
}

/// Options for copying a project version.
#[derive(Debug, Clone)]
pub struct CopyVersionOptions {
    pub name: String,
    pub description: String,
    pub project_name: String,
    pub project_description: String,
    pub project_id: Option<u64>,
    pub issue_template_id: String,
    pub source_version_id: u64,
}

/// Options for generating a saved report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub name: String,
    pub note: String,
    pub definition_name: String,
    pub format: ReportFormat,
    pub project_id: u64,
    pub version_id: u64,
    /// Values for BOOLEAN parameters by identifier; unlisted ones are `false`
    pub boolean_overrides: HashMap<String, bool>,
}

/// High-level workflow operations for SSC
#[derive(Clone, Copy)]
pub struct SscWorkflow<'a> {
    client: &'a SscClient,
}

impl<'a> SscWorkflow<'a> {
    #[must_use]
    pub fn new(client: &'a SscClient) -> Self {
        Self { client }
    }

    fn version_request(
        name: &str,
        description: &str,
        project_name: &str,
        project_description: &str,
        project_id: Option<u64>,
        issue_template_id: &str,
    ) -> Result<CreateProjectVersionRequest, SscError> {
        let project_name = EntityName::new(project_name, "project name")?;
        let version_name = EntityName::new(name, "version name")?;
        Ok(CreateProjectVersionRequest {
            name: version_name.into_inner(),
            description: description.to_string(),
            active: true,
            committed: false,
            project: Project {
                id: project_id,
                name: project_name.into_inner(),
                description: Some(project_description.to_string()),
                issue_template_id: Some(issue_template_id.to_string()),
            },
            issue_template_id: issue_template_id.to_string(),
        })
    }

    /// Create a version: create → assign attributes → commit → optionally
    /// copy issue state from another version.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step.
    pub async fn create_version(
        &self,
        options: CreateVersionOptions,
    ) -> Result<ProjectVersion, SscError> {
        let request = Self::version_request(
            &options.name,
            &options.description,
            &options.project_name,
            &options.project_description,
            options.project_id,
            &options.issue_template_id,
        )?;
        let api = self.client.project_version_api();
        let attributes = options.attributes;

        let workflow = Workflow::start("create version", request)
            .then("create project version", move |request| async move {
                api.create_project_version(&request).await
            })
            .then("assign attributes", move |version: ProjectVersion| async move {
                api.assign_attributes(version.id, &attributes).await?;
                Ok::<_, SscError>(version)
            })
            .then("commit", move |version: ProjectVersion| async move {
                api.commit_project_version(version.id).await
            });

        let workflow = match options.copy_state_from {
            Some(source_version_id) => workflow.then(
                "copy current state",
                move |version: ProjectVersion| async move {
                    api.copy_current_state_action(version.id, source_version_id)
                        .await?;
                    Ok::<_, SscError>(version)
                },
            ),
            None => workflow,
        };

        let version = workflow.run().await?;
        info!("Version '{}' created successfully (id {})", version.name, version.id);
        Ok(version)
    }

    /// Copy a version: create → copy settings from the source → commit →
    /// copy issue state from the source.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step.
    pub async fn copy_version(
        &self,
        options: CopyVersionOptions,
    ) -> Result<ProjectVersion, SscError> {
        let request = Self::version_request(
            &options.name,
            &options.description,
            &options.project_name,
            &options.project_description,
            options.project_id,
            &options.issue_template_id,
        )?;
        let api = self.client.project_version_api();
        let source = options.source_version_id;

        let version = Workflow::start("copy version", request)
            .then("create project version", move |request| async move {
                api.create_project_version(&request).await
            })
            .then("copy from partial", move |version: ProjectVersion| async move {
                api.copy_from_partial(version.id, source).await?;
                Ok::<_, SscError>(version)
            })
            .then("commit", move |version: ProjectVersion| async move {
                api.commit_project_version(version.id).await
            })
            .then("copy current state", move |version: ProjectVersion| async move {
                api.copy_current_state(version.id, source).await?;
                Ok::<_, SscError>(version)
            })
            .run()
            .await?;

        info!(
            "Version {source} copied to '{}' (id {})",
            version.name, version.id
        );
        Ok(version)
    }

    /// Generate a saved report: resolve definition → compose parameters →
    /// submit.
    ///
    /// The returned report is usually still processing; see
    /// [`ReportingApi::wait_for_report`](crate::ReportingApi::wait_for_report).
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step.
    pub async fn generate_report(&self, options: ReportOptions) -> Result<SavedReport, SscError> {
        let reporting = self.client.reporting_api();

        Workflow::start("generate report", options)
            .then("find report definition", move |options: ReportOptions| async move {
                let definition = reporting
                    .find_report_definition(&options.definition_name)
                    .await?;
                Ok::<_, SscError>((options, definition))
            })
            .then(
                "compose parameters",
                |(options, definition): (ReportOptions, ReportDefinition)| async move {
                    let input_report_parameters = compose_report_parameters(
                        &definition,
                        options.version_id,
                        &options.boolean_overrides,
                    )?;
                    Ok::<_, SscError>(SavedReportRequest {
                        name: options.name,
                        note: options.note,
                        report_type: ISSUE_REPORT_TYPE.to_string(),
                        report_definition_id: definition.id,
                        format: options.format,
                        project: ReportProjectRef {
                            id: options.project_id,
                            version: ReportVersionRef {
                                id: options.version_id,
                            },
                        },
                        input_report_parameters,
                    })
                },
            )
            .then("submit saved report", move |request: SavedReportRequest| async move {
                reporting.create_saved_report(&request).await
            })
            .run()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct StepError(&'static str);

    impl fmt::Display for StepError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "step error: {}", self.0)
        }
    }

    #[tokio::test]
    async fn test_steps_receive_previous_output() {
        let result = Workflow::<_, StepError>::start("typed", 3u32)
            .then("square", |n| async move { Ok(n * n) })
            .then("describe", |n| async move { Ok(format!("value {n}")) })
            .run()
            .await;

        assert_eq!(result, Ok("value 9".to_string()));
    }

    #[tokio::test]
    async fn test_failing_step_short_circuits() {
        let third_calls = AtomicUsize::new(0);
        let first_calls = AtomicUsize::new(0);

        let workflow = Workflow::<_, StepError>::start("short circuit", ())
            .then("s1", |_| {
                first_calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(1u32) }
            })
            .then("s2", |_| async move { Err::<u32, _>(StepError("s2 broke")) })
            .then("s3", |n| {
                third_calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(n + 1) }
            });
        assert_eq!(workflow.step_count(), 3);

        let result = workflow.run().await;

        assert_eq!(result, Err(StepError("s2 broke")));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_steps_are_lazy() {
        let calls = AtomicUsize::new(0);
        let workflow = Workflow::<_, StepError>::start("lazy", ()).then("only", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(()) }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        workflow.run().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_version_request_validates_names() {
        let result = SscWorkflow::version_request("", "d", "app", "", None, DEFAULT_ISSUE_TEMPLATE);
        assert!(matches!(result, Err(SscError::Validation(_))));

        let request =
            SscWorkflow::version_request(" 1.0 ", "d", "app", "", Some(7), DEFAULT_ISSUE_TEMPLATE)
                .unwrap();
        assert_eq!(request.name, "1.0");
        assert_eq!(request.project.id, Some(7));
        assert!(!request.committed);
        assert!(request.active);
    }
}
