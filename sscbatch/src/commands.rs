//! Command handlers. Every handler expects an initialized client.
use crate::actions::BatchAction;
use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use crate::input::read_work_items;
use crate::summary::print_summary;
use log::{info, warn};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use ssc_platform::{
    AttributeDefinition, CopyVersionOptions, CreateLocalUserRequest, CreateVersionOptions,
    CustomTag, IssueQuery, ReportOptions, RoleRef, SscClient, TokenKind, VersionAttribute,
    run_batches,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Inputs of a batch run, checked before any request is made.
#[derive(Debug)]
pub struct BatchPlan {
    pub action: BatchAction,
    pub payload: Option<Value>,
    pub items: Vec<String>,
}

impl BatchPlan {
    /// Build the plan of a `batch` command, `None` for other commands.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed payloads or an unreadable CSV file.
    pub async fn prepare(cli: &Cli) -> Result<Option<Self>> {
        let Commands::Batch { action, payload } = &cli.command else {
            return Ok(None);
        };

        let payload: Option<Value> = payload
            .as_deref()
            .map(serde_json::from_str::<Value>)
            .transpose()?;
        action.validate_payload(payload.as_ref())?;
        let items = read_work_items(&cli.csv).await?;

        Ok(Some(Self {
            action: *action,
            payload,
            items,
        }))
    }
}

/// Name with a random numeric suffix, for entities created without a name.
fn generated_name(prefix: &str) -> String {
    format!("{prefix} {}", rand::random_range(0..1000u32))
}

/// Run one command against an initialized client.
///
/// # Errors
///
/// Returns the first error of the command.
pub async fn dispatch(client: &SscClient, cli: &Cli, plan: Option<BatchPlan>) -> Result<()> {
    match &cli.command {
        Commands::Batch { .. } => {
            let plan = plan
                .ok_or_else(|| CliError::Input("batch run was not prepared".to_string()))?;
            run_batch(client, plan, cli.batch_size).await
        }
        Commands::CreateVersion {
            project,
            name,
            description,
            attributes,
            text_attributes,
            copy_state_from,
            issue_template,
        } => {
            let name = name.clone().unwrap_or_else(|| generated_name("Batch Test Version"));
            let project_id = resolve_project(client, project, &name).await?;

            let mut options = CreateVersionOptions::new(project.as_str(), name);
            options.description = description.clone();
            options.project_id = project_id;
            options.issue_template_id = issue_template.clone();
            options.copy_state_from = *copy_state_from;
            options.attributes = attributes
                .iter()
                .map(|(id, guid)| VersionAttribute::with_option(*id, guid.as_str()))
                .chain(
                    text_attributes
                        .iter()
                        .map(|(id, value)| VersionAttribute::with_value(*id, value.as_str())),
                )
                .collect();

            let version = client.workflow().create_version(options).await?;
            println!("Created version '{}' (id {})", version.name, version.id);
            Ok(())
        }
        Commands::CopyVersion {
            source_version_id,
            project,
            name,
            description,
            issue_template,
        } => {
            let name = name.clone().unwrap_or_else(|| generated_name("Batch Copy Version"));
            let project_id = resolve_project(client, project, &name).await?;

            let options = CopyVersionOptions {
                name,
                description: description.clone(),
                project_name: project.clone(),
                project_description: String::new(),
                project_id,
                issue_template_id: issue_template.clone(),
                source_version_id: *source_version_id,
            };
            let version = client.workflow().copy_version(options).await?;
            println!(
                "Copied version {source_version_id} to '{}' (id {})",
                version.name, version.id
            );
            Ok(())
        }
        Commands::CreateAttribute { name, description } => {
            let name = name.clone().unwrap_or_else(|| generated_name("company guid"));
            let definition = AttributeDefinition::text(name, description.clone());
            let created = client
                .project_version_api()
                .create_attribute_definition(&definition)
                .await?;
            println!(
                "Created attribute definition '{}' (id {})",
                created.name,
                created.id.map_or_else(|| "?".to_string(), |id| id.to_string())
            );
            Ok(())
        }
        Commands::Upload {
            version_id,
            file,
            poll_interval,
            timeout_secs,
            no_wait,
        } => {
            let job_name = client.transfer_api().upload_fpr(*version_id, file).await?;
            println!("Upload accepted: {job_name}");
            if *no_wait {
                return Ok(());
            }

            let jobs = client.job_api();
            let wait = jobs.wait_for_job(&job_name, Duration::from_secs(*poll_interval));
            let job = tokio::time::timeout(Duration::from_secs(*timeout_secs), wait)
                .await
                .map_err(|_| CliError::Timeout(*timeout_secs, job_name.clone()))??;
            println!(
                "Job {} finished with state {} (artifact {})",
                job.job_name.as_deref().unwrap_or("?"),
                job.state,
                job.artifact_id().unwrap_or_else(|| "?".to_string())
            );
            Ok(())
        }
        Commands::DownloadArtifact {
            artifact_id,
            file_name,
        } => {
            let path = client
                .transfer_api()
                .download_artifact(*artifact_id, file_name)
                .await?;
            println!("Downloaded artifact {artifact_id} to {}", path.display());
            Ok(())
        }
        Commands::Report {
            definition,
            name,
            note,
            format,
            project_id,
            version_id,
            enabled_parameters,
            poll_interval,
            timeout_secs,
            no_download,
        } => {
            let options = ReportOptions {
                name: name.clone(),
                note: note.clone(),
                definition_name: definition.clone(),
                format: *format,
                project_id: *project_id,
                version_id: *version_id,
                boolean_overrides: enabled_parameters
                    .iter()
                    .map(|identifier| (identifier.clone(), true))
                    .collect::<HashMap<_, _>>(),
            };
            let report = client.workflow().generate_report(options).await?;
            println!("Submitted report '{}' (id {})", report.name, report.id);
            if *no_download {
                return Ok(());
            }

            let label = format!("report {}", report.id);
            let reporting = client.reporting_api();
            let wait = reporting.wait_for_report(report.id, Duration::from_secs(*poll_interval));
            let report = tokio::time::timeout(Duration::from_secs(*timeout_secs), wait)
                .await
                .map_err(|_| CliError::Timeout(*timeout_secs, label))??;
            let path = client
                .transfer_api()
                .download_report(report.id, &report.file_name())
                .await?;
            println!("Downloaded report to {}", path.display());
            Ok(())
        }
        Commands::Token { kind } => {
            let token = client.generate_token(kind).await?;
            println!("{}", token.token.expose_secret());
            info!("{kind} expires at {}", token.expires_at);
            Ok(())
        }
        Commands::Issues {
            version_id,
            limit,
            filter,
        } => list_issues(client, *version_id, *limit, filter.clone()).await,
        Commands::TagVersion {
            version_id,
            name,
            value_type,
        } => {
            let issues = client.issue_api();
            let name = name
                .clone()
                .unwrap_or_else(|| {
                    generated_name(&format!("Custom tag for version id {version_id}"))
                });
            let tag = CustomTag {
                id: None,
                guid: None,
                name,
                description: Some("Created by sscbatch".to_string()),
                value_type: Some(value_type.clone()),
                extra: Map::new(),
            };

            let created = issues.create_custom_tag(&tag).await?;
            let tag_id = created
                .id
                .ok_or_else(|| {
                    CliError::Input("server returned a custom tag without id".to_string())
                })?;
            let created = issues.get_custom_tag(tag_id).await?;
            println!("Created custom tag '{}' (id {tag_id})", created.name);

            let mut tags = issues.list_custom_tags_of_version(*version_id).await?;
            tags.push(created);
            let assigned = issues
                .update_custom_tags_of_version(*version_id, &tags)
                .await?;
            println!("Version {version_id} now has {} custom tags", assigned.len());
            Ok(())
        }
        Commands::CreateUser {
            user_name,
            password,
            email,
            roles,
            version_ids,
        } => {
            let identity = client.identity_api();
            let user_name = user_name
                .clone()
                .unwrap_or_else(|| format!("newuser-{}", unix_timestamp()));
            let request = CreateLocalUserRequest {
                email: email
                    .clone()
                    .unwrap_or_else(|| format!("{user_name}@example.com")),
                first_name: "new".to_string(),
                last_name: user_name.clone(),
                user_name,
                clear_password: SecretString::from(password.clone()),
                require_password_change: false,
                password_never_expire: true,
                roles: roles.iter().map(RoleRef::new).collect(),
            };
            let user = identity.create_local_user(&request).await?;
            println!("Created local user '{}' (id {})", user.user_name, user.id);

            if version_ids.is_empty() {
                return Ok(());
            }
            identity.assign_user_to_versions(user.id, version_ids).await?;
            for version_id in version_ids {
                let entities = identity.list_auth_entities_of_version(*version_id).await?;
                println!("Version {version_id} is accessible to:");
                for entity in entities {
                    println!(
                        "  {:<6} {}{}",
                        entity.id,
                        entity.entity_name.as_deref().unwrap_or("?"),
                        if entity.is_ldap { " (LDAP)" } else { "" }
                    );
                }
            }
            Ok(())
        }
        Commands::AaConfig { group, key } => {
            let configuration = client.configuration_api().get_configuration(group).await?;
            let value = configuration.property(key).unwrap_or("<unset>");
            println!("{key} = {value}");
            if !configuration.is_enabled(key) {
                warn!(
                    "Audit Assistant is not enabled, set SSC_SKIP_AUDIT_ASSISTANT=true to skip its operations"
                );
            }
            Ok(())
        }
        // Token revocation happens after dispatch
        Commands::Cleanup => Ok(()),
    }
}

fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Id of an existing project, `None` when the project must be created.
/// Fails when the version already exists.
async fn resolve_project(client: &SscClient, project: &str, version: &str) -> Result<Option<u64>> {
    let api = client.project_version_api();
    if !api.test_project(project).await? {
        info!("Project '{project}' does not exist yet and will be created");
        return Ok(None);
    }
    if api.test_project_version(project, version).await? {
        return Err(CliError::Input(format!(
            "Version '{version}' already exists in project '{project}'"
        )));
    }

    api.find_projects(project)
        .await?
        .into_iter()
        .find(|p| p.name == project)
        .and_then(|p| p.id)
        .map(Some)
        .ok_or_else(|| CliError::Input(format!("Project '{project}' could not be resolved")))
}

async fn run_batch(client: &SscClient, plan: BatchPlan, batch_size: usize) -> Result<()> {
    let BatchPlan {
        action,
        payload,
        items,
    } = plan;
    if action.requires_audit_assistant() && client.config().skip_audit_assistant {
        warn!("Audit Assistant is not enabled, {action} calls will be skipped");
    }
    info!("Running {action} for {} versions, {batch_size} at a time", items.len());

    let shared = Arc::new(client.clone());
    let payload = Arc::new(payload);
    let summary = run_batches(items, batch_size, move |version_id: String| {
        let client = Arc::clone(&shared);
        let payload = Arc::clone(&payload);
        async move {
            action
                .execute(&client, &version_id, (*payload).as_ref())
                .await
        }
    })
    .await?;

    print_summary(&summary);
    if summary.error_count() > 0 {
        warn!(
            "{} of {} calls failed",
            summary.error_count(),
            summary.total()
        );
    }
    Ok(())
}

async fn list_issues(
    client: &SscClient,
    version_id: u64,
    limit: Option<u32>,
    filter: Option<String>,
) -> Result<()> {
    let api = client.issue_api();
    let print = |issues: &[ssc_platform::Issue]| {
        for issue in issues {
            println!(
                "{:<10} {:<9} {} ({}:{})",
                issue.id,
                issue.friority.as_deref().unwrap_or("-"),
                issue.issue_name.as_deref().unwrap_or("?"),
                issue.primary_location.as_deref().unwrap_or("?"),
                issue.line_number.unwrap_or_default()
            );
        }
    };

    if filter.is_some() {
        let query = IssueQuery {
            start: 0,
            limit,
            filter,
        };
        let page = api.list_issues(version_id, &query).await?;
        print(&page.issues);
        println!("{} of {} matching issues shown", page.issues.len(), page.count);
        return Ok(());
    }

    let seen = api.for_each_issue_page(version_id, limit, print).await?;
    println!("{seen} issues in version {version_id}");
    Ok(())
}
