//! Provisioning of the bundle and the activity.
//!
//! The service rejects creating an id that already exists, so `setup` first
//! deletes whatever is there (aliases before their resource, the activity
//! before the bundle it references) and treats "nothing to delete" as
//! success. Nothing is rolled back when a later step fails.

use std::collections::BTreeMap;

use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::da::types::{Parameter, Verb, id_matches};
use crate::da::{Activity, Alias, ApiError, AppBundle, DeleteOutcome, ResourceApi, ResourceKind};
use crate::error::DeployError;

/// Every alias points at the first version of its resource.
pub const ALIAS_VERSION: u32 = 1;

/// Descriptors for this workflow's resources, derived from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePlan {
    pub bundle: AppBundle,
    pub bundle_alias: String,
    pub activity: Activity,
    pub activity_alias: String,
}

impl ResourcePlan {
    pub fn from_config(config: &AppConfig) -> Self {
        let bundle_name = &config.app_bundle.name;
        let qualified_bundle = format!("{}.{bundle_name}", config.nickname);

        let bundle = AppBundle {
            id: bundle_name.clone(),
            engine: config.engine.clone(),
            description: config.app_bundle.description.clone(),
        };

        let parameters = BTreeMap::from([
            (
                "inputFile".to_string(),
                Parameter {
                    verb: Verb::Get,
                    description: "Input ZIP file containing RFA families".to_string(),
                    required: true,
                    local_name: "families.zip".to_string(),
                },
            ),
            (
                "outputFile".to_string(),
                Parameter {
                    verb: Verb::Put,
                    description: "Output RVT file".to_string(),
                    required: true,
                    local_name: "result.rvt".to_string(),
                },
            ),
        ]);

        let activity = Activity {
            id: config.activity.name.clone(),
            appbundles: vec![format!("{qualified_bundle}+{}", config.app_bundle.alias)],
            command_line: vec![
                r"$(engine.path)\revit.exe".to_string(),
                r#"/i "$(args[inputFile].path)""#.to_string(),
                format!(r#"/al "$(appbundles[{qualified_bundle}].path)""#),
            ],
            engine: config.engine.clone(),
            parameters,
        };

        Self {
            bundle,
            bundle_alias: config.app_bundle.alias.clone(),
            activity,
            activity_alias: config.activity.alias.clone(),
        }
    }

    /// `activity+alias`, the id work items are submitted against.
    pub fn work_item_activity_id(&self) -> String {
        format!("{}+{}", self.activity.id, self.activity_alias)
    }
}

/// Result of a cleanup pass, by step label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: Vec<&'static str>,
    pub absent: Vec<&'static str>,
}

/// What `list` found on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    pub app_bundles: Vec<String>,
    pub activities: Vec<String>,
    pub bundle_present: bool,
    pub activity_present: bool,
}

/// Create/delete/list operations plus the `setup` and `cleanup` sequences.
pub struct ResourceManager<'a, A> {
    api: &'a A,
    plan: &'a ResourcePlan,
}

impl<'a, A: ResourceApi> ResourceManager<'a, A> {
    pub fn new(api: &'a A, plan: &'a ResourcePlan) -> Self {
        Self { api, plan }
    }

    /// Creates the bundle and, when the service asks for it, uploads the
    /// archive. Returns the version reported by the service.
    pub async fn create_bundle(
        &self,
        bundle: &AppBundle,
        archive: Vec<u8>,
    ) -> Result<Option<u32>, DeployError> {
        info!(bundle = %bundle.id, engine = %bundle.engine, "creating app bundle");
        let created = self
            .api
            .create_app_bundle(bundle)
            .await
            .map_err(DeployError::step("create app bundle"))?;
        info!(id = ?created.id, version = ?created.version, "app bundle accepted");

        match &created.upload_parameters {
            Some(params) => {
                info!(
                    endpoint = %params.endpoint_url,
                    fields = params.form_data.len(),
                    bytes = archive.len(),
                    "uploading app bundle"
                );
                self.api
                    .upload_app_bundle(params, archive)
                    .await
                    .map_err(DeployError::step("upload app bundle"))?;
                info!(bundle = %bundle.id, "app bundle uploaded");
            }
            None => warn!(bundle = %bundle.id, "no upload parameters in creation response"),
        }

        Ok(created.version)
    }

    pub async fn create_activity(&self, activity: &Activity) -> Result<Option<u32>, DeployError> {
        info!(activity = %activity.id, engine = %activity.engine, "creating activity");
        let created = self
            .api
            .create_activity(activity)
            .await
            .map_err(DeployError::step("create activity"))?;
        info!(id = ?created.id, version = ?created.version, "activity accepted");
        Ok(created.version)
    }

    pub async fn create_alias(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        alias_id: &str,
    ) -> Result<(), DeployError> {
        let step = match kind {
            ResourceKind::AppBundle => "create app bundle alias",
            ResourceKind::Activity => "create activity alias",
        };
        let alias = Alias {
            id: alias_id.to_string(),
            version: ALIAS_VERSION,
        };
        info!(kind = %kind, resource = resource_id, alias = alias_id, "creating alias");
        self.api
            .create_alias(kind, resource_id, &alias)
            .await
            .map_err(DeployError::step(step))
    }

    pub async fn delete_resource(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        alias_id: Option<&str>,
    ) -> Result<DeleteOutcome, ApiError> {
        self.api.delete_resource(kind, resource_id, alias_id).await
    }

    pub async fn list_resources(&self, kind: ResourceKind) -> Result<Vec<String>, ApiError> {
        self.api.list_resources(kind).await
    }

    /// Deletes the activity alias, the activity, the bundle alias and the
    /// bundle. Every delete is attempted; failures are collected.
    pub async fn cleanup(&self) -> Result<CleanupReport, DeployError> {
        let plan = self.plan;
        let targets: [(&'static str, ResourceKind, &str, Option<&str>); 4] = [
            (
                "delete activity alias",
                ResourceKind::Activity,
                plan.activity.id.as_str(),
                Some(plan.activity_alias.as_str()),
            ),
            (
                "delete activity",
                ResourceKind::Activity,
                plan.activity.id.as_str(),
                None,
            ),
            (
                "delete app bundle alias",
                ResourceKind::AppBundle,
                plan.bundle.id.as_str(),
                Some(plan.bundle_alias.as_str()),
            ),
            (
                "delete app bundle",
                ResourceKind::AppBundle,
                plan.bundle.id.as_str(),
                None,
            ),
        ];

        let mut report = CleanupReport::default();
        let mut failed = Vec::new();

        for (step, kind, id, alias) in targets {
            match self.delete_resource(kind, id, alias).await {
                Ok(DeleteOutcome::Deleted) => {
                    info!(step, resource = id, "deleted");
                    report.deleted.push(step);
                }
                Ok(DeleteOutcome::Absent) => {
                    info!(step, resource = id, "already absent");
                    report.absent.push(step);
                }
                Err(e) => {
                    error!(step, resource = id, error = %e, "delete failed");
                    failed.push(format!("{step}: {e}"));
                }
            }
        }

        if failed.is_empty() {
            Ok(report)
        } else {
            Err(DeployError::CleanupIncomplete { failed })
        }
    }

    /// Delete-then-create of the bundle, its alias, the activity and its alias.
    /// Stops at the first failing step.
    pub async fn setup(&self, archive: Vec<u8>) -> Result<(), DeployError> {
        let plan = self.plan;

        self.cleanup().await?;

        let version = self.create_bundle(&plan.bundle, archive).await?;
        info!(bundle = %plan.bundle.id, ?version, "app bundle created");
        self.create_alias(ResourceKind::AppBundle, &plan.bundle.id, &plan.bundle_alias)
            .await?;

        let version = self.create_activity(&plan.activity).await?;
        info!(activity = %plan.activity.id, ?version, "activity created");
        self.create_alias(ResourceKind::Activity, &plan.activity.id, &plan.activity_alias)
            .await?;

        Ok(())
    }

    /// Lists bundles and activities and checks for this workflow's own.
    pub async fn inventory(&self) -> Result<Inventory, DeployError> {
        let app_bundles = self
            .list_resources(ResourceKind::AppBundle)
            .await
            .map_err(DeployError::step("list app bundles"))?;
        let activities = self
            .list_resources(ResourceKind::Activity)
            .await
            .map_err(DeployError::step("list activities"))?;

        let bundle_present = app_bundles.iter().any(|id| id_matches(id, &self.plan.bundle.id));
        let activity_present = activities.iter().any(|id| id_matches(id, &self.plan.activity.id));

        Ok(Inventory {
            app_bundles,
            activities,
            bundle_present,
            activity_present,
        })
    }
}
