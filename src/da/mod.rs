pub mod client;
pub mod error;
pub mod types;

pub use client::DaClient;
pub use error::ApiError;
pub use types::{
    Activity, ActivityCreated, Alias, AppBundle, AppBundleCreated, DeleteOutcome, ResourceKind,
    UploadParameters, WorkItem, WorkItemDetails, WorkItemStatus,
};

/// Provisioning calls against bundles, activities and their aliases.
pub trait ResourceApi {
    async fn create_app_bundle(&self, bundle: &AppBundle) -> Result<AppBundleCreated, ApiError>;

    /// Posts the archive to the pre-signed target returned by bundle creation.
    async fn upload_app_bundle(
        &self,
        params: &UploadParameters,
        archive: Vec<u8>,
    ) -> Result<(), ApiError>;

    async fn create_activity(&self, activity: &Activity) -> Result<ActivityCreated, ApiError>;

    async fn create_alias(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        alias: &Alias,
    ) -> Result<(), ApiError>;

    /// Deletes a resource, or one of its aliases when `alias_id` is given.
    /// A 404 is reported as [`DeleteOutcome::Absent`], not as an error.
    async fn delete_resource(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        alias_id: Option<&str>,
    ) -> Result<DeleteOutcome, ApiError>;

    /// All ids of the given kind visible to the caller, across every page.
    async fn list_resources(&self, kind: ResourceKind) -> Result<Vec<String>, ApiError>;
}

/// Submission and status reads of work items.
pub trait WorkItemApi {
    async fn create_work_item(&self, item: &WorkItem) -> Result<WorkItemDetails, ApiError>;

    async fn get_work_item(&self, id: &str) -> Result<WorkItemDetails, ApiError>;
}
