//! Tipos de requisição e resposta dos endpoints do Design Automation v3.
//!
//! Cada endpoint usado pelo fluxo tem seu próprio tipo em vez de um mapa JSON
//! genérico. Os nomes de campo seguem o formato do wire (`camelCase`) via
//! `serde(rename_all)`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The two kinds of remote resource the workflow provisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    AppBundle,
    Activity,
}

impl ResourceKind {
    /// Collection segment of the REST path (`/appbundles`, `/activities`).
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::AppBundle => "appbundles",
            ResourceKind::Activity => "activities",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::AppBundle => write!(f, "app bundle"),
            ResourceKind::Activity => write!(f, "activity"),
        }
    }
}

/// Body of `POST /appbundles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppBundle {
    pub id: String,
    pub engine: String,
    pub description: String,
}

/// Response of `POST /appbundles`.
///
/// When `upload_parameters` is present the archive still has to be posted
/// to `endpoint_url` before the bundle is usable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppBundleCreated {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub upload_parameters: Option<UploadParameters>,
}

/// Pre-signed form upload target returned by bundle creation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadParameters {
    #[serde(rename = "endpointURL")]
    pub endpoint_url: String,
    #[serde(default)]
    pub form_data: BTreeMap<String, String>,
}

/// Transfer direction of an activity parameter or work-item argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Get,
    Put,
}

/// One entry of an activity's `parameters` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub verb: Verb,
    pub description: String,
    pub required: bool,
    pub local_name: String,
}

/// Body of `POST /activities`: the job template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    /// Fully qualified bundle references (`owner.name+alias`).
    pub appbundles: Vec<String>,
    pub command_line: Vec<String>,
    pub engine: String,
    pub parameters: BTreeMap<String, Parameter>,
}

/// Response of `POST /activities`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityCreated {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub version: Option<u32>,
}

/// Body of `POST /{collection}/{id}/aliases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub id: String,
    pub version: u32,
}

/// A single argument binding of a work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemArgument {
    pub url: String,
    /// Omitted for inputs: the service reads with `get` unless told otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<Verb>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemArguments {
    pub input_file: WorkItemArgument,
    pub output_file: WorkItemArgument,
}

/// Body of `POST /workitems`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub activity_id: String,
    pub arguments: WorkItemArguments,
}

impl WorkItem {
    /// Binds `input_url` for reading and `output_url` for writing against
    /// the given `activity+alias` id.
    pub fn new(activity_id: &str, input_url: &str, output_url: &str) -> Self {
        Self {
            activity_id: activity_id.to_string(),
            arguments: WorkItemArguments {
                input_file: WorkItemArgument {
                    url: input_url.to_string(),
                    verb: None,
                },
                output_file: WorkItemArgument {
                    url: output_url.to_string(),
                    verb: Some(Verb::Put),
                },
            },
        }
    }
}

/// Server-reported state of a work item.
///
/// Unrecognised values are kept verbatim in [`WorkItemStatus::Other`] so they
/// still show up in the outcome report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkItemStatus {
    #[default]
    Pending,
    InProgress,
    Success,
    Cancelled,
    FailedLimitProcessingTime,
    FailedLimitDataSize,
    FailedDownload,
    FailedInstructions,
    FailedUpload,
    FailedUploadOptional,
    Other(String),
}

impl WorkItemStatus {
    pub fn as_str(&self) -> &str {
        match self {
            WorkItemStatus::Pending => "pending",
            WorkItemStatus::InProgress => "inprogress",
            WorkItemStatus::Success => "success",
            WorkItemStatus::Cancelled => "cancelled",
            WorkItemStatus::FailedLimitProcessingTime => "failedLimitProcessingTime",
            WorkItemStatus::FailedLimitDataSize => "failedLimitDataSize",
            WorkItemStatus::FailedDownload => "failedDownload",
            WorkItemStatus::FailedInstructions => "failedInstructions",
            WorkItemStatus::FailedUpload => "failedUpload",
            WorkItemStatus::FailedUploadOptional => "failedUploadOptional",
            WorkItemStatus::Other(raw) => raw,
        }
    }

    /// `pending` or `inprogress`: the item has not finished yet.
    pub fn is_active(&self) -> bool {
        matches!(self, WorkItemStatus::Pending | WorkItemStatus::InProgress)
    }

    /// The failure statuses that end polling immediately.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            WorkItemStatus::FailedLimitProcessingTime
                | WorkItemStatus::FailedLimitDataSize
                | WorkItemStatus::FailedDownload
                | WorkItemStatus::FailedInstructions
                | WorkItemStatus::FailedUpload
        )
    }
}

impl From<String> for WorkItemStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pending" => WorkItemStatus::Pending,
            "inprogress" => WorkItemStatus::InProgress,
            "success" => WorkItemStatus::Success,
            "cancelled" => WorkItemStatus::Cancelled,
            "failedLimitProcessingTime" => WorkItemStatus::FailedLimitProcessingTime,
            "failedLimitDataSize" => WorkItemStatus::FailedLimitDataSize,
            "failedDownload" => WorkItemStatus::FailedDownload,
            "failedInstructions" => WorkItemStatus::FailedInstructions,
            "failedUpload" => WorkItemStatus::FailedUpload,
            "failedUploadOptional" => WorkItemStatus::FailedUploadOptional,
            _ => WorkItemStatus::Other(raw),
        }
    }
}

impl From<WorkItemStatus> for String {
    fn from(status: WorkItemStatus) -> Self {
        match status {
            WorkItemStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of `POST /workitems` and `GET /workitems/{id}`.
///
/// Fields beyond `id`, `status` and `reportUrl` (stats, progress, ...) are
/// kept in `extra` so a failure report carries everything the server sent.
/// A reply without `status` reads as `pending`; a missing `id` is left empty
/// for the client to fill in or reject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemDetails {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: WorkItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One page of `GET /appbundles` or `GET /activities`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub pagination_token: Option<String>,
    #[serde(default)]
    pub data: Vec<Value>,
}

impl Page {
    /// Entries are plain id strings; objects with an `id` field are accepted too.
    pub fn ids(&self) -> impl Iterator<Item = String> + '_ {
        self.data.iter().filter_map(|entry| match entry {
            Value::String(id) => Some(id.clone()),
            Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
    }

    /// Token for the next page, if the server sent a non-empty one.
    pub fn next_token(&self) -> Option<&str> {
        self.pagination_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// What a delete call found on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Absent,
}

/// True when a listed id refers to `name`, either bare or in the qualified
/// `owner.name+alias` form.
pub fn id_matches(listed: &str, name: &str) -> bool {
    if listed == name {
        return true;
    }
    let unaliased = listed.split('+').next().unwrap_or(listed);
    unaliased.rsplit('.').next() == Some(name)
}
