use std::collections::HashSet;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::ApiError;
use super::types::{
    Activity, ActivityCreated, Alias, AppBundle, AppBundleCreated, DeleteOutcome, Page,
    ResourceKind, UploadParameters, WorkItem, WorkItemDetails,
};
use super::{ResourceApi, WorkItemApi};
use crate::auth::AccessToken;

/// Form field that carries the archive in the bundle upload.
const UPLOAD_FIELD: &str = "file";
const UPLOAD_FILE_NAME: &str = "bundle.zip";

/// Bearer-authenticated client for the Design Automation v3 REST API.
pub struct DaClient {
    client: Client,
    base_url: String,
    token: AccessToken,
}

impl DaClient {
    /// Client for `{host}/da/{region}/v3`.
    pub fn new(client: Client, host: &str, region: &str, token: AccessToken) -> Self {
        let base_url = format!("{}/da/{region}/v3", host.trim_end_matches('/'));
        Self::with_base_url(client, base_url, token)
    }

    /// Create a client pointing at a custom API root (useful for testing).
    pub fn with_base_url(client: Client, base_url: String, token: AccessToken) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(self.token.secret())
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = ensure_success(builder.send().await?).await?;
        let text = response.text().await?;
        debug!(body = %text, "API response");
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(format!("{e}: {text}")))
    }

    async fn execute_discarding(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        let response = ensure_success(builder.send().await?).await?;
        let text = response.text().await?;
        debug!(body = %text, "API response");
        Ok(())
    }
}

/// Turns a non-2xx response into [`ApiError::Status`] carrying the raw body.
async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

/// 2xx (including 204) means deleted, 404 means there was nothing to delete;
/// anything else is a failure.
pub fn classify_delete(status: StatusCode, body: String) -> Result<DeleteOutcome, ApiError> {
    if status == StatusCode::NOT_FOUND {
        Ok(DeleteOutcome::Absent)
    } else if status.is_success() {
        Ok(DeleteOutcome::Deleted)
    } else {
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl ResourceApi for DaClient {
    async fn create_app_bundle(&self, bundle: &AppBundle) -> Result<AppBundleCreated, ApiError> {
        self.execute(self.request(Method::POST, "/appbundles").json(bundle))
            .await
    }

    async fn upload_app_bundle(
        &self,
        params: &UploadParameters,
        archive: Vec<u8>,
    ) -> Result<(), ApiError> {
        let mut form = Form::new();
        for (key, value) in &params.form_data {
            form = form.text(key.clone(), value.clone());
        }
        let part = Part::bytes(archive)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("application/zip")?;
        form = form.part(UPLOAD_FIELD, part);

        // The target is pre-signed; it must not receive the bearer token.
        let response = self
            .client
            .post(&params.endpoint_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Upload {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn create_activity(&self, activity: &Activity) -> Result<ActivityCreated, ApiError> {
        self.execute(self.request(Method::POST, "/activities").json(activity))
            .await
    }

    async fn create_alias(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        alias: &Alias,
    ) -> Result<(), ApiError> {
        let path = format!("/{}/{resource_id}/aliases", kind.collection());
        self.execute_discarding(self.request(Method::POST, &path).json(alias))
            .await
    }

    async fn delete_resource(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        alias_id: Option<&str>,
    ) -> Result<DeleteOutcome, ApiError> {
        let path = match alias_id {
            Some(alias) => format!("/{}/{resource_id}/aliases/{alias}", kind.collection()),
            None => format!("/{}/{resource_id}", kind.collection()),
        };
        let response = self.request(Method::DELETE, &path).send().await?;
        let status = response.status();
        let body = if status.is_success() {
            String::new()
        } else {
            response.text().await.unwrap_or_default()
        };
        classify_delete(status, body)
    }

    async fn list_resources(&self, kind: ResourceKind) -> Result<Vec<String>, ApiError> {
        let path = format!("/{}", kind.collection());
        let mut ids = Vec::new();
        let mut token: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let mut builder = self.request(Method::GET, &path);
            if let Some(page) = &token {
                builder = builder.query(&[("page", page)]);
            }
            let page: Page = self.execute(builder).await?;
            ids.extend(page.ids());

            match page.next_token() {
                Some(next) if seen.insert(next.to_string()) => token = Some(next.to_string()),
                Some(next) => {
                    warn!(collection = kind.collection(), token = next, "pagination token repeated, stopping");
                    break;
                }
                None => break,
            }
        }

        Ok(ids)
    }
}

impl WorkItemApi for DaClient {
    async fn create_work_item(&self, item: &WorkItem) -> Result<WorkItemDetails, ApiError> {
        let created: WorkItemDetails = self
            .execute(self.request(Method::POST, "/workitems").json(item))
            .await?;
        if created.id.is_empty() {
            return Err(ApiError::Parse("work item creation response has no id".into()));
        }
        Ok(created)
    }

    async fn get_work_item(&self, id: &str) -> Result<WorkItemDetails, ApiError> {
        let mut details: WorkItemDetails = self
            .execute(self.request(Method::GET, &format!("/workitems/{id}")))
            .await?;
        if details.id.is_empty() {
            details.id = id.to_string();
        }
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::da::types::{Verb, WorkItemStatus};
    use serde_json::json;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_json, body_string_contains, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> DaClient {
        DaClient::with_base_url(
            Client::new(),
            format!("{}/da/us-east/v3", server.uri()),
            AccessToken::new("test-token"),
        )
    }

    #[test]
    fn new_builds_regional_base_path() {
        let client = DaClient::new(
            Client::new(),
            "https://developer.api.autodesk.com/",
            "us-east",
            AccessToken::new("t"),
        );
        assert_eq!(client.base_url, "https://developer.api.autodesk.com/da/us-east/v3");
    }

    #[test]
    fn delete_classification() {
        assert_eq!(
            classify_delete(StatusCode::NO_CONTENT, String::new()).unwrap(),
            DeleteOutcome::Deleted
        );
        assert_eq!(
            classify_delete(StatusCode::OK, String::new()).unwrap(),
            DeleteOutcome::Deleted
        );
        assert_eq!(
            classify_delete(StatusCode::NOT_FOUND, "gone".into()).unwrap(),
            DeleteOutcome::Absent
        );
        for code in [StatusCode::BAD_REQUEST, StatusCode::FORBIDDEN, StatusCode::CONFLICT, StatusCode::INTERNAL_SERVER_ERROR] {
            let err = classify_delete(code, "nope".into()).unwrap_err();
            assert_eq!(err.status(), Some(code.as_u16()));
        }
    }

    #[tokio::test]
    async fn create_work_item_sends_bearer_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/da/us-east/v3/workitems"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(json!({
                "activityId": "RFAConversionActivity+prod",
                "arguments": {
                    "inputFile": { "url": "https://in" },
                    "outputFile": { "url": "https://out", "verb": "put" }
                }
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": "wi-42", "status": "pending" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let created = client
            .create_work_item(&WorkItem::new("RFAConversionActivity+prod", "https://in", "https://out"))
            .await
            .unwrap();
        assert_eq!(created.id, "wi-42");
        assert_eq!(created.status, WorkItemStatus::Pending);
    }

    #[tokio::test]
    async fn non_success_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/da/us-east/v3/appbundles"))
            .respond_with(ResponseTemplate::new(409).set_body_string("already exists"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .create_app_bundle(&AppBundle {
                id: "RFAConversionApp".into(),
                engine: "Autodesk.Revit+2025".into(),
                description: "d".into(),
            })
            .await
            .unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 409);
                assert_eq!(body, "already exists");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_paths_and_tolerated_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/da/us-east/v3/activities/RFAConversionActivity/aliases/prod"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/da/us-east/v3/appbundles/RFAConversionApp"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/da/us-east/v3/activities/RFAConversionActivity"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(
            client
                .delete_resource(ResourceKind::Activity, "RFAConversionActivity", Some("prod"))
                .await
                .unwrap(),
            DeleteOutcome::Absent
        );
        assert_eq!(
            client
                .delete_resource(ResourceKind::AppBundle, "RFAConversionApp", None)
                .await
                .unwrap(),
            DeleteOutcome::Deleted
        );
        let err = client
            .delete_resource(ResourceKind::Activity, "RFAConversionActivity", None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn list_follows_pagination_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/da/us-east/v3/appbundles"))
            .and(query_param("page", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "paginationToken": null,
                "data": ["3DImgClass.RFAConversionApp+prod"]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/da/us-east/v3/appbundles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "paginationToken": "p2",
                "data": ["Autodesk.Sample+prod"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let ids = client.list_resources(ResourceKind::AppBundle).await.unwrap();
        assert_eq!(ids, vec!["Autodesk.Sample+prod", "3DImgClass.RFAConversionApp+prod"]);
    }

    #[tokio::test]
    async fn upload_posts_multipart_without_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bucket"))
            .and(header_exists("content-type"))
            .and(body_string_contains("name=\"policy\""))
            .and(body_string_contains("name=\"file\"; filename=\"bundle.zip\""))
            .and(body_string_contains("ZIPBYTES"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let params = UploadParameters {
            endpoint_url: format!("{}/bucket", server.uri()),
            form_data: BTreeMap::from([("policy".to_string(), "abc".to_string())]),
        };
        client
            .upload_app_bundle(&params, b"ZIPBYTES".to_vec())
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn upload_rejection_is_upload_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bucket"))
            .respond_with(ResponseTemplate::new(403).set_body_string("AccessDenied"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let params = UploadParameters {
            endpoint_url: format!("{}/bucket", server.uri()),
            form_data: BTreeMap::new(),
        };
        let err = client.upload_app_bundle(&params, vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, ApiError::Upload { status: 403, .. }));
    }

    #[tokio::test]
    async fn alias_and_activity_creation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/da/us-east/v3/activities/RFAConversionActivity/aliases"))
            .and(body_json(json!({ "id": "prod", "version": 1 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "prod", "version": 1 })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/da/us-east/v3/activities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "RFAConversionActivity",
                "version": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let activity = Activity {
            id: "RFAConversionActivity".into(),
            appbundles: vec!["3DImgClass.RFAConversionApp+prod".into()],
            command_line: vec!["$(engine.path)\\revit.exe".into()],
            engine: "Autodesk.Revit+2025".into(),
            parameters: BTreeMap::from([(
                "inputFile".to_string(),
                crate::da::types::Parameter {
                    verb: Verb::Get,
                    description: "in".into(),
                    required: true,
                    local_name: "families.zip".into(),
                },
            )]),
        };
        let created = client.create_activity(&activity).await.unwrap();
        assert_eq!(created.version, Some(1));
        client
            .create_alias(
                ResourceKind::Activity,
                "RFAConversionActivity",
                &Alias { id: "prod".into(), version: 1 },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn pagination_stops_when_tokens_cycle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/da/us-east/v3/activities"))
            .and(query_param("page", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "paginationToken": "p3",
                "data": ["b"]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/da/us-east/v3/activities"))
            .and(query_param("page", "p3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "paginationToken": "p2",
                "data": ["c"]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/da/us-east/v3/activities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "paginationToken": "p2",
                "data": ["a"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let ids = client.list_resources(ResourceKind::Activity).await.unwrap();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn creation_reply_without_status_is_pending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/da/us-east/v3/workitems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "wi-42" })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let item = WorkItem::new("RFAConversionActivity+prod", "https://in", "https://out");
        let created = client.create_work_item(&item).await.unwrap();
        assert_eq!(created.id, "wi-42");
        assert_eq!(created.status, WorkItemStatus::Pending);
    }

    #[tokio::test]
    async fn creation_reply_without_id_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/da/us-east/v3/workitems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "pending" })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let item = WorkItem::new("RFAConversionActivity+prod", "https://in", "https://out");
        let err = client.create_work_item(&item).await.unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }

    #[tokio::test]
    async fn status_read_without_id_keeps_requested_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/da/us-east/v3/workitems/wi-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "inprogress" })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let details = client.get_work_item("wi-7").await.unwrap();
        assert_eq!(details.id, "wi-7");
        assert_eq!(details.status, WorkItemStatus::InProgress);
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/da/us-east/v3/workitems/wi-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.get_work_item("wi-1").await.unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }
}
