use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DashboardError, Result};
use crate::models::{
    AddClassForm, ClassSession, StarForm, StarPatch, StarRecord, Supervisor, SurveySettings,
};

const USER_AGENT: &str = concat!("star-dashboard/", env!("CARGO_PKG_VERSION"));

/// Supervisors and star records fetched together.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    pub supervisors: Vec<Supervisor>,
    pub stars: Vec<StarRecord>,
}

/// The class endpoint answers with a bare object when only one class exists.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DashboardError::Config(format!("invalid API URL `{base_url}`: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(DashboardError::Config(format!(
                "`{base_url}` cannot be used as a base URL"
            )));
        }
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DashboardError::Network(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    /// Appends path segments, percent-encoding each one.
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), body = %body, "request rejected");
        Err(DashboardError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.url(segments);
        tracing::debug!(url = %url, "GET");
        let response = self.http.get(url).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Mutation responses are free-form confirmations.
    async fn confirmation(response: Response) -> Result<Value> {
        let text = Self::check(response).await?.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        segments: &[&str],
        body: &B,
    ) -> Result<Value> {
        let url = self.url(segments);
        tracing::debug!(%method, url = %url, "sending");
        let response = self.http.request(method, url).json(body).send().await?;
        Self::confirmation(response).await
    }

    async fn delete(&self, segments: &[&str]) -> Result<Value> {
        let url = self.url(segments);
        tracing::debug!(url = %url, "DELETE");
        let response = self.http.delete(url).send().await?;
        Self::confirmation(response).await
    }

    pub async fn list_supervisors(&self) -> Result<Vec<Supervisor>> {
        self.get_json(&["supervisors"]).await
    }

    pub async fn create_supervisor(&self, supervisor: &Supervisor) -> Result<Value> {
        self.send_json(reqwest::Method::POST, &["supervisors"], supervisor)
            .await
    }

    pub async fn update_supervisor(&self, id: &str, supervisor: &Supervisor) -> Result<Value> {
        self.send_json(reqwest::Method::PUT, &["supervisors", id], supervisor)
            .await
    }

    pub async fn delete_supervisor(&self, id: &str) -> Result<Value> {
        self.delete(&["supervisors", id]).await
    }

    pub async fn list_stars(&self) -> Result<Vec<StarRecord>> {
        self.get_json(&["stars"]).await
    }

    /// The whole batch is sent in one request.
    pub async fn create_stars(&self, batch: &[StarForm]) -> Result<Value> {
        tracing::info!(records = batch.len(), "submitting star batch");
        self.send_json(reqwest::Method::POST, &["stars"], batch).await
    }

    pub async fn soft_delete_star(&self, id: &str) -> Result<Value> {
        self.send_json(
            reqwest::Method::PUT,
            &["stars", id],
            &StarPatch { valid: false },
        )
        .await
    }

    pub async fn list_classes(&self) -> Result<Vec<ClassSession>> {
        let classes: OneOrMany<ClassSession> = self.get_json(&["class"]).await?;
        Ok(classes.into())
    }

    pub async fn create_class(&self, form: &AddClassForm) -> Result<Value> {
        self.send_json(reqwest::Method::POST, &["class"], form).await
    }

    pub async fn delete_class(&self, id: &str) -> Result<Value> {
        self.delete(&["class", id]).await
    }

    pub async fn get_settings(&self) -> Result<SurveySettings> {
        self.get_json(&["init"]).await
    }

    pub async fn update_settings(&self, settings: &SurveySettings) -> Result<Value> {
        self.send_json(reqwest::Method::PUT, &["init"], settings).await
    }

    /// Fetches both collections concurrently. Fails as a whole if either
    /// request fails.
    pub async fn load_roster(&self) -> Result<Roster> {
        let (supervisors, stars) = tokio::try_join!(self.list_supervisors(), self.list_stars())?;
        tracing::info!(
            supervisors = supervisors.len(),
            stars = stars.len(),
            "roster loaded"
        );
        Ok(Roster { supervisors, stars })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Json, Path};
    use axum::http::StatusCode;
    use axum::routing::{get, put};
    use axum::Router;
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn roster_router() -> Router {
        Router::new()
            .route(
                "/supervisors",
                get(|| async {
                    Json(json!([
                        {"id": "A1", "name": "甲", "branchCode": "03"},
                        {"id": "A2", "name": "乙", "branchCode": "99"}
                    ]))
                }),
            )
            .route(
                "/stars",
                get(|| async {
                    Json(json!([
                        {"_id": "s1", "supervisorId": "A1", "score": 5, "type": "1",
                         "date": "2025-04-01T00:00:00.000Z", "valid": true},
                        {"_id": "s2", "supervisorId": "A1", "score": 3, "type": "1",
                         "date": "2025-04-02T00:00:00.000Z", "valid": false}
                    ]))
                })
                .post(|Json(body): Json<Value>| async move {
                    let count = body.as_array().map(Vec::len).unwrap_or(0);
                    let first = body.get(0).cloned().unwrap_or(Value::Null);
                    (
                        StatusCode::CREATED,
                        Json(json!({"inserted": count, "first": first})),
                    )
                }),
            )
            .route(
                "/stars/:id",
                put(|Path(id): Path<String>, Json(body): Json<Value>| async move {
                    Json(json!({"id": id, "valid": body["valid"]}))
                }),
            )
    }

    #[tokio::test]
    async fn load_roster_fetches_both_collections() {
        let base = serve(roster_router()).await;
        let client = ApiClient::new(&base).unwrap();
        let roster = client.load_roster().await.unwrap();
        assert_eq!(roster.supervisors.len(), 2);
        assert_eq!(roster.stars.len(), 2);
        assert_eq!(roster.stars[0].id, "s1");
        assert!(!roster.stars[1].is_valid());
    }

    #[tokio::test]
    async fn load_roster_fails_when_either_request_fails() {
        let router = Router::new()
            .route("/supervisors", get(|| async { Json(json!([])) }))
            .route(
                "/stars",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );
        let base = serve(router).await;
        let client = ApiClient::new(&base).unwrap();
        let err = client.load_roster().await.unwrap_err();
        assert!(err.is_network());
        assert!(matches!(err, DashboardError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn create_stars_posts_whole_batch() {
        let base = serve(roster_router()).await;
        let client = ApiClient::new(&base).unwrap();
        let date = crate::models::parse_wire_date("2025-04-01").unwrap();
        let batch = vec![
            StarForm {
                supervisor_id: "A1".into(),
                score: 2,
                kind: "3".into(),
                date,
                remarks: "good".into(),
            },
            StarForm {
                supervisor_id: "A2".into(),
                score: 1,
                kind: "3".into(),
                date,
                remarks: String::new(),
            },
        ];
        let reply = client.create_stars(&batch).await.unwrap();
        assert_eq!(reply["inserted"], 2);
        assert_eq!(reply["first"]["supervisorId"], "A1");
        assert_eq!(reply["first"]["date"], "2025-03-31T16:00:00.000Z");
    }

    #[tokio::test]
    async fn soft_delete_marks_record_invalid() {
        let base = serve(roster_router()).await;
        let client = ApiClient::new(&base).unwrap();
        let reply = client.soft_delete_star("s1").await.unwrap();
        assert_eq!(reply, json!({"id": "s1", "valid": false}));
    }

    #[tokio::test]
    async fn single_class_object_is_accepted() {
        let router = Router::new().route(
            "/class",
            get(|| async {
                Json(json!({"_id": "c1", "date": "04/01/2025", "startTime": "09:00",
                            "endTime": "10:00", "name": "Excel", "type": "1"}))
            }),
        );
        let base = serve(router).await;
        let client = ApiClient::new(&base).unwrap();
        let classes = client.list_classes().await.unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].id, "c1");
    }

    #[tokio::test]
    async fn empty_settings_document_uses_defaults() {
        let router = Router::new().route("/init", get(|| async { Json(json!({})) }));
        let base = serve(router).await;
        let client = ApiClient::new(&base).unwrap();
        assert_eq!(client.get_settings().await.unwrap(), SurveySettings::default());
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = ApiClient::new(&format!("http://{addr}")).unwrap();
        let err = client.list_supervisors().await.unwrap_err();
        assert!(matches!(err, DashboardError::Network(_)));
    }

    #[test]
    fn path_segments_are_escaped() {
        let client = ApiClient::new("http://localhost:8080/api/").unwrap();
        assert_eq!(
            client.url(&["supervisors", "A 1/2"]).as_str(),
            "http://localhost:8080/api/supervisors/A%201%2F2"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(DashboardError::Config(_))
        ));
    }
}
