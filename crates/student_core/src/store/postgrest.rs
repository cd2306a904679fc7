//! Hosted REST backend (PostgREST, as served by Supabase).
//!
//! Requests go to `<base>/rest/v1/<table>` with the project key sent both
//! as `apikey` and as a bearer token. Error bodies follow PostgREST's
//! `{code, message, details, hint}` shape.

use crate::config::RemoteConfig;
use crate::model::student::{NewStudent, Student};
use crate::store::{ListOrder, StoreError, StoreResult, StudentStore, UNIQUE_VIOLATION_CODE};
use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Instant;

const KEY_COLUMN: &str = "registration_no";

/// Error payload returned by PostgREST for non-2xx responses.
#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Store client for a hosted PostgREST table.
#[derive(Clone)]
pub struct PostgrestStore {
    client: reqwest::Client,
    endpoint: String,
}

impl PostgrestStore {
    /// Builds a client for `config`; no request is sent.
    pub fn new(config: &RemoteConfig) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .default_headers(auth_headers(config.api_key())?)
            .timeout(config.timeout())
            .build()
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.table_endpoint(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client.request(method, &self.endpoint)
    }

    fn insert_request(&self, student: &NewStudent) -> RequestBuilder {
        self.request(Method::POST)
            .query(&[("select", "*")])
            .header("Prefer", "return=representation")
            .json(&[student])
    }

    fn select_one_request(&self, registration_no: &str) -> RequestBuilder {
        self.request(Method::GET)
            .query(&[("select", "*".to_string()), (KEY_COLUMN, eq_filter(registration_no))])
    }

    fn select_all_request(&self, order: ListOrder) -> RequestBuilder {
        self.request(Method::GET)
            .query(&[("select", "*".to_string()), ("order", order_param(order))])
    }

    fn delete_request(&self, registration_no: &str) -> RequestBuilder {
        self.request(Method::DELETE)
            .query(&[(KEY_COLUMN, eq_filter(registration_no))])
    }

    async fn send(&self, op: &'static str, request: RequestBuilder) -> StoreResult<String> {
        let started_at = Instant::now();
        debug!("event=store_request module=store backend=postgrest op={op} status=start");

        let result = match request.send().await {
            Ok(response) => read_body(response).await,
            Err(err) => Err(transport_error(err)),
        };

        match &result {
            Ok(_) => info!(
                "event=store_request module=store backend=postgrest op={op} status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_request module=store backend=postgrest op={op} status=error duration_ms={} error_code={}",
                started_at.elapsed().as_millis(),
                err.log_code()
            ),
        }
        result
    }
}

#[async_trait]
impl StudentStore for PostgrestStore {
    async fn insert(&self, student: &NewStudent) -> StoreResult<Student> {
        let body = self.send("insert", self.insert_request(student)).await?;

        decode_rows(&body)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::InvalidData("insert returned no row".to_string()))
    }

    async fn select_one(&self, registration_no: &str) -> StoreResult<Option<Student>> {
        let body = self
            .send("select_one", self.select_one_request(registration_no))
            .await?;

        let mut rows = decode_rows(&body)?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            count => Err(StoreError::Api {
                status: None,
                code: None,
                message: format!("expected at most one row, got {count}"),
            }),
        }
    }

    async fn select_all(&self, order: ListOrder) -> StoreResult<Vec<Student>> {
        let body = self
            .send("select_all", self.select_all_request(order))
            .await?;
        decode_rows(&body)
    }

    async fn delete_where(&self, registration_no: &str) -> StoreResult<()> {
        self.send("delete_where", self.delete_request(registration_no))
            .await
            .map(|_| ())
    }
}

/// Project key sent on every request, as `apikey` and as a bearer token.
fn auth_headers(api_key: &str) -> StoreResult<HeaderMap> {
    let invalid = || StoreError::Transport("api key is not a valid header value".to_string());
    let mut headers = HeaderMap::new();
    headers.insert("apikey", HeaderValue::from_str(api_key).map_err(|_| invalid())?);
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| invalid())?,
    );
    Ok(headers)
}

async fn read_body(response: Response) -> StoreResult<String> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(error_from_response(status, &body))
    }
}

fn transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Transport("request timed out".to_string())
    } else {
        StoreError::Transport(err.to_string())
    }
}

/// Maps a non-2xx response to a store error.
///
/// Bodies that are not PostgREST error objects are treated as transport
/// failures (a proxy page, an empty gateway reply).
pub(crate) fn error_from_response(status: StatusCode, body: &str) -> StoreError {
    let parsed = serde_json::from_str::<PostgrestErrorBody>(body)
        .ok()
        .filter(|payload| payload.code.is_some() || payload.message.is_some());

    let Some(payload) = parsed else {
        return StoreError::Transport(format!("unexpected HTTP {} response", status.as_u16()));
    };

    let message = payload
        .message
        .unwrap_or_else(|| format!("request failed with HTTP {}", status.as_u16()));
    match payload.code {
        Some(code) if code == UNIQUE_VIOLATION_CODE => StoreError::Conflict { code, message },
        code => StoreError::Api {
            status: Some(status.as_u16()),
            code,
            message,
        },
    }
}

fn decode_rows(body: &str) -> StoreResult<Vec<Student>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(body).map_err(|err| StoreError::InvalidData(err.to_string()))
}

/// PostgREST equality filter value.
pub(crate) fn eq_filter(value: &str) -> String {
    format!("eq.{value}")
}

/// PostgREST `order` parameter value, e.g. `created_at.desc`.
pub(crate) fn order_param(order: ListOrder) -> String {
    let direction = if order.descending { "desc" } else { "asc" };
    format!("{}.{direction}", order.column.as_str())
}

#[cfg(test)]
mod tests {
    use super::{
        auth_headers, decode_rows, eq_filter, error_from_response, order_param, PostgrestStore,
    };
    use crate::config::RemoteConfig;
    use crate::model::student::NewStudent;
    use crate::store::{ListOrder, OrderColumn, StoreError, UNIQUE_VIOLATION_CODE};
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
    use reqwest::{Method, StatusCode};

    fn demo_store() -> PostgrestStore {
        let config = RemoteConfig::new("https://demo.supabase.co", "anon-key").unwrap();
        PostgrestStore::new(&config).unwrap()
    }

    #[test]
    fn insert_posts_single_row_array_and_asks_for_representation() {
        let student = NewStudent {
            registration_no: "REG010".to_string(),
            name: "Dana".to_string(),
            marks: 77,
        };
        let request = demo_store().insert_request(&student).build().unwrap();

        assert_eq!(*request.method(), Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://demo.supabase.co/rest/v1/students?select=*"
        );
        assert_eq!(request.headers()["Prefer"], "return=representation");
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        let body = request.body().and_then(|body| body.as_bytes()).unwrap();
        assert_eq!(
            std::str::from_utf8(body).unwrap(),
            r#"[{"registration_no":"REG010","name":"Dana","marks":77}]"#
        );
    }

    #[test]
    fn select_one_filters_on_encoded_registration_number() {
        let request = demo_store()
            .select_one_request("REG 001&x")
            .build()
            .unwrap();

        assert_eq!(*request.method(), Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://demo.supabase.co/rest/v1/students?select=*&registration_no=eq.REG+001%26x"
        );
        assert!(request.body().is_none());
    }

    #[test]
    fn select_all_orders_newest_first() {
        let request = demo_store()
            .select_all_request(ListOrder::NEWEST_FIRST)
            .build()
            .unwrap();

        assert_eq!(*request.method(), Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://demo.supabase.co/rest/v1/students?select=*&order=created_at.desc"
        );
    }

    #[test]
    fn delete_filters_on_registration_number_only() {
        let request = demo_store().delete_request("REG010").build().unwrap();

        assert_eq!(*request.method(), Method::DELETE);
        assert_eq!(
            request.url().as_str(),
            "https://demo.supabase.co/rest/v1/students?registration_no=eq.REG010"
        );
        assert!(request.body().is_none());
    }

    #[test]
    fn key_is_sent_as_apikey_and_bearer_token() {
        let headers = auth_headers("anon-key").unwrap();
        assert_eq!(headers["apikey"], "anon-key");
        assert_eq!(headers[AUTHORIZATION], "Bearer anon-key");

        assert!(matches!(
            auth_headers("bad\nkey"),
            Err(StoreError::Transport(_))
        ));
    }

    #[test]
    fn unique_violation_body_maps_to_conflict() {
        let body = r#"{"code":"23505","details":"Key (registration_no)=(REG001) already exists.","hint":null,"message":"duplicate key value violates unique constraint \"students_registration_no_key\""}"#;
        match error_from_response(StatusCode::CONFLICT, body) {
            StoreError::Conflict { code, message } => {
                assert_eq!(code, UNIQUE_VIOLATION_CODE);
                assert!(message.starts_with("duplicate key value"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn other_structured_bodies_keep_their_message() {
        let body = r#"{"code":"42501","details":null,"hint":null,"message":"permission denied for table students"}"#;
        match error_from_response(StatusCode::FORBIDDEN, body) {
            StoreError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, Some(403));
                assert_eq!(code.as_deref(), Some("42501"));
                assert_eq!(message, "permission denied for table students");
            }
            other => panic!("unexpected error: {other}"),
        }

        let gateway = r#"{"message":"Invalid API key"}"#;
        let err = error_from_response(StatusCode::UNAUTHORIZED, gateway);
        assert_eq!(err.store_message().as_deref(), Some("Invalid API key"));
    }

    #[test]
    fn unstructured_bodies_are_transport_errors() {
        let err = error_from_response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(err, StoreError::Transport(_)));
        assert_eq!(err.store_message(), None);

        let err = error_from_response(StatusCode::INTERNAL_SERVER_ERROR, "{}");
        assert!(matches!(err, StoreError::Transport(_)));
    }

    #[test]
    fn query_values_follow_postgrest_syntax() {
        assert_eq!(eq_filter("REG001"), "eq.REG001");
        assert_eq!(order_param(ListOrder::NEWEST_FIRST), "created_at.desc");
        assert_eq!(
            order_param(ListOrder {
                column: OrderColumn::CreatedAt,
                descending: false,
            }),
            "created_at.asc"
        );
    }

    #[test]
    fn rows_decode_and_empty_bodies_are_empty_lists() {
        let rows = decode_rows(
            r#"[{"id":2,"registration_no":"REG002","name":"Ari","marks":64,"created_at":"2025-01-02T00:00:00+00:00"},
                {"id":1,"registration_no":"REG001","name":"Bo","marks":91,"created_at":"2025-01-01T00:00:00+00:00"}]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].registration_no, "REG002");
        assert!(decode_rows("").unwrap().is_empty());
        assert!(matches!(
            decode_rows(r#"[{"id":"x"}]"#),
            Err(StoreError::InvalidData(_))
        ));
    }

    #[test]
    fn endpoint_targets_configured_table() {
        let config = RemoteConfig::new("https://demo.supabase.co/", "anon")
            .unwrap()
            .with_table("students_archive")
            .unwrap();
        let store = PostgrestStore::new(&config).unwrap();
        assert_eq!(
            store.endpoint(),
            "https://demo.supabase.co/rest/v1/students_archive"
        );
    }
}
