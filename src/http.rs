use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use urlencoding::encode;

use crate::copy::{FieldDefinition, RecordStore};
use crate::error::{Error, Result};
use crate::pages::PageSource;
use crate::reconcile::ListDefinition;
use crate::resource::Resource;
use crate::session::Session;
use crate::Record;

const USER_AGENT: &str = concat!("rowport/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "Result")]
    result: T,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(rename = "Result", default)]
    result: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "Message")]
    message: String,
}

/// Authenticated JSON client for the backend's REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    session: Session,
}

impl ApiClient {
    pub fn new(session: &Session) -> Result<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            session: session.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.session.base_url()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.session.base_url(), path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.http.get(self.url(path))).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .bearer_auth(self.session.token())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::transport(
                Some(status.as_u16()),
                error_message(status, &body),
            ));
        }

        response.json::<T>().await.map_err(|err| {
            Error::transport(
                Some(status.as_u16()),
                format!("failed to decode response: {err}"),
            )
        })
    }
}

/// Backend `Message` when the error body carries one, else the raw body.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.message;
    }
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

#[async_trait]
impl PageSource for ApiClient {
    async fn fetch_page(&self, resource: &Resource, query: &str) -> Result<Vec<Record>> {
        let path = format!("{}{query}", resource.records_path());
        debug!(%path, "GET records");
        let page: Envelope<Vec<Record>> = self.get(&path).await?;
        Ok(page.result)
    }
}

#[async_trait]
impl RecordStore for ApiClient {
    async fn table_definition(&self, table: &str) -> Result<Vec<FieldDefinition>> {
        let path = format!("{}/fields", Resource::table(table).collection_path());
        let definition: Envelope<Vec<FieldDefinition>> = self.get(&path).await?;
        Ok(definition.result)
    }

    async fn list_definition(&self, table: &str, field: &str) -> Result<ListDefinition> {
        let path = format!(
            "{}/fields/{}/list",
            Resource::table(table).collection_path(),
            encode(field)
        );
        let definition: Envelope<Value> = self.get(&path).await?;
        ListDefinition::from_json(&definition.result)
    }

    async fn create_record(&self, table: &str, record: &Record) -> Result<Option<Record>> {
        let path = format!("{}?response=rows", Resource::table(table).records_path());
        let created: CreateResponse = self.post(&path, record).await?;
        Ok(created.result.into_iter().next())
    }
}
