use crate::error::AppResult;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Method;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn form(url: impl Into<String>, params: &[(&str, &str)]) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            bearer: None,
            body: RequestBody::Form(
                params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        }
    }

    /// Value of a form field, if this is a form request.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        match &self.body {
            RequestBody::Form(params) => params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> AppResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Seam between the controller and the network.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> AppResult<ApiResponse>;
}

pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent("Playerify/0.1.0")
            .build()?;

        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> AppResult<ApiResponse> {
        let mut builder = self.http.request(request.method, &request.url);

        if let Some(token) = &request.bearer {
            let auth_value = format!("Bearer {}", token);
            builder = builder.header(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| crate::error::AppError::Config(e.to_string()))?,
            );
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Form(params) => builder.form(&params),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        Ok(ApiResponse { status, body })
    }
}
