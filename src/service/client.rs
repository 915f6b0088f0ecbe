//! Blocking REST client for the geoprocessing service.
//!
//! One HTTP call per pipeline operation: catalog search, region statistics,
//! export submission, and job polling. Service-side failures are surfaced
//! verbatim; 401/403 map to authentication errors.
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::auth::{Credentials, ServiceAccountKey};
use super::models::{
    BandStats, ExportJob, ExportRequest, JobStatus, SceneMeta, SceneQuery, StatsRequest,
};
use super::ImageService;
use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://earthengine.googleapis.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RestService {
    http: reqwest::blocking::Client,
    base_url: String,
    project: String,
    token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    client_email: &'a str,
    private_key: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    scenes: Vec<SceneMeta>,
}

#[derive(Deserialize)]
struct StatsResponse {
    stats: BandStats,
}

#[derive(Deserialize)]
struct OperationName {
    name: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl RestService {
    /// Connect to the production endpoint: exchange the service-account key
    /// for a bearer token (when present) and verify project access.
    pub fn connect(credentials: &Credentials) -> Result<Self> {
        Self::connect_to(DEFAULT_BASE_URL, credentials)
    }

    pub fn connect_to(base_url: &str, credentials: &Credentials) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let token = match &credentials.key {
            Some(key) => Some(Self::exchange_token(&http, base_url, key)?),
            None => None,
        };

        let service = Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            project: credentials.project.clone(),
            token,
        };
        service.verify()?;
        Ok(service)
    }

    fn exchange_token(
        http: &reqwest::blocking::Client,
        base_url: &str,
        key: &ServiceAccountKey,
    ) -> Result<String> {
        let url = format!("{}/v1/token", base_url.trim_end_matches('/'));
        let response = http
            .post(url)
            .json(&TokenRequest {
                client_email: &key.client_email,
                private_key: &key.private_key,
            })
            .send()?;
        if !response.status().is_success() {
            return Err(Error::Auth(format!(
                "token exchange rejected for {} ({})",
                key.client_email,
                response.status()
            )));
        }
        let token: TokenResponse = response.json()?;
        Ok(token.access_token)
    }

    /// Cheap connection check before any stage runs.
    fn verify(&self) -> Result<()> {
        let url = format!("{}/v1/projects/{}", self.base_url, self.project);
        let response = self.authorized(self.http.get(url)).send()?;
        match response.status() {
            s if s.is_success() => {
                debug!(project = %self.project, "service connection verified");
                Ok(())
            }
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Err(Error::Auth(format!(
                    "project '{}' rejected the credentials",
                    self.project
                )))
            }
            _ => Err(Self::service_error(response)),
        }
    }

    fn authorized(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn project_url(&self, op: &str) -> String {
        format!("{}/v1/projects/{}/{}", self.base_url, self.project, op)
    }

    fn post_json<B: Serialize, R: DeserializeOwned>(&self, url: String, body: &B) -> Result<R> {
        let response = self.authorized(self.http.post(url)).json(body).send()?;
        Self::parse(response)
    }

    fn get_json<R: DeserializeOwned>(&self, url: String) -> Result<R> {
        let response = self.authorized(self.http.get(url)).send()?;
        Self::parse(response)
    }

    fn parse<R: DeserializeOwned>(response: reqwest::blocking::Response) -> Result<R> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json()?);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Auth(format!("request rejected with {status}")));
        }
        Err(Self::service_error(response))
    }

    /// Surface the remote failure message verbatim.
    fn service_error(response: reqwest::blocking::Response) -> Error {
        let status = response.status();
        match response.json::<ErrorBody>() {
            Ok(body) => Error::service(body.error.message),
            Err(_) => Error::service(format!("request failed with {status}")),
        }
    }
}

impl ImageService for RestService {
    fn search_scenes(&self, query: &SceneQuery) -> Result<Vec<SceneMeta>> {
        let response: SearchResponse =
            self.post_json(self.project_url("scenes:search"), query)?;
        Ok(response.scenes)
    }

    fn compute_region_stats(&self, request: &StatsRequest) -> Result<BandStats> {
        let response: StatsResponse =
            self.post_json(self.project_url("value:compute"), request)?;
        Ok(response.stats)
    }

    fn start_export(&self, request: &ExportRequest) -> Result<ExportJob> {
        let operation: OperationName =
            self.post_json(self.project_url("image:export"), request)?;
        debug!(name = %operation.name, description = %request.description, "export started");
        Ok(ExportJob {
            name: operation.name,
            description: request.description.clone(),
        })
    }

    fn poll_job(&self, name: &str) -> Result<JobStatus> {
        self.get_json(format!("{}/v1/{}", self.base_url, name))
    }
}
