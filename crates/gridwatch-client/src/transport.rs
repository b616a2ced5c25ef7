//! HTTP transport for the control-plane API.
//!
//! Issues plain `GET` requests through a pooled hyper client and decodes
//! JSON bodies. Requests carry no timeout of their own; the transport
//! defaults apply.

use bytes::Bytes;
use http::header::{ACCEPT, USER_AGENT};
use http::{Method, Request, Uri};
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::client::{ClientFuture, ControlPlane};
use crate::error::{ClientError, ClientResult};
use crate::options::ReadOptions;
use crate::types::*;

const TOKEN_HEADER: &str = "X-Nomad-Token";

/// Control-plane client speaking the HTTP API.
#[derive(Clone)]
pub struct HttpControlPlane {
    /// Address as configured, e.g. `http://127.0.0.1:4646`.
    address: String,
    /// Address without a trailing slash, used as the URL prefix.
    base: String,
    token: Option<String>,
    client: Client<HttpConnector, Empty<Bytes>>,
}

impl HttpControlPlane {
    /// Create a client for the given `http://host:port` address.
    pub fn new(address: &str, token: Option<String>) -> ClientResult<Self> {
        let uri: Uri = address.parse().map_err(|e: http::uri::InvalidUri| {
            ClientError::InvalidAddress {
                address: address.to_string(),
                reason: e.to_string(),
            }
        })?;

        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => {
                return Err(ClientError::InvalidAddress {
                    address: address.to_string(),
                    reason: format!("unsupported scheme {other}"),
                });
            }
            None => {
                return Err(ClientError::InvalidAddress {
                    address: address.to_string(),
                    reason: "missing scheme".to_string(),
                });
            }
        }
        if uri.authority().is_none() {
            return Err(ClientError::InvalidAddress {
                address: address.to_string(),
                reason: "missing host".to_string(),
            });
        }

        let client = Client::builder(TokioExecutor::new()).build_http();

        Ok(Self {
            address: address.to_string(),
            base: address.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            client,
        })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{}{}", self.base, path);
        for (i, (key, value)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(&str, String)>,
    ) -> ClientResult<T> {
        let url = self.url(path, &query);

        let mut builder = Request::builder()
            .method(Method::GET)
            .uri(&url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, "gridwatch/0.1");
        if let Some(token) = &self.token {
            builder = builder.header(TOKEN_HEADER, token);
        }
        let req = builder
            .body(Empty::<Bytes>::new())
            .map_err(|e| ClientError::Request {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        trace!(%url, "control-plane request");

        let resp = self
            .client
            .request(req)
            .await
            .map_err(|e| ClientError::Transport {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ClientError::Transport {
                path: path.to_string(),
                reason: e.to_string(),
            })?
            .to_bytes();

        if !status.is_success() {
            return Err(ClientError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }

        serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for HttpControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpControlPlane")
            .field("address", &self.address)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ControlPlane for HttpControlPlane {
    fn address(&self) -> &str {
        &self.address
    }

    fn leader(&self) -> ClientFuture<'_, String> {
        Box::pin(self.get_json::<String>("/v1/status/leader", Vec::new()))
    }

    fn peers(&self) -> ClientFuture<'_, Vec<String>> {
        Box::pin(self.get_json::<Vec<String>>("/v1/status/peers", Vec::new()))
    }

    fn list_nodes(&self, opts: ReadOptions) -> ClientFuture<'_, Vec<NodeListStub>> {
        Box::pin(self.get_json::<Vec<NodeListStub>>("/v1/nodes", opts.query_pairs()))
    }

    fn node_info<'a>(&'a self, node_id: &'a str, opts: ReadOptions) -> ClientFuture<'a, Node> {
        Box::pin(async move {
            self.get_json::<Node>(&format!("/v1/node/{node_id}"), opts.query_pairs())
                .await
        })
    }

    fn node_allocations<'a>(
        &'a self,
        node_id: &'a str,
        opts: ReadOptions,
    ) -> ClientFuture<'a, Vec<Allocation>> {
        Box::pin(async move {
            self.get_json::<Vec<Allocation>>(&format!("/v1/node/{node_id}/allocations"), opts.query_pairs())
                .await
        })
    }

    fn node_stats<'a>(
        &'a self,
        node_id: &'a str,
        opts: ReadOptions,
    ) -> ClientFuture<'a, HostStats> {
        Box::pin(async move {
            let mut query = vec![("node_id", node_id.to_string())];
            query.extend(opts.query_pairs());
            self.get_json::<HostStats>("/v1/client/stats", query).await
        })
    }

    fn list_allocations(&self, opts: ReadOptions) -> ClientFuture<'_, Vec<AllocationListStub>> {
        Box::pin(self.get_json::<Vec<AllocationListStub>>("/v1/allocations", opts.query_pairs()))
    }

    fn allocation_info<'a>(
        &'a self,
        alloc_id: &'a str,
        opts: ReadOptions,
    ) -> ClientFuture<'a, Allocation> {
        Box::pin(async move {
            self.get_json::<Allocation>(&format!("/v1/allocation/{alloc_id}"), opts.query_pairs())
                .await
        })
    }

    fn allocation_stats<'a>(
        &'a self,
        alloc: &'a Allocation,
        opts: ReadOptions,
    ) -> ClientFuture<'a, AllocResourceUsage> {
        Box::pin(async move {
            self.get_json::<AllocResourceUsage>(
                &format!("/v1/client/allocation/{}/stats", alloc.id),
                opts.query_pairs(),
            )
            .await
        })
    }

    fn list_jobs(&self, opts: ReadOptions) -> ClientFuture<'_, Vec<JobListStub>> {
        Box::pin(self.get_json::<Vec<JobListStub>>("/v1/jobs", opts.query_pairs()))
    }

    fn list_evaluations(&self, opts: ReadOptions) -> ClientFuture<'_, Vec<Evaluation>> {
        Box::pin(self.get_json::<Vec<Evaluation>>("/v1/evaluations", opts.query_pairs()))
    }

    fn list_deployments(&self, opts: ReadOptions) -> ClientFuture<'_, Vec<Deployment>> {
        Box::pin(self.get_json::<Vec<Deployment>>("/v1/deployments", opts.query_pairs()))
    }

    fn agent_self(&self) -> ClientFuture<'_, AgentSelf> {
        Box::pin(self.get_json::<AgentSelf>("/v1/agent/self", Vec::new()))
    }
}
