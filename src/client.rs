// 🌐 API Client - Granatum REST endpoints over a pluggable transport
//
// Transport is the seam: HttpTransport talks to the network (through the
// response cache), tests plug in a recording fake. ApiClient adds the base
// URL, the access token, status checking and JSON decoding.

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::ApiError;
use crate::schema::{decode_records, Decoded, EntitySchema};
use anyhow::{Context, Result};
use log::debug;
use serde_json::Value;
use std::time::Duration;

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// ENDPOINTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Contas,
    Categorias,
    CentrosCustoLucro,
    FormasPagamento,
    Clientes,
    Fornecedores,
    Lancamentos,
}

impl Endpoint {
    /// URL path segment, also used as the table name on disk
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Contas => "contas",
            Endpoint::Categorias => "categorias",
            Endpoint::CentrosCustoLucro => "centros_custo_lucro",
            Endpoint::FormasPagamento => "formas_pagamento",
            Endpoint::Clientes => "clientes",
            Endpoint::Fornecedores => "fornecedores",
            Endpoint::Lancamentos => "lancamentos",
        }
    }
}

// ============================================================================
// TRANSPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
    pub from_cache: bool,
}

/// One synchronous GET. Implementations must not retry.
pub trait Transport {
    fn get(&mut self, url: &str, params: &[(String, String)]) -> Result<ApiResponse>;
}

/// reqwest (blocking) transport with an optional response cache in front
pub struct HttpTransport {
    http: reqwest::blocking::Client,
    cache: Option<ResponseCache>,
}

impl HttpTransport {
    pub fn new(cache: Option<ResponseCache>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(HttpTransport { http, cache })
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }
}

impl Transport for HttpTransport {
    fn get(&mut self, url: &str, params: &[(String, String)]) -> Result<ApiResponse> {
        let key = ResponseCache::key(url, params);

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key)? {
                debug!("cache hit for {} (stored {})", hit.url, hit.created_at);
                return Ok(ApiResponse {
                    status: hit.status,
                    body: hit.body,
                    from_cache: true,
                });
            }
        }

        let response = self
            .http
            .get(url)
            .query(params)
            .send()
            .with_context(|| format!("GET {} failed", url))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .with_context(|| format!("Failed to read body of {}", url))?;

        if let Some(cache) = &self.cache {
            cache.put(&key, url, status, &body)?;
        }

        Ok(ApiResponse {
            status,
            body,
            from_cache: false,
        })
    }
}

// ============================================================================
// API CLIENT
// ============================================================================

pub struct ApiClient<T: Transport> {
    transport: T,
    base_url: String,
    token: String,
    requests: usize,
    cache_hits: usize,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, base_url: &str, token: &str) -> Self {
        ApiClient {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            requests: 0,
            cache_hits: 0,
        }
    }

    pub fn from_config(config: &Config, transport: T) -> Self {
        Self::new(transport, &config.base_url, &config.token)
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }

    /// GET an endpoint and parse the body as JSON. Non-200 is an error.
    pub fn get_json(&mut self, endpoint: Endpoint, params: &[(&str, String)]) -> Result<Value> {
        let url = self.url(endpoint);

        let mut query = Vec::with_capacity(params.len() + 1);
        query.push(("access_token".to_string(), self.token.clone()));
        query.extend(params.iter().map(|(k, v)| (k.to_string(), v.clone())));

        let response = self.transport.get(&url, &query)?;
        self.requests += 1;
        if response.from_cache {
            self.cache_hits += 1;
        }

        debug!(
            "GET {} {:?} -> {} (used cache: {})",
            endpoint.path(),
            params,
            response.status,
            response.from_cache
        );

        if response.status != 200 {
            return Err(ApiError::Status {
                endpoint: endpoint.path().to_string(),
                status: response.status,
                body: response.body,
            }
            .into());
        }

        serde_json::from_str(&response.body)
            .with_context(|| format!("{} returned invalid JSON", endpoint.path()))
    }

    /// Whole (unpaginated) reference collection, decoded through its schema
    pub fn fetch_collection<E: EntitySchema>(&mut self, endpoint: Endpoint) -> Result<Decoded<E>> {
        let payload = self.get_json(endpoint, &[])?;
        decode_records(endpoint.path(), payload)
    }

    /// (requests issued, of which served from cache)
    pub fn stats(&self) -> (usize, usize) {
        (self.requests, self.cache_hits)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

// ============================================================================
// TEST TRANSPORT
// ============================================================================
