//! Resolves service hashes to app ids through the platform's public lookup
//! endpoint, with a bounded in-process cache in front of it.

use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{ParserError, Result};
use crate::metrics::ParserMetrics;

/// Maps an opaque service hash to the app id the service belongs to
pub trait ServiceResolver {
    fn resolve(&mut self, service_hash: &str) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct ServiceAppResponse {
    app_id: Option<String>,
}

/// Blocking HTTPS client for the service-app lookup endpoint
pub struct HttpServiceResolver {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpServiceResolver {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl ServiceResolver for HttpServiceResolver {
    #[instrument(skip(self))]
    fn resolve(&mut self, service_hash: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("user", service_hash)])
            .send()?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ParserError::Lookup {
                service_hash: service_hash.to_string(),
                status: status.as_u16(),
            });
        }

        let body: ServiceAppResponse = response.json()?;
        debug!(app_id = ?body.app_id, "resolved service hash");
        Ok(body.app_id)
    }
}

/// Memoizes another resolver in a fixed-capacity table. When full, the entry
/// inserted first is evicted. Failed lookups are not cached.
pub struct CachedResolver<R> {
    inner: R,
    capacity: usize,
    entries: HashMap<String, Option<String>>,
    order: VecDeque<String>,
}

impl<R: ServiceResolver> CachedResolver<R> {
    pub fn new(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn insert(&mut self, service_hash: &str, app_id: Option<String>) {
        if self.capacity == 0 {
            return;
        }
        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(service_hash.to_string());
        self.entries.insert(service_hash.to_string(), app_id);
    }
}

impl<R: ServiceResolver> ServiceResolver for CachedResolver<R> {
    fn resolve(&mut self, service_hash: &str) -> Result<Option<String>> {
        if let Some(app_id) = self.entries.get(service_hash) {
            ParserMetrics::record_cache_hit();
            return Ok(app_id.clone());
        }
        ParserMetrics::record_cache_miss();
        let app_id = self.inner.resolve(service_hash)?;
        self.insert(service_hash, app_id.clone());
        Ok(app_id)
    }
}
