use std::time::Duration;

use anyhow::{Context, anyhow};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::model::Collection;

use super::Collections;

/// Client for a PostgREST-convention collection service (the hosted store
/// the original deployment ran against). Requests carry the service key and
/// a hard timeout; a timed-out call surfaces as an ordinary remote failure.
#[derive(Debug)]
pub struct RestCollections {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestCollections {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection.table())
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// One row out of a `return=representation` response.
    fn single_row(
        op: &str,
        collection: Collection,
        response: Response,
    ) -> anyhow::Result<Value> {
        let rows: Vec<Value> = response
            .json()
            .with_context(|| format!("{op} on {} returned unreadable body", collection.table()))?;
        rows.into_iter().next().ok_or_else(|| {
            anyhow!(
                "{op} on {} returned no representation",
                collection.table()
            )
        })
    }
}

impl Collections for RestCollections {
    #[tracing::instrument(skip(self))]
    fn select(&self, collection: Collection) -> anyhow::Result<Vec<Value>> {
        let mut request = self
            .authed(self.client.get(self.endpoint(collection)))
            .query(&[("select", "*")]);
        if collection.newest_first() {
            request = request.query(&[("order", "created_at.desc")]);
        }

        let response = send(request, "select", collection)?;
        let rows: Vec<Value> = response
            .json()
            .with_context(|| format!("select on {} returned unreadable body", collection.table()))?;
        debug!(collection = %collection, count = rows.len(), "remote select");
        Ok(rows)
    }

    #[tracing::instrument(skip(self, row))]
    fn insert(&self, collection: Collection, row: Value) -> anyhow::Result<Value> {
        let request = self
            .authed(self.client.post(self.endpoint(collection)))
            .header("Prefer", "return=representation")
            .json(&row);

        let response = send(request, "insert", collection)?;
        Self::single_row("insert", collection, response)
    }

    #[tracing::instrument(skip(self, row))]
    fn upsert(
        &self,
        collection: Collection,
        row: Value,
        conflict_key: &str,
    ) -> anyhow::Result<Value> {
        let request = self
            .authed(self.client.post(self.endpoint(collection)))
            .header("Prefer", "return=representation,resolution=merge-duplicates")
            .query(&[("on_conflict", conflict_key)])
            .json(&row);

        let response = send(request, "upsert", collection)?;
        Self::single_row("upsert", collection, response)
    }

    #[tracing::instrument(skip(self))]
    fn delete(&self, collection: Collection, id: Uuid) -> anyhow::Result<()> {
        let request = self
            .authed(self.client.delete(self.endpoint(collection)))
            .query(&[("id", format!("eq.{id}"))]);

        send(request, "delete", collection)?;
        Ok(())
    }
}

/// Issues the request and turns any non-2xx status into an error carrying
/// the service's message body.
fn send(request: RequestBuilder, op: &str, collection: Collection) -> anyhow::Result<Response> {
    let response = request
        .send()
        .with_context(|| format!("{op} on {} did not reach the service", collection.table()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let message = body.trim();
    if message.is_empty() {
        Err(anyhow!("{op} on {} failed: {status}", collection.table()))
    } else {
        Err(anyhow!(
            "{op} on {} failed: {status}: {message}",
            collection.table()
        ))
    }
}
