//! Vehicle definition lookups (makes, models, years) for cascading selection.
//!
//! ```rust,no_run
//! use carlog::prelude::*;
//! # async fn example(client: &CarlogClient) -> Result<(), CarlogError> {
//! let makes = client.vehicle_definitions().year(2018).makes().await?;
//! let models = client.vehicle_definitions().make("Toyota").year(2018).models().await?;
//! let years = client.vehicle_definitions().make("Toyota").model("Corolla").years().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::{Result, client::CarlogClient, http_client::HttpClient};

/// The kind of definition being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DefinitionKind {
    Makes,
    Models,
    Years,
}

/// Request builder for vehicle definition lookups.
///
/// Obtained via [`CarlogClient::vehicle_definitions`]. Filters that do not
/// apply to a lookup are still sent; the backend ignores them.
#[derive(Debug)]
pub struct DefinitionsRequest {
    client: Arc<HttpClient>,
    make: Option<String>,
    model: Option<String>,
    year: Option<i32>,
}

impl DefinitionsRequest {
    pub(crate) fn new(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            make: None,
            model: None,
            year: None,
        }
    }

    pub fn make(mut self, make: impl Into<String>) -> Self {
        self.make = Some(make.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    fn query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(make) = &self.make {
            query.push(("make".to_string(), make.clone()));
        }
        if let Some(model) = &self.model {
            query.push(("model".to_string(), model.clone()));
        }
        if let Some(year) = self.year {
            query.push(("year".to_string(), year.to_string()));
        }
        query
    }

    fn path(kind: DefinitionKind) -> String {
        format!("/vehicle-definitions/{kind}")
    }

    /// Known makes, optionally for a year.
    pub async fn makes(self) -> Result<Vec<String>> {
        self.client
            .get_request(&Self::path(DefinitionKind::Makes), self.query())
            .await
    }

    /// Known models of a make, optionally for a year.
    pub async fn models(self) -> Result<Vec<String>> {
        self.client
            .get_request(&Self::path(DefinitionKind::Models), self.query())
            .await
    }

    /// Known model years, optionally for a make and model.
    pub async fn years(self) -> Result<Vec<i32>> {
        self.client
            .get_request(&Self::path(DefinitionKind::Years), self.query())
            .await
    }

    /// Lookup of any kind, with all values rendered as strings.
    pub async fn lookup(self, kind: DefinitionKind) -> Result<Vec<String>> {
        match kind {
            DefinitionKind::Makes => self.makes().await,
            DefinitionKind::Models => self.models().await,
            DefinitionKind::Years => Ok(self
                .years()
                .await?
                .into_iter()
                .map(|y| y.to_string())
                .collect()),
        }
    }
}

impl CarlogClient {
    /// Creates a request builder for vehicle definition lookups.
    pub fn vehicle_definitions(&self) -> DefinitionsRequest {
        DefinitionsRequest::new(self.client.clone())
    }
}
