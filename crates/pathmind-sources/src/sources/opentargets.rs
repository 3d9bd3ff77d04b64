//! OpenTargets Platform GraphQL client.
//!
//! Supplies mechanism-of-action direction (inhibitor, agonist, ...) per target
//! gene symbol, plus clinical phase and a mechanism summary for the compound.

use async_trait::async_trait;
use pathmind_common::entities::SourceHealth;
use pathmind_common::SourceError;
use serde_json::{json, Value};
use tracing::instrument;

use crate::resilience::{probe, ResilientClient};
use crate::{DrugMechanismInfo, MechanismSource, SourceProbe};

pub const SOURCE_NAME: &str = "opentargets";

const DRUG_QUERY: &str = r#"
query Drug($chemblId: String!) {
  drug(chemblId: $chemblId) {
    id
    name
    maximumClinicalTrialPhase
    mechanismsOfAction {
      rows {
        actionType
        description
        targets {
          approvedSymbol
          id
        }
      }
    }
  }
}
"#;

pub struct OpenTargetsClient {
    http: ResilientClient,
    graphql_url: String,
}

impl OpenTargetsClient {
    pub fn new(http: ResilientClient, graphql_url: &str) -> Self {
        Self { http, graphql_url: graphql_url.to_string() }
    }
}

#[async_trait]
impl SourceProbe for OpenTargetsClient {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    async fn ping(&self) -> SourceHealth {
        probe(self.http.post_json(&self.graphql_url, &json!({"query": "query { __typename }"}))).await
    }
}

#[async_trait]
impl MechanismSource for OpenTargetsClient {
    #[instrument(skip(self))]
    async fn fetch_drug_info(&self, chembl_id: &str) -> Result<DrugMechanismInfo, SourceError> {
        let body = json!({"query": DRUG_QUERY, "variables": {"chemblId": chembl_id}});
        let json = self.http.post_json(&self.graphql_url, &body).await?;
        Ok(parse_drug_info(&json))
    }
}

/// A null `drug` (unknown to OpenTargets) yields empty info.
pub fn parse_drug_info(json: &Value) -> DrugMechanismInfo {
    let drug = &json["data"]["drug"];
    let mut info = DrugMechanismInfo {
        clinical_phase: drug["maximumClinicalTrialPhase"]
            .as_f64()
            .filter(|phase| *phase >= 0.0)
            .map(|phase| phase as u8),
        ..Default::default()
    };

    let rows = drug["mechanismsOfAction"]["rows"].as_array().into_iter().flatten();
    for row in rows {
        let action_type = row["actionType"].as_str().unwrap_or("UNKNOWN").to_uppercase();
        if info.mechanism_of_action.is_none() {
            info.mechanism_of_action = row["description"].as_str().filter(|d| !d.is_empty()).map(String::from);
        }
        for target in row["targets"].as_array().into_iter().flatten() {
            if let Some(symbol) = target["approvedSymbol"].as_str() {
                info.actions_by_symbol.insert(symbol.to_uppercase(), action_type.clone());
            }
        }
    }
    info
}
