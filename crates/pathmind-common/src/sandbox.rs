use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::error::{PathmindError, SourceError};

/// HTTP client that only talks to the public data sources Pathmind federates.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist and a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, PathmindError> {
        let domains = [
            "www.ebi.ac.uk",                // ChEMBL
            "pubchem.ncbi.nlm.nih.gov",     // PubChem PUG REST
            "rest.uniprot.org",             // UniProt
            "reactome.org",                 // Reactome content service
            "api.platform.opentargets.org", // OpenTargets GraphQL
            "localhost",                    // Local mirrors
            "127.0.0.1",
        ];
        let allowlist = domains.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("pathmind/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PathmindError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Allows the host of a configured base URL, e.g. a self-hosted mirror.
    pub fn allow_url_host(&mut self, base_url: &str) {
        if let Some(host) = Url::parse(base_url).ok().and_then(|u| u.host_str().map(str::to_string)) {
            self.allowlist.insert(host);
        }
    }

    /// Validates if a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        // Exact match or a subdomain of an allowed domain
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, SourceError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, SourceError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }

    fn check(&self, url: &str) -> Result<(), SourceError> {
        if self.is_allowed(url) {
            Ok(())
        } else {
            Err(SourceError::Blocked { url: url.to_string() })
        }
    }
}
