// Session state: the two service instance ids and the bearer token.
//
// The state is loaded once from disk, filled in lazily as commands need
// it, and written back after `Session::connect` has produced a client
// whose token the catalog accepts. Ids are never re-resolved once known;
// the token may be dropped and re-acquired any number of times.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ZONE_HEADER};
use crate::auth::{CredentialProvider, TokenIssuer};
use crate::error::{CatalogError, Result};
use crate::host::HostEnvironment;

/// Cheap authenticated endpoint used to check the bearer token.
pub const TOKEN_PROBE_PATH: &str = "/api/v1/catalog/taxonomy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    /// The identity service that issues tokens.
    Uaa,
    /// The analytics catalog itself; its id is the zone id.
    AnalyticsCatalog,
}

impl ServiceKind {
    /// Service offering name the instance is created from.
    pub fn offering(self) -> &'static str {
        match self {
            ServiceKind::Uaa => "predix-uaa",
            ServiceKind::AnalyticsCatalog => "predix-analytics-catalog",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ServiceKind::Uaa => "UAA",
            ServiceKind::AnalyticsCatalog => "Analytics",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub uaa_guid: String,
    pub analytics_guid: String,
    pub auth_token: String,
}

pub trait StateStore {
    fn load(&self) -> Result<SessionState>;
    fn save(&self, state: &SessionState) -> Result<()>;
}

/// Session state as a single JSON object in a file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }
}

impl StateStore for JsonFileStore {
    /// A missing file is an empty state; an unreadable one is an error.
    fn load(&self) -> Result<SessionState> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no saved session state");
            return Ok(SessionState::default());
        }
        let data = std::fs::read(&self.path)
            .map_err(|e| CatalogError::io(format!("Loading config failed ({})", self.path.display()), e))?;
        serde_json::from_slice(&data).map_err(|source| CatalogError::CorruptState {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, state: &SessionState) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| CatalogError::io(format!("Saving config failed ({})", dir.display()), e))?;
        }
        let data = serde_json::to_vec(state).map_err(|source| CatalogError::CorruptState {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, data)
            .map_err(|e| CatalogError::io(format!("Saving config failed ({})", self.path.display()), e))?;
        info!(path = %self.path.display(), "session state saved");
        Ok(())
    }
}

/// Owns the session state together with the capabilities needed to fill
/// it in.
pub struct Session {
    state: SessionState,
    store: Box<dyn StateStore>,
    host: Box<dyn HostEnvironment>,
    credentials: Box<dyn CredentialProvider>,
    issuer: Box<dyn TokenIssuer>,
    token_url_template: String,
}

impl Session {
    /// Load persisted state from `store`. `token_url_template` must contain
    /// `{guid}`, which is replaced with the identity service id.
    pub fn load(
        store: Box<dyn StateStore>,
        host: Box<dyn HostEnvironment>,
        credentials: Box<dyn CredentialProvider>,
        issuer: Box<dyn TokenIssuer>,
        token_url_template: impl Into<String>,
    ) -> Result<Self> {
        let state = store.load()?;
        Ok(Session {
            state,
            store,
            host,
            credentials,
            issuer,
            token_url_template: token_url_template.into(),
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn host(&self) -> &dyn HostEnvironment {
        self.host.as_ref()
    }

    /// The cached id for `kind`, or the id of the first bound service whose
    /// offering matches.
    pub fn ensure_service_id(&mut self, kind: ServiceKind) -> Result<String> {
        let cached = match kind {
            ServiceKind::Uaa => &self.state.uaa_guid,
            ServiceKind::AnalyticsCatalog => &self.state.analytics_guid,
        };
        if !cached.is_empty() {
            return Ok(cached.clone());
        }

        let service = self
            .host
            .services()?
            .into_iter()
            .find(|s| s.offering == kind.offering())
            .ok_or(CatalogError::ServiceNotBound(kind))?;
        let guid = self.host.service_guid(&service.name)?;
        debug!(service = %service.name, offering = kind.offering(), %guid, "resolved service id");

        match kind {
            ServiceKind::Uaa => self.state.uaa_guid = guid.clone(),
            ServiceKind::AnalyticsCatalog => self.state.analytics_guid = guid.clone(),
        }
        Ok(guid)
    }

    /// The cached token, or a new one obtained by asking for client
    /// credentials and exchanging them at the identity service.
    pub fn ensure_token(&mut self) -> Result<String> {
        if !self.state.auth_token.is_empty() {
            return Ok(self.state.auth_token.clone());
        }
        let uaa = self.ensure_service_id(ServiceKind::Uaa)?;
        let token_url = self.token_url_template.replace("{guid}", &uaa);
        let credentials = self.credentials.client_credentials()?;
        let token = self.issuer.issue(&token_url, &credentials)?;
        self.state.auth_token = token.clone();
        Ok(token)
    }

    pub fn invalidate_token(&mut self) {
        self.state.auth_token.clear();
    }

    pub fn persist(&self) -> Result<()> {
        self.store.save(&self.state)
    }

    /// Build a catalog client carrying the bearer token and zone id. While
    /// the catalog rejects the token, it is dropped and a new one acquired;
    /// there is no retry limit. State is persisted once a token is accepted.
    pub fn connect(&mut self, client: ApiClient) -> Result<ApiClient> {
        let mut client = client;
        let token = self.ensure_token()?;
        let zone = self.ensure_service_id(ServiceKind::AnalyticsCatalog)?;
        client.set_bearer(&token)?;
        client.set_header(ZONE_HEADER, &zone)?;

        while !token_is_valid(&client) {
            warn!("catalog rejected the bearer token, requesting new credentials");
            self.invalidate_token();
            let token = self.ensure_token()?;
            client.set_bearer(&token)?;
        }

        self.persist()?;
        Ok(client)
    }
}

/// Any transport error or non-2xx answer from the probe counts as invalid.
pub fn token_is_valid(client: &ApiClient) -> bool {
    match client.get(TOKEN_PROBE_PATH).send() {
        Ok(res) => res.status().is_success(),
        Err(e) => {
            debug!(error = %e, "token probe failed");
            false
        }
    }
}
