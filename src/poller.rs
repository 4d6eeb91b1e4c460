// Long-running catalog operations (validation, deployment). The initial
// POST returns a result carrying a request id; the status resource is
// then re-fetched until it reports COMPLETED or ERROR.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;
use tracing::debug;

use crate::api::{null_as_default, ApiClient, ApiRequest};
use crate::error::{CatalogError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Completed,
    Error,
    /// Any other value the server reports, kept verbatim. Never terminal.
    Unknown(String),
    #[default]
    Missing,
}

impl<'de> Deserialize<'de> for OperationStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(match value.as_deref() {
            None | Some("") => Self::Missing,
            Some("PENDING") => Self::Pending,
            Some("COMPLETED") => Self::Completed,
            Some("ERROR") => Self::Error,
            Some(other) => Self::Unknown(other.to_string()),
        })
    }
}

impl Serialize for OperationStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl OperationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
            Self::Unknown(v) => v.as_str(),
            Self::Missing => "",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// Shared shape of validation and deployment results. Validation names
/// its request id `validationRequestId` and its input `inputData`;
/// deployment uses `requestId` and `inputConfigData`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationResult {
    #[serde(deserialize_with = "null_as_default")]
    pub analytic_id: String,
    #[serde(alias = "validationRequestId", deserialize_with = "null_as_default")]
    pub request_id: String,
    pub status: OperationStatus,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(
        alias = "inputData",
        alias = "inputConfigData",
        deserialize_with = "null_as_default"
    )]
    pub input: String,
    #[serde(deserialize_with = "null_as_default")]
    pub result: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created_timestamp: String,
    #[serde(deserialize_with = "null_as_default")]
    pub updated_timestamp: String,
}

/// How status polling behaves. The default polls back to back with no
/// upper bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

/// Call `fetch` until it yields a terminal status. `sleep` runs between
/// attempts whenever the policy has a non-zero interval. A fetch error
/// stops polling immediately; an ERROR status is returned as a result.
pub fn poll_until_terminal<F, S>(
    policy: &PollPolicy,
    mut fetch: F,
    mut sleep: S,
) -> Result<OperationResult>
where
    F: FnMut() -> Result<OperationResult>,
    S: FnMut(Duration),
{
    let mut attempts: u32 = 0;
    loop {
        if let Some(max) = policy.max_attempts {
            if attempts >= max {
                return Err(CatalogError::PollLimit(max));
            }
        }
        if attempts > 0 && !policy.interval.is_zero() {
            sleep(policy.interval);
        }
        attempts += 1;

        let result = fetch()?;
        debug!(attempt = attempts, status = result.status.as_str(), "polled operation status");
        if result.status.is_terminal() {
            return Ok(result);
        }
    }
}

/// Drives an operation over the catalog API.
pub struct Poller<'a> {
    api: &'a ApiClient,
    policy: PollPolicy,
}

impl<'a> Poller<'a> {
    pub fn new(api: &'a ApiClient, policy: PollPolicy) -> Self {
        Poller { api, policy }
    }

    /// Send the initiating request and decode the first result.
    pub fn submit(&self, request: ApiRequest) -> Result<OperationResult> {
        let initial: OperationResult = request.send()?.success()?.json()?;
        debug!(request_id = %initial.request_id, "operation submitted");
        Ok(initial)
    }

    /// GET `status_path` until the operation reaches a terminal status.
    pub fn wait(&self, status_path: &str) -> Result<OperationResult> {
        poll_until_terminal(
            &self.policy,
            || self.api.get(status_path).send()?.success()?.json(),
            std::thread::sleep,
        )
    }

    /// Submit, then poll `status_path(request_id)` to completion.
    pub fn run<P>(&self, request: ApiRequest, status_path: P) -> Result<OperationResult>
    where
        P: FnOnce(&str) -> String,
    {
        let initial = self.submit(request)?;
        self.wait(&status_path(&initial.request_id))
    }
}
