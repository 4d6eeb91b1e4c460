// Host environment boundary: the Cloud Foundry CLI this tool runs beside.
// Only login state, the API target and bound service instances are read
// from it.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::error::{CatalogError, Result};

/// Suffix every supported API endpoint ends with.
pub const PREDIX_API_SUFFIX: &str = "predix.io";

/// A service instance bound in the current space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundService {
    /// Instance (binding) name chosen by the user.
    pub name: String,
    /// Name of the service offering the instance was created from.
    pub offering: String,
}

pub trait HostEnvironment {
    fn services(&self) -> Result<Vec<BoundService>>;
    fn service_guid(&self, name: &str) -> Result<String>;
    fn username(&self) -> Result<String>;
    fn is_logged_in(&self) -> Result<bool>;
    fn has_api_endpoint(&self) -> Result<bool>;
    fn api_endpoint(&self) -> Result<String>;
}

/// Refuse to run unless the host is logged in and targets a Predix API.
pub fn check_preconditions(host: &dyn HostEnvironment) -> Result<()> {
    if !host.is_logged_in()? {
        return Err(CatalogError::NotLoggedIn);
    }
    if !host.has_api_endpoint()? {
        return Err(CatalogError::NoApiEndpoint);
    }
    let endpoint = host.api_endpoint()?;
    if !endpoint.trim_end_matches('/').ends_with(PREDIX_API_SUFFIX) {
        return Err(CatalogError::WrongApiTarget(endpoint));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct CfConfig {
    target: String,
    access_token: String,
    space_fields: SpaceFields,
}

#[derive(Debug, Default, Deserialize)]
struct SpaceFields {
    #[serde(rename = "GUID", default)]
    guid: String,
}

/// Adapter over the `cf` binary and its `config.json`.
pub struct CfCli {
    cf_home: PathBuf,
    config_file: PathBuf,
    binary: String,
}

impl CfCli {
    pub fn new(cf_home: &Path, config_file: PathBuf) -> Self {
        CfCli {
            cf_home: cf_home.to_path_buf(),
            config_file,
            binary: "cf".to_string(),
        }
    }

    fn config(&self) -> Result<CfConfig> {
        if !self.config_file.exists() {
            return Ok(CfConfig::default());
        }
        let data = std::fs::read(&self.config_file).map_err(|e| {
            CatalogError::io(format!("reading {}", self.config_file.display()), e)
        })?;
        serde_json::from_slice(&data).map_err(|e| {
            CatalogError::Host(format!("cannot parse {}: {}", self.config_file.display(), e))
        })
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        debug!(binary = %self.binary, ?args, "running host CLI");
        let output = Command::new(&self.binary)
            .args(args)
            .env("CF_HOME", &self.cf_home)
            .output()
            .map_err(|e| CatalogError::Host(format!("cannot run {}: {}", self.binary, e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(CatalogError::Host(format!(
                "{} {} failed: {}",
                self.binary,
                args.join(" "),
                detail.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl HostEnvironment for CfCli {
    fn services(&self) -> Result<Vec<BoundService>> {
        let space = self.config()?.space_fields.guid;
        if space.is_empty() {
            return Err(CatalogError::Host("no space targeted".into()));
        }
        let path = format!(
            "/v3/service_instances?space_guids={}&per_page=5000\
             &fields[service_plan]=guid,relationships.service_offering\
             &fields[service_plan.service_offering]=guid,name",
            space
        );
        parse_service_instances(&self.run(&["curl", &path])?)
    }

    fn service_guid(&self, name: &str) -> Result<String> {
        let guid = self.run(&["service", name, "--guid"])?.trim().to_string();
        if guid.is_empty() {
            return Err(CatalogError::Host(format!("no guid reported for service {}", name)));
        }
        Ok(guid)
    }

    fn username(&self) -> Result<String> {
        username_from_token(&self.config()?.access_token)
    }

    fn is_logged_in(&self) -> Result<bool> {
        Ok(!self.config()?.access_token.is_empty())
    }

    fn has_api_endpoint(&self) -> Result<bool> {
        Ok(!self.config()?.target.is_empty())
    }

    fn api_endpoint(&self) -> Result<String> {
        let target = self.config()?.target;
        if target.is_empty() {
            return Err(CatalogError::NoApiEndpoint);
        }
        Ok(target)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstancePage {
    resources: Vec<Instance>,
    included: Included,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Instance {
    name: String,
    relationships: InstanceRelationships,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstanceRelationships {
    service_plan: Relation,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Relation {
    data: Option<RelationData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RelationData {
    guid: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Included {
    service_plans: Vec<Plan>,
    service_offerings: Vec<Offering>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Plan {
    guid: String,
    relationships: PlanRelationships,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlanRelationships {
    service_offering: Relation,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Offering {
    guid: String,
    name: String,
}

/// Join instances to their offering names through the included plans.
/// Instances without a plan (user-provided services) are skipped.
fn parse_service_instances(body: &str) -> Result<Vec<BoundService>> {
    let page: InstancePage = serde_json::from_str(body)
        .map_err(|e| CatalogError::Host(format!("unexpected service listing: {}", e)))?;

    Ok(page
        .resources
        .iter()
        .filter_map(|instance| {
            let plan = instance.relationships.service_plan.data.as_ref()?;
            Some(BoundService {
                name: instance.name.clone(),
                offering: offering_name(&page.included, &plan.guid)?.to_string(),
            })
        })
        .collect())
}

fn offering_name<'a>(included: &'a Included, plan_guid: &str) -> Option<&'a str> {
    let plan = included.service_plans.iter().find(|p| p.guid == plan_guid)?;
    let offering_guid = &plan.relationships.service_offering.data.as_ref()?.guid;
    included
        .service_offerings
        .iter()
        .find(|o| &o.guid == offering_guid)
        .map(|o| o.name.as_str())
}

#[derive(Deserialize)]
struct Claims {
    user_name: String,
}

/// Read the `user_name` claim of the host's own access token.
fn username_from_token(token: &str) -> Result<String> {
    let jwt = token
        .strip_prefix("bearer ")
        .or_else(|| token.strip_prefix("Bearer "))
        .unwrap_or(token);
    let payload = jwt
        .split('.')
        .nth(1)
        .ok_or_else(|| CatalogError::Host("host access token is not a JWT".into()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| CatalogError::Host(format!("cannot decode host access token: {}", e)))?;
    let claims: Claims = serde_json::from_slice(&bytes)
        .map_err(|e| CatalogError::Host(format!("cannot read host access token: {}", e)))?;
    Ok(claims.user_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeHost {
        logged_in: bool,
        endpoint: Option<&'static str>,
    }

    impl HostEnvironment for FakeHost {
        fn services(&self) -> Result<Vec<BoundService>> {
            Ok(Vec::new())
        }
        fn service_guid(&self, _name: &str) -> Result<String> {
            Ok(String::new())
        }
        fn username(&self) -> Result<String> {
            Ok("admin".into())
        }
        fn is_logged_in(&self) -> Result<bool> {
            Ok(self.logged_in)
        }
        fn has_api_endpoint(&self) -> Result<bool> {
            Ok(self.endpoint.is_some())
        }
        fn api_endpoint(&self) -> Result<String> {
            self.endpoint.map(str::to_string).ok_or(CatalogError::NoApiEndpoint)
        }
    }

    #[test]
    fn preconditions_in_order() {
        let host = FakeHost { logged_in: false, endpoint: None };
        assert!(matches!(check_preconditions(&host), Err(CatalogError::NotLoggedIn)));

        let host = FakeHost { logged_in: true, endpoint: None };
        assert!(matches!(check_preconditions(&host), Err(CatalogError::NoApiEndpoint)));

        let host = FakeHost { logged_in: true, endpoint: Some("https://api.run.pivotal.io") };
        assert!(matches!(
            check_preconditions(&host),
            Err(CatalogError::WrongApiTarget(_))
        ));

        let host = FakeHost {
            logged_in: true,
            endpoint: Some("https://api.system.aws-usw02-pr.ice.predix.io"),
        };
        assert!(check_preconditions(&host).is_ok());
    }

    #[test]
    fn service_listing_joins_offering_names() {
        let body = serde_json::json!({
            "resources": [
                {"name": "my-uaa", "relationships": {"service_plan": {"data": {"guid": "p1"}}}},
                {"name": "my-catalog", "relationships": {"service_plan": {"data": {"guid": "p2"}}}},
                {"name": "ups", "type": "user-provided", "relationships": {}}
            ],
            "included": {
                "service_plans": [
                    {"guid": "p1", "relationships": {"service_offering": {"data": {"guid": "o1"}}}},
                    {"guid": "p2", "relationships": {"service_offering": {"data": {"guid": "o2"}}}}
                ],
                "service_offerings": [
                    {"guid": "o1", "name": "predix-uaa"},
                    {"guid": "o2", "name": "predix-analytics-catalog"}
                ]
            }
        })
        .to_string();

        let services = parse_service_instances(&body).unwrap();
        assert_eq!(
            services,
            vec![
                BoundService { name: "my-uaa".into(), offering: "predix-uaa".into() },
                BoundService {
                    name: "my-catalog".into(),
                    offering: "predix-analytics-catalog".into()
                },
            ]
        );
    }

    #[test]
    fn username_comes_from_token_claims() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"user_name":"jdoe","scope":["openid"]}"#);
        let token = format!("bearer eyJhbGciOiJSUzI1NiJ9.{}.sig", payload);
        assert_eq!(username_from_token(&token).unwrap(), "jdoe");
        assert!(username_from_token("not-a-jwt").is_err());
    }

    #[test]
    fn cf_config_drives_login_state() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        let cf = CfCli::new(dir.path(), config.clone());
        assert!(!cf.is_logged_in().unwrap());
        assert!(!cf.has_api_endpoint().unwrap());

        std::fs::write(
            &config,
            r#"{"Target":"https://api.system.predix.io","AccessToken":"bearer x.y.z","SpaceFields":{"GUID":"s1","Name":"dev"}}"#,
        )
        .unwrap();
        assert!(cf.is_logged_in().unwrap());
        assert_eq!(cf.api_endpoint().unwrap(), "https://api.system.predix.io");
    }
}
