// Credential capabilities used by the session: something that supplies a
// client id and secret, and something that trades them for a bearer
// token.

use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, TokenResponse, TokenUrl};
use std::fmt;
use tracing::debug;

use crate::error::{CatalogError, Result};

#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Supplies client credentials, typically by asking the user.
pub trait CredentialProvider {
    fn client_credentials(&mut self) -> Result<ClientCredentials>;
}

/// Exchanges client credentials for an access token at `token_url`.
pub trait TokenIssuer {
    fn issue(&self, token_url: &str, credentials: &ClientCredentials) -> Result<String>;
}

/// OAuth2 client-credentials grant over the blocking reqwest client.
#[derive(Debug, Default)]
pub struct OAuthTokenIssuer;

impl TokenIssuer for OAuthTokenIssuer {
    fn issue(&self, token_url: &str, credentials: &ClientCredentials) -> Result<String> {
        let invalid = |e: oauth2::url::ParseError| {
            CatalogError::Auth(format!("invalid token url {}: {}", token_url, e))
        };
        // The grant never visits the authorization endpoint; the token URL
        // stands in for it.
        let auth_url = AuthUrl::new(token_url.to_string()).map_err(invalid)?;
        let token_url = TokenUrl::new(token_url.to_string()).map_err(invalid)?;
        let client = BasicClient::new(
            ClientId::new(credentials.client_id.clone()),
            Some(ClientSecret::new(credentials.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        debug!(client_id = %credentials.client_id, "requesting client credentials token");
        let token = client
            .exchange_client_credentials()
            .request(oauth2::reqwest::http_client)
            .map_err(|e| CatalogError::Auth(e.to_string()))?;
        Ok(token.access_token().secret().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn debug_output_hides_secret() {
        let creds = ClientCredentials {
            client_id: "app".into(),
            client_secret: "s3cr3t".into(),
        };
        let shown = format!("{:?}", creds);
        assert!(shown.contains("app"));
        assert!(!shown.contains("s3cr3t"));
    }

    #[test]
    fn client_credentials_grant_returns_access_token() {
        let server = MockServer::start();
        let token = server.mock(|when, then| {
            when.method(POST)
                .path("/oauth/token")
                .body_contains("grant_type=client_credentials");
            then.status(200).json_body(serde_json::json!({
                "access_token": "abc.def.ghi",
                "token_type": "bearer",
                "expires_in": 43199
            }));
        });

        let creds = ClientCredentials {
            client_id: "app".into(),
            client_secret: "secret".into(),
        };
        let issued = OAuthTokenIssuer
            .issue(&server.url("/oauth/token"), &creds)
            .unwrap();

        assert_eq!(issued, "abc.def.ghi");
        token.assert();
    }

    #[test]
    fn rejected_credentials_are_an_auth_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(401).json_body(serde_json::json!({
                "error": "invalid_client",
                "error_description": "Bad credentials"
            }));
        });

        let creds = ClientCredentials {
            client_id: "app".into(),
            client_secret: "wrong".into(),
        };
        let err = OAuthTokenIssuer
            .issue(&server.url("/oauth/token"), &creds)
            .unwrap_err();
        assert!(matches!(err, CatalogError::Auth(_)));
    }
}
