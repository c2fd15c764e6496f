//! [Doc](https://docs.github.com/en/rest/apps/apps#create-an-installation-access-token-for-an-app)

use chrono::{DateTime, Utc};
use http::{Method, Request, Response, StatusCode};
use serde::Deserialize;

use crate::endpoint::{api_request, body_lossy, Body, Endpoint, Respond, TransportError};

//
#[derive(Deserialize, Clone)]
pub struct InstallationToken {
    pub token: Box<str>,
    pub expires_at: DateTime<Utc>,
}

impl core::fmt::Debug for InstallationToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InstallationToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

//
#[derive(Clone)]
pub struct AccessTokenEndpoint {
    api_base: Box<str>,
    jwt: Box<str>,
    installation_id: Box<str>,
}

impl AccessTokenEndpoint {
    pub fn new(
        api_base: impl AsRef<str>,
        jwt: impl AsRef<str>,
        installation_id: impl AsRef<str>,
    ) -> Self {
        Self {
            api_base: api_base.as_ref().into(),
            jwt: jwt.as_ref().into(),
            installation_id: installation_id.as_ref().into(),
        }
    }
}

impl Endpoint for AccessTokenEndpoint {
    type Output = InstallationToken;
    type Error = AccessTokenError;

    fn render_request(&self) -> Result<Request<Body>, http::Error> {
        api_request(
            Method::POST,
            &self.api_base,
            &format!("/app/installations/{}/access_tokens", self.installation_id),
            &self.jwt,
        )
        .body(vec![])
    }

    fn parse_response(&self, response: Response<Body>) -> Result<Self::Output, Self::Error> {
        let status = response.status();
        if !status.is_success() {
            return Err(AccessTokenError::Rejected {
                status,
                body: body_lossy(&response),
            });
        }

        serde_json::from_slice(response.body()).map_err(AccessTokenError::DeResponseBodyFailed)
    }
}

pub fn exchange(
    client: impl Respond,
    api_base: impl AsRef<str>,
    jwt: impl AsRef<str>,
    installation_id: impl AsRef<str>,
) -> Result<InstallationToken, AccessTokenError> {
    client.respond_endpoint(&AccessTokenEndpoint::new(api_base, jwt, installation_id))
}

//
#[derive(Debug)]
pub enum AccessTokenError {
    MakeRequestFailed(http::Error),
    RespondFailed(TransportError),
    Rejected { status: StatusCode, body: String },
    DeResponseBodyFailed(serde_json::Error),
}

impl From<http::Error> for AccessTokenError {
    fn from(err: http::Error) -> Self {
        Self::MakeRequestFailed(err)
    }
}

impl From<TransportError> for AccessTokenError {
    fn from(err: TransportError) -> Self {
        Self::RespondFailed(err)
    }
}

impl core::fmt::Display for AccessTokenError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}
impl std::error::Error for AccessTokenError {}

#[cfg(test)]
mod tests {
    use super::*;

    use http::header;

    fn endpoint() -> AccessTokenEndpoint {
        AccessTokenEndpoint::new("https://api.github.com", "eyJ.x.y", "2")
    }

    #[test]
    fn test_render_request() {
        let request = endpoint().render_request().unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.uri(),
            "https://api.github.com/app/installations/2/access_tokens"
        );
        assert_eq!(request.headers()[header::AUTHORIZATION], "Bearer eyJ.x.y");
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_parse_response() {
        let response = Response::builder()
            .status(StatusCode::CREATED)
            .body(br#"{"token":"abc","expires_at":"2030-01-01T00:00:00Z","permissions":{}}"#.to_vec())
            .unwrap();

        let token = endpoint().parse_response(response).unwrap();
        assert_eq!(token.token.as_ref(), "abc");
        assert_eq!(
            token.expires_at,
            "2030-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert!(!format!("{token:?}").contains("abc"));
    }

    #[test]
    fn test_parse_response_rejected() {
        let response = Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .body(br#"{"message":"A JSON web token could not be decoded"}"#.to_vec())
            .unwrap();

        match endpoint().parse_response(response) {
            Err(AccessTokenError::Rejected { status, body }) => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert!(body.contains("could not be decoded"));
            }
            x => panic!("{x:?}"),
        }
    }

    #[test]
    fn test_parse_response_malformed() {
        let response = Response::builder()
            .status(StatusCode::CREATED)
            .body(br#"{"expires_at":"2030-01-01T00:00:00Z"}"#.to_vec())
            .unwrap();

        match endpoint().parse_response(response) {
            Err(AccessTokenError::DeResponseBodyFailed(_)) => {}
            x => panic!("{x:?}"),
        }
    }
}
