use crate::session::Session;
use log::debug;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use shared::error::{ClientError, Result};

/// Creates a request carrying the session's bearer token.
///
/// Fails with `ClientError::Auth` when there is no token, before anything is
/// sent.
pub fn authenticated_request(
    client: &Client,
    method: Method,
    url: &str,
    session: &Session,
) -> Result<RequestBuilder> {
    let token = session
        .token()
        .ok_or_else(|| ClientError::Auth("no session token".to_string()))?;
    debug!("{} {}", method, url);
    Ok(client
        .request(method, url)
        .header("Authorization", format!("Bearer {}", token)))
}

/// Maps transport failures; these never carry a status.
pub fn network_error(error: reqwest::Error) -> ClientError {
    if error.is_timeout() {
        ClientError::Network(format!("request timed out: {}", error))
    } else if error.is_decode() {
        ClientError::Decode(error.to_string())
    } else {
        ClientError::Network(error.to_string())
    }
}

/// Passes 2xx responses through and turns everything else into an error,
/// reading the body for the message.
pub async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!("HTTP {} body: {}", status.as_u16(), body);
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Auth(format!("HTTP {}", status.as_u16())));
    }
    Err(ClientError::http(status.as_u16(), &body))
}

/// Sends a prepared request and checks its status.
pub async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await.map_err(network_error)?;
    check_status(response).await
}
