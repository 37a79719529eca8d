use std::io::Write;
use std::time::Duration;

use drivemirror_core::{OAuthClient, OAuthError, OAuthToken};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

const LOOPBACK_TIMEOUT: Duration = Duration::from_secs(300);
const MANUAL_REDIRECT_URI: &str = "http://localhost";

#[derive(Debug, Error)]
pub enum OAuthFlowError {
    #[error("oauth error: {0}")]
    OAuth(#[from] OAuthError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("authorization code missing in redirect")]
    MissingCode,
    #[error("authorization timed out")]
    Timeout,
}

/// Interactive first-run authorization: open the consent URL, capture the
/// redirect on a loopback listener, fall back to manual code entry when
/// the loopback flow is unavailable.
pub struct OAuthFlow {
    client: OAuthClient,
    scope: String,
}

impl OAuthFlow {
    pub fn new(client: OAuthClient, scope: impl Into<String>) -> Self {
        Self {
            client,
            scope: scope.into(),
        }
    }

    pub async fn authenticate(&self) -> Result<OAuthToken, OAuthFlowError> {
        match self.authenticate_via_loopback().await {
            Ok(token) => Ok(token),
            Err(err) => {
                eprintln!(
                    "[drivemirror] oauth auto-flow unavailable ({err}), falling back to manual code entry"
                );
                self.authenticate_manual().await
            }
        }
    }

    async fn authenticate_via_loopback(&self) -> Result<OAuthToken, OAuthFlowError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", addr.port());
        let url = self.client.authorize_url(&redirect_uri, &self.scope, None);
        println!("Open this URL in your browser:\n{url}");

        let (mut stream, _) = tokio::time::timeout(LOOPBACK_TIMEOUT, listener.accept())
            .await
            .map_err(|_| OAuthFlowError::Timeout)??;

        let mut buffer = vec![0u8; 4096];
        let read = stream.read(&mut buffer).await?;
        let request = String::from_utf8_lossy(&buffer[..read]).to_string();
        let code = parse_code_from_request(&request).ok_or(OAuthFlowError::MissingCode)?;

        let body = "Authorization received. You can close this tab.";
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.write_all(response.as_bytes()).await;

        Ok(self.client.exchange_code(&code, &redirect_uri).await?)
    }

    async fn authenticate_manual(&self) -> Result<OAuthToken, OAuthFlowError> {
        let url = self
            .client
            .authorize_url(MANUAL_REDIRECT_URI, &self.scope, None);
        println!("Open this URL in your browser:\n{url}");
        println!("After approving, copy the \"code\" parameter from the redirect URL.");
        print!("Enter the authorization code: ");
        std::io::stdout().flush()?;
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        let code = input.trim();
        if code.is_empty() {
            return Err(OAuthFlowError::MissingCode);
        }
        Ok(self.client.exchange_code(code, MANUAL_REDIRECT_URI).await?)
    }
}

/// Pulls the `code` query parameter out of the redirect request line.
fn parse_code_from_request(request: &str) -> Option<String> {
    let request_line = request.lines().next()?;
    let target = request_line.split_whitespace().nth(1)?;
    let url = Url::parse(&format!("http://localhost{target}")).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}
