use anyhow::{Context, Result};
use oauth2::{
    basic::{BasicClient, BasicTokenResponse},
    reqwest::async_http_client,
    url::Url,
    AuthorizationCode, CsrfToken, PkceCodeChallenge, Scope,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub fn callback_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/callback", port)
}

/// Run the interactive browser sign-in:
/// 1. Start a local HTTP listener on 127.0.0.1:<port>
/// 2. Open the provider's consent page with a PKCE challenge
/// 3. Wait for the browser to come back with ?code=<code>&state=<state>
/// 4. Exchange the code for tokens
///
/// `client` must already carry the redirect URL built from [`callback_url`].
pub async fn run_browser_login(
    client: &BasicClient,
    port: u16,
    scopes: &[&str],
) -> Result<BasicTokenResponse> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind to port {}", port))?;

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let (auth_url, csrf_state) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(scopes.iter().map(|s| Scope::new(s.to_string())))
        .add_extra_param("access_type", "offline")
        .add_extra_param("prompt", "consent")
        .set_pkce_challenge(pkce_challenge)
        .url();

    println!("Opening browser for sign-in...");
    println!("If the browser doesn't open, visit:\n  {}\n", auth_url);
    open_browser(auth_url.as_str());

    let callback = wait_for_callback(&listener).await?;
    if callback.state != *csrf_state.secret() {
        anyhow::bail!("Sign-in callback carried an unexpected state, aborting");
    }

    client
        .exchange_code(AuthorizationCode::new(callback.code))
        .set_pkce_verifier(pkce_verifier)
        .request_async(async_http_client)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to exchange authorization code: {}", e))
}

/// Open a URL in the system default browser.
fn open_browser(url: &str) {
    #[cfg(target_os = "linux")]
    let _ = std::process::Command::new("xdg-open").arg(url).spawn();
    #[cfg(target_os = "macos")]
    let _ = std::process::Command::new("open").arg(url).spawn();
    #[cfg(target_os = "windows")]
    let _ = std::process::Command::new("cmd").args(["/c", "start", url]).spawn();
}

#[derive(Debug, PartialEq, Eq)]
struct Callback {
    code: String,
    state: String,
}

/// Wait for the request to /callback and answer it so the browser shows something.
/// Anything else the browser asks for first (favicon, pre-connects) gets a 404.
async fn wait_for_callback(listener: &TcpListener) -> Result<Callback> {
    loop {
        let (mut stream, _) = listener.accept().await.context("Failed to accept connection")?;

        let mut buf = vec![0u8; 8192];
        let n = stream.read(&mut buf).await.context("Failed to read from socket")?;
        let request = String::from_utf8_lossy(&buf[..n]);

        if !request_path(&request).is_some_and(|path| path.starts_with("/callback")) {
            let _ = stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await;
            continue;
        }

        let parsed = parse_callback(&request);

        let body = match &parsed {
            Ok(_) => "<h2>Signed in!</h2><p>You can close this tab.</p>",
            Err(_) => "<h2>Sign-in failed</h2><p>Return to the terminal for details.</p>",
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body>{}</body></html>",
            body
        );
        stream
            .write_all(response.as_bytes())
            .await
            .context("Failed to write response")?;

        return parsed;
    }
}

fn request_path(request: &str) -> Option<&str> {
    request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
}

fn parse_callback(request: &str) -> Result<Callback> {
    // e.g. "GET /callback?state=abc&code=4%2F0Ab HTTP/1.1"
    let path = request_path(request).context("Malformed callback request")?;
    let url = Url::parse(&format!("http://127.0.0.1{}", path)).context("Malformed callback URL")?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => anyhow::bail!("Sign-in was refused: {}", value),
            _ => {}
        }
    }

    Ok(Callback {
        code: code.context("Callback did not contain a code. Sign-in may have failed.")?,
        state: state.context("Callback did not contain a state.")?,
    })
}
