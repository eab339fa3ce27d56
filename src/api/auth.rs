use crate::api::models::TokenResponse;
use crate::api::transport::{ApiRequest, HttpTransport};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

const VERIFIER_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const VERIFIER_LEN: usize = 64;

pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let verifier: String = (0..VERIFIER_LEN)
            .map(|_| VERIFIER_ALPHABET[rng.gen_range(0..VERIFIER_ALPHABET.len())] as char)
            .collect();
        let challenge = challenge_for(&verifier);

        Self {
            verifier,
            challenge,
        }
    }
}

/// S256 code challenge: base64url(sha256(verifier)) without padding.
pub fn challenge_for(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

pub fn build_auth_url(config: &AppConfig, code_challenge: &str) -> AppResult<String> {
    let redirect_uri = config.redirect_uri()?;
    let url = format!(
        "{}?response_type=code&client_id={}&scope={}&redirect_uri={}&code_challenge_method=S256&code_challenge={}",
        config.authorize_url(),
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.scope),
        urlencoding::encode(&redirect_uri),
        code_challenge
    );
    log::debug!("Auth URL: {}", url);
    Ok(url)
}

pub async fn exchange_code(
    transport: &dyn HttpTransport,
    config: &AppConfig,
    code: &str,
    code_verifier: &str,
) -> AppResult<TokenResponse> {
    let redirect_uri = config.redirect_uri()?;
    let params = [
        ("client_id", config.client_id.as_str()),
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri.as_str()),
        ("code_verifier", code_verifier),
    ];

    request_token(transport, config, &params).await
}

/// Mint a new access token from a stored refresh token.
pub async fn refresh_user_token(
    transport: &dyn HttpTransport,
    config: &AppConfig,
    refresh_token: &str,
) -> AppResult<TokenResponse> {
    let params = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", config.client_id.as_str()),
    ];

    request_token(transport, config, &params).await
}

async fn request_token(
    transport: &dyn HttpTransport,
    config: &AppConfig,
    params: &[(&str, &str)],
) -> AppResult<TokenResponse> {
    let response = transport
        .send(ApiRequest::form(config.token_url(), params))
        .await?;

    if !response.is_success() {
        return Err(AppError::TokenExchange {
            status: response.status,
            message: response.body,
        });
    }

    let token: TokenResponse = response.json()?;
    Ok(token)
}
