//! Platform gateway. All Moltbook wire traffic goes through here, and each
//! endpoint's loosely-typed response is decoded exactly once into a typed
//! outcome the scheduler can branch on.

use crate::accounts::{Bot, ProxyPool};
use crate::error::{MintError, Result};
use crate::http::{HttpRequest, HttpResponse, ProxiedHttpClient};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Fallback backoff when a 429 carries no retry interval
const DEFAULT_RATE_LIMIT_SECS: u64 = 1800;

/// Platform-side claim state of a bot account
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimStatus {
    Claimed,
    Other(String),
}

/// One verification task issued by the platform
#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    pub code: String,
    pub text: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Challenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expiry) if expiry <= now)
    }
}

/// Typed outcome of a create-post call
#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
    Created {
        post_id: Option<String>,
        challenge: Option<Challenge>,
        /// Server-suggested seconds until the next mint, when present
        next_mint_seconds: Option<u64>,
    },
    RateLimited {
        retry_after: Duration,
        hint: Option<String>,
    },
    Rejected {
        status: u16,
        error: String,
    },
}

/// Typed outcome of a verification submission
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOutcome {
    pub success: bool,
    pub content_id: Option<String>,
}

/// Platform operations the scheduler depends on
#[async_trait]
pub trait Platform: Send + Sync {
    /// Check whether the bot account has been claimed by its owner
    async fn claim_status(&self, bot: &Bot, bot_index: usize) -> Result<ClaimStatus>;

    /// Submit an inscription post
    async fn create_post(
        &self,
        bot: &Bot,
        bot_index: usize,
        title: &str,
        content: &str,
    ) -> Result<PostOutcome>;

    /// Submit the answer to a verification challenge
    async fn submit_verification(
        &self,
        bot: &Bot,
        bot_index: usize,
        code: &str,
        answer: &str,
    ) -> Result<VerifyOutcome>;
}

// Wire shapes. Every field is optional; absence is normal, not an error.

#[derive(Debug, Deserialize, Default)]
struct StatusResponse {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct PostResponse {
    #[serde(default)]
    post: Option<PostInfo>,
    #[serde(default)]
    verification_required: Option<bool>,
    #[serde(default)]
    verification: Option<VerificationInfo>,
    #[serde(default)]
    retry_after_seconds: Option<u64>,
    #[serde(default)]
    retry_after_minutes: Option<u64>,
    #[serde(default)]
    next_mint_seconds: Option<u64>,
    #[serde(default)]
    hint: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostInfo {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerificationInfo {
    code: String,
    challenge: String,
    #[serde(default)]
    expires_at: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct VerifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    content_id: Option<String>,
}

/// Gateway over the real platform API
pub struct PlatformGateway {
    http: ProxiedHttpClient,
    retry: RetryPolicy,
    proxies: ProxyPool,
    api_base: String,
    submolt: String,
}

impl PlatformGateway {
    pub fn new(
        http: ProxiedHttpClient,
        retry: RetryPolicy,
        proxies: ProxyPool,
        api_base: &str,
        submolt: &str,
    ) -> Self {
        Self {
            http,
            retry,
            proxies,
            api_base: api_base.trim_end_matches('/').to_string(),
            submolt: submolt.to_string(),
        }
    }

    /// Send one request, rotating the proxy by bot index plus attempt
    async fn send(&self, req: HttpRequest, bot_index: usize) -> Result<HttpResponse> {
        self.retry
            .run(|attempt| {
                let req = req.clone();
                let proxy = self.proxies.select(bot_index + attempt);
                async move { self.http.request(req, proxy).await }
            })
            .await
    }
}

#[async_trait]
impl Platform for PlatformGateway {
    async fn claim_status(&self, bot: &Bot, bot_index: usize) -> Result<ClaimStatus> {
        let req = HttpRequest::get(&format!("{}/agents/status", self.api_base))
            .with_bearer(&bot.api_key);

        let response = self
            .send(req, bot_index)
            .await
            .map_err(|e| MintError::StatusCheckFailed(e.to_string()))?;

        if !response.is_success() {
            return Err(MintError::StatusCheckFailed(format!(
                "status endpoint returned {}",
                response.status
            )));
        }

        let decoded: StatusResponse = response
            .json
            .clone()
            .and_then(|v| serde_json::from_value(v).ok())
            .ok_or_else(|| {
                MintError::StatusCheckFailed("status response was not JSON".to_string())
            })?;

        match decoded.status.as_deref() {
            Some("claimed") => Ok(ClaimStatus::Claimed),
            Some(other) => Ok(ClaimStatus::Other(other.to_string())),
            None => Err(MintError::StatusCheckFailed(
                "status field missing from response".to_string(),
            )),
        }
    }

    async fn create_post(
        &self,
        bot: &Bot,
        bot_index: usize,
        title: &str,
        content: &str,
    ) -> Result<PostOutcome> {
        let body = json!({
            "submolt": self.submolt,
            "title": title,
            "content": content,
        });
        let req = HttpRequest::post_json(&format!("{}/posts", self.api_base), body)
            .with_bearer(&bot.api_key);

        let response = self.send(req, bot_index).await?;
        Ok(decode_post_response(&response))
    }

    async fn submit_verification(
        &self,
        bot: &Bot,
        bot_index: usize,
        code: &str,
        answer: &str,
    ) -> Result<VerifyOutcome> {
        let body = json!({
            "verification_code": code,
            "answer": answer,
        });
        let req = HttpRequest::post_json(&format!("{}/verify", self.api_base), body)
            .with_bearer(&bot.api_key);

        let response = self.send(req, bot_index).await?;

        if !response.is_success() {
            eprintln!(
                "    verify endpoint returned {}: {}",
                response.status,
                snippet(&response.body)
            );
            return Ok(VerifyOutcome {
                success: false,
                content_id: None,
            });
        }

        let decoded: VerifyResponse = response
            .json
            .clone()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        Ok(VerifyOutcome {
            success: decoded.success,
            content_id: decoded.content_id,
        })
    }
}

/// Decode a create-post response into its typed outcome
fn decode_post_response(response: &HttpResponse) -> PostOutcome {
    let decoded: PostResponse = response
        .json
        .clone()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    if response.status == 429 {
        let seconds = decoded
            .retry_after_seconds
            .or_else(|| decoded.retry_after_minutes.map(|m| m * 60))
            .unwrap_or(DEFAULT_RATE_LIMIT_SECS);
        return PostOutcome::RateLimited {
            retry_after: Duration::from_secs(seconds),
            hint: decoded.hint,
        };
    }

    if !response.is_success() {
        return PostOutcome::Rejected {
            status: response.status,
            error: decoded
                .error
                .unwrap_or_else(|| snippet(&response.body)),
        };
    }

    let challenge = if decoded.verification_required.unwrap_or(false) {
        decoded.verification.map(|v| Challenge {
            code: v.code,
            text: v.challenge,
            expires_at: v
                .expires_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
    } else {
        None
    };

    PostOutcome::Created {
        post_id: decoded.post.and_then(|p| p.id),
        challenge,
        next_mint_seconds: decoded.next_mint_seconds,
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > 160 {
        format!("{}...", trimmed.chars().take(160).collect::<String>())
    } else {
        trimmed.to_string()
    }
}
