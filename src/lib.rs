pub mod accounts;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod llm;
pub mod retry;
pub mod scheduler;
pub mod solver;
pub mod status;
pub mod token;

pub use accounts::{load_bots, Bot, ProxyEndpoint, ProxyPool};
pub use config::{Config, LlmBackend};
pub use error::MintError;
pub use gateway::{Challenge, ClaimStatus, Platform, PlatformGateway, PostOutcome, VerifyOutcome};
pub use http::{HttpRequest, HttpResponse, ProxiedHttpClient};
pub use llm::{ClaudeClient, LlmClient, OllamaClient};
pub use retry::RetryPolicy;
pub use scheduler::{time_until_eligible, AttemptOutcome, LinkReport, MintScheduler, TickSummary};
pub use solver::{coerce_answer, normalize_challenge, ChallengeSolver};
pub use status::{BotStatus, StatusStore};
pub use token::{post_title, MintPayload, TokenOp};
