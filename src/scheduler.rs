//! The mint scheduling core. Tracks each bot's next-eligible time, drives
//! the attempt sequence against the platform gateway, reschedules from
//! server feedback and persists state after every bot.

use crate::accounts::Bot;
use crate::config::ScheduleConfig;
use crate::error::Result;
use crate::gateway::{Challenge, ClaimStatus, Platform, PostOutcome};
use crate::solver::ChallengeSolver;
use crate::status::{BotStatus, StatusStore};
use crate::token::{self, MintPayload};
use anyhow::Context as _;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Adaptive sleeping never goes below this, even when a bot is perpetually
/// ready because its failures do not advance the clock
const MIN_SLEEP_FLOOR_SECS: u64 = 10;

/// Outcome of one bot's attempt within a tick
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Minted { verified: bool },
    Unclaimed,
    RateLimited { retry_after_secs: u64 },
    Rejected { status: u16 },
    StatusCheckFailed,
    NetworkFailed,
}

/// What one tick did
#[derive(Debug, Default)]
pub struct TickSummary {
    pub ready: usize,
    pub cooling: usize,
    pub outcomes: Vec<(String, AttemptOutcome)>,
}

/// Result of an inscription submission, before timing bookkeeping
#[derive(Debug)]
enum SubmitOutcome {
    Posted {
        verified: bool,
        finalized_id: Option<String>,
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

/// Per-run wallet-link report
#[derive(Debug, Default, PartialEq)]
pub struct LinkReport {
    pub linked: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Milliseconds until the bot may mint again. Zero means ready.
///
/// `next_mint_at` is authoritative when present; otherwise the default
/// cooldown runs from the last attempt; a bot with neither is eligible
/// immediately.
pub fn time_until_eligible(status: &BotStatus, now_ms: i64, default_cooldown_ms: i64) -> i64 {
    if let Some(next) = status.next_mint_at {
        return (next - now_ms).max(0);
    }
    if let Some(last) = status.last_mint_attempt {
        return (default_cooldown_ms - (now_ms - last)).max(0);
    }
    0
}

pub struct MintScheduler {
    platform: Arc<dyn Platform>,
    solver: ChallengeSolver,
    store: StatusStore,
    bots: Vec<Bot>,
    payload: MintPayload,
    schedule: ScheduleConfig,
}

impl MintScheduler {
    pub fn new(
        platform: Arc<dyn Platform>,
        solver: ChallengeSolver,
        store: StatusStore,
        bots: Vec<Bot>,
        payload: MintPayload,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            platform,
            solver,
            store,
            bots,
            payload,
            schedule,
        }
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }

    pub fn bots(&self) -> &[Bot] {
        &self.bots
    }

    /// Run the loop forever, ticking on a fixed or adaptive interval
    pub async fn run(&mut self) {
        println!(
            "Scheduler active: {} bots, cooldown {}s, {} sleep",
            self.bots.len(),
            self.schedule.default_cooldown_secs,
            if self.schedule.adaptive { "adaptive" } else { "fixed" },
        );

        loop {
            let now_ms = Utc::now().timestamp_millis();
            let summary = self.run_tick(now_ms).await;
            if !summary.outcomes.is_empty() {
                let labels: Vec<String> = summary
                    .outcomes
                    .iter()
                    .map(|(name, outcome)| format!("{} {:?}", name, outcome))
                    .collect();
                println!("[{}] tick complete: {:?}", log_ts(), labels);
            }

            let sleep = self.sleep_duration(Utc::now().timestamp_millis());
            tokio::time::sleep(sleep).await;
        }
    }

    /// One tick: partition bots by readiness and attempt each ready one
    /// sequentially, persisting the store after every bot.
    pub async fn run_tick(&mut self, now_ms: i64) -> TickSummary {
        let cooldown_ms = self.schedule.default_cooldown_secs as i64 * 1000;

        let mut ready = Vec::new();
        let mut min_wait_ms: Option<i64> = None;
        for (index, bot) in self.bots.iter().enumerate() {
            let status = self.store.get(&bot.name).cloned().unwrap_or_default();
            let wait = time_until_eligible(&status, now_ms, cooldown_ms);
            if wait == 0 {
                ready.push(index);
            } else {
                min_wait_ms = Some(min_wait_ms.map_or(wait, |m| m.min(wait)));
            }
        }

        let mut summary = TickSummary {
            ready: ready.len(),
            cooling: self.bots.len() - ready.len(),
            outcomes: Vec::new(),
        };

        if ready.is_empty() {
            if let Some(wait) = min_wait_ms {
                println!(
                    "[{}] all {} bots cooling, next eligible in {}s",
                    log_ts(),
                    self.bots.len(),
                    (wait + 999) / 1000
                );
            }
            return summary;
        }

        println!(
            "[{}] tick: {} ready, {} cooling",
            log_ts(),
            summary.ready,
            summary.cooling
        );

        for index in ready {
            let name = self.bots[index].name.clone();
            let outcome = self.attempt_mint(index, now_ms).await;
            summary.outcomes.push((name, outcome));

            // flush before the next bot so a crash loses at most this one
            if let Err(e) = self.store.save() {
                eprintln!("[{}] failed to persist status store: {}", log_ts(), e);
            }
        }

        summary
    }

    /// Drive one bot through the attempt sequence. Every failure is
    /// handled here; nothing propagates far enough to abort the tick.
    async fn attempt_mint(&mut self, bot_index: usize, now_ms: i64) -> AttemptOutcome {
        let bot = self.bots[bot_index].clone();

        let claim = match self.platform.claim_status(&bot, bot_index).await {
            Ok(claim) => claim,
            Err(e) => {
                eprintln!("[{}] {}: {}", log_ts(), bot.name, e);
                // no timing change, the bot stays ready for the next tick
                return AttemptOutcome::StatusCheckFailed;
            }
        };

        {
            let status = self.store.entry(&bot.name);
            status.last_status_check = Some(now_ms);
            match &claim {
                ClaimStatus::Claimed => status.claimed = true,
                ClaimStatus::Other(state) => {
                    status.claimed = false;
                    println!(
                        "[{}] {}: not claimed yet ({}), skipping",
                        log_ts(),
                        bot.name,
                        state
                    );
                    return AttemptOutcome::Unclaimed;
                }
            }
        }

        let payload = self.payload.clone();
        let submit = match self.submit_payload(&bot, bot_index, &payload, now_ms).await {
            Ok(submit) => submit,
            Err(e) => {
                eprintln!("[{}] {}: post failed: {}", log_ts(), bot.name, e);
                let status = self.store.entry(&bot.name);
                status.last_post_result = Some(format!("network_error: {}", e));
                // timing untouched, retried at the next readiness check
                return AttemptOutcome::NetworkFailed;
            }
        };

        let cooldown_ms = self.schedule.default_cooldown_secs as i64 * 1000;
        match submit {
            SubmitOutcome::Posted {
                verified,
                finalized_id,
                next_mint_seconds,
            } => {
                let status = self.store.entry(&bot.name);
                status.last_mint_attempt = Some(now_ms);
                let delay_ms = next_mint_seconds
                    .map(|s| s as i64 * 1000)
                    .unwrap_or(cooldown_ms);
                status.next_mint_at = Some(now_ms + delay_ms);

                if verified {
                    status.last_post_result = Some("mint_ok".to_string());
                    if let Some(id) = finalized_id {
                        status.post_ids.push(id);
                    }
                    println!(
                        "[{}] {}: mint posted, next in {}s",
                        log_ts(),
                        bot.name,
                        delay_ms / 1000
                    );
                } else {
                    status.last_post_result = Some("mint_posted_unverified".to_string());
                    println!(
                        "[{}] {}: mint posted but unverified, next in {}s",
                        log_ts(),
                        bot.name,
                        delay_ms / 1000
                    );
                }
                AttemptOutcome::Minted { verified }
            }
            SubmitOutcome::RateLimited { retry_after, hint } => {
                let secs = retry_after.as_secs();
                let status = self.store.entry(&bot.name);
                // server override, not a normal cooldown start
                status.next_mint_at = Some(now_ms + retry_after.as_millis() as i64);
                status.last_post_result = Some(format!("rate_limited_{}s", secs));
                println!(
                    "[{}] {}: rate limited, retrying in {}s{}",
                    log_ts(),
                    bot.name,
                    secs,
                    hint.map(|h| format!(" ({})", h)).unwrap_or_default()
                );
                AttemptOutcome::RateLimited {
                    retry_after_secs: secs,
                }
            }
            SubmitOutcome::Rejected { status: code, error } => {
                let status = self.store.entry(&bot.name);
                status.last_post_result = Some(format!("post_rejected_{}: {}", code, error));
                // timing deliberately left alone
                eprintln!(
                    "[{}] {}: post rejected with {}: {}",
                    log_ts(),
                    bot.name,
                    code,
                    error
                );
                AttemptOutcome::Rejected { status: code }
            }
        }
    }

    /// Post one inscription and resolve its verification challenge if the
    /// platform demands one. Shared by mint, link and transfer.
    async fn submit_payload(
        &self,
        bot: &Bot,
        bot_index: usize,
        payload: &MintPayload,
        now_ms: i64,
    ) -> Result<SubmitOutcome> {
        let title = token::post_title(payload.operation, &payload.ticker);
        let content = payload
            .to_content()
            .map_err(|e| crate::error::MintError::Response(e.to_string()))?;

        let outcome = self
            .platform
            .create_post(bot, bot_index, &title, &content)
            .await?;

        match outcome {
            PostOutcome::Created {
                post_id,
                challenge,
                next_mint_seconds,
            } => {
                let (verified, content_id) = match challenge {
                    None => (true, None),
                    Some(challenge) => {
                        self.resolve_challenge(bot, bot_index, &challenge, now_ms).await
                    }
                };
                // the id is only recorded once the post actually finalized
                let finalized_id = if verified { content_id.or(post_id) } else { None };
                Ok(SubmitOutcome::Posted {
                    verified,
                    finalized_id,
                    next_mint_seconds,
                })
            }
            PostOutcome::RateLimited { retry_after, hint } => {
                Ok(SubmitOutcome::RateLimited { retry_after, hint })
            }
            PostOutcome::Rejected { status, error } => {
                Ok(SubmitOutcome::Rejected { status, error })
            }
        }
    }

    /// Solve and answer a challenge. Returns whether verification
    /// succeeded and the platform's content id when it did.
    async fn resolve_challenge(
        &self,
        bot: &Bot,
        bot_index: usize,
        challenge: &Challenge,
        now_ms: i64,
    ) -> (bool, Option<String>) {
        let now = DateTime::from_timestamp_millis(now_ms).unwrap_or_else(Utc::now);
        if challenge.is_expired(now) {
            eprintln!(
                "[{}] {}: challenge {} already expired, leaving post unverified",
                log_ts(),
                bot.name,
                challenge.code
            );
            return (false, None);
        }

        let answer = match self.solver.solve(&challenge.text).await {
            Ok(answer) => answer,
            Err(e) => {
                eprintln!("[{}] {}: {}", log_ts(), bot.name, e);
                return (false, None);
            }
        };

        match self
            .platform
            .submit_verification(bot, bot_index, &challenge.code, &answer)
            .await
        {
            Ok(verify) if verify.success => (true, verify.content_id),
            Ok(_) => {
                eprintln!(
                    "[{}] {}: verification answer {} rejected",
                    log_ts(),
                    bot.name,
                    answer
                );
                (false, None)
            }
            Err(e) => {
                eprintln!(
                    "[{}] {}: verification submit failed: {}",
                    log_ts(),
                    bot.name,
                    e
                );
                (false, None)
            }
        }
    }

    /// Link the wallet for every bot that has not linked yet
    pub async fn run_link(&mut self, wallet: &str) -> LinkReport {
        let payload = MintPayload::link(&self.payload.protocol, &self.payload.ticker, wallet);
        let mut report = LinkReport::default();
        let now_ms = Utc::now().timestamp_millis();

        for index in 0..self.bots.len() {
            let bot = self.bots[index].clone();

            if self.store.entry(&bot.name).wallet_linked {
                println!("[{}] {}: wallet already linked", log_ts(), bot.name);
                report.skipped += 1;
                continue;
            }

            match self.platform.claim_status(&bot, index).await {
                Ok(ClaimStatus::Claimed) => {
                    let status = self.store.entry(&bot.name);
                    status.claimed = true;
                    status.last_status_check = Some(now_ms);
                }
                Ok(ClaimStatus::Other(state)) => {
                    let status = self.store.entry(&bot.name);
                    status.claimed = false;
                    status.last_status_check = Some(now_ms);
                    println!("[{}] {}: not claimed ({}), skipping link", log_ts(), bot.name, state);
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    eprintln!("[{}] {}: {}", log_ts(), bot.name, e);
                    report.failed += 1;
                    continue;
                }
            }

            match self.submit_payload(&bot, index, &payload, now_ms).await {
                Ok(SubmitOutcome::Posted { verified: true, .. }) => {
                    let status = self.store.entry(&bot.name);
                    status.wallet_linked = true;
                    status.last_post_result = Some("link_ok".to_string());
                    println!("[{}] {}: wallet linked", log_ts(), bot.name);
                    report.linked += 1;
                }
                Ok(SubmitOutcome::Posted { verified: false, .. }) => {
                    let status = self.store.entry(&bot.name);
                    status.last_post_result = Some("link_posted_unverified".to_string());
                    eprintln!("[{}] {}: link posted but unverified", log_ts(), bot.name);
                    report.failed += 1;
                }
                Ok(SubmitOutcome::RateLimited { retry_after, .. }) => {
                    let status = self.store.entry(&bot.name);
                    status.last_post_result =
                        Some(format!("link_rate_limited_{}s", retry_after.as_secs()));
                    eprintln!("[{}] {}: link rate limited", log_ts(), bot.name);
                    report.failed += 1;
                }
                Ok(SubmitOutcome::Rejected { status: code, error }) => {
                    let status = self.store.entry(&bot.name);
                    status.last_post_result =
                        Some(format!("link_rejected_{}: {}", code, error));
                    eprintln!("[{}] {}: link rejected with {}", log_ts(), bot.name, code);
                    report.failed += 1;
                }
                Err(e) => {
                    eprintln!("[{}] {}: link failed: {}", log_ts(), bot.name, e);
                    report.failed += 1;
                }
            }

            if let Err(e) = self.store.save() {
                eprintln!("[{}] failed to persist status store: {}", log_ts(), e);
            }
        }

        report
    }

    /// Post one transfer inscription from the given sender. Returns true
    /// when the transfer finalized.
    pub async fn run_transfer(
        &mut self,
        from_index: usize,
        ticker: &str,
        amount: u64,
        to: &str,
    ) -> anyhow::Result<bool> {
        let bot = self
            .bots
            .get(from_index)
            .cloned()
            .with_context(|| format!("sender index {} out of range", from_index))?;
        let payload = MintPayload::transfer(&self.payload.protocol, ticker, amount, to);
        let now_ms = Utc::now().timestamp_millis();

        match self.platform.claim_status(&bot, from_index).await {
            Ok(ClaimStatus::Claimed) => {
                let status = self.store.entry(&bot.name);
                status.claimed = true;
                status.last_status_check = Some(now_ms);
            }
            Ok(ClaimStatus::Other(state)) => {
                println!("[{}] {}: not claimed ({}), cannot transfer", log_ts(), bot.name, state);
                let status = self.store.entry(&bot.name);
                status.claimed = false;
                status.last_status_check = Some(now_ms);
                self.store.save().ok();
                return Ok(false);
            }
            Err(e) => {
                eprintln!("[{}] {}: {}", log_ts(), bot.name, e);
                return Ok(false);
            }
        }

        let finalized = match self.submit_payload(&bot, from_index, &payload, now_ms).await {
            Ok(SubmitOutcome::Posted {
                verified: true,
                finalized_id,
                ..
            }) => {
                let status = self.store.entry(&bot.name);
                status.last_post_result = Some("transfer_ok".to_string());
                if let Some(id) = finalized_id {
                    status.post_ids.push(id);
                }
                println!(
                    "[{}] {}: transferred {} {} to {}",
                    log_ts(),
                    bot.name,
                    amount,
                    ticker,
                    to
                );
                true
            }
            Ok(SubmitOutcome::Posted { verified: false, .. }) => {
                let status = self.store.entry(&bot.name);
                status.last_post_result = Some("transfer_posted_unverified".to_string());
                eprintln!("[{}] {}: transfer posted but unverified", log_ts(), bot.name);
                false
            }
            Ok(SubmitOutcome::RateLimited { retry_after, .. }) => {
                let status = self.store.entry(&bot.name);
                status.last_post_result =
                    Some(format!("transfer_rate_limited_{}s", retry_after.as_secs()));
                eprintln!("[{}] {}: transfer rate limited", log_ts(), bot.name);
                false
            }
            Ok(SubmitOutcome::Rejected { status: code, error }) => {
                let status = self.store.entry(&bot.name);
                status.last_post_result = Some(format!("transfer_rejected_{}: {}", code, error));
                eprintln!("[{}] {}: transfer rejected with {}", log_ts(), bot.name, code);
                false
            }
            Err(e) => {
                eprintln!("[{}] {}: transfer failed: {}", log_ts(), bot.name, e);
                false
            }
        };

        self.store.save().ok();
        Ok(finalized)
    }

    /// How long to sleep before the next tick
    fn sleep_duration(&self, now_ms: i64) -> Duration {
        if !self.schedule.adaptive {
            return Duration::from_secs(self.schedule.tick_interval_secs);
        }

        let cooldown_ms = self.schedule.default_cooldown_secs as i64 * 1000;
        let min_wait_ms = self
            .bots
            .iter()
            .map(|bot| {
                let status = self.store.get(&bot.name).cloned().unwrap_or_default();
                time_until_eligible(&status, now_ms, cooldown_ms)
            })
            .min()
            .unwrap_or(self.schedule.tick_interval_secs as i64 * 1000);

        let floor = self.schedule.min_sleep_secs.max(MIN_SLEEP_FLOOR_SECS);
        let ceiling = self.schedule.max_sleep_secs.max(floor);
        let wanted = ((min_wait_ms + 999) / 1000) as u64;
        Duration::from_secs(wanted.clamp(floor, ceiling))
    }
}

fn log_ts() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MintError;
    use crate::gateway::VerifyOutcome;
    use crate::llm::MockLlmClient;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use tempfile::TempDir;

    const NOW_MS: i64 = 1_750_000_000_000;
    const COOLDOWN_MS: i64 = 1_800_000;

    /// Scripted platform. Defaults: every bot claimed, every post created
    /// with id "p-default" and no challenge, every verification succeeds.
    struct MockPlatform {
        claims: Mutex<HashMap<String, Option<ClaimStatus>>>,
        post_queue: Mutex<HashMap<String, VecDeque<Option<PostOutcome>>>>,
        verify: Mutex<HashMap<String, VerifyOutcome>>,
        post_calls: Mutex<Vec<(String, String, String)>>,
        verify_calls: Mutex<Vec<(String, String, String)>>,
    }

    impl MockPlatform {
        fn new() -> Self {
            Self {
                claims: Mutex::new(HashMap::new()),
                post_queue: Mutex::new(HashMap::new()),
                verify: Mutex::new(HashMap::new()),
                post_calls: Mutex::new(Vec::new()),
                verify_calls: Mutex::new(Vec::new()),
            }
        }

        fn set_claim(&self, name: &str, status: ClaimStatus) {
            self.claims.lock().unwrap().insert(name.to_string(), Some(status));
        }

        fn fail_claim(&self, name: &str) {
            self.claims.lock().unwrap().insert(name.to_string(), None);
        }

        fn push_post(&self, name: &str, outcome: PostOutcome) {
            self.post_queue
                .lock()
                .unwrap()
                .entry(name.to_string())
                .or_default()
                .push_back(Some(outcome));
        }

        fn push_post_error(&self, name: &str) {
            self.post_queue
                .lock()
                .unwrap()
                .entry(name.to_string())
                .or_default()
                .push_back(None);
        }

        fn set_verify(&self, name: &str, outcome: VerifyOutcome) {
            self.verify.lock().unwrap().insert(name.to_string(), outcome);
        }

        fn post_count(&self) -> usize {
            self.post_calls.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl Platform for MockPlatform {
        async fn claim_status(&self, bot: &Bot, _bot_index: usize) -> Result<ClaimStatus> {
            match self.claims.lock().unwrap().get(&bot.name) {
                Some(Some(status)) => Ok(status.clone()),
                Some(None) => Err(MintError::StatusCheckFailed("mock failure".to_string())),
                None => Ok(ClaimStatus::Claimed),
            }
        }

        async fn create_post(
            &self,
            bot: &Bot,
            _bot_index: usize,
            title: &str,
            content: &str,
        ) -> Result<PostOutcome> {
            self.post_calls.lock().unwrap().push((
                bot.name.clone(),
                title.to_string(),
                content.to_string(),
            ));
            let queued = self
                .post_queue
                .lock()
                .unwrap()
                .get_mut(&bot.name)
                .and_then(|q| q.pop_front());
            match queued {
                Some(Some(outcome)) => Ok(outcome),
                Some(None) => Err(MintError::Http("mock network failure".to_string())),
                None => Ok(PostOutcome::Created {
                    post_id: Some("p-default".to_string()),
                    challenge: None,
                    next_mint_seconds: None,
                }),
            }
        }

        async fn submit_verification(
            &self,
            bot: &Bot,
            _bot_index: usize,
            code: &str,
            answer: &str,
        ) -> Result<VerifyOutcome> {
            self.verify_calls.lock().unwrap().push((
                bot.name.clone(),
                code.to_string(),
                answer.to_string(),
            ));
            Ok(self
                .verify
                .lock()
                .unwrap()
                .get(&bot.name)
                .cloned()
                .unwrap_or(VerifyOutcome {
                    success: true,
                    content_id: None,
                }))
        }
    }

    fn make_scheduler(
        platform: Arc<MockPlatform>,
        llm_replies: Vec<&str>,
        bot_names: &[&str],
        dir: &TempDir,
    ) -> MintScheduler {
        let solver = ChallengeSolver::new(Arc::new(MockLlmClient::new(
            llm_replies.into_iter().map(String::from).collect(),
        )));
        let bots = bot_names
            .iter()
            .enumerate()
            .map(|(i, name)| Bot {
                name: name.to_string(),
                api_key: format!("key-{}", i),
                claim_url: None,
            })
            .collect();
        MintScheduler::new(
            platform,
            solver,
            StatusStore::load(dir.path().join("status.json")),
            bots,
            MintPayload::mint("molt-20", "MOLT", 1000),
            ScheduleConfig::default(),
        )
    }

    #[test]
    fn test_readiness_prefers_next_mint_at() {
        // next_mint_at overrides whatever the last attempt would imply
        let status = BotStatus {
            last_mint_attempt: Some(NOW_MS - 10 * COOLDOWN_MS),
            next_mint_at: Some(NOW_MS + 60_000),
            ..BotStatus::default()
        };
        assert_eq!(time_until_eligible(&status, NOW_MS, COOLDOWN_MS), 60_000);
        assert_eq!(time_until_eligible(&status, NOW_MS + 60_000, COOLDOWN_MS), 0);
    }

    #[test]
    fn test_readiness_falls_back_to_cooldown() {
        let status = BotStatus {
            last_mint_attempt: Some(NOW_MS - 600_000),
            ..BotStatus::default()
        };
        assert_eq!(
            time_until_eligible(&status, NOW_MS, COOLDOWN_MS),
            COOLDOWN_MS - 600_000
        );
    }

    #[test]
    fn test_fresh_bot_is_ready_immediately() {
        assert_eq!(time_until_eligible(&BotStatus::default(), NOW_MS, COOLDOWN_MS), 0);
    }

    #[tokio::test]
    async fn test_fresh_bot_mints_and_reschedules() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        let mut scheduler = make_scheduler(platform.clone(), vec![], &["Alpha"], &dir);

        let summary = scheduler.run_tick(NOW_MS).await;
        assert_eq!(summary.ready, 1);
        assert_eq!(
            summary.outcomes,
            vec![("Alpha".to_string(), AttemptOutcome::Minted { verified: true })]
        );

        let status = scheduler.store().get("Alpha").unwrap();
        assert!(status.claimed);
        assert_eq!(status.last_mint_attempt, Some(NOW_MS));
        assert_eq!(status.next_mint_at, Some(NOW_MS + COOLDOWN_MS));
        assert_eq!(status.last_post_result.as_deref(), Some("mint_ok"));
        assert_eq!(status.post_ids, vec!["p-default".to_string()]);
    }

    #[tokio::test]
    async fn test_unclaimed_bot_skips_post() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        platform.set_claim("Beta", ClaimStatus::Other("unclaimed".to_string()));
        let mut scheduler = make_scheduler(platform.clone(), vec![], &["Beta"], &dir);

        let summary = scheduler.run_tick(NOW_MS).await;
        assert_eq!(
            summary.outcomes,
            vec![("Beta".to_string(), AttemptOutcome::Unclaimed)]
        );
        assert_eq!(platform.post_count(), 0);

        // status unchanged except the check timestamp, bot stays ready
        let status = scheduler.store().get("Beta").unwrap();
        assert_eq!(status.last_status_check, Some(NOW_MS));
        assert!(status.last_mint_attempt.is_none());
        assert!(status.next_mint_at.is_none());
        assert_eq!(time_until_eligible(status, NOW_MS + 1, COOLDOWN_MS), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_overrides_cooldown() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        platform.push_post(
            "Alpha",
            PostOutcome::RateLimited {
                retry_after: Duration::from_secs(90),
                hint: None,
            },
        );
        let mut scheduler = make_scheduler(platform, vec![], &["Alpha"], &dir);

        scheduler.run_tick(NOW_MS).await;

        let status = scheduler.store().get("Alpha").unwrap();
        // 90s from the server wins over the 1800s default
        assert_eq!(status.next_mint_at, Some(NOW_MS + 90_000));
        assert!(status.last_mint_attempt.is_none());
        assert!(status.last_post_result.as_deref().unwrap().contains("rate_limit"));
    }

    #[tokio::test]
    async fn test_rate_limit_from_minutes() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        platform.push_post(
            "Gamma",
            PostOutcome::RateLimited {
                retry_after: Duration::from_secs(5 * 60),
                hint: Some("too many mints".to_string()),
            },
        );
        let mut scheduler = make_scheduler(platform, vec![], &["Gamma"], &dir);

        scheduler.run_tick(NOW_MS).await;

        let status = scheduler.store().get("Gamma").unwrap();
        assert_eq!(status.next_mint_at, Some(NOW_MS + 300_000));
        assert!(status.last_post_result.as_deref().unwrap().contains("rate_limit"));
    }

    #[tokio::test]
    async fn test_rejected_post_does_not_advance_timing() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        platform.push_post(
            "Alpha",
            PostOutcome::Rejected {
                status: 500,
                error: "internal error".to_string(),
            },
        );
        let mut scheduler = make_scheduler(platform, vec![], &["Alpha"], &dir);

        let summary = scheduler.run_tick(NOW_MS).await;
        assert_eq!(
            summary.outcomes,
            vec![("Alpha".to_string(), AttemptOutcome::Rejected { status: 500 })]
        );

        let status = scheduler.store().get("Alpha").unwrap();
        assert!(status.next_mint_at.is_none());
        assert!(status.last_mint_attempt.is_none());
        assert!(status
            .last_post_result
            .as_deref()
            .unwrap()
            .contains("post_rejected_500"));
        // still ready next tick
        assert_eq!(time_until_eligible(status, NOW_MS + 1, COOLDOWN_MS), 0);
    }

    #[tokio::test]
    async fn test_status_check_failure_leaves_bot_ready() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        platform.fail_claim("Alpha");
        let mut scheduler = make_scheduler(platform.clone(), vec![], &["Alpha"], &dir);

        let summary = scheduler.run_tick(NOW_MS).await;
        assert_eq!(
            summary.outcomes,
            vec![("Alpha".to_string(), AttemptOutcome::StatusCheckFailed)]
        );
        assert_eq!(platform.post_count(), 0);

        let status = scheduler.store().get("Alpha").cloned().unwrap_or_default();
        assert_eq!(time_until_eligible(&status, NOW_MS + 1, COOLDOWN_MS), 0);
    }

    #[tokio::test]
    async fn test_cooling_bot_is_not_processed() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        let mut scheduler = make_scheduler(platform.clone(), vec![], &["Alpha"], &dir);
        scheduler.store.entry("Alpha").next_mint_at = Some(NOW_MS + 60_000);

        let summary = scheduler.run_tick(NOW_MS).await;
        assert_eq!(summary.ready, 0);
        assert_eq!(summary.cooling, 1);
        assert!(summary.outcomes.is_empty());
        assert_eq!(platform.post_count(), 0);

        // once the deadline passes the bot is selected
        let summary = scheduler.run_tick(NOW_MS + 60_000).await;
        assert_eq!(summary.ready, 1);
        assert_eq!(platform.post_count(), 1);
    }

    #[tokio::test]
    async fn test_server_next_mint_hint_wins_over_default() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        platform.push_post(
            "Alpha",
            PostOutcome::Created {
                post_id: Some("p-1".to_string()),
                challenge: None,
                next_mint_seconds: Some(42),
            },
        );
        let mut scheduler = make_scheduler(platform, vec![], &["Alpha"], &dir);

        scheduler.run_tick(NOW_MS).await;
        let status = scheduler.store().get("Alpha").unwrap();
        assert_eq!(status.next_mint_at, Some(NOW_MS + 42_000));
    }

    #[tokio::test]
    async fn test_challenge_flow_appends_content_id() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        platform.push_post(
            "Alpha",
            PostOutcome::Created {
                post_id: Some("p-1".to_string()),
                challenge: Some(Challenge {
                    code: "v-1".to_string(),
                    text: "twoo pluus fouur".to_string(),
                    expires_at: None,
                }),
                next_mint_seconds: None,
            },
        );
        platform.set_verify(
            "Alpha",
            VerifyOutcome {
                success: true,
                content_id: Some("c-9".to_string()),
            },
        );
        let mut scheduler = make_scheduler(platform.clone(), vec!["6.00"], &["Alpha"], &dir);

        let summary = scheduler.run_tick(NOW_MS).await;
        assert_eq!(
            summary.outcomes,
            vec![("Alpha".to_string(), AttemptOutcome::Minted { verified: true })]
        );

        let verify_calls = platform.verify_calls.lock().unwrap();
        assert_eq!(verify_calls.len(), 1);
        assert_eq!(verify_calls[0].1, "v-1");
        assert_eq!(verify_calls[0].2, "6.00");

        let status = scheduler.store().get("Alpha").unwrap();
        assert_eq!(status.post_ids, vec!["c-9".to_string()]);
        assert_eq!(status.last_post_result.as_deref(), Some("mint_ok"));
    }

    #[tokio::test]
    async fn test_unsolvable_challenge_leaves_post_unverified() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        platform.push_post(
            "Alpha",
            PostOutcome::Created {
                post_id: Some("p-1".to_string()),
                challenge: Some(Challenge {
                    code: "v-1".to_string(),
                    text: "unsolvable noise".to_string(),
                    expires_at: None,
                }),
                next_mint_seconds: None,
            },
        );
        let mut scheduler = make_scheduler(
            platform.clone(),
            vec!["no idea", "still none"],
            &["Alpha"],
            &dir,
        );

        let summary = scheduler.run_tick(NOW_MS).await;
        assert_eq!(
            summary.outcomes,
            vec![("Alpha".to_string(), AttemptOutcome::Minted { verified: false })]
        );
        assert!(platform.verify_calls.lock().unwrap().is_empty());

        let status = scheduler.store().get("Alpha").unwrap();
        // the post stays created and the cooldown still applies
        assert_eq!(status.last_post_result.as_deref(), Some("mint_posted_unverified"));
        assert!(status.post_ids.is_empty());
        assert_eq!(status.next_mint_at, Some(NOW_MS + COOLDOWN_MS));
    }

    #[tokio::test]
    async fn test_expired_challenge_is_not_sent_to_oracle() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        platform.push_post(
            "Alpha",
            PostOutcome::Created {
                post_id: Some("p-1".to_string()),
                challenge: Some(Challenge {
                    code: "v-1".to_string(),
                    text: "one plus one".to_string(),
                    expires_at: DateTime::from_timestamp_millis(NOW_MS - 1_000),
                }),
                next_mint_seconds: None,
            },
        );
        let llm = Arc::new(MockLlmClient::new(vec!["2.00".to_string()]));
        let bots = vec![Bot {
            name: "Alpha".to_string(),
            api_key: "key-0".to_string(),
            claim_url: None,
        }];
        let mut scheduler = MintScheduler::new(
            platform.clone(),
            ChallengeSolver::new(llm.clone()),
            StatusStore::load(dir.path().join("status.json")),
            bots,
            MintPayload::mint("molt-20", "MOLT", 1000),
            ScheduleConfig::default(),
        );

        scheduler.run_tick(NOW_MS).await;

        assert!(llm.calls.lock().unwrap().is_empty());
        let status = scheduler.store().get("Alpha").unwrap();
        assert_eq!(status.last_post_result.as_deref(), Some("mint_posted_unverified"));
    }

    #[tokio::test]
    async fn test_one_bot_failure_does_not_block_others() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        platform.push_post_error("Alpha");
        let mut scheduler = make_scheduler(platform.clone(), vec![], &["Alpha", "Beta"], &dir);

        let summary = scheduler.run_tick(NOW_MS).await;
        assert_eq!(summary.outcomes.len(), 2);
        assert_eq!(summary.outcomes[0].1, AttemptOutcome::NetworkFailed);
        assert_eq!(
            summary.outcomes[1].1,
            AttemptOutcome::Minted { verified: true }
        );

        // the network failure is recorded but Alpha stays ready
        let alpha = scheduler.store().get("Alpha").unwrap();
        assert!(alpha.last_post_result.as_deref().unwrap().contains("network_error"));
        assert!(alpha.next_mint_at.is_none());
        let beta = scheduler.store().get("Beta").unwrap();
        assert_eq!(beta.last_post_result.as_deref(), Some("mint_ok"));
    }

    #[tokio::test]
    async fn test_store_is_persisted_during_tick() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status.json");
        let platform = Arc::new(MockPlatform::new());
        let mut scheduler = make_scheduler(platform, vec![], &["Alpha", "Beta"], &dir);

        scheduler.run_tick(NOW_MS).await;

        // a fresh load from disk sees both bots' outcomes
        let reloaded = StatusStore::load(&path);
        assert_eq!(
            reloaded.get("Alpha").unwrap().last_post_result.as_deref(),
            Some("mint_ok")
        );
        assert_eq!(
            reloaded.get("Beta").unwrap().last_post_result.as_deref(),
            Some("mint_ok")
        );
    }

    #[tokio::test]
    async fn test_bots_are_processed_in_list_order() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        let mut scheduler =
            make_scheduler(platform.clone(), vec![], &["Zeta", "Alpha", "Mu"], &dir);

        scheduler.run_tick(NOW_MS).await;

        let calls = platform.post_calls.lock().unwrap();
        let order: Vec<&str> = calls.iter().map(|(name, _, _)| name.as_str()).collect();
        assert_eq!(order, vec!["Zeta", "Alpha", "Mu"]);
    }

    #[tokio::test]
    async fn test_sleep_duration_fixed_and_adaptive() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        let mut scheduler = make_scheduler(platform, vec![], &["Alpha"], &dir);

        // fixed mode uses the tick interval
        assert_eq!(scheduler.sleep_duration(NOW_MS), Duration::from_secs(60));

        scheduler.schedule.adaptive = true;
        scheduler.store.entry("Alpha").next_mint_at = Some(NOW_MS + 120_000);
        assert_eq!(scheduler.sleep_duration(NOW_MS), Duration::from_secs(120));

        // a perpetually-ready bot still sleeps at least the floor
        scheduler.store.entry("Alpha").next_mint_at = None;
        assert_eq!(scheduler.sleep_duration(NOW_MS), Duration::from_secs(10));

        // long waits are clamped to the ceiling
        scheduler.schedule.max_sleep_secs = 900;
        scheduler.store.entry("Alpha").next_mint_at = Some(NOW_MS + 7_200_000);
        assert_eq!(scheduler.sleep_duration(NOW_MS), Duration::from_secs(900));
    }

    #[tokio::test]
    async fn test_link_marks_wallet_linked() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        let mut scheduler = make_scheduler(platform.clone(), vec![], &["Alpha", "Beta"], &dir);
        scheduler.store.entry("Beta").wallet_linked = true;

        let report = scheduler.run_link("molt1qwallet").await;
        assert_eq!(
            report,
            LinkReport {
                linked: 1,
                skipped: 1,
                failed: 0
            }
        );

        let alpha = scheduler.store().get("Alpha").unwrap();
        assert!(alpha.wallet_linked);
        assert_eq!(alpha.last_post_result.as_deref(), Some("link_ok"));

        // the link inscription carried the wallet
        let calls = platform.post_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].2.contains(r#""operation":"link""#));
        assert!(calls[0].2.contains("molt1qwallet"));
    }

    #[tokio::test]
    async fn test_transfer_records_result() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(MockPlatform::new());
        let mut scheduler = make_scheduler(platform.clone(), vec![], &["Alpha"], &dir);

        let finalized = scheduler.run_transfer(0, "MOLT", 25, "Beta").await.unwrap();
        assert!(finalized);

        let status = scheduler.store().get("Alpha").unwrap();
        assert_eq!(status.last_post_result.as_deref(), Some("transfer_ok"));

        let calls = platform.post_calls.lock().unwrap();
        assert!(calls[0].2.contains(r#""to":"Beta""#));
        assert!(calls[0].2.contains(r#""amount":"25""#));

        let bad = scheduler.run_transfer(9, "MOLT", 1, "Beta").await;
        assert!(bad.is_err());
    }
}
