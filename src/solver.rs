//! Deobfuscates the platform's arithmetic challenges and resolves them
//! through the LLM oracle.

use crate::error::{MintError, Result};
use crate::llm::LlmClient;
use std::sync::Arc;

const SOLVE_TEMPERATURE: f32 = 0.0;
/// Slightly perturbed sampling for the corrective retry
const RETRY_TEMPERATURE: f32 = 0.4;

/// Stateless request/response adapter around the oracle
pub struct ChallengeSolver {
    llm: Arc<dyn LlmClient>,
}

impl ChallengeSolver {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Resolve a challenge to a two-decimal numeric answer.
    ///
    /// Sends both the raw and normalized text, coerces the reply to a
    /// number, and retries once with a stricter instruction before giving
    /// up with `UnsolvableChallenge`.
    pub async fn solve(&self, raw: &str) -> Result<String> {
        let normalized = normalize_challenge(raw);

        let prompt = build_prompt(raw, &normalized, false);
        let reply = self
            .llm
            .complete(&prompt, SOLVE_TEMPERATURE)
            .await
            .map_err(|e| MintError::Llm(e.to_string()))?;
        if let Some(answer) = coerce_answer(&reply) {
            return Ok(answer);
        }

        eprintln!("    oracle reply had no numeric token, retrying with stricter instruction");
        let strict = build_prompt(raw, &normalized, true);
        let reply = self
            .llm
            .complete(&strict, RETRY_TEMPERATURE)
            .await
            .map_err(|e| MintError::Llm(e.to_string()))?;
        coerce_answer(&reply).ok_or_else(|| {
            MintError::UnsolvableChallenge(reply.chars().take(120).collect())
        })
    }
}

/// Strip the deliberate noise out of a challenge text.
///
/// Keeps alphanumerics and basic punctuation, collapses whitespace,
/// lowercases, collapses repeated letters (`loooobssterr` -> `lobster`)
/// and drops isolated filler tokens. Idempotent.
pub fn normalize_challenge(raw: &str) -> String {
    const KEPT_PUNCT: &str = " .,?!%+-/*=";
    const FILLERS: &[&str] = &["um", "uh", "hm", "er", "ah"];

    let mut cleaned = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() {
            cleaned.push(' ');
        } else if KEPT_PUNCT.contains(ch) {
            cleaned.push(ch);
        }
        // everything else is decorative noise
    }

    let mut collapsed = String::with_capacity(cleaned.len());
    let mut prev: Option<char> = None;
    for ch in cleaned.chars() {
        if ch.is_ascii_alphabetic() && prev == Some(ch) {
            continue;
        }
        collapsed.push(ch);
        prev = Some(ch);
    }

    collapsed
        .split_whitespace()
        .filter(|token| {
            // a filler is a filler even with trailing punctuation ("umm,")
            let word: String = token
                .chars()
                .filter(|c| c.is_ascii_alphabetic())
                .collect();
            let rest_is_punct = token
                .chars()
                .filter(|c| !c.is_ascii_alphabetic())
                .all(|c| KEPT_PUNCT.contains(c));
            !(rest_is_punct && FILLERS.contains(&word.as_str()))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract a numeric answer from an oracle reply, two fractional digits.
///
/// Priority: an exact two-decimal token, then any decimal coerced, then a
/// bare integer coerced. None when the reply has no usable number.
pub fn coerce_answer(reply: &str) -> Option<String> {
    let tokens = numeric_tokens(reply);

    // exact two-decimal match first
    for token in &tokens {
        if let Some((int_part, frac_part)) = token.split_once('.') {
            let digits = int_part.strip_prefix('-').unwrap_or(int_part);
            if !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit())
                && frac_part.len() == 2
                && frac_part.chars().all(|c| c.is_ascii_digit())
            {
                return Some(token.clone());
            }
        }
    }

    // any decimal, rendered to two digits
    for token in &tokens {
        if token.contains('.') {
            if let Ok(value) = token.parse::<f64>() {
                return Some(format!("{:.2}", value));
            }
        }
    }

    // bare integer
    for token in &tokens {
        if !token.contains('.') {
            if let Ok(value) = token.parse::<i64>() {
                return Some(format!("{}.00", value));
            }
        }
    }

    None
}

/// Scan out candidate number tokens: optional minus, digits, at most one dot
fn numeric_tokens(reply: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = reply.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let negative = chars[i] == '-'
            && i + 1 < chars.len()
            && chars[i + 1].is_ascii_digit();
        if !negative && !chars[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let mut token = String::new();
        if negative {
            token.push('-');
            i += 1;
        }
        let mut seen_dot = false;
        while i < chars.len() {
            let ch = chars[i];
            if ch.is_ascii_digit() {
                token.push(ch);
                i += 1;
            } else if ch == '.' && !seen_dot && i + 1 < chars.len() && chars[i + 1].is_ascii_digit()
            {
                token.push('.');
                seen_dot = true;
                i += 1;
            } else {
                break;
            }
        }
        tokens.push(token);
    }

    tokens
}

fn build_prompt(raw: &str, normalized: &str, strict: bool) -> String {
    let corrective = if strict {
        "\nYour previous reply was not a plain number. Respond with the number ALONE, nothing before or after it.\n"
    } else {
        ""
    };

    format!(
        r#"Solve the arithmetic problem hidden in this text.

The text is deliberately noisy. A cleaned version is provided below, but
the original may preserve details the cleaning lost.

Original: {raw}
Cleaned: {normalized}

Rules:
- Number words map to digits: one=1, two=2 ... twenty=20, thirty=30,
  forty=40, fifty=50, sixty=60, seventy=70, eighty=80, ninety=90,
  hundred=100.
- "sum", "total", "plus", "gains", "adds" mean addition.
- "loses", "minus", "less", "gives away" mean subtraction.
- "times", "multiplied by", "product" mean multiplication.
- "divided", "per", "split among" mean division.
- "percent of" means (a / 100) * b.
{corrective}
Return ONLY a decimal number with exactly two digits after the decimal
point, like 47.00. No words, no units, no explanation.

Your response:"#
    )
}
