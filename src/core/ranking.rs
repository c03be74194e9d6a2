use serde_json::Value;
use std::collections::HashSet;

use crate::core::prompts::{build_user_prompt, SYSTEM_PROMPT};
use crate::core::scoring::PriorityWeights;
use crate::models::{FinalPick, RankingSource, ScoredCandidate, UserRequest};
use crate::services::OpenAiClient;

/// Number of buildings in the final shortlist
pub const SHORTLIST_SIZE: usize = 3;

/// Reasons kept per pick
pub const MAX_REASONS: usize = 3;

/// Parse the ranking service's free-form reply into picks.
///
/// The first `[` that opens a JSON array of `{id, reasons}` objects with a
/// known id wins; brackets in surrounding prose are skipped. When no such
/// array exists the text is split on commas and newlines and each token is
/// taken as a bare id. Ids outside
/// `known` are dropped, repeats are ignored and at most three picks survive.
pub fn parse_ranking_output(text: &str, known: &HashSet<&str>) -> Vec<FinalPick> {
    let structured = parse_structured(text, known);
    if !structured.is_empty() {
        return structured;
    }
    parse_tokens(text, known)
}

fn parse_structured(text: &str, known: &HashSet<&str>) -> Vec<FinalPick> {
    for (start, _) in text.match_indices('[') {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Vec<Value>>();
        let Some(Ok(items)) = stream.next() else {
            continue;
        };
        let picks = picks_from_items(&items, known);
        if !picks.is_empty() {
            return picks;
        }
    }
    Vec::new()
}

fn picks_from_items(items: &[Value], known: &HashSet<&str>) -> Vec<FinalPick> {
    let mut picks: Vec<FinalPick> = Vec::with_capacity(SHORTLIST_SIZE);
    for item in items {
        if picks.len() == SHORTLIST_SIZE {
            break;
        }
        let Some(id) = item.get("id").and_then(id_text) else {
            continue;
        };
        if !known.contains(id.as_str()) || picks.iter().any(|p| p.id == id) {
            continue;
        }
        picks.push(FinalPick {
            id,
            reasons: item.get("reasons").map(reasons_from).unwrap_or_default(),
        });
    }
    picks
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn reasons_from(value: &Value) -> Vec<String> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    items
        .into_iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .take(MAX_REASONS)
        .map(str::to_string)
        .collect()
}

fn parse_tokens(text: &str, known: &HashSet<&str>) -> Vec<FinalPick> {
    let mut picks: Vec<FinalPick> = Vec::with_capacity(SHORTLIST_SIZE);
    for token in text.split(|c: char| c == ',' || c == '\n') {
        if picks.len() == SHORTLIST_SIZE {
            break;
        }
        let token = token.trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '[' | ']' | '`'));
        if token.is_empty() || !known.contains(token) || picks.iter().any(|p| p.id == token) {
            continue;
        }
        picks.push(FinalPick::without_reasons(token));
    }
    picks
}

/// Top three scored candidates with empty reasons
pub fn fallback_shortlist(candidates: &[ScoredCandidate]) -> Vec<FinalPick> {
    candidates
        .iter()
        .take(SHORTLIST_SIZE)
        .map(|c| FinalPick::without_reasons(c.id.clone()))
        .collect()
}

/// Fill a short list up to three from the highest-scored unpicked candidates
pub fn top_up(mut picks: Vec<FinalPick>, candidates: &[ScoredCandidate]) -> Vec<FinalPick> {
    for candidate in candidates {
        if picks.len() >= SHORTLIST_SIZE {
            break;
        }
        if !picks.iter().any(|p| p.id == candidate.id) {
            picks.push(FinalPick::without_reasons(candidate.id.clone()));
        }
    }
    picks
}

/// Choose the final shortlist from the score-ordered top-N.
///
/// Delegates to the ranking service when one is configured. Any transport
/// error or unusable reply falls back to score order; the service's answer is
/// never trusted to contain only known ids.
pub async fn select_shortlist(
    llm: Option<&OpenAiClient>,
    request: &UserRequest,
    resolved: Option<(f64, f64)>,
    weights: &PriorityWeights,
    candidates: &[ScoredCandidate],
) -> (Vec<FinalPick>, RankingSource) {
    if candidates.is_empty() {
        return (Vec::new(), RankingSource::ScoreFallback);
    }

    let Some(llm) = llm else {
        tracing::debug!("No ranking service configured, using score order");
        return (fallback_shortlist(candidates), RankingSource::ScoreFallback);
    };

    let user_prompt = build_user_prompt(request, resolved, weights, candidates);
    let reply = match llm.chat(SYSTEM_PROMPT, &user_prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("Ranking service failed ({}), using score order", e);
            return (fallback_shortlist(candidates), RankingSource::ScoreFallback);
        }
    };

    let known: HashSet<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
    let picks = parse_ranking_output(&reply, &known);

    if picks.is_empty() {
        tracing::warn!("Ranking reply contained no known building ids, using score order");
        return (fallback_shortlist(candidates), RankingSource::ScoreFallback);
    }
    if picks.len() < SHORTLIST_SIZE {
        tracing::debug!("Ranking reply had {} usable picks, topping up", picks.len());
    }

    (top_up(picks, candidates), RankingSource::RankingService)
}
