use std::time::Duration;

use anyhow::anyhow;
use reqwest::Client;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::warn;

use crate::topics::{Mode, Topic};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const CHAT_MODEL: &str = "gpt-4o";
const MAX_ATTEMPTS: u32 = 3;

/// Narration script and publish metadata for one part.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContentBundle {
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub tweet: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// One chat-completion call per topic, retried with exponential backoff on
/// transient failures.
pub async fn generate_content(
    client: &Client,
    api_key: &str,
    topic: &Topic,
    language: &str,
    affiliate_url: Option<&str>,
) -> anyhow::Result<ContentBundle> {
    let prompt = build_prompt(topic, language, affiliate_url);
    let mut attempt = 0;
    loop {
        match request_completion(client, api_key, &prompt).await {
            Ok(raw) => return Ok(parse_content_response(&raw)),
            Err(e) => {
                attempt += 1;
                if attempt >= MAX_ATTEMPTS {
                    return Err(e);
                }
                warn!(
                    "Content generation attempt {} for '{}' failed: {:#}",
                    attempt, topic.title, e
                );
                sleep(Duration::from_secs(1 << (attempt - 1))).await;
            }
        }
    }
}

async fn request_completion(client: &Client, api_key: &str, prompt: &str) -> anyhow::Result<String> {
    let body = serde_json::json!({
        "model": CHAT_MODEL,
        "messages": [{"role": "user", "content": prompt}],
        "temperature": 0.7,
    });
    let response: serde_json::Value = client
        .post(OPENAI_CHAT_URL)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let raw = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| anyhow!("completion response carried no message content"))?;
    Ok(raw.trim().to_string())
}

fn build_prompt(topic: &Topic, language: &str, affiliate_url: Option<&str>) -> String {
    let cta = affiliate_url.unwrap_or("Support the channel");
    let meta = &topic.meta;
    let tone = match meta.mode {
        Mode::FunnyTexts => "a playful, comedic tone built around absurd text exchanges",
        Mode::SpookyStory => "an eerie, slow-burn horror tone (unsettling, no gore)",
        Mode::VoxelStory => "an adventurous tone set in a blocky sandbox world",
        Mode::Mixed => "a vivid storytelling tone matching the theme",
    };
    format!(
        "You are a creative content creator for social media platforms. \
         Create the following items for a 30 second vertical video, episode Part {part} \
         of the ongoing series \"{seed}\", using {tone}:\n\
         1. SCRIPT: A narrative script in {language} lasting roughly 30 seconds. \
         Start with a strong hook in the first two seconds, continue the story \
         naturally from prior parts, and end on a beat that makes viewers want Part {next}. \
         Conclude with a call-to-action directing viewers to {cta}.\n\
         2. TWEET: A short message under 280 characters in {language} promoting the video \
         with a call to action to {cta}.\n\
         3. TITLE: A concise, attention grabbing YouTube Short title mentioning Part {part}.\n\
         4. DESCRIPTION: A longer description for the video including a call to action \
         directing viewers to {cta}.\n\
         5. HASHTAGS: A list of 6-10 relevant hashtags for the topic.\n\
         Format your answer as JSON with the keys script, tweet, title, description, \
         hashtags (the hashtags as a list).",
        part = meta.part,
        seed = meta.seed,
        next = meta.part + 1,
    )
}

/// Parse the model response with a three-stage fallback: the whole reply as
/// JSON, then the first embedded JSON object, then labeled lines. Always
/// produces a bundle; empty fields are the caller's concern.
pub fn parse_content_response(raw: &str) -> ContentBundle {
    let stripped = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    if let Ok(bundle) = serde_json::from_str::<ContentBundle>(stripped) {
        return bundle;
    }
    if let (Some(start), Some(end)) = (stripped.find('{'), stripped.rfind('}')) {
        if end > start {
            if let Ok(bundle) = serde_json::from_str::<ContentBundle>(&stripped[start..=end]) {
                return bundle;
            }
        }
    }
    parse_labeled_lines(stripped)
}

fn parse_labeled_lines(raw: &str) -> ContentBundle {
    let mut bundle = ContentBundle::default();
    for line in raw.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        if key.starts_with("script") {
            bundle.script = value.to_string();
        } else if key.starts_with("tweet") {
            bundle.tweet = value.to_string();
        } else if key.starts_with("title") {
            bundle.title = value.to_string();
        } else if key.starts_with("description") {
            bundle.description = value.to_string();
        } else if key.starts_with("hashtag") {
            bundle.hashtags = value
                .replace(',', " ")
                .split_whitespace()
                .map(|t| format!("#{}", t.trim_start_matches('#')))
                .collect();
        }
    }
    bundle
}
