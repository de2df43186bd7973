use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tokio::time::sleep;
use tracing::{info, warn};

const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";
const SPEECH_MODEL: &str = "tts-1";
const VOICE: &str = "alloy";
const SPEED: f64 = 1.0;
const MAX_ATTEMPTS: u32 = 3;

/// Synthesize the narration voice-over and write it as `{slug}.wav` under
/// the output directory. WAV output so the compositor can measure the
/// duration with hound.
pub async fn synthesize_speech(
    client: &Client,
    api_key: &str,
    text: &str,
    slug: &str,
    out_dir: &Path,
) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let out_path = out_dir.join(format!("{slug}.wav"));

    let mut attempt = 0;
    let bytes = loop {
        match request_speech(client, api_key, text).await {
            Ok(bytes) => break bytes,
            Err(e) => {
                attempt += 1;
                if attempt >= MAX_ATTEMPTS {
                    return Err(e);
                }
                warn!("Speech synthesis attempt {} failed: {:#}", attempt, e);
                sleep(Duration::from_secs(1 << (attempt - 1))).await;
            }
        }
    };
    fs::write(&out_path, bytes)?;
    info!("Voice-over written to {}", out_path.display());
    Ok(out_path)
}

async fn request_speech(client: &Client, api_key: &str, text: &str) -> anyhow::Result<Vec<u8>> {
    let body = serde_json::json!({
        "model": SPEECH_MODEL,
        "voice": VOICE,
        "input": text,
        "speed": SPEED,
        "response_format": "wav",
    });
    let response = client
        .post(OPENAI_SPEECH_URL)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}
