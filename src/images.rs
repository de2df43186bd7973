use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::anyhow;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::topics::{Mode, Topic};

const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";
const IMAGE_MODEL: &str = "gpt-image-1";
// Portrait source raster; the compositor cover-scales to the 1080x1920
// canvas, so the exact generator size is immaterial.
const IMAGE_SIZE: &str = "1024x1536";
const MAX_ATTEMPTS: u32 = 3;

fn image_prompt(mode: Mode, seed: &str, part: u32) -> String {
    match mode {
        Mode::VoxelStory => format!(
            "Vertical 1080x1920 digital art in a voxel/blocky sandbox style (no logos), \
             dramatic lighting, scene that fits the theme '{seed}', episode Part {part}. \
             High contrast, cinematic, clean focal point."
        ),
        Mode::SpookyStory => format!(
            "Vertical 1080x1920 eerie cinematic illustration, moody lighting, \
             subtle horror (no gore), fits theme '{seed}', Part {part}."
        ),
        Mode::FunnyTexts => format!(
            "Vertical 1080x1920 clean minimal background suitable for overlay text, \
             playful vibe, fits theme '{seed}', Part {part}."
        ),
        Mode::Mixed => {
            "Vertical 1080x1920 cinematic illustration, dramatic, clean focal point."
                .to_string()
        }
    }
}

/// Generate the background raster for one topic and write it as
/// `{slug}.jpg` under the output directory.
pub async fn generate_image(
    client: &Client,
    api_key: &str,
    topic: &Topic,
    out_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let meta = &topic.meta;
    let prompt = image_prompt(meta.mode, &meta.seed, meta.part);
    fs::create_dir_all(out_dir)?;
    let out_path = out_dir.join(format!("{}.jpg", meta.slug()));

    let mut attempt = 0;
    let bytes = loop {
        match request_image(client, api_key, &prompt).await {
            Ok(bytes) => break bytes,
            Err(e) => {
                attempt += 1;
                if attempt >= MAX_ATTEMPTS {
                    return Err(e);
                }
                warn!(
                    "Image generation attempt {} for '{}' failed: {:#}",
                    attempt, topic.title, e
                );
                sleep(Duration::from_secs(1 << (attempt - 1))).await;
            }
        }
    };
    fs::write(&out_path, bytes)?;
    info!("Background image written to {}", out_path.display());
    Ok(out_path)
}

async fn request_image(client: &Client, api_key: &str, prompt: &str) -> anyhow::Result<Vec<u8>> {
    let body = serde_json::json!({
        "model": IMAGE_MODEL,
        "prompt": prompt,
        "size": IMAGE_SIZE,
    });
    let response: serde_json::Value = client
        .post(OPENAI_IMAGES_URL)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let b64 = response["data"][0]["b64_json"]
        .as_str()
        .ok_or_else(|| anyhow!("image response carried no b64_json payload"))?;
    Ok(BASE64.decode(b64)?)
}
