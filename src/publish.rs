use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::anyhow;
use chrono::Utc;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use serde_json::json;

const BLUESKY_XRPC_BASE: &str = "https://bsky.social/xrpc";
const YOUTUBE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const YOUTUBE_UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status";

/// Publishing is best-effort: outcomes are returned, never thrown past this
/// boundary, and never block series advancement.
#[derive(Debug)]
pub enum PublishOutcome {
    Posted,
    Skipped(&'static str),
    Failed(String),
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishOutcome::Posted => write!(f, "posted"),
            PublishOutcome::Skipped(reason) => write!(f, "skipped ({reason})"),
            PublishOutcome::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone)]
pub struct BlueskyCredentials {
    handle: String,
    app_password: String,
}

impl BlueskyCredentials {
    pub fn from_parts(handle: Option<String>, app_password: Option<String>) -> Option<Self> {
        Some(Self {
            handle: non_empty(handle)?,
            app_password: non_empty(app_password)?,
        })
    }

    pub fn from_env() -> Option<Self> {
        Self::from_parts(
            std::env::var("BLUESKY_HANDLE").ok(),
            std::env::var("BLUESKY_APP_PASSWORD").ok(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct YoutubeCredentials {
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

impl YoutubeCredentials {
    pub fn from_parts(
        client_id: Option<String>,
        client_secret: Option<String>,
        refresh_token: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            client_id: non_empty(client_id)?,
            client_secret: non_empty(client_secret)?,
            refresh_token: non_empty(refresh_token)?,
        })
    }

    pub fn from_env() -> Option<Self> {
        Self::from_parts(
            std::env::var("YT_CLIENT_ID").ok(),
            std::env::var("YT_CLIENT_SECRET").ok(),
            std::env::var("YT_REFRESH_TOKEN").ok(),
        )
    }
}

/// Post to the Bluesky feed with an optional thumbnail and link.
pub async fn post_bluesky(
    client: &Client,
    creds: Option<&BlueskyCredentials>,
    text: &str,
    image: Option<&Path>,
    link: Option<&str>,
) -> PublishOutcome {
    let Some(creds) = creds else {
        return PublishOutcome::Skipped("bluesky credentials missing");
    };
    match post_bluesky_inner(client, creds, text, image, link).await {
        Ok(()) => PublishOutcome::Posted,
        Err(e) => PublishOutcome::Failed(format!("{e:#}")),
    }
}

async fn post_bluesky_inner(
    client: &Client,
    creds: &BlueskyCredentials,
    text: &str,
    image: Option<&Path>,
    link: Option<&str>,
) -> anyhow::Result<()> {
    let session: serde_json::Value = client
        .post(format!("{BLUESKY_XRPC_BASE}/com.atproto.server.createSession"))
        .json(&json!({"identifier": creds.handle, "password": creds.app_password}))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let jwt = session["accessJwt"]
        .as_str()
        .ok_or_else(|| anyhow!("bluesky session carried no accessJwt"))?;
    let did = session["did"]
        .as_str()
        .ok_or_else(|| anyhow!("bluesky session carried no did"))?;

    let mut full_text = text.trim().to_string();
    if let Some(link) = link {
        full_text.push(' ');
        full_text.push_str(link.trim());
    }

    let mut record = json!({
        "$type": "app.bsky.feed.post",
        "text": full_text,
        "createdAt": Utc::now().to_rfc3339(),
    });
    if let Some(image) = image.filter(|p| p.is_file()) {
        let bytes = fs::read(image)?;
        let uploaded: serde_json::Value = client
            .post(format!("{BLUESKY_XRPC_BASE}/com.atproto.repo.uploadBlob"))
            .bearer_auth(jwt)
            .header(CONTENT_TYPE, "image/jpeg")
            .body(bytes)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        record["embed"] = json!({
            "$type": "app.bsky.embed.images",
            "images": [{"image": uploaded["blob"], "alt": "thumbnail"}],
        });
    }

    client
        .post(format!("{BLUESKY_XRPC_BASE}/com.atproto.repo.createRecord"))
        .bearer_auth(jwt)
        .json(&json!({
            "repo": did,
            "collection": "app.bsky.feed.post",
            "record": record,
        }))
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

/// Upload the finished video to YouTube as a public Short.
pub async fn upload_youtube(
    client: &Client,
    creds: Option<&YoutubeCredentials>,
    video: &Path,
    title: &str,
    description: &str,
    tags: &[String],
) -> PublishOutcome {
    let Some(creds) = creds else {
        return PublishOutcome::Skipped("youtube credentials missing");
    };
    match upload_youtube_inner(client, creds, video, title, description, tags).await {
        Ok(()) => PublishOutcome::Posted,
        Err(e) => PublishOutcome::Failed(format!("{e:#}")),
    }
}

async fn upload_youtube_inner(
    client: &Client,
    creds: &YoutubeCredentials,
    video: &Path,
    title: &str,
    description: &str,
    tags: &[String],
) -> anyhow::Result<()> {
    let token: serde_json::Value = client
        .post(YOUTUBE_TOKEN_URL)
        .form(&[
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("refresh_token", creds.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let access_token = token["access_token"]
        .as_str()
        .ok_or_else(|| anyhow!("token refresh carried no access_token"))?;

    let metadata = json!({
        "snippet": {
            "title": title,
            "description": description,
            "tags": tags,
            "categoryId": "22",
        },
        "status": {
            "privacyStatus": "public",
            "selfDeclaredMadeForKids": false,
        },
    });
    let session = client
        .post(YOUTUBE_UPLOAD_URL)
        .bearer_auth(access_token)
        .json(&metadata)
        .send()
        .await?
        .error_for_status()?;
    let upload_url = session
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| anyhow!("resumable session carried no upload location"))?
        .to_string();

    let bytes = tokio::fs::read(video).await?;
    client
        .put(upload_url)
        .bearer_auth(access_token)
        .header(CONTENT_TYPE, "video/mp4")
        .body(bytes)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bluesky_capability_check_requires_both_parts() {
        assert!(BlueskyCredentials::from_parts(None, None).is_none());
        assert!(BlueskyCredentials::from_parts(Some("h".into()), None).is_none());
        assert!(BlueskyCredentials::from_parts(Some("  ".into()), Some("p".into())).is_none());
        assert!(BlueskyCredentials::from_parts(Some("h".into()), Some("p".into())).is_some());
    }

    #[test]
    fn youtube_capability_check_requires_the_full_triple() {
        assert!(
            YoutubeCredentials::from_parts(Some("id".into()), Some("secret".into()), None)
                .is_none()
        );
        assert!(
            YoutubeCredentials::from_parts(
                Some("id".into()),
                Some("secret".into()),
                Some("refresh".into())
            )
            .is_some()
        );
    }

    #[test]
    fn outcomes_render_for_the_run_summary() {
        assert_eq!(PublishOutcome::Posted.to_string(), "posted");
        assert_eq!(
            PublishOutcome::Skipped("bluesky credentials missing").to_string(),
            "skipped (bluesky credentials missing)"
        );
        assert!(
            PublishOutcome::Failed("boom".into())
                .to_string()
                .contains("boom")
        );
    }

    #[tokio::test]
    async fn missing_credentials_short_circuit_to_skipped() {
        let client = Client::new();
        let outcome = post_bluesky(&client, None, "hello", None, None).await;
        assert!(matches!(outcome, PublishOutcome::Skipped(_)));
        let outcome =
            upload_youtube(&client, None, Path::new("v.mp4"), "t", "d", &[]).await;
        assert!(matches!(outcome, PublishOutcome::Skipped(_)));
    }
}
