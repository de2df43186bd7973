mod args;
mod audio;
mod captions;
mod content;
mod images;
mod publish;
mod series;
mod topics;
mod tts;
mod utils;
mod video;

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use args::Args;
use publish::{BlueskyCredentials, YoutubeCredentials};
use series::SeriesStore;
use topics::Topic;

#[derive(Debug)]
enum TopicOutcome {
    Produced,
    Skipped(&'static str),
    Failed,
}

struct ProducedMedia {
    title: String,
    description: String,
    tweet: String,
    hashtags: Vec<String>,
    video: PathBuf,
    thumbnail: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    info!(
        "Starting serialshorts pipeline (mode: {}, parts per series: {})",
        args.mode, args.parts_per_series
    );

    let api_key =
        std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
    let client = reqwest::Client::new();
    fs::create_dir_all(&args.out_dir)?;

    let mut store = SeriesStore::load(&args.state_file);
    let topics = topics::select_topics(&mut store, args.mode, args.parts_per_series, &args.seeds)?;
    if topics.is_empty() {
        info!("No series with remaining parts, nothing to do");
        return Ok(());
    }
    info!("Selected {} topic(s) for this run", topics.len());

    let bluesky = BlueskyCredentials::from_env();
    let youtube = YoutubeCredentials::from_env();

    let mut outcomes: Vec<(String, TopicOutcome)> = Vec::new();
    for topic in &topics {
        info!("Processing topic: {}", topic.title);
        match produce_topic(&client, &api_key, topic, &args).await {
            Ok(Some(media)) => {
                if !media.tweet.is_empty() {
                    let outcome = publish::post_bluesky(
                        &client,
                        bluesky.as_ref(),
                        &media.tweet,
                        Some(&media.thumbnail),
                        args.affiliate_url.as_deref(),
                    )
                    .await;
                    info!("Bluesky post: {}", outcome);
                }
                let outcome = publish::upload_youtube(
                    &client,
                    youtube.as_ref(),
                    &media.video,
                    &media.title,
                    &media.description,
                    &media.hashtags,
                )
                .await;
                info!("YouTube upload: {}", outcome);

                // Publish outcomes never gate this; a persistence failure
                // here is fatal for the whole run.
                store
                    .advance(&topic.meta.series_key)
                    .with_context(|| {
                        format!("failed to persist advance of '{}'", topic.meta.series_key)
                    })?;
                outcomes.push((topic.title.clone(), TopicOutcome::Produced));
            }
            Ok(None) => {
                warn!("Topic '{}' produced an empty script, skipping", topic.title);
                outcomes.push((topic.title.clone(), TopicOutcome::Skipped("empty script")));
            }
            Err(e) => {
                error!("Error processing topic '{}': {:#}", topic.title, e);
                outcomes.push((topic.title.clone(), TopicOutcome::Failed));
            }
        }
    }

    let produced = outcomes
        .iter()
        .filter(|(_, o)| matches!(o, TopicOutcome::Produced))
        .count();
    info!("Produced {} of {} attempted topic(s)", produced, outcomes.len());
    for (title, outcome) in &outcomes {
        match outcome {
            TopicOutcome::Produced => {}
            TopicOutcome::Skipped(reason) => warn!("  {title}: skipped ({reason})"),
            TopicOutcome::Failed => warn!("  {title}: failed"),
        }
    }
    Ok(())
}

/// Run one topic through generation, synthesis and composition. Returns
/// `None` when the generator came back with nothing worth narrating;
/// errors abort this topic only.
async fn produce_topic(
    client: &reqwest::Client,
    api_key: &str,
    topic: &Topic,
    args: &Args,
) -> anyhow::Result<Option<ProducedMedia>> {
    let bundle =
        content::generate_content(client, api_key, topic, &args.language, args.affiliate_url.as_deref())
            .await
            .context("content generation failed")?;
    let script = bundle.script.trim().to_string();
    if script.is_empty() {
        return Ok(None);
    }

    let slug = topic.meta.slug();
    let image = images::generate_image(client, api_key, topic, &args.out_dir)
        .await
        .context("image generation failed")?;
    let audio = tts::synthesize_speech(client, api_key, &script, &slug, &args.out_dir)
        .await
        .context("speech synthesis failed")?;
    let artifacts = video::compose_video(&image, &audio, &script, &slug, &args.out_dir)
        .context("video composition failed")?;

    let title = if bundle.title.trim().is_empty() {
        topic.title.clone()
    } else {
        bundle.title
    };
    let mut description = bundle.description;
    if let Some(url) = &args.affiliate_url {
        description.push_str("\n\n");
        description.push_str(url);
    }
    let hashtags = if bundle.hashtags.is_empty() {
        topic.meta.mode.default_hashtags()
    } else {
        bundle.hashtags
    };

    Ok(Some(ProducedMedia {
        title,
        description,
        tweet: bundle.tweet,
        hashtags,
        video: artifacts.video,
        thumbnail: artifacts.thumbnail,
    }))
}
