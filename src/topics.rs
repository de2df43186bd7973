use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::series::{series_key, SeriesStore};
use crate::utils::safe_filename;

/// Hard per-run cap on emitted topics, bounding downstream generative-API
/// cost.
pub const MAX_TOPICS_PER_RUN: usize = 3;

/// Content category: governs tone, the default seed catalog and the
/// fallback hashtag set. Part of a series' identity key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Mode {
    FunnyTexts,
    SpookyStory,
    VoxelStory,
    Mixed,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::FunnyTexts => "funny_texts",
            Mode::SpookyStory => "spooky_story",
            Mode::VoxelStory => "voxel_story",
            Mode::Mixed => "mixed",
        }
    }

    /// Built-in seed catalog used when no seeds are supplied. The mixed
    /// mode draws one representative seed from each themed catalog.
    pub fn default_seeds(self) -> Vec<String> {
        let seeds: &[&str] = match self {
            Mode::FunnyTexts => &[
                "roommate group chat chaos",
                "wrong number texts",
                "family group chat",
            ],
            Mode::SpookyStory => &[
                "night shift at the old mill",
                "the house on Harlow Lane",
                "voicemails from nowhere",
            ],
            Mode::VoxelStory => &[
                "the last block fortress",
                "deep cave expedition",
                "sky island survival",
            ],
            Mode::Mixed => &[
                "roommate group chat chaos",
                "night shift at the old mill",
                "the last block fortress",
            ],
        };
        seeds.iter().map(|s| s.to_string()).collect()
    }

    /// Fallback hashtags for when the content generator returns none.
    pub fn default_hashtags(self) -> Vec<String> {
        let tags: &[&str] = match self {
            Mode::FunnyTexts => &["#funny", "#texts", "#comedy", "#shorts"],
            Mode::SpookyStory => &["#scary", "#horrorstory", "#creepy", "#shorts"],
            Mode::VoxelStory => &["#gaming", "#voxel", "#story", "#shorts"],
            Mode::Mixed => &["#story", "#viral", "#shorts"],
        };
        tags.iter().map(|s| s.to_string()).collect()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work for a single run. Produced fresh by the selector and
/// discarded after the run.
#[derive(Debug, Clone)]
pub struct Topic {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub meta: TopicMeta,
}

#[derive(Debug, Clone)]
pub struct TopicMeta {
    pub series_key: String,
    pub seed: String,
    pub part: u32,
    pub mode: Mode,
}

impl TopicMeta {
    /// Filesystem-safe base name shared by every artifact of this part.
    pub fn slug(&self) -> String {
        safe_filename(&format!("{}-part-{}", self.seed.to_lowercase(), self.part))
    }
}

/// Derive the topics for this run: establish a record for every resolved
/// seed, persist the store, then walk seeds in order emitting one topic per
/// non-exhausted series until the per-run cap is reached.
///
/// Returns an empty list (never an error) when every series is exhausted.
pub fn select_topics(
    store: &mut SeriesStore,
    mode: Mode,
    parts_per_series: u32,
    seeds: &[String],
) -> anyhow::Result<Vec<Topic>> {
    let resolved: Vec<String> = if seeds.iter().any(|s| !s.trim().is_empty()) {
        seeds
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        mode.default_seeds()
    };

    for seed in &resolved {
        store.ensure(seed, mode, parts_per_series);
    }
    store.save()?;

    let mut topics = Vec::new();
    for seed in &resolved {
        if topics.len() >= MAX_TOPICS_PER_RUN {
            break;
        }
        let key = series_key(mode, seed);
        let Some(record) = store.get(&key) else {
            continue;
        };
        if record.is_exhausted() {
            debug!("Series '{}' is exhausted, skipping", key);
            continue;
        }
        let part = record.next_part;
        topics.push(Topic {
            title: format!("{seed} — Part {part}"),
            url: String::new(),
            snippet: format!(
                "Part {part} of {} in an ongoing {mode} series about {seed}.",
                record.parts_per_series
            ),
            meta: TopicMeta {
                series_key: key,
                seed: seed.clone(),
                part,
                mode,
            },
        });
    }
    Ok(topics)
}
