use std::path::PathBuf;

use clap::Parser;

use crate::topics::Mode;

/// Every recognized option is a flag with an environment fallback, resolved
/// here once and passed into the pipeline explicitly.
#[derive(Parser, Debug)]
#[command(name = "serialshorts", about = "Themed-series short-video pipeline")]
pub struct Args {
    /// Content category: governs tone, default seeds and hashtags.
    #[clap(long, env = "CONTENT_MODE", value_enum, default_value_t = Mode::Mixed)]
    pub mode: Mode,

    /// Comma-separated series seeds; empty falls back to the built-in
    /// catalog for the mode.
    #[clap(long, env = "SERIES_SEEDS", value_delimiter = ',')]
    pub seeds: Vec<String>,

    /// Number of parts each new series runs for. Existing series keep the
    /// ceiling they were created with.
    #[clap(long, env = "PARTS_PER_SERIES", default_value_t = 5)]
    pub parts_per_series: u32,

    #[clap(long, env = "OUT_DIR", default_value = "out")]
    pub out_dir: PathBuf,

    #[clap(long, env = "STATE_FILE", default_value = "state/series.json")]
    pub state_file: PathBuf,

    /// Narration language passed to the content generator.
    #[clap(long, env = "LANGUAGE", default_value = "en")]
    pub language: String,

    /// Optional call-to-action link appended to posts and descriptions.
    #[clap(long, env = "AFFILIATE_URL")]
    pub affiliate_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_without_flags() {
        let args = Args::parse_from(["serialshorts"]);
        assert_eq!(args.mode, Mode::Mixed);
        assert!(args.seeds.is_empty());
        assert_eq!(args.parts_per_series, 5);
        assert_eq!(args.out_dir, PathBuf::from("out"));
        assert_eq!(args.language, "en");
        assert!(args.affiliate_url.is_none());
    }

    #[test]
    fn seeds_split_on_commas_and_modes_parse_snake_case() {
        let args = Args::parse_from([
            "serialshorts",
            "--mode",
            "spooky_story",
            "--seeds",
            "one,two, three",
        ]);
        assert_eq!(args.mode, Mode::SpookyStory);
        assert_eq!(args.seeds, vec!["one", "two", " three"]);
    }
}
