use clap::Parser;
use std::path::PathBuf;

use crate::core::playhead::EndPolicy;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Hash:   sha256 asset keys\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Tick-driven cue playback engine
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Asset JSON files to load (one asset object or an array of them per file)
    #[arg(value_name = "FILE")]
    pub assets: Vec<PathBuf>,

    /// Engine config file (JSON). Defaults to cuecast.json in the config directory
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Clock interval in milliseconds (overrides config)
    #[arg(short = 'i', long = "interval-ms", value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Number of ticks to run before printing the render cache
    #[arg(short = 'n', long = "ticks", value_name = "N", default_value_t = 100)]
    pub ticks: u64,

    /// What a playhead does after its last cue: loop or stop (overrides config)
    #[arg(short = 'e', long = "end-policy", value_name = "POLICY")]
    pub end_policy: Option<EndPolicy>,

    /// Play every loaded asset on startup
    #[arg(short = 'a', long = "autoplay")]
    pub autoplay: bool,

    /// Enable debug logging to file (default: cuecast.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let args = Args::try_parse_from([
            "cuecast", "a.json", "b.json", "--ticks", "5", "--end-policy", "stop", "-a", "-vv",
        ])
        .unwrap();
        assert_eq!(args.assets.len(), 2);
        assert_eq!(args.ticks, 5);
        assert_eq!(args.end_policy, Some(EndPolicy::Stop));
        assert!(args.autoplay);
        assert_eq!(args.verbosity, 2);
        assert!(args.log_file.is_none());
    }

    #[test]
    fn test_log_flag_without_path() {
        let args = Args::try_parse_from(["cuecast", "--log"]).unwrap();
        assert_eq!(args.log_file, Some(None));
        assert_eq!(args.ticks, 100);
    }

    #[test]
    fn test_bad_end_policy() {
        assert!(Args::try_parse_from(["cuecast", "--end-policy", "bounce"]).is_err());
    }
}
