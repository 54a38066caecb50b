use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use regex::Regex;

use crate::error::AppError;
use crate::output::ReportOptions;

/// ecr-usage-report — inventory of ECR repositories: policies, images, size and tags
#[derive(Parser, Debug)]
#[command(name = "ecr-usage-report", version, about)]
pub struct Cli {
    /// AWS region (defaults to the ambient AWS configuration)
    #[arg(long)]
    pub region: Option<String>,

    /// AWS shared-config profile (defaults to the ambient AWS configuration)
    #[arg(long)]
    pub profile: Option<String>,

    /// Repositories collected in parallel (defaults to the number of CPUs)
    #[arg(long, env = "ECR_REPORT_CONCURRENCY")]
    pub concurrency: Option<NonZeroUsize>,

    /// Only report repositories whose name matches this regex
    #[arg(long)]
    pub filter: Option<String>,

    /// Size of the biggest-repositories leaderboard
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Directory receiving repo_info.csv and repo_info.json
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Stop collecting after N seconds and report what has completed
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Skip the ASCII banner
    #[arg(long, default_value_t = false)]
    pub no_banner: bool,

    /// Verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    pub fn concurrency(&self) -> usize {
        self.concurrency
            .map(NonZeroUsize::get)
            .unwrap_or_else(num_cpus::get)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    pub fn name_filter(&self) -> Result<Option<Regex>, AppError> {
        self.filter
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(AppError::InvalidFilter)
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            output_dir: self.output_dir.clone(),
            top: self.top,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["ecr-usage-report"]).unwrap();
        assert_eq!(cli.top, 10);
        assert_eq!(cli.output_dir, PathBuf::from("."));
        assert!(cli.timeout().is_none());
        assert!(cli.name_filter().unwrap().is_none());
        assert!(cli.concurrency() >= 1);
        assert!(!cli.no_banner);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "ecr-usage-report",
            "--concurrency",
            "4",
            "--timeout",
            "30",
            "--filter",
            "^team/",
            "--top",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.concurrency(), 4);
        assert_eq!(cli.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cli.report_options().top, 3);
        let filter = cli.name_filter().unwrap().unwrap();
        assert!(filter.is_match("team/api"));
        assert!(!filter.is_match("other/team/api"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(Cli::try_parse_from(["ecr-usage-report", "--concurrency", "0"]).is_err());
    }

    #[test]
    fn test_invalid_filter() {
        let cli = Cli::try_parse_from(["ecr-usage-report", "--filter", "("]).unwrap();
        assert!(matches!(cli.name_filter(), Err(AppError::InvalidFilter(_))));
    }
}
