//! Update check against the latest GitHub release.
//!
//! The check is advisory only: it runs on a background thread (see
//! [`UpdateNotifier`]), its failures are swallowed, and its only visible
//! effect is one extra message on stderr.

mod notifier;

use std::cmp::Ordering;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use colored::Colorize;

use crate::github::{DEFAULT_API_URL, GitHubClient, HostError};
use crate::repo_ref::RepoRef;

pub use notifier::UpdateNotifier;

pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Setting this variable (to anything) turns the update check off.
pub const DISABLE_ENV: &str = "RULEFORGE_NO_UPDATE_CHECK";

const RELEASE_OWNER: &str = "hiroyannnn";
const RELEASE_REPO: &str = "ruleforge";
const HTTP_TIMEOUT: StdDuration = StdDuration::from_secs(5);

pub fn check_interval() -> Duration {
    Duration::hours(24)
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestRelease {
    pub tag: String,
    pub url: String,
}

/// Where the latest release comes from.
pub trait ReleaseSource {
    fn latest(&self) -> Result<LatestRelease, HostError>;
}

impl<F> ReleaseSource for F
where
    F: Fn() -> Result<LatestRelease, HostError>,
{
    fn latest(&self) -> Result<LatestRelease, HostError> {
        self()
    }
}

/// Releases of this tool on GitHub.
pub struct GitHubReleases {
    client: GitHubClient,
    repo: RepoRef,
}

impl GitHubReleases {
    pub fn new() -> Result<Self, HostError> {
        Ok(Self {
            client: GitHubClient::with_timeout(DEFAULT_API_URL, None, HTTP_TIMEOUT)?,
            repo: RepoRef {
                owner: RELEASE_OWNER.to_string(),
                name: RELEASE_REPO.to_string(),
            },
        })
    }
}

impl ReleaseSource for GitHubReleases {
    fn latest(&self) -> Result<LatestRelease, HostError> {
        let rel = self.client.latest_release(&self.repo)?;
        Ok(LatestRelease {
            tag: rel.tag_name,
            url: rel.html_url,
        })
    }
}

/// Result of the last successful check, kept for the life of the process.
#[derive(Debug, Clone, Default)]
pub struct UpdateCheckState {
    pub last_checked_at: Option<DateTime<Utc>>,
    pub cached_outcome: Option<LatestRelease>,
}

/// `true` when no check has happened yet or the last one is at least
/// `interval` old.
pub fn should_recheck(
    now: DateTime<Utc>,
    last_checked_at: Option<DateTime<Utc>>,
    interval: Duration,
) -> bool {
    match last_checked_at {
        None => true,
        Some(last) => now.signed_duration_since(last) >= interval,
    }
}

pub struct UpdateChecker<C, S> {
    current: String,
    clock: C,
    source: S,
    interval: Duration,
    state: UpdateCheckState,
}

impl<C: Clock, S: ReleaseSource> UpdateChecker<C, S> {
    pub fn new(current: &str, clock: C, source: S) -> Self {
        Self {
            current: current.to_string(),
            clock,
            source,
            interval: check_interval(),
            state: UpdateCheckState::default(),
        }
    }

    pub fn state(&self) -> &UpdateCheckState {
        &self.state
    }

    /// The advisory message when a newer release exists.
    ///
    /// Development builds never report anything. Within the check interval
    /// the cached release is reused without a network call.
    pub fn check(&mut self) -> Result<Option<String>, HostError> {
        if self.current == "dev" {
            return Ok(None);
        }

        let now = self.clock.now();
        if should_recheck(now, self.state.last_checked_at, self.interval) {
            let release = self.source.latest()?;
            self.state.last_checked_at = Some(now);
            self.state.cached_outcome = Some(release);
        }

        Ok(self
            .state
            .cached_outcome
            .as_ref()
            .filter(|r| is_newer(&r.tag, &self.current))
            .map(|r| advisory(r, &self.current)))
    }
}

/// Compare dotted versions, ignoring a leading `v`.
///
/// Numeric components compare as numbers; anything else falls back to a
/// string comparison of that component. Missing components count as `0`.
pub fn is_newer(latest: &str, current: &str) -> bool {
    let latest = latest.trim_start_matches('v');
    let current = current.trim_start_matches('v');
    let mut l = latest.split('.');
    let mut c = current.split('.');
    loop {
        let ordering = match (l.next(), c.next()) {
            (None, None) => return false,
            (a, b) => compare_component(a.unwrap_or("0"), b.unwrap_or("0")),
        };
        match ordering {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }
    }
}

fn compare_component(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

fn advisory(release: &LatestRelease, current: &str) -> String {
    format!(
        "\n{} a new version {} is available (current: {})\n\
         release notes: {}\n\
         update with:\n\n    cargo install ruleforge\n",
        "⚠".yellow(),
        release.tag.bold(),
        current,
        release.url
    )
}

/// Start the background update check unless it is disabled.
///
/// Debug builds and `RULEFORGE_NO_UPDATE_CHECK` skip it.
pub fn spawn_update_check() -> Option<UpdateNotifier> {
    if cfg!(debug_assertions) || std::env::var_os(DISABLE_ENV).is_some() {
        return None;
    }
    Some(UpdateNotifier::spawn(|| {
        let source = GitHubReleases::new()?;
        UpdateChecker::new(CURRENT_VERSION, SystemClock, source).check()
    }))
}
