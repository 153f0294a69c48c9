use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use rand::seq::SliceRandom;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str = "together-time.toml";
const TIMEZONE_ENV_VAR: &str = "TOGETHER_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str = "TOGETHER_TIME_CONFIG";
const DEFAULT_HOME_TIMEZONE: &str = "Europe/London";

const MS_PER_DAY: i64 = 86_400_000;
const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;

/// The daily connection prompts shown on the home screen.
pub const CONNECTION_PROMPTS: [&str; 8] = [
    "What made you smile today?",
    "Share a photo of your current view",
    "What's your favorite memory of us?",
    "If you could teleport here right now, what would we do?",
    "What's one thing you love about our relationship?",
    "Describe your perfect day together",
    "What's something new you'd like to try together?",
    "What makes you feel most loved by me?",
];

const WEATHER_MOODS: [&str; 6] = [
    "Sunny",
    "Partly cloudy",
    "Overcast",
    "Light rain",
    "Clear skies",
    "Breezy",
];

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
    timezone: Option<String>,
    time: Option<TimezoneSection>,
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
    timezone: Option<String>,
}

/// The zone used for "today" in countdown math when no partner zone
/// applies: env var, then `together-time.toml`, then the default.
pub fn home_timezone() -> &'static Tz {
    static HOME_TZ: OnceLock<Tz> = OnceLock::new();
    HOME_TZ.get_or_init(resolve_home_timezone)
}

fn resolve_home_timezone() -> Tz {
    if let Ok(raw) = std::env::var(TIMEZONE_ENV_VAR)
        && let Some(tz) = parse_timezone(&raw, TIMEZONE_ENV_VAR)
    {
        return tz;
    }

    if let Some(path) = timezone_config_path()
        && let Some(tz) = load_timezone_from_file(&path)
    {
        return tz;
    }

    parse_timezone(DEFAULT_HOME_TIMEZONE, "DEFAULT_HOME_TIMEZONE").unwrap_or_else(|| {
        tracing::error!("failed to parse fallback timezone; using UTC");
        chrono_tz::UTC
    })
}

fn timezone_config_path() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var(TIMEZONE_CONFIG_ENV_VAR) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    std::env::current_dir()
        .ok()
        .map(|dir| dir.join(TIMEZONE_CONFIG_FILE))
}

fn load_timezone_from_file(path: &PathBuf) -> Option<Tz> {
    if !path.exists() {
        tracing::debug!(file = %path.display(), "timezone config file not found");
        return None;
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(
                file = %path.display(),
                error = %err,
                "failed reading timezone config file"
            );
            return None;
        }
    };

    let parsed = match toml::from_str::<TimezoneConfig>(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::error!(
                file = %path.display(),
                error = %err,
                "failed parsing timezone config file"
            );
            return None;
        }
    };

    let timezone = parsed
        .timezone
        .or_else(|| parsed.time.and_then(|section| section.timezone));
    let Some(timezone) = timezone else {
        tracing::warn!(file = %path.display(), "timezone config had no timezone field");
        return None;
    };

    parse_timezone(timezone.as_str(), &format!("file:{}", path.display()))
}

pub fn parse_timezone(raw: &str, source: &str) -> Option<Tz> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        tracing::warn!(source, "timezone source was empty");
        return None;
    }

    match trimmed.parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(err) => {
            tracing::warn!(source, timezone = %trimmed, error = %err, "unparseable timezone");
            None
        }
    }
}

/// A partner's configured zone, falling back to the home zone when the
/// config value does not name a real IANA zone.
pub fn partner_timezone(raw: &str) -> Tz {
    parse_timezone(raw, "partner config").unwrap_or_else(|| *home_timezone())
}

/// Wall-clock time in a zone, in the original deployment's 12-hour format.
#[must_use]
pub fn format_clock_time(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%I:%M:%S %p").to_string()
}

/// Wall-clock date in a zone: "Tuesday, Feb 17".
#[must_use]
pub fn format_clock_date(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%A, %b %-d").to_string()
}

/// Whole hours separating two zones at the given instant.
#[must_use]
pub fn hour_gap(now: DateTime<Utc>, a: Tz, b: Tz) -> i64 {
    let offset_seconds = |tz: Tz| -> i64 {
        tz.offset_from_utc_datetime(&now.naive_utc())
            .fix()
            .local_minus_utc()
            .into()
    };
    (offset_seconds(a) - offset_seconds(b)).abs() / 3_600
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

/// Time until the next occurrence of a birth date's month/day (year
/// ignored), in the given zone's calendar. On the day itself this counts
/// down the remainder of the day; the roll to next year happens the day
/// after. Feb 29 observes Mar 1 in non-leap years.
#[must_use]
pub fn birthday_countdown(birth_date: NaiveDate, now: DateTime<Utc>, tz: Tz) -> Countdown {
    let today = now.with_timezone(&tz).date_naive();
    let occurrence = next_occurrence(birth_date.month(), birth_date.day(), today);

    let mut target = local_midnight(occurrence, tz);
    if target <= now {
        // the occurrence is today; count down to the end of the day
        target = local_midnight(today.succ_opt().unwrap_or(today), tz);
    }

    let diff_ms = (target - now).num_milliseconds().max(0);
    Countdown {
        days: diff_ms / MS_PER_DAY,
        hours: (diff_ms % MS_PER_DAY) / MS_PER_HOUR,
        minutes: (diff_ms % MS_PER_HOUR) / MS_PER_MINUTE,
    }
}

fn next_occurrence(month: u32, day: u32, today: NaiveDate) -> NaiveDate {
    let in_year = |year: i32| {
        NaiveDate::from_ymd_opt(year, month, day).or_else(|| {
            if month == 2 && day == 29 {
                NaiveDate::from_ymd_opt(year, 3, 1)
            } else {
                None
            }
        })
    };

    match in_year(today.year()) {
        Some(date) if date >= today => date,
        _ => in_year(today.year() + 1).unwrap_or(today),
    }
}

fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // midnight skipped by a DST jump: fall back to the UTC reading
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Stand-in weather line. Deterministic per (date, location) so the home
/// screen is stable within a day; no real forecast service is consulted.
#[must_use]
pub fn mock_weather(date: NaiveDate, location: &str) -> &'static str {
    let seed = date.num_days_from_ce().unsigned_abs() as usize
        + location.bytes().map(usize::from).sum::<usize>();
    WEATHER_MOODS[seed % WEATHER_MOODS.len()]
}

/// Uniform pick from the prompt list.
#[must_use]
pub fn random_prompt() -> &'static str {
    CONNECTION_PROMPTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(CONNECTION_PROMPTS[0])
}

/// Repeating timer driving clock redraws. The background thread stops when
/// `stop` is called or the ticker is dropped, so a torn-down view never
/// leaks it.
#[derive(Debug)]
pub struct Ticker {
    stop: Arc<AtomicBool>,
    ticks: mpsc::Receiver<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Ticker {
    pub fn start(period: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            loop {
                thread::sleep(period);
                if flag.load(Ordering::Relaxed) {
                    break;
                }
                if tx.send(()).is_err() {
                    break;
                }
            }
        });

        Self {
            stop,
            ticks: rx,
            handle: Some(handle),
        }
    }

    /// Blocks until the next tick. Returns false once the ticker has been
    /// stopped and its buffered ticks are drained.
    pub fn wait(&self) -> bool {
        self.ticks.recv().is_ok()
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{NaiveDate, TimeZone, Utc};
    use chrono_tz::Tz;

    use super::{
        CONNECTION_PROMPTS, Ticker, birthday_countdown, format_clock_date, format_clock_time,
        hour_gap, mock_weather, next_occurrence, random_prompt,
    };

    fn zone(name: &str) -> Tz {
        name.parse().expect("valid zone")
    }

    #[test]
    fn clock_strings_follow_the_zone() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 17, 18, 5, 9)
            .single()
            .expect("valid now");

        assert_eq!(
            format_clock_time(now, zone("Europe/London")),
            "06:05:09 PM"
        );
        assert_eq!(
            format_clock_time(now, zone("America/Chicago")),
            "12:05:09 PM"
        );
        assert_eq!(
            format_clock_date(now, zone("Europe/London")),
            "Tuesday, Feb 17"
        );
    }

    #[test]
    fn manchester_and_texas_are_six_hours_apart() {
        let winter = Utc
            .with_ymd_and_hms(2026, 2, 17, 12, 0, 0)
            .single()
            .expect("valid now");
        let summer = Utc
            .with_ymd_and_hms(2026, 8, 7, 12, 0, 0)
            .single()
            .expect("valid now");

        let london = zone("Europe/London");
        let chicago = zone("America/Chicago");
        assert_eq!(hour_gap(winter, london, chicago), 6);
        assert_eq!(hour_gap(summer, london, chicago), 6);
        assert_eq!(hour_gap(summer, chicago, london), 6);
    }

    #[test]
    fn countdown_on_the_day_counts_out_the_day() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 17, 12, 0, 0)
            .single()
            .expect("valid now");
        let birth = NaiveDate::from_ymd_opt(1999, 2, 17).expect("valid date");

        let countdown = birthday_countdown(birth, now, chrono_tz::UTC);
        assert_eq!(countdown.days, 0);
        assert!((0..24).contains(&countdown.hours));
        assert!((0..60).contains(&countdown.minutes));
        assert_eq!(countdown.hours, 12);
    }

    #[test]
    fn countdown_for_yesterday_rolls_a_year_out() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 17, 0, 0, 0)
            .single()
            .expect("valid now");
        let birth = NaiveDate::from_ymd_opt(1995, 2, 16).expect("valid date");

        let countdown = birthday_countdown(birth, now, chrono_tz::UTC);
        assert_eq!(countdown.days, 364);
        assert_eq!(countdown.hours, 0);
        assert_eq!(countdown.minutes, 0);
    }

    #[test]
    fn countdown_for_tomorrow_is_one_day() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 17, 0, 0, 0)
            .single()
            .expect("valid now");
        let birth = NaiveDate::from_ymd_opt(2001, 2, 18).expect("valid date");

        let countdown = birthday_countdown(birth, now, chrono_tz::UTC);
        assert_eq!(countdown.days, 1);
        assert_eq!(countdown.hours, 0);
    }

    #[test]
    fn leap_day_observes_march_first_off_leap() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 15).expect("valid date");
        assert_eq!(
            next_occurrence(2, 29, today),
            NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date")
        );

        let leap_today = NaiveDate::from_ymd_opt(2028, 1, 15).expect("valid date");
        assert_eq!(
            next_occurrence(2, 29, leap_today),
            NaiveDate::from_ymd_opt(2028, 2, 29).expect("valid date")
        );
    }

    #[test]
    fn weather_mock_is_stable_per_day_and_place() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid date");
        assert_eq!(
            mock_weather(date, "Manchester"),
            mock_weather(date, "Manchester")
        );
    }

    #[test]
    fn random_prompt_comes_from_the_fixed_list() {
        for _ in 0..32 {
            assert!(CONNECTION_PROMPTS.contains(&random_prompt()));
        }
    }

    #[test]
    fn ticker_stops_cleanly() {
        let mut ticker = Ticker::start(Duration::from_millis(2));
        assert!(ticker.wait());
        ticker.stop();

        // buffered ticks drain, then the channel reports closed
        let mut remaining = 0;
        while ticker.wait() {
            remaining += 1;
            assert!(remaining < 1_000, "ticker kept ticking after stop");
        }
    }
}
