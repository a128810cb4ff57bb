use crate::delivery::ChannelId;
use crate::error::ConfigError;
use chrono_tz::Tz;
use env_logger::Env;
use std::time::Duration;

/// The outage feeds update slowly; 30 minutes keeps manual checks cheap
/// without serving anything stale enough to matter.
pub const DEFAULT_FEED_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// When and where the daily post fires. Exactly one fire instant per
/// calendar day in `timezone`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ScheduleConfig {
    pub timezone: Tz,
    pub fire_hour: u32,
    pub fire_minute: u32,
}

impl ScheduleConfig {
    pub fn new(timezone: &str, fire_hour: u32, fire_minute: u32) -> Result<Self, ConfigError> {
        let timezone = timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(timezone.to_string()))?;
        if fire_hour > 23 {
            return Err(ConfigError::FireHourOutOfRange(fire_hour));
        }
        if fire_minute > 59 {
            return Err(ConfigError::FireMinuteOutOfRange(fire_minute));
        }
        Ok(Self {
            timezone,
            fire_hour,
            fire_minute,
        })
    }
}

/// Everything the core consumes at startup. Loaded once; no hot-reload.
#[derive(Debug, Clone)]
pub struct HeraldConfig {
    pub schedule: ScheduleConfig,
    pub channel_id: ChannelId,
    pub feed_ttl: Duration,
    pub generation_timeout: Duration,
}

impl HeraldConfig {
    pub fn new(schedule: ScheduleConfig, channel_id: ChannelId) -> Self {
        Self {
            schedule,
            channel_id,
            feed_ttl: DEFAULT_FEED_TTL,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

/// Initialize logging the same way for every embedding binary.
pub fn init_logging(verbose: u8) {
    let debug_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(debug_level)).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_schedule() {
        let schedule = ScheduleConfig::new("Europe/Sofia", 12, 10).unwrap();
        assert_eq!(schedule.timezone, chrono_tz::Europe::Sofia);
        assert_eq!(schedule.fire_hour, 12);
        assert_eq!(schedule.fire_minute, 10);
    }

    #[test]
    fn rejects_unknown_timezone() {
        let err = ScheduleConfig::new("Europe/Atlantis", 12, 10).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTimezone(_)));
    }

    #[test]
    fn rejects_out_of_range_fire_time() {
        assert!(matches!(
            ScheduleConfig::new("UTC", 24, 0).unwrap_err(),
            ConfigError::FireHourOutOfRange(24)
        ));
        assert!(matches!(
            ScheduleConfig::new("UTC", 0, 60).unwrap_err(),
            ConfigError::FireMinuteOutOfRange(60)
        ));
    }
}
