// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{RawConfigFile, SchedulerConfig, SchedulerSection};
use crate::errors::{Result, TaskdagError};

impl TryFrom<RawConfigFile> for SchedulerConfig {
    type Error = TaskdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_scheduler_section(&raw.scheduler)?;

        let subtask_timeout = raw
            .scheduler
            .subtask_timeout
            .as_deref()
            .map(parse_duration)
            .transpose()
            .map_err(|e| TaskdagError::ConfigError(format!("[scheduler].subtask_timeout: {e}")))?;

        Ok(SchedulerConfig {
            max_parallel_tasks: raw.scheduler.max_parallel_tasks,
            subtask_timeout,
        })
    }
}

fn validate_scheduler_section(section: &SchedulerSection) -> Result<()> {
    if section.max_parallel_tasks == 0 {
        return Err(TaskdagError::ConfigError(
            "[scheduler].max_parallel_tasks must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

/// Parse a duration like `"250ms"`, `"30s"`, `"5m"` or `"1h"`.
///
/// Values whose minute or hour count overflows `u64` seconds are rejected.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let text = s.trim();
    let Some(split) = text.find(|c: char| !c.is_ascii_digit()) else {
        return Err(if text.is_empty() {
            "empty duration string".to_string()
        } else {
            format!("duration '{text}' has no unit (ms, s, m or h)")
        });
    };

    let (digits, unit) = text.split_at(split);
    if digits.is_empty() {
        return Err(format!("duration '{text}' does not start with a number"));
    }
    let amount: u64 = digits
        .parse()
        .map_err(|e| format!("invalid number in duration '{text}': {e}"))?;

    let secs_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(amount)),
        "s" => 1,
        "m" => 60,
        "h" => 3_600,
        other => {
            return Err(format!(
                "unknown duration unit '{other}' in '{text}' (use ms, s, m or h)"
            ));
        }
    };

    amount
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{text}' is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(toml_src: &str) -> RawConfigFile {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn defaults_apply_to_empty_file() {
        let cfg = SchedulerConfig::try_from(raw("")).unwrap();
        assert_eq!(cfg, SchedulerConfig::default());
        assert_eq!(cfg.max_parallel_tasks, 4);
        assert!(cfg.subtask_timeout.is_none());
    }

    #[test]
    fn timeout_is_parsed() {
        let cfg = SchedulerConfig::try_from(raw(
            r#"
            [scheduler]
            max_parallel_tasks = 2
            subtask_timeout = "1500ms"
            "#,
        ))
        .unwrap();
        assert_eq!(cfg.max_parallel_tasks, 2);
        assert_eq!(cfg.subtask_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = SchedulerConfig::try_from(raw("[scheduler]\nmax_parallel_tasks = 0\n")).unwrap_err();
        assert!(matches!(err, TaskdagError::ConfigError(_)));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = SchedulerConfig::try_from(raw("[scheduler]\nsubtask_timeout = \"10 parsecs\"\n"))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("subtask_timeout"), "unexpected message: {msg}");
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("3s"), Ok(Duration::from_secs(3)));
        assert_eq!(parse_duration(" 2m "), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("ms").is_err());
    }

    #[test]
    fn oversized_durations_are_errors_not_panics() {
        assert_eq!(
            parse_duration("18446744073709551615s"),
            Ok(Duration::from_secs(u64::MAX))
        );
        for text in ["18446744073709551615m", "18446744073709551615h", "5124095576030432h"] {
            let err = parse_duration(text).unwrap_err();
            assert!(err.contains("out of range"), "{text}: {err}");
        }
        assert!(parse_duration("99999999999999999999s").is_err());
    }

    #[test]
    fn overflowing_timeout_is_a_config_error() {
        let err = SchedulerConfig::try_from(raw(
            "[scheduler]\nsubtask_timeout = \"18446744073709551615h\"\n",
        ))
        .unwrap_err();
        assert!(matches!(err, TaskdagError::ConfigError(_)));
        assert!(err.to_string().contains("out of range"));
    }
}
