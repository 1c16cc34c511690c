//! Validation helpers for configuration snapshots and trigger schedules.

use std::collections::HashSet;

use url::Url;

use crate::defaults::{MAX_STRIKES_LIMIT, TRIGGER_MAX_LIMIT, TRIGGER_MIN_LIMIT};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    ArrConfig, ConfigSnapshot, ContentBlockerConfig, DownloadCleanerConfig, GeneralConfig,
    InstanceType, QueueCleanerConfig, Schedule,
};

/// Validate every section of a snapshot, returning the first violation found.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] describing the first invalid field.
pub fn validate_snapshot(snapshot: &ConfigSnapshot) -> ConfigResult<()> {
    validate_general(&snapshot.general)?;
    for instance_type in InstanceType::ALL {
        validate_arr(instance_type, snapshot.arr(instance_type))?;
    }
    validate_download_clients(snapshot)?;
    validate_queue_cleaner(&snapshot.queue_cleaner)?;
    validate_content_blocker(&snapshot.content_blocker)?;
    validate_download_cleaner(&snapshot.download_cleaner)?;
    Ok(())
}

/// Validate a trigger schedule for the named section.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the interval falls outside the
/// accepted bounds or the cron expression is malformed.
pub fn validate_schedule(section: &str, schedule: &Schedule) -> ConfigResult<()> {
    match schedule {
        Schedule::Interval { every, .. } => {
            let interval = schedule.max_interval();
            if *every == 0 || interval < TRIGGER_MIN_LIMIT {
                return Err(ConfigError::invalid(
                    section,
                    "schedule",
                    Some(format!("{}s", interval.as_secs())),
                    "interval_below_minimum",
                ));
            }
            if interval > TRIGGER_MAX_LIMIT {
                return Err(ConfigError::invalid(
                    section,
                    "schedule",
                    Some(format!("{}s", interval.as_secs())),
                    "interval_above_maximum",
                ));
            }
            Ok(())
        }
        Schedule::Cron { expression } => validate_cron(expression)
            .map_err(|reason| ConfigError::invalid(section, "schedule", Some(expression.clone()), reason)),
    }
}

fn validate_general(general: &GeneralConfig) -> ConfigResult<()> {
    if general.http_timeout_secs == 0 {
        return Err(ConfigError::invalid(
            "general",
            "http_timeout_secs",
            Some("0".into()),
            "must_be_positive",
        ));
    }
    if general.log_level.trim().is_empty() {
        return Err(ConfigError::invalid(
            "general",
            "log_level",
            None,
            "must_not_be_empty",
        ));
    }
    if let Some(format) = general.log_format.as_deref()
        && !matches!(format, "json" | "pretty")
    {
        return Err(ConfigError::invalid(
            "general",
            "log_format",
            Some(format.to_string()),
            "unknown_log_format",
        ));
    }
    if general
        .ignored_downloads
        .iter()
        .any(|entry| entry.trim().is_empty())
    {
        return Err(ConfigError::invalid(
            "general",
            "ignored_downloads",
            None,
            "entry_must_not_be_empty",
        ));
    }
    Ok(())
}

fn validate_arr(instance_type: InstanceType, arr: &ArrConfig) -> ConfigResult<()> {
    let section = instance_type.as_str();
    let mut names = HashSet::new();
    for instance in &arr.instances {
        let name = instance.name.trim();
        if name.is_empty() {
            return Err(ConfigError::invalid(section, "name", None, "must_not_be_empty"));
        }
        if !names.insert(name.to_ascii_lowercase()) {
            return Err(ConfigError::invalid(
                section,
                "name",
                Some(name.to_string()),
                "duplicate_name",
            ));
        }
        validate_http_url(section, "url", &instance.url)?;
        if instance.enabled && instance.api_key.trim().is_empty() {
            return Err(ConfigError::invalid(
                section,
                "api_key",
                Some(name.to_string()),
                "must_not_be_empty",
            ));
        }
    }
    Ok(())
}

fn validate_download_clients(snapshot: &ConfigSnapshot) -> ConfigResult<()> {
    let mut names = HashSet::new();
    for client in &snapshot.download_clients {
        let name = client.name.trim();
        if name.is_empty() {
            return Err(ConfigError::invalid(
                "download_clients",
                "name",
                None,
                "must_not_be_empty",
            ));
        }
        if !names.insert(name.to_ascii_lowercase()) {
            return Err(ConfigError::invalid(
                "download_clients",
                "name",
                Some(name.to_string()),
                "duplicate_name",
            ));
        }
        validate_http_url("download_clients", "host", &client.host)?;
    }
    Ok(())
}

fn validate_queue_cleaner(config: &QueueCleanerConfig) -> ConfigResult<()> {
    const SECTION: &str = "queue_cleaner";
    if config.enabled {
        validate_schedule(SECTION, &config.schedule)?;
    }
    validate_strikes(SECTION, "failed_import.max_strikes", config.failed_import.max_strikes)?;
    validate_strikes(SECTION, "stalled.max_strikes", config.stalled.max_strikes)?;
    validate_strikes(
        SECTION,
        "stalled.downloading_metadata_max_strikes",
        config.stalled.downloading_metadata_max_strikes,
    )?;
    validate_strikes(SECTION, "slow.max_strikes", config.slow.max_strikes)?;

    if config
        .failed_import
        .ignored_patterns
        .iter()
        .any(|pattern| pattern.trim().is_empty())
    {
        return Err(ConfigError::invalid(
            SECTION,
            "failed_import.ignored_patterns",
            None,
            "entry_must_not_be_empty",
        ));
    }
    let slow = &config.slow;
    if !slow.max_time_hours.is_finite() || slow.max_time_hours < 0.0 {
        return Err(ConfigError::invalid(
            SECTION,
            "slow.max_time_hours",
            Some(slow.max_time_hours.to_string()),
            "must_not_be_negative",
        ));
    }
    if slow.max_strikes > 0 && slow.min_speed_bps == 0 && slow.max_time_hours == 0.0 {
        return Err(ConfigError::invalid(
            SECTION,
            "slow",
            None,
            "speed_or_time_limit_required",
        ));
    }
    Ok(())
}

fn validate_content_blocker(config: &ContentBlockerConfig) -> ConfigResult<()> {
    const SECTION: &str = "content_blocker";
    if config.enabled {
        validate_schedule(SECTION, &config.schedule)?;
    }
    for instance_type in InstanceType::ALL {
        let settings = config.blocklist(instance_type);
        if !settings.enabled {
            continue;
        }
        let field = format!("{}.path", instance_type.as_str());
        match settings.path.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(ConfigError::invalid(SECTION, field, None, "path_required"));
            }
            Some(path) if path.starts_with("http://") || path.starts_with("https://") => {
                validate_http_url(SECTION, &field, path)?;
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn validate_download_cleaner(config: &DownloadCleanerConfig) -> ConfigResult<()> {
    const SECTION: &str = "download_cleaner";
    if config.enabled {
        validate_schedule(SECTION, &config.schedule)?;
    }

    let mut names = HashSet::new();
    for category in &config.categories {
        let name = category.name.trim();
        if name.is_empty() {
            return Err(ConfigError::invalid(
                SECTION,
                "categories.name",
                None,
                "must_not_be_empty",
            ));
        }
        if !names.insert(name.to_string()) {
            return Err(ConfigError::invalid(
                SECTION,
                "categories.name",
                Some(name.to_string()),
                "duplicate_name",
            ));
        }
        if category.max_ratio < 0.0 && category.max_seed_time_hours < 0.0 {
            return Err(ConfigError::invalid(
                SECTION,
                "categories",
                Some(name.to_string()),
                "limit_required",
            ));
        }
        if category.min_seed_time_hours < 0.0 {
            return Err(ConfigError::invalid(
                SECTION,
                "categories.min_seed_time_hours",
                Some(name.to_string()),
                "must_not_be_negative",
            ));
        }
    }

    if let Some(target) = config.unlinked_target_category.as_deref() {
        let target = target.trim();
        if !target.is_empty() {
            if config.unlinked_categories.is_empty() {
                return Err(ConfigError::invalid(
                    SECTION,
                    "unlinked_categories",
                    None,
                    "must_not_be_empty",
                ));
            }
            if config
                .unlinked_categories
                .iter()
                .any(|category| category.trim() == target)
            {
                return Err(ConfigError::invalid(
                    SECTION,
                    "unlinked_categories",
                    Some(target.to_string()),
                    "contains_target_category",
                ));
            }
        }
    }
    if config
        .unlinked_ignored_root_dir
        .as_deref()
        .is_some_and(|dir| dir.trim().is_empty())
    {
        return Err(ConfigError::invalid(
            SECTION,
            "unlinked_ignored_root_dir",
            None,
            "must_not_be_empty",
        ));
    }
    Ok(())
}

fn validate_strikes(section: &str, field: &str, value: u32) -> ConfigResult<()> {
    if value > MAX_STRIKES_LIMIT {
        return Err(ConfigError::invalid(
            section,
            field,
            Some(value.to_string()),
            "max_strikes_above_limit",
        ));
    }
    Ok(())
}

fn validate_http_url(section: &str, field: &str, value: &str) -> ConfigResult<()> {
    let parsed = Url::parse(value.trim()).map_err(|_| {
        ConfigError::invalid(section, field, Some(value.to_string()), "invalid_url")
    })?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ConfigError::invalid(
            section,
            field,
            Some(value.to_string()),
            "url_must_be_http",
        ));
    }
    Ok(())
}

struct CronField {
    min: u32,
    max: u32,
    names: &'static [&'static str],
    name_offset: u32,
}

const SECONDS: CronField = CronField {
    min: 0,
    max: 59,
    names: &[],
    name_offset: 0,
};
const MINUTES: CronField = SECONDS;
const HOURS: CronField = CronField {
    min: 0,
    max: 23,
    names: &[],
    name_offset: 0,
};
const DAY_OF_MONTH: CronField = CronField {
    min: 1,
    max: 31,
    names: &[],
    name_offset: 0,
};
const MONTH: CronField = CronField {
    min: 1,
    max: 12,
    names: &[
        "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
    ],
    name_offset: 1,
};
const DAY_OF_WEEK: CronField = CronField {
    min: 1,
    max: 7,
    names: &["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"],
    name_offset: 1,
};
const YEAR: CronField = CronField {
    min: 1970,
    max: 2099,
    names: &[],
    name_offset: 0,
};

/// Check a Quartz-style cron expression (`sec min hour dom month dow [year]`).
fn validate_cron(expression: &str) -> Result<(), &'static str> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if !(6..=7).contains(&fields.len()) {
        return Err("cron_field_count");
    }

    check_cron_field(fields[0], &SECONDS)?;
    check_cron_field(fields[1], &MINUTES)?;
    check_cron_field(fields[2], &HOURS)?;
    check_day_of_month(fields[3])?;
    check_cron_field(fields[4], &MONTH)?;
    check_day_of_week(fields[5])?;
    if let Some(year) = fields.get(6) {
        check_cron_field(year, &YEAR)?;
    }

    match (fields[3] == "?", fields[5] == "?") {
        (true, false) | (false, true) => Ok(()),
        _ => Err("cron_day_fields_ambiguous"),
    }
}

fn check_day_of_month(field: &str) -> Result<(), &'static str> {
    if field == "?" || field == "L" || field == "LW" {
        return Ok(());
    }
    if let Some(offset) = field.strip_prefix("L-") {
        return parse_in_range(offset, 0, 30).map(|_| ());
    }
    if let Some(day) = field.strip_suffix('W') {
        return parse_in_range(day, DAY_OF_MONTH.min, DAY_OF_MONTH.max).map(|_| ());
    }
    check_cron_field(field, &DAY_OF_MONTH)
}

fn check_day_of_week(field: &str) -> Result<(), &'static str> {
    if field == "?" || field == "L" {
        return Ok(());
    }
    if let Some((day, nth)) = field.split_once('#') {
        parse_cron_value(day, &DAY_OF_WEEK)?;
        return parse_in_range(nth, 1, 5).map(|_| ());
    }
    if let Some(day) = field.strip_suffix('L') {
        return parse_cron_value(day, &DAY_OF_WEEK).map(|_| ());
    }
    check_cron_field(field, &DAY_OF_WEEK)
}

fn check_cron_field(field: &str, bounds: &CronField) -> Result<(), &'static str> {
    if field.is_empty() {
        return Err("cron_field_empty");
    }
    for item in field.split(',') {
        let (base, step) = match item.split_once('/') {
            Some((base, step)) => (base, Some(step)),
            None => (item, None),
        };
        if let Some(step) = step {
            parse_in_range(step, 1, bounds.max.max(1))?;
        }
        match base {
            "*" => {}
            "" => return Err("cron_field_empty"),
            _ => {
                if let Some((start, end)) = base.split_once('-') {
                    parse_cron_value(start, bounds)?;
                    parse_cron_value(end, bounds)?;
                } else {
                    parse_cron_value(base, bounds)?;
                }
            }
        }
    }
    Ok(())
}

fn parse_cron_value(value: &str, bounds: &CronField) -> Result<u32, &'static str> {
    let upper = value.to_ascii_uppercase();
    if let Some(position) = bounds.names.iter().position(|name| *name == upper) {
        let index = u32::try_from(position).map_err(|_| "cron_value_out_of_range")?;
        return Ok(index + bounds.name_offset);
    }
    parse_in_range(value, bounds.min, bounds.max)
}

fn parse_in_range(value: &str, min: u32, max: u32) -> Result<u32, &'static str> {
    let parsed: u32 = value.parse().map_err(|_| "cron_value_invalid")?;
    if (min..=max).contains(&parsed) {
        Ok(parsed)
    } else {
        Err("cron_value_out_of_range")
    }
}
