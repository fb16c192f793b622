//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::SimError;
use crate::sim::types::{MinuteOfDay, MonthSet, SimulationConfig};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Battery size and inverter limit.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Charging window and seasonal rules.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Flux rates, standing charge and local time zone.
    #[serde(default)]
    pub tariff: TariffConfig,
    /// Solar array output and the grid-charging cutoff.
    #[serde(default)]
    pub solar: SolarConfig,
    /// Local dates to replay.
    #[serde(default)]
    pub period: PeriodConfig,
    /// Input files; synthetic data is generated when none are given.
    #[serde(default)]
    pub inputs: InputsConfig,
    /// Synthetic input generator parameters.
    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

/// Battery size and inverter limit.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Usable capacity (kWh). Zero models a house without a battery.
    pub capacity_kwh: f64,
    /// Charge floor (kWh).
    pub min_kwh: f64,
    /// Inverter power limit (kW).
    pub inverter_limit_kw: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 9.5,
            min_kwh: 0.0,
            inverter_limit_kw: 6.6,
        }
    }
}

/// Charging window and seasonal battery rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Start of the grid charging window, `"HH:MM"` local time.
    pub charge_window_start: MinuteOfDay,
    /// End of the grid charging window (exclusive).
    pub charge_window_end: MinuteOfDay,
    /// Months with the winter discharge rule.
    pub winter_months: MonthSet,
    /// Months with the summer charging rules.
    pub summer_months: MonthSet,
    /// Time after which the battery may discharge in winter.
    pub winter_battery_start: MinuteOfDay,
    /// Grid-charge the battery in summer months.
    pub summer_charge_battery: bool,
    /// Grid-charge in summer whenever the agile rate is negative.
    pub summer_charge_when_negative: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        let defaults = SimulationConfig::default();
        Self {
            charge_window_start: defaults.charge_window_start,
            charge_window_end: defaults.charge_window_end,
            winter_months: defaults.winter_months,
            summer_months: defaults.summer_months,
            winter_battery_start: defaults.winter_battery_start,
            summer_charge_battery: defaults.summer_charge_battery,
            summer_charge_when_negative: defaults.summer_charge_when_negative,
        }
    }
}

/// Flux rates, standing charge and local time zone.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// IANA time zone for clock and calendar decisions.
    pub timezone: String,
    /// Flux low band rate (minor units per kWh).
    pub flux_rate_low: f64,
    /// Flux day band rate.
    pub flux_rate_day: f64,
    /// Flux peak band rate.
    pub flux_rate_peak: f64,
    /// Agile standing charge per day.
    pub standing_charge: f64,
    /// Instant from which `inputs.import_rates` replaces `inputs.previous_import_rates`.
    pub import_switchover: Option<DateTime<Utc>>,
}

impl Default for TariffConfig {
    fn default() -> Self {
        let defaults = SimulationConfig::default();
        Self {
            timezone: defaults.timezone.name().to_string(),
            flux_rate_low: defaults.flux_rate_low,
            flux_rate_day: defaults.flux_rate_day,
            flux_rate_peak: defaults.flux_rate_peak,
            standing_charge: defaults.standing_charge_per_day,
            import_switchover: None,
        }
    }
}

/// Solar array output and the grid-charging cutoff.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarConfig {
    /// Annual generation (kWh); zero disables solar.
    pub annual_output_kwh: f64,
    /// Instant after which scheduled grid charging adds no energy.
    pub model_cutoff: Option<DateTime<Utc>>,
}

/// Local dates to replay, `to` exclusive.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeriodConfig {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// JSON input files.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputsConfig {
    /// Half-hour meter readings.
    pub consumption: Option<PathBuf>,
    /// Agile import rates.
    pub import_rates: Option<PathBuf>,
    /// Import rates of the product in force before `tariff.import_switchover`.
    pub previous_import_rates: Option<PathBuf>,
    /// Agile export rates.
    pub export_rates: Option<PathBuf>,
}

impl InputsConfig {
    /// Whether no input file is configured.
    pub fn is_empty(&self) -> bool {
        self.consumption.is_none()
            && self.import_rates.is_none()
            && self.previous_import_rates.is_none()
            && self.export_rates.is_none()
    }
}

/// Synthetic input generator parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntheticConfig {
    /// Master random seed.
    pub seed: u64,
    /// Mean consumption per half hour (kWh).
    pub usage_base_kwh: f64,
    /// Daily swing of consumption (kWh).
    pub usage_amp_kwh: f64,
    /// Consumption noise standard deviation (kWh).
    pub usage_noise_std: f64,
    /// Mean agile import rate.
    pub rate_base: f64,
    /// Daily swing of the agile rate.
    pub rate_amp: f64,
    /// Extra agile rate during the flux peak band.
    pub rate_peak_uplift: f64,
    /// Agile rate noise standard deviation.
    pub rate_noise_std: f64,
    /// Export rate as a fraction of the import rate.
    pub export_ratio: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            usage_base_kwh: 0.35,
            usage_amp_kwh: 0.2,
            usage_noise_std: 0.05,
            rate_base: 22.0,
            rate_amp: 6.0,
            rate_peak_uplift: 10.0,
            rate_noise_std: 2.0,
            export_ratio: 0.45,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.min_kwh"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

impl ScenarioConfig {
    /// Returns the baseline scenario: default battery, modest solar, two winter weeks.
    pub fn baseline() -> Self {
        Self {
            solar: SolarConfig {
                annual_output_kwh: 3500.0,
                ..SolarConfig::default()
            },
            period: PeriodConfig {
                from: date(2024, 1, 1),
                to: date(2024, 1, 15),
            },
            ..Self::default()
        }
    }

    /// Returns the no-battery preset: the baseline period priced without storage.
    pub fn no_battery() -> Self {
        let baseline = Self::baseline();
        Self {
            battery: BatteryConfig {
                capacity_kwh: 0.0,
                ..BatteryConfig::default()
            },
            ..baseline
        }
    }

    /// Returns the summer-solar preset: large array, no scheduled summer charging,
    /// opportunistic charging on negative prices.
    pub fn summer_solar() -> Self {
        Self {
            schedule: ScheduleConfig {
                summer_charge_battery: false,
                summer_charge_when_negative: true,
                ..ScheduleConfig::default()
            },
            solar: SolarConfig {
                annual_output_kwh: 6000.0,
                ..SolarConfig::default()
            },
            period: PeriodConfig {
                from: date(2024, 6, 1),
                to: date(2024, 6, 15),
            },
            synthetic: SyntheticConfig {
                rate_base: 12.0,
                rate_amp: 9.0,
                ..SyntheticConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "no_battery", "summer_solar"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "no_battery" => Ok(Self::no_battery()),
            "summer_solar" => Ok(Self::summer_solar()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// Relative input paths are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if let Some(dir) = path.parent() {
            config.inputs.resolve_against(dir);
        }
        Ok(config)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Parsed local time zone, if the name is known.
    pub fn timezone(&self) -> Option<Tz> {
        self.tariff.timezone.parse().ok()
    }

    /// Whether inputs are generated rather than read from files.
    pub fn is_synthetic(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let bat = &self.battery;
        if bat.capacity_kwh < 0.0 {
            errors.push(ConfigError::new("battery.capacity_kwh", "must be >= 0"));
        }
        if bat.min_kwh < 0.0 {
            errors.push(ConfigError::new("battery.min_kwh", "must be >= 0"));
        }
        if bat.min_kwh > bat.capacity_kwh {
            errors.push(ConfigError::new(
                "battery.min_kwh",
                "must be <= battery.capacity_kwh",
            ));
        }
        if bat.inverter_limit_kw <= 0.0 {
            errors.push(ConfigError::new("battery.inverter_limit_kw", "must be > 0"));
        }

        let sch = &self.schedule;
        if sch.charge_window_start >= sch.charge_window_end {
            errors.push(ConfigError::new(
                "schedule.charge_window_start",
                "must be before schedule.charge_window_end",
            ));
        }
        if let Some(month) = sch
            .winter_months
            .months()
            .into_iter()
            .find(|&m| sch.summer_months.contains(m))
        {
            errors.push(ConfigError::new(
                "schedule.summer_months",
                format!("month {month} is also a winter month"),
            ));
        }

        let tar = &self.tariff;
        for (field, rate) in [
            ("tariff.flux_rate_low", tar.flux_rate_low),
            ("tariff.flux_rate_day", tar.flux_rate_day),
            ("tariff.flux_rate_peak", tar.flux_rate_peak),
            ("tariff.standing_charge", tar.standing_charge),
        ] {
            if !(rate >= 0.0) {
                errors.push(ConfigError::new(field, "must be >= 0"));
            }
        }
        if self.timezone().is_none() {
            errors.push(ConfigError::new(
                "tariff.timezone",
                format!("unknown time zone \"{}\"", tar.timezone),
            ));
        }

        if !(self.solar.annual_output_kwh >= 0.0) {
            errors.push(ConfigError::new("solar.annual_output_kwh", "must be >= 0"));
        }

        if let (Some(from), Some(to)) = (self.period.from, self.period.to) {
            if from >= to {
                errors.push(ConfigError::new("period.from", "must be before period.to"));
            }
        }

        let inp = &self.inputs;
        if self.is_synthetic() {
            if self.period.from.is_none() || self.period.to.is_none() {
                errors.push(ConfigError::new(
                    "period",
                    "from and to are required when no input files are given",
                ));
            }
        } else {
            for (field, path) in [
                ("inputs.consumption", &inp.consumption),
                ("inputs.import_rates", &inp.import_rates),
                ("inputs.export_rates", &inp.export_rates),
            ] {
                if path.is_none() {
                    errors.push(ConfigError::new(field, "is required with file inputs"));
                }
            }
        }
        if inp.previous_import_rates.is_some() != tar.import_switchover.is_some() {
            errors.push(ConfigError::new(
                "tariff.import_switchover",
                "must be set together with inputs.previous_import_rates",
            ));
        }

        let syn = &self.synthetic;
        if syn.usage_base_kwh < 0.0 {
            errors.push(ConfigError::new("synthetic.usage_base_kwh", "must be >= 0"));
        }
        if syn.export_ratio < 0.0 {
            errors.push(ConfigError::new("synthetic.export_ratio", "must be >= 0"));
        }

        errors
    }

    /// Validates the scenario and builds the engine's immutable configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] listing every invalid field.
    pub fn simulation_config(&self) -> Result<SimulationConfig, SimError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(SimError::Configuration(errors));
        }
        let timezone = self.timezone().ok_or_else(|| {
            SimError::Configuration(vec![ConfigError::new("tariff.timezone", "unknown")])
        })?;

        Ok(SimulationConfig {
            battery_capacity_kwh: self.battery.capacity_kwh,
            battery_min_kwh: self.battery.min_kwh,
            inverter_limit_kw: self.battery.inverter_limit_kw,
            charge_window_start: self.schedule.charge_window_start,
            charge_window_end: self.schedule.charge_window_end,
            winter_months: self.schedule.winter_months,
            summer_months: self.schedule.summer_months,
            winter_battery_start: self.schedule.winter_battery_start,
            summer_charge_battery: self.schedule.summer_charge_battery,
            summer_charge_when_negative: self.schedule.summer_charge_when_negative,
            flux_rate_low: self.tariff.flux_rate_low,
            flux_rate_day: self.tariff.flux_rate_day,
            flux_rate_peak: self.tariff.flux_rate_peak,
            model_cutoff: self.solar.model_cutoff.unwrap_or(DateTime::<Utc>::MAX_UTC),
            annual_solar_output_kwh: self.solar.annual_output_kwh,
            standing_charge_per_day: self.tariff.standing_charge,
            timezone,
        })
    }

    /// The replay period as UTC instants, open-ended sides unbounded.
    ///
    /// Returns `None` when neither date is set.
    pub fn period_range(&self, timezone: Tz) -> Option<Range<DateTime<Utc>>> {
        if self.period.from.is_none() && self.period.to.is_none() {
            return None;
        }
        let from = self
            .period
            .from
            .and_then(|d| local_midnight(timezone, d))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let to = self
            .period
            .to
            .and_then(|d| local_midnight(timezone, d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Some(from..to)
    }
}

/// The UTC instant of local midnight starting `date`.
pub fn local_midnight(timezone: Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    timezone
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

impl InputsConfig {
    fn resolve_against(&mut self, dir: &Path) {
        for path in [
            &mut self.consumption,
            &mut self.import_rates,
            &mut self.previous_import_rates,
            &mut self.export_rates,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        }
    }
}
