use crate::sim::types::{MinuteOfDay, SimulationConfig};

/// Charge level of the modelled home battery.
///
/// The battery is an accounting abstraction: it has no efficiency losses and
/// every movement is bounded by the configured floor and capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryState {
    /// Stored energy in kilowatt-hours.
    pub charge_kwh: f64,
    min_kwh: f64,
    capacity_kwh: f64,
}

impl BatteryState {
    /// Creates a battery sitting at its charge floor.
    ///
    /// With the default floor of 0 kWh this is an empty battery; a raised
    /// floor is treated as already held so the charge never starts below it.
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            charge_kwh: config.battery_min_kwh,
            min_kwh: config.battery_min_kwh,
            capacity_kwh: config.battery_capacity_kwh,
        }
    }

    /// Energy still needed to reach capacity (kWh).
    pub fn headroom_kwh(&self) -> f64 {
        (self.capacity_kwh - self.charge_kwh).max(0.0)
    }

    /// Energy available above the floor (kWh).
    pub fn available_kwh(&self) -> f64 {
        (self.charge_kwh - self.min_kwh).max(0.0)
    }

    /// Whether the battery holds its full capacity.
    pub fn is_full(&self) -> bool {
        self.charge_kwh >= self.capacity_kwh
    }

    /// Stores up to `kwh`, returning the energy that did not fit.
    pub fn charge(&mut self, kwh: f64) -> f64 {
        let stored = kwh.max(0.0).min(self.headroom_kwh());
        self.charge_kwh += stored;
        kwh.max(0.0) - stored
    }

    /// Drains up to `kwh` (also bounded by `limit_kwh`), returning the energy delivered.
    pub fn discharge(&mut self, kwh: f64, limit_kwh: f64) -> f64 {
        let drained = kwh.min(self.available_kwh()).min(limit_kwh).max(0.0);
        self.charge_kwh -= drained;
        drained
    }
}

/// Seasonal charge and discharge rules of the battery.
#[derive(Debug, Clone, Copy)]
pub struct BatteryPolicy<'a> {
    config: &'a SimulationConfig,
}

impl<'a> BatteryPolicy<'a> {
    pub fn new(config: &'a SimulationConfig) -> Self {
        Self { config }
    }

    /// Whether `time` falls in the configured grid charging window (end exclusive).
    pub fn is_charge_window(&self, time: MinuteOfDay) -> bool {
        self.config.charge_window_start <= time && time < self.config.charge_window_end
    }

    /// Whether the battery should draw from the grid this interval.
    ///
    /// Scheduled charging happens inside the window while the battery has
    /// headroom, except in summer months when summer charging is off. In
    /// summer the battery may also charge whenever the agile rate is negative,
    /// even if it is already full.
    pub fn may_charge_from_grid(
        &self,
        month: u32,
        time: MinuteOfDay,
        charge_kwh: f64,
        agile_rate: f64,
    ) -> bool {
        let summer = self.config.summer_months.contains(month);
        let scheduled = self.is_charge_window(time)
            && charge_kwh < self.config.battery_capacity_kwh
            && (self.config.summer_charge_battery || !summer);
        let negative = self.config.summer_charge_when_negative && summer && agile_rate < 0.0;
        scheduled || negative
    }

    /// Whether the battery may discharge to meet load at this local time.
    ///
    /// Winter keeps the battery in reserve from the start of the charging
    /// window until `winter_battery_start`; other months reserve it for the
    /// whole charging window, unless summer charging is off.
    pub fn may_discharge(&self, month: u32, hour: u32, minute: u32) -> bool {
        if self.config.battery_capacity_kwh <= 0.0 {
            return false;
        }
        let Some(time) = MinuteOfDay::from_hm(hour, minute) else {
            return false;
        };
        let before_window = hour < self.config.charge_window_start.hour();

        if self.config.winter_months.contains(month) {
            before_window || time >= self.config.winter_battery_start
        } else if self.config.summer_months.contains(month) && !self.config.summer_charge_battery {
            true
        } else {
            before_window || time >= self.config.charge_window_end
        }
    }

    /// Largest energy moved in or out of the battery in one interval (kWh).
    pub fn max_drain_kwh(&self) -> f64 {
        self.config.max_interval_kwh()
    }
}
