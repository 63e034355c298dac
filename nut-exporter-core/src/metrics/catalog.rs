//! Static table of exported series
//!
//! Variable names and help texts follow the NUT variable reference:
//! <https://networkupstools.org/docs/user-manual.chunked/apcs01.html>

/// How a variable's value becomes a series value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Value parsed as `f64`
    Scalar,
    /// Value becomes the given label; the series is always 1
    Labeled(&'static str),
    /// First `ups.status` flag mapped to a [`UpsStatus`](super::UpsStatus) code
    Status,
}

/// One catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDefinition {
    /// NUT variable to look up
    pub variable: &'static str,
    /// Conversion applied to the value
    pub kind: MetricKind,
    /// Series id, exported as `nut_<series>`
    pub series: &'static str,
    /// Help text
    pub help: &'static str,
}

impl MetricDefinition {
    /// Numeric series read straight from the variable
    pub const fn scalar(variable: &'static str, series: &'static str, help: &'static str) -> Self {
        Self {
            variable,
            kind: MetricKind::Scalar,
            series,
            help,
        }
    }

    /// Presence series carrying the value as a label
    pub const fn labeled(
        variable: &'static str,
        series: &'static str,
        label: &'static str,
        help: &'static str,
    ) -> Self {
        Self {
            variable,
            kind: MetricKind::Labeled(label),
            series,
            help,
        }
    }
}

const STANDARD_DEFINITIONS: &[MetricDefinition] = &[
    MetricDefinition::scalar(
        "battery.charge",
        "battery_charge",
        "Current battery charge (percent)",
    ),
    MetricDefinition::scalar(
        "battery.charge.low",
        "battery_charge_low",
        "Remaining battery level when UPS switches to LB state (percent)",
    ),
    MetricDefinition::scalar(
        "battery.charge.warning",
        "battery_charge_warning",
        "Battery level when UPS switches to \"Warning\" state (percent)",
    ),
    MetricDefinition::scalar(
        "battery.packs",
        "battery_pack",
        "Number of battery packs on the UPS",
    ),
    MetricDefinition::scalar(
        "battery.voltage",
        "battery_voltage",
        "Current battery voltage",
    ),
    MetricDefinition::scalar(
        "battery.voltage.nominal",
        "battery_voltage_nominal",
        "Nominal battery voltage",
    ),
    MetricDefinition::scalar("input.voltage", "input_voltage", "Current input voltage"),
    MetricDefinition::scalar(
        "input.voltage.nominal",
        "input_voltage_nominal",
        "Nominal input voltage",
    ),
    MetricDefinition::scalar("output.voltage", "output_voltage", "Current output voltage"),
    MetricDefinition::scalar(
        "output.voltage.nominal",
        "output_voltage_nominal",
        "Nominal output voltage",
    ),
    MetricDefinition::scalar(
        "ups.delay.shutdown",
        "ups_delay_shutdown",
        "Interval to wait after shutdown with delay command (seconds)",
    ),
    MetricDefinition::scalar(
        "ups.delay.start",
        "ups_delay_start",
        "Interval to wait before restarting the load (seconds)",
    ),
    MetricDefinition::scalar("ups.load", "ups_load", "Current UPS load (percent)"),
    MetricDefinition::scalar(
        "ups.power.nominal",
        "ups_power_nominal",
        "Nominal value of apparent power (Volt-Amps)",
    ),
    MetricDefinition::scalar(
        "ups.realpower.nominal",
        "ups_real_power_nominal",
        "Nominal value of real power (Watts)",
    ),
    MetricDefinition::scalar(
        "ups.temperature",
        "ups_temp",
        "UPS Temperature (degrees C)",
    ),
    MetricDefinition::labeled("battery.type", "battery_type", "type", "Battery chemistry"),
    MetricDefinition::labeled(
        "device.mfr",
        "device_mfr",
        "manufacturer",
        "Device manufacturer",
    ),
    MetricDefinition::labeled("device.model", "device_model", "model", "Device model"),
    MetricDefinition::labeled(
        "device.type",
        "device_type",
        "type",
        "Device type (ups, pdu, scd, psu, ats)",
    ),
    MetricDefinition::labeled("driver.name", "driver_name", "name", "Driver name"),
    MetricDefinition::labeled(
        "driver.version",
        "driver_version",
        "version",
        "Driver version (NUT release)",
    ),
    MetricDefinition::labeled(
        "driver.version.data",
        "driver_version_data",
        "data",
        "Version of the internal data mapping, for generic drivers",
    ),
    MetricDefinition::labeled(
        "ups.beeper.status",
        "ups_beeper_status",
        "status",
        "UPS beeper status (enabled, disabled or muted)",
    ),
    MetricDefinition::labeled("ups.mfr", "ups_mfr", "manufacturer", "UPS manufacturer"),
    MetricDefinition::labeled("ups.model", "ups_model", "model", "UPS model"),
    MetricDefinition {
        variable: "ups.status",
        kind: MetricKind::Status,
        series: "ups_status",
        help: "Current UPS Status (0=Calibration, 1=SmartTrim, 2=SmartBoost, 3=Online, \
               4=OnBattery, 5=Overloaded, 6=LowBattery, 7=ReplaceBattery, 8=OnBypass, \
               9=Off, 10=Charging, 11=Discharging)",
    },
];

/// Ordered, immutable set of metric definitions
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    definitions: Vec<MetricDefinition>,
}

impl MetricCatalog {
    /// The built-in catalog of UPS variables
    #[must_use]
    pub fn standard() -> Self {
        Self {
            definitions: STANDARD_DEFINITIONS.to_vec(),
        }
    }

    /// Builds a catalog from custom definitions.
    ///
    /// Later definitions that reuse a series id are dropped so each series
    /// has exactly one writer.
    #[must_use]
    pub fn from_definitions(definitions: impl IntoIterator<Item = MetricDefinition>) -> Self {
        let mut unique: Vec<MetricDefinition> = Vec::new();
        for def in definitions {
            if unique.iter().any(|d| d.series == def.series) {
                tracing::warn!(series = def.series, "Duplicate series id in catalog, ignoring");
                continue;
            }
            unique.push(def);
        }
        Self {
            definitions: unique,
        }
    }

    /// Definitions in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = &MetricDefinition> {
        self.definitions.iter()
    }

    /// Finds the definition for a series id
    #[must_use]
    pub fn get(&self, series: &str) -> Option<&MetricDefinition> {
        self.definitions.iter().find(|d| d.series == series)
    }

    /// Number of definitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
