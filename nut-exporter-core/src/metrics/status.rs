//! UPS status codes
//!
//! `ups.status` carries space-separated flags such as `OL CHRG`. Only the
//! first flag is exported; `OL CHRG` reports Online and the charging flag is
//! not visible in the series.

/// Named UPS states and their exported codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpsStatus {
    /// `CAL`
    Calibration,
    /// `TRIM`
    SmartTrim,
    /// `BOOST`
    SmartBoost,
    /// `OL`
    Online,
    /// `OB`
    OnBattery,
    /// `OVER`
    Overloaded,
    /// `LB`
    LowBattery,
    /// `RB`
    ReplaceBattery,
    /// `BYPASS`
    OnBypass,
    /// `OFF`
    Off,
    /// `CHRG`
    Charging,
    /// `DISCHRG`
    Discharging,
}

impl UpsStatus {
    /// All states in code order
    pub const ALL: [Self; 12] = [
        Self::Calibration,
        Self::SmartTrim,
        Self::SmartBoost,
        Self::Online,
        Self::OnBattery,
        Self::Overloaded,
        Self::LowBattery,
        Self::ReplaceBattery,
        Self::OnBypass,
        Self::Off,
        Self::Charging,
        Self::Discharging,
    ];

    /// Maps a single protocol flag to a state
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "CAL" => Some(Self::Calibration),
            "TRIM" => Some(Self::SmartTrim),
            "BOOST" => Some(Self::SmartBoost),
            "OL" => Some(Self::Online),
            "OB" => Some(Self::OnBattery),
            "OVER" => Some(Self::Overloaded),
            "LB" => Some(Self::LowBattery),
            "RB" => Some(Self::ReplaceBattery),
            "BYPASS" => Some(Self::OnBypass),
            "OFF" => Some(Self::Off),
            "CHRG" => Some(Self::Charging),
            "DISCHRG" => Some(Self::Discharging),
            _ => None,
        }
    }

    /// Reads the first flag of an `ups.status` value
    #[must_use]
    pub fn from_status_value(value: &str) -> Option<Self> {
        value.split_whitespace().next().and_then(Self::from_token)
    }

    /// Protocol flag for this state
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Calibration => "CAL",
            Self::SmartTrim => "TRIM",
            Self::SmartBoost => "BOOST",
            Self::Online => "OL",
            Self::OnBattery => "OB",
            Self::Overloaded => "OVER",
            Self::LowBattery => "LB",
            Self::ReplaceBattery => "RB",
            Self::OnBypass => "BYPASS",
            Self::Off => "OFF",
            Self::Charging => "CHRG",
            Self::Discharging => "DISCHRG",
        }
    }

    /// Exported integer code (0..=11)
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`code`](Self::code)
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }
}

impl std::fmt::Display for UpsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}
