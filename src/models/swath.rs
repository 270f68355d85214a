use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Orbital direction of the satellite at acquisition time.
///
/// AMSR-E level-2A granules encode the direction in the file name
/// (`..._A.hdf` / `..._D.hdf`); readings differ systematically between the
/// two, so the pipeline never mixes them before the cross-channel merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum PassType {
    Ascending,
    Descending,
}

impl PassType {
    /// Classify a granule by its filename marker. Files matching neither
    /// marker are not instrument granules and are dropped silently.
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.contains("_A") {
            Some(PassType::Ascending)
        } else if name.contains("_D") {
            Some(PassType::Descending)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PassType::Ascending => "ascending",
            PassType::Descending => "descending",
        }
    }
}

impl std::fmt::Display for PassType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vertically polarised brightness-temperature channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Channel {
    /// 18.7 GHz V-pol ("19 GHz" in product nomenclature).
    #[value(name = "19ghz")]
    Ghz19,
    /// 36.5 GHz V-pol ("37 GHz").
    #[value(name = "37ghz")]
    Ghz37,
}

impl Channel {
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Ghz19 => "19GHz",
            Channel::Ghz37 => "37GHz",
        }
    }

    /// Column name this channel uses in every cache table.
    pub fn column(&self) -> &'static str {
        match self {
            Channel::Ghz19 => "brightness_temp_19v",
            Channel::Ghz37 => "brightness_temp_37v",
        }
    }

    /// Candidate variable names across AMSR-E processing versions, in
    /// priority order. Different reprocessings name the same physical
    /// channel differently; the first present name wins.
    pub fn variable_aliases(&self) -> &'static [&'static str] {
        match self {
            Channel::Ghz19 => &[
                "18.7V_Res.1_TB",
                "18.7V_Res.2_TB",
                "18.7V_Res.3_TB",
                "18.7V_Res.4_TB",
                "18.7V_Res.5A_TB",
                "18.7V_Res.5B_TB",
            ],
            Channel::Ghz37 => &[
                "36.5V_Res.1_TB",
                "36.5V_Res.2_TB",
                "36.5V_Res.3_TB",
                "36.5V_Res.4_TB",
                "36.5V_Res.5A_TB",
                "36.5V_Res.5B_TB",
            ],
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One geolocated, validity-filtered instrument reading.
///
/// Coordinates are already normalised and rounded by the swath reader;
/// `brightness_temp` is the scale/offset-corrected value in Kelvin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwathSample {
    pub latitude: f64,
    pub longitude: f64,
    pub brightness_temp: f64,
    pub pass_type: PassType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_classification() {
        assert_eq!(
            PassType::from_file_name("AMSR_E_L2A_BrightnessTemperatures_V13_200501010033_A.hdf"),
            Some(PassType::Ascending)
        );
        assert_eq!(
            PassType::from_file_name("AMSR_E_L2A_BrightnessTemperatures_V13_200412312344_D.hdf"),
            Some(PassType::Descending)
        );
        assert_eq!(PassType::from_file_name("README.txt"), None);
    }

    #[test]
    fn test_channel_aliases_priority() {
        // First alias is the preferred product variable
        assert_eq!(Channel::Ghz37.variable_aliases()[0], "36.5V_Res.1_TB");
        assert_eq!(Channel::Ghz19.variable_aliases()[0], "18.7V_Res.1_TB");
        assert_eq!(Channel::Ghz19.variable_aliases().len(), 6);
        assert_eq!(Channel::Ghz37.variable_aliases().len(), 6);
    }

    #[test]
    fn test_channel_columns() {
        assert_eq!(Channel::Ghz19.column(), "brightness_temp_19v");
        assert_eq!(Channel::Ghz37.column(), "brightness_temp_37v");
        assert_eq!(Channel::Ghz37.label(), "37GHz");
    }
}
