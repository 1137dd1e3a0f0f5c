use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrendingCategory {
    #[default]
    Default,
    Music,
    Gaming,
    Movies,
}

impl TrendingCategory {
    pub const ALL: [TrendingCategory; 4] = [
        TrendingCategory::Default,
        TrendingCategory::Music,
        TrendingCategory::Gaming,
        TrendingCategory::Movies,
    ];

    pub fn raw_value(&self) -> &'static str {
        match self {
            TrendingCategory::Default => "default",
            TrendingCategory::Music => "music",
            TrendingCategory::Gaming => "gaming",
            TrendingCategory::Movies => "movies",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TrendingCategory::Default => "All",
            TrendingCategory::Music => "Music",
            TrendingCategory::Gaming => "Gaming",
            TrendingCategory::Movies => "Movies",
        }
    }

    pub fn control_label(&self) -> &'static str {
        match self {
            TrendingCategory::Default => "All Categories",
            other => other.name(),
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            TrendingCategory::Default => "▤",
            TrendingCategory::Music => "♪",
            TrendingCategory::Gaming => "◆",
            TrendingCategory::Movies => "▣",
        }
    }

    /// Value of the Invidious `type` query parameter. The default category
    /// is requested without one.
    pub fn invidious_type(&self) -> Option<&'static str> {
        match self {
            TrendingCategory::Default => None,
            other => Some(other.name()),
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn from_raw(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.raw_value().eq_ignore_ascii_case(raw) || c.name().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for TrendingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrendingCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_raw(s).ok_or_else(|| anyhow!("unknown trending category {s:?}"))
    }
}

macro_rules! countries {
    ($($code:ident => $name:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Country {
            $($code),+
        }

        impl Country {
            pub const ALL: &'static [Country] = &[$(Country::$code),+];

            pub fn code(&self) -> &'static str {
                match self {
                    $(Country::$code => stringify!($code)),+
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Country::$code => $name),+
                }
            }
        }
    };
}

countries! {
    AE => "United Arab Emirates",
    AR => "Argentina",
    AT => "Austria",
    AU => "Australia",
    BE => "Belgium",
    BR => "Brazil",
    CA => "Canada",
    CH => "Switzerland",
    CL => "Chile",
    CO => "Colombia",
    CZ => "Czechia",
    DE => "Germany",
    DK => "Denmark",
    EG => "Egypt",
    ES => "Spain",
    FI => "Finland",
    FR => "France",
    GB => "United Kingdom",
    GR => "Greece",
    HK => "Hong Kong",
    HU => "Hungary",
    ID => "Indonesia",
    IE => "Ireland",
    IL => "Israel",
    IN => "India",
    IT => "Italy",
    JP => "Japan",
    KE => "Kenya",
    KR => "South Korea",
    MX => "Mexico",
    MY => "Malaysia",
    NG => "Nigeria",
    NL => "Netherlands",
    NO => "Norway",
    NZ => "New Zealand",
    PE => "Peru",
    PH => "Philippines",
    PK => "Pakistan",
    PL => "Poland",
    PT => "Portugal",
    RO => "Romania",
    SA => "Saudi Arabia",
    SE => "Sweden",
    SG => "Singapore",
    TH => "Thailand",
    TR => "Turkey",
    TW => "Taiwan",
    UA => "Ukraine",
    US => "United States",
    VN => "Vietnam",
    ZA => "South Africa",
}

impl Default for Country {
    fn default() -> Self {
        Country::US
    }
}

impl Country {
    pub fn flag(&self) -> String {
        self.code()
            .chars()
            .filter_map(|ch| char::from_u32(0x1F1E6 + (ch as u32 - 'A' as u32)))
            .collect()
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.flag(), self.name())
    }
}

impl FromStr for Country {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| anyhow!("unknown country code {s:?}"))
    }
}
