use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;

/// Wire tag sent when no quick option is selected.
pub const GENERAL_OPTION: &str = "general";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickOption {
    Symptoms,
    Diagnosis,
    Treatment,
    Precautions,
    Rare,
}

impl QuickOption {
    pub const ALL: [QuickOption; 5] = [
        QuickOption::Symptoms,
        QuickOption::Diagnosis,
        QuickOption::Treatment,
        QuickOption::Precautions,
        QuickOption::Rare,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            QuickOption::Symptoms => "symptoms",
            QuickOption::Diagnosis => "diagnosis",
            QuickOption::Treatment => "treatment",
            QuickOption::Precautions => "precautions",
            QuickOption::Rare => "rare",
        }
    }

    /// Text placed in the composer when the option is picked.
    pub fn template(&self) -> &'static str {
        match self {
            QuickOption::Symptoms => "What are the symptoms? ",
            QuickOption::Diagnosis => "Please explain the diagnosis. ",
            QuickOption::Treatment => "Suggest treatment options. ",
            QuickOption::Precautions => "Any precautions to take? ",
            QuickOption::Rare => "What are the rare and complex aspects of this condition? ",
        }
    }
}

impl fmt::Display for QuickOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseQuickOptionError {
    message: String,
}

impl fmt::Display for ParseQuickOptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseQuickOptionError {}

impl FromStr for QuickOption {
    type Err = ParseQuickOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuickOption::ALL.iter()
            .copied()
            .find(|o| o.tag() == s.trim().to_lowercase())
            .ok_or_else(|| ParseQuickOptionError {
                message: format!("Invalid quick option: '{}'", s),
            })
    }
}
