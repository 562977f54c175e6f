//! Doctor shifts and their fixed slot timetables.
//!
//! Every shift maps to four one-hour slot labels. The table is the single
//! source of truth for which times a doctor can be booked at.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A doctor's assigned working period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Morning,
    Afternoon,
    Evening,
    Night,
}

const MORNING_SLOTS: [&str; 4] = ["09:00", "10:00", "11:00", "12:00"];
const AFTERNOON_SLOTS: [&str; 4] = ["13:00", "14:00", "15:00", "16:00"];
const EVENING_SLOTS: [&str; 4] = ["14:00", "15:00", "16:00", "17:00"];
const NIGHT_SLOTS: [&str; 4] = ["18:00", "19:00", "20:00", "21:00"];

impl Shift {
    pub const ALL: [Shift; 4] = [Shift::Morning, Shift::Afternoon, Shift::Evening, Shift::Night];

    /// Ordered slot labels for this shift.
    pub fn slots(self) -> &'static [&'static str] {
        match self {
            Shift::Morning => &MORNING_SLOTS,
            Shift::Afternoon => &AFTERNOON_SLOTS,
            Shift::Evening => &EVENING_SLOTS,
            Shift::Night => &NIGHT_SLOTS,
        }
    }

    /// Whether `label` is one of this shift's slots.
    pub fn has_slot(self, label: &str) -> bool {
        self.slots().contains(&label)
    }

    /// Database / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Shift::Morning => "morning",
            Shift::Afternoon => "afternoon",
            Shift::Evening => "evening",
            Shift::Night => "night",
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shift {
    type Err = CoreError;

    /// Case-insensitive, so legacy values such as `"Morning"` parse too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Shift::Morning),
            "afternoon" => Ok(Shift::Afternoon),
            "evening" => Ok(Shift::Evening),
            "night" => Ok(Shift::Night),
            other => Err(CoreError::Validation(format!("Unknown shift '{other}'"))),
        }
    }
}

impl TryFrom<String> for Shift {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn morning_slots_in_order() {
        assert_eq!(
            Shift::Morning.slots(),
            &["09:00", "10:00", "11:00", "12:00"]
        );
    }

    #[test]
    fn evening_and_night_tables() {
        assert_eq!(Shift::Evening.slots(), &["14:00", "15:00", "16:00", "17:00"]);
        assert_eq!(Shift::Night.slots(), &["18:00", "19:00", "20:00", "21:00"]);
    }

    #[test]
    fn afternoon_has_its_own_table() {
        assert_eq!(Shift::Afternoon.slots().len(), 4);
        assert!(Shift::Afternoon.has_slot("13:00"));
    }

    #[test]
    fn every_shift_has_four_slots() {
        for shift in Shift::ALL {
            assert_eq!(shift.slots().len(), 4, "{shift}");
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Morning".parse::<Shift>().unwrap(), Shift::Morning);
        assert_eq!(" night ".parse::<Shift>().unwrap(), Shift::Night);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!("graveyard".parse::<Shift>().is_err());
    }

    #[test]
    fn as_str_round_trips() {
        for shift in Shift::ALL {
            assert_eq!(shift.as_str().parse::<Shift>().unwrap(), shift);
        }
    }
}
