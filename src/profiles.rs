//! Historical demand profiles keyed by profile class and weather zone.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Result, SynthError};

macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = SynthError;

            fn from_str(s: &str) -> Result<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| SynthError::configuration(format!(
                        "unknown {} `{s}`", stringify!($name)
                    )))
            }
        }
    };
}

named_enum! {
    /// ERCOT load profile classes (Load Profile Guide, Appendix D).
    ProfileClass {
        BusNoDem => "BUSNODEM",
        BusLoLf => "BUSLOLF",
        BusMedLf => "BUSMEDLF",
        BusHiLf => "BUSHILF",
        BusIdrRq => "BUSIDRRQ",
        BusOgFlt => "BUSOGFLT",
        BusNoDpv => "BUSNODPV",
        BusLoPv => "BUSLOPV",
        BusMedPv => "BUSMEDPV",
        BusHiPv => "BUSHIPV",
        BusOgFpv => "BUSOGFPV",
        BusNoDwd => "BUSNODWD",
        BusLoWd => "BUSLOWD",
        BusMedWd => "BUSMEDWD",
        BusHiWd => "BUSHIWD",
        BusOgFwd => "BUSOGFWD",
        BusNoDdg => "BUSNODDG",
        BusLoDg => "BUSLODG",
        BusMedDg => "BUSMEDDG",
        BusHiDg => "BUSHIDG",
        BusOgFdg => "BUSOGFDG",
        NmLight => "NMLIGHT",
        NmFlat => "NMFLAT",
        ResLoWr => "RESLOWR",
        ResHiWr => "RESHIWR",
        ResLoPv => "RESLOPV",
        ResHiPv => "RESHIPV",
        ResLoWd => "RESLOWD",
        ResHiWd => "RESHIWD",
        ResLoDg => "RESLODG",
        ResHiDg => "RESHIDG",
    }
}

named_enum! {
    /// ERCOT weather zones.
    WeatherZone {
        Coast => "COAST",
        East => "EAST",
        FarWest => "FWEST",
        NorthCentral => "NCENT",
        North => "NORTH",
        SouthCentral => "SCENT",
        South => "SOUTH",
        West => "WEST",
    }
}

/// Profile key: class plus zone, rendered as `{class}_{zone}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProfileId {
    pub class: ProfileClass,
    pub zone: WeatherZone,
}

impl ProfileId {
    pub fn new(class: ProfileClass, zone: WeatherZone) -> Self {
        Self { class, zone }
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.class, self.zone)
    }
}

impl FromStr for ProfileId {
    type Err = SynthError;

    /// Parses `{class}_{zone}`. Class names never contain `_`, so the first
    /// underscore separates the two parts.
    fn from_str(s: &str) -> Result<Self> {
        let (class, zone) = s.split_once('_').ok_or_else(|| {
            SynthError::configuration(format!("profile key `{s}` is not `{{class}}_{{zone}}`"))
        })?;
        Ok(Self::new(class.parse()?, zone.parse()?))
    }
}

/// Immutable table of historical profiles, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct ProfileRepository {
    profiles: IndexMap<ProfileId, Vec<f64>>,
}

impl ProfileRepository {
    /// Builds a repository from `(key, samples)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Configuration`] if a key appears twice.
    pub fn from_columns(columns: impl IntoIterator<Item = (ProfileId, Vec<f64>)>) -> Result<Self> {
        let mut profiles = IndexMap::new();
        for (id, samples) in columns {
            if profiles.insert(id, samples).is_some() {
                return Err(SynthError::configuration(format!(
                    "profile `{id}` is defined more than once"
                )));
            }
        }
        debug!(count = profiles.len(), "loaded profile repository");
        Ok(Self { profiles })
    }

    /// Looks up a profile by exact key.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Configuration`] if the key is absent.
    pub fn get(&self, id: &ProfileId) -> Result<&[f64]> {
        self.profiles
            .get(id)
            .map(Vec::as_slice)
            .ok_or_else(|| SynthError::configuration(format!("profile `{id}` is not available")))
    }

    pub fn contains(&self, id: &ProfileId) -> bool {
        self.profiles.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ProfileId> {
        self.profiles.keys()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn there_are_31_classes_and_8_zones() {
        assert_eq!(ProfileClass::ALL.len(), 31);
        assert_eq!(WeatherZone::ALL.len(), 8);
    }

    #[test]
    fn profile_key_round_trips() {
        let id = ProfileId::new(ProfileClass::BusMedLf, WeatherZone::SouthCentral);
        assert_eq!(id.to_string(), "BUSMEDLF_SCENT");
        assert_eq!("BUSMEDLF_SCENT".parse::<ProfileId>().ok(), Some(id));
    }

    #[test]
    fn unknown_keys_are_configuration_errors() {
        for key in ["BUSMEDLF", "NOPE_COAST", "RESLOWR_MARS"] {
            assert!(matches!(
                key.parse::<ProfileId>(),
                Err(SynthError::Configuration(_))
            ));
        }
    }

    #[test]
    fn lookup_by_exact_key() {
        let present = ProfileId::new(ProfileClass::ResLoWr, WeatherZone::Coast);
        let absent = ProfileId::new(ProfileClass::ResLoWr, WeatherZone::East);
        let repo = ProfileRepository::from_columns([(present, vec![1.0, 2.0])])
            .expect("single column");
        assert_eq!(repo.get(&present).expect("present key"), &[1.0, 2.0][..]);
        assert!(matches!(
            repo.get(&absent),
            Err(SynthError::Configuration(_))
        ));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let id = ProfileId::new(ProfileClass::NmFlat, WeatherZone::West);
        let repo = ProfileRepository::from_columns([(id, vec![1.0]), (id, vec![2.0])]);
        assert!(repo.is_err());
    }
}
