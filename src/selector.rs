//! Maps an entity's phase configuration to a profile pool and picks a profile.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;

use crate::entity::Phase;
use crate::error::{Result, SynthError};
use crate::profiles::{ProfileClass, ProfileId, WeatherZone};

/// Disjoint groups of phase configurations sharing a candidate profile set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfilePool {
    SinglePhase,
    TwoPhase,
    ThreePhase,
}

impl ProfilePool {
    pub fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::A | Phase::B | Phase::C => Self::SinglePhase,
            Phase::AB | Phase::AC | Phase::BC => Self::TwoPhase,
            Phase::ABC => Self::ThreePhase,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SinglePhase => "single_phase",
            Self::TwoPhase => "two_phase",
            Self::ThreePhase => "three_phase",
        }
    }
}

impl fmt::Display for ProfilePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SINGLE_PHASE_CLASSES: [ProfileClass; 12] = [
    ProfileClass::BusLoLf,
    ProfileClass::BusLoPv,
    ProfileClass::BusLoWd,
    ProfileClass::BusLoDg,
    ProfileClass::ResLoWr,
    ProfileClass::ResHiWr,
    ProfileClass::ResLoPv,
    ProfileClass::ResHiPv,
    ProfileClass::ResLoWd,
    ProfileClass::ResHiWd,
    ProfileClass::ResLoDg,
    ProfileClass::ResHiDg,
];

const TWO_PHASE_CLASSES: [ProfileClass; 4] = [
    ProfileClass::BusMedLf,
    ProfileClass::BusMedPv,
    ProfileClass::BusMedWd,
    ProfileClass::BusMedDg,
];

const THREE_PHASE_CLASSES: [ProfileClass; 4] = [
    ProfileClass::BusHiLf,
    ProfileClass::BusHiPv,
    ProfileClass::BusHiWd,
    ProfileClass::BusHiDg,
];

/// Result of selecting a profile for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub profile: ProfileId,
    pub pool: ProfilePool,
}

/// Candidate profile sets per pool. Pools never share a profile.
#[derive(Debug, Clone)]
pub struct PhaseProfileMapping {
    pools: IndexMap<ProfilePool, Vec<ProfileId>>,
}

impl PhaseProfileMapping {
    /// Builds a mapping, checking that no profile appears in two pools.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Configuration`] if the pools overlap.
    pub fn new(pools: IndexMap<ProfilePool, Vec<ProfileId>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (pool, ids) in &pools {
            for id in ids {
                if !seen.insert(*id) {
                    return Err(SynthError::configuration(format!(
                        "profile `{id}` appears in more than one pool (again in {pool})"
                    )));
                }
            }
        }
        Ok(Self { pools })
    }

    /// Residential/business ERCOT pools for one weather zone.
    pub fn ercot(zone: WeatherZone) -> Self {
        let ids = |classes: &[ProfileClass]| {
            classes
                .iter()
                .map(|c| ProfileId::new(*c, zone))
                .collect::<Vec<_>>()
        };
        let pools = IndexMap::from([
            (ProfilePool::SinglePhase, ids(&SINGLE_PHASE_CLASSES)),
            (ProfilePool::TwoPhase, ids(&TWO_PHASE_CLASSES)),
            (ProfilePool::ThreePhase, ids(&THREE_PHASE_CLASSES)),
        ]);
        Self { pools }
    }

    pub fn candidates(&self, pool: ProfilePool) -> Option<&[ProfileId]> {
        self.pools.get(&pool).map(Vec::as_slice)
    }

    /// All profile ids referenced by any pool.
    pub fn profile_ids(&self) -> impl Iterator<Item = &ProfileId> {
        self.pools.values().flatten()
    }

    /// Picks a profile uniformly from the phase's pool using the entity seed.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Configuration`] if the phase has no pool or the
    /// pool is empty.
    pub fn select(&self, phase: Phase, seed: u32) -> Result<Selection> {
        let pool = ProfilePool::for_phase(phase);
        let candidates = self
            .candidates(pool)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                SynthError::configuration(format!("phase {phase} has no profiles in pool {pool}"))
            })?;

        let mut rng = StdRng::seed_from_u64(u64::from(seed));
        let index = rng.random_range(0..candidates.len());
        Ok(Selection {
            profile: candidates[index],
            pool,
        })
    }
}
