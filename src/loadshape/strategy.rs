//! Loadshape generation strategies.

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use super::{GenerationMeta, Loadshape, Recurrence, normalize, synthesize_series};
use crate::entity::Load;
use crate::error::{Result, SynthError};
use crate::profiles::ProfileRepository;
use crate::selector::PhaseProfileMapping;

/// Produces one loadshape for a load from its allocated seed.
///
/// Implementations hold no mutable random state: every call builds its own
/// generators from `seed`, so calls for different loads commute.
pub trait LoadshapeStrategy {
    fn generate(&self, load: &Load, seed: u32) -> Result<Loadshape>;

    /// Short name recorded in logs and labels.
    fn name(&self) -> &'static str;
}

/// Historical profile plus normally distributed noise scaled by the profile's IQR.
#[derive(Debug, Clone)]
pub struct IqrRandom {
    profiles: ProfileRepository,
    mapping: PhaseProfileMapping,
    pub noise_scale: f64,
    pub recurrence: Recurrence,
    pub hour_interval: f64,
    pub n_interpolate: Option<usize>,
}

impl IqrRandom {
    /// Creates the strategy, checking every pooled profile is present.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Configuration`] if a pooled profile key is
    /// missing from `profiles`.
    pub fn new(
        profiles: ProfileRepository,
        mapping: PhaseProfileMapping,
        noise_scale: f64,
        recurrence: Recurrence,
        hour_interval: f64,
        n_interpolate: Option<usize>,
    ) -> Result<Self> {
        if let Some(missing) = mapping.profile_ids().find(|id| !profiles.contains(id)) {
            return Err(SynthError::configuration(format!(
                "profile `{missing}` is pooled but absent from the profile source"
            )));
        }
        Ok(Self {
            profiles,
            mapping,
            noise_scale,
            recurrence,
            hour_interval,
            n_interpolate,
        })
    }
}

impl LoadshapeStrategy for IqrRandom {
    fn generate(&self, load: &Load, seed: u32) -> Result<Loadshape> {
        let selection = self.mapping.select(load.phase.phase, seed)?;
        let profile = self.profiles.get(&selection.profile)?;
        let values = synthesize_series(profile, seed, self.noise_scale, self.n_interpolate)?;
        debug!(
            load = %load.id,
            profile = %selection.profile,
            pool = %selection.pool,
            seed,
            "generated IQR-random loadshape"
        );

        Ok(Loadshape {
            entity: load.id.clone(),
            name: format!("load_{}_{}", load.id.name, selection.profile),
            recurrence: self.recurrence,
            values,
            hour_interval: self.hour_interval,
            meta: GenerationMeta {
                profile_name: selection.profile.to_string(),
                seed,
                pool: Some(selection.pool),
            },
        })
    }

    fn name(&self) -> &'static str {
        "iqr_random"
    }
}

/// Uniform random series with no source profile.
#[derive(Debug, Clone)]
pub struct PureRandom {
    pub n_timestep: usize,
    pub recurrence: Recurrence,
    pub hour_interval: f64,
}

impl PureRandom {
    pub fn new(n_timestep: usize, recurrence: Recurrence, hour_interval: f64) -> Self {
        Self {
            n_timestep,
            recurrence,
            hour_interval,
        }
    }
}

impl LoadshapeStrategy for PureRandom {
    fn generate(&self, load: &Load, seed: u32) -> Result<Loadshape> {
        if self.n_timestep <= 1 {
            return Err(SynthError::configuration(format!(
                "random loadshape needs at least 2 timesteps, got {}",
                self.n_timestep
            )));
        }
        let mut rng = StdRng::seed_from_u64(u64::from(seed));
        let raw: Vec<f64> = (0..self.n_timestep).map(|_| rng.random::<f64>()).collect();

        Ok(Loadshape {
            entity: load.id.clone(),
            name: format!("load_{}", load.id.name),
            recurrence: self.recurrence,
            values: normalize(&raw),
            hour_interval: self.hour_interval,
            meta: GenerationMeta {
                profile_name: seed.to_string(),
                seed,
                pool: None,
            },
        })
    }

    fn name(&self) -> &'static str {
        "pure_random"
    }
}

/// Strategy variant chosen once per run.
#[derive(Debug, Clone)]
pub enum Strategy {
    IqrRandom(IqrRandom),
    PureRandom(PureRandom),
}

impl LoadshapeStrategy for Strategy {
    fn generate(&self, load: &Load, seed: u32) -> Result<Loadshape> {
        match self {
            Self::IqrRandom(s) => s.generate(load, seed),
            Self::PureRandom(s) => s.generate(load, seed),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::IqrRandom(s) => s.name(),
            Self::PureRandom(s) => s.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Connection, Phase, PhaseInfo};
    use crate::profiles::{ProfileId, WeatherZone};
    use crate::selector::ProfilePool;

    fn repository(mapping: &PhaseProfileMapping) -> ProfileRepository {
        let columns = mapping
            .profile_ids()
            .enumerate()
            .map(|(i, id)| {
                let samples = (0..24).map(|t| 1.0 + ((t + i) % 7) as f64).collect();
                (*id, samples)
            })
            .collect::<Vec<(ProfileId, Vec<f64>)>>();
        ProfileRepository::from_columns(columns).expect("unique profile columns")
    }

    fn iqr_strategy(n_interpolate: Option<usize>) -> IqrRandom {
        let mapping = PhaseProfileMapping::ercot(WeatherZone::Coast);
        let profiles = repository(&mapping);
        IqrRandom::new(profiles, mapping, 0.1, Recurrence::Yearly, 1.0, n_interpolate)
            .expect("every pooled profile is present")
    }

    fn load(phase: Phase) -> Load {
        Load::new("house_1", PhaseInfo::new(phase, Connection::Wye, 1))
    }

    #[test]
    fn iqr_random_records_selection_metadata() {
        let shape = iqr_strategy(None)
            .generate(&load(Phase::ABC), 17)
            .expect("generation");
        assert_eq!(shape.meta.pool, Some(ProfilePool::ThreePhase));
        assert_eq!(shape.meta.seed, 17);
        assert!(shape.meta.profile_name.starts_with("BUSHI"));
        assert_eq!(
            shape.name,
            format!("load_house_1_{}", shape.meta.profile_name)
        );
        assert_eq!(shape.len(), 24);
    }

    #[test]
    fn iqr_random_resamples_when_asked() {
        let shape = iqr_strategy(Some(96))
            .generate(&load(Phase::A), 3)
            .expect("generation");
        assert_eq!(shape.len(), 96);
    }

    #[test]
    fn missing_pooled_profile_fails_construction() {
        let mapping = PhaseProfileMapping::ercot(WeatherZone::Coast);
        let result = IqrRandom::new(
            ProfileRepository::default(),
            mapping,
            0.1,
            Recurrence::Daily,
            1.0,
            None,
        );
        assert!(matches!(result, Err(SynthError::Configuration(_))));
    }

    #[test]
    fn pure_random_is_seeded_and_normalized() {
        let strategy = Strategy::PureRandom(PureRandom::new(48, Recurrence::Daily, 0.5));
        let a = strategy.generate(&load(Phase::B), 5).expect("generation");
        let b = strategy.generate(&load(Phase::B), 5).expect("generation");
        assert_eq!(a, b);
        let a = a.values;
        assert_eq!(a.len(), 48);
        assert!(a.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(strategy.name(), "pure_random");
    }

    #[test]
    fn pure_random_names_the_seed() {
        let shape = PureRandom::new(10, Recurrence::Daily, 1.0)
            .generate(&load(Phase::C), 77)
            .expect("generation");
        assert_eq!(shape.meta.profile_name, "77");
        assert_eq!(shape.name, "load_house_1");
    }
}
