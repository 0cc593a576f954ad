//! Synthetic situation generator for driving analysis runs.
//!
//! Draws each situation component uniformly from the pools of values the
//! history has already seen, so every generated situation stays inside the
//! known vocabulary.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::history::{ObservationRow, Situation};

pub struct SituationGenerator {
    users: Vec<String>,
    moods: Vec<String>,
    weathers: Vec<String>,
    times: Vec<String>,
    rng: StdRng,
}

impl SituationGenerator {
    /// Build the value pools from the history rows. Pools are sorted so a
    /// fixed seed reproduces the same situation sequence.
    pub fn from_history(rows: &[ObservationRow], seed: Option<u64>) -> Self {
        let pool = |values: Vec<String>| {
            let mut pool = values;
            pool.sort();
            pool.dedup();
            pool
        };
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            users: pool(rows.iter().map(|r| r.user.clone()).collect()),
            moods: pool(rows.iter().map(|r| r.mood.clone()).collect()),
            weathers: pool(rows.iter().map(|r| r.weather.clone()).collect()),
            times: pool(rows.iter().map(|r| r.time.clone()).collect()),
            rng,
        }
    }

    fn pick(rng: &mut StdRng, pool: &[String]) -> Option<String> {
        if pool.is_empty() {
            return None;
        }
        Some(pool[rng.gen_range(0..pool.len())].clone())
    }
}

impl Iterator for SituationGenerator {
    type Item = Situation;

    fn next(&mut self) -> Option<Situation> {
        Some(Situation {
            user: Self::pick(&mut self.rng, &self.users)?,
            mood: Self::pick(&mut self.rng, &self.moods)?,
            weather: Self::pick(&mut self.rng, &self.weathers)?,
            time: Self::pick(&mut self.rng, &self.times)?,
        })
    }
}
