//! The adaptive classification loop.
//!
//! One observation at a time: reason over the installed rules, learn new ones
//! when reasoning fails, fall back to asking the human, then confirm the
//! picked result. The accumulated reward rewards silent success and penalizes
//! asking and wrong guesses; timing excludes every moment spent waiting for
//! human input.

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backend::TrainerBackend;
use crate::compile::RuleCompiler;
use crate::console::{prompt_line, HumanChannel};
use crate::error::SessionResult;
use crate::history::{HistoryView, Situation};
use crate::reason::Reasoner;
use crate::registry::RuleRegistry;
use crate::rule::ACTION_PREDICATE;
use crate::stats::RunStats;
use crate::store::KnowledgeStore;

/// Flat reward penalty for having to ask the human mid-classification.
const ASK_PENALTY: f64 = 0.66;

/// Rule refresh cadence, in resolved observations.
const REFRESH_EVERY: usize = 10;

/// The classification loop's explicit states. `Resolved` carries the
/// accepted action.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    New,
    Reasoning,
    NeedsDecision,
    Learning,
    AwaitingUser,
    HasCandidates,
    Confirming,
    Resolved(String),
}

/// Drives the classification loop over pluggable store, trainer, reasoner
/// and human-channel implementations.
pub struct Orchestrator<S, B, R, H> {
    store: S,
    backend: B,
    reasoner: R,
    channel: H,
    registry: Arc<RuleRegistry>,
    rng: StdRng,
    ask_rate: f64,
    stats: RunStats,
    resolved_total: usize,
}

impl<S, B, R, H> Orchestrator<S, B, R, H>
where
    S: KnowledgeStore,
    B: TrainerBackend,
    R: Reasoner,
    H: HumanChannel,
{
    pub fn new(
        store: S,
        backend: B,
        reasoner: R,
        channel: H,
        registry: Arc<RuleRegistry>,
        ask_rate: f64,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            store,
            backend,
            reasoner,
            channel,
            registry,
            rng,
            ask_rate,
            stats: RunStats::new(),
            resolved_total: 0,
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Release the store and the accumulated statistics.
    pub fn into_parts(self) -> (S, RunStats) {
        (self.store, self.stats)
    }

    /// Run one learning pass: train on the canonicalized history, compile
    /// the exported paths and install the result. A failing pass leaves the
    /// previously installed rule set untouched.
    pub fn learn(&mut self) -> SessionResult<()> {
        tracing::info!("learning procedure initiated");
        let mut rows = self.store.rows();
        self.store.synonyms().canonicalize_rows(&mut rows);
        let records = self.backend.train_and_export(&rows, ACTION_PREDICATE)?;
        let history = HistoryView::new(rows);
        let rules = RuleCompiler::new(&history).compile(&records)?;
        self.registry.replace_all(rules);
        self.stats.record_learning(
            self.registry.len(),
            self.registry.average_body_len().unwrap_or(0.0),
        );
        Ok(())
    }

    /// Classify one observation to a single accepted action.
    pub fn classify(&mut self, situation: &Situation) -> SessionResult<String> {
        tracing::info!(%situation, "received a new observation");
        let mut reward = 1.0f64;
        let mut reasoning_count = 0u64;
        let mut learning_count = 0u64;
        let mut asking_count = 0u64;
        let mut exec_time = 0.0f64;

        let mut learning_done = false;
        let mut was_asked = false;
        // The clock stops for good once the first candidate set is fixed;
        // confirmation afterwards is human time.
        let mut clock_running = true;
        let mut timer = Instant::now();

        let mut candidates: Vec<String> = Vec::new();
        let mut initial_count: Option<usize> = None;
        let mut state = SessionState::New;

        let resolved = loop {
            state = match state {
                SessionState::New => SessionState::Reasoning,

                SessionState::Reasoning => {
                    reasoning_count += 1;
                    let actions = self.reasoner.assign_actions(situation)?;
                    if actions.is_empty() {
                        tracing::info!("no action could be assigned for the situation");
                        SessionState::NeedsDecision
                    } else {
                        candidates = actions;
                        SessionState::HasCandidates
                    }
                }

                SessionState::NeedsDecision => {
                    // Learning is tried once; afterwards asking is the only
                    // way out.
                    if learning_done || self.rng.gen_range(0.0..1.0) <= self.ask_rate {
                        SessionState::AwaitingUser
                    } else {
                        SessionState::Learning
                    }
                }

                SessionState::Learning => {
                    self.learn()?;
                    learning_count += 1;
                    learning_done = true;
                    SessionState::Reasoning
                }

                SessionState::AwaitingUser => {
                    let options = self.store.action_labels();
                    if clock_running {
                        exec_time += timer.elapsed().as_secs_f64();
                        reward -= ASK_PENALTY;
                    }
                    let index = self.channel.choose(
                        "Activating the 'Ask for an answer from the user' procedure...",
                        &options,
                    )?;
                    if clock_running {
                        timer = Instant::now();
                    }
                    candidates = vec![options[index].clone()];
                    was_asked = true;
                    asking_count += 1;
                    SessionState::HasCandidates
                }

                SessionState::HasCandidates => {
                    candidates.sort();
                    candidates.dedup();
                    if clock_running {
                        exec_time += timer.elapsed().as_secs_f64();
                        clock_running = false;
                    }
                    if initial_count.is_none() {
                        initial_count = Some(candidates.len());
                    }
                    SessionState::Confirming
                }

                SessionState::Confirming => {
                    let index = self.rng.gen_range(0..candidates.len());
                    let pick = candidates[index].clone();
                    let prompt =
                        format!("Prompt: {}\nDo you accept this result?", prompt_line(&pick));
                    if self.channel.confirm(&prompt)? {
                        SessionState::Resolved(pick)
                    } else {
                        candidates.remove(index);
                        if !was_asked {
                            // Denominator stays the size of the first fixed
                            // candidate set.
                            let initial = initial_count.unwrap_or(1).max(1);
                            reward -= 1.0 / initial as f64;
                        }
                        if candidates.is_empty() {
                            tracing::info!("all proposed candidates were rejected");
                            SessionState::AwaitingUser
                        } else {
                            SessionState::Confirming
                        }
                    }
                }

                SessionState::Resolved(action) => break action,
            };
        };

        self.store.record_resolution(situation, &resolved)?;
        self.resolved_total += 1;
        tracing::info!(action = %resolved, "saving the accepted action for the situation");

        if self.resolved_total % REFRESH_EVERY == 0 {
            tracing::info!("refreshing the inference rules after the history expansion");
            let refresh = Instant::now();
            self.learn()?;
            learning_count += 1;
            exec_time += refresh.elapsed().as_secs_f64();
        }

        self.stats.record_observation(
            reward,
            reasoning_count,
            learning_count,
            asking_count,
            exec_time,
        );
        Ok(resolved)
    }
}
