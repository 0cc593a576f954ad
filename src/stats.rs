//! Per-observation run statistics, accumulated as growth series.
//!
//! Every series is seeded with a zero entry so index `i` holds the state
//! after the `i`-th resolved observation. Counters are running totals;
//! `exec_time` keeps the raw per-observation value instead. The JSON field
//! names are the analysis wire format and must not change.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    /// Accumulated reward after each observation.
    satisfaction_growth: Vec<f64>,
    reasoning_count_growth: Vec<u64>,
    learning_count_growth: Vec<u64>,
    asking_count_growth: Vec<u64>,
    /// Raw execution time per observation, in seconds.
    exec_time: Vec<f64>,
    /// Installed rule count after each learning pass.
    rules_num: Vec<u64>,
    average_rule_body_length: Vec<f64>,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            satisfaction_growth: vec![0.0],
            reasoning_count_growth: vec![0],
            learning_count_growth: vec![0],
            asking_count_growth: vec![0],
            exec_time: vec![0.0],
            rules_num: vec![0],
            average_rule_body_length: vec![0.0],
        }
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one resolved observation.
    pub fn record_observation(
        &mut self,
        reward: f64,
        reasoning: u64,
        learning: u64,
        asking: u64,
        exec_seconds: f64,
    ) {
        let push_total = |series: &mut Vec<u64>, delta: u64| {
            let last = *series.last().unwrap_or(&0);
            series.push(last + delta);
        };
        let last_reward = *self.satisfaction_growth.last().unwrap_or(&0.0);
        self.satisfaction_growth.push(last_reward + reward);
        push_total(&mut self.reasoning_count_growth, reasoning);
        push_total(&mut self.learning_count_growth, learning);
        push_total(&mut self.asking_count_growth, asking);
        self.exec_time.push(exec_seconds);
    }

    /// Record the rule-set shape after a learning pass.
    pub fn record_learning(&mut self, rules: usize, average_body_length: f64) {
        self.rules_num.push(rules as u64);
        self.average_rule_body_length.push(average_body_length);
    }

    /// Number of resolved observations recorded so far.
    pub fn observations(&self) -> usize {
        self.satisfaction_growth.len().saturating_sub(1)
    }

    pub fn satisfaction(&self) -> &[f64] {
        &self.satisfaction_growth
    }

    pub fn reasoning_counts(&self) -> &[u64] {
        &self.reasoning_count_growth
    }

    pub fn learning_counts(&self) -> &[u64] {
        &self.learning_count_growth
    }

    pub fn asking_counts(&self) -> &[u64] {
        &self.asking_count_growth
    }

    pub fn exec_times(&self) -> &[f64] {
        &self.exec_time
    }

    pub fn rule_counts(&self) -> &[u64] {
        &self.rules_num
    }

    /// Mean accumulated reward per observation.
    pub fn mean_satisfaction(&self) -> f64 {
        let n = self.observations();
        if n == 0 {
            return 0.0;
        }
        self.satisfaction_growth.last().copied().unwrap_or(0.0) / n as f64
    }

    /// Mean execution time per observation, in seconds.
    pub fn mean_exec_time(&self) -> f64 {
        let n = self.observations();
        if n == 0 {
            return 0.0;
        }
        self.exec_time.iter().sum::<f64>() / n as f64
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Statistics for the analysis:")?;
        writeln!(f, "  observations resolved:   {}", self.observations())?;
        writeln!(f, "  mean satisfaction:       {:.3}", self.mean_satisfaction())?;
        writeln!(
            f,
            "  reasoning runs:          {}",
            self.reasoning_count_growth.last().unwrap_or(&0)
        )?;
        writeln!(
            f,
            "  learning runs:           {}",
            self.learning_count_growth.last().unwrap_or(&0)
        )?;
        writeln!(
            f,
            "  questions asked:         {}",
            self.asking_count_growth.last().unwrap_or(&0)
        )?;
        writeln!(f, "  mean exec time:          {:.4}s", self.mean_exec_time())?;
        write!(
            f,
            "  installed rules:         {}",
            self.rules_num.last().unwrap_or(&0)
        )
    }
}
