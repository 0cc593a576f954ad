//! # ontoloop
//!
//! An adaptive rule-learning loop: decision-tree induction over an
//! observation history, compiled into deduplicated Horn-clause rules, driving
//! a human-in-the-loop classification session.
//!
//! ## Architecture
//!
//! - **Rule vocabulary** (`rule`): typed predicate atoms and Horn-clause rules
//! - **Path normalizer** (`paths`): tree-text and JSON exports to one record form
//! - **Compiler** (`compile`): pre-order paths to rules, negations grounded
//!   against the history (`negation`)
//! - **Session** (`session`): reason / learn / ask loop with reward tracking
//! - **Store** (`store`): the `;`-separated observation history CSV
//!
//! ## Library usage
//!
//! ```no_run
//! use ontoloop::compile::RuleCompiler;
//! use ontoloop::history::HistoryView;
//! use ontoloop::paths::parse_tree_text;
//! use ontoloop::store::{CsvStore, KnowledgeStore};
//!
//! let store = CsvStore::load("knowledge/actions_taken.csv").unwrap();
//! let history = HistoryView::new(store.rows());
//! let records = parse_tree_text(&std::fs::read_to_string("tree_rules.txt").unwrap()).unwrap();
//! let rules = RuleCompiler::new(&history).compile(&records).unwrap();
//! for rule in &rules {
//!     println!("{rule}");
//! }
//! ```

pub mod backend;
pub mod compile;
pub mod config;
pub mod console;
pub mod error;
pub mod generate;
pub mod history;
pub mod negation;
pub mod paths;
pub mod reason;
pub mod registry;
pub mod rule;
pub mod session;
pub mod stats;
pub mod store;
