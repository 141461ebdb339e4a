//! 推理层：Analysis、Step Executor、Critique、Refinement 与收敛控制器

pub mod analysis;
pub mod critic;
pub mod events;
pub mod executor;
pub mod loop_;
pub mod prompts;
pub mod refine;
pub mod session;
pub mod types;

pub use analysis::Analyzer;
pub use critic::Critic;
pub use events::ReasoningEvent;
pub use executor::StepExecutor;
pub use loop_::{
    plain_completion, ConvergenceController, ReasoningOutcome, Termination, DEFAULT_MAX_ROUNDS,
};
pub use prompts::Preambles;
pub use refine::Refiner;
pub use session::{CallCounters, ReasoningSession};
pub use types::{AnalysisResult, Complexity, CritiqueResult, Rating};
