//! Generation backends for the research workflow
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Research workflow nodes          │
//! └─────────────────┬───────────────────────┘
//!                   │ uses
//!                   ▼
//! ┌─────────────────────────────────────────┐
//! │     GenerationService (trait)           │
//! │  - generate(prompt, options)            │
//! └─────────────────┬───────────────────────┘
//!                   │ implemented by
//!        ┌──────────┼───────────────┐
//!        ▼          ▼               ▼
//! ┌────────────┐ ┌──────────────┐ ┌─────────────────┐
//! │GeminiClient│ │ScriptedService│ │RigOllamaService │
//! │ (grounded) │ │  (tests)      │ │ (compat, local) │
//! └────────────┘ └──────────────┘ └─────────────────┘
//! ```

mod gemini;
mod provider;
mod scripted;

pub use gemini::{GeminiClient, DEFAULT_BASE_URL};
pub use provider::{GenerateOptions, Generation, GenerationService, OutputSchema};
pub use scripted::{RecordedRequest, ScriptedService};
