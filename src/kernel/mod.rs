//! The synchronous core: schema interpretation, the state tree, scoring and
//! timers. Nothing in here touches the network or the filesystem.

pub mod layout;
pub mod path;
pub mod schema;
pub mod scoring;
pub mod state;
pub mod timer;

pub use layout::{FormKind, FormLayout};
pub use path::FieldPath;
pub use scoring::{score_form, section_score, ScoreBreakdown};
pub use state::{LeafValue, StateError, StateTree};
