pub mod model;
pub mod overlay;
pub mod palette;
pub mod resolve;
pub mod state;

pub use overlay::OverlayPhase;
pub use state::{ClickApplied, GraphViewState, PendingQuery, QueryReport};
