pub mod bracket;
pub mod state;

pub use bracket::{load_bracket, BracketBuilder};
pub use state::transition;
