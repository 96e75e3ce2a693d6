use serde::{Deserialize, Serialize};

use crate::*;
pub use random::*;

mod random;

pub trait CardGenerator {
    fn generate(self, pool: &[WeightedSymbol]) -> Result<ScratchCard>;
}

/// A symbol a generator may place, with its relative draw weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedSymbol {
    #[serde(flatten)]
    pub symbol: Symbol,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

const fn default_weight() -> u32 {
    1
}
