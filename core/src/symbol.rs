use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::*;

/// Cells sharing one symbol, at most the whole card.
pub type CellSet = SmallVec<[CellIndex; CELL_COUNT]>;

/// Occurrences of one symbol name needed for a win.
pub const WINNING_COUNT: u8 = 3;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Special,
}

impl Rarity {
    /// Border colour of a cell holding a symbol of this rarity.
    pub const fn border_color(self) -> &'static str {
        use Rarity::*;
        match self {
            Common => "#9ca3af",
            Uncommon => "#22c55e",
            Rare => "#3b82f6",
            Epic => "#a855f7",
            Legendary => "#f59e0b",
            Special => "#ec4899",
        }
    }

    pub const fn class_name(self) -> &'static str {
        use Rarity::*;
        match self {
            Common => "common",
            Uncommon => "uncommon",
            Rare => "rare",
            Epic => "epic",
            Legendary => "legendary",
            Special => "special",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub name: String,
    pub image_ref: String,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub base_value: Money,
    /// Free-form category from the item table, e.g. `dinheiro`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Symbol {
    pub fn new(
        name: impl Into<String>,
        image_ref: impl Into<String>,
        rarity: Rarity,
        base_value: Money,
    ) -> Self {
        Self {
            name: name.into(),
            image_ref: image_ref.into(),
            rarity,
            base_value,
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// One dealt card: nine symbols and the server's verdict.
///
/// `has_win` is authoritative for payout; the local triple search only paces
/// the presentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScratchCard {
    symbols: [Symbol; CELL_COUNT],
    has_win: bool,
}

impl ScratchCard {
    pub fn new(symbols: Vec<Symbol>, has_win: bool) -> Result<Self> {
        let symbols = <[Symbol; CELL_COUNT]>::try_from(symbols)
            .map_err(|symbols| ScratchError::InvalidSymbolCount(symbols.len()))?;
        Ok(Self { symbols, has_win })
    }

    /// Card whose verdict is the triple search over all nine symbols.
    pub fn settled_locally(symbols: Vec<Symbol>) -> Result<Self> {
        let mut card = Self::new(symbols, false)?;
        card.has_win = card.winning_symbol().is_some();
        Ok(card)
    }

    pub fn symbols(&self) -> &[Symbol; CELL_COUNT] {
        &self.symbols
    }

    pub fn symbol(&self, index: CellIndex) -> Result<&Symbol> {
        self.symbols
            .get(usize::from(index))
            .ok_or(ScratchError::InvalidCell(index.into()))
    }

    pub fn has_win(&self) -> bool {
        self.has_win
    }

    pub fn positions_of(&self, name: &str) -> CellSet {
        all_cells()
            .filter(|&index| self.symbols[usize::from(index)].name == name)
            .collect()
    }

    pub fn find_symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|symbol| symbol.name == name)
    }

    /// First symbol to reach [`WINNING_COUNT`] among the cells marked in
    /// `revealed`, scanning in row-major order.
    pub fn find_triple(&self, revealed: &[bool; CELL_COUNT]) -> Option<&Symbol> {
        let mut counts: HashMap<&str, u8> = HashMap::new();
        for (symbol, _) in self
            .symbols
            .iter()
            .zip(revealed.iter())
            .filter(|&(_, &revealed)| revealed)
        {
            let count = counts.entry(symbol.name.as_str()).or_insert(0);
            *count += 1;
            if *count >= WINNING_COUNT {
                return Some(symbol);
            }
        }
        None
    }

    /// Triple search over the whole card.
    pub fn winning_symbol(&self) -> Option<&Symbol> {
        self.find_triple(&[true; CELL_COUNT])
    }
}
