use raspadinha_core::{DetectorConfig, Money, PresentationConfig, WeightedSymbol};
use serde::{Deserialize, Serialize};

const EMBEDDED_CATALOG: &str = include_str!("../cards.toml");

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct CardType {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub cover_image: String,
    /// Solid fill used until, or instead of, the cover art.
    pub cover_color: String,
    #[serde(default)]
    pub symbols: Vec<WeightedSymbol>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct CardCatalog {
    pub cards: Vec<CardType>,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub presentation: PresentationConfig,
}

impl CardCatalog {
    pub(crate) fn parse(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub(crate) fn embedded() -> Self {
        Self::parse(EMBEDDED_CATALOG).unwrap_or_else(|err| {
            log::error!("embedded card catalog is invalid: {err}");
            Self {
                cards: Vec::new(),
                detector: DetectorConfig::default(),
                presentation: PresentationConfig::default(),
            }
        })
    }

    pub(crate) fn find(&self, id: &str) -> Option<&CardType> {
        self.cards.iter().find(|card| card.id == id)
    }

    /// The card with `id`, or the first one on offer.
    pub(crate) fn find_or_first(&self, id: Option<&str>) -> Option<&CardType> {
        id.and_then(|id| self.find(id)).or_else(|| self.cards.first())
    }
}
