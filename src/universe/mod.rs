//! Static catalog of scannable symbols grouped into named categories.
//!
//! Categories may overlap. The master list is the union of every category in
//! declaration order with duplicates removed on first occurrence.

use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use crate::provider::Symbol;

pub const TOP_MEME_STOCKS: &str = "top_meme_stocks";
pub const HIGH_SHORT_INTEREST: &str = "high_short_interest";
pub const BIOTECH_SQUEEZE: &str = "biotech_squeeze";
pub const SMALL_CAP_MOVERS: &str = "small_cap_movers";
pub const LARGE_CAP_SAMPLES: &str = "large_cap_samples";

const BUILTIN: &[(&str, &[&str])] = &[
    (
        TOP_MEME_STOCKS,
        &[
            "GME", "AMC", "BBBY", "SAVA", "VXRT", "CLOV", "SPRT", "IRNT", "DWAC", "PHUN", "PROG",
            "ATER", "BBIG", "MULN", "EXPR", "KOSS",
        ],
    ),
    (
        HIGH_SHORT_INTEREST,
        &[
            "BYND", "PTON", "ROKU", "UPST", "AFRM", "HOOD", "COIN", "RIVN", "LCID", "NKLA", "PLUG",
            "BLNK", "QS", "GOEV", "RIDE", "WKHS",
        ],
    ),
    (
        BIOTECH_SQUEEZE,
        &[
            "BIIB", "GILD", "REGN", "BMRN", "ALNY", "SRPT", "IONS", "ARWR", "EDIT", "CRSP", "NTLA",
            "BEAM", "BLUE", "FOLD", "RARE", "KRYS",
        ],
    ),
    (
        SMALL_CAP_MOVERS,
        &[
            "SPCE", "DKNG", "PENN", "FUBO", "WISH", "RBLX", "PLTR", "SNOW", "CRWD", "OKTA", "DDOG",
            "NET", "FSLY", "ESTC", "ZM", "DOCN",
        ],
    ),
    (
        LARGE_CAP_SAMPLES,
        &["AAPL", "TSLA", "META", "NFLX", "NVDA", "GOOGL", "AMZN", "MSFT"],
    ),
];

/// Append `symbols` to `out`, skipping anything already in `seen`.
fn extend_unique<'a>(
    out: &mut Vec<Symbol>,
    seen: &mut HashSet<Symbol>,
    symbols: impl IntoIterator<Item = &'a Symbol>,
) {
    for symbol in symbols {
        if seen.insert(symbol.clone()) {
            out.push(symbol.clone());
        }
    }
}

/// Named categories of symbols plus their deduplicated union.
#[derive(Debug, Clone)]
pub struct TickerUniverse {
    categories: Vec<(String, Vec<Symbol>)>,
    master: Vec<Symbol>,
}

impl TickerUniverse {
    /// Build a universe from `(category, symbols)` pairs.
    ///
    /// Symbols are normalized and deduplicated within each category.
    pub fn new<C, S>(categories: impl IntoIterator<Item = (C, Vec<S>)>) -> Self
    where
        C: Into<String>,
        S: Into<Symbol>,
    {
        let categories: Vec<(String, Vec<Symbol>)> = categories
            .into_iter()
            .map(|(name, symbols)| {
                let mut unique = Vec::with_capacity(symbols.len());
                let mut seen = HashSet::new();
                let normalized: Vec<Symbol> = symbols.into_iter().map(Into::into).collect();
                extend_unique(&mut unique, &mut seen, &normalized);
                (name.into(), unique)
            })
            .collect();

        let mut master = Vec::new();
        let mut seen = HashSet::new();
        for (_, symbols) in &categories {
            extend_unique(&mut master, &mut seen, symbols);
        }

        Self { categories, master }
    }

    /// The built-in scanning universe.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN
                .iter()
                .map(|(name, symbols)| (*name, symbols.to_vec())),
        )
    }

    /// Symbols of one category, in declaration order.
    pub fn category(&self, name: &str) -> Option<&[Symbol]> {
        self.categories
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, symbols)| symbols.as_slice())
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|(name, _)| name.as_str())
    }

    /// Every symbol once, first-occurrence order.
    pub fn master_list(&self) -> &[Symbol] {
        &self.master
    }

    /// Names of every category containing `symbol`.
    pub fn categories_of(&self, symbol: &Symbol) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|(_, symbols)| symbols.contains(symbol))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Symbol count per category.
    pub fn sizes(&self) -> BTreeMap<String, usize> {
        self.categories
            .iter()
            .map(|(name, symbols)| (name.clone(), symbols.len()))
            .collect()
    }

    /// Resolve the symbols to scan.
    ///
    /// With no filter (or an empty one) this is the master list. Otherwise it
    /// is the union of the named categories in the given order, deduplicated.
    /// Unknown category names are ignored.
    pub fn select(&self, categories: Option<&[String]>) -> Vec<Symbol> {
        let names = match categories {
            Some(names) if !names.is_empty() => names,
            _ => return self.master.clone(),
        };

        let mut selected = Vec::new();
        let mut seen = HashSet::new();
        for name in names {
            match self.category(name) {
                Some(symbols) => extend_unique(&mut selected, &mut seen, symbols),
                None => warn!(category = %name, "Ignoring unknown category"),
            }
        }
        selected
    }
}

impl Default for TickerUniverse {
    fn default() -> Self {
        Self::builtin()
    }
}
