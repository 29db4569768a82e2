use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Renames applied to symbol-table entries before the table is finalized
///
/// Each line of the source is `canonical original`; lines with any other
/// number of fields are ignored.
#[derive(Debug, Clone, Default)]
pub struct SpecialSymbols {
    renames: HashMap<String, String>,
}

impl SpecialSymbols {
    pub fn parse(content: &str) -> Self {
        let renames = content
            .lines()
            .filter_map(|line| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                match fields.as_slice() {
                    [canonical, original] => Some((original.to_string(), canonical.to_string())),
                    _ => None,
                }
            })
            .collect();
        Self { renames }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read special symbols: {:?}", path))?;
        Ok(Self::parse(&content))
    }

    /// Canonical name for `symbol`, or `symbol` itself when not renamed
    pub fn resolve<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.renames.get(symbol).map(String::as_str).unwrap_or(symbol)
    }

    pub fn len(&self) -> usize {
        self.renames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }
}

/// Mapping from recognizer output index to symbol text
#[derive(Debug, Clone)]
pub struct SymbolTable {
    symbols: HashMap<usize, String>,
    blank: usize,
}

impl SymbolTable {
    /// Parse `symbol index` lines
    ///
    /// Malformed lines are skipped. The last index whose resolved symbol equals
    /// `blank_marker` becomes the blank index, 0 when none does.
    pub fn parse(content: &str, specials: &SpecialSymbols, blank_marker: &str) -> Self {
        let mut symbols = HashMap::new();
        let mut blank = 0;

        for (line_no, line) in content.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let entry = match fields.as_slice() {
                [symbol, index] => index.parse::<usize>().ok().map(|i| (*symbol, i)),
                _ => None,
            };

            let Some((symbol, index)) = entry else {
                if !line.trim().is_empty() {
                    warn!("Skipping malformed symbol table line {}: {:?}", line_no + 1, line);
                }
                continue;
            };

            let symbol = specials.resolve(symbol);
            if symbol == blank_marker {
                blank = index;
            }
            symbols.insert(index, symbol.to_string());
        }

        debug!("Symbol table: {} symbols, blank index {}", symbols.len(), blank);

        Self { symbols, blank }
    }

    pub fn load(path: &Path, special: Option<&Path>, blank_marker: &str) -> Result<Self> {
        let specials = match special {
            Some(p) => SpecialSymbols::load(p)?,
            None => SpecialSymbols::default(),
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read symbol table: {:?}", path))?;
        Ok(Self::parse(&content, &specials, blank_marker))
    }

    pub fn symbol(&self, index: usize) -> Option<&str> {
        self.symbols.get(&index).map(String::as_str)
    }

    /// Index of the blank symbol
    pub fn blank(&self) -> usize {
        self.blank
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
