/// Context-free grammar runtime — symbols, parsing, loading, and validation.

use serde::Deserialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::schema::category::Category;

/// Conventional name of the start symbol.
pub const DEFAULT_START: &str = "S";

const ENGLISH_RON: &str = include_str!("../../grammar_data/english.ron");

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("rule '{rule}' references unknown category '{name}'")]
    UnknownCategory { rule: String, name: String },
    #[error("rule '{rule}' contains malformed token '{token}'")]
    MalformedToken { rule: String, token: String },
    #[error("start symbol '{0}' has no rule")]
    MissingStart(String),
    #[error("rule '{0}' has no alternatives")]
    EmptyRule(String),
    #[error("rule '{rule}' has an empty alternative at index {index}")]
    EmptyAlternative { rule: String, index: usize },
    #[error("grammar contains a cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// One symbol of a production, classified once at grammar construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// `{category}` — replaced by a random word from the word bank.
    TerminalRef(Category),
    /// Name of another rule in the same grammar.
    NonterminalRef(String),
    /// Any other token, emitted unchanged.
    Literal(String),
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TerminalRef(category) => write!(f, "{{{}}}", category),
            Self::NonterminalRef(name) | Self::Literal(name) => f.write_str(name),
        }
    }
}

/// A single alternative of a rule: symbols expanded left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub symbols: Vec<Symbol>,
}

/// An immutable, validated grammar.
///
/// A constructed `Grammar` always has a rule for its start symbol, no empty
/// rules or alternatives, and an acyclic rule reference graph, so every
/// expansion terminates.
#[derive(Debug, Clone)]
pub struct Grammar {
    start: String,
    rules: HashMap<String, Vec<Production>>,
    // Kept so merges can re-classify tokens against the combined rule names.
    source: HashMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Grammar")]
struct RonGrammar {
    #[serde(default = "default_start")]
    start: String,
    rules: HashMap<String, Vec<String>>,
}

fn default_start() -> String {
    DEFAULT_START.to_string()
}

impl Grammar {
    /// Build a grammar from `(rule name, alternatives)` pairs.
    ///
    /// Each alternative is a space-separated list of tokens:
    /// - `{category}` → `TerminalRef` (must name a known [`Category`])
    /// - a token equal to a rule name → `NonterminalRef`
    /// - anything else → `Literal`
    pub fn from_rules<I, K, V, A>(start: impl Into<String>, rules: I) -> Result<Grammar, GrammarError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator<Item = A>,
        A: AsRef<str>,
    {
        let source: HashMap<String, Vec<String>> = rules
            .into_iter()
            .map(|(name, alts)| {
                let alts: Vec<String> = alts.into_iter().map(|a| a.as_ref().to_string()).collect();
                (name.into(), alts)
            })
            .collect();
        Self::build(start.into(), source)
    }

    /// The grammar shipped with the crate: simple and compound English
    /// sentences over the seven word categories.
    pub fn english() -> Result<Grammar, GrammarError> {
        Self::parse_ron(ENGLISH_RON)
    }

    /// Load a grammar from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Grammar, GrammarError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a grammar from a RON string of the form
    /// `(start: "S", rules: { "S": ["NP VP"], ... })`.
    pub fn parse_ron(input: &str) -> Result<Grammar, GrammarError> {
        let raw: RonGrammar = ron::from_str(input)?;
        Self::build(raw.start, raw.rules)
    }

    /// Merge another grammar into this one. Rules from `other` override
    /// rules in `self` with the same name; the start symbol is kept.
    pub fn merge(&self, other: &Grammar) -> Result<Grammar, GrammarError> {
        let mut source = self.source.clone();
        for (name, alts) in &other.source {
            source.insert(name.clone(), alts.clone());
        }
        Self::build(self.start.clone(), source)
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    /// The alternatives for a rule, if the name is a nonterminal.
    pub fn rule(&self, name: &str) -> Option<&[Production]> {
        self.rules.get(name).map(Vec::as_slice)
    }

    pub fn contains_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Rule names in sorted order.
    pub fn rule_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Classify a free-standing token the same way production tokens are.
    pub fn resolve_token(&self, token: &str) -> Result<Symbol, GrammarError> {
        let names: HashSet<&str> = self.rules.keys().map(String::as_str).collect();
        parse_token("<input>", token, &names)
    }

    /// Every category referenced by some production.
    pub fn categories(&self) -> BTreeSet<Category> {
        self.symbols()
            .filter_map(|(_, symbol)| match symbol {
                Symbol::TerminalRef(category) => Some(*category),
                _ => None,
            })
            .collect()
    }

    /// Literals shaped like rule names (`Noun`, `VerbPhrase`), usually a
    /// typo in a rule reference. Returned as sorted `(rule, literal)` pairs.
    pub fn suspicious_literals(&self) -> Vec<(String, String)> {
        let mut found: Vec<(String, String)> = self
            .symbols()
            .filter_map(|(rule, symbol)| match symbol {
                Symbol::Literal(text) if looks_like_rule_name(text) => {
                    Some((rule.to_string(), text.clone()))
                }
                _ => None,
            })
            .collect();
        found.sort();
        found.dedup();
        found
    }

    /// Rules that cannot be reached from the start symbol, sorted.
    pub fn unreachable_rules(&self) -> Vec<&str> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut pending = vec![self.start.as_str()];
        while let Some(name) = pending.pop() {
            if !seen.insert(name) {
                continue;
            }
            for production in self.rules.get(name).into_iter().flatten() {
                for symbol in &production.symbols {
                    if let Symbol::NonterminalRef(next) = symbol {
                        pending.push(next.as_str());
                    }
                }
            }
        }
        self.rule_names()
            .into_iter()
            .filter(|name| !seen.contains(name))
            .collect()
    }

    fn symbols(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.rules.iter().flat_map(|(name, prods)| {
            prods
                .iter()
                .flat_map(move |p| p.symbols.iter().map(move |s| (name.as_str(), s)))
        })
    }

    fn build(start: String, source: HashMap<String, Vec<String>>) -> Result<Grammar, GrammarError> {
        if !source.contains_key(&start) {
            return Err(GrammarError::MissingStart(start));
        }

        let names: HashSet<&str> = source.keys().map(String::as_str).collect();
        let mut rules = HashMap::with_capacity(source.len());

        for (name, alts) in &source {
            if alts.is_empty() {
                return Err(GrammarError::EmptyRule(name.clone()));
            }
            let mut productions = Vec::with_capacity(alts.len());
            for (index, alt) in alts.iter().enumerate() {
                let symbols = alt
                    .split_whitespace()
                    .map(|token| parse_token(name, token, &names))
                    .collect::<Result<Vec<_>, _>>()?;
                if symbols.is_empty() {
                    return Err(GrammarError::EmptyAlternative {
                        rule: name.clone(),
                        index,
                    });
                }
                productions.push(Production { symbols });
            }
            rules.insert(name.clone(), productions);
        }

        check_acyclic(&rules)?;

        Ok(Grammar {
            start,
            rules,
            source,
        })
    }
}

fn parse_token(rule: &str, token: &str, names: &HashSet<&str>) -> Result<Symbol, GrammarError> {
    if token.starts_with('{') || token.ends_with('}') {
        let inner = token
            .strip_prefix('{')
            .and_then(|t| t.strip_suffix('}'))
            .filter(|t| !t.is_empty() && !t.contains(['{', '}']))
            .ok_or_else(|| GrammarError::MalformedToken {
                rule: rule.to_string(),
                token: token.to_string(),
            })?;
        return inner
            .parse::<Category>()
            .map(Symbol::TerminalRef)
            .map_err(|_| GrammarError::UnknownCategory {
                rule: rule.to_string(),
                name: inner.to_string(),
            });
    }

    if names.contains(token) {
        Ok(Symbol::NonterminalRef(token.to_string()))
    } else {
        Ok(Symbol::Literal(token.to_string()))
    }
}

fn looks_like_rule_name(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    InProgress,
    Done,
}

/// Depth-first search over nonterminal references; any back edge is a cycle.
fn check_acyclic(rules: &HashMap<String, Vec<Production>>) -> Result<(), GrammarError> {
    let mut names: Vec<&str> = rules.keys().map(String::as_str).collect();
    names.sort_unstable();

    let mut state: HashMap<&str, Visit> = HashMap::with_capacity(rules.len());
    let mut path: Vec<&str> = Vec::new();

    for name in names {
        visit(name, rules, &mut state, &mut path)?;
    }
    Ok(())
}

fn visit<'a>(
    name: &'a str,
    rules: &'a HashMap<String, Vec<Production>>,
    state: &mut HashMap<&'a str, Visit>,
    path: &mut Vec<&'a str>,
) -> Result<(), GrammarError> {
    match state.get(name) {
        Some(Visit::Done) => return Ok(()),
        Some(Visit::InProgress) => {
            let from = path.iter().position(|n| *n == name).unwrap_or(0);
            let mut cycle: Vec<String> = path[from..].iter().map(|n| n.to_string()).collect();
            cycle.push(name.to_string());
            return Err(GrammarError::Cycle(cycle));
        }
        None => {}
    }

    state.insert(name, Visit::InProgress);
    path.push(name);

    if let Some(productions) = rules.get(name) {
        for production in productions {
            for symbol in &production.symbols {
                if let Symbol::NonterminalRef(next) = symbol {
                    visit(next.as_str(), rules, state, path)?;
                }
            }
        }
    }

    path.pop();
    state.insert(name, Visit::Done);
    Ok(())
}
