use petgraph::graph::NodeIndex;
use thiserror::Error;
use tracing::trace;

use crate::annotate::{annotate, AnnotatorConfig, PerceptionError};
use crate::atom::Atom;
use crate::bind::{bind, MatchContext};
use crate::bond::Bond;
use crate::matcher::{find_all, single_atom_matches};
use crate::mol::Mol;
use crate::resolve::{resolve, unique_of, AtomMapping};
use crate::smarts::{compile, QueryGraph, SmartsError};

/// Errors surfaced by [`SmartsQueryTool`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("invalid SMARTS pattern: {0}")]
    Compilation(#[from] SmartsError),
    #[error(transparent)]
    Perception(#[from] PerceptionError),
}

/// Compiles a SMARTS pattern once and matches it against any number of
/// target molecules.
///
/// ```
/// use crabquery::{from_smiles, SmartsQueryTool};
///
/// let mut tool = SmartsQueryTool::new("O=CO").unwrap();
/// let anhydride = from_smiles("CC(=O)OC(=O)C").unwrap();
/// assert!(tool.matches(&anhydride).unwrap());
/// assert_eq!(tool.count_matches(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SmartsQueryTool {
    pattern: String,
    query: QueryGraph,
    config: AnnotatorConfig,
    matches: Option<Vec<AtomMapping>>,
}

impl SmartsQueryTool {
    pub fn new(pattern: &str) -> Result<Self, QueryError> {
        Self::with_config(pattern, AnnotatorConfig::default())
    }

    pub fn with_config(pattern: &str, config: AnnotatorConfig) -> Result<Self, QueryError> {
        let query = compile(pattern)?;
        Ok(Self {
            pattern: pattern.to_string(),
            query,
            config,
            matches: None,
        })
    }

    /// Replace the pattern. On failure the previous pattern stays in effect;
    /// on success any stored match result is discarded.
    pub fn set_pattern(&mut self, pattern: &str) -> Result<(), QueryError> {
        let query = compile(pattern)?;
        self.pattern = pattern.to_string();
        self.query = query;
        self.matches = None;
        Ok(())
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn query(&self) -> &QueryGraph {
        &self.query
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    /// Match the current pattern against `target`, storing every atom
    /// mapping found. Returns whether there was at least one.
    ///
    /// The target is never modified; ring and aromaticity perception run on
    /// every call.
    pub fn matches(&mut self, target: &Mol<Atom, Bond>) -> Result<bool, QueryError> {
        let annotations = annotate(target, &self.config)?;
        let bindings = bind(&self.query, target, &annotations);
        let ctx = MatchContext {
            mol: target,
            annotations: &annotations,
            bindings: &bindings,
        };

        let mappings = match self.query.atom_count() {
            0 => Vec::new(),
            1 => {
                let expr = self.query.atom(NodeIndex::new(0));
                single_atom_matches(&ctx, expr)
            }
            _ => resolve(&find_all(&ctx, &self.query), target),
        };

        trace!(
            pattern = %self.pattern,
            atoms = target.atom_count(),
            matches = mappings.len(),
            "matched SMARTS pattern"
        );

        let found = !mappings.is_empty();
        self.matches = Some(mappings);
        Ok(found)
    }

    /// Number of mappings from the last [`matches`](Self::matches) call, or
    /// 0 before any.
    pub fn count_matches(&self) -> usize {
        self.matching_atoms().len()
    }

    pub fn matching_atoms(&self) -> &[AtomMapping] {
        self.matches.as_deref().unwrap_or(&[])
    }

    /// The stored mappings with duplicates by atom set removed, each as a
    /// sorted index list.
    pub fn unique_matching_atoms(&self) -> Vec<AtomMapping> {
        unique_of(self.matching_atoms())
    }
}
