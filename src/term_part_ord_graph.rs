//! Partial ordering over [`Term`] identities (C8).
//!
//! Adapts [`PartOrdGraph`] to work over `Term` values rather than bare
//! vertex ids: terms are hashed (ignoring coefficient, i.e. `same_base`)
//! to a stable vertex id the first time they are inserted.

use crate::error::{CoreError, CoreResult};
use crate::part_ord_graph::PartOrdGraph;
use crate::term::Term;
use std::collections::HashMap;
use std::fmt;

/// Maps [`Term`]s (by `same_base` identity) to [`PartOrdGraph`] vertex ids,
/// tracks a non-negativity set, and forwards ordering queries/insertions.
#[derive(Debug, Clone)]
pub struct TermPartOrdGraph {
    graph: PartOrdGraph,
    term_to_id: HashMap<TermKey, usize>,
    id_to_term: Vec<Term>,
    non_negative: std::collections::HashSet<usize>,
    done_inserting: bool,
}

/// `Term` keyed by its `same_base` identity (coefficient-independent),
/// since `Term`'s derived `Hash`/`Eq` are coefficient-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TermKey(crate::term::TermKind);

impl TermPartOrdGraph {
    pub fn new(max_num_terms: usize) -> Self {
        TermPartOrdGraph {
            graph: PartOrdGraph::new(max_num_terms),
            term_to_id: HashMap::new(),
            id_to_term: Vec::new(),
            non_negative: std::collections::HashSet::new(),
            done_inserting: false,
        }
    }

    /// Insert a term (idempotent: a second insertion of an equal-base term
    /// returns its existing id). Must happen before
    /// [`Self::done_inserting_terms`].
    pub fn insert_term(&mut self, term: &Term) -> CoreResult<usize> {
        if self.done_inserting {
            return Err(CoreError::InvariantViolation(
                "TermPartOrdGraph: insert_term called after done_inserting_terms".to_string(),
            ));
        }
        Ok(self.find_or_insert_id(term))
    }

    fn find_or_insert_id(&mut self, term: &Term) -> usize {
        let key = TermKey(term.kind.clone());
        if let Some(&id) = self.term_to_id.get(&key) {
            return id;
        }
        let id = self.id_to_term.len();
        self.id_to_term.push(term.clone());
        self.term_to_id.insert(key, id);
        id
    }

    pub fn done_inserting_terms(&mut self) -> CoreResult<()> {
        self.done_inserting = true;
        self.graph.update_num_items(self.id_to_term.len().saturating_sub(self.graph.num_items()))
    }

    fn id_of(&self, term: &Term) -> CoreResult<usize> {
        let key = TermKey(term.kind.clone());
        self.term_to_id
            .get(&key)
            .copied()
            .ok_or_else(|| CoreError::InvariantViolation(format!("term {term} was never inserted")))
    }

    pub fn term_non_negative(&mut self, term: &Term) -> CoreResult<()> {
        let id = self.id_of(term)?;
        self.non_negative.insert(id);
        Ok(())
    }

    pub fn is_non_negative(&self, term: &Term) -> bool {
        self.id_of(term).map(|id| self.non_negative.contains(&id)).unwrap_or(false)
    }

    pub fn insert_lte(&mut self, term1: &Term, term2: &Term) -> CoreResult<()> {
        let (a, b) = (self.id_of(term1)?, self.id_of(term2)?);
        self.graph.non_strict(a, b)
    }

    pub fn insert_lt(&mut self, term1: &Term, term2: &Term) -> CoreResult<()> {
        let (a, b) = (self.id_of(term1)?, self.id_of(term2)?);
        self.graph.strict(a, b)
    }

    pub fn insert_equal(&mut self, term1: &Term, term2: &Term) -> CoreResult<()> {
        let (a, b) = (self.id_of(term1)?, self.id_of(term2)?);
        self.graph.equal(a, b)
    }

    pub fn is_lte(&self, term1: &Term, term2: &Term) -> bool {
        match (self.id_of(term1), self.id_of(term2)) {
            (Ok(a), Ok(b)) => self.graph.is_non_strict(a, b) || self.graph.is_equal(a, b),
            _ => false,
        }
    }

    pub fn is_lt(&self, term1: &Term, term2: &Term) -> bool {
        match (self.id_of(term1), self.id_of(term2)) {
            (Ok(a), Ok(b)) => self.graph.is_strict(a, b),
            _ => false,
        }
    }

    pub fn is_equal(&self, term1: &Term, term2: &Term) -> bool {
        match (self.id_of(term1), self.id_of(term2)) {
            (Ok(a), Ok(b)) => self.graph.is_equal(a, b),
            _ => false,
        }
    }

    pub fn is_unsat(&self) -> bool {
        self.graph.is_unsat()
    }

    /// All unique terms inserted so far whose kind is `UfCall`.
    pub fn get_unique_uf_call_terms(&self) -> Vec<&Term> {
        self.id_to_term.iter().filter(|t| t.is_uf_call()).collect()
    }
}

impl fmt::Display for TermPartOrdGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TermPartOrdGraph:")?;
        for (id, term) in self.id_to_term.iter().enumerate() {
            writeln!(f, "\t{id}: {term}")?;
        }
        write!(f, "{}", self.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_order_round_trips() {
        let mut g = TermPartOrdGraph::new(8);
        let a = Term::variable("i");
        let b = Term::variable("j");
        g.insert_term(&a).unwrap();
        g.insert_term(&b).unwrap();
        g.done_inserting_terms().unwrap();
        g.insert_lt(&a, &b).unwrap();
        assert!(g.is_lt(&a, &b));
        assert!(!g.is_lt(&b, &a));
    }

    #[test]
    fn reinserting_same_base_term_is_idempotent() {
        let mut g = TermPartOrdGraph::new(8);
        let a = Term::variable("i");
        let a2 = Term::variable("i").with_coefficient(5);
        let id1 = g.insert_term(&a).unwrap();
        let id2 = g.insert_term(&a2).unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn insert_after_done_inserting_is_invariant_violation() {
        let mut g = TermPartOrdGraph::new(8);
        g.insert_term(&Term::variable("i")).unwrap();
        g.done_inserting_terms().unwrap();
        assert!(g.insert_term(&Term::variable("j")).is_err());
    }

    #[test]
    fn non_negative_tracking() {
        let mut g = TermPartOrdGraph::new(8);
        let a = Term::variable("i");
        g.insert_term(&a).unwrap();
        g.done_inserting_terms().unwrap();
        assert!(!g.is_non_negative(&a));
        g.term_non_negative(&a).unwrap();
        assert!(g.is_non_negative(&a));
    }

    #[test]
    fn get_unique_uf_call_terms_filters_by_kind() {
        let mut g = TermPartOrdGraph::new(8);
        let uf = Term::uf_call("idx", vec![crate::term::Expression::value(vec![Term::variable("i")])]);
        let plain = Term::variable("i");
        g.insert_term(&uf).unwrap();
        g.insert_term(&plain).unwrap();
        g.done_inserting_terms().unwrap();
        assert_eq!(g.get_unique_uf_call_terms().len(), 1);
    }
}
