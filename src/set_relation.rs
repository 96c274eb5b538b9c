//! Set / Relation (C4): disjunctions of conjunctions.
//!
//! A [`Set`] is conjunctions sharing one arity (input arity equals total
//! arity). A [`Relation`] additionally splits its tuple into an input
//! prefix and output suffix, and supports composition/inversion/apply.

use crate::conjunction::Conjunction;
use crate::error::{CoreError, CoreResult};
use crate::term::{Expression, Term};
use crate::tuple_decl::TupleDecl;

/// Disjunction of [`Conjunction`]s sharing one arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Set {
    arity: usize,
    conjunctions: Vec<Conjunction>,
}

impl Set {
    pub fn new(arity: usize, conjunctions: Vec<Conjunction>) -> CoreResult<Self> {
        for c in &conjunctions {
            if c.arity() != arity || c.in_arity() != arity {
                return Err(CoreError::ArityMismatch {
                    left: c.arity(),
                    right: arity,
                    context: "Set::new: conjunction arity disagrees with set arity".to_string(),
                });
            }
        }
        Ok(Set { arity, conjunctions })
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn conjunctions(&self) -> &[Conjunction] {
        &self.conjunctions
    }

    pub fn is_empty(&self) -> bool {
        self.conjunctions.is_empty() || self.conjunctions.iter().all(Conjunction::is_unsat)
    }

    #[must_use]
    pub fn union(&self, other: &Set) -> CoreResult<Set> {
        if self.arity != other.arity {
            return Err(CoreError::ArityMismatch {
                left: self.arity,
                right: other.arity,
                context: "Set::union".to_string(),
            });
        }
        let mut conjunctions = self.conjunctions.clone();
        conjunctions.extend(other.conjunctions.iter().cloned());
        Ok(Set {
            arity: self.arity,
            conjunctions,
        })
    }

    #[must_use]
    pub fn intersect(&self, other: &Set) -> CoreResult<Set> {
        if self.arity != other.arity {
            return Err(CoreError::ArityMismatch {
                left: self.arity,
                right: other.arity,
                context: "Set::intersect".to_string(),
            });
        }
        let mut conjunctions = Vec::with_capacity(self.conjunctions.len() * other.conjunctions.len());
        for a in &self.conjunctions {
            for b in &other.conjunctions {
                conjunctions.push(concat_conjunction(a, b)?);
            }
        }
        Ok(Set {
            arity: self.arity,
            conjunctions,
        })
    }
}

/// Concatenate two conjunctions' constraints under a shared tuple decl,
/// validating both already agree on arity/in_arity.
fn concat_conjunction(a: &Conjunction, b: &Conjunction) -> CoreResult<Conjunction> {
    let mut merged = Conjunction::new(a.tuple_decl().clone(), a.in_arity())?;
    for eq in a.equalities().iter().chain(b.equalities().iter()) {
        merged.add_equality(eq.clone())?;
    }
    for ineq in a.inequalities().iter().chain(b.inequalities().iter()) {
        merged.add_inequality(ineq.clone())?;
    }
    merged.detect_unsat_or_find_equalities();
    Ok(merged)
}

/// A [`Set`] whose tuple is split into an input prefix (`in_arity` slots)
/// and an output suffix (`out_arity` slots).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    in_arity: usize,
    out_arity: usize,
    conjunctions: Vec<Conjunction>,
}

impl Relation {
    pub fn new(in_arity: usize, out_arity: usize, conjunctions: Vec<Conjunction>) -> CoreResult<Self> {
        for c in &conjunctions {
            if c.in_arity() != in_arity || c.arity() != in_arity + out_arity {
                return Err(CoreError::ArityMismatch {
                    left: c.arity(),
                    right: in_arity + out_arity,
                    context: "Relation::new: conjunction arity disagrees with (inArity,outArity)".to_string(),
                });
            }
        }
        Ok(Relation {
            in_arity,
            out_arity,
            conjunctions,
        })
    }

    pub fn in_arity(&self) -> usize {
        self.in_arity
    }

    pub fn out_arity(&self) -> usize {
        self.out_arity
    }

    pub fn arity(&self) -> usize {
        self.in_arity + self.out_arity
    }

    pub fn conjunctions(&self) -> &[Conjunction] {
        &self.conjunctions
    }

    pub fn conjunctions_mut(&mut self) -> &mut [Conjunction] {
        &mut self.conjunctions
    }

    pub fn is_empty(&self) -> bool {
        self.conjunctions.is_empty() || self.conjunctions.iter().all(Conjunction::is_unsat)
    }

    /// Identity relation of arity `n` (`in_arity = out_arity = n`,
    /// `out_k = in_k` for every `k`).
    pub fn identity(n: usize) -> CoreResult<Self> {
        let decl = TupleDecl::names((0..2 * n).map(|k| format!("t{k}")));
        let mut conj = Conjunction::new(decl, n)?;
        for k in 0..n {
            conj.add_equality(Expression::equality(vec![
                Term::tuple_variable(k),
                Term::tuple_variable(n + k).with_coefficient(-1),
            ]))?;
        }
        Relation::new(n, n, vec![conj])
    }

    #[must_use]
    pub fn union(&self, other: &Relation) -> CoreResult<Relation> {
        if self.in_arity != other.in_arity || self.out_arity != other.out_arity {
            return Err(CoreError::ArityMismatch {
                left: self.arity(),
                right: other.arity(),
                context: "Relation::union".to_string(),
            });
        }
        let mut conjunctions = self.conjunctions.clone();
        conjunctions.extend(other.conjunctions.iter().cloned());
        Ok(Relation {
            in_arity: self.in_arity,
            out_arity: self.out_arity,
            conjunctions,
        })
    }

    #[must_use]
    pub fn intersect(&self, other: &Relation) -> CoreResult<Relation> {
        if self.in_arity != other.in_arity || self.out_arity != other.out_arity {
            return Err(CoreError::ArityMismatch {
                left: self.arity(),
                right: other.arity(),
                context: "Relation::intersect".to_string(),
            });
        }
        let mut conjunctions = Vec::new();
        for a in &self.conjunctions {
            for b in &other.conjunctions {
                conjunctions.push(concat_conjunction(a, b)?);
            }
        }
        Ok(Relation {
            in_arity: self.in_arity,
            out_arity: self.out_arity,
            conjunctions,
        })
    }

    /// Swap input/output prefixes: `R^-1 : B -> A` from `R : A -> B`.
    #[must_use]
    pub fn inverse(&self) -> Relation {
        let n_in = self.in_arity;
        let n_out = self.out_arity;
        let conjunctions = self
            .conjunctions
            .iter()
            .map(|c| {
                let decl = permuted_tuple_decl(c.tuple_decl(), n_in, n_out);
                let mut swapped = Conjunction::new(decl, n_out).unwrap();
                for eq in c.equalities() {
                    swapped.add_equality(permute_expression(eq, n_in, n_out)).unwrap();
                }
                for ineq in c.inequalities() {
                    swapped.add_inequality(permute_expression(ineq, n_in, n_out)).unwrap();
                }
                swapped
            })
            .collect();
        Relation {
            in_arity: n_out,
            out_arity: n_in,
            conjunctions,
        }
    }

    /// `R ∘ S` where `S: A→B` (`self`), `R: B→C` (`other`): unify the
    /// shared B-tuple variables and project them out.
    #[must_use]
    pub fn compose(&self, other: &Relation) -> CoreResult<Relation> {
        if self.out_arity != other.in_arity {
            return Err(CoreError::ArityMismatch {
                left: self.out_arity,
                right: other.in_arity,
                context: "Relation::compose: shared B-tuple arity mismatch".to_string(),
            });
        }
        let a_arity = self.in_arity;
        let b_arity = self.out_arity;
        let c_arity = other.out_arity;

        let mut conjunctions = Vec::new();
        for left in &self.conjunctions {
            for right in &other.conjunctions {
                // Layout: [A (a_arity)] [B_left (b_arity)] [B_right (b_arity)] [C (c_arity)]
                let total = a_arity + b_arity + b_arity + c_arity;
                let decl = TupleDecl::names((0..total).map(|k| format!("t{k}")));
                let mut merged = Conjunction::new(decl, a_arity + b_arity + b_arity)?;
                for eq in left.equalities() {
                    merged.add_equality(eq.clone())?;
                }
                for ineq in left.inequalities() {
                    merged.add_inequality(ineq.clone())?;
                }
                // right's own slots are local (0..b_arity+c_arity); shift
                // all of them uniformly past [A][B_left] into [B_right][C].
                for eq in right.equalities() {
                    merged.add_equality(shift_tuple_vars(eq, 0, a_arity + b_arity))?;
                }
                for ineq in right.inequalities() {
                    merged.add_inequality(shift_tuple_vars(ineq, 0, a_arity + b_arity))?;
                }
                for k in 0..b_arity {
                    merged.add_equality(Expression::equality(vec![
                        Term::tuple_variable(a_arity + k),
                        Term::tuple_variable(a_arity + b_arity + k).with_coefficient(-1),
                    ]))?;
                }
                merged.detect_unsat_or_find_equalities();
                if merged.is_unsat() {
                    continue;
                }
                // project out the two B copies, innermost first
                let mut cur = merged;
                for _ in 0..(2 * b_arity) {
                    if let Some(p) = cur.project_out_via_equality(a_arity) {
                        cur = p;
                    } else {
                        break;
                    }
                }
                conjunctions.push(cur);
            }
        }
        Relation::new(a_arity, c_arity, conjunctions)
    }

    /// Restrict the input tuple to `set`, returning the induced output
    /// Set (existentially quantifying the input slots).
    #[must_use]
    pub fn apply(&self, set: &Set) -> CoreResult<Set> {
        if set.arity() != self.in_arity {
            return Err(CoreError::ArityMismatch {
                left: set.arity(),
                right: self.in_arity,
                context: "Relation::apply".to_string(),
            });
        }
        let mut conjunctions = Vec::new();
        for rel_conj in &self.conjunctions {
            for set_conj in set.conjunctions() {
                let mut merged = Conjunction::new(rel_conj.tuple_decl().clone(), rel_conj.in_arity())?;
                for eq in rel_conj.equalities().iter().chain(set_conj.equalities().iter()) {
                    merged.add_equality(eq.clone())?;
                }
                for ineq in rel_conj.inequalities().iter().chain(set_conj.inequalities().iter()) {
                    merged.add_inequality(ineq.clone())?;
                }
                merged.detect_unsat_or_find_equalities();
                if merged.is_unsat() {
                    continue;
                }
                let mut cur = merged;
                for _ in 0..self.in_arity {
                    match cur.project_out_via_equality(0) {
                        Some(p) => cur = p,
                        None => break,
                    }
                }
                conjunctions.push(cur);
            }
        }
        Set::new(self.out_arity, conjunctions)
    }
}

fn permuted_tuple_decl(decl: &TupleDecl, n_in: usize, n_out: usize) -> TupleDecl {
    let mut slots = Vec::with_capacity(decl.arity());
    for k in n_in..n_in + n_out {
        slots.push(decl.slot(k).cloned().unwrap());
    }
    for k in 0..n_in {
        slots.push(decl.slot(k).cloned().unwrap());
    }
    TupleDecl::new(slots)
}

fn permute_expression(e: &Expression, n_in: usize, n_out: usize) -> Expression {
    use crate::term::TermKind;
    let terms: Vec<Term> = e
        .terms()
        .iter()
        .map(|t| {
            let kind = match &t.kind {
                TermKind::TupleVariable(k) if *k < n_in => TermKind::TupleVariable(k + n_out),
                TermKind::TupleVariable(k) => TermKind::TupleVariable(k - n_in),
                other => other.clone(),
            };
            Term {
                kind,
                coefficient: t.coefficient,
            }
        })
        .collect();
    if e.is_equality() {
        Expression::equality(terms)
    } else {
        Expression::inequality(terms)
    }
}

/// Renumber `TupleVariable(k)` with `k >= from` up by `offset`, used to
/// lay out a second conjunction's slots after the first's in compose.
fn shift_tuple_vars(e: &Expression, from: usize, offset: usize) -> Expression {
    use crate::term::TermKind;
    fn shift(t: &Term, from: usize, offset: usize) -> Term {
        let kind = match &t.kind {
            TermKind::TupleVariable(k) if *k >= from => TermKind::TupleVariable(k + offset),
            TermKind::TupleVariable(k) => TermKind::TupleVariable(*k),
            TermKind::UfCall { name, args, selector } => TermKind::UfCall {
                name: name.clone(),
                args: args
                    .iter()
                    .map(|a| {
                        let terms: Vec<Term> = a.terms().iter().map(|x| shift(x, from, offset)).collect();
                        Expression::value(terms)
                    })
                    .collect(),
                selector: *selector,
            },
            other => other.clone(),
        };
        Term {
            kind,
            coefficient: t.coefficient,
        }
    }
    let terms: Vec<Term> = e.terms().iter().map(|t| shift(t, from, offset)).collect();
    if e.is_equality() {
        Expression::equality(terms)
    } else {
        Expression::inequality(terms)
    }
}
