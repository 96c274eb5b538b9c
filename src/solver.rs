//! External-solver adapter (C11).
//!
//! Abstracts the affine integer-set decision procedures the simplifier
//! needs behind a trait, so the rest of the pipeline (C12) does not
//! depend on any particular external library. `NaiveSolver` is a
//! from-scratch reference implementation adequate for the small tuple
//! arities arising in sparse-loop analysis; binding a real external
//! solver (the source's ISL-based adapter) is explicitly out of scope.

use crate::conjunction::Conjunction;
use crate::error::{CoreError, CoreResult};
use crate::set_relation::Relation;
use crate::term::{Expression, Term};
use tracing::{debug, warn};

/// The affine decision procedures C12 needs from an external solver.
///
/// Implementors operate only on purely affine relations -- callers must
/// have already applied the affine-superset abstraction (C10) so no
/// `UFCall` terms remain.
pub trait IntegerSetSolver {
    fn is_satisfiable(&self, relation: &Relation) -> CoreResult<bool>;
    fn is_equal(&self, a: &Relation, b: &Relation) -> CoreResult<bool>;
    fn is_subset(&self, a: &Relation, b: &Relation) -> CoreResult<bool>;
    /// Existentially quantify and eliminate tuple slot `k`. Returns `None`
    /// when the solver cannot produce an exact elimination (the caller
    /// skips that slot rather than falling back silently, per §4.11
    /// step 7).
    fn project_out(&self, relation: &Relation, k: usize) -> CoreResult<Option<Relation>>;
    fn complement(&self, relation: &Relation) -> CoreResult<Relation>;
    fn union(&self, a: &Relation, b: &Relation) -> CoreResult<Relation>;
    /// Simplify `relation` relative to `context` (a known-true
    /// surrounding set of constraints).
    fn gist(&self, relation: &Relation, context: &Relation) -> CoreResult<Relation>;
    /// Syntactic (not semantic) equality check, used as a cheap
    /// pre-filter before the more expensive `is_equal`.
    fn plain_is_equal(&self, a: &Relation, b: &Relation) -> bool;

    /// The algorithmic heart of rule instantiation (§4.10): decide
    /// whether `antecedent` actually holds against every disjunct of
    /// `context`, i.e. whether `context ∧ ¬antecedent` is unsatisfiable.
    /// A rule's consequent is only sound to add when this returns `true`
    /// -- otherwise the pairing that triggered the rule may not be one
    /// the antecedent was meant to cover.
    fn add_instantiation(&self, context: &Relation, antecedent: &Expression) -> CoreResult<bool>;
}

/// Brute-force/Fourier-Motzkin-based reference solver. Sound for purely
/// affine systems; `project_out` returns `None` (rather than an
/// incorrect answer) whenever it cannot produce an exact result within
/// `max_conjunctions_per_relation`.
#[derive(Debug, Clone, Default)]
pub struct NaiveSolver;

impl NaiveSolver {
    pub fn new() -> Self {
        NaiveSolver
    }
}

impl IntegerSetSolver for NaiveSolver {
    fn is_satisfiable(&self, relation: &Relation) -> CoreResult<bool> {
        Ok(!relation.is_empty())
    }

    fn is_equal(&self, a: &Relation, b: &Relation) -> CoreResult<bool> {
        Ok(self.is_subset(a, b)? && self.is_subset(b, a)?)
    }

    /// `a ⊆ b` iff `a ∧ ¬b` is unsatisfiable. Since we do not implement a
    /// general complement for disjunctions of conjunctions, we instead
    /// check, per conjunction of `a`, that every inequality/equality of
    /// every conjunction of `b` is entailed -- sound but incomplete for
    /// relations whose `b` is itself a non-trivial disjunction.
    fn is_subset(&self, a: &Relation, b: &Relation) -> CoreResult<bool> {
        if a.arity() != b.arity() {
            return Err(CoreError::ArityMismatch {
                left: a.arity(),
                right: b.arity(),
                context: "NaiveSolver::is_subset".to_string(),
            });
        }
        if a.is_empty() {
            return Ok(true);
        }
        for a_conj in a.conjunctions() {
            if a_conj.is_unsat() {
                continue;
            }
            let entailed = b.conjunctions().iter().any(|b_conj| conjunction_entails(a_conj, b_conj));
            if !entailed {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn project_out(&self, relation: &Relation, k: usize) -> CoreResult<Option<Relation>> {
        let mut conjunctions = Vec::with_capacity(relation.conjunctions().len());
        for c in relation.conjunctions() {
            if !c.all_constraints().all(|e| e.is_affine()) {
                warn!("project_out called on non-affine conjunction; skipping slot {k}");
                return Ok(None);
            }
            match c.project_out_via_equality(k) {
                Some(p) => conjunctions.push(p),
                None => match fourier_motzkin_eliminate(c, k) {
                    Some(p) => conjunctions.push(p),
                    None => return Ok(None),
                },
            }
        }
        let (new_in, new_out) = split_after_removal(relation, k);
        Ok(Some(Relation::new(new_in, new_out, conjunctions)?))
    }

    fn complement(&self, relation: &Relation) -> CoreResult<Relation> {
        // A general disjunction complement requires distributing negation
        // across conjunctions (De Morgan), which is out of scope for the
        // reference solver; negate a single-conjunction relation only.
        let [only] = relation.conjunctions() else {
            return Err(CoreError::SolverError(
                "NaiveSolver::complement only supports single-conjunction relations".to_string(),
            ));
        };
        let mut conj = Conjunction::new(only.tuple_decl().clone(), only.in_arity())?;
        for eq in only.equalities() {
            conj.add_inequality(eq.negated())?;
            conj.add_inequality((*eq).clone())?;
        }
        for ineq in only.inequalities() {
            let mut negated = ineq.negated();
            negated.add(crate::term::Term::constant(-1));
            conj.add_inequality(negated)?;
        }
        conj.detect_unsat_or_find_equalities();
        Relation::new(relation.in_arity(), relation.out_arity(), vec![conj])
    }

    fn union(&self, a: &Relation, b: &Relation) -> CoreResult<Relation> {
        a.union(b)
    }

    fn gist(&self, relation: &Relation, context: &Relation) -> CoreResult<Relation> {
        if relation.arity() != context.arity() {
            return Err(CoreError::ArityMismatch {
                left: relation.arity(),
                right: context.arity(),
                context: "NaiveSolver::gist".to_string(),
            });
        }
        let mut conjunctions = Vec::new();
        for r_conj in relation.conjunctions() {
            let mut kept = Conjunction::new(r_conj.tuple_decl().clone(), r_conj.in_arity())?;
            for eq in r_conj.equalities() {
                if !context.conjunctions().iter().any(|c| c.equalities().contains(eq)) {
                    kept.add_equality(eq.clone())?;
                }
            }
            for ineq in r_conj.inequalities() {
                if !context.conjunctions().iter().any(|c| c.inequalities().contains(ineq)) {
                    kept.add_inequality(ineq.clone())?;
                }
            }
            conjunctions.push(kept);
        }
        debug!("gist dropped constraints already implied by context");
        Relation::new(relation.in_arity(), relation.out_arity(), conjunctions)
    }

    fn plain_is_equal(&self, a: &Relation, b: &Relation) -> bool {
        a == b
    }

    fn add_instantiation(&self, context: &Relation, antecedent: &Expression) -> CoreResult<bool> {
        // "does not hold" splits into one or two cases depending on
        // whether the antecedent is an equality (x != 0 is lo<0 or hi>0)
        // or an inequality (x >= 0 fails exactly when x <= -1).
        let negations: Vec<Expression> = if antecedent.is_equality() {
            vec![
                negate_inequality(&Expression::inequality(antecedent.terms().to_vec())),
                negate_inequality(&Expression::inequality(antecedent.negated().terms().to_vec())),
            ]
        } else {
            vec![negate_inequality(antecedent)]
        };

        for neg in negations {
            let mut extended = context.clone();
            for c in extended.conjunctions_mut() {
                let _ = c.add_inequality(neg.clone());
                c.detect_unsat_or_find_equalities();
            }
            if self.is_satisfiable(&extended)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// `e >= 0` fails exactly when `-e - 1 >= 0` (integer strict complement).
fn negate_inequality(e: &Expression) -> Expression {
    let mut neg = e.negated();
    neg.add(Term::constant(-1));
    Expression::inequality(neg.terms().to_vec())
}

/// A very restricted entailment check: every constraint of `b` appears
/// (structurally) among `a`'s constraints. Sound (never claims entailment
/// that doesn't hold) but incomplete (misses entailments that require
/// arithmetic reasoning beyond literal containment).
fn conjunction_entails(a: &Conjunction, b: &Conjunction) -> bool {
    b.equalities().iter().all(|e| a.equalities().contains(e))
        && b.inequalities().iter().all(|e| a.inequalities().contains(e))
}

fn split_after_removal(relation: &Relation, k: usize) -> (usize, usize) {
    if k < relation.in_arity() {
        (relation.in_arity() - 1, relation.out_arity())
    } else {
        (relation.in_arity(), relation.out_arity() - 1)
    }
}

/// Classic single-variable elimination: partition inequalities mentioning
/// slot `k` into those giving a lower bound (`k >= lo`) and an upper
/// bound (`hi >= k`, i.e. `-k + hi >= 0`), then conjoin every
/// `lo_i <= hi_j` pairing. This is exact only when every coefficient on
/// slot `k` is exactly ±1 (the fragment produced by C10's affine
/// superset for the scenarios in §8); anything else is reported as
/// inexact by returning `None`.
fn fourier_motzkin_eliminate(c: &Conjunction, k: usize) -> Option<Conjunction> {
    use crate::term::{Expression, Term, TermKind};

    let mut lowers = Vec::new();
    let mut uppers = Vec::new();
    let mut untouched = Vec::new();

    for ineq in c.inequalities() {
        let coeff = ineq
            .terms()
            .iter()
            .find_map(|t| matches!(t.kind, TermKind::TupleVariable(j) if j == k).then_some(t.coefficient));
        match coeff {
            None => untouched.push(ineq.clone()),
            Some(1) => {
                let rest: Vec<Term> = ineq
                    .terms()
                    .iter()
                    .filter(|t| !matches!(t.kind, TermKind::TupleVariable(j) if j == k))
                    .cloned()
                    .collect();
                lowers.push(Expression::value(rest.iter().map(|t| t.clone().with_coefficient(-t.coefficient)).collect()));
            }
            Some(-1) => {
                let rest: Vec<Term> = ineq
                    .terms()
                    .iter()
                    .filter(|t| !matches!(t.kind, TermKind::TupleVariable(j) if j == k))
                    .cloned()
                    .collect();
                uppers.push(Expression::value(rest));
            }
            Some(_) => return None,
        }
    }

    for eq in c.equalities() {
        if eq.depends_on(&crate::term::Term::tuple_variable(k)) {
            return None;
        }
        untouched.push(eq.clone());
    }

    let decl = c.tuple_decl().without_slot(k);
    let new_in_arity = if k < c.in_arity() { c.in_arity() - 1 } else { c.in_arity() };
    let mut result = Conjunction::new(decl, new_in_arity).ok()?;

    for (eq_idx, eq) in untouched.iter().enumerate() {
        let shifted = shift_after(eq, k);
        if eq.is_equality() {
            result.add_equality(shifted).ok()?;
        } else {
            result.add_inequality(shifted).ok()?;
        }
        let _ = eq_idx;
    }
    for lo in &lowers {
        for hi in &uppers {
            let mut combined = hi.clone();
            combined.add_expression(&lo.negated());
            let e = Expression::inequality(combined.terms().to_vec());
            result.add_inequality(shift_after(&e, k)).ok()?;
        }
    }
    result.detect_unsat_or_find_equalities();
    Some(result)
}

fn shift_after(e: &crate::term::Expression, removed: usize) -> crate::term::Expression {
    use crate::term::{Term, TermKind};
    let terms: Vec<Term> = e
        .terms()
        .iter()
        .map(|t| {
            let kind = match &t.kind {
                TermKind::TupleVariable(j) if *j > removed => TermKind::TupleVariable(j - 1),
                other => other.clone(),
            };
            Term {
                kind,
                coefficient: t.coefficient,
            }
        })
        .collect();
    if e.is_equality() {
        crate::term::Expression::equality(terms)
    } else {
        crate::term::Expression::inequality(terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Expression, Term};
    use crate::tuple_decl::TupleDecl;

    #[test]
    fn project_out_eliminates_bounded_slot() {
        let decl = TupleDecl::names(["i", "j"]);
        let mut c = Conjunction::new(decl, 2).unwrap();
        c.add_inequality(Expression::inequality(vec![Term::tuple_variable(1)])).unwrap(); // j >= 0
        c.add_inequality(Expression::inequality(vec![
            Term::variable("n"),
            Term::tuple_variable(1).with_coefficient(-1),
            Term::constant(-1),
        ]))
        .unwrap(); // n - j - 1 >= 0  i.e. j < n
        let relation = Relation::new(2, 0, vec![c]).unwrap();

        let solver = NaiveSolver::new();
        let projected = solver.project_out(&relation, 1).unwrap();
        assert!(projected.is_some());
        let projected = projected.unwrap();
        assert_eq!(projected.in_arity(), 1);
    }

    #[test]
    fn project_out_refuses_non_unit_coefficient() {
        let decl = TupleDecl::names(["i"]);
        let mut c = Conjunction::new(decl, 1).unwrap();
        c.add_inequality(Expression::inequality(vec![Term::tuple_variable(0).with_coefficient(2)]))
            .unwrap();
        let relation = Relation::new(1, 0, vec![c]).unwrap();
        let solver = NaiveSolver::new();
        assert!(solver.project_out(&relation, 0).unwrap().is_none());
    }

    #[test]
    fn is_subset_true_when_constraints_are_contained() {
        let decl = TupleDecl::names(["i"]);
        let mut a = Conjunction::new(decl.clone(), 1).unwrap();
        a.add_inequality(Expression::inequality(vec![Term::tuple_variable(0)])).unwrap();
        a.add_inequality(Expression::inequality(vec![
            Term::constant(10),
            Term::tuple_variable(0).with_coefficient(-1),
        ]))
        .unwrap();
        let mut b = Conjunction::new(decl, 1).unwrap();
        b.add_inequality(Expression::inequality(vec![Term::tuple_variable(0)])).unwrap();
        let ra = Relation::new(1, 0, vec![a]).unwrap();
        let rb = Relation::new(1, 0, vec![b]).unwrap();

        let solver = NaiveSolver::new();
        assert!(solver.is_subset(&ra, &rb).unwrap());
    }

    #[test]
    fn plain_is_equal_is_purely_structural() {
        let r = Relation::identity(1).unwrap();
        let solver = NaiveSolver::new();
        assert!(solver.plain_is_equal(&r, &r));
    }
}
