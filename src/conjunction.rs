//! Conjunction (C3): the atomic satisfiable unit.
//!
//! A tuple declaration plus a set of equality and inequality expressions
//! over its variables and UF calls.

use crate::error::{CoreError, CoreResult};
use crate::term::{Expression, Term, TermKind};
use crate::tuple_decl::{Slot, TupleDecl};
use std::fmt;

/// `(tupleDecl, inArity, equalities, inequalities)` plus a sticky UNSAT
/// flag once constraint propagation derives a contradiction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conjunction {
    tuple_decl: TupleDecl,
    in_arity: usize,
    equalities: Vec<Expression>,
    inequalities: Vec<Expression>,
    unsat: bool,
}

impl Conjunction {
    pub fn new(tuple_decl: TupleDecl, in_arity: usize) -> CoreResult<Self> {
        if in_arity > tuple_decl.arity() {
            return Err(CoreError::ArityMismatch {
                left: in_arity,
                right: tuple_decl.arity(),
                context: "Conjunction::new: inArity exceeds tupleDecl arity".to_string(),
            });
        }
        Ok(Conjunction {
            tuple_decl,
            in_arity,
            equalities: Vec::new(),
            inequalities: Vec::new(),
            unsat: false,
        })
    }

    pub fn tuple_decl(&self) -> &TupleDecl {
        &self.tuple_decl
    }

    pub fn arity(&self) -> usize {
        self.tuple_decl.arity()
    }

    pub fn in_arity(&self) -> usize {
        self.in_arity
    }

    pub fn is_unsat(&self) -> bool {
        self.unsat
    }

    pub fn equalities(&self) -> &[Expression] {
        &self.equalities
    }

    pub fn inequalities(&self) -> &[Expression] {
        &self.inequalities
    }

    pub fn all_constraints(&self) -> impl Iterator<Item = &Expression> {
        self.equalities.iter().chain(self.inequalities.iter())
    }

    fn validate_tuple_vars(&self, e: &Expression) -> CoreResult<()> {
        for t in e.terms() {
            Self::validate_term(t, self.tuple_decl.arity())?;
        }
        Ok(())
    }

    fn validate_term(t: &Term, arity: usize) -> CoreResult<()> {
        match &t.kind {
            TermKind::TupleVariable(k) if *k >= arity => Err(CoreError::InvariantViolation(format!(
                "tuple variable index {k} out of bounds for arity {arity}"
            ))),
            TermKind::UfCall { args, .. } => {
                for a in args {
                    for inner in a.terms() {
                        Self::validate_term(inner, arity)?;
                    }
                }
                Ok(())
            }
            TermKind::TupleExp(components) => {
                for c in components {
                    for inner in c.terms() {
                        Self::validate_term(inner, arity)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Append an equality, deduping modulo sign against constraints already
    /// present.
    pub fn add_equality(&mut self, e: Expression) -> CoreResult<()> {
        if !e.is_equality() {
            return Err(CoreError::InvariantViolation(
                "add_equality: expression is not flagged Equality".to_string(),
            ));
        }
        self.validate_tuple_vars(&e)?;
        if self
            .equalities
            .iter()
            .any(|existing| *existing == e || *existing == e.negated())
        {
            return Ok(());
        }
        self.equalities.push(e);
        Ok(())
    }

    /// Append an inequality, deduping exact duplicates.
    pub fn add_inequality(&mut self, e: Expression) -> CoreResult<()> {
        if !e.is_inequality() {
            return Err(CoreError::InvariantViolation(
                "add_inequality: expression is not flagged Inequality".to_string(),
            ));
        }
        self.validate_tuple_vars(&e)?;
        if self.inequalities.contains(&e) {
            return Ok(());
        }
        self.inequalities.push(e);
        Ok(())
    }

    /// After construction, rewrite every tuple-variable term by looking up
    /// whether the slot is a bound integer (substitute a Constant term) or
    /// a name (left alone).
    pub fn substitute_tuple_decl(&mut self) {
        for k in 0..self.tuple_decl.arity() {
            if let Some(Slot::Fixed(c)) = self.tuple_decl.slot(k) {
                let repl = Expression::value(vec![Term::constant(*c)]);
                for eq in &mut self.equalities {
                    eq.substitute(k, &repl);
                }
                for ineq in &mut self.inequalities {
                    ineq.substitute(k, &repl);
                }
            }
        }
    }

    /// Isolate a tuple variable from an equality of the form `t_k - e = 0`,
    /// returning `(k, e)`. Only equalities where `t_k` has coefficient ±1
    /// are isolatable without introducing fractions.
    fn isolate_tuple_var(eq: &Expression) -> Option<(usize, Expression)> {
        for (i, t) in eq.terms().iter().enumerate() {
            if let TermKind::TupleVariable(k) = t.kind {
                if t.coefficient == 1 || t.coefficient == -1 {
                    let sign = if t.coefficient == 1 { -1 } else { 1 };
                    let rest: Vec<Term> = eq
                        .terms()
                        .iter()
                        .enumerate()
                        .filter(|&(j, _)| j != i)
                        .map(|(_, x)| x.clone().with_coefficient(x.coefficient * sign))
                        .collect();
                    return Some((k, Expression::value(rest)));
                }
            }
        }
        None
    }

    /// Propagate equalities to fixpoint, substituting each isolatable
    /// `t_k = e` into every other constraint, and detect UNSAT: any
    /// simplified equality `c = 0` with `c != 0`, or any inequality
    /// `c >= 0` with `c < 0`.
    pub fn detect_unsat_or_find_equalities(&mut self) {
        if self.unsat {
            return;
        }
        loop {
            let isolated = self.equalities.iter().find_map(Self::isolate_tuple_var);
            let Some((slot, replacement)) = isolated else {
                break;
            };
            for eq in &mut self.equalities {
                eq.substitute(slot, &replacement);
            }
            for ineq in &mut self.inequalities {
                ineq.substitute(slot, &replacement);
            }
            self.equalities.retain(|e| e.constant_value() != Some(0));

            for eq in &self.equalities {
                if let Some(c) = eq.constant_value() {
                    if c != 0 {
                        self.unsat = true;
                        return;
                    }
                }
            }
            for ineq in &self.inequalities {
                if let Some(c) = ineq.constant_value() {
                    if c < 0 {
                        self.unsat = true;
                        return;
                    }
                }
            }
        }

        for eq in &self.equalities {
            if let Some(c) = eq.constant_value() {
                if c != 0 {
                    self.unsat = true;
                    return;
                }
            }
        }
        for ineq in &self.inequalities {
            if let Some(c) = ineq.constant_value() {
                if c < 0 {
                    self.unsat = true;
                    return;
                }
            }
        }
    }

    /// If `slot` is uniquely determined by an equality entirely in terms
    /// of slots `[lo, hi)` (plus free variables / UF calls), return that
    /// defining expression.
    pub fn find_function(&self, slot: usize, lo: usize, hi: usize) -> Option<Expression> {
        for eq in &self.equalities {
            if let Some((k, def)) = Self::isolate_tuple_var(eq) {
                if k != slot {
                    continue;
                }
                let only_in_range = def.terms().iter().all(|t| match &t.kind {
                    TermKind::TupleVariable(j) => *j >= lo && *j < hi,
                    _ => true,
                });
                if only_in_range {
                    return Some(def);
                }
            }
        }
        None
    }

    /// Existentially quantify and eliminate tuple slot `k`, assuming every
    /// surviving constraint is purely affine (UFCall terms must already
    /// have been abstracted away, e.g. via the affine superset of C10).
    /// Cheap path only: uses an equality that isolates `k` if one exists.
    /// Returns `None` when `k` cannot be eliminated this way (the caller
    /// should fall back to the solver-backed projection of C11/C12).
    #[must_use]
    pub fn project_out_via_equality(&self, k: usize) -> Option<Conjunction> {
        let def = self
            .equalities
            .iter()
            .find_map(|eq| Self::isolate_tuple_var(eq).filter(|(slot, _)| *slot == k))
            .map(|(_, def)| def)?;

        let mut equalities = Vec::new();
        let mut inequalities = Vec::new();
        for eq in &self.equalities {
            let mut e = eq.clone();
            e.substitute(k, &def);
            if e.constant_value() != Some(0) {
                equalities.push(e);
            }
        }
        for ineq in &self.inequalities {
            let mut e = ineq.clone();
            e.substitute(k, &def);
            inequalities.push(e);
        }

        let new_decl = self.tuple_decl.without_slot(k);
        let new_in_arity = if k < self.in_arity {
            self.in_arity - 1
        } else {
            self.in_arity
        };

        Some(Conjunction {
            tuple_decl: new_decl,
            in_arity: new_in_arity,
            equalities: shift_slots_down_after(&equalities, k),
            inequalities: shift_slots_down_after(&inequalities, k),
            unsat: self.unsat,
        })
    }

    pub fn force_unsat(&mut self) {
        self.unsat = true;
    }
}

/// Renumber every `TupleVariable(j)` with `j > removed` down to `j - 1`,
/// leaving `j < removed` untouched (slot `removed` must not appear -- the
/// caller has already substituted it away).
fn shift_slots_down_after(exprs: &[Expression], removed: usize) -> Vec<Expression> {
    exprs
        .iter()
        .map(|e| {
            let terms: Vec<Term> = e
                .terms()
                .iter()
                .map(|t| shift_term(t, removed))
                .collect();
            if e.is_equality() {
                Expression::equality(terms)
            } else {
                Expression::inequality(terms)
            }
        })
        .collect()
}

fn shift_term(t: &Term, removed: usize) -> Term {
    let kind = match &t.kind {
        TermKind::TupleVariable(j) if *j > removed => TermKind::TupleVariable(j - 1),
        TermKind::UfCall {
            name,
            args,
            selector,
        } => TermKind::UfCall {
            name: name.clone(),
            args: args
                .iter()
                .map(|a| {
                    let terms: Vec<Term> = a.terms().iter().map(|x| shift_term(x, removed)).collect();
                    Expression::value(terms)
                })
                .collect(),
            selector: *selector,
        },
        TermKind::TupleExp(components) => TermKind::TupleExp(
            components
                .iter()
                .map(|c| {
                    let terms: Vec<Term> = c.terms().iter().map(|x| shift_term(x, removed)).collect();
                    Expression::value(terms)
                })
                .collect(),
        ),
        other => other.clone(),
    };
    Term {
        kind,
        coefficient: t.coefficient,
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unsat {
            return write!(f, "{} : false", self.tuple_decl);
        }
        write!(f, "{} : ", self.tuple_decl)?;
        let parts: Vec<String> = self
            .all_constraints()
            .map(std::string::ToString::to_string)
            .collect();
        write!(f, "{}", parts.join(" && "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn td2() -> TupleDecl {
        TupleDecl::names(["i", "j"])
    }

    #[test]
    fn rejects_oversized_in_arity() {
        let err = Conjunction::new(td2(), 3);
        assert!(err.is_err());
    }

    #[test]
    fn add_equality_rejects_inequality_expression() {
        let mut c = Conjunction::new(td2(), 1).unwrap();
        let ineq = Expression::inequality(vec![Term::tuple_variable(0)]);
        assert!(c.add_equality(ineq).is_err());
    }

    #[test]
    fn equality_propagation_finds_contradiction() {
        let mut c = Conjunction::new(td2(), 1).unwrap();
        c.add_equality(Expression::equality(vec![
            Term::tuple_variable(0),
            Term::constant(-1),
        ]))
        .unwrap();
        c.add_equality(Expression::equality(vec![
            Term::tuple_variable(0),
            Term::constant(-2),
        ]))
        .unwrap();
        c.detect_unsat_or_find_equalities();
        assert!(c.is_unsat());
    }

    #[test]
    fn equality_propagation_substitutes_into_inequalities() {
        let mut c = Conjunction::new(td2(), 1).unwrap();
        c.add_equality(Expression::equality(vec![
            Term::tuple_variable(0),
            Term::constant(-5),
        ]))
        .unwrap();
        c.add_inequality(Expression::inequality(vec![
            Term::tuple_variable(0),
            Term::constant(-1),
        ]))
        .unwrap();
        c.detect_unsat_or_find_equalities();
        assert!(!c.is_unsat());
        // t0 - 1 >= 0 becomes 5 - 1 = 4 >= 0, a trivially-true constant.
        assert_eq!(c.inequalities()[0].constant_value(), Some(4));
    }

    #[test]
    fn negative_inequality_constant_is_unsat() {
        let mut c = Conjunction::new(td2(), 1).unwrap();
        c.add_inequality(Expression::inequality(vec![Term::constant(-1)]))
            .unwrap();
        c.detect_unsat_or_find_equalities();
        assert!(c.is_unsat());
    }

    #[test]
    fn project_out_via_equality_removes_slot_and_shifts() {
        let mut c = Conjunction::new(TupleDecl::names(["i", "j", "k"]), 2).unwrap();
        c.add_equality(Expression::equality(vec![
            Term::tuple_variable(1),
            Term::tuple_variable(0).with_coefficient(-1),
            Term::constant(-1),
        ]))
        .unwrap(); // j = i + 1
        c.add_inequality(Expression::inequality(vec![Term::tuple_variable(2)]))
            .unwrap(); // k >= 0
        let projected = c.project_out_via_equality(1).unwrap();
        assert_eq!(projected.arity(), 2);
        // k (was slot 2) is now slot 1.
        assert!(projected
            .inequalities()
            .iter()
            .any(|e| e.depends_on(&Term::tuple_variable(1))));
    }

    #[test]
    fn find_function_locates_defining_equality() {
        let mut c = Conjunction::new(td2(), 1).unwrap();
        c.add_equality(Expression::equality(vec![
            Term::tuple_variable(1),
            Term::tuple_variable(0).with_coefficient(-1),
        ]))
        .unwrap();
        let def = c.find_function(1, 0, 1);
        assert!(def.is_some());
    }

    #[test]
    fn dedupe_equality_modulo_sign() {
        let mut c = Conjunction::new(td2(), 1).unwrap();
        c.add_equality(Expression::equality(vec![Term::tuple_variable(0)]))
            .unwrap();
        c.add_equality(Expression::equality(vec![
            Term::tuple_variable(0).with_coefficient(-1),
        ]))
        .unwrap();
        assert_eq!(c.equalities().len(), 1);
    }
}
