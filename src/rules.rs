//! Universally-quantified rule store (C6).
//!
//! A rule asserts `∀ e1,e2. e1 paramOp e2 ⇒ uf1(e1) ufOp uf2(e2)`
//! (`Param2UF`) or its converse (`UF2Param`). `apply` instantiates rules
//! against UF-call occurrences already present in a relation's
//! constraints; it runs single-pass rather than to fixpoint because its
//! output is consumed by later, affine-only pipeline stages (§4.5).

use crate::error::CoreResult;
use crate::set_relation::Relation;
use crate::solver::IntegerSetSolver;
use crate::term::{Expression, Term, TermKind};
use tracing::trace;

/// Comparison operator appearing on either side of a [`Rule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Build the `Expression` `lhs (op) rhs` as a single Equality or
    /// Inequality constraint.
    fn build(self, lhs: Term, rhs: Term) -> Expression {
        let neg_rhs = rhs.clone().with_coefficient(-rhs.coefficient);
        match self {
            CompareOp::Eq => Expression::equality(vec![lhs, neg_rhs]),
            CompareOp::Lt => Expression::inequality(vec![neg_rhs, lhs, Term::constant(-1)]),
            CompareOp::Le => Expression::inequality(vec![neg_rhs, lhs]),
            CompareOp::Gt => Expression::inequality(vec![lhs, neg_rhs, Term::constant(-1)]),
            CompareOp::Ge => Expression::inequality(vec![lhs, neg_rhs]),
        }
    }
}

/// Which direction the implication runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleType {
    /// `e1 paramOp e2  =>  uf1(e1) ufOp uf2(e2)`
    Param2UF,
    /// `uf1(e1) ufOp uf2(e2)  =>  e1 paramOp e2`
    UF2Param,
}

/// `(type, paramOp, ufOp, uf1, uf2)`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub rule_type: RuleType,
    pub param_op: CompareOp,
    pub uf_op: CompareOp,
    pub uf1: String,
    pub uf2: String,
}

/// Ordered list of [`Rule`]s; iteration order is the insertion order so
/// results stay reproducible (§5).
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    rules: Vec<Rule>,
}

impl RuleStore {
    pub fn new() -> Self {
        RuleStore::default()
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Single-pass instantiation, ungated: for each rule and each pair of
    /// UF-call occurrences matching its `(uf1, uf2)`, add the consequent
    /// unconditionally. Kept for callers that have no solver on hand;
    /// [`Self::apply_with_solver`] is the sound variant the C12 driver
    /// actually uses.
    pub fn apply(&self, relation: &Relation) -> CoreResult<Relation> {
        self.instantiate(relation, None)
    }

    /// Instantiate rules gated by [`IntegerSetSolver::add_instantiation`]
    /// (§4.10): a rule's consequent is only added for a given pairing once
    /// the solver confirms the antecedent actually holds against the
    /// relation built up so far, rather than asserting it for every
    /// syntactically matching pair regardless of whether the antecedent
    /// is true for that pair.
    pub fn apply_with_solver(&self, relation: &Relation, solver: &dyn IntegerSetSolver) -> CoreResult<Relation> {
        self.instantiate(relation, Some(solver))
    }

    fn instantiate(&self, relation: &Relation, solver: Option<&dyn IntegerSetSolver>) -> CoreResult<Relation> {
        let mut out = relation.clone();
        for rule in &self.rules {
            let calls = collect_uf_call_terms(relation);
            let lhs_calls: Vec<&Term> = calls.iter().filter(|t| t.uf_name() == Some(rule.uf1.as_str())).copied().collect();
            let rhs_calls: Vec<&Term> = calls.iter().filter(|t| t.uf_name() == Some(rule.uf2.as_str())).copied().collect();

            for f in &lhs_calls {
                for g in &rhs_calls {
                    if std::ptr::eq(*f, *g) {
                        continue;
                    }
                    let Some((antecedent, consequent)) = rule_instance(rule, *f, *g) else {
                        continue;
                    };
                    if let Some(solver) = solver {
                        if !solver.add_instantiation(&out, &antecedent)? {
                            trace!(uf1 = %rule.uf1, uf2 = %rule.uf2, "rule antecedent not entailed; skipping instantiation");
                            continue;
                        }
                    }
                    trace!(uf1 = %rule.uf1, uf2 = %rule.uf2, "instantiating rule");
                    for c in out.conjunctions_mut() {
                        if consequent.is_equality() {
                            let _ = c.add_equality(consequent.clone());
                        } else {
                            let _ = c.add_inequality(consequent.clone());
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Build the `(antecedent, consequent)` pair for one rule instantiated
/// against one pairing of UF-call occurrences `f`, `g`.
fn rule_instance(rule: &Rule, f: &Term, g: &Term) -> Option<(Expression, Expression)> {
    let (TermKind::UfCall { args: a1, .. }, TermKind::UfCall { args: a2, .. }) = (&f.kind, &g.kind) else {
        return None;
    };
    let (Some(e1), Some(e2)) = (a1.first(), a2.first()) else {
        return None;
    };
    match rule.rule_type {
        RuleType::Param2UF => {
            let antecedent = rule.param_op.build(single_term(e1), single_term(e2));
            let consequent = rule.uf_op.build(f.clone(), g.clone());
            Some((antecedent, consequent))
        }
        RuleType::UF2Param => {
            let antecedent = rule.uf_op.build(f.clone(), g.clone());
            let consequent = rule.param_op.build(single_term(e1), single_term(e2));
            Some((antecedent, consequent))
        }
    }
}

/// Collapse a value-only argument expression down to a single term
/// (introducing a synthetic `Variable` placeholder when the expression
/// has more than one term), since `CompareOp::build` operates on terms.
fn single_term(e: &Expression) -> Term {
    match e.terms() {
        [] => Term::constant(0),
        [t] => t.clone(),
        _ => Term::variable(format!("({e})")),
    }
}

fn collect_uf_call_terms(relation: &Relation) -> Vec<&Term> {
    let mut out = Vec::new();
    for c in relation.conjunctions() {
        for e in c.all_constraints() {
            for t in e.terms() {
                if t.is_uf_call() {
                    out.push(t);
                }
            }
        }
    }
    out
}
