//! Simplification driver (C12): the pipeline of §4.11.
//!
//! Orchestrates ingest -> UF domain/range bounding -> rule instantiation
//! -> heuristic constraint removal -> equality/unsat detection via C9 ->
//! affine superset (C10) -> per-slot projection (C11) -> translation back
//! to UFCall syntax.

use crate::conjunction::Conjunction;
use crate::digraph::{DiGraph, EdgeType, Vertex};
use crate::error::CoreResult;
use crate::rules::RuleStore;
use crate::set_relation::Relation;
use crate::solver::IntegerSetSolver;
use crate::term::{Expression, Term, TermKind};
use crate::term_part_ord_graph::TermPartOrdGraph;
use crate::uf_call_map::super_affine_relation;
use crate::uf_env::Environment;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Which tuple-variable slots to keep (never project out).
#[derive(Debug, Clone, Default)]
pub struct Preserve(pub HashSet<usize>);

impl Preserve {
    pub fn new(slots: impl IntoIterator<Item = usize>) -> Self {
        Preserve(slots.into_iter().collect())
    }

    pub fn contains(&self, slot: usize) -> bool {
        self.0.contains(&slot)
    }
}

/// Orchestrates the full simplification pipeline against a session
/// context (`Environment` + `RuleStore`), never a process-wide singleton
/// (§9 design note).
#[instrument(skip(relation, env, rules, solver), fields(max_removals))]
pub fn simplify(
    relation: &Relation,
    preserve: &Preserve,
    max_removals: usize,
    env: &Environment,
    rules: &RuleStore,
    solver: &dyn IntegerSetSolver,
) -> CoreResult<Option<Relation>> {
    // Step 1: detect UNSAT / propagate equalities.
    let mut working = relation.clone();
    for c in working.conjunctions_mut() {
        c.detect_unsat_or_find_equalities();
    }
    if working.is_empty() {
        info!("relation is UNSAT after initial equality propagation");
        return Ok(None);
    }

    // Step 2: seed UF domain/range bounds for every UFCall present.
    add_uf_domain_range_bounds(&mut working, env)?;

    // Step 3: instantiate universally-quantified rules, gated by the
    // solver's entailment check (§4.10) so a rule only fires for pairings
    // whose antecedent actually holds.
    working = rules.apply_with_solver(&working, solver)?;
    for c in working.conjunctions_mut() {
        c.detect_unsat_or_find_equalities();
    }
    if working.is_empty() {
        info!("relation is UNSAT after rule instantiation");
        return Ok(None);
    }

    // Step 4: heuristic constraint removal.
    working = remove_expensive_consts(&working, preserve, max_removals);

    // Step 5: TermPartOrdGraph (C8) / DiGraph (C9) equality and UNSAT
    // discovery.
    working = promote_monotonicity_equalities(&working, env);
    for c in working.conjunctions_mut() {
        c.detect_unsat_or_find_equalities();
    }
    if working.is_empty() {
        info!("relation is UNSAT after equality discovery");
        return Ok(None);
    }

    // Step 6: affine superset.
    let (affine, map) = super_affine_relation(&working);
    debug!(mangled_params = map.len(), "computed affine superset");

    // Step 7: project out every non-preserved slot, innermost to
    // outermost, tie-broken by fewest distinct UFCalls mentioning the
    // slot (computed against the *pre-abstraction* relation).
    let mut order: Vec<usize> = (0..affine.arity()).filter(|k| !preserve.contains(*k)).collect();
    order.sort_by_key(|&k| (std::cmp::Reverse(k), uf_call_mentions(&working, k)));

    let mut projected = affine;
    for k in order {
        match solver.project_out(&projected, k)? {
            Some(p) => projected = p,
            None => {
                debug!(slot = k, "solver could not project exactly; leaving slot in place");
            }
        }
    }

    // Step 8: translate mangled names back to UFCall syntax.
    let restored = restore_uf_calls(&projected, &map);
    Ok(Some(restored))
}

fn add_uf_domain_range_bounds(relation: &mut Relation, env: &Environment) -> CoreResult<()> {
    let calls = collect_uf_calls(relation);
    for call in calls {
        let TermKind::UfCall { name, args, .. } = &call.kind else {
            continue;
        };
        let decl = env.lookup(name)?;
        let domain_bounds = substituted_set_constraints(&decl.domain, args);
        let result_arg = [Expression::value(vec![call.clone().with_coefficient(1)])];
        let range_bounds = substituted_set_constraints(&decl.range, &result_arg);

        for c in relation.conjunctions_mut() {
            if !c.all_constraints().any(|e| e.depends_on(&call)) {
                continue;
            }
            for bound in domain_bounds.iter().chain(range_bounds.iter()) {
                if bound.is_equality() {
                    let _ = c.add_equality(bound.clone());
                } else {
                    let _ = c.add_inequality(bound.clone());
                }
            }
        }
    }
    Ok(())
}

/// Substitute `args[k]` for tuple slot `k` in `set`'s sole conjunction and
/// return the resulting constraints, so a UFCall's argument/result can be
/// bounded by its declared domain/range. `Set` is a disjunction of
/// conjunctions; when more than one disjunct exists there is no sound way
/// to express "one of these holds" as plain added constraints, so the
/// bound is skipped rather than guessed (incomplete, never unsound).
fn substituted_set_constraints(set: &crate::set_relation::Set, args: &[Expression]) -> Vec<Expression> {
    let only = match set.conjunctions() {
        [only] => only,
        [] => return Vec::new(),
        _ => {
            debug!("UF domain/range set has multiple disjuncts; skipping bound seeding");
            return Vec::new();
        }
    };
    let mut out = Vec::with_capacity(only.equalities().len() + only.inequalities().len());
    for eq in only.equalities() {
        let mut e = eq.clone();
        for (k, arg) in args.iter().enumerate() {
            e.substitute(k, arg);
        }
        out.push(e);
    }
    for ineq in only.inequalities() {
        let mut e = ineq.clone();
        for (k, arg) in args.iter().enumerate() {
            e.substitute(k, arg);
        }
        out.push(e);
    }
    out
}

fn collect_uf_calls(relation: &Relation) -> Vec<Term> {
    let mut out = Vec::new();
    for c in relation.conjunctions() {
        for e in c.all_constraints() {
            for t in e.terms() {
                if t.is_uf_call() && !out.contains(t) {
                    out.push(t.clone());
                }
            }
        }
    }
    out
}

fn uf_call_mentions(relation: &Relation, slot: usize) -> usize {
    let needle = Term::tuple_variable(slot);
    let mut count = 0;
    for c in relation.conjunctions() {
        for e in c.all_constraints() {
            for t in e.terms() {
                if t.is_uf_call() && t.contains(&needle) {
                    count += 1;
                }
            }
        }
    }
    count
}

/// Rank constraints mentioning a not-preserved slot by cost (UFCall
/// arguments over a not-preserved slot cost more) and drop up to
/// `max_removals` highest-cost constraints. Sound because dropping
/// constraints only enlarges the relation.
fn remove_expensive_consts(relation: &Relation, preserve: &Preserve, max_removals: usize) -> Relation {
    let mut result = relation.clone();
    for c in result.conjunctions_mut() {
        let mut costed: Vec<(i64, Expression)> = c
            .inequalities()
            .iter()
            .map(|e| (constraint_cost(e, preserve), e.clone()))
            .collect();
        costed.sort_by(|a, b| b.0.cmp(&a.0));
        let to_drop: HashSet<usize> = costed
            .iter()
            .enumerate()
            .filter(|(_, (cost, _))| *cost > 0)
            .take(max_removals)
            .map(|(i, _)| i)
            .collect();
        if to_drop.is_empty() {
            continue;
        }
        let kept: Vec<Expression> = costed
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !to_drop.contains(i))
            .map(|(_, (_, e))| e)
            .collect();
        let mut rebuilt = Conjunction::new(c.tuple_decl().clone(), c.in_arity()).expect("decl already validated");
        for eq in c.equalities() {
            let _ = rebuilt.add_equality(eq.clone());
        }
        for ineq in kept {
            let _ = rebuilt.add_inequality(ineq);
        }
        *c = rebuilt;
    }
    result
}

fn constraint_cost(e: &Expression, preserve: &Preserve) -> i64 {
    let mut cost = 0;
    for t in e.terms() {
        if let TermKind::UfCall { args, .. } = &t.kind {
            for a in args {
                for inner in a.terms() {
                    if let TermKind::TupleVariable(k) = inner.kind {
                        cost += if preserve.contains(k) { 1 } else { 10 };
                    }
                }
            }
        }
    }
    cost
}

/// Build a C9 [`DiGraph`] from the surviving constraints, run closure and
/// `findAddMonotonicity`, then promote any `Equal` edges it discovers
/// back into the working relation's equalities. Also build a C8
/// [`TermPartOrdGraph`] over the bare terms appearing in two-term
/// inequalities, promoting its own discovered equalities and propagating
/// UNSAT.
fn promote_monotonicity_equalities(relation: &Relation, env: &Environment) -> Relation {
    let mut result = relation.clone();
    for c in result.conjunctions_mut() {
        let mut graph = DiGraph::new();
        for ineq in c.inequalities() {
            if let Some((lhs, rhs, strict)) = split_into_vertices(ineq) {
                let edge = if strict { EdgeType::GreaterThan } else { EdgeType::GreaterOrEqual };
                graph.add_edge(lhs, rhs, edge);
            }
        }
        if graph.find_add_monotonicity(env).is_ok() {
            graph.transitive_closure();
            for expr in graph.get_expressions() {
                if expr.is_equality() {
                    let _ = c.add_equality(expr);
                }
            }
        }

        let terms = distinct_ordered_terms(c);
        if terms.len() < 2 {
            continue;
        }
        let Ok(term_graph) = build_term_part_ord_graph(c, &terms) else {
            continue;
        };
        if term_graph.is_unsat() {
            c.force_unsat();
            continue;
        }
        for i in 0..terms.len() {
            for j in (i + 1)..terms.len() {
                if term_graph.is_equal(&terms[i], &terms[j]) {
                    let _ = c.add_equality(Expression::equality(vec![
                        terms[i].clone(),
                        terms[j].clone().with_coefficient(-1),
                    ]));
                }
            }
        }
    }
    result
}

/// Every distinct (by `same_base`) `TupleVariable`/`UfCall` term appearing
/// in `c`'s constraints, in first-seen order.
fn distinct_ordered_terms(c: &Conjunction) -> Vec<Term> {
    let mut terms: Vec<Term> = Vec::new();
    for e in c.all_constraints() {
        for t in e.terms() {
            if matches!(t.kind, TermKind::TupleVariable(_) | TermKind::UfCall { .. })
                && !terms.iter().any(|x| x.same_base(t))
            {
                terms.push(t.clone().with_coefficient(1));
            }
        }
    }
    terms
}

/// Populate a [`TermPartOrdGraph`] with `terms`, then insert every
/// two-term `<=`/`<` fact a constraint directly states.
fn build_term_part_ord_graph(c: &Conjunction, terms: &[Term]) -> CoreResult<TermPartOrdGraph> {
    let mut graph = TermPartOrdGraph::new(terms.len());
    for t in terms {
        graph.insert_term(t)?;
    }
    graph.done_inserting_terms()?;
    for ineq in c.inequalities() {
        if let Some((lo, hi, strict)) = two_term_order(ineq) {
            if strict {
                let _ = graph.insert_lt(&lo, &hi);
            } else {
                let _ = graph.insert_lte(&lo, &hi);
            }
        }
    }
    for eq in c.equalities() {
        if let Some((lo, hi, _)) = two_term_order(eq) {
            let _ = graph.insert_equal(&lo, &hi);
        }
    }
    Ok(graph)
}

/// Recognize `t_hi - t_lo [- 1] (>=|=) 0` and return `(t_lo, t_hi,
/// strict)`. Only matches expressions that reduce to exactly two
/// unit-coefficient non-constant terms plus an optional `-1` constant,
/// i.e. a bare comparison between two terms with no other combination.
fn two_term_order(e: &Expression) -> Option<(Term, Term, bool)> {
    let mut pos = None;
    let mut neg = None;
    let mut const_sum: i64 = 0;
    for t in e.terms() {
        match &t.kind {
            TermKind::Constant(k) => const_sum += k * t.coefficient,
            _ if t.coefficient == 1 && pos.is_none() => pos = Some(t.clone().with_coefficient(1)),
            _ if t.coefficient == -1 && neg.is_none() => neg = Some(t.clone().with_coefficient(1)),
            _ => return None,
        }
    }
    let (hi, lo) = (pos?, neg?);
    match const_sum {
        0 => Some((lo, hi, false)),
        -1 => Some((lo, hi, true)),
        _ => None,
    }
}

/// Split an inequality `Σ t_i >= 0` into `(lhs, rhs, strict)` where
/// `lhs - rhs [- 1] >= 0`, for feeding into the C9 digraph. We treat the
/// whole expression as `lhs` against a zero `rhs` vertex; this is
/// sufficient to let `find_add_monotonicity` see UF-call vertices.
fn split_into_vertices(e: &Expression) -> Option<(Vertex, Vertex, bool)> {
    if e.terms().iter().any(|t| t.is_uf_call()) {
        Some((Vertex::new(e.terms().to_vec()), Vertex::zero(), false))
    } else {
        None
    }
}

/// Inverse of C10: rewrite every mangled `Variable` term whose name is
/// registered in `map` back into the original `UfCall` term.
fn restore_uf_calls(relation: &Relation, map: &crate::uf_call_map::UfCallMap) -> Relation {
    let conjunctions = relation
        .conjunctions()
        .iter()
        .map(|c| {
            let mut rebuilt = Conjunction::new(c.tuple_decl().clone(), c.in_arity()).expect("decl already validated");
            for eq in c.equalities() {
                let _ = rebuilt.add_equality(restore_in_expression(eq, map));
            }
            for ineq in c.inequalities() {
                let _ = rebuilt.add_inequality(restore_in_expression(ineq, map));
            }
            rebuilt
        })
        .collect();
    Relation::new(relation.in_arity(), relation.out_arity(), conjunctions)
        .expect("arities preserved by per-conjunction rebuild")
}

fn restore_in_expression(e: &Expression, map: &crate::uf_call_map::UfCallMap) -> Expression {
    let terms: Vec<Term> = e
        .terms()
        .iter()
        .map(|t| match &t.kind {
            TermKind::Variable(name) => match map.resolve(name) {
                Some(call) => call.clone().with_coefficient(t.coefficient),
                None => t.clone(),
            },
            _ => t.clone(),
        })
        .collect();
    if e.is_equality() {
        Expression::equality(terms)
    } else {
        Expression::inequality(terms)
    }
}
