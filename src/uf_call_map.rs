//! Affine-superset mapping (C10): `superAffineRelation`.
//!
//! Replaces every distinct UF-call expression in a relation with a fresh
//! symbolic variable named by a deterministic mangling rule, producing a
//! purely affine relation an off-the-shelf integer set solver can decide.
//! This is a superset abstraction: it forgets that, e.g., `idx` is
//! bijective, which is why rule instantiation (C6) must run *before* this
//! step (§4.9).

use crate::set_relation::Relation;
use crate::term::{Expression, Term, TermKind};
use std::collections::HashMap;
use tracing::debug;

/// Bidirectional map between UF-call expressions and their mangled
/// variable names.
#[derive(Debug, Clone, Default)]
pub struct UfCallMap {
    call_to_name: Vec<(Term, String)>,
    name_to_call: HashMap<String, Term>,
}

impl UfCallMap {
    pub fn new() -> Self {
        UfCallMap::default()
    }

    /// Deterministic mangling: `(` and `)` both become `_` (the closing
    /// paren's `_` is what gives mangled names their trailing underscore),
    /// `+` -> `P`, `-` -> `M`, `,` -> `_`, spaces dropped.
    /// `idx(ip+1)` -> `idx_ipP1_`, `col(j)` -> `col_j_`.
    pub fn mangle(call: &Term) -> String {
        let rendered = call.to_string();
        let mut out = String::with_capacity(rendered.len());
        for ch in rendered.chars() {
            match ch {
                '(' | ')' | ',' => out.push('_'),
                '+' => out.push('P'),
                '-' => out.push('M'),
                ' ' => {}
                other => out.push(other),
            }
        }
        out
    }

    /// Register `call`, returning its mangled name (idempotent: repeated
    /// structurally-equal calls return the same name).
    pub fn intern(&mut self, call: &Term) -> String {
        if let Some((_, name)) = self.call_to_name.iter().find(|(t, _)| t == call) {
            return name.clone();
        }
        let name = Self::mangle(call);
        self.call_to_name.push((call.clone(), name.clone()));
        self.name_to_call.insert(name.clone(), call.clone());
        name
    }

    pub fn resolve(&self, name: &str) -> Option<&Term> {
        self.name_to_call.get(name)
    }

    pub fn len(&self) -> usize {
        self.call_to_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.call_to_name.is_empty()
    }
}

/// Collect every distinct UFCall term occurring anywhere in `relation`
/// (by full structural equality, including coefficient).
fn collect_distinct_uf_calls(relation: &Relation) -> Vec<Term> {
    let mut out: Vec<Term> = Vec::new();
    for c in relation.conjunctions() {
        for e in c.all_constraints() {
            collect_from_expression(e, &mut out);
        }
    }
    out
}

fn collect_from_expression(e: &Expression, out: &mut Vec<Term>) {
    for t in e.terms() {
        collect_from_term(t, out);
    }
}

fn collect_from_term(t: &Term, out: &mut Vec<Term>) {
    if t.is_uf_call() {
        let unit = t.clone().with_coefficient(1);
        if !out.contains(&unit) {
            out.push(unit);
        }
    }
    match &t.kind {
        TermKind::UfCall { args, .. } => {
            for a in args {
                collect_from_expression(a, out);
            }
        }
        TermKind::TupleExp(components) => {
            for c in components {
                collect_from_expression(c, out);
            }
        }
        _ => {}
    }
}

fn replace_uf_calls_in_term(t: &Term, map: &mut UfCallMap) -> Term {
    if t.is_uf_call() {
        let unit = t.clone().with_coefficient(1);
        let name = map.intern(&unit);
        return Term::variable(name).with_coefficient(t.coefficient);
    }
    let kind = match &t.kind {
        TermKind::TupleExp(components) => TermKind::TupleExp(
            components
                .iter()
                .map(|c| replace_uf_calls_in_expression(c, map))
                .collect(),
        ),
        other => other.clone(),
    };
    Term {
        kind,
        coefficient: t.coefficient,
    }
}

fn replace_uf_calls_in_expression(e: &Expression, map: &mut UfCallMap) -> Expression {
    let terms: Vec<Term> = e.terms().iter().map(|t| replace_uf_calls_in_term(t, map)).collect();
    if e.is_equality() {
        Expression::equality(terms)
    } else if e.is_inequality() {
        Expression::inequality(terms)
    } else {
        Expression::value(terms)
    }
}

/// Step 1-4 of §4.9: collect distinct UF calls, mangle each to a fresh
/// name, substitute throughout, and return the purely affine relation
/// plus the map needed to translate back.
pub fn super_affine_relation(relation: &Relation) -> (Relation, UfCallMap) {
    let mut map = UfCallMap::new();
    for call in collect_distinct_uf_calls(relation) {
        map.intern(&call);
    }
    debug!(distinct_calls = map.len(), "computed affine superset mapping");

    let conjunctions = relation
        .conjunctions()
        .iter()
        .map(|c| {
            let mut rebuilt = crate::conjunction::Conjunction::new(c.tuple_decl().clone(), c.in_arity())
                .expect("tuple decl/in_arity already validated on the source conjunction");
            for eq in c.equalities() {
                let _ = rebuilt.add_equality(replace_uf_calls_in_expression(eq, &mut map));
            }
            for ineq in c.inequalities() {
                let _ = rebuilt.add_inequality(replace_uf_calls_in_expression(ineq, &mut map));
            }
            rebuilt
        })
        .collect();

    let affine = Relation::new(relation.in_arity(), relation.out_arity(), conjunctions)
        .expect("arities preserved by per-conjunction rebuild");
    (affine, map)
}
