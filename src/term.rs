//! Term / Expression algebra (C1).
//!
//! A [`Term`] is one addend of a linear [`Expression`]: a constant, a free
//! [`Variable`](TermKind::Variable), a reference into the ambient tuple
//! ([`TupleVariable`](TermKind::TupleVariable)), a call to an uninterpreted
//! function ([`UfCall`](TermKind::UfCall)), or a tuple of sub-expressions
//! ([`TupleExp`](TermKind::TupleExp)) used only as the argument of a
//! Compose-style operation. Every term carries an integer coefficient
//! (default 1); coefficients participate in arithmetic but not in the
//! identity used to combine like terms or to hash terms into the
//! partial-ordering graphs (C7/C8).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The variant-specific payload of a [`Term`]. Declared in the canonical
/// print/sort order required by §4.1: constants, then variables
/// (alphabetic), then tuple variables (by slot), then UF calls (by name,
/// then recursively by argument expressions), then tuple expressions.
/// Deriving `Ord` on this enum therefore gives the canonical ordering for
/// free, since Rust orders enum variants by declaration order and then by
/// field order within a variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermKind {
    Constant(i64),
    Variable(String),
    TupleVariable(usize),
    UfCall {
        name: String,
        args: Vec<Expression>,
        /// Component selector `[i]` when the UF's range is itself a tuple.
        selector: Option<usize>,
    },
    TupleExp(Vec<Expression>),
}

/// A single addend of an [`Expression`].
#[derive(Debug, Clone)]
pub struct Term {
    pub kind: TermKind,
    pub coefficient: i64,
}

impl Term {
    pub fn constant(c: i64) -> Self {
        Term {
            kind: TermKind::Constant(c),
            coefficient: 1,
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Term {
            kind: TermKind::Variable(name.into()),
            coefficient: 1,
        }
    }

    pub fn tuple_variable(slot: usize) -> Self {
        Term {
            kind: TermKind::TupleVariable(slot),
            coefficient: 1,
        }
    }

    pub fn uf_call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Term {
            kind: TermKind::UfCall {
                name: name.into(),
                args,
                selector: None,
            },
            coefficient: 1,
        }
    }

    pub fn uf_call_selected(name: impl Into<String>, args: Vec<Expression>, selector: usize) -> Self {
        Term {
            kind: TermKind::UfCall {
                name: name.into(),
                args,
                selector: Some(selector),
            },
            coefficient: 1,
        }
    }

    pub fn tuple_exp(components: Vec<Expression>) -> Self {
        Term {
            kind: TermKind::TupleExp(components),
            coefficient: 1,
        }
    }

    #[must_use]
    pub fn with_coefficient(mut self, c: i64) -> Self {
        self.coefficient = c;
        self
    }

    fn scaled_by(mut self, k: i64) -> Self {
        self.coefficient *= k;
        self
    }

    /// Structural equality ignoring coefficient: the identity used to
    /// combine like terms during normalization and to hash terms into
    /// [`crate::term_part_ord_graph::TermPartOrdGraph`].
    pub fn same_base(&self, other: &Term) -> bool {
        self.kind == other.kind
    }

    pub fn is_uf_call(&self) -> bool {
        matches!(self.kind, TermKind::UfCall { .. })
    }

    pub fn uf_name(&self) -> Option<&str> {
        match &self.kind {
            TermKind::UfCall { name, .. } => Some(name),
            _ => None,
        }
    }

    /// True iff this term (and every term nested under it) contains no
    /// UF calls.
    pub fn is_affine(&self) -> bool {
        match &self.kind {
            TermKind::Constant(_) | TermKind::Variable(_) | TermKind::TupleVariable(_) => true,
            TermKind::UfCall { .. } => false,
            TermKind::TupleExp(components) => components.iter().all(Expression::is_affine),
        }
    }

    /// True iff `needle` occurs (ignoring coefficient) inside this term,
    /// recursing into UFCall arguments and tuple components.
    pub fn contains(&self, needle: &Term) -> bool {
        if self.same_base(needle) {
            return true;
        }
        match &self.kind {
            TermKind::UfCall { args, .. } => args.iter().any(|e| e.depends_on(needle)),
            TermKind::TupleExp(components) => components.iter().any(|e| e.depends_on(needle)),
            _ => false,
        }
    }

    /// Rewrite every `TupleVariable(slot)` occurrence (including nested
    /// inside UFCall arguments / tuple components) by splicing in
    /// `replacement`'s terms, scaled by this term's coefficient. Returns the
    /// list of terms this term expands to (a single term, unless this *is*
    /// the substituted slot, in which case it expands to `replacement`'s
    /// terms).
    pub(crate) fn substitute_tuple_slot(&self, slot: usize, replacement: &Expression) -> Vec<Term> {
        match &self.kind {
            TermKind::TupleVariable(k) if *k == slot => replacement
                .terms
                .iter()
                .cloned()
                .map(|t| t.scaled_by(self.coefficient))
                .collect(),
            TermKind::UfCall {
                name,
                args,
                selector,
            } => {
                let new_args = args
                    .iter()
                    .map(|a| a.substituted(slot, replacement))
                    .collect();
                vec![Term {
                    kind: TermKind::UfCall {
                        name: name.clone(),
                        args: new_args,
                        selector: *selector,
                    },
                    coefficient: self.coefficient,
                }]
            }
            TermKind::TupleExp(components) => {
                let new_components = components
                    .iter()
                    .map(|c| c.substituted(slot, replacement))
                    .collect();
                vec![Term {
                    kind: TermKind::TupleExp(new_components),
                    coefficient: self.coefficient,
                }]
            }
            _ => vec![self.clone()],
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.coefficient == other.coefficient
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.coefficient.hash(state);
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind.cmp(&other.kind).then(self.coefficient.cmp(&other.coefficient))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let coeff = self.coefficient;
        match &self.kind {
            TermKind::Constant(c) => write!(f, "{}", c * coeff),
            TermKind::Variable(name) => {
                if coeff == 1 {
                    write!(f, "{name}")
                } else {
                    write!(f, "{coeff}*{name}")
                }
            }
            TermKind::TupleVariable(k) => {
                if coeff == 1 {
                    write!(f, "t{k}")
                } else {
                    write!(f, "{coeff}*t{k}")
                }
            }
            TermKind::UfCall {
                name,
                args,
                selector,
            } => {
                let args_str = args
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                if coeff != 1 {
                    write!(f, "{coeff}*")?;
                }
                write!(f, "{name}({args_str})")?;
                if let Some(i) = selector {
                    write!(f, "[{i}]")?;
                }
                Ok(())
            }
            TermKind::TupleExp(components) => {
                let s = components
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "<{s}>")
            }
        }
    }
}

/// Whether an [`Expression`] denotes a constraint `Σ terms = 0`
/// (`Equality`) or `Σ terms ≥ 0` (`Inequality`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExprKind {
    Equality,
    Inequality,
}

/// An ordered multiset of [`Term`]s, kept in normalized canonical form:
/// like terms combined, zero-coefficient terms dropped, sorted into the
/// canonical order of §4.1. Normalization is idempotent.
///
/// `kind` is `Some` when this expression is a top-level constraint
/// (`Equality`/`Inequality`) and `None` when the expression is used purely
/// as a *value* -- the argument of a UF call or a component of a
/// [`TermKind::TupleExp`]. The specification describes every Expression as
/// carrying the Equality/Inequality flag; this crate narrows that to
/// `Option<ExprKind>` because argument/component expressions are not
/// themselves constraints (this resolves an ambiguity the source spec
/// leaves implicit -- see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Expression {
    terms: Vec<Term>,
    kind: Option<ExprKind>,
}

impl Expression {
    pub fn equality(terms: Vec<Term>) -> Self {
        Self::build(terms, Some(ExprKind::Equality))
    }

    pub fn inequality(terms: Vec<Term>) -> Self {
        Self::build(terms, Some(ExprKind::Inequality))
    }

    /// An expression used purely as a value (UF-call argument or tuple
    /// component), carrying no Equality/Inequality flag.
    pub fn value(terms: Vec<Term>) -> Self {
        Self::build(terms, None)
    }

    fn build(terms: Vec<Term>, kind: Option<ExprKind>) -> Self {
        let mut e = Expression { terms, kind };
        e.normalize();
        e
    }

    pub fn kind(&self) -> Option<ExprKind> {
        self.kind
    }

    pub fn is_equality(&self) -> bool {
        matches!(self.kind, Some(ExprKind::Equality))
    }

    pub fn is_inequality(&self) -> bool {
        matches!(self.kind, Some(ExprKind::Inequality))
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn add(&mut self, term: Term) {
        self.terms.push(term);
        self.normalize();
    }

    pub fn add_expression(&mut self, other: &Expression) {
        self.terms.extend(other.terms.iter().cloned());
        self.normalize();
    }

    pub fn multiply_by(&mut self, k: i64) {
        if k == 0 {
            self.terms.clear();
            return;
        }
        for t in &mut self.terms {
            t.coefficient *= k;
        }
        self.normalize();
    }

    #[must_use]
    pub fn negated(&self) -> Expression {
        let mut e = self.clone();
        e.multiply_by(-1);
        e
    }

    /// Structural substitution over all tuple-variable terms at `slot`,
    /// renormalized afterwards.
    pub fn substitute(&mut self, slot: usize, replacement: &Expression) {
        let new_terms = self
            .terms
            .iter()
            .flat_map(|t| t.substitute_tuple_slot(slot, replacement))
            .collect();
        self.terms = new_terms;
        self.normalize();
    }

    #[must_use]
    pub(crate) fn substituted(&self, slot: usize, replacement: &Expression) -> Expression {
        let mut clone = self.clone();
        clone.substitute(slot, replacement);
        clone
    }

    /// True iff no UFCall term appears anywhere in this expression.
    pub fn is_affine(&self) -> bool {
        self.terms.iter().all(Term::is_affine)
    }

    /// True iff any term is structurally equal (ignoring coefficient) to
    /// `needle`, or recursively contains it.
    pub fn depends_on(&self, needle: &Term) -> bool {
        self.terms.iter().any(|t| t.contains(needle))
    }

    /// If this expression reduces to a bare integer constant (including
    /// the empty expression, which is 0), return its value.
    pub fn constant_value(&self) -> Option<i64> {
        match self.terms.as_slice() {
            [] => Some(0),
            [t] => match t.kind {
                TermKind::Constant(c) => Some(c * t.coefficient),
                _ => None,
            },
            _ => None,
        }
    }

    /// Combine like terms (special-casing Constant, whose *value* rather
    /// than payload is the combining key), drop zero-coefficient terms,
    /// and sort into canonical order.
    fn normalize(&mut self) {
        let mut constant_total: i64 = 0;
        let mut combined: Vec<Term> = Vec::with_capacity(self.terms.len());
        for t in self.terms.drain(..) {
            if let TermKind::Constant(c) = t.kind {
                constant_total += c * t.coefficient;
                continue;
            }
            if let Some(existing) = combined.iter_mut().find(|e: &&mut Term| e.same_base(&t)) {
                existing.coefficient += t.coefficient;
            } else {
                combined.push(t);
            }
        }
        combined.retain(|t| t.coefficient != 0);
        combined.sort();
        if constant_total != 0 {
            combined.insert(0, Term::constant(constant_total));
        }
        self.terms = combined;
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            write!(f, "0")?;
        } else {
            for (i, t) in self.terms.iter().enumerate() {
                if i > 0 {
                    write!(f, " + ")?;
                }
                write!(f, "{t}")?;
            }
        }
        match self.kind {
            Some(ExprKind::Equality) => write!(f, " = 0"),
            Some(ExprKind::Inequality) => write!(f, " >= 0"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_combines_like_terms_and_constants() {
        let e = Expression::equality(vec![
            Term::variable("n"),
            Term::variable("n"),
            Term::constant(3),
            Term::constant(-3),
        ]);
        assert_eq!(e.terms().len(), 1);
        assert_eq!(e.terms()[0], Term::variable("n").with_coefficient(2));
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut e = Expression::inequality(vec![Term::variable("i"), Term::constant(5)]);
        let once = e.clone();
        e.normalize();
        assert_eq!(e, once);
    }

    #[test]
    fn multiply_by_zero_empties_expression() {
        let mut e = Expression::inequality(vec![Term::variable("i"), Term::constant(1)]);
        e.multiply_by(0);
        assert!(e.terms().is_empty());
    }

    #[test]
    fn canonical_order_constants_then_vars_then_tuplevars_then_ufcalls() {
        let e = Expression::equality(vec![
            Term::uf_call("idx", vec![Expression::value(vec![Term::variable("i")])]),
            Term::tuple_variable(0),
            Term::variable("n"),
            Term::constant(7),
        ]);
        let kinds: Vec<_> = e.terms().iter().map(|t| &t.kind).collect();
        assert!(matches!(kinds[0], TermKind::Constant(7)));
        assert!(matches!(kinds[1], TermKind::Variable(_)));
        assert!(matches!(kinds[2], TermKind::TupleVariable(0)));
        assert!(matches!(kinds[3], TermKind::UfCall { .. }));
    }

    #[test]
    fn substitute_replaces_tuple_variable_and_renormalizes() {
        let mut e = Expression::inequality(vec![Term::tuple_variable(0), Term::constant(-1)]);
        let replacement = Expression::value(vec![Term::variable("n"), Term::constant(2)]);
        e.substitute(0, &replacement);
        assert_eq!(
            e,
            Expression::inequality(vec![Term::variable("n"), Term::constant(1)])
        );
    }

    #[test]
    fn substitute_recurses_into_uf_call_arguments() {
        let arg = Expression::value(vec![Term::tuple_variable(0)]);
        let mut e = Expression::equality(vec![Term::uf_call("idx", vec![arg])]);
        let replacement = Expression::value(vec![Term::variable("i"), Term::constant(1)]);
        e.substitute(0, &replacement);
        let expected_arg = Expression::value(vec![Term::variable("i"), Term::constant(1)]);
        assert_eq!(e, Expression::equality(vec![Term::uf_call("idx", vec![expected_arg])]));
    }

    #[test]
    fn is_affine_false_when_uf_call_present() {
        let affine = Expression::inequality(vec![Term::variable("i")]);
        assert!(affine.is_affine());

        let with_uf = Expression::inequality(vec![Term::uf_call(
            "idx",
            vec![Expression::value(vec![Term::variable("i")])],
        )]);
        assert!(!with_uf.is_affine());
    }

    #[test]
    fn depends_on_ignores_coefficient() {
        let e = Expression::inequality(vec![Term::variable("i").with_coefficient(3)]);
        assert!(e.depends_on(&Term::variable("i")));
        assert!(!e.depends_on(&Term::variable("j")));
    }
}
