//! Transitive-closure digraph over Expression-valued vertices (C9).
//!
//! Unlike [`crate::part_ord_graph::PartOrdGraph`] (dense ids) or
//! [`crate::term_part_ord_graph::TermPartOrdGraph`] (single terms), a
//! [`DiGraph`] vertex is a whole linear combination of terms (a
//! [`Vertex`]), and edges carry one of four relations with the precedence
//! order `GreaterThan > GreaterOrEqual > Equal > None`.

use crate::error::CoreResult;
use crate::term::{Expression, Term, TermKind};
use crate::uf_env::{Environment, Monotonicity};
use std::fmt;

/// Precedence-ordered: `GreaterThan < GreaterOrEqual < Equal < None` so
/// that `min` picks the strongest relation, matching the source's
/// `edgeOp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EdgeType {
    GreaterThan,
    GreaterOrEqual,
    Equal,
    None,
}

/// A graph vertex: a bare linear combination of terms, with no
/// Equality/Inequality flag (the flag lives on the edge, not the vertex).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    terms: Vec<Term>,
}

impl Vertex {
    pub fn new(terms: Vec<Term>) -> Self {
        Vertex { terms }
    }

    pub fn zero() -> Self {
        Vertex { terms: Vec::new() }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// The constant term present in this vertex, if any.
    pub fn constant_term(&self) -> Option<&Term> {
        self.terms.iter().find(|t| matches!(t.kind, TermKind::Constant(_)))
    }

    pub fn delete_term(&mut self, t: &Term) {
        if let Some(pos) = self.terms.iter().position(|x| x == t) {
            self.terms.remove(pos);
        }
    }

    pub fn add_term(&mut self, t: Term) {
        self.terms.push(t);
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        for (i, t) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{t}")?;
        }
        Ok(())
    }
}

/// Directed graph over [`Vertex`]es with [`EdgeType`]-labeled edges.
#[derive(Debug, Clone, Default)]
pub struct DiGraph {
    vertices: Vec<Vertex>,
    adj: Vec<Vec<EdgeType>>,
}

impl DiGraph {
    pub fn new() -> Self {
        DiGraph::default()
    }

    fn position_of(&self, v: &Vertex) -> Option<usize> {
        self.vertices.iter().position(|x| x == v)
    }

    fn ensure_vertex(&mut self, v: Vertex) -> usize {
        if let Some(pos) = self.position_of(&v) {
            return pos;
        }
        let n = self.vertices.len() + 1;
        self.vertices.push(v);
        self.adjust_matrix(n);
        n - 1
    }

    fn adjust_matrix(&mut self, n: usize) {
        for row in &mut self.adj {
            row.resize(n, EdgeType::None);
        }
        while self.adj.len() < n {
            self.adj.push(vec![EdgeType::None; n]);
        }
    }

    pub fn add_edge(&mut self, u: Vertex, v: Vertex, e: EdgeType) {
        let u_pos = self.ensure_vertex(u);
        let v_pos = self.ensure_vertex(v);
        self.adj[u_pos][v_pos] = e;
    }

    /// Strongest-wins combinator: `GreaterThan` beats `GreaterOrEqual`
    /// beats `Equal` beats `None`.
    fn edge_op(e1: EdgeType, e2: EdgeType) -> EdgeType {
        if e1 < e2 {
            e1
        } else {
            e2
        }
    }

    /// Floyd-Warshall transitive closure.
    pub fn transitive_closure(&mut self) {
        let n = self.adj.len();
        for k in 0..n {
            for i in 0..n {
                for j in 0..n {
                    if self.adj[i][k] != EdgeType::None && self.adj[k][j] != EdgeType::None {
                        let via_k = Self::edge_op(self.adj[i][k], self.adj[k][j]);
                        self.adj[i][j] = Self::edge_op(self.adj[i][j], via_k);
                    }
                }
            }
        }
    }

    /// Merge vertex `v` into `u`: outgoing/incoming edges combine via
    /// `edge_op`, `v`'s column/row are deleted, and `alias_map[v]` is set
    /// to `u` with all indices after `v` shifted down by one.
    pub fn merge_vertices(&mut self, alias_map: &mut [usize], u: usize, v: usize) {
        self.adj[u][v] = EdgeType::None;
        self.adj[v][u] = EdgeType::None;

        for i in 0..self.adj[v].len() {
            self.adj[u][i] = Self::edge_op(self.adj[u][i], self.adj[v][i]);
            self.adj[i][u] = Self::edge_op(self.adj[i][u], self.adj[i][v]);
        }

        for row in &mut self.adj {
            row.remove(v);
        }
        self.adj.remove(v);
        self.vertices.remove(v);

        for slot in alias_map.iter_mut().skip(v + 1) {
            *slot -= 1;
        }
        alias_map[v] = u;
    }

    /// Tighten `GreaterOrEqual` edges whose target vertex is a bare
    /// constant `c`: `u >= c` becomes `u > c - 1`, merging any vertices
    /// that become syntactically identical as a result.
    pub fn simplify_greater_or_equal(&mut self) {
        let n = self.adj.len();
        let mut possible_merge = Vec::new();
        for i in 0..n {
            for j in 0..self.adj[i].len() {
                if self.adj[i][j] != EdgeType::GreaterOrEqual {
                    continue;
                }
                let Some(c) = self.vertices[j].constant_term().cloned() else {
                    continue;
                };
                self.adj[i][j] = EdgeType::GreaterThan;
                let new_coeff = c.coefficient - 1;
                if new_coeff == 0 {
                    self.vertices[j].delete_term(&c);
                }
                possible_merge.push(j);
            }
        }

        let mut alias_map: Vec<usize> = (0..self.vertices.len()).collect();
        for vertex in possible_merge {
            let length = self.vertices.len();
            for i in 0..length {
                let alias_vertex = alias_map[vertex];
                if i != alias_vertex && self.vertices.get(i) == self.vertices.get(alias_vertex) {
                    self.merge_vertices(&mut alias_map, i, alias_vertex);
                    break;
                }
            }
        }
    }

    /// Reconstruct every non-`None` edge as a constraint `Expression`:
    /// `u R v` becomes `lhs - rhs (R') 0`, tightening `GreaterThan` to
    /// `GreaterOrEqual` with a `-1` constant folded in.
    pub fn get_expressions(&self) -> Vec<Expression> {
        let mut res = Vec::new();
        for (i, row) in self.adj.iter().enumerate() {
            for (j, &edge) in row.iter().enumerate() {
                if edge == EdgeType::None {
                    continue;
                }
                let mut terms: Vec<Term> = self.vertices[j]
                    .terms()
                    .iter()
                    .map(|t| t.clone().with_coefficient(-t.coefficient))
                    .collect();
                terms.extend(self.vertices[i].terms().iter().cloned());

                let expr = match edge {
                    EdgeType::GreaterOrEqual => Expression::inequality(terms),
                    EdgeType::Equal => Expression::equality(terms),
                    EdgeType::GreaterThan => {
                        terms.push(Term::constant(-1));
                        Expression::inequality(terms)
                    }
                    EdgeType::None => unreachable!(),
                };
                res.push(expr);
            }
        }
        res
    }

    /// Look for vertex pairs matching the monotonicity shape
    /// `rowptr(i+1) >= col(i,j) > rowptr(i)` / `col(i+1,j) > col(i,j)`:
    /// two UF-call vertices over the same function whose only syntactic
    /// difference is one argument shifted by a constant offset. Only adds
    /// an edge when `env` declares that UF `Nondecreasing` or
    /// `Increasing` -- an undeclared or `Monotonicity::None` function gets
    /// no ordering from argument shape alone. When found, propagate a
    /// `GreaterThan`/`GreaterOrEqual` edge between the shifted and
    /// unshifted calls so the closure below captures the ordering implied
    /// by monotonicity, rather than requiring the user to state it as an
    /// explicit rule.
    pub fn find_add_monotonicity(&mut self, env: &Environment) -> CoreResult<()> {
        let n = self.vertices.len();
        let mut new_edges = Vec::new();
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let Some((name, offset)) = shifted_uf_call_offset(&self.vertices[i], &self.vertices[j]) else {
                    continue;
                };
                if offset <= 0 {
                    continue;
                }
                let Ok(decl) = env.lookup(&name) else {
                    continue;
                };
                let edge = match decl.monotonicity {
                    Monotonicity::Increasing => Some(EdgeType::GreaterThan),
                    Monotonicity::Nondecreasing => Some(EdgeType::GreaterOrEqual),
                    Monotonicity::None => None,
                };
                if let Some(edge) = edge {
                    new_edges.push((i, j, edge));
                }
            }
        }
        for (i, j, e) in new_edges {
            self.adj[i][j] = Self::edge_op(self.adj[i][j], e);
        }
        self.transitive_closure();
        Ok(())
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }
}

/// If `a` and `b` are each a single UFCall term over the same name, whose
/// argument lists differ in exactly one argument by a constant additive
/// offset (e.g. `col(i+1, j)` vs `col(i, j)`), return that function's name
/// and the offset (positive when `a`'s shifted argument is larger).
fn shifted_uf_call_offset(a: &Vertex, b: &Vertex) -> Option<(String, i64)> {
    let (ta, tb) = match (a.terms(), b.terms()) {
        ([ta], [tb]) => (ta, tb),
        _ => return None,
    };
    let (TermKind::UfCall { name: na, args: aa, .. }, TermKind::UfCall { name: nb, args: ab, .. }) =
        (&ta.kind, &tb.kind)
    else {
        return None;
    };
    if na != nb || aa.len() != ab.len() {
        return None;
    }
    let mut offset = None;
    for (xa, xb) in aa.iter().zip(ab.iter()) {
        if xa == xb {
            continue;
        }
        let diff = xa.clone();
        let mut d = diff;
        d.add_expression(&xb.negated());
        match d.constant_value() {
            Some(c) if offset.is_none() => offset = Some(c),
            _ => return None,
        }
    }
    offset.map(|o| (na.clone(), o))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Expression;

    fn v(terms: Vec<Term>) -> Vertex {
        Vertex::new(terms)
    }

    #[test]
    fn edge_op_picks_strongest_relation() {
        assert_eq!(
            DiGraph::edge_op(EdgeType::GreaterThan, EdgeType::Equal),
            EdgeType::GreaterThan
        );
        assert_eq!(
            DiGraph::edge_op(EdgeType::None, EdgeType::Equal),
            EdgeType::Equal
        );
    }

    #[test]
    fn transitive_closure_chains_greater_than() {
        let mut g = DiGraph::new();
        let a = v(vec![Term::variable("a")]);
        let b = v(vec![Term::variable("b")]);
        let c = v(vec![Term::variable("c")]);
        g.add_edge(a.clone(), b.clone(), EdgeType::GreaterThan);
        g.add_edge(b, c.clone(), EdgeType::GreaterOrEqual);
        g.transitive_closure();
        let expressions = g.get_expressions();
        assert!(!expressions.is_empty());
    }

    #[test]
    fn simplify_greater_or_equal_tightens_constant_target() {
        let mut g = DiGraph::new();
        let a = v(vec![Term::variable("a")]);
        let one = v(vec![Term::constant(1)]);
        g.add_edge(a, one, EdgeType::GreaterOrEqual);
        g.simplify_greater_or_equal();
        assert_eq!(g.adj[0][1], EdgeType::GreaterThan);
    }

    #[test]
    fn get_expressions_reconstructs_greater_than_as_inequality_minus_one() {
        let mut g = DiGraph::new();
        let a = v(vec![Term::variable("a")]);
        let z = Vertex::zero();
        g.add_edge(a, z, EdgeType::GreaterThan);
        let exprs = g.get_expressions();
        assert_eq!(exprs.len(), 1);
        assert!(exprs[0].is_inequality());
        assert!(exprs[0].depends_on(&Term::constant(1)) || exprs[0].constant_value().is_none());
    }

    fn nonneg_set() -> crate::set_relation::Set {
        use crate::conjunction::Conjunction;
        use crate::tuple_decl::TupleDecl;
        let decl = TupleDecl::names(["x"]);
        let c = Conjunction::new(decl, 1).unwrap();
        crate::set_relation::Set::new(1, vec![c]).unwrap()
    }

    #[test]
    fn monotonicity_detects_shifted_uf_call_argument_when_declared_nondecreasing() {
        let mut g = DiGraph::new();
        let call_i = v(vec![Term::uf_call(
            "col",
            vec![Expression::value(vec![Term::variable("i")])],
        )]);
        let call_i1 = v(vec![Term::uf_call(
            "col",
            vec![Expression::value(vec![Term::variable("i"), Term::constant(1)])],
        )]);
        g.add_edge(call_i.clone(), call_i1.clone(), EdgeType::None);

        let mut env = Environment::new();
        env.append("col", nonneg_set(), nonneg_set(), false, Monotonicity::Nondecreasing)
            .unwrap();
        g.find_add_monotonicity(&env).unwrap();
        let i1_pos = g.position_of(&call_i1).unwrap();
        let i_pos = g.position_of(&call_i).unwrap();
        assert_eq!(g.adj[i1_pos][i_pos], EdgeType::GreaterOrEqual);
    }

    #[test]
    fn monotonicity_ignores_undeclared_uf() {
        let mut g = DiGraph::new();
        let call_i = v(vec![Term::uf_call(
            "col",
            vec![Expression::value(vec![Term::variable("i")])],
        )]);
        let call_i1 = v(vec![Term::uf_call(
            "col",
            vec![Expression::value(vec![Term::variable("i"), Term::constant(1)])],
        )]);
        g.add_edge(call_i.clone(), call_i1.clone(), EdgeType::None);

        let env = Environment::new();
        g.find_add_monotonicity(&env).unwrap();
        let i1_pos = g.position_of(&call_i1).unwrap();
        let i_pos = g.position_of(&call_i).unwrap();
        assert_eq!(g.adj[i1_pos][i_pos], EdgeType::None);
    }
}
