//! Partial ordering over dense integer vertex ids (C7).
//!
//! A dense adjacency-matrix graph recording, for every pair of vertices,
//! one of `NoOrd`, `NonStrict` (`<=`), `Strict` (`<`), or `Equal`. Full
//! transitive closure is maintained as an invariant after every update.

use crate::error::{CoreError, CoreResult};
use std::fmt;

/// The ordering known to hold between two vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    NoOrd,
    NonStrict,
    Strict,
    Equal,
}

/// Dense partial-ordering graph over vertex ids `0..numItems()`, capped at
/// `maxN` (see `SimplifierConfig::default_max_vertices`).
#[derive(Debug, Clone)]
pub struct PartOrdGraph {
    cur_n: usize,
    max_n: usize,
    matrix: Vec<Order>,
    unsat: bool,
}

impl PartOrdGraph {
    pub fn new(max_n: usize) -> Self {
        let mut matrix = vec![Order::NoOrd; max_n * max_n];
        for i in 0..max_n {
            matrix[i * max_n + i] = Order::Equal;
        }
        PartOrdGraph {
            cur_n: 0,
            max_n,
            matrix,
            unsat: false,
        }
    }

    pub fn num_items(&self) -> usize {
        self.cur_n
    }

    pub fn num_max_items(&self) -> usize {
        self.max_n
    }

    pub fn is_unsat(&self) -> bool {
        self.unsat
    }

    /// Grow the tracked vertex count, asserting capacity is not exceeded.
    pub fn update_num_items(&mut self, delta: usize) -> CoreResult<()> {
        if self.cur_n + delta > self.max_n {
            return Err(CoreError::InvariantViolation(format!(
                "PartOrdGraph: exceeding max capacity {} with {} + {}",
                self.max_n, self.cur_n, delta
            )));
        }
        self.cur_n += delta;
        Ok(())
    }

    fn index(&self, a: usize, b: usize) -> usize {
        a * self.max_n + b
    }

    pub fn strict(&mut self, a: usize, b: usize) -> CoreResult<()> {
        self.update_pair(a, b, Order::Strict)
    }

    pub fn non_strict(&mut self, a: usize, b: usize) -> CoreResult<()> {
        self.update_pair(a, b, Order::NonStrict)
    }

    pub fn equal(&mut self, a: usize, b: usize) -> CoreResult<()> {
        self.update_pair(a, b, Order::Equal)
    }

    pub fn is_strict(&self, a: usize, b: usize) -> bool {
        self.matrix[self.index(a, b)] == Order::Strict
    }

    pub fn is_non_strict(&self, a: usize, b: usize) -> bool {
        self.matrix[self.index(a, b)] == Order::NonStrict
    }

    pub fn is_equal(&self, a: usize, b: usize) -> bool {
        self.matrix[self.index(a, b)] == Order::Equal
    }

    pub fn is_no_order(&self, a: usize, b: usize) -> bool {
        self.matrix[self.index(a, b)] == Order::NoOrd
    }

    /// Assigning new relationship `from -> to`.
    ///   NoOrd can be overwritten by anything; anything updated with NoOrd
    ///   holds; NonStrict updates to anything else; Strict stays Strict
    ///   with NonStrict but conflicts with Equal; Equal stays Equal with
    ///   NonStrict but conflicts with Strict; anything updates to itself.
    fn update(from: Order, to: Order) -> Option<Order> {
        match (from, to) {
            (Order::NoOrd, _) => Some(to),
            (_, Order::NoOrd) => Some(from),
            (Order::NonStrict, _) => Some(to),
            (Order::Strict, Order::NonStrict) => Some(Order::Strict),
            (Order::Equal, Order::NonStrict) => Some(Order::Equal),
            (a, b) if a == b => Some(a),
            _ => None,
        }
    }

    /// Commutative combination of two orders along a transitive path.
    ///   NoOrd meet X is NoOrd; < meet <= is <; < meet = is <; <= meet = is
    ///   <=; X meet X is X.
    fn meet(op1: Order, op2: Order) -> Option<Order> {
        match (op1, op2) {
            (Order::NoOrd, _) | (_, Order::NoOrd) => Some(Order::NoOrd),
            (Order::Equal, other) => Some(other),
            (other, Order::Equal) => Some(other),
            (Order::Strict, _) | (_, Order::Strict) => Some(Order::Strict),
            (a, b) if a == b => Some(a),
            _ => None,
        }
    }

    fn update_pair(&mut self, a: usize, b: usize, to: Order) -> CoreResult<()> {
        if a >= self.max_n || b >= self.max_n {
            return Err(CoreError::InvariantViolation(format!(
                "PartOrdGraph: vertex {a} or {b} exceeds max capacity {}",
                self.max_n
            )));
        }
        if a + 1 > self.cur_n {
            self.cur_n = a + 1;
        }
        if b + 1 > self.cur_n {
            self.cur_n = b + 1;
        }

        if to == Order::Strict && !self.is_no_order(b, a) {
            self.unsat = true;
            return Ok(());
        }
        if to != Order::Equal && a == b {
            self.unsat = true;
            return Ok(());
        }

        let idx = self.index(a, b);
        match Self::update(self.matrix[idx], to) {
            Some(o) => self.matrix[idx] = o,
            None => {
                self.unsat = true;
                return Ok(());
            }
        }

        self.transitive_closure();
        Ok(())
    }

    /// Floyd-Warshall-style transitive closure, folding `<=` pairs that
    /// hold in both directions into `Equal`.
    fn transitive_closure(&mut self) {
        for k in 0..self.cur_n {
            for i in 0..self.cur_n {
                for j in 0..self.cur_n {
                    let ik = self.matrix[self.index(i, k)];
                    let kj = self.matrix[self.index(k, j)];
                    let Some(combined) = Self::meet(ik, kj) else {
                        self.unsat = true;
                        return;
                    };
                    let idx = self.index(i, j);
                    match Self::update(self.matrix[idx], combined) {
                        Some(o) => self.matrix[idx] = o,
                        None => {
                            self.unsat = true;
                            return;
                        }
                    }
                    if self.is_non_strict(i, j) && self.is_non_strict(j, i) {
                        let ij = self.index(i, j);
                        let ji = self.index(j, i);
                        self.matrix[ij] = Order::Equal;
                        self.matrix[ji] = Order::Equal;
                    }
                }
            }
        }
    }
}

impl fmt::Display for PartOrdGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PartOrdGraph: curN = {}, maxN = {}", self.cur_n, self.max_n)?;
        for i in 0..self.cur_n {
            for j in 0..self.cur_n {
                let sym = if self.is_strict(i, j) {
                    "<"
                } else if self.is_non_strict(i, j) {
                    "<="
                } else if self.is_equal(i, j) {
                    "="
                } else {
                    "."
                };
                write!(f, "\t{sym}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_then_nonstrict_chain_closes_transitively() {
        let mut g = PartOrdGraph::new(8);
        g.strict(0, 1).unwrap();
        g.non_strict(1, 2).unwrap();
        assert!(g.is_strict(0, 2));
        assert!(!g.is_unsat());
    }

    #[test]
    fn opposite_strict_order_is_unsat() {
        let mut g = PartOrdGraph::new(8);
        g.strict(0, 1).unwrap();
        g.strict(1, 0).unwrap();
        assert!(g.is_unsat());
    }

    #[test]
    fn mutual_nonstrict_collapses_to_equal() {
        let mut g = PartOrdGraph::new(8);
        g.non_strict(0, 1).unwrap();
        g.non_strict(1, 0).unwrap();
        assert!(g.is_equal(0, 1));
        assert!(g.is_equal(1, 0));
    }

    #[test]
    fn self_loop_with_strict_is_unsat() {
        let mut g = PartOrdGraph::new(4);
        g.strict(2, 2).unwrap();
        assert!(g.is_unsat());
    }

    #[test]
    fn update_num_items_respects_capacity() {
        let mut g = PartOrdGraph::new(2);
        assert!(g.update_num_items(2).is_ok());
        assert!(g.update_num_items(1).is_err());
    }

    #[test]
    fn equal_then_strict_elsewhere_is_consistent() {
        let mut g = PartOrdGraph::new(8);
        g.equal(0, 1).unwrap();
        g.strict(1, 2).unwrap();
        assert!(g.is_strict(0, 2));
    }
}
