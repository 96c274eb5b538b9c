//! Property-based tests (proptest) for the universal invariants called
//! out in the simplifier's testable-properties section: inverse
//! involution, UF-call mangling injectivity, and `PartOrdGraph`
//! transitive closure.

use proptest::prelude::*;

use iegen_core::part_ord_graph::PartOrdGraph;
use iegen_core::uf_call_map::UfCallMap;
use iegen_core::{Conjunction, Expression, Relation, Term, TupleDecl};

fn two_bounded_relation(lo_a: i64, lo_b: i64) -> Relation {
    let decl = TupleDecl::names(["i", "i_prime"]);
    let mut c = Conjunction::new(decl, 1).unwrap();
    c.add_inequality(Expression::inequality(vec![
        Term::tuple_variable(0),
        Term::constant(-lo_a),
    ]))
    .unwrap();
    c.add_inequality(Expression::inequality(vec![
        Term::tuple_variable(1),
        Term::constant(-lo_b),
    ]))
    .unwrap();
    Relation::new(1, 1, vec![c]).unwrap()
}

proptest! {
    /// `Inverse(Inverse(R)) == R` for any relation built purely from
    /// lower-bound inequalities over its two tuple variables.
    #[test]
    fn inverse_is_an_involution(lo_a in -20i64..20, lo_b in -20i64..20) {
        let r = two_bounded_relation(lo_a, lo_b);
        let round_tripped = r.inverse().inverse();
        prop_assert_eq!(round_tripped.in_arity(), r.in_arity());
        prop_assert_eq!(round_tripped.out_arity(), r.out_arity());
        prop_assert_eq!(round_tripped.conjunctions().len(), r.conjunctions().len());
        for (a, b) in round_tripped.conjunctions()[0]
            .inequalities()
            .iter()
            .zip(r.conjunctions()[0].inequalities())
        {
            prop_assert_eq!(a.to_string(), b.to_string());
        }
    }

    /// Mangling two UF calls to the same function with distinct
    /// single-variable arguments never collides.
    #[test]
    fn mangling_distinct_variable_args_never_collides(a in "[a-z]{1,6}", b in "[a-z]{1,6}") {
        prop_assume!(a != b);
        let call_a = Term::uf_call("f", vec![Expression::value(vec![Term::variable(a)])]);
        let call_b = Term::uf_call("f", vec![Expression::value(vec![Term::variable(b)])]);
        prop_assert_ne!(UfCallMap::mangle(&call_a), UfCallMap::mangle(&call_b));
    }

    /// PartOrdGraph transitivity: chaining `non_strict(a,b)` and
    /// `non_strict(b,c)` across three distinct vertices always yields
    /// `non_strict(a,c)` after closure, and never reports unsat.
    #[test]
    fn non_strict_chain_closes_transitively(n in 3usize..8) {
        let mut g = PartOrdGraph::new(n);
        g.update_num_items(n).unwrap();
        for k in 0..n - 2 {
            g.non_strict(k, k + 1).unwrap();
        }
        g.transitive_closure();
        prop_assert!(!g.is_unsat());
        prop_assert!(g.is_non_strict(0, n - 2));
    }
}
