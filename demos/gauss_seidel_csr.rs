//! Simplifies the dependence relation for a Gauss-Seidel sweep over a
//! CSR sparse matrix:
//!
//! ```text
//! for i in 0..N {
//!     for j in idx[i]..idx[i+1] {
//!         x[i] += a[j] * x[col[j]];
//!     }
//! }
//! ```
//!
//! The flow dependence from iteration `[i,j]` to `[i',j']` holds when
//! `i < i'` and the column `col[j']` touched by the later iteration is
//! exactly the row `i` written by the earlier one. Preserving only the
//! loop-carrying slots `{i, i'}` and projecting out `j`/`j'` leaves a
//! relation that still names `idx`/`col`, since neither is affine.

use iegen_core::uf_env::Monotonicity;
use iegen_core::{Conjunction, Context, Expression, Preserve, Relation, Term, TupleDecl};

fn main() -> Result<(), iegen_core::CoreError> {
    tracing_subscriber::fmt::init();

    // Tuple layout: [i, j] -> [i', j'], slots 0..4.
    let decl = TupleDecl::names(["i", "j", "i_prime", "j_prime"]);
    let mut c = Conjunction::new(decl, 2)?;

    let i = Term::tuple_variable(0);
    let j = Term::tuple_variable(1);
    let i_prime = Term::tuple_variable(2);
    let j_prime = Term::tuple_variable(3);
    let n = Term::variable("N");

    let idx_of = |slot: usize| Term::uf_call("idx", vec![Expression::value(vec![Term::tuple_variable(slot)])]);
    let idx_of_plus_one =
        |slot: usize| Term::uf_call("idx", vec![Expression::value(vec![Term::tuple_variable(slot), Term::constant(1)])]);
    let col_of = |slot: usize| Term::uf_call("col", vec![Expression::value(vec![Term::tuple_variable(slot)])]);

    // i < i'
    c.add_inequality(Expression::inequality(vec![
        i_prime.clone(),
        i.clone().with_coefficient(-1),
        Term::constant(-1),
    ]))?;
    // i = col(j')
    c.add_equality(Expression::equality(vec![i.clone(), col_of(3).with_coefficient(-1)]))?;
    // 0 <= i < N
    c.add_inequality(Expression::inequality(vec![i.clone()]))?;
    c.add_inequality(Expression::inequality(vec![
        n.clone(),
        i.clone().with_coefficient(-1),
        Term::constant(-1),
    ]))?;
    // 0 <= i' < N
    c.add_inequality(Expression::inequality(vec![i_prime.clone()]))?;
    c.add_inequality(Expression::inequality(vec![
        n.clone(),
        i_prime.clone().with_coefficient(-1),
        Term::constant(-1),
    ]))?;
    // idx(i) <= j < idx(i+1)
    c.add_inequality(Expression::inequality(vec![j.clone(), idx_of(0).with_coefficient(-1)]))?;
    c.add_inequality(Expression::inequality(vec![
        idx_of_plus_one(0),
        j.clone().with_coefficient(-1),
        Term::constant(-1),
    ]))?;
    // idx(i') <= j' < idx(i'+1)
    c.add_inequality(Expression::inequality(vec![
        j_prime.clone(),
        idx_of(2).with_coefficient(-1),
    ]))?;
    c.add_inequality(Expression::inequality(vec![
        idx_of_plus_one(2),
        j_prime.clone().with_coefficient(-1),
        Term::constant(-1),
    ]))?;

    let relation = Relation::new(2, 2, vec![c])?;
    println!("before simplification:\n{relation}\n");

    let mut ctx = Context::new();
    // An unconstrained Z^1 set (one conjunction, no constraints) stands in
    // for idx/col's true domain and range, which this example leaves
    // unspecified.
    let universe = || -> Result<iegen_core::set_relation::Set, iegen_core::CoreError> {
        let decl = TupleDecl::names(["x"]);
        iegen_core::set_relation::Set::new(1, vec![Conjunction::new(decl, 1)?])
    };
    ctx.env.append("idx", universe()?, universe()?, false, Monotonicity::Nondecreasing)?;
    ctx.env.append("col", universe()?, universe()?, false, Monotonicity::None)?;

    // Preserve i and i'; project out j and j'.
    let preserve = Preserve::new([0, 2]);
    match ctx.simplify(&relation, &preserve, 8)? {
        Some(simplified) => println!("simplified (preserving i, i'):\n{simplified}"),
        None => println!("relation is unsatisfiable"),
    }

    Ok(())
}
