//! # iegen-core
//!
//! A Presburger-arithmetic-plus-uninterpreted-functions constraint
//! simplifier for sparse/polyhedral loop dependence analysis: the kind
//! of indirection arrays (`rowptr`, `col`, `idx`) that show up in CSR,
//! COO and BCSR sparse matrix code and defeat a purely affine solver.
//!
//! ## Pipeline
//!
//! ```text
//! Relation (equalities/inequalities over tuple vars + UF calls)
//!     |
//! [Conjunction::detect_unsat_or_find_equalities]  -> early UNSAT / eq propagation
//!     |
//! [UF domain/range bounding]                      -> substitute args into declared domain/range
//!     |
//! [RuleStore::apply_with_solver]                   -> instantiate rules gated by solver entailment
//!     |
//! [remove_expensive_consts]                        -> heuristic constraint pruning
//!     |
//! [TermPartOrdGraph + DiGraph transitive closure]  -> promote discovered equalities / UNSAT
//!     |
//! [super_affine_relation]                          -> UFCall -> fresh variable (C10)
//!     |
//! [IntegerSetSolver::project_out, per slot]         -> eliminate non-preserved tuple vars
//!     |
//! [restore_uf_calls]                               -> translate mangled vars back
//!     |
//! simplified Relation
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use iegen_core::{Context, Preserve};
//! use iegen_core::set_relation::Relation;
//!
//! let ctx = Context::new();
//! let relation: Relation = /* ... build from a sparse loop's iteration space ... */;
//! let preserve = Preserve::new([0, 1]);
//! if let Some(simplified) = ctx.simplify(&relation, &preserve, 8)? {
//!     println!("{simplified}");
//! }
//! # Ok::<(), iegen_core::error::CoreError>(())
//! ```
//!
//! ## Module organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `term` | Canonical `Term`/`Expression` linear-algebra representation |
//! | `tuple_decl` | Named/fixed tuple-variable declarations |
//! | `conjunction` | Equalities/inequalities over one tuple declaration |
//! | `set_relation` | `Set`/`Relation`, union/intersect/compose/inverse/apply |
//! | `uf_env` | Registry of uninterpreted-function declarations |
//! | `rules` | Universally-quantified rewrite rules over UF calls |
//! | `part_ord_graph` | Dense partial-order graph over integer vertices |
//! | `term_part_ord_graph` | `Term`-keyed adapter over `PartOrdGraph` |
//! | `digraph` | Transitive-closure graph over `Expression`-valued vertices |
//! | `uf_call_map` | Affine-superset abstraction (mangles UF calls to variables) |
//! | `solver` | `IntegerSetSolver` trait plus a reference `NaiveSolver` |
//! | `simplify` | The driver that wires all of the above together |
//! | `config` | Hierarchical configuration (figment: defaults, file, env) |
//! | `error` | `CoreError`/`CoreResult` |

pub mod config;
pub mod conjunction;
pub mod digraph;
pub mod error;
pub mod part_ord_graph;
pub mod rules;
pub mod set_relation;
pub mod simplify;
pub mod solver;
pub mod term;
pub mod term_part_ord_graph;
pub mod tuple_decl;
pub mod uf_call_map;
pub mod uf_env;

pub use config::Config;
pub use conjunction::Conjunction;
pub use digraph::{DiGraph, EdgeType, Vertex};
pub use error::{CoreError, CoreResult};
pub use part_ord_graph::{Order, PartOrdGraph};
pub use rules::{CompareOp, Rule, RuleStore, RuleType};
pub use set_relation::{Relation, Set};
pub use simplify::{simplify, Preserve};
pub use solver::{IntegerSetSolver, NaiveSolver};
pub use term::{Expression, ExprKind, Term, TermKind};
pub use term_part_ord_graph::TermPartOrdGraph;
pub use tuple_decl::{Slot, TupleDecl};
pub use uf_call_map::UfCallMap;
pub use uf_env::{Environment, Monotonicity, UfDecl};

/// Bundles the two pieces of context a simplification run needs --
/// the UF environment and the rule store -- so callers never reach for
/// a process-wide singleton (see `uf_env`'s module doc).
///
/// `Context` itself holds no relation state; build `Relation`s
/// separately and pass them to [`Context::simplify`].
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub env: Environment,
    pub rules: RuleStore,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    /// Run the full simplification pipeline against this context's UF
    /// environment and rule store, using [`NaiveSolver`] as the
    /// built-in [`IntegerSetSolver`].
    pub fn simplify(
        &self,
        relation: &Relation,
        preserve: &Preserve,
        max_removals: usize,
    ) -> CoreResult<Option<Relation>> {
        let solver = NaiveSolver::new();
        simplify::simplify(relation, preserve, max_removals, &self.env, &self.rules, &solver)
    }

    /// Run the pipeline with a caller-supplied solver (e.g. a real
    /// external integer-set library wired up via [`IntegerSetSolver`]).
    pub fn simplify_with(
        &self,
        relation: &Relation,
        preserve: &Preserve,
        max_removals: usize,
        solver: &dyn IntegerSetSolver,
    ) -> CoreResult<Option<Relation>> {
        simplify::simplify(relation, preserve, max_removals, &self.env, &self.rules, solver)
    }
}
