//! UF environment (C5): registry of uninterpreted-function declarations.
//!
//! Modeled as a value owned by a session context rather than a
//! process-wide singleton (§9 design note) -- callers construct an
//! [`Environment`] and pass it explicitly to every operation that needs
//! to resolve UF semantics.

use crate::error::{CoreError, CoreResult};
use crate::set_relation::Set;
use std::collections::HashMap;

/// How a UF's output varies with its input. Only meaningful when both
/// domain and range have arity 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Monotonicity {
    None,
    Nondecreasing,
    Increasing,
}

/// `(name, domain, range, bijective, monotonicity)`.
#[derive(Debug, Clone)]
pub struct UfDecl {
    pub name: String,
    pub domain: Set,
    pub range: Set,
    pub bijective: bool,
    pub monotonicity: Monotonicity,
}

/// Process-scoped (here: context-scoped) registry of [`UfDecl`]s plus
/// declared inverse pairs.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    decls: HashMap<String, UfDecl>,
    inverses: HashMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    pub fn clear(&mut self) {
        self.decls.clear();
        self.inverses.clear();
    }

    pub fn append(
        &mut self,
        name: impl Into<String>,
        domain: Set,
        range: Set,
        bijective: bool,
        monotonicity: Monotonicity,
    ) -> CoreResult<()> {
        let name = name.into();
        if domain.arity() == 0 || range.arity() == 0 {
            return Err(CoreError::InvariantViolation(format!(
                "UF {name}: domain and range must have arity >= 1"
            )));
        }
        if monotonicity != Monotonicity::None && (domain.arity() != 1 || range.arity() != 1) {
            return Err(CoreError::InvariantViolation(format!(
                "UF {name}: monotonicity is only meaningful for arity-1 domain and range"
            )));
        }
        if self.decls.contains_key(&name) {
            return Err(CoreError::InvariantViolation(format!(
                "UF name {name} already registered"
            )));
        }
        self.decls.insert(
            name.clone(),
            UfDecl {
                name,
                domain,
                range,
                bijective,
                monotonicity,
            },
        );
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> CoreResult<&UfDecl> {
        self.decls.get(name).ok_or_else(|| CoreError::UndeclaredSymbol {
            name: name.to_string(),
        })
    }

    /// Declares `name2 = name1^-1`; both must already be registered and
    /// bijective.
    pub fn set_inverse(&mut self, name1: &str, name2: &str) -> CoreResult<()> {
        let d1 = self.lookup(name1)?;
        if !d1.bijective {
            return Err(CoreError::InvariantViolation(format!("{name1} is not bijective")));
        }
        let d2 = self.lookup(name2)?;
        if !d2.bijective {
            return Err(CoreError::InvariantViolation(format!("{name2} is not bijective")));
        }
        self.inverses.insert(name1.to_string(), name2.to_string());
        self.inverses.insert(name2.to_string(), name1.to_string());
        Ok(())
    }

    pub fn inverse_of(&self, name: &str) -> Option<&str> {
        self.inverses.get(name).map(String::as_str)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.decls.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conjunction::Conjunction;
    use crate::term::{Expression, Term};
    use crate::tuple_decl::TupleDecl;

    fn nonneg_set() -> Set {
        let decl = TupleDecl::names(["x"]);
        let mut c = Conjunction::new(decl, 1).unwrap();
        c.add_inequality(Expression::inequality(vec![Term::tuple_variable(0)]))
            .unwrap();
        Set::new(1, vec![c]).unwrap()
    }

    #[test]
    fn lookup_unregistered_is_undeclared_symbol() {
        let env = Environment::new();
        assert!(matches!(
            env.lookup("idx"),
            Err(CoreError::UndeclaredSymbol { .. })
        ));
    }

    #[test]
    fn append_then_lookup_round_trips() {
        let mut env = Environment::new();
        env.append("idx", nonneg_set(), nonneg_set(), false, Monotonicity::Nondecreasing)
            .unwrap();
        assert!(env.lookup("idx").is_ok());
    }

    #[test]
    fn monotonicity_rejected_for_non_unary_uf() {
        let decl = TupleDecl::names(["x", "y"]);
        let two_ary = Set::new(2, vec![Conjunction::new(decl, 2).unwrap()]).unwrap();
        let mut env = Environment::new();
        let err = env.append("f", two_ary, nonneg_set(), false, Monotonicity::Increasing);
        assert!(err.is_err());
    }

    #[test]
    fn set_inverse_requires_bijective() {
        let mut env = Environment::new();
        env.append("f", nonneg_set(), nonneg_set(), false, Monotonicity::None)
            .unwrap();
        env.append("g", nonneg_set(), nonneg_set(), true, Monotonicity::None)
            .unwrap();
        assert!(env.set_inverse("f", "g").is_err());
    }

    #[test]
    fn clear_resets_registry() {
        let mut env = Environment::new();
        env.append("idx", nonneg_set(), nonneg_set(), false, Monotonicity::None)
            .unwrap();
        env.clear();
        assert!(!env.is_registered("idx"));
    }
}
