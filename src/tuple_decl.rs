//! Tuple declaration (C2).
//!
//! An ordered sequence of slots, each either a bound symbolic name or a
//! fixed integer constant. Its length is the arity, and it defines which
//! names inside a [`crate::conjunction::Conjunction`] resolve to
//! [`crate::term::TermKind::TupleVariable`] terms.

use std::fmt;

/// One slot of a [`TupleDecl`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Name(String),
    Fixed(i64),
}

/// An ordered, arity-tagged list of tuple slots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TupleDecl {
    slots: Vec<Slot>,
}

impl TupleDecl {
    pub fn new(slots: Vec<Slot>) -> Self {
        TupleDecl { slots }
    }

    pub fn names(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        TupleDecl {
            slots: names.into_iter().map(|n| Slot::Name(n.into())).collect(),
        }
    }

    pub fn arity(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, k: usize) -> Option<&Slot> {
        self.slots.get(k)
    }

    pub fn name_at(&self, k: usize) -> Option<&str> {
        match self.slots.get(k)? {
            Slot::Name(n) => Some(n),
            Slot::Fixed(_) => None,
        }
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| matches!(s, Slot::Name(n) if n == name))
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Remove slot `k`, shifting all later slots down by one. Used after a
    /// tuple variable has been projected out.
    #[must_use]
    pub fn without_slot(&self, k: usize) -> TupleDecl {
        let mut slots = self.slots.clone();
        slots.remove(k);
        TupleDecl { slots }
    }
}

impl fmt::Display for TupleDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, s) in self.slots.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match s {
                Slot::Name(n) => write!(f, "{n}")?,
                Slot::Fixed(c) => write!(f, "{c}")?,
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_and_position_lookup() {
        let td = TupleDecl::names(["i", "j"]);
        assert_eq!(td.arity(), 2);
        assert_eq!(td.position_of("j"), Some(1));
        assert_eq!(td.position_of("k"), None);
    }

    #[test]
    fn without_slot_shifts_remaining_names_down() {
        let td = TupleDecl::names(["i", "j", "k"]);
        let reduced = td.without_slot(1);
        assert_eq!(reduced.arity(), 2);
        assert_eq!(reduced.name_at(0), Some("i"));
        assert_eq!(reduced.name_at(1), Some("k"));
    }

    #[test]
    fn fixed_slot_has_no_name() {
        let td = TupleDecl::new(vec![Slot::Fixed(0), Slot::Name("j".to_string())]);
        assert_eq!(td.name_at(0), None);
        assert_eq!(td.name_at(1), Some("j"));
    }
}
