//! Two-scope symbol table: class scope (`static`, `field`) lives for the
//! whole class, subroutine scope (`argument`, `local`) is wiped at the start
//! of every subroutine.

use std::collections::HashMap;

use super::vm::Segment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Static,
    Field,
    Argument,
    Local,
}

impl Kind {
    pub fn is_class_scope(self) -> bool {
        matches!(self, Kind::Static | Kind::Field)
    }

    /// Storage segment a variable of this kind lives in.
    pub fn segment(self) -> Segment {
        match self {
            Kind::Static => Segment::Static,
            Kind::Field => Segment::This,
            Kind::Argument => Segment::Argument,
            Kind::Local => Segment::Local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub ty: String,
    pub kind: Kind,
    pub index: u16,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    class_scope: HashMap<String, Symbol>,
    subroutine_scope: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
    }

    fn scope(&self, kind: Kind) -> &HashMap<String, Symbol> {
        if kind.is_class_scope() {
            &self.class_scope
        } else {
            &self.subroutine_scope
        }
    }

    /// Define `name` in the scope implied by `kind` and return its index.
    /// A name may be defined once per scope.
    pub fn define(&mut self, name: &str, ty: &str, kind: Kind) -> Result<u16, String> {
        if self.scope(kind).contains_key(name) {
            return Err(format!("`{name}` is already defined in this scope"));
        }
        let index = self.var_count(kind);
        let scope = if kind.is_class_scope() {
            &mut self.class_scope
        } else {
            &mut self.subroutine_scope
        };
        scope.insert(
            name.to_string(),
            Symbol {
                ty: ty.to_string(),
                kind,
                index,
            },
        );
        Ok(index)
    }

    /// Number of entries of `kind` in its scope.
    pub fn var_count(&self, kind: Kind) -> u16 {
        self.scope(kind).values().filter(|s| s.kind == kind).count() as u16
    }

    /// Subroutine scope shadows class scope.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    pub fn kind_of(&self, name: &str) -> Option<Kind> {
        self.lookup(name).map(|s| s.kind)
    }

    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.lookup(name).map(|s| s.ty.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.lookup(name).map(|s| s.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_contiguous_per_kind() {
        let mut table = SymbolTable::new();
        let decls = [
            ("a", Kind::Field),
            ("s", Kind::Static),
            ("b", Kind::Field),
            ("x", Kind::Argument),
            ("i", Kind::Local),
            ("c", Kind::Field),
            ("j", Kind::Local),
            ("t", Kind::Static),
        ];
        for (name, kind) in decls {
            table.define(name, "int", kind).unwrap();
        }

        for kind in [Kind::Static, Kind::Field, Kind::Argument, Kind::Local] {
            let mut indices: Vec<u16> = decls
                .iter()
                .filter(|(_, k)| *k == kind)
                .map(|(n, _)| table.index_of(n).unwrap())
                .collect();
            indices.sort();
            let expected: Vec<u16> = (0..indices.len() as u16).collect();
            assert_eq!(indices, expected, "{kind:?}");
            assert_eq!(table.var_count(kind), expected.len() as u16);
        }
        assert_eq!(table.index_of("c"), Some(2));
        assert_eq!(table.index_of("j"), Some(1));
    }

    #[test]
    fn test_start_subroutine_clears_only_subroutine_scope() {
        let mut table = SymbolTable::new();
        table.define("count", "int", Kind::Static).unwrap();
        table.define("size", "int", Kind::Field).unwrap();
        table.define("n", "int", Kind::Argument).unwrap();
        table.define("tmp", "Array", Kind::Local).unwrap();

        table.start_subroutine();

        assert_eq!(table.lookup("n"), None);
        assert_eq!(table.lookup("tmp"), None);
        assert_eq!(table.var_count(Kind::Local), 0);
        assert_eq!(table.kind_of("count"), Some(Kind::Static));
        assert_eq!(table.kind_of("size"), Some(Kind::Field));

        // indices restart in the fresh subroutine scope
        assert_eq!(table.define("m", "int", Kind::Argument), Ok(0));
    }

    #[test]
    fn test_subroutine_scope_shadows_class_scope() {
        let mut table = SymbolTable::new();
        table.define("x", "int", Kind::Field).unwrap();
        table.define("y", "int", Kind::Field).unwrap();
        table.define("y", "Point", Kind::Local).unwrap();

        assert_eq!(table.kind_of("y"), Some(Kind::Local));
        assert_eq!(table.type_of("y"), Some("Point"));
        assert_eq!(table.index_of("y"), Some(0));
        assert_eq!(table.kind_of("x"), Some(Kind::Field));
        assert_eq!(table.kind_of("nope"), None);
    }

    #[test]
    fn test_redefinition_in_same_scope_is_rejected() {
        let mut table = SymbolTable::new();
        table.define("x", "int", Kind::Field).unwrap();
        assert!(table.define("x", "int", Kind::Static).is_err());
        table.define("v", "int", Kind::Argument).unwrap();
        assert!(table.define("v", "int", Kind::Local).is_err());
        assert_eq!(table.var_count(Kind::Local), 0);
    }

    #[test]
    fn test_kind_maps_to_segment() {
        assert_eq!(Kind::Static.segment(), Segment::Static);
        assert_eq!(Kind::Field.segment(), Segment::This);
        assert_eq!(Kind::Argument.segment(), Segment::Argument);
        assert_eq!(Kind::Local.segment(), Segment::Local);
    }
}
