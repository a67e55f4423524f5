use std::fmt;

use itertools::Itertools;

use super::{Extent, Statement};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportDecl {
    pub path: Vec<String>,
    /// `import a.b.*;`
    pub on_demand: bool,
    pub is_static: bool,
    pub extent: Extent,
}

impl fmt::Display for ImportDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "import ")?;
        if self.is_static {
            write!(f, "static ")?;
        }
        write!(f, "{}", self.path.iter().join("."))?;
        if self.on_demand {
            write!(f, ".*")?;
        }
        write!(f, ";")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectiveKind {
    Requires { transitive: bool, is_static: bool },
    Exports,
    Opens,
    Uses,
    Provides,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleDirective {
    pub kind: DirectiveKind,
    pub name: String,
    /// `to` modules of exports/opens, `with` implementations of provides.
    pub targets: Vec<String>,
    pub extent: Extent,
}

/// A `requires` directive with its modifiers pulled out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequiresDirective {
    pub module: String,
    pub transitive: bool,
    pub is_static: bool,
    pub extent: Extent,
}

impl ModuleDirective {
    pub fn requires(module: impl Into<String>, extent: Extent) -> Self {
        Self {
            kind: DirectiveKind::Requires {
                transitive: false,
                is_static: false,
            },
            name: module.into(),
            targets: vec![],
            extent,
        }
    }
    pub fn is_requires(&self) -> bool {
        matches!(self.kind, DirectiveKind::Requires { .. })
    }
    pub fn as_requires(&self) -> Option<RequiresDirective> {
        match self.kind {
            DirectiveKind::Requires {
                transitive,
                is_static,
            } => Some(RequiresDirective {
                module: self.name.clone(),
                transitive,
                is_static,
                extent: self.extent,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for ModuleDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (keyword, joiner) = match self.kind {
            DirectiveKind::Requires {
                transitive,
                is_static,
            } => {
                write!(f, "requires ")?;
                if transitive {
                    write!(f, "transitive ")?;
                }
                if is_static {
                    write!(f, "static ")?;
                }
                return write!(f, "{};", self.name)
            }
            DirectiveKind::Exports => ("exports", "to"),
            DirectiveKind::Opens => ("opens", "to"),
            DirectiveKind::Uses => ("uses", ""),
            DirectiveKind::Provides => ("provides", "with"),
        };
        write!(f, "{keyword} {}", self.name)?;
        if !self.targets.is_empty() {
            write!(f, " {joiner} {}", self.targets.iter().join(", "))?;
        }
        write!(f, ";")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleDecl {
    pub name: String,
    pub open: bool,
    pub directives: Vec<ModuleDirective>,
    pub extent: Extent,
}

impl fmt::Display for ModuleDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.open {
            write!(f, "open ")?;
        }
        write!(f, "module {} {{", self.name)?;
        for d in &self.directives {
            write!(f, " {d}")?;
        }
        write!(f, " }}")
    }
}

/// Root of a recovered source file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompilationUnit {
    pub package: Option<String>,
    pub imports: Vec<ImportDecl>,
    pub module: Option<ModuleDecl>,
    /// Everything that is neither an import nor part of the module declaration.
    pub statements: Vec<Statement>,
    pub extent: Extent,
}

impl fmt::Display for CompilationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = vec![];
        if let Some(p) = &self.package {
            lines.push(format!("package {p};"));
        }
        lines.extend(self.imports.iter().map(|i| i.to_string()));
        if let Some(m) = &self.module {
            lines.push(m.to_string());
        }
        lines.extend(self.statements.iter().map(|s| s.to_string()));
        write!(f, "{}", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_view() {
        let mut d = ModuleDirective::requires("java.sql", Extent::new(0, 18));
        d.kind = DirectiveKind::Requires {
            transitive: true,
            is_static: false,
        };
        let r = d.as_requires().expect("requires");
        assert!(r.transitive);
        assert_eq!(r.module, "java.sql");
        assert_eq!(d.to_string(), "requires transitive java.sql;");
    }

    #[test]
    fn exports_is_not_requires() {
        let d = ModuleDirective {
            kind: DirectiveKind::Exports,
            name: "a.b".into(),
            targets: vec!["m1".into(), "m2".into()],
            extent: Extent::new(0, 20),
        };
        assert!(d.as_requires().is_none());
        assert_eq!(d.to_string(), "exports a.b to m1, m2;");
    }

    #[test]
    fn static_on_demand_import() {
        let i = ImportDecl {
            path: vec!["java".into(), "lang".into(), "Math".into()],
            on_demand: true,
            is_static: true,
            extent: Extent::new(0, 31),
        };
        assert_eq!(i.to_string(), "import static java.lang.Math.*;");
    }
}
