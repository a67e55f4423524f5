use std::path::PathBuf;

use salvage_lang::ast::{
    Block, CompilationUnit, Expr, ExprKind, Extent, LambdaBody, Statement, StmtKind,
};
use salvage_lang::recovery;
use salvage_lang::utils::error::dump_to_string;
use salvage_lang::{Config, Recovered, recover};

fn init_logger() {
    let _ = colog::default_builder().is_test(true).try_init();
}

fn run(src: &str) -> Recovered {
    init_logger();
    recover(src, Some(PathBuf::from("Test.java")), Config::default())
}

fn lines(recovered: &Recovered) -> Vec<String> {
    recovered
        .unit
        .statements
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[test]
fn well_formed_input_round_trips() {
    let r = run("Runnable r = () -> { go(); };");
    assert!(r.errors.is_empty());
    assert_eq!(lines(&r), ["Runnable r = () -> { go(); };"]);
    assert_eq!(r.unit.statements[0].extent, Extent::new(0, 29));
    assert_eq!(r.unit.extent, Extent::new(0, 29));
}

#[test]
fn import_ends_where_the_invalid_input_starts() {
    let r = run("import java.util.* #");
    assert_eq!(r.unit.imports.len(), 1);
    assert_eq!(r.unit.imports[0].to_string(), "import java.util.*;");
    assert_eq!(r.unit.imports[0].extent, Extent::new(0, 19));
    assert_eq!(r.errors.len(), 1);
    assert_eq!(r.errors[0].span, 19..20);
    let report = dump_to_string(&r.reportable_errors());
    assert!(report.contains("unexpected character `#`"));
}

#[test]
fn lambda_with_block_body() {
    let r = run("x -> { return x; }");
    let StmtKind::Expression(expr) = &r.unit.statements[0].kind else {
        panic!("expected an expression statement");
    };
    let ExprKind::Lambda(lambda) = &expr.kind else {
        panic!("expected a lambda");
    };
    let body = lambda.block_body().expect("block body");
    assert_eq!(body.statements.len(), 1);
    assert_eq!(body.statements[0].to_string(), "return x;");
    assert_eq!(lambda.extent, Extent::new(0, 18));
}

#[test]
fn lambda_with_expression_body() {
    let r = run("x -> x + 1");
    let StmtKind::Expression(expr) = &r.unit.statements[0].kind else {
        panic!("expected an expression statement");
    };
    let ExprKind::Lambda(lambda) = &expr.kind else {
        panic!("expected a lambda");
    };
    assert!(lambda.block_body().is_none());
    assert_eq!(
        lambda.expression_body().map(|s| s.to_string()),
        Some("x + 1;".to_string())
    );
    assert_eq!(lambda.extent, Extent::new(0, 10));
}

#[test]
fn missing_closing_brace_is_supplied_at_end_of_input() {
    let src = "class A { void run() { go(); }";
    let r = run(src);
    assert!(r.errors.is_empty());
    assert_eq!(lines(&r), ["class A { void run() { go(); } }"]);
    assert_eq!(r.unit.statements[0].extent, Extent::new(0, src.len()));
    assert!(r.tree_dump.contains("Recovered statement"));
}

#[test]
fn invalid_input_keeps_the_enclosing_block_open() {
    let r = run("{ a; if (x) { b; # c; } d; }");
    assert_eq!(r.errors.len(), 1);
    assert_eq!(lines(&r), ["{ a; if (x) { b; c; } d; }"]);
}

#[test]
fn stray_closing_brace_is_reported_and_skipped() {
    let r = run("a(); } b();");
    assert_eq!(r.errors.len(), 1);
    assert_eq!(lines(&r), ["a();", "b();"]);
}

#[test]
fn lambda_arguments_fold_into_the_call() {
    let r = run("{ list.forEach(x -> print(x)); done(); }");
    assert!(r.errors.is_empty());
    let StmtKind::Block(block) = &r.unit.statements[0].kind else {
        panic!("expected a block");
    };
    assert_eq!(block.statements.len(), 2);
    let StmtKind::Expression(call) = &block.statements[0].kind else {
        panic!("expected an expression statement");
    };
    let ExprKind::Partial(parts) = &call.kind else {
        panic!("expected a partially recovered call");
    };
    assert!(matches!(parts[1].kind, ExprKind::Lambda(_)));
    let parts = parts.iter().map(|p| p.to_string()).collect::<Vec<_>>();
    assert_eq!(parts, ["list.forEach(", "x -> print(x)", ")"]);
    assert_eq!(block.statements[0].to_string(), "list.forEach(x -> print(x));");
    assert_eq!(block.statements[1].to_string(), "done();");
}

#[test]
fn text_around_lambda_arguments_is_kept() {
    let r = run("f(x -> x, 3); xs.map(x -> x).count(); run(() -> { go(); }, 1);");
    assert!(r.errors.is_empty());
    assert_eq!(
        lines(&r),
        [
            "f(x -> x, 3);",
            "xs.map(x -> x).count();",
            "run(() -> { go(); }, 1);"
        ]
    );
}

#[test]
fn lambda_in_an_initialized_declaration() {
    let r = run("{ long n = xs.map(x -> x); }");
    assert!(r.errors.is_empty());
    assert_eq!(lines(&r), ["{ long n = xs.map(x -> x); }"]);
    let StmtKind::Block(block) = &r.unit.statements[0].kind else {
        panic!("expected a block");
    };
    assert_eq!(block.statements.len(), 1);
    let decl = &block.statements[0];
    assert_eq!(decl.extent, Extent::new(2, 26));
    let StmtKind::LocalDecl {
        init: Some(init), ..
    } = &decl.kind
    else {
        panic!("expected an initialized declaration");
    };
    assert!(matches!(init.kind, ExprKind::Partial(_)));
}

#[test]
fn lambda_in_a_return_value() {
    let r = run("int f() { return xs.map(x -> x); }");
    assert!(r.errors.is_empty());
    assert_eq!(lines(&r), ["int f() { return xs.map(x -> x); }"]);
}

#[test]
fn lambda_in_a_control_body() {
    let r = run("if (c) run(x -> x); next();");
    assert!(r.errors.is_empty());
    assert_eq!(lines(&r), ["if (c) run(x -> x);", "next();"]);
    let StmtKind::Control { body: Some(body), .. } = &r.unit.statements[0].kind else {
        panic!("expected a control statement with a body");
    };
    assert_eq!(body.extent, Extent::new(7, 19));
}

#[test]
fn unary_operator_after_the_arrow() {
    let r = run("f = x->-x;");
    assert_eq!(lines(&r), ["f = x -> -x;"]);
}

fn open_extents_in_unit(unit: &CompilationUnit) -> Vec<String> {
    let mut open = vec![];
    let mut check = |what: &str, extent: Extent| {
        if extent.end.is_none() {
            open.push(format!("{what} at {}", extent.start));
        }
    };
    check("unit", unit.extent);
    for import in &unit.imports {
        check("import", import.extent);
    }
    if let Some(module) = &unit.module {
        check("module", module.extent);
        for d in &module.directives {
            check("directive", d.extent);
        }
    }
    let mut found = vec![];
    for stmt in &unit.statements {
        open_extents_in_statement(stmt, &mut found);
    }
    open.extend(found);
    open
}

fn open_extents_in_block(block: &Block, found: &mut Vec<String>) {
    if block.extent.end.is_none() {
        found.push(format!("block at {}", block.extent.start));
    }
    for stmt in &block.statements {
        open_extents_in_statement(stmt, found);
    }
}

fn open_extents_in_statement(stmt: &Statement, found: &mut Vec<String>) {
    if stmt.extent.end.is_none() {
        found.push(format!("statement `{stmt}` at {}", stmt.extent.start));
    }
    match &stmt.kind {
        StmtKind::LocalDecl { ty, init, .. } => {
            if let Some(ty) = ty.as_ref().filter(|t| t.extent.end.is_none()) {
                found.push(format!("type at {}", ty.extent.start));
            }
            if let Some(init) = init {
                open_extents_in_expr(init, found);
            }
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                open_extents_in_expr(value, found);
            }
        }
        StmtKind::Expression(e) => open_extents_in_expr(e, found),
        StmtKind::Block(b) => open_extents_in_block(b, found),
        StmtKind::Control { body, .. } | StmtKind::Member { body, .. } => {
            if let Some(body) = body {
                open_extents_in_statement(body, found);
            }
        }
    }
}

fn open_extents_in_expr(expr: &Expr, found: &mut Vec<String>) {
    if expr.extent.end.is_none() {
        found.push(format!("expression `{expr}` at {}", expr.extent.start));
    }
    match &expr.kind {
        ExprKind::Lambda(lambda) => match &lambda.body {
            LambdaBody::Block(b) => open_extents_in_block(b, found),
            LambdaBody::Expression(s) => open_extents_in_statement(s, found),
        },
        ExprKind::Partial(parts) => {
            for part in parts {
                open_extents_in_expr(part, found);
            }
        }
        ExprKind::Name(_) | ExprKind::Literal(_) | ExprKind::Text(_) => {}
    }
}

#[test]
fn every_recovered_end_is_known() {
    let corpus = [
        "{ long n = xs.map(x -> x); }",
        "return xs.map(x -> x);",
        "if (c) run(x -> x);",
        "class A { void run() { go(",
        "f(x -> x, 3); g(a -> { b(); }",
        "import java.util.* # import a.b;",
        "module m { requires a; exports p",
        "requires x; uses y;",
        "x -> y -> { z(",
        "Runnable r = () -> ; a(); } } b(",
        "for (int i = 0; i < n; i++) { if (i) ) } else {",
        "{ { { a; } } } }} x ->",
        "while (x) run(a -> a, b -> { c(d -> d",
        "int f() { return x -> ",
        "a(); } b()); c(x ->",
        "",
    ];
    for src in corpus {
        let r = run(src);
        assert_eq!(open_extents_in_unit(&r.unit), Vec::<String>::new(), "{src:?}");
    }
}

#[test]
fn module_declaration() {
    let r = run("package a; module m.x { requires transitive java.base; uses a.Spi; }");
    assert_eq!(r.unit.package.as_deref(), Some("a"));
    let module = r.unit.module.expect("module declaration");
    assert_eq!(module.name, "m.x");
    assert_eq!(module.directives.len(), 2);
    let requires = module.directives[0].as_requires().expect("requires");
    assert!(requires.transitive);
    assert_eq!(requires.module, "java.base");
    assert_eq!(module.directives[1].to_string(), "uses a.Spi;");
    assert!(r.unit.statements.is_empty());
}

#[test]
fn nesting_beyond_the_limit_is_dropped() {
    init_logger();
    let config = Config {
        recovery: recovery::Config { max_depth: 2 },
    };
    let r = recover("{ { { a; } } }", None, config);
    assert_eq!(lines(&r), ["{ {} }"]);
}
