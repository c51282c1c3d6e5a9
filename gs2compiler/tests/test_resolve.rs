use gs2compiler::{
    compile::{ResolveError, Resolver, ScopeKind, SymbolKind, SymbolTable},
    header::{Environment, HeaderSynth, SCRIPT_TYPES},
    lex::Lexer,
    parsing::{Binding, CompilationUnit, ConstValue, ExprKind, Item, Parse, Stmt},
    token_stream::TokenStream,
};

const SOURCE: &str = include_str!("inventory.gs2");
const HEADER_NAMES: &str = include_str!("header_names.gs2");

fn parse(source: &str) -> CompilationUnit {
    let lexer = Lexer::new(source);
    let mut stream = TokenStream::new(lexer);
    CompilationUnit::parse(&mut stream).unwrap()
}

fn resolve(unit: &mut CompilationUnit, env: &Environment) -> Result<SymbolTable, ResolveError> {
    Resolver::new(env).resolve(unit)
}

fn weapon_env() -> Environment {
    HeaderSynth::new(SCRIPT_TYPES, true)
        .synthesize("weapon", "Inventory")
        .unwrap()
        .env
}

#[test]
fn test_resolve_inventory() {
    let mut unit = parse(SOURCE);
    let symbols = resolve(&mut unit, &weapon_env()).unwrap();

    let max_items = symbols.find("MAX_ITEMS").next().unwrap();
    assert_eq!(max_items.kind, SymbolKind::Const(ConstValue::Number(8.0)));

    let greeting = symbols.find("GREETING").next().unwrap();
    assert_eq!(
        greeting.kind,
        SymbolKind::Const(ConstValue::Str("Hello there".to_string()))
    );

    let root = symbols.root().unwrap();
    assert_eq!(root.kind, ScopeKind::Program);
    assert!(root.contains_symbol("onCreated"));
    // Public functions are called by their bare name too.
    assert!(root.contains_symbol("addItem"));
}

#[test]
fn test_header_names_need_header() {
    let mut unit = parse(HEADER_NAMES);
    assert_eq!(
        resolve(&mut unit, &Environment::empty()),
        Err(ResolveError::Unresolved {
            name: "findplayer".into(),
            line: 2
        })
    );

    let mut unit = parse(HEADER_NAMES);
    assert!(resolve(&mut unit, &weapon_env()).is_ok());
}

#[test]
fn test_unresolved_read() {
    let mut unit = parse("x = 1;\ny = z + x;");
    assert_eq!(
        resolve(&mut unit, &Environment::empty()),
        Err(ResolveError::Unresolved {
            name: "z".into(),
            line: 2
        })
    );
}

#[test]
fn test_duplicate_declarations() {
    let mut unit = parse("function f() {\n  var a = 1;\n  var a = 2;\n}");
    assert_eq!(
        resolve(&mut unit, &Environment::empty()),
        Err(ResolveError::Duplicate {
            name: "a".into(),
            line: 3
        })
    );

    let mut unit = parse("function f() {}\nfunction f() {}");
    assert!(matches!(
        resolve(&mut unit, &Environment::empty()),
        Err(ResolveError::Duplicate { line: 2, .. })
    ));

    let mut unit = parse("const A = 1;\nA = 2;");
    assert!(matches!(
        resolve(&mut unit, &Environment::empty()),
        Err(ResolveError::Duplicate { line: 2, .. })
    ));
}

#[test]
fn test_shadowing_in_block() {
    let mut unit = parse("function f() {\n  var a = 1;\n  if (a) { var a = 2; }\n}");
    assert!(resolve(&mut unit, &Environment::empty()).is_ok());
}

#[test]
fn test_not_constant() {
    let mut unit = parse("x = 1;\nconst A = x + 1;");
    assert_eq!(
        resolve(&mut unit, &Environment::empty()),
        Err(ResolveError::NotConstant {
            name: "A".into(),
            line: 2
        })
    );
}

#[test]
fn test_bindings_recorded() {
    let mut unit = parse("function f(p) { var l = p; g = l; return this; }");
    resolve(&mut unit, &Environment::empty()).unwrap();

    let func = unit.funcs().next().unwrap();
    let bindings: Vec<_> = func
        .body
        .stmts
        .iter()
        .filter_map(|stmt| match stmt {
            Stmt::Var(decl) => decl.defs[0].rhs.as_ref(),
            Stmt::Expr(expr) => match &expr.kind {
                ExprKind::Assign { value, .. } => Some(value.as_ref()),
                _ => None,
            },
            Stmt::Return(ret) => ret.value.as_ref(),
            _ => None,
        })
        .filter_map(|expr| match &expr.kind {
            ExprKind::Ident(name) => Some(name.binding.clone()),
            _ => None,
        })
        .collect();

    assert_eq!(bindings, vec![Binding::Param, Binding::Local, Binding::Builtin]);
    assert!(matches!(unit.items[0], Item::Func(_)));
}

#[test]
fn test_object_vars_shared_between_functions() {
    let mut unit = parse("function onCreated() { count = 0; }\nfunction onTimeout() { echo(count); }\n");
    let symbols = resolve(&mut unit, &Environment::empty()).unwrap();

    let count = symbols.find("count").next().unwrap();
    assert_eq!(count.kind, SymbolKind::Var);
    assert_eq!(count.line, 1);
    assert_eq!(count.scope, symbols.root().unwrap().id);
}

#[test]
fn test_object_vars_assigned_later() {
    let mut unit = parse("function f() { echo(later); }\nlater = 1;\n");
    let symbols = resolve(&mut unit, &Environment::empty()).unwrap();
    assert!(symbols.root().unwrap().contains_symbol("later"));

    let mut unit = parse("function f() { n++; }\nfunction g() { return n; }\n");
    assert!(resolve(&mut unit, &Environment::empty()).is_ok());

    let mut unit = parse("function f() { for (item : {1, 2}) {} }\nfunction g() { return item; }\n");
    assert!(resolve(&mut unit, &Environment::empty()).is_ok());
}

#[test]
fn test_locals_stay_local() {
    // `a` is declared in `f`, so `g` cannot see it.
    let mut unit = parse("function f() {\n  var a;\n  a = 1;\n}\nfunction g() { return a; }\n");
    assert_eq!(
        resolve(&mut unit, &Environment::empty()),
        Err(ResolveError::Unresolved {
            name: "a".into(),
            line: 5
        })
    );

    let mut unit = parse("function f(p) { p = 1; }\nfunction g() { return p; }\n");
    assert!(matches!(
        resolve(&mut unit, &Environment::empty()),
        Err(ResolveError::Unresolved { line: 2, .. })
    ));
}

#[test]
fn test_object_var_binding() {
    let mut unit = parse("function f() { return total; }\ntotal = 5;\n");
    resolve(&mut unit, &Environment::empty()).unwrap();

    let func = unit.funcs().next().unwrap();
    let binding = match &func.body.stmts[0] {
        Stmt::Return(ret) => match &ret.value.as_ref().unwrap().kind {
            ExprKind::Ident(name) => name.binding.clone(),
            other => panic!("unexpected expression {:?}", other),
        },
        other => panic!("unexpected statement {:?}", other),
    };
    assert_eq!(binding, Binding::Var);
}

#[test]
fn test_constant_overflow() {
    let mut unit = parse("const A = 10 ^ 400;");
    assert_eq!(
        resolve(&mut unit, &Environment::empty()),
        Err(ResolveError::NotConstant {
            name: "A".into(),
            line: 1
        })
    );

    let mut unit = parse("const A = 10 ^ 300;\nconst B = A * A;");
    assert_eq!(
        resolve(&mut unit, &Environment::empty()),
        Err(ResolveError::NotConstant {
            name: "B".into(),
            line: 2
        })
    );

    let mut unit = parse("const A = 2 ^ 10;");
    let symbols = resolve(&mut unit, &Environment::empty()).unwrap();
    let a = symbols.find("A").next().unwrap();
    assert_eq!(a.kind, SymbolKind::Const(ConstValue::Number(1024.0)));
}
