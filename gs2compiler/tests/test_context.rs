use gs2compiler::prelude::*;

const HEADER_NAMES: &str = include_str!("header_names.gs2");
const SOURCE: &str = include_str!("inventory.gs2");

fn compile(source: &str) -> CompileResult {
    let mut ctx = Context::new();
    let result = ctx.compile(source, "weapon", "TestCode").unwrap().clone();
    ctx.destroy();
    result
}

fn compile_raw(source: &str) -> CompileResult {
    let mut ctx = Context::new();
    let result = ctx.compile_raw(source).unwrap().clone();
    ctx.destroy();
    result
}

fn kind(result: &CompileResult) -> Option<ErrorKind> {
    result.diagnostic().map(Diagnostic::kind)
}

#[test]
fn test_missing_brace_reports_line() {
    let result = compile("//#CLIENTSIDE\nfunction onCreated()\n}");

    assert!(!result.is_success());
    assert_eq!(result.error_message(), Some("malformed input at line 3: }\n"));
    assert_eq!(kind(&result), Some(ErrorKind::Parse));
}

#[test]
fn test_clientside_function_compiles() {
    let result = compile("//#CLIENTSIDE\nfunction onCreated() {\n}");

    assert!(result.is_success());
    assert!(result.bytecode_len() > 0);
    assert_eq!(result.error_message(), None);
}

#[test]
fn test_raw_differs_from_headed() {
    let source = "//#CLIENTSIDE\nfunction onCreated() {\n}";
    let headed = compile(source);
    let raw = compile_raw(source);

    assert!(raw.is_success());
    assert_ne!(raw.bytecode(), headed.bytecode());
    assert!(headed.bytecode().ends_with(raw.bytecode()));
}

#[test]
fn test_empty_source() {
    let result = compile("");
    assert_eq!(result.error_message(), Some("malformed input at line 0: \n"));

    let result = compile_raw("");
    assert_eq!(result.error_message(), Some("malformed input at line 0: \n"));
}

#[test]
fn test_header_only_names() {
    let raw = compile_raw(HEADER_NAMES);
    assert_eq!(kind(&raw), Some(ErrorKind::UnresolvedReference));
    assert_eq!(
        raw.error_message(),
        Some("malformed input at line 2:   temp.pl = findplayer(\"Bob\");\n")
    );

    assert!(compile(HEADER_NAMES).is_success());
}

#[test]
fn test_unknown_script_type() {
    let mut ctx = Context::new();
    let result = ctx.compile("x = 1;", "gmap", "Test").unwrap();

    assert_eq!(kind(result), Some(ErrorKind::UnknownScriptType));
    assert_eq!(result.error_message(), Some("malformed input at line 0: \n"));
}

#[test]
fn test_duplicate_declaration() {
    let result = compile_raw("function f() {\n\tvar a;\n\tvar a;\n}\n");

    assert_eq!(kind(&result), Some(ErrorKind::DuplicateDeclaration));
    assert_eq!(result.error_message(), Some("malformed input at line 3: \tvar a;\n"));
}

#[test]
fn test_lex_error() {
    let result = compile_raw("x = 1;\r\ny = \"open;\r\n");

    assert_eq!(kind(&result), Some(ErrorKind::Lex));
    assert_eq!(result.error_message(), Some("malformed input at line 2: y = \"open;\n"));
}

#[test]
fn test_nesting_too_deep() {
    let mut ctx = Context::with_conf(CompilerConf {
        max_nesting_depth: 16,
        ..Default::default()
    });
    let source = format!("x = {}1{};", "(".repeat(32), ")".repeat(32));
    let result = ctx.compile_raw(&source).unwrap();

    assert_eq!(kind(result), Some(ErrorKind::NestingTooDeep));
}

#[test]
fn test_nested_statements_too_deep() {
    let conf = CompilerConf {
        max_nesting_depth: 16,
        ..Default::default()
    };

    let blocks = format!("{}x = 1;{}", "{".repeat(32), "}".repeat(32));
    let ifs = format!("{}x = 1;{}", "if (1) {".repeat(32), "}".repeat(32));
    let whiles = format!(
        "function f() {{ {}break;{} }}",
        "while (1) {".repeat(32),
        "}".repeat(32)
    );

    for source in [blocks, ifs, whiles] {
        let mut ctx = Context::with_conf(conf.clone());
        let result = ctx.compile_raw(&source).unwrap();
        assert_eq!(kind(result), Some(ErrorKind::NestingTooDeep), "{}", source);
    }

    // Shallow nesting is fine with the same limit.
    let mut ctx = Context::with_conf(conf);
    let source = format!("{}x = 1;{}", "if (1) {".repeat(4), "}".repeat(4));
    assert!(ctx.compile_raw(&source).unwrap().is_success());
}

#[test]
fn test_comment_only_source() {
    let result = compile_raw("// only a comment\n/* and a block\n   comment */\n");
    assert_eq!(kind(&result), Some(ErrorKind::Parse));
    assert_eq!(result.error_message(), Some("malformed input at line 0: \n"));

    let result = compile("// nothing here");
    assert_eq!(result.error_message(), Some("malformed input at line 0: \n"));
}

#[test]
fn test_long_script_name() {
    let mut ctx = Context::new();
    let name = "a".repeat(70000);
    let result = ctx.compile("x = 1;", "weapon", &name).unwrap();

    assert_eq!(kind(result), Some(ErrorKind::UnknownScriptType));
    assert_eq!(result.error_message(), Some("malformed input at line 0: \n"));
}

#[test]
fn test_repeated_reads() {
    let mut ctx = Context::new();
    ctx.compile(SOURCE, "weapon", "Inventory").unwrap();

    let first = ctx.result().cloned();
    let second = ctx.result().cloned();
    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(
        ctx.result().map(CompileResult::bytecode),
        first.as_ref().map(CompileResult::bytecode)
    );

    assert_eq!(ctx.compile_raw("x = 1;"), Err(ContextError::AlreadyResolved));
    assert_eq!(ctx.result().cloned(), first);
}

#[test]
fn test_idempotent_across_contexts() {
    assert_eq!(compile(SOURCE), compile(SOURCE));
    assert_eq!(compile_raw(HEADER_NAMES), compile_raw(HEADER_NAMES));
}
