use gs2compiler::{
    lex::{debug_print_lexer, LexError, Lexer},
    tokens::{KeywordKind, TokenKind},
};

const SOURCE: &str = include_str!("inventory.gs2");

fn kinds(source: &str) -> Vec<TokenKind> {
    Lexer::new(source).map(|result| result.unwrap().kind).collect()
}

#[test]
fn test_lex_inventory() {
    let lexer = Lexer::new(SOURCE);
    debug_print_lexer(lexer);

    let tokens: Vec<_> = Lexer::new(SOURCE).collect::<Result<_, _>>().unwrap();
    assert_eq!(tokens.last().map(|token| token.kind), Some(TokenKind::EOS));
    assert_eq!(
        tokens.iter().filter(|token| token.kind == TokenKind::Directive).count(),
        1
    );
}

#[test]
fn test_lex_operators() {
    use TokenKind as T;

    #[rustfmt::skip]
    assert_eq!(kinds("a @= b++ <= -c;"), vec![
        T::Ident, T::AtEq, T::Ident, T::PlusPlus, T::LessEq, T::Minus, T::Ident, T::Semicolon, T::EOS,
    ]);
}

#[test]
fn test_lex_keywords_and_literals() {
    use KeywordKind as K;
    use TokenKind as T;

    #[rustfmt::skip]
    assert_eq!(kinds("public function f() { return 0x1F + 2.5 @ \"s\"; }"), vec![
        T::Keyword(K::Public), T::Keyword(K::Function), T::Ident, T::LeftParen, T::RightParen,
        T::LeftBrace, T::Keyword(K::Return), T::Int, T::Plus, T::Float, T::At, T::Str, T::Semicolon,
        T::RightBrace, T::EOS,
    ]);
}

#[test]
fn test_comments_skipped() {
    let source = "// line\n/* block\n comment */ x;";
    let tokens: Vec<_> = Lexer::new(source).map(Result::unwrap).collect();

    assert_eq!(tokens[0].kind, TokenKind::Ident);
    assert_eq!(tokens[0].line(), 3);
}

#[test]
fn test_lex_errors() {
    let errors: Vec<_> = Lexer::new("a = 1;\nb = \"open;\n").filter_map(Result::err).collect();
    assert_eq!(errors, vec![LexError::UnterminatedString { line: 2 }]);

    let errors: Vec<_> = Lexer::new("x = 1 # 2;").filter_map(Result::err).collect();
    assert_eq!(
        errors,
        vec![LexError::UnknownCharacter {
            character: '#',
            line: 1
        }]
    );
}
