use std::str::SplitWhitespace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Pipe,
    RedirectIn,
    RedirectOut,
    Background,
}

/// A whitespace-delimited word of the input line. The text borrows from
/// the line; nothing is copied until the parser builds argv.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl<'a> Token<'a> {
    fn classify(text: &'a str) -> Self {
        // Metacharacters count only when they stand alone as a word;
        // `ls>out` is one literal word.
        let kind = match text {
            "|" => TokenKind::Pipe,
            "<" => TokenKind::RedirectIn,
            ">" => TokenKind::RedirectOut,
            "&" => TokenKind::Background,
            _ => TokenKind::Word,
        };
        Token { kind, text }
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }
}

/// Splits a line on runs of whitespace, yielding tokens lazily. No
/// quoting or escaping; every non-whitespace character is literal.
pub struct Lexer<'a> {
    words: SplitWhitespace<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(line: &'a str) -> Self {
        Lexer {
            words: line.split_whitespace(),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        self.words.next().map(Token::classify)
    }
}

pub fn tokenize(line: &str) -> Vec<Token<'_>> {
    Lexer::new(line).collect()
}
