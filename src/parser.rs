use std::fmt;

use crate::ast::{Pipeline, Stage};
use crate::lexer::{Lexer, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// `<` with no filename word after it.
    MissingInputFile,
    /// `>` with no filename word after it.
    MissingOutputFile,
    /// A stage with no argv words, e.g. `| cmd`, `cmd |`, `a | | b`,
    /// or a stage made only of redirections.
    EmptyStage,
    /// The token sequence was empty.
    EmptyPipeline,
    /// `&` anywhere but as the final token of the line.
    BackgroundNotLast,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingInputFile => {
                write!(f, "syntax error: expected input file after '<'")
            }
            ParseError::MissingOutputFile => {
                write!(f, "syntax error: expected output file after '>'")
            }
            ParseError::EmptyStage => write!(f, "syntax error: missing command"),
            ParseError::EmptyPipeline => write!(f, "syntax error: empty command line"),
            ParseError::BackgroundNotLast => {
                write!(f, "syntax error: '&' must be the last token of the line")
            }
        }
    }
}

pub fn parse_line(line: &str) -> Result<Pipeline, ParseError> {
    parse_tokens(Lexer::new(line))
}

/// Groups a token sequence into pipeline stages, splitting at `|`.
/// Duplicate redirections within one stage overwrite silently, so the
/// last occurrence wins and earlier files are never opened.
pub fn parse_tokens<'a, I>(tokens: I) -> Result<Pipeline, ParseError>
where
    I: IntoIterator<Item = Token<'a>>,
{
    let mut tokens = tokens.into_iter();
    let mut stages: Vec<Stage> = Vec::new();
    let mut current = Stage::default();
    let mut saw_any = false;

    while let Some(token) = tokens.next() {
        if current.background {
            // `&` was already consumed but the line keeps going.
            return Err(ParseError::BackgroundNotLast);
        }
        saw_any = true;
        match token.kind {
            TokenKind::Word => current.argv.push(token.text.to_string()),
            TokenKind::Pipe => {
                stages.push(finished(current)?);
                current = Stage::default();
            }
            TokenKind::RedirectIn => {
                current.input_path =
                    Some(redirect_target(&mut tokens, ParseError::MissingInputFile)?);
            }
            TokenKind::RedirectOut => {
                current.output_path =
                    Some(redirect_target(&mut tokens, ParseError::MissingOutputFile)?);
            }
            TokenKind::Background => current.background = true,
        }
    }

    if !saw_any {
        return Err(ParseError::EmptyPipeline);
    }
    stages.push(finished(current)?);
    Ok(Pipeline { stages })
}

fn finished(stage: Stage) -> Result<Stage, ParseError> {
    if stage.argv.is_empty() {
        return Err(ParseError::EmptyStage);
    }
    Ok(stage)
}

fn redirect_target<'a, I>(tokens: &mut I, missing: ParseError) -> Result<String, ParseError>
where
    I: Iterator<Item = Token<'a>>,
{
    match tokens.next() {
        Some(token) if token.is_word() => Ok(token.text.to_string()),
        _ => Err(missing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(argv: &[&str]) -> Stage {
        Stage {
            argv: argv.iter().map(|s| s.to_string()).collect(),
            ..Stage::default()
        }
    }

    #[test]
    fn test_parse_single_command_argv() {
        let pipeline = parse_line("prog -a --long value").unwrap();
        assert_eq!(
            pipeline,
            Pipeline {
                stages: vec![stage(&["prog", "-a", "--long", "value"])],
            }
        );
        assert!(pipeline.is_single());
        assert!(!pipeline.background());
    }

    #[test]
    fn test_parse_three_stage_pipeline() {
        let pipeline = parse_line("cat f | sort | uniq -c").unwrap();
        assert_eq!(
            pipeline.stages,
            vec![
                stage(&["cat", "f"]),
                stage(&["sort"]),
                stage(&["uniq", "-c"]),
            ]
        );
    }

    #[test]
    fn test_parse_redirections_at_both_ends() {
        let pipeline = parse_line("sort < in | uniq > out").unwrap();
        assert_eq!(pipeline.stages.len(), 2);
        assert_eq!(pipeline.stages[0].input_path.as_deref(), Some("in"));
        assert_eq!(pipeline.stages[0].output_path, None);
        assert_eq!(pipeline.stages[1].input_path, None);
        assert_eq!(pipeline.stages[1].output_path.as_deref(), Some("out"));
    }

    #[test]
    fn test_redirection_tokens_before_argv_words() {
        let pipeline = parse_line("> out echo hi").unwrap();
        assert_eq!(pipeline.stages[0].argv, vec!["echo", "hi"]);
        assert_eq!(pipeline.stages[0].output_path.as_deref(), Some("out"));
    }

    #[test]
    fn test_duplicate_redirection_last_wins() {
        let pipeline = parse_line("cmd > a > b < x < y").unwrap();
        assert_eq!(pipeline.stages[0].output_path.as_deref(), Some("b"));
        assert_eq!(pipeline.stages[0].input_path.as_deref(), Some("y"));
    }

    #[test]
    fn test_interior_stage_redirection_parses() {
        // Legal at parse time; the executor pipe-binds interior stages
        // and never opens these paths.
        let pipeline = parse_line("a | b < skipped | c").unwrap();
        assert_eq!(pipeline.stages[1].input_path.as_deref(), Some("skipped"));
    }

    #[test]
    fn test_missing_input_file_is_syntax_error() {
        assert_eq!(parse_line("cat <"), Err(ParseError::MissingInputFile));
        assert_eq!(parse_line("cat < | wc"), Err(ParseError::MissingInputFile));
    }

    #[test]
    fn test_missing_output_file_is_syntax_error() {
        assert_eq!(parse_line("cat >"), Err(ParseError::MissingOutputFile));
        assert_eq!(parse_line("cat > &"), Err(ParseError::MissingOutputFile));
    }

    #[test]
    fn test_empty_stage_is_rejected() {
        assert_eq!(parse_line("| wc"), Err(ParseError::EmptyStage));
        assert_eq!(parse_line("ls |"), Err(ParseError::EmptyStage));
        assert_eq!(parse_line("a | | b"), Err(ParseError::EmptyStage));
        assert_eq!(parse_line("< in"), Err(ParseError::EmptyStage));
    }

    #[test]
    fn test_empty_token_sequence_is_rejected() {
        assert_eq!(parse_line(""), Err(ParseError::EmptyPipeline));
        assert_eq!(parse_line("   "), Err(ParseError::EmptyPipeline));
    }

    #[test]
    fn test_background_marks_final_stage() {
        let pipeline = parse_line("sleep 5 &").unwrap();
        assert!(pipeline.stages[0].background);
        assert!(pipeline.background());

        let pipeline = parse_line("a | b &").unwrap();
        assert!(!pipeline.stages[0].background);
        assert!(pipeline.stages[1].background);
        assert!(pipeline.background());
    }

    #[test]
    fn test_background_not_last_is_rejected() {
        assert_eq!(parse_line("a & b"), Err(ParseError::BackgroundNotLast));
        assert_eq!(parse_line("a & | b"), Err(ParseError::BackgroundNotLast));
        assert_eq!(parse_line("a & &"), Err(ParseError::BackgroundNotLast));
    }

    #[test]
    fn test_bare_background_token_is_rejected() {
        assert_eq!(parse_line("&"), Err(ParseError::EmptyStage));
    }

    #[test]
    fn test_parse_errors_display() {
        assert_eq!(
            ParseError::MissingInputFile.to_string(),
            "syntax error: expected input file after '<'"
        );
        assert_eq!(
            ParseError::BackgroundNotLast.to_string(),
            "syntax error: '&' must be the last token of the line"
        );
    }
}
