use crate::pipeline::Pipeline;

/// A typed token produced by [`tokenize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Program name or argument text.
    Word(String),
    /// `|`
    Pipe,
    /// `<`
    Input,
    /// `>`
    Output,
    /// `>>`
    Append,
    /// `2>`
    ErrorOutput,
    /// `>>&`
    AppendBoth,
    /// `&`
    Background,
    /// End of the token stream.
    End,
}

impl Token {
    /// The literal text of the token, as used when a redirection consumes it.
    pub fn text(&self) -> &str {
        match self {
            Token::Word(text) => text,
            Token::Pipe => "|",
            Token::Input => "<",
            Token::Output => ">",
            Token::Append => ">>",
            Token::ErrorOutput => "2>",
            Token::AppendBoth => ">>&",
            Token::Background => "&",
            Token::End => "",
        }
    }
}

fn is_special(c: char) -> bool {
    matches!(c, '<' | '>' | '|' | '&')
}

/// Splits the input command line into typed tokens. This function handles:
///
/// - Quoted strings (using single or double quotes)
/// - Special tokens: `<`, `>`, `>>`, `>>&`, `2>`, `|`, and `&`
///
/// The result always ends with [`Token::End`].
pub fn tokenize(input: &str) -> Vec<Token> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if ch.is_whitespace() {
            i += 1;
            continue;
        }
        match ch {
            '"' | '\'' => {
                let quote = ch;
                i += 1;
                let mut token = String::new();
                while i < chars.len() && chars[i] != quote {
                    token.push(chars[i]);
                    i += 1;
                }
                // Skip the closing quote, if there is one.
                i += 1;
                tokens.push(Token::Word(token));
            }
            '>' => {
                if chars.get(i + 1) == Some(&'>') {
                    if chars.get(i + 2) == Some(&'&') {
                        tokens.push(Token::AppendBoth);
                        i += 3;
                    } else {
                        tokens.push(Token::Append);
                        i += 2;
                    }
                } else {
                    tokens.push(Token::Output);
                    i += 1;
                }
            }
            '2' if chars.get(i + 1) == Some(&'>') => {
                tokens.push(Token::ErrorOutput);
                i += 2;
            }
            '<' => {
                tokens.push(Token::Input);
                i += 1;
            }
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            '&' => {
                tokens.push(Token::Background);
                i += 1;
            }
            _ => {
                let mut token = String::new();
                while i < chars.len() && !chars[i].is_whitespace() && !is_special(chars[i]) {
                    token.push(chars[i]);
                    i += 1;
                }
                tokens.push(Token::Word(token));
            }
        }
    }
    tokens.push(Token::End);
    tokens
}

/// Builds a [`Pipeline`] from a token stream.
///
/// Each word is passed through `expand`, and every string it yields becomes
/// one argument of the current stage, in order. A redirection consumes the
/// literal text of the next token; when there is no next token (or it is the
/// end marker) the redirection is dropped without error. Parsing stops at
/// [`Token::End`].
pub fn build_pipeline<F>(tokens: &[Token], expand: F) -> Pipeline
where
    F: Fn(&str) -> Vec<String>,
{
    let mut pipeline = Pipeline::new();
    let mut iter = tokens.iter().peekable();

    while let Some(token) = iter.next() {
        let mut target = || {
            iter.next_if(|next| **next != Token::End)
                .map(|next| next.text().to_string())
        };
        match token {
            Token::End => break,
            Token::Word(text) => {
                for argument in expand(text) {
                    pipeline.current_stage_mut().push_argument(argument);
                }
            }
            Token::Pipe => pipeline.begin_stage(),
            Token::Output => {
                if let Some(file) = target() {
                    pipeline.output_file = Some(file);
                }
            }
            Token::Append => {
                if let Some(file) = target() {
                    pipeline.output_file = Some(file);
                    pipeline.append = true;
                }
            }
            Token::Input => {
                if let Some(file) = target() {
                    pipeline.input_file = Some(file);
                }
            }
            Token::ErrorOutput => {
                if let Some(file) = target() {
                    pipeline.error_file = Some(file);
                }
            }
            Token::AppendBoth => {
                if let Some(file) = target() {
                    pipeline.output_file = Some(file.clone());
                    pipeline.error_file = Some(file);
                    pipeline.append = true;
                    pipeline.combine_error_with_output = true;
                }
            }
            Token::Background => pipeline.background = true,
        }
    }
    pipeline
}

/// Tokenizes `cmdline` and builds its pipeline, expanding wildcards against
/// the filesystem.
pub fn parse_command_line(cmdline: &str) -> Pipeline {
    build_pipeline(&tokenize(cmdline), crate::expand::expand_pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(text: &str) -> Vec<String> {
        vec![text.to_string()]
    }

    fn word(text: &str) -> Token {
        Token::Word(text.to_string())
    }

    #[test]
    fn test_tokenize_simple() {
        let tokens = tokenize("ls -l");
        assert_eq!(tokens, vec![word("ls"), word("-l"), Token::End]);
    }

    #[test]
    fn test_tokenize_quotes() {
        let tokens = tokenize("echo \"hello world\" 'a|b'");
        assert_eq!(tokens, vec![word("echo"), word("hello world"), word("a|b"), Token::End]);
    }

    #[test]
    fn test_tokenize_operators() {
        let tokens = tokenize("a<in|b>out>>app 2>err>>&both&");
        assert_eq!(
            tokens,
            vec![
                word("a"),
                Token::Input,
                word("in"),
                Token::Pipe,
                word("b"),
                Token::Output,
                word("out"),
                Token::Append,
                word("app"),
                Token::ErrorOutput,
                word("err"),
                Token::AppendBoth,
                word("both"),
                Token::Background,
                Token::End,
            ]
        );
    }

    #[test]
    fn test_tokenize_digit_two_inside_word() {
        let tokens = tokenize("echo file2 x2>y");
        assert_eq!(tokens, vec![word("echo"), word("file2"), word("x2"), Token::Output, word("y"), Token::End]);
    }

    #[test]
    fn test_tokenize_empty_line() {
        assert_eq!(tokenize("   "), vec![Token::End]);
    }

    #[test]
    fn test_parse_command_line() {
        let tokens = tokenize("grep 'pattern' < input.txt | sort > output.txt &");
        let pipeline = build_pipeline(&tokens, literal);
        assert_eq!(pipeline.stages.len(), 2);
        assert_eq!(pipeline.stages[0].arguments(), ["grep", "pattern"]);
        assert_eq!(pipeline.stages[1].arguments(), ["sort"]);
        assert_eq!(pipeline.input_file.as_deref(), Some("input.txt"));
        assert_eq!(pipeline.output_file.as_deref(), Some("output.txt"));
        assert!(!pipeline.append);
        assert!(pipeline.background);
    }

    #[test]
    fn test_append_and_error_redirects() {
        let pipeline = build_pipeline(&tokenize("cmd >> log 2> err"), literal);
        assert_eq!(pipeline.output_file.as_deref(), Some("log"));
        assert_eq!(pipeline.error_file.as_deref(), Some("err"));
        assert!(pipeline.append);
        assert!(!pipeline.combine_error_with_output);
    }

    #[test]
    fn test_combined_redirect_sets_both_targets() {
        let pipeline = build_pipeline(&tokenize("make >>& build.log"), literal);
        assert_eq!(pipeline.output_file.as_deref(), Some("build.log"));
        assert_eq!(pipeline.error_file.as_deref(), Some("build.log"));
        assert!(pipeline.append);
        assert!(pipeline.combine_error_with_output);
    }

    #[test]
    fn test_redirect_without_target_is_ignored() {
        for line in ["ls >", "ls >>", "ls <", "ls 2>", "ls >>&"] {
            let pipeline = build_pipeline(&tokenize(line), literal);
            assert_eq!(pipeline.stages[0].arguments(), ["ls"], "{}", line);
            assert_eq!(pipeline.output_file, None, "{}", line);
            assert_eq!(pipeline.input_file, None, "{}", line);
            assert_eq!(pipeline.error_file, None, "{}", line);
            assert!(!pipeline.append, "{}", line);
        }
    }

    #[test]
    fn test_redirect_consumes_next_token_literally() {
        let pipeline = build_pipeline(&tokenize("ls > | wc"), literal);
        assert_eq!(pipeline.output_file.as_deref(), Some("|"));
        assert_eq!(pipeline.stages.len(), 1);
        assert_eq!(pipeline.stages[0].arguments(), ["ls", "wc"]);
    }

    #[test]
    fn test_redirect_target_is_not_expanded() {
        let pipeline = build_pipeline(&tokenize("ls *.c > *.out"), |text: &str| {
            if text == "*.c" {
                vec!["a.c".to_string(), "b.c".to_string()]
            } else {
                literal(text)
            }
        });
        assert_eq!(pipeline.stages[0].arguments(), ["ls", "a.c", "b.c"]);
        assert_eq!(pipeline.output_file.as_deref(), Some("*.out"));
    }

    #[test]
    fn test_background_does_not_consume_next_token() {
        let pipeline = build_pipeline(&tokenize("sleep & 5"), literal);
        assert!(pipeline.background);
        assert_eq!(pipeline.stages[0].arguments(), ["sleep", "5"]);
    }

    #[test]
    fn test_parsing_stops_at_end_marker() {
        let tokens = vec![word("echo"), Token::End, word("ignored"), Token::Pipe];
        let pipeline = build_pipeline(&tokens, literal);
        assert_eq!(pipeline.stages.len(), 1);
        assert_eq!(pipeline.stages[0].arguments(), ["echo"]);
    }

    #[test]
    fn test_trailing_pipe_leaves_empty_stage() {
        let pipeline = build_pipeline(&tokenize("ls |"), literal);
        assert_eq!(pipeline.stages.len(), 2);
        assert!(pipeline.stages[1].is_empty());
    }

    #[test]
    fn test_each_build_starts_fresh() {
        let first = build_pipeline(&tokenize("a | b > out 2> err &"), literal);
        assert!(first.background);
        let second = build_pipeline(&tokenize("c"), literal);
        assert_eq!(second.stages.len(), 1);
        assert_eq!(second.stages[0].arguments(), ["c"]);
        assert_eq!(second.output_file, None);
        assert_eq!(second.error_file, None);
        assert!(!second.background);
    }
}
