//! Splits console lines into argument tokens.

use std::ops::Range;

const QUOTES: [char; 2] = ['"', '\''];

pub(crate) fn is_quote(character: char) -> bool {
    QUOTES.contains(&character)
}

/// One whitespace-separated word and the byte range it occupies in the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Word {
    pub(crate) text: String,
    pub(crate) span: Range<usize>,
}

/// Splits `line` on whitespace outside quoted spans, keeping each word's
/// position in `line`.
///
/// The first quote character seen opens a span and only the same character
/// closes it; the other quote character is literal inside the span. An
/// unterminated span runs to the end of the line. Each word's text then loses
/// one leading and one trailing quote of the kind that opened its first span.
pub(crate) fn split_words(line: &str) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current = Token::default();
    let mut open: Option<char> = None;

    for (offset, character) in line.char_indices() {
        match open {
            Some(quote) => {
                current.push(offset, character);
                if character == quote {
                    open = None;
                }
            }
            None if character.is_whitespace() => {
                if let Some(word) = current.take(offset) {
                    words.push(word);
                }
            }
            None => {
                if is_quote(character) {
                    open = Some(character);
                    current.quote.get_or_insert(character);
                }
                current.push(offset, character);
            }
        }
    }
    if let Some(word) = current.take(line.len()) {
        words.push(word);
    }
    words
}

#[derive(Default)]
struct Token {
    text: String,
    start: Option<usize>,
    quote: Option<char>,
}

impl Token {
    fn push(&mut self, offset: usize, character: char) {
        self.start.get_or_insert(offset);
        self.text.push(character);
    }

    fn take(&mut self, end: usize) -> Option<Word> {
        let start = self.start?;
        let token = std::mem::take(self);
        let text = match token.quote {
            Some(quote) => strip_quote(&token.text, quote).to_owned(),
            None => token.text,
        };
        Some(Word {
            text,
            span: start..end,
        })
    }
}

fn strip_quote(text: &str, quote: char) -> &str {
    let inner = text.strip_prefix(quote).unwrap_or(text);
    inner.strip_suffix(quote).unwrap_or(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn tokenize(line: &str) -> Vec<String> {
        split_words(line).into_iter().map(|word| word.text).collect()
    }

    #[rstest]
    #[case(r#"a "b c" d"#, &["a", "b c", "d"])]
    #[case(r#"'x y' "z""#, &["x y", "z"])]
    #[case(r#"a "b c"#, &["a", "b c"])]
    #[case("", &[])]
    #[case("   ", &[])]
    #[case("img   list\t --output json", &["img", "list", "--output", "json"])]
    #[case(r#"img.CreateImage '{"format": "RAW", "size": 10}'"#, &["img.CreateImage", r#"{"format": "RAW", "size": 10}"#])]
    #[case(r#""it's here""#, &["it's here"])]
    #[case(r#"--id="a b""#, &[r#"--id="a b"#])]
    fn splits_lines(#[case] line: &str, #[case] expected: &[&str]) {
        assert_eq!(tokenize(line), expected);
    }

    #[test]
    fn words_remember_their_spans() {
        let line = r#"vm.IsAlive  '{"id": 1}' x"#;
        let spans: Vec<_> = split_words(line)
            .into_iter()
            .map(|word| &line[word.span])
            .collect();
        assert_eq!(spans, ["vm.IsAlive", r#"'{"id": 1}'"#, "x"]);
    }

    #[test]
    fn balanced_input_has_one_token_per_group() {
        let line = r#"one 'two three' "four five six" seven"#;
        assert_eq!(tokenize(line).len(), 4);
    }
}
