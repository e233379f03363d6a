//! Text-level rewriting that turns natural language into a symbolic
//! expression the lexer understands.

use crate::ParserBuildError;
use calc_models::{NormalizationConfig, ParserConfig};
use regex::{Captures, NoExpand, Regex};

fn compile(pattern: &str) -> Result<Regex, ParserBuildError> {
    Regex::new(pattern).map_err(|e| ParserBuildError {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn whole_word(word: &str) -> Result<Regex, ParserBuildError> {
    compile(&format!(r"\b{}\b", regex::escape(word)))
}

pub(crate) struct Rewriter {
    prefixes: Vec<String>,
    remove_chars: Regex,
    normalize_whitespace: bool,
    whitespace: Regex,
    compound_numbers: Option<(Regex, Vec<(String, i64)>)>,
    number_words: Vec<(Regex, String)>,
    operation_words: Vec<(Regex, String)>,
    square_root: Regex,
    factorial: Regex,
    squared: Regex,
    cubed: Regex,
    operator_spacing: Regex,
}

impl Rewriter {
    pub(crate) fn new(config: &ParserConfig) -> Result<Self, ParserBuildError> {
        let NormalizationConfig {
            prefixes,
            remove_chars,
            normalize_whitespace,
        } = &config.normalization;

        let number_words = config
            .word_to_number
            .iter()
            .map(|(word, digits)| Ok((whole_word(word)?, digits.clone())))
            .collect::<Result<Vec<_>, ParserBuildError>>()?;

        // Longer phrases first so "divided by" wins over "divide".
        let mut operations: Vec<&(String, String)> = config.operation_words.iter().collect();
        operations.sort_by_key(|(word, _)| std::cmp::Reverse(word.len()));
        let operation_words = operations
            .into_iter()
            .map(|(word, symbol)| Ok((whole_word(word)?, format!(" {symbol} "))))
            .collect::<Result<Vec<_>, ParserBuildError>>()?;

        Ok(Self {
            prefixes: prefixes.iter().map(|p| p.to_lowercase()).collect(),
            remove_chars: compile(remove_chars)?,
            normalize_whitespace: *normalize_whitespace,
            whitespace: compile(r"\s+")?,
            compound_numbers: compound_numbers(&config.word_to_number)?,
            number_words,
            operation_words,
            square_root: compile(r"\b(?:square root|sqrt|root) of\s*(\(|-?\d+(?:\.\d+)?)")?,
            factorial: compile(r"\bfactorial of\s*(\(|\d+(?:\.\d+)?)")?,
            squared: compile(r"(\d+(?:\.\d+)?)\s*squared\b")?,
            cubed: compile(r"(\d+(?:\.\d+)?)\s*cubed\b")?,
            operator_spacing: compile(r"\s*(\*\*|//|[+\-*/()%,])\s*")?,
        })
    }

    /// Lowercase, strip question prefixes and punctuation, collapse spaces.
    pub(crate) fn normalize(&self, expression: &str) -> String {
        let mut expr = expression.trim().to_lowercase();
        for prefix in &self.prefixes {
            if let Some(rest) = expr.strip_prefix(prefix.as_str()) {
                expr = rest.trim().to_string();
            }
        }
        let mut expr = self.remove_chars.replace_all(&expr, "").into_owned();
        if self.normalize_whitespace {
            expr = self.whitespace.replace_all(&expr, " ").into_owned();
        }
        expr.trim().to_string()
    }

    /// Replace number and operation words with digits and symbols.
    pub(crate) fn convert(&self, normalized: &str) -> String {
        let mut expr = normalized.to_string();

        if let Some((pattern, values)) = &self.compound_numbers {
            expr = pattern
                .replace_all(&expr, |caps: &Captures| {
                    let lookup = |word: &str| {
                        values
                            .iter()
                            .find(|(w, _)| w == word)
                            .map(|(_, v)| *v)
                            .unwrap_or_default()
                    };
                    (lookup(&caps[1]) + lookup(&caps[2])).to_string()
                })
                .into_owned();
        }
        for (pattern, digits) in &self.number_words {
            expr = pattern.replace_all(&expr, NoExpand(digits.as_str())).into_owned();
        }
        for (pattern, symbol) in &self.operation_words {
            expr = pattern.replace_all(&expr, NoExpand(symbol.as_str())).into_owned();
        }

        expr = self
            .square_root
            .replace_all(&expr, |caps: &Captures| call("sqrt", &caps[1]))
            .into_owned();
        expr = self
            .factorial
            .replace_all(&expr, |caps: &Captures| call("factorial", &caps[1]))
            .into_owned();
        expr = self.squared.replace_all(&expr, "(${1})**2").into_owned();
        expr = self.cubed.replace_all(&expr, "(${1})**3").into_owned();
        expr = self.operator_spacing.replace_all(&expr, "${1}").into_owned();

        expr.trim().to_string()
    }
}

fn call(function: &str, argument: &str) -> String {
    if argument == "(" {
        format!("{function}(")
    } else {
        format!("{function}({argument})")
    }
}

/// Build a matcher for "twenty-five" / "twenty five" out of the configured
/// tens (20..=90) and units (1..=9).
fn compound_numbers(
    words: &[(String, String)],
) -> Result<Option<(Regex, Vec<(String, i64)>)>, ParserBuildError> {
    let values: Vec<(String, i64)> = words
        .iter()
        .filter_map(|(w, v)| v.parse::<i64>().ok().map(|n| (w.to_lowercase(), n)))
        .collect();
    let tens: Vec<String> = values
        .iter()
        .filter(|(_, n)| (20..=90).contains(n) && n % 10 == 0)
        .map(|(w, _)| regex::escape(w))
        .collect();
    let units: Vec<String> = values
        .iter()
        .filter(|(_, n)| (1..=9).contains(n))
        .map(|(w, _)| regex::escape(w))
        .collect();
    if tens.is_empty() || units.is_empty() {
        return Ok(None);
    }
    let pattern = compile(&format!(
        r"\b({})[- ]({})\b",
        tens.join("|"),
        units.join("|")
    ))?;
    Ok(Some((pattern, values)))
}
