use serde_json::Value;

use crate::config::{IndexConfig, IndexKind};

/// Position distance inserted between the elements of an array value so a
/// phrase never matches across two elements.
pub const POSITION_GAP: u32 = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub position: u32,
}

/// Turns property values and query terms into index terms.
#[derive(Clone, Copy, Debug)]
pub struct Analyzer {
    kind: IndexKind,
    to_lower_case: bool,
}

impl Analyzer {
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            kind: config.kind,
            to_lower_case: config.to_lower_case,
        }
    }

    pub fn analyze_value(&self, value: &Value) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0;
        self.collect(value, &mut tokens, &mut position);
        tokens
    }

    /// Terms for a piece of query text, in order.
    pub fn analyze_text(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut position = 0;
        self.push_text(text, &mut tokens, &mut position);
        tokens.into_iter().map(|token| token.text).collect()
    }

    /// Case folding applied to prefix and wildcard terms, which are not split.
    pub fn normalize(&self, text: &str) -> String {
        if self.to_lower_case {
            text.to_lowercase()
        } else {
            text.to_string()
        }
    }

    fn collect(&self, value: &Value, tokens: &mut Vec<Token>, position: &mut u32) {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    self.collect(item, tokens, position);
                    *position += POSITION_GAP;
                }
            }
            Value::String(text) => self.push_text(text, tokens, position),
            Value::Bool(_) | Value::Number(_) | Value::Object(_) => {
                self.push_text(&value.to_string(), tokens, position)
            }
        }
    }

    fn push_text(&self, text: &str, tokens: &mut Vec<Token>, position: &mut u32) {
        match self.kind {
            IndexKind::FullText => {
                for word in text.split(|c: char| !c.is_alphanumeric()) {
                    if word.is_empty() {
                        continue;
                    }
                    tokens.push(Token {
                        text: self.normalize(word),
                        position: *position,
                    });
                    *position += 1;
                }
            }
            IndexKind::Exact => {
                if text.is_empty() {
                    return;
                }
                tokens.push(Token {
                    text: self.normalize(text),
                    position: *position,
                });
                *position += 1;
            }
        }
    }
}
