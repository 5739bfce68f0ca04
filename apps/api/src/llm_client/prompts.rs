// Prompt templating shared by every service that talks to the model.
// Each service defines its own templates in a prompts.rs alongside it.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("prompt variable '{0}' has no value")]
    MissingVariable(String),
}

/// A fixed instruction string with `{name}` placeholders.
///
/// Only `{identifier}` sequences are placeholders; any other brace is copied
/// through as-is. Substituted values are never re-scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate(&'static str);

impl PromptTemplate {
    pub const fn new(template: &'static str) -> Self {
        Self(template)
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        for segment in segments(self.0) {
            if let Segment::Placeholder(name) = segment {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Fills every placeholder from `vars`. Fails before producing any output
    /// if a placeholder has no value.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String, PromptError> {
        let lookup = |name: &str| vars.iter().find(|(k, _)| *k == name).map(|(_, v)| *v);

        if let Some(missing) = self.placeholders().into_iter().find(|&n| lookup(n).is_none()) {
            return Err(PromptError::MissingVariable(missing.to_string()));
        }

        let value_len: usize = vars.iter().map(|(_, v)| v.len()).sum();
        let mut out = String::with_capacity(self.0.len() + value_len);
        for segment in segments(self.0) {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => out.push_str(lookup(name).unwrap_or_default()),
            }
        }
        Ok(out)
    }
}

enum Segment {
    Literal(&'static str),
    Placeholder(&'static str),
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn segments(template: &'static str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(open) = template[cursor..].find('{').map(|i| cursor + i) {
        let Some(close) = template[open + 1..].find('}').map(|i| open + 1 + i) else {
            break;
        };
        let name = &template[open + 1..close];
        if is_identifier(name) {
            if literal_start < open {
                segments.push(Segment::Literal(&template[literal_start..open]));
            }
            segments.push(Segment::Placeholder(name));
            literal_start = close + 1;
            cursor = close + 1;
        } else {
            cursor = open + 1;
        }
    }

    if literal_start < template.len() {
        segments.push(Segment::Literal(&template[literal_start..]));
    }
    segments
}
