//! Named graphs: the unit the external store persists
//!
//! One named graph per subject. The store treats it as an opaque payload
//! keyed by its identifier (the subject's URI).

use serde::{Deserialize, Serialize};

/// Object of a statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Term {
    Uri(String),
    Literal(String),
}

impl Term {
    pub fn uri(value: impl Into<String>) -> Self {
        Self::Uri(value.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    fn write_ntriples(&self, out: &mut String) {
        match self {
            Self::Uri(uri) => {
                out.push('<');
                out.push_str(uri);
                out.push('>');
            }
            Self::Literal(text) => {
                out.push('"');
                for c in text.chars() {
                    match c {
                        '\\' => out.push_str("\\\\"),
                        '"' => out.push_str("\\\""),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\t' => out.push_str("\\t"),
                        other => out.push(other),
                    }
                }
                out.push('"');
            }
        }
    }
}

/// A subject-predicate-object triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statement {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
}

impl Statement {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

/// The converted form of one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedGraph {
    /// Graph name; also the URI of the subject it describes
    pub identifier: String,
    pub statements: Vec<Statement>,
}

impl NamedGraph {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            statements: Vec::new(),
        }
    }

    /// Add a statement about the graph's own subject
    pub fn describe(&mut self, predicate: &str, object: Term) {
        self.statements
            .push(Statement::new(self.identifier.clone(), predicate, object));
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Objects of every statement using `predicate`
    pub fn objects<'a>(&'a self, predicate: &'a str) -> impl Iterator<Item = &'a Term> + 'a {
        self.statements
            .iter()
            .filter(move |s| s.predicate == predicate)
            .map(|s| &s.object)
    }

    /// Serialize as N-Triples, one statement per line
    pub fn to_ntriples(&self) -> String {
        let mut out = String::new();
        for statement in &self.statements {
            out.push('<');
            out.push_str(&statement.subject);
            out.push_str("> <");
            out.push_str(&statement.predicate);
            out.push_str("> ");
            statement.object.write_ntriples(&mut out);
            out.push_str(" .\n");
        }
        out
    }
}
