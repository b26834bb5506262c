//! Query gate: leading-keyword allow-list per query language.

use crate::backend::{BackendKind, QueryLanguage};

const SQL_ALLOWED: &[&str] = &["SELECT"];
const CYPHER_ALLOWED: &[&str] = &["MATCH", "RETURN", "WITH", "UNWIND", "CALL"];

/// Why a statement was refused and where to look instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: &'static str,
    pub tip: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Reject(Rejection),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// Check caller-supplied query text against the backend's allow-list.
///
/// The test is a prefix match on the trimmed, upper-cased text. Backends
/// without a query language always pass.
pub fn check(query: &str, backend: BackendKind) -> Verdict {
    let Some(language) = backend.query_language() else {
        return Verdict::Allow;
    };

    let normalized = query.trim().to_uppercase();
    let allowed = match language {
        QueryLanguage::Sql => SQL_ALLOWED,
        QueryLanguage::Cypher => CYPHER_ALLOWED,
    };
    if allowed.iter().any(|keyword| normalized.starts_with(keyword)) {
        return Verdict::Allow;
    }

    Verdict::Reject(match language {
        QueryLanguage::Sql => Rejection {
            reason: "Only SELECT queries are allowed for safety",
            tip: format!(
                "Use {0}_list_tables to explore the schema and {0}_describe_table to inspect columns",
                backend.as_str()
            ),
        },
        QueryLanguage::Cypher => Rejection {
            reason: "Only read queries (MATCH, RETURN, WITH, UNWIND, CALL) are allowed for safety",
            tip: "Use neo4j_list_nodes or neo4j_list_relationships to explore the graph".to_string(),
        },
    })
}
