//! Minimal DOT reader for flow specifications.
//!
//! Understands the subset flows are written in:
//!
//! ```text
//! digraph flow {
//!     rankdir=LR;
//!     node [shape=box];
//!     coordinator -> architect -> "backend-go-developer";
//!     architect -> qa
//!     docs  // lone node
//! }
//! ```
//!
//! Bare identifiers may contain `-`, `.` and `:` as long as the `-` does not
//! start an arrow. Attribute lists and `key=value` statements are accepted
//! and ignored; subgraphs and undirected edges are rejected.

/// Nodes in first-seen order plus directed edges.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedGraph {
    pub nodes: Vec<String>,
    pub edges: Vec<(String, String)>,
}

impl ParsedGraph {
    fn add_node(&mut self, name: &str) {
        if !self.nodes.iter().any(|n| n == name) {
            self.nodes.push(name.to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Arrow,
    UndirectedEdge,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Equals,
    Separator,
}

/// True when `text` is a full graph (starts with the `digraph` keyword,
/// optionally preceded by `strict`).
pub fn is_graph_text(text: &str) -> bool {
    let mut words = text.split_whitespace();
    match words.next() {
        Some("strict") => words.next().is_some_and(starts_with_graph_keyword),
        Some(first) => starts_with_graph_keyword(first),
        None => false,
    }
}

fn starts_with_graph_keyword(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    ["digraph", "graph"]
        .iter()
        .any(|kw| lower == *kw || (lower.starts_with(kw) && lower[kw.len()..].starts_with('{')))
}

/// Wrap an edge fragment into a graph body.
pub fn wrap_fragment(fragment: &str) -> String {
    format!("digraph flow {{\n{}\n}}", fragment)
}

/// Parse graph text into nodes and edges.
pub fn parse_dot(text: &str) -> Result<ParsedGraph, String> {
    let tokens = tokenize(text)?;
    let mut pos = 0;

    if let Some(Token::Ident(word)) = tokens.get(pos) {
        if word.eq_ignore_ascii_case("strict") {
            pos += 1;
        }
    }

    match tokens.get(pos) {
        Some(Token::Ident(word)) if word.eq_ignore_ascii_case("digraph") => pos += 1,
        Some(Token::Ident(word)) if word.eq_ignore_ascii_case("graph") => {
            return Err("undirected graphs are not supported, use 'digraph'".to_string())
        }
        _ => return Err("flow must start with 'digraph'".to_string()),
    }

    // Optional graph name
    if let Some(Token::Ident(_)) = tokens.get(pos) {
        pos += 1;
    }

    if tokens.get(pos) != Some(&Token::LBrace) {
        return Err("expected '{' after graph header".to_string());
    }
    pos += 1;

    let mut graph = ParsedGraph::default();
    loop {
        match tokens.get(pos) {
            None => return Err("unterminated graph body, missing '}'".to_string()),
            Some(Token::RBrace) => {
                pos += 1;
                break;
            }
            Some(Token::Separator) => pos += 1,
            Some(Token::LBrace) => return Err("subgraphs are not supported".to_string()),
            Some(Token::Ident(_)) => pos = parse_statement(&tokens, pos, &mut graph)?,
            Some(other) => return Err(format!("unexpected {} in graph body", describe(other))),
        }
    }

    if let Some(extra) = tokens[pos..].iter().find(|t| **t != Token::Separator) {
        return Err(format!("unexpected {} after closing '}}'", describe(extra)));
    }

    Ok(graph)
}

/// Parse one statement starting at an identifier; returns the next position.
fn parse_statement(tokens: &[Token], start: usize, graph: &mut ParsedGraph) -> Result<usize, String> {
    let Some(Token::Ident(first)) = tokens.get(start) else {
        return Err("expected identifier".to_string());
    };
    let mut pos = start + 1;

    // `key = value`
    if tokens.get(pos) == Some(&Token::Equals) {
        return match tokens.get(pos + 1) {
            Some(Token::Ident(_)) => Ok(pos + 2),
            _ => Err(format!("missing value after '{} ='", first)),
        };
    }

    // `graph [...]`, `node [...]`, `edge [...]`
    let is_default_stmt = ["graph", "node", "edge"]
        .iter()
        .any(|kw| first.eq_ignore_ascii_case(kw));
    if is_default_stmt && tokens.get(pos) == Some(&Token::LBracket) {
        return skip_attributes(tokens, pos);
    }

    let mut chain = vec![first.clone()];
    loop {
        match tokens.get(pos) {
            Some(Token::Arrow) => match tokens.get(pos + 1) {
                Some(Token::Ident(next)) => {
                    chain.push(next.clone());
                    pos += 2;
                }
                _ => return Err(format!("edge from '{}' has no target", chain[chain.len() - 1])),
            },
            Some(Token::UndirectedEdge) => {
                return Err("undirected edge '--' is not allowed in a digraph".to_string())
            }
            _ => break,
        }
    }

    if tokens.get(pos) == Some(&Token::LBracket) {
        pos = skip_attributes(tokens, pos)?;
    }

    for name in &chain {
        graph.add_node(name);
    }
    for pair in chain.windows(2) {
        graph.edges.push((pair[0].clone(), pair[1].clone()));
    }

    Ok(pos)
}

fn skip_attributes(tokens: &[Token], start: usize) -> Result<usize, String> {
    let mut pos = start + 1;
    loop {
        match tokens.get(pos) {
            None => return Err("unterminated attribute list, missing ']'".to_string()),
            Some(Token::RBracket) => return Ok(pos + 1),
            Some(Token::LBracket) | Some(Token::LBrace) | Some(Token::RBrace) => {
                return Err("unbalanced attribute list".to_string())
            }
            Some(_) => pos += 1,
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident(s) => format!("'{}'", s),
        Token::Arrow => "'->'".to_string(),
        Token::UndirectedEdge => "'--'".to_string(),
        Token::LBrace => "'{'".to_string(),
        Token::RBrace => "'}'".to_string(),
        Token::LBracket => "'['".to_string(),
        Token::RBracket => "']'".to_string(),
        Token::Equals => "'='".to_string(),
        Token::Separator => "';'".to_string(),
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' | ';' | ',' => {
                tokens.push(Token::Separator);
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err("unterminated block comment".to_string());
                }
                i += 2;
            }
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '{' => {
                tokens.push(Token::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Token::RBrace);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Equals);
                i += 1;
            }
            '-' if chars.get(i + 1) == Some(&'>') => {
                tokens.push(Token::Arrow);
                i += 2;
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                tokens.push(Token::UndirectedEdge);
                i += 2;
            }
            '"' => {
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err("unterminated quoted identifier".to_string()),
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some('\\') if chars.get(i + 1) == Some(&'"') => {
                            value.push('"');
                            i += 2;
                        }
                        Some(&ch) => {
                            value.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Ident(value));
            }
            c if is_ident_char(c) => {
                let mut value = String::new();
                while i < chars.len() && is_ident_char(chars[i]) {
                    if chars[i] == '-' && matches!(chars.get(i + 1), Some('>') | Some('-')) {
                        break;
                    }
                    value.push(chars[i]);
                    i += 1;
                }
                tokens.push(Token::Ident(value));
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chain_and_lone_node() {
        let graph = parse_dot(
            r#"digraph flow {
                rankdir=LR;
                node [shape=box, style="rounded"];
                coordinator -> architect -> "backend-go-developer" [label="impl"];
                architect->qa
                docs // documentation writer
            }"#,
        )
        .unwrap();

        assert_eq!(
            graph.nodes,
            vec!["coordinator", "architect", "backend-go-developer", "qa", "docs"]
        );
        assert_eq!(
            graph.edges,
            vec![
                ("coordinator".to_string(), "architect".to_string()),
                ("architect".to_string(), "backend-go-developer".to_string()),
                ("architect".to_string(), "qa".to_string()),
            ]
        );
    }

    #[test]
    fn test_dashed_names_do_not_swallow_arrows() {
        let graph = parse_dot("digraph { front-end->back-end }").unwrap();
        assert_eq!(graph.edges, vec![("front-end".to_string(), "back-end".to_string())]);
    }

    #[test]
    fn test_graph_text_detection() {
        assert!(is_graph_text("digraph G { a -> b }"));
        assert!(is_graph_text("  strict digraph { a -> b }"));
        assert!(is_graph_text("digraph{ a -> b }"));
        assert!(!is_graph_text("a -> b"));
        assert!(!is_graph_text("digraphs -> b"));
    }

    #[test]
    fn test_malformed_input() {
        assert!(parse_dot("digraph { a -> }").is_err());
        assert!(parse_dot("digraph { a -> b").is_err());
        assert!(parse_dot("digraph { a -- b }").is_err());
        assert!(parse_dot("graph { a -- b }").is_err());
        assert!(parse_dot("digraph { \"unterminated }").is_err());
        assert!(parse_dot("digraph { subgraph { a } }").is_err());
        assert!(parse_dot("digraph { a -> b } trailing").is_err());
        assert!(parse_dot(&wrap_fragment("a -> b; b -> c")).is_ok());
    }
}
