//! Minimal reader for Gradle Kotlin DSL scripts
//!
//! Splits a script into statements tagged with the block path they appear
//! in (`android > defaultConfig > ndk`). Comments are dropped and braces
//! inside string literals are ignored. Expressions are not evaluated.

/// One statement and where it was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Enclosing block headers, outermost first
    pub path: Vec<String>,
    /// Statement text, trimmed
    pub text: String,
    /// 1-based line the statement starts on
    pub line: usize,
}

impl Statement {
    /// Whether the enclosing blocks are exactly `blocks`
    pub fn is_in(&self, blocks: &[&str]) -> bool {
        self.path.len() == blocks.len() && self.path.iter().zip(blocks).all(|(a, b)| a == b)
    }
}

/// Split a script into statements
///
/// Unbalanced closing braces are ignored; unclosed blocks end at EOF.
pub fn statements(source: &str) -> Vec<Statement> {
    let mut out = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut start_line = 1;
    let mut line = 1;

    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if current.trim().is_empty() {
                    start_line = line;
                }
                current.push(c);
                while let Some(s) = chars.next() {
                    current.push(s);
                    match s {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                current.push(escaped);
                            }
                        }
                        '"' => break,
                        '\n' => line += 1,
                        _ => {}
                    }
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                for s in chars.by_ref() {
                    if s == '\n' {
                        flush(&mut out, &path, &mut current, start_line);
                        line += 1;
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for s in chars.by_ref() {
                    if s == '\n' {
                        line += 1;
                    }
                    if prev == '*' && s == '/' {
                        break;
                    }
                    prev = s;
                }
            }
            '{' => {
                path.push(current.trim().to_string());
                current.clear();
            }
            '}' => {
                flush(&mut out, &path, &mut current, start_line);
                path.pop();
            }
            '\n' | ';' => {
                flush(&mut out, &path, &mut current, start_line);
                if c == '\n' {
                    line += 1;
                }
            }
            _ => {
                if current.trim().is_empty() && !c.is_whitespace() {
                    start_line = line;
                }
                current.push(c);
            }
        }
    }
    flush(&mut out, &path, &mut current, start_line);
    out
}

fn flush(out: &mut Vec<Statement>, path: &[String], current: &mut String, line: usize) {
    let text = current.trim();
    if !text.is_empty() {
        out.push(Statement {
            path: path.to_vec(),
            text: text.to_string(),
            line,
        });
    }
    current.clear();
}

/// Right-hand side of an assignment, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Integer literal
    Int(u32),
    /// String literal, unquoted
    Str(String),
    /// Any other expression, kept verbatim
    Expr(String),
}

impl Value {
    /// Classify an expression
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        if let Ok(n) = expr.parse::<u32>() {
            return Value::Int(n);
        }
        match unquote(expr) {
            Some(s) => Value::Str(s.to_string()),
            None => Value::Expr(expr.to_string()),
        }
    }
}

/// Strip surrounding double quotes from a plain string literal
pub fn unquote(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix('"')?.strip_suffix('"')?;
    (!inner.contains('"') && !inner.contains('$')).then_some(inner)
}

/// All plain string literals in an expression, in order
pub fn string_literals(expr: &str) -> Vec<String> {
    expr.split('"')
        .skip(1)
        .step_by(2)
        .map(str::to_string)
        .collect()
}
