//! Built-in tool registry
//!
//! Tools are named capabilities that agent configs can reference. The
//! registry is static; unknown names are skipped at resolution time.

use once_cell::sync::Lazy;
use tracing::warn;

/// A named tool with a single string-in, string-out entry point
pub struct ToolSpec {
    /// Registry name, as referenced by agent configs
    pub name: &'static str,
    /// Human-readable description
    #[allow(dead_code)] // Used in tests
    pub description: &'static str,
    run: fn(&str) -> String,
}

impl ToolSpec {
    /// Run the tool against the given input
    #[allow(dead_code)] // Used in tests
    pub fn invoke(&self, input: &str) -> String {
        (self.run)(input)
    }
}

static TOOLS: Lazy<Vec<ToolSpec>> = Lazy::new(|| {
    vec![
        ToolSpec {
            name: "web_search",
            description: "Search the web for information",
            run: web_search,
        },
        ToolSpec {
            name: "calculator",
            description: "Evaluate a mathematical expression",
            run: calculate,
        },
        ToolSpec {
            name: "file_reader",
            description: "Read the contents of a file",
            run: read_file,
        },
    ]
});

/// All registered tools
#[allow(dead_code)] // Used in tests
pub fn all() -> &'static [ToolSpec] {
    &TOOLS
}

/// Look up a tool by name
pub fn lookup(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|tool| tool.name == name)
}

/// Resolve a list of tool names, skipping any that are not registered
pub fn resolve(names: &[String]) -> Vec<&'static ToolSpec> {
    let mut resolved = Vec::with_capacity(names.len());
    for name in names {
        match lookup(name) {
            Some(tool) => resolved.push(tool),
            None => warn!("Skipping unknown tool: {}", name),
        }
    }
    resolved
}

fn web_search(query: &str) -> String {
    // Placeholder implementation
    format!("Web search results for: {}", query.trim())
}

fn read_file(path: &str) -> String {
    match std::fs::read_to_string(path.trim()) {
        Ok(contents) => contents,
        Err(_) => "File not found or cannot be read".to_string(),
    }
}

fn calculate(expression: &str) -> String {
    let mut parser = ExprParser::new(expression);
    match parser.expr() {
        Some(value) if parser.at_end() && value.is_finite() => format_number(value),
        _ => "Invalid mathematical expression".to_string(),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Recursive descent parser for `+ - * /` with parentheses and unary
/// sign, evaluated over f64
struct ExprParser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&mut self) -> Option<u8> {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        self.input.get(self.pos).copied()
    }

    fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }

    fn expr(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                b'+' => {
                    self.pos += 1;
                    value += self.term()?;
                }
                b'-' => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Some(value)
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.factor()?;
        while let Some(op) = self.peek() {
            match op {
                b'*' => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                b'/' => {
                    self.pos += 1;
                    value /= self.factor()?;
                }
                _ => break,
            }
        }
        Some(value)
    }

    fn factor(&mut self) -> Option<f64> {
        match self.peek()? {
            b'(' => {
                self.pos += 1;
                let value = self.expr()?;
                if self.peek()? != b')' {
                    return None;
                }
                self.pos += 1;
                Some(value)
            }
            b'-' => {
                self.pos += 1;
                Some(-self.factor()?)
            }
            b'+' => {
                self.pos += 1;
                self.factor()
            }
            _ => self.number(),
        }
    }

    fn number(&mut self) -> Option<f64> {
        self.peek();
        let start = self.pos;
        while self.pos < self.input.len()
            && (self.input[self.pos].is_ascii_digit() || self.input[self.pos] == b'.')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }
}
