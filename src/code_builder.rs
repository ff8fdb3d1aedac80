//! Utility struct for generating code that indents and formats it.

use std::cmp::max;
use std::iter;

#[derive(Debug)]
pub struct CodeBuilder {
    code: String,
    indent_level: i32,
    indent_size: i32,
    indent_string: String,
}

impl CodeBuilder {
    /// Adds a single line of code to this code builder, formatting it based on previous code.
    pub fn add_line(&mut self, line: &str) {
        let indent_change =
            (line.matches('{').count() as i32) - (line.matches('}').count() as i32);
        let new_indent_level = max(0, self.indent_level + indent_change);
        // Lines starting with '}' should be de-indented even if they
        // contain '{' after.
        let this_line_indent = if line.starts_with('}') {
            let spaces = (self.indent_size * (self.indent_level - 1)) as usize;
            iter::repeat(" ").take(spaces).collect::<String>()
        } else {
            self.indent_string.clone()
        };

        self.code.push_str(this_line_indent.as_ref());
        self.code.push_str(line.trim());
        self.code.push_str("\n");

        self.indent_level = new_indent_level;
        let spaces = (self.indent_size * new_indent_level) as usize;
        self.indent_string = iter::repeat(" ").take(spaces).collect::<String>();
    }

    /// Adds one or more lines (split by "\n") to this code builder.
    pub fn add(&mut self, code: &str) {
        for l in code.lines() {
            self.add_line(l);
        }
    }

    /// Returns the code in this code builder so far.
    pub fn result(&self) -> &str {
        self.code.as_str()
    }

    /// Returns a new CodeBuilder.
    pub fn new() -> CodeBuilder {
        CodeBuilder::with_indent_size(2)
    }

    /// Returns a new CodeBuilder with the given indent size.
    pub fn with_indent_size(indent_size: i32) -> CodeBuilder {
        CodeBuilder {
            code: String::new(),
            indent_level: 0,
            indent_size,
            indent_string: String::new(),
        }
    }
}

impl Default for CodeBuilder {
    fn default() -> CodeBuilder {
        CodeBuilder::new()
    }
}
