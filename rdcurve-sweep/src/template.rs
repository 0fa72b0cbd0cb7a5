//! Structured encoder invocation templates
//!
//! Encoder command lines are parsed once into an ordered argument list with
//! typed substitution points, then rendered into a [`std::process::Command`]
//! per quality level. Substitution happens argument-by-argument with no
//! shell involved.

use std::path::Path;
use std::process::Command;

use crate::{Result, SweepError};

/// A single argument slot in an encoder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateArg {
    /// Fixed argument passed through unchanged.
    Literal(String),
    /// Replaced with the source video path.
    Input,
    /// Replaced with the encoded artifact path.
    Output,
    /// Replaced with the quality (CRF) value.
    Quality,
}

/// Parsed encoder invocation with typed substitution points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeTemplate {
    program: String,
    args: Vec<TemplateArg>,
}

impl EncodeTemplate {
    /// Parse a whitespace-separated command line, recognising the
    /// `{input}`, `{output}` and `{crf}` placeholder tokens.
    ///
    /// All three placeholders must appear exactly as standalone tokens;
    /// templates missing any of them are rejected.
    pub fn parse(command: &str) -> Result<Self> {
        let mut tokens = command.split_whitespace();
        let program = tokens
            .next()
            .ok_or_else(|| SweepError::Template("empty command".to_string()))?
            .to_string();

        let mut args = Vec::new();
        let (mut has_input, mut has_output, mut has_quality) = (false, false, false);
        for token in tokens {
            let arg = match token {
                "{input}" => {
                    has_input = true;
                    TemplateArg::Input
                }
                "{output}" => {
                    has_output = true;
                    TemplateArg::Output
                }
                "{crf}" => {
                    has_quality = true;
                    TemplateArg::Quality
                }
                literal => TemplateArg::Literal(literal.to_string()),
            };
            args.push(arg);
        }

        for (present, placeholder) in [
            (has_input, "{input}"),
            (has_output, "{output}"),
            (has_quality, "{crf}"),
        ] {
            if !present {
                return Err(SweepError::Template(format!(
                    "missing {placeholder} placeholder"
                )));
            }
        }

        Ok(Self { program, args })
    }

    /// Program this template invokes.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Ordered argument slots.
    pub fn args(&self) -> &[TemplateArg] {
        &self.args
    }

    /// Render a runnable command for one quality level.
    pub fn command(&self, input: &Path, output: &Path, crf: u32) -> Command {
        let mut cmd = Command::new(&self.program);
        for arg in &self.args {
            match arg {
                TemplateArg::Literal(s) => cmd.arg(s),
                TemplateArg::Input => cmd.arg(input),
                TemplateArg::Output => cmd.arg(output),
                TemplateArg::Quality => cmd.arg(crf.to_string()),
            };
        }
        cmd
    }

    /// Reconstruct the command line with placeholders, for run records.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(match arg {
                TemplateArg::Literal(s) => s,
                TemplateArg::Input => "{input}",
                TemplateArg::Output => "{output}",
                TemplateArg::Quality => "{crf}",
            });
        }
        line
    }
}
