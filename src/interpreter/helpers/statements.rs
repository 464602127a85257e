//! Statement execution helpers for the interpreter.
//!
//! Consolidates the common pattern of executing a list of statements
//! and accumulating their output.

use crate::interpreter::errors::{
    BreakError, ContinueError, ErrexitError, ExecutionLimitError,
    ExitError, ReturnError, SubshellExitError,
};
use crate::interpreter::types::ExecResult;

/// Check if an error is a scope exit error (break, continue, return).
pub fn is_scope_exit_error<E: std::error::Error>(error: &E) -> bool {
    let msg = error.to_string();
    msg.contains("break") || msg.contains("continue") || msg.contains("return")
}

/// Trait for errors that can have output prepended.
pub trait PrependOutput {
    fn prepend_output(&mut self, stdout: &str, stderr: &str);
}

impl PrependOutput for BreakError {
    fn prepend_output(&mut self, stdout: &str, stderr: &str) {
        self.stdout = format!("{}{}", stdout, self.stdout);
        self.stderr = format!("{}{}", stderr, self.stderr);
    }
}

impl PrependOutput for ContinueError {
    fn prepend_output(&mut self, stdout: &str, stderr: &str) {
        self.stdout = format!("{}{}", stdout, self.stdout);
        self.stderr = format!("{}{}", stderr, self.stderr);
    }
}

impl PrependOutput for ReturnError {
    fn prepend_output(&mut self, stdout: &str, stderr: &str) {
        self.stdout = format!("{}{}", stdout, self.stdout);
        self.stderr = format!("{}{}", stderr, self.stderr);
    }
}

impl PrependOutput for ErrexitError {
    fn prepend_output(&mut self, stdout: &str, stderr: &str) {
        self.stdout = format!("{}{}", stdout, self.stdout);
        self.stderr = format!("{}{}", stderr, self.stderr);
    }
}

impl PrependOutput for ExitError {
    fn prepend_output(&mut self, stdout: &str, stderr: &str) {
        self.stdout = format!("{}{}", stdout, self.stdout);
        self.stderr = format!("{}{}", stderr, self.stderr);
    }
}

impl PrependOutput for ExecutionLimitError {
    fn prepend_output(&mut self, stdout: &str, stderr: &str) {
        self.stdout = format!("{}{}", stdout, self.stdout);
        self.stderr = format!("{}{}", stderr, self.stderr);
    }
}

impl PrependOutput for SubshellExitError {
    fn prepend_output(&mut self, stdout: &str, stderr: &str) {
        self.stdout = format!("{}{}", stdout, self.stdout);
        self.stderr = format!("{}{}", stderr, self.stderr);
    }
}

/// Accumulated result from executing multiple statements.
#[derive(Debug, Clone, Default)]
pub struct StatementsResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl StatementsResult {
    /// Create a new statements result.
    pub fn new(stdout: String, stderr: String, exit_code: i32) -> Self {
        Self { stdout, stderr, exit_code }
    }

    /// Create from an ExecResult.
    pub fn from_exec_result(result: &ExecResult) -> Self {
        Self {
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
            exit_code: result.exit_code,
        }
    }

    /// Append another result's output.
    pub fn append(&mut self, result: &ExecResult) {
        self.stdout.push_str(&result.stdout);
        self.stderr.push_str(&result.stderr);
        self.exit_code = result.exit_code;
    }

    /// Convert to ExecResult.
    pub fn to_exec_result(&self) -> ExecResult {
        ExecResult {
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
            exit_code: self.exit_code,
            env: None,
        }
    }
}
