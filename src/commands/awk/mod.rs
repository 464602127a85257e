// src/commands/awk/mod.rs
pub mod builtins;
pub mod coercion;
pub mod context;
pub mod expressions;
pub mod fields;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod statements;
pub mod types;
pub mod variables;

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};
use context::AwkContext;
use interpreter::AwkInterpreter;

pub struct AwkCommand;

#[async_trait]
impl Command for AwkCommand {
    fn name(&self) -> &'static str {
        "awk"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut fs_sep: Option<String> = None;
        let mut program_text: Option<String> = None;
        let mut files: Vec<String> = Vec::new();

        let mut i = 0;
        while i < ctx.args.len() {
            let arg = &ctx.args[i];
            match arg.as_str() {
                "-F" => {
                    i += 1;
                    if let Some(v) = ctx.args.get(i) {
                        fs_sep = Some(v.clone());
                    }
                }
                _ if arg.starts_with("-F") && arg.len() > 2 => {
                    fs_sep = Some(arg[2..].to_string());
                }
                _ if program_text.is_none() => {
                    program_text = Some(arg.clone());
                }
                _ => files.push(arg.clone()),
            }
            i += 1;
        }

        let program_text = match program_text {
            Some(p) => p,
            None => return CommandResult::error("awk: no program text\n".to_string()),
        };

        let program = match parser::parse(&program_text) {
            Ok(p) => p,
            Err(e) => return CommandResult::error(format!("awk: syntax error: {}\n", e)),
        };

        let awk_ctx = match &fs_sep {
            Some(sep) => AwkContext::with_fs(sep),
            None => AwkContext::new(),
        };

        let mut interp = AwkInterpreter::new(awk_ctx, program);
        interp.execute_begin();

        if files.is_empty() {
            for line in ctx.stdin.split('\n') {
                interp.execute_line(line);
            }
        } else {
            for file in &files {
                let path = ctx.fs.resolve_path(&ctx.cwd, file);
                match ctx.fs.read_file(&path).await {
                    Ok(content) => {
                        for line in content.split('\n') {
                            interp.execute_line(line);
                        }
                    }
                    Err(_) => {
                        return CommandResult::with_exit_code(
                            interp.get_output().to_string(),
                            format!("awk: can't open file {}\n", file),
                            2,
                        );
                    }
                }
            }
        }

        interp.execute_end();
        CommandResult::with_exit_code(
            interp.get_output().to_string(),
            String::new(),
            interp.get_exit_code(),
        )
    }
}
