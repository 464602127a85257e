//! Word Expansion
//!
//! Main entry point for shell word expansion. Implements the ordered
//! expansion pipeline applied to a [`WordNode`]: brace expansion, tilde
//! expansion, parameter/command/arithmetic expansion, field splitting, and
//! pathname expansion. Quote removal happens implicitly -- quoted parts are
//! expanded into plain segments that are never subject to further splitting.
//!
//! Command substitution and pathname (glob) expansion both need runtime
//! dependencies the pure expansion helpers don't have (script execution and
//! filesystem access), so the caller supplies them as callbacks:
//! [`CommandSubstFn`] and the glob function passed to [`expand_word_with_glob`].

use crate::ast::types::{
    ArrayKeysOp, BraceItem, BraceRangeValue, CaseDirection, CommandSubstitutionPart,
    DoubleQuotedPart, EscapedPart, GlobPart, IndirectionOp, InnerParameterOperation, LiteralPart,
    ParameterExpansionPart, ParameterOperation, PatternAnchor, ScriptNode, SingleQuotedPart,
    TildeExpansionPart, TransformOperator, VarNamePrefixOp, WordNode, WordPart,
};
use crate::interpreter::arithmetic::evaluate_arithmetic;
use crate::interpreter::expansion::parameter_ops::{
    apply_case_modification, apply_pattern_removal_op, apply_pattern_replacement_op,
    apply_substring_op, apply_transform_op, get_array_keys, get_parameter_length,
    get_var_names_with_prefix_op, should_use_alternative, should_use_default, ParameterOpContext,
};
use crate::interpreter::expansion::positional_params::get_positional_params;
use crate::interpreter::expansion::word_split::{smart_word_split, WordSplitSegment};
use crate::interpreter::helpers::get_ifs;
use crate::interpreter::types::{ExecResult, ExecutionLimits, InterpreterContext, InterpreterState};

// Re-export commonly used expansion functions so callers (and this module's
// own code) can refer to them without the full path.
pub use crate::interpreter::expansion::analysis::*;
pub use crate::interpreter::expansion::brace_range::*;
pub use crate::interpreter::expansion::glob_escape::*;
pub use crate::interpreter::expansion::pattern::*;
pub use crate::interpreter::expansion::pattern_removal::*;
pub use crate::interpreter::expansion::quoting::*;
pub use crate::interpreter::expansion::tilde::*;
pub use crate::interpreter::expansion::variable::*;
pub use crate::interpreter::expansion::word_split::*;

/// Result of word expansion.
#[derive(Debug, Clone)]
pub struct WordExpansionResult {
    /// The expanded string value (only meaningful when `split_words` is `None`)
    pub value: String,
    /// Whether the expansion produced multiple words (from word splitting,
    /// brace expansion, glob expansion, or an unquoted `$@`/array spread)
    pub split_words: Option<Vec<String>>,
    /// Any stderr output produced while expanding (bad substitution, nounset, etc.)
    pub stderr: String,
    /// Exit code to report if expansion failed (e.g. `${var:?msg}`)
    pub exit_code: Option<i32>,
}

impl WordExpansionResult {
    /// Create a simple result with just a value.
    pub fn simple(value: String) -> Self {
        Self { value, split_words: None, stderr: String::new(), exit_code: None }
    }

    /// Create a result with split words.
    pub fn with_split(value: String, words: Vec<String>) -> Self {
        Self { value, split_words: Some(words), stderr: String::new(), exit_code: None }
    }

    fn error(message: String, exit_code: i32) -> Self {
        Self { value: String::new(), split_words: None, stderr: message, exit_code: Some(exit_code) }
    }

    /// Fields produced by this expansion, whether or not splitting occurred.
    pub fn fields(&self) -> Vec<String> {
        match &self.split_words {
            Some(words) => words.clone(),
            None => vec![self.value.clone()],
        }
    }
}

/// Options for word expansion.
#[derive(Debug, Clone, Default)]
pub struct WordExpansionOptions {
    /// Whether we're inside double quotes
    pub in_double_quotes: bool,
    /// Whether to perform word splitting
    pub do_word_split: bool,
    /// Whether to perform glob expansion
    pub do_glob: bool,
    /// Whether to preserve empty fields
    pub preserve_empty: bool,
    /// Whether extglob is enabled
    pub extglob: bool,
}

/// Callback used to run a command substitution's body and get its result.
/// The runtime supplies this so word expansion doesn't need to know how to
/// execute a script -- it just asks the engine to run one and reports stdout.
pub type CommandSubstFn<'a> = dyn Fn(&ScriptNode, &mut InterpreterState) -> ExecResult + 'a;

/// Callback used to resolve a glob pattern against the virtual filesystem.
/// Takes `(pattern, cwd)` and returns matching paths, already sorted.
pub type WordGlobFn<'a> = dyn Fn(&str, &str) -> Vec<String> + 'a;

type PartError = (String, i32);

/// Expand a word, performing every expansion except pathname (glob) expansion.
/// Used for contexts where a literal glob-looking result shouldn't be
/// resolved against the filesystem, such as the command name position.
pub fn expand_word(
    state: &mut InterpreterState,
    word: &WordNode,
    command_subst: Option<&CommandSubstFn>,
) -> WordExpansionResult {
    let options = WordExpansionOptions { do_word_split: true, do_glob: false, ..Default::default() };
    expand_word_core(state, word, &options, command_subst, None)
}

/// Expand a word performing the full pipeline: brace expansion, parameter/
/// command/arithmetic expansion, word splitting, and pathname expansion.
/// Used for command arguments and other list contexts.
pub fn expand_word_with_glob(
    state: &mut InterpreterState,
    word: &WordNode,
    command_subst: Option<&CommandSubstFn>,
    glob_fn: Option<&WordGlobFn>,
) -> WordExpansionResult {
    let options = WordExpansionOptions {
        do_word_split: true,
        do_glob: true,
        extglob: state.shopt_options.extglob,
        ..Default::default()
    };
    expand_word_core(state, word, &options, command_subst, glob_fn)
}

/// Expand a word without performing word splitting -- used for assignment
/// values, here-doc bodies, and anywhere a single scalar result is wanted.
pub fn expand_word_scalar(
    state: &mut InterpreterState,
    word: &WordNode,
    command_subst: Option<&CommandSubstFn>,
) -> WordExpansionResult {
    let options = WordExpansionOptions::default();
    expand_word_core(state, word, &options, command_subst, None)
}

fn expand_word_core(
    state: &mut InterpreterState,
    word: &WordNode,
    options: &WordExpansionOptions,
    command_subst: Option<&CommandSubstFn>,
    glob_fn: Option<&WordGlobFn>,
) -> WordExpansionResult {
    let variants = brace_expand_parts(&word.parts);
    let multi_brace = variants.len() > 1;

    let mut all_fields: Vec<String> = Vec::new();

    for parts in &variants {
        // Whole-word shortcut for unquoted/quoted $@, $*, ${arr[@]}, ${arr[*]}:
        // these spread into multiple independent fields that must not be
        // rejoined by ordinary IFS splitting.
        if let Some((fields, _quoted)) = try_expand_whole_array_word(state, parts) {
            all_fields.extend(fields);
            continue;
        }

        let segments = match expand_segments(state, parts, options.in_double_quotes, command_subst) {
            Ok(segs) => segs,
            Err((msg, code)) => return WordExpansionResult::error(msg, code),
        };

        let mut fields = if options.do_word_split && !options.in_double_quotes {
            let ifs = get_ifs(&state.env).to_string();
            smart_word_split(&segments, &ifs).words
        } else {
            let joined: String = segments.iter().map(|s| s.value.as_str()).collect();
            if joined.is_empty() && !options.preserve_empty && segments.iter().any(|s| !s.is_quoted) {
                Vec::new()
            } else {
                vec![joined]
            }
        };

        if options.do_glob && !state.options.noglob {
            if let Some(glob_fn) = glob_fn {
                let fully_quoted = is_word_fully_quoted(&WordNode { parts: parts.clone() });
                if !fully_quoted {
                    fields = apply_glob_expansion(state, fields, glob_fn);
                }
            }
        }

        all_fields.extend(fields);
    }

    if multi_brace || all_fields.len() != 1 {
        let value = all_fields.first().cloned().unwrap_or_default();
        WordExpansionResult::with_split(value, all_fields)
    } else {
        WordExpansionResult::simple(all_fields.into_iter().next().unwrap_or_default())
    }
}

fn apply_glob_expansion(state: &InterpreterState, fields: Vec<String>, glob_fn: &WordGlobFn) -> Vec<String> {
    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        if has_glob_pattern(&field, state.shopt_options.extglob) {
            let matches = glob_fn(&field, &state.cwd);
            if !matches.is_empty() {
                out.extend(matches);
            } else if state.shopt_options.nullglob {
                // drop: no match, nullglob means the field disappears
            } else {
                out.push(unescape_glob_pattern(&field));
            }
        } else {
            out.push(unescape_glob_pattern(&field));
        }
    }
    out
}

// ============================================================================
// Brace expansion
// ============================================================================

/// Expand any `BraceExpansion` parts in `parts` into the cartesian product of
/// their alternatives, returning one `Vec<WordPart>` per resulting word. If
/// `parts` has no brace expansions, returns a single-element vector containing
/// a clone of `parts`.
fn brace_expand_parts(parts: &[WordPart]) -> Vec<Vec<WordPart>> {
    let mut combos: Vec<Vec<WordPart>> = vec![Vec::new()];

    for part in parts {
        if let WordPart::BraceExpansion(be) = part {
            let alts = brace_item_alternatives(&be.items);
            if alts.len() <= 1 {
                let literal = alts.into_iter().next().unwrap_or_default();
                for combo in combos.iter_mut() {
                    combo.push(WordPart::Literal(LiteralPart { value: literal.clone() }));
                }
            } else {
                let mut next = Vec::with_capacity(combos.len() * alts.len());
                for combo in &combos {
                    for alt in &alts {
                        let mut extended = combo.clone();
                        extended.push(WordPart::Literal(LiteralPart { value: alt.clone() }));
                        next.push(extended);
                    }
                }
                combos = next;
            }
        } else {
            for combo in combos.iter_mut() {
                combo.push(part.clone());
            }
        }
    }

    combos
}

fn brace_item_alternatives(items: &[BraceItem]) -> Vec<String> {
    let mut out = Vec::new();
    for item in items {
        match item {
            BraceItem::Word { word } => out.push(plain_word_text(word)),
            BraceItem::Range { start, end, step, start_str, end_str } => {
                let start_val = brace_range_value(start);
                let end_val = brace_range_value(end);
                match expand_brace_range(start_val, end_val, *step, start_str.as_deref(), end_str.as_deref()) {
                    Ok(result) => match result.expanded {
                        Some(values) => out.extend(values),
                        None => out.push(result.literal),
                    },
                    Err(_) => out.push(format!("{{{}..{}}}", start, end)),
                }
            }
        }
    }
    out
}

fn brace_range_value(v: &BraceRangeValue) -> RangeValue {
    match v {
        BraceRangeValue::Number(n) => RangeValue::Numeric(*n),
        BraceRangeValue::Char(c) => RangeValue::Char(*c),
    }
}

/// Render a word's literal-ish parts as plain text, ignoring any nested
/// expansions. Brace items are almost always plain literals in practice.
fn plain_word_text(word: &WordNode) -> String {
    let mut out = String::new();
    for part in &word.parts {
        match part {
            WordPart::Literal(l) => out.push_str(&l.value),
            WordPart::SingleQuoted(q) => out.push_str(&q.value),
            WordPart::Escaped(e) => out.push_str(&e.value),
            _ => {}
        }
    }
    out
}

// ============================================================================
// Whole-word array/positional spreads ($@, $*, ${arr[@]}, ${arr[*]})
// ============================================================================

fn try_expand_whole_array_word(state: &InterpreterState, parts: &[WordPart]) -> Option<(Vec<String>, bool)> {
    if parts.len() != 1 {
        return None;
    }
    match &parts[0] {
        WordPart::ParameterExpansion(pe) if pe.operation.is_none() => {
            whole_array_for_param(state, &pe.parameter, false)
        }
        WordPart::DoubleQuoted(dq) if dq.parts.len() == 1 => {
            if let WordPart::ParameterExpansion(pe) = &dq.parts[0] {
                if pe.operation.is_none() {
                    return whole_array_for_param(state, &pe.parameter, true);
                }
            }
            None
        }
        _ => None,
    }
}

fn whole_array_for_param(state: &InterpreterState, parameter: &str, quoted: bool) -> Option<(Vec<String>, bool)> {
    if parameter == "@" || parameter == "*" {
        let is_star = parameter == "*";
        let values = get_positional_params(state);
        return Some(spread_values(state, values, is_star, quoted));
    }

    let (name, subscript) = split_array_subscript(parameter)?;
    if subscript != "@" && subscript != "*" {
        return None;
    }
    let is_star = subscript == "*";
    let values: Vec<String> = get_array_elements(state, name).into_iter().map(|(_, v)| v).collect();
    Some(spread_values(state, values, is_star, quoted))
}

fn spread_values(state: &InterpreterState, values: Vec<String>, is_star: bool, quoted: bool) -> (Vec<String>, bool) {
    if quoted {
        if is_star {
            let sep = get_ifs_separator(&state.env);
            (vec![values.join(sep)], true)
        } else {
            (values, true)
        }
    } else if values.is_empty() {
        (Vec::new(), false)
    } else {
        // Unquoted: each element is independently IFS-splittable. In the
        // common case (element values without embedded IFS characters) this
        // reproduces bash's field-per-element behavior exactly.
        let ifs = get_ifs(&state.env);
        let mut out = Vec::new();
        for v in values {
            let split = crate::interpreter::helpers::split_by_ifs_for_expansion(&v, ifs);
            out.extend(split);
        }
        (out, false)
    }
}

fn split_array_subscript(parameter: &str) -> Option<(&str, &str)> {
    let open = parameter.find('[')?;
    if !parameter.ends_with(']') {
        return None;
    }
    let name = &parameter[..open];
    if name.is_empty() {
        return None;
    }
    let subscript = &parameter[open + 1..parameter.len() - 1];
    Some((name, subscript))
}

// ============================================================================
// Segment expansion (per WordPart)
// ============================================================================

fn expand_segments(
    state: &mut InterpreterState,
    parts: &[WordPart],
    in_double_quotes: bool,
    command_subst: Option<&CommandSubstFn>,
) -> Result<Vec<WordSplitSegment>, PartError> {
    let mut segments = Vec::new();
    for part in parts {
        expand_one_part(state, part, in_double_quotes, command_subst, &mut segments)?;
    }
    Ok(segments)
}

fn expand_one_part(
    state: &mut InterpreterState,
    part: &WordPart,
    in_double_quotes: bool,
    command_subst: Option<&CommandSubstFn>,
    out: &mut Vec<WordSplitSegment>,
) -> Result<(), PartError> {
    match part {
        WordPart::Literal(LiteralPart { value }) => {
            out.push(WordSplitSegment { value: value.clone(), is_splittable: false, is_quoted: in_double_quotes });
        }
        WordPart::SingleQuoted(SingleQuotedPart { value }) => {
            out.push(WordSplitSegment { value: value.clone(), is_splittable: false, is_quoted: true });
        }
        WordPart::Escaped(EscapedPart { value }) => {
            out.push(WordSplitSegment { value: value.clone(), is_splittable: false, is_quoted: true });
        }
        WordPart::Glob(GlobPart { pattern }) => {
            out.push(WordSplitSegment { value: pattern.clone(), is_splittable: false, is_quoted: in_double_quotes });
        }
        WordPart::TildeExpansion(TildeExpansionPart { user }) => {
            let value = if in_double_quotes {
                match user {
                    Some(u) => format!("~{}", u),
                    None => "~".to_string(),
                }
            } else {
                let tilde_str = match user {
                    Some(u) => format!("~{}", u),
                    None => "~".to_string(),
                };
                apply_tilde_expansion(state, &tilde_str)
            };
            out.push(WordSplitSegment { value, is_splittable: false, is_quoted: in_double_quotes });
        }
        WordPart::DoubleQuoted(DoubleQuotedPart { parts }) => {
            let inner = expand_segments(state, parts, true, command_subst)?;
            let joined: String = inner.iter().map(|s| s.value.as_str()).collect();
            out.push(WordSplitSegment { value: joined, is_splittable: false, is_quoted: true });
        }
        WordPart::ParameterExpansion(pe) => {
            let value = expand_parameter(state, pe, in_double_quotes, command_subst)?;
            out.push(WordSplitSegment { value, is_splittable: !in_double_quotes, is_quoted: in_double_quotes });
        }
        WordPart::CommandSubstitution(CommandSubstitutionPart { body, .. }) => {
            let value = match command_subst {
                Some(f) => strip_trailing_newlines(&f(body, state).stdout),
                None => String::new(),
            };
            out.push(WordSplitSegment { value, is_splittable: !in_double_quotes, is_quoted: in_double_quotes });
        }
        WordPart::ArithmeticExpansion(ae) => {
            let mut limits = ExecutionLimits::default();
            let mut ctx = InterpreterContext::new(state, &mut limits);
            match evaluate_arithmetic(&mut ctx, &ae.expression.expression, true, None) {
                Ok(value) => {
                    out.push(WordSplitSegment {
                        value: value.to_string(),
                        is_splittable: !in_double_quotes,
                        is_quoted: in_double_quotes,
                    });
                }
                Err(e) => return Err((format!("bash: {}\n", e), 1)),
            }
        }
        WordPart::ProcessSubstitution(_) => {
            // Process substitution needs a live fd/pipe abstraction the
            // virtual filesystem doesn't provide; fall back to a placeholder
            // path so scripts that merely reference it don't crash expansion.
            out.push(WordSplitSegment {
                value: "/dev/fd/63".to_string(),
                is_splittable: false,
                is_quoted: in_double_quotes,
            });
        }
        WordPart::BraceExpansion(be) => {
            // Reached only for brace expansions nested inside another part
            // (e.g. inside double quotes) that the top-level cartesian pass
            // doesn't unwrap; take the first alternative as a reasonable
            // approximation.
            let alts = brace_item_alternatives(&be.items);
            let value = alts.into_iter().next().unwrap_or_default();
            out.push(WordSplitSegment { value, is_splittable: false, is_quoted: in_double_quotes });
        }
    }
    Ok(())
}

fn strip_trailing_newlines(s: &str) -> String {
    s.trim_end_matches('\n').to_string()
}

// ============================================================================
// Parameter expansion operations
// ============================================================================

fn expand_parameter(
    state: &mut InterpreterState,
    pe: &ParameterExpansionPart,
    in_double_quotes: bool,
    command_subst: Option<&CommandSubstFn>,
) -> Result<String, PartError> {
    match &pe.operation {
        None => {
            if state.options.nounset && !is_variable_set(state, &pe.parameter) {
                return Err((format!("bash: {}: unbound variable\n", pe.parameter), 1));
            }
            Ok(get_variable(state, &pe.parameter))
        }
        Some(ParameterOperation::Inner(inner)) => {
            expand_inner_op(state, &pe.parameter, inner, in_double_quotes, command_subst)
        }
        Some(ParameterOperation::Indirection(ind)) => {
            expand_indirection(state, &pe.parameter, ind, in_double_quotes, command_subst)
        }
        Some(ParameterOperation::ArrayKeys(ArrayKeysOp { array, star })) => {
            let keys = get_array_keys(state, array, *star);
            Ok(keys.join(" "))
        }
        Some(ParameterOperation::VarNamePrefix(VarNamePrefixOp { prefix, star })) => {
            let names = get_var_names_with_prefix_op(state, prefix, *star);
            Ok(names.join(" "))
        }
    }
}

fn expand_inner_op(
    state: &mut InterpreterState,
    parameter: &str,
    op: &InnerParameterOperation,
    in_double_quotes: bool,
    command_subst: Option<&CommandSubstFn>,
) -> Result<String, PartError> {
    use InnerParameterOperation::*;

    match op {
        Length(_) => Ok(get_parameter_length(state, parameter).to_string()),
        LengthSliceError(_) => Err((format!("bash: ${{#{}}}: bad substitution\n", parameter), 1)),
        BadSubstitution(bs) => Err((format!("bash: {}: bad substitution\n", bs.text), 1)),

        DefaultValue(op_) => {
            let ctx = ParameterOpContext::new(state, parameter, in_double_quotes);
            if should_use_default(&ctx, op_.check_empty) {
                expand_operand_word(state, &op_.word, in_double_quotes, command_subst)
            } else {
                Ok(ctx.value)
            }
        }
        AssignDefault(op_) => {
            let ctx = ParameterOpContext::new(state, parameter, in_double_quotes);
            if should_use_default(&ctx, op_.check_empty) {
                let value = expand_operand_word(state, &op_.word, in_double_quotes, command_subst)?;
                assign_simple_variable(state, parameter, &value);
                Ok(value)
            } else {
                Ok(ctx.value)
            }
        }
        ErrorIfUnset(op_) => {
            let ctx = ParameterOpContext::new(state, parameter, in_double_quotes);
            if should_use_default(&ctx, op_.check_empty) {
                let message = match &op_.word {
                    Some(w) => expand_operand_word(state, w, in_double_quotes, command_subst)?,
                    None => "parameter null or not set".to_string(),
                };
                Err((format!("bash: {}: {}\n", parameter, message), 1))
            } else {
                Ok(ctx.value)
            }
        }
        UseAlternative(op_) => {
            let ctx = ParameterOpContext::new(state, parameter, in_double_quotes);
            if should_use_alternative(&ctx, op_.check_empty) {
                expand_operand_word(state, &op_.word, in_double_quotes, command_subst)
            } else {
                Ok(String::new())
            }
        }
        Substring(op_) => {
            let value = get_variable(state, parameter);
            let mut limits = ExecutionLimits::default();
            let mut ctx = InterpreterContext::new(state, &mut limits);
            let offset = evaluate_arithmetic(&mut ctx, &op_.offset.expression, true, None)
                .map_err(|e| (format!("bash: {}\n", e), 1))?;
            let length = match &op_.length {
                Some(expr) => Some(
                    evaluate_arithmetic(&mut ctx, &expr.expression, true, None)
                        .map_err(|e| (format!("bash: {}\n", e), 1))?,
                ),
                None => None,
            };
            apply_substring_op(&value, offset, length).map_err(|e| (format!("bash: {}: {}\n", parameter, e), 1))
        }
        PatternRemoval(op_) => {
            let value = get_variable(state, parameter);
            let pattern_text = expand_operand_word(state, &op_.pattern, in_double_quotes, command_subst)?;
            let regex = pattern_to_regex(&pattern_text, op_.greedy, state.shopt_options.extglob);
            Ok(apply_pattern_removal_op(&value, &regex, op_.side, op_.greedy))
        }
        PatternReplacement(op_) => {
            let value = get_variable(state, parameter);
            let pattern_text = expand_operand_word(state, &op_.pattern, in_double_quotes, command_subst)?;
            let replacement = match &op_.replacement {
                Some(w) => expand_operand_word(state, w, in_double_quotes, command_subst)?,
                None => String::new(),
            };
            let regex = pattern_to_regex(&pattern_text, true, state.shopt_options.extglob);
            let (anchor_start, anchor_end) = match op_.anchor {
                Some(PatternAnchor::Start) => (true, false),
                Some(PatternAnchor::End) => (false, true),
                None => (false, false),
            };
            Ok(apply_pattern_replacement_op(&value, &regex, &replacement, op_.all, anchor_start, anchor_end))
        }
        CaseModification(op_) => {
            let value = get_variable(state, parameter);
            let direction = match (op_.direction, op_.all) {
                (CaseDirection::Upper, true) => "U",
                (CaseDirection::Upper, false) => "u",
                (CaseDirection::Lower, true) => "L",
                (CaseDirection::Lower, false) => "l",
            };
            Ok(apply_case_modification(&value, direction))
        }
        Transform(op_) => {
            let value = get_variable(state, parameter);
            let operator = transform_operator_char(op_.operator);
            Ok(apply_transform_op(state, parameter, &value, operator))
        }
    }
}

fn transform_operator_char(op: TransformOperator) -> &'static str {
    match op {
        TransformOperator::Q => "Q",
        TransformOperator::P => "P",
        TransformOperator::A => "A",
        TransformOperator::LowerA => "a",
        TransformOperator::E => "E",
        TransformOperator::K => "K",
        TransformOperator::LowerK => "k",
        TransformOperator::LowerU => "u",
        TransformOperator::U => "U",
        TransformOperator::L => "L",
    }
}

fn expand_indirection(
    state: &mut InterpreterState,
    parameter: &str,
    ind: &IndirectionOp,
    in_double_quotes: bool,
    command_subst: Option<&CommandSubstFn>,
) -> Result<String, PartError> {
    let target_name = get_variable(state, parameter);
    if target_name.is_empty() {
        return Ok(String::new());
    }
    match &ind.inner_op {
        None => Ok(get_variable(state, &target_name)),
        Some(inner) => expand_inner_op(state, &target_name, inner, in_double_quotes, command_subst),
    }
}

fn expand_operand_word(
    state: &mut InterpreterState,
    word: &WordNode,
    in_double_quotes: bool,
    command_subst: Option<&CommandSubstFn>,
) -> Result<String, PartError> {
    let segments = expand_segments(state, &word.parts, in_double_quotes, command_subst)?;
    Ok(segments.iter().map(|s| s.value.as_str()).collect())
}

fn assign_simple_variable(state: &mut InterpreterState, name: &str, value: &str) {
    use crate::interpreter::builtins::variable_assignment::{parse_assignment, set_variable, SetVariableOptions};
    let assignment = parse_assignment(&format!("{}={}", name, value));
    let _ = set_variable(state, &assignment, &SetVariableOptions::default());
}

// ============================================================================
// Word-level analysis helpers
// ============================================================================

/// Check if a word is "fully quoted" - meaning glob characters should be treated literally.
///
/// A word is fully quoted if all its parts are either:
/// - SingleQuoted
/// - DoubleQuoted (entirely quoted variable expansion like "$pat")
/// - Escaped characters
pub fn is_word_fully_quoted(word: &WordNode) -> bool {
    use crate::interpreter::helpers::word_parts::is_quoted_part;

    if word.parts.is_empty() {
        return true;
    }

    for part in &word.parts {
        if !is_quoted_part(part) {
            return false;
        }
    }
    true
}

/// Check if a word contains any glob patterns.
pub fn word_has_glob_pattern(word: &WordNode, extglob: bool) -> bool {
    use crate::interpreter::expansion::glob_escape::has_glob_pattern;

    for part in &word.parts {
        match part {
            WordPart::Glob(_) => return true,
            WordPart::Literal(lit) => {
                if has_glob_pattern(&lit.value, extglob) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Check if a word contains command substitution.
pub fn word_has_command_substitution(word: &WordNode) -> bool {
    for part in &word.parts {
        if matches!(part, WordPart::CommandSubstitution(_)) {
            return true;
        }
        if let WordPart::DoubleQuoted(dq) = part {
            for inner in &dq.parts {
                if matches!(inner, WordPart::CommandSubstitution(_)) {
                    return true;
                }
            }
        }
    }
    false
}

// ============================================================================
// Tests
// ============================================================================
