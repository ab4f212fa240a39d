//! config.rs - Configuration surface.
//!
//! `if_realization` picks between two equally-valid lowering strategies for
//! the same statement kind, exposed as a runtime setting rather than a
//! compile-time feature, since a synthesis engine may need to switch
//! strategies per-module in a single process. Unrecognized keys are not
//! modeled at all (there is no generic key/value map); callers construct
//! the struct directly or via [`SynthesisConfig::default`].

/// How an `if` statement is realized in gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IfRealization {
    /// Lower the condition to a single control line and push/pop it around
    /// the then/else branches. Cheap in lines, expensive in nested-control
    /// blow-up.
    #[default]
    Controlled,
    /// Duplicate every variable the `then` branch modifies, lower both
    /// branches unconditionally, then swap the duplicate in under a single
    /// control. Expensive in lines, flat in control count.
    Duplication,
}

/// Pattern for naming circuit lines, taking a variable name, bit index, and
/// array-subscript string. Stored as a
/// formatting callback rather than a template string so callers aren't
/// forced into a mini templating language for a three-field substitution.
pub type LineNameFormat = fn(var: &str, bit: usize, subscript: &str) -> String;

fn default_line_name_format(var: &str, bit: usize, subscript: &str) -> String {
    if subscript.is_empty() {
        format!("{var}.{bit}")
    } else {
        format!("{var}[{subscript}].{bit}")
    }
}

/// Synthesis configuration. Unrecognized keys don't arise here
/// since this is a typed struct, not a key/value map; every field below has
/// a documented default.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisConfig {
    /// Pattern for naming lines.
    pub line_name_format: LineNameFormat,
    /// Threshold for the merging increment/decrement variant. Values below
    /// 2 disable merging.
    pub crement_merge_line_count: u32,
    /// Which IF realization to use.
    pub if_realization: IfRealization,
    /// Enable CCT control hoisting: fold multiple active controls into one
    /// ancilla when that's cheaper than fanning them out onto every gate.
    pub efficient_controls: bool,
    /// Emit called modules as reusable sub-circuits rather than inlining.
    pub modules_hierarchy: bool,
    /// Name of the entry module. `None` means "first module in program".
    pub main_module: Option<String>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            line_name_format: default_line_name_format,
            crement_merge_line_count: 0,
            if_realization: IfRealization::default(),
            efficient_controls: false,
            modules_hierarchy: false,
            main_module: Some("main".to_string()),
        }
    }
}
