//! Declaration syntaxes for the supported config file families.
//!
//! A [`Syntax`] knows how to write a comment and how to lay out a list of
//! `name → value` declarations. What goes into the declarations is decided
//! per target (see [`crate::target`]); the syntax only formats them.
//!
//! | Family | Example output |
//! |---|---|
//! | [`KeyValue`] | `$theme_accent = rgb(ff0000)` |
//! | [`DefineColor`] | `@define-color theme_accent #ff0000;` |
//! | [`BraceBlock`] | `* {` / `    theme-accent: #ff0000ff;` / `}` |

/// A single `name → value` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
}

impl Declaration {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Text marking the start of the managed block (wrapped in a comment).
pub const START_MARKER: &str = ">>> hyprtheme managed block >>>";
/// Text marking the end of the managed block (wrapped in a comment).
pub const END_MARKER: &str = "<<< hyprtheme managed block <<<";

/// Formatting rules of one config file family.
pub trait Syntax {
    /// Wrap `text` in a single-line comment.
    fn comment(&self, text: &str) -> String;

    /// Lines for the body of the managed block, without line breaks.
    fn declarations(&self, decls: &[Declaration]) -> Vec<String>;

    fn start_marker(&self) -> String {
        self.comment(START_MARKER)
    }

    fn end_marker(&self) -> String {
        self.comment(END_MARKER)
    }

    /// The complete managed block: markers, a do-not-edit notice, and
    /// declarations, newline-terminated.
    fn render_block(&self, decls: &[Declaration]) -> String {
        let mut lines = vec![
            self.start_marker(),
            self.comment("Generated by hyprtheme; edits inside this block are overwritten."),
        ];
        lines.extend(self.declarations(decls));
        lines.push(self.end_marker());
        let mut block = lines.join("\n");
        block.push('\n');
        block
    }
}

/// Line-oriented `name = value` assignments with `#` comments
/// (Hyprland and other ini-like files).
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValue;

impl Syntax for KeyValue {
    fn comment(&self, text: &str) -> String {
        format!("# {text}")
    }

    fn declarations(&self, decls: &[Declaration]) -> Vec<String> {
        decls
            .iter()
            .map(|d| format!("{} = {}", d.name, d.value))
            .collect()
    }
}

/// GTK stylesheet color variables: `@define-color name value;`
/// (Waybar, GTK themes).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefineColor;

impl Syntax for DefineColor {
    fn comment(&self, text: &str) -> String {
        format!("/* {text} */")
    }

    fn declarations(&self, decls: &[Declaration]) -> Vec<String> {
        decls
            .iter()
            .map(|d| format!("@define-color {} {};", d.name, d.value))
            .collect()
    }
}

/// Brace-delimited variable block: `selector { name: value; }`
/// (rofi rasi, CSS custom properties).
#[derive(Debug, Clone, Copy)]
pub struct BraceBlock {
    pub selector: &'static str,
}

impl Syntax for BraceBlock {
    fn comment(&self, text: &str) -> String {
        format!("/* {text} */")
    }

    fn declarations(&self, decls: &[Declaration]) -> Vec<String> {
        let mut lines = Vec::with_capacity(decls.len() + 2);
        lines.push(format!("{} {{", self.selector));
        lines.extend(
            decls
                .iter()
                .map(|d| format!("    {}: {};", d.name, d.value)),
        );
        lines.push("}".to_string());
        lines
    }
}
