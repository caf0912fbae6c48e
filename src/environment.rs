use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Variables that drive dispatch rather than display; never substituted.
pub const STRUCTURAL_VARIABLES: [&str; 2] = ["ProjectDirs", "Context"];

#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    Text(String),
    Number(i64),
    List(Vec<String>),
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Text(s) => f.write_str(s),
            Variable::Number(n) => write!(f, "{}", n),
            Variable::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl From<&str> for Variable {
    fn from(value: &str) -> Self {
        Variable::Text(value.to_string())
    }
}

impl From<String> for Variable {
    fn from(value: String) -> Self {
        Variable::Text(value)
    }
}

impl From<i64> for Variable {
    fn from(value: i64) -> Self {
        Variable::Number(value)
    }
}

impl From<Vec<String>> for Variable {
    fn from(value: Vec<String>) -> Self {
        Variable::List(value)
    }
}

/// Cursor position as reported by the editor (zero-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub row: u32,
    pub column: u32,
}

/// What the host editor exposes about the active buffer.
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    pub path: Option<PathBuf>,
    pub cursor: Option<Cursor>,
    pub selection: String,
    pub line_text: String,
    pub word: String,
}

/// Which contextual inputs an invocation can rely on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextFlags {
    pub file: bool,
    pub editor: bool,
    pub position: bool,
}

impl ContextFlags {
    /// Parses a flag string such as `"fep"`; unknown letters are ignored.
    pub fn parse(flags: &str) -> Self {
        Self {
            file: flags.contains('f'),
            editor: flags.contains('e'),
            position: flags.contains('p'),
        }
    }

    /// True when every flag set in `required` is also set here.
    pub fn satisfies(&self, required: &ContextFlags) -> bool {
        (!required.file || self.file)
            && (!required.editor || self.editor)
            && (!required.position || self.position)
    }
}

impl fmt::Display for ContextFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file {
            f.write_str("f")?;
        }
        if self.editor {
            f.write_str("e")?;
        }
        if self.position {
            f.write_str("p")?;
        }
        Ok(())
    }
}

/// Snapshot of the named variables available to one invocation.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: BTreeMap<String, Variable>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the snapshot the way the editor integration sees the world:
    /// a file-backed editor, an editor without a file, or no editor at all.
    pub fn snapshot(editor: Option<&EditorState>, project_dirs: &[PathBuf]) -> Self {
        let dirs: Vec<String> = project_dirs
            .iter()
            .map(|d| d.to_string_lossy().into_owned())
            .collect();

        let mut env = Self::new();
        env.set("ProjectDir", dirs.first().cloned().unwrap_or_default());
        env.set("ProjectDirs", dirs);

        for name in [
            "FilePath",
            "FileName",
            "FileDir",
            "FileExt",
            "FileNameNoExt",
            "ProjectRel",
            "CurRow",
            "CurCol",
            "CurSelected",
            "CurLineText",
            "CurWord",
        ] {
            env.set(name, "");
        }

        let Some(editor) = editor else {
            env.set("Context", "");
            return env;
        };

        let (row, col) = editor
            .cursor
            .map(|c| (c.row as i64, c.column as i64))
            .unwrap_or((0, 0));
        env.set("CurRow", row);
        env.set("CurCol", col);
        env.set("CurSelected", editor.selection.clone());
        if editor.cursor.is_some() {
            env.set("CurLineText", editor.line_text.clone());
            env.set("CurWord", editor.word.clone());
        }

        let mut context = String::new();
        if let Some(path) = editor.path.as_deref() {
            context.push('f');
            env.set_file_variables(path, project_dirs);
        }
        context.push('e');
        if editor.cursor.is_some() {
            context.push('p');
        }
        env.set("Context", context);
        env
    }

    fn set_file_variables(&mut self, path: &Path, project_dirs: &[PathBuf]) {
        let text = |p: Option<&std::ffi::OsStr>| {
            p.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
        };

        self.set("FilePath", path.to_string_lossy().into_owned());
        self.set("FileName", text(path.file_name()));
        self.set(
            "FileDir",
            path.parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        let ext = text(path.extension());
        self.set("FileExt", if ext.is_empty() { ext } else { format!(".{}", ext) });
        self.set("FileNameNoExt", text(path.file_stem()));

        let relative = project_dirs
            .iter()
            .find_map(|dir| path.strip_prefix(dir).ok())
            .unwrap_or(path);
        self.set("ProjectRel", relative.to_string_lossy().into_owned());
    }

    pub fn set(&mut self, name: &str, value: impl Into<Variable>) {
        self.vars.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    /// Looks up a variable eligible for placeholder expansion.
    pub fn substitutable(&self, name: &str) -> Option<&Variable> {
        if STRUCTURAL_VARIABLES.contains(&name) {
            return None;
        }
        self.vars.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.vars.iter()
    }

    pub fn context(&self) -> ContextFlags {
        match self.vars.get("Context") {
            Some(Variable::Text(flags)) => ContextFlags::parse(flags),
            _ => ContextFlags::default(),
        }
    }

    pub fn project_dirs(&self) -> Vec<PathBuf> {
        match self.vars.get("ProjectDirs") {
            Some(Variable::List(dirs)) => dirs.iter().map(PathBuf::from).collect(),
            _ => Vec::new(),
        }
    }

    pub fn project_dir(&self) -> Option<PathBuf> {
        match self.vars.get("ProjectDir") {
            Some(Variable::Text(dir)) if !dir.is_empty() => Some(PathBuf::from(dir)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Vec<PathBuf> {
        vec![PathBuf::from("/work/app"), PathBuf::from("/work/lib")]
    }

    #[test]
    fn test_no_editor_has_empty_context() {
        let env = Environment::snapshot(None, &project());
        assert_eq!(env.context(), ContextFlags::default());
        assert_eq!(env.get("ProjectDir"), Some(&Variable::from("/work/app")));
        assert_eq!(env.get("CurWord"), Some(&Variable::from("")));
        assert_eq!(env.project_dirs().len(), 2);
    }

    #[test]
    fn test_file_editor_with_cursor() {
        let editor = EditorState {
            path: Some(PathBuf::from("/work/app/src/main.c")),
            cursor: Some(Cursor { row: 9, column: 4 }),
            selection: String::new(),
            line_text: "int main() {".to_string(),
            word: "main".to_string(),
        };
        let env = Environment::snapshot(Some(&editor), &project());

        assert_eq!(env.context().to_string(), "fep");
        assert_eq!(env.get("FileName"), Some(&Variable::from("main.c")));
        assert_eq!(env.get("FileExt"), Some(&Variable::from(".c")));
        assert_eq!(env.get("FileNameNoExt"), Some(&Variable::from("main")));
        assert_eq!(env.get("FileDir"), Some(&Variable::from("/work/app/src")));
        assert_eq!(env.get("ProjectRel"), Some(&Variable::from("src/main.c")));
        assert_eq!(env.get("CurRow"), Some(&Variable::Number(9)));
        assert_eq!(env.get("CurWord"), Some(&Variable::from("main")));
    }

    #[test]
    fn test_editor_without_file() {
        let editor = EditorState::default();
        let env = Environment::snapshot(Some(&editor), &[]);
        assert_eq!(env.context().to_string(), "e");
        assert_eq!(env.get("FilePath"), Some(&Variable::from("")));
        assert_eq!(env.project_dir(), None);
    }

    #[test]
    fn test_context_gating() {
        let have = ContextFlags::parse("ep");
        assert!(have.satisfies(&ContextFlags::parse("e")));
        assert!(have.satisfies(&ContextFlags::parse("")));
        assert!(!have.satisfies(&ContextFlags::parse("f")));
        assert!(!ContextFlags::parse("").satisfies(&ContextFlags::parse("p")));
    }

    #[test]
    fn test_structural_variables_not_substitutable() {
        let env = Environment::snapshot(None, &project());
        assert!(env.substitutable("ProjectDirs").is_none());
        assert!(env.substitutable("Context").is_none());
        assert!(env.substitutable("ProjectDir").is_some());
    }
}
