use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::Stage;
use crate::history::HistoryStore;

/// What the read loop does after a handled built-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltinOutcome {
    /// Keep reading; the built-in finished with this status.
    Code(i32),
    /// Terminate the interpreter with this status.
    Exit(i32),
    /// Re-submit this stored line as fresh input.
    Replay(String),
}

pub trait Builtin {
    fn name(&self) -> &'static str;
    fn run(&self, args: &[String]) -> BuiltinOutcome;
}

/// Registry of in-process commands. Consulted only for single-stage
/// pipelines; multi-stage lines always go to the pipeline executor.
pub struct BuiltinManager {
    commands: HashMap<String, Box<dyn Builtin>>,
    history: Rc<RefCell<HistoryStore>>,
}

impl BuiltinManager {
    pub fn new(history: Rc<RefCell<HistoryStore>>) -> Self {
        let mut mgr = BuiltinManager {
            commands: HashMap::new(),
            history: history.clone(),
        };
        mgr.register(Box::new(CdCommand {}));
        mgr.register(Box::new(ExitCommand {}));
        mgr.register(Box::new(HistoryCommand { history }));
        mgr
    }

    pub fn register(&mut self, cmd: Box<dyn Builtin>) {
        self.commands.insert(cmd.name().to_string(), cmd);
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.commands.contains_key(name) || name.starts_with('!')
    }

    /// Handles one single-stage command. `None` means the program is
    /// not a built-in and must be launched externally. Redirection
    /// tokens on the stage are ignored here; built-ins never fork.
    pub fn dispatch(&self, stage: &Stage) -> Option<BuiltinOutcome> {
        let name = stage.program();
        if let Some(index) = name.strip_prefix('!') {
            return Some(self.recall(index));
        }
        let cmd = self.commands.get(name)?;
        Some(cmd.run(&stage.argv[1..]))
    }

    /// `!N`: look up the N'th stored line, 1-indexed.
    fn recall(&self, index: &str) -> BuiltinOutcome {
        let history = self.history.borrow();
        match index.parse::<usize>().ok().and_then(|n| history.entry(n)) {
            Some(line) => BuiltinOutcome::Replay(line.to_string()),
            None => {
                eprintln!("No such command in history");
                BuiltinOutcome::Code(1)
            }
        }
    }
}

pub struct CdCommand;

impl Builtin for CdCommand {
    fn name(&self) -> &'static str {
        "cd"
    }
    fn run(&self, args: &[String]) -> BuiltinOutcome {
        let Some(target) = args.first() else {
            eprintln!("cd: missing argument");
            return BuiltinOutcome::Code(1);
        };
        match std::env::set_current_dir(target) {
            Ok(_) => BuiltinOutcome::Code(0),
            Err(e) => {
                eprintln!("cd: {}: {}", target, e);
                BuiltinOutcome::Code(1)
            }
        }
    }
}

pub struct ExitCommand;

impl Builtin for ExitCommand {
    fn name(&self) -> &'static str {
        "exit"
    }
    fn run(&self, args: &[String]) -> BuiltinOutcome {
        match args.first() {
            None => BuiltinOutcome::Exit(0),
            Some(arg) => match arg.parse::<i32>() {
                Ok(code) => BuiltinOutcome::Exit(code),
                Err(_) => {
                    eprintln!("exit: {}: numeric argument required", arg);
                    BuiltinOutcome::Code(1)
                }
            },
        }
    }
}

pub struct HistoryCommand {
    pub history: Rc<RefCell<HistoryStore>>,
}

impl Builtin for HistoryCommand {
    fn name(&self) -> &'static str {
        "history"
    }
    fn run(&self, args: &[String]) -> BuiltinOutcome {
        let mut limit: Option<usize> = None;
        let mut clear = false;

        for arg in args {
            match arg.as_str() {
                "-c" | "--clear" => clear = true,
                s if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => {
                    limit = s.parse().ok();
                }
                _ => {
                    eprintln!("history: unknown option '{}'", arg);
                    return BuiltinOutcome::Code(1);
                }
            }
        }

        let mut history = self.history.borrow_mut();
        if clear {
            history.clear();
            return BuiltinOutcome::Code(0);
        }

        let total = history.len();
        let start = limit.map_or(0, |limit| total.saturating_sub(limit));
        for (i, line) in history.iter().enumerate().skip(start) {
            println!("{:>5}  {}", i + 1, line);
        }
        BuiltinOutcome::Code(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    fn manager_with(lines: &[&str]) -> BuiltinManager {
        let history = Rc::new(RefCell::new(HistoryStore::new(100)));
        for line in lines {
            history.borrow_mut().add(line);
        }
        BuiltinManager::new(history)
    }

    fn dispatch(mgr: &BuiltinManager, line: &str) -> Option<BuiltinOutcome> {
        let pipeline = parse_line(line).unwrap();
        assert!(pipeline.is_single());
        mgr.dispatch(&pipeline.stages[0])
    }

    #[test]
    fn test_builtin_names_are_recognized() {
        let mgr = manager_with(&[]);
        assert!(mgr.is_builtin("cd"));
        assert!(mgr.is_builtin("exit"));
        assert!(mgr.is_builtin("history"));
        assert!(mgr.is_builtin("!3"));
        assert!(!mgr.is_builtin("echo"));
    }

    #[test]
    fn test_external_command_is_not_handled() {
        let mgr = manager_with(&[]);
        assert_eq!(dispatch(&mgr, "echo hi"), None);
    }

    #[test]
    fn test_exit_outcomes() {
        let mgr = manager_with(&[]);
        assert_eq!(dispatch(&mgr, "exit"), Some(BuiltinOutcome::Exit(0)));
        assert_eq!(dispatch(&mgr, "exit 3"), Some(BuiltinOutcome::Exit(3)));
        assert_eq!(dispatch(&mgr, "exit nope"), Some(BuiltinOutcome::Code(1)));
    }

    #[test]
    fn test_cd_missing_argument_is_a_user_error() {
        let mgr = manager_with(&[]);
        assert_eq!(dispatch(&mgr, "cd"), Some(BuiltinOutcome::Code(1)));
    }

    #[test]
    fn test_cd_to_missing_directory_fails_without_exiting() {
        let mgr = manager_with(&[]);
        assert_eq!(
            dispatch(&mgr, "cd /definitely/not/here-msh"),
            Some(BuiltinOutcome::Code(1))
        );
    }

    #[test]
    fn test_cd_changes_working_directory() {
        let before = std::env::current_dir().unwrap();
        let target = std::env::temp_dir();
        let mgr = manager_with(&[]);

        let outcome = dispatch(&mgr, &format!("cd {}", target.display()));
        assert_eq!(outcome, Some(BuiltinOutcome::Code(0)));
        // temp_dir may be a symlink; compare canonical forms.
        assert_eq!(
            std::env::current_dir().unwrap().canonicalize().unwrap(),
            target.canonicalize().unwrap()
        );

        std::env::set_current_dir(before).unwrap();
    }

    #[test]
    fn test_recall_returns_the_stored_line() {
        let mgr = manager_with(&["echo one", "echo two", "echo three"]);
        assert_eq!(
            dispatch(&mgr, "!2"),
            Some(BuiltinOutcome::Replay("echo two".to_string()))
        );
    }

    #[test]
    fn test_recall_out_of_range_is_a_user_error() {
        let mgr = manager_with(&["echo one"]);
        assert_eq!(dispatch(&mgr, "!9"), Some(BuiltinOutcome::Code(1)));
        assert_eq!(dispatch(&mgr, "!0"), Some(BuiltinOutcome::Code(1)));
        assert_eq!(dispatch(&mgr, "!x"), Some(BuiltinOutcome::Code(1)));
        assert_eq!(dispatch(&mgr, "!"), Some(BuiltinOutcome::Code(1)));
    }

    #[test]
    fn test_history_clear_flag_empties_the_store() {
        let history = Rc::new(RefCell::new(HistoryStore::new(100)));
        history.borrow_mut().add("echo one");
        let mgr = BuiltinManager::new(history.clone());

        assert_eq!(dispatch(&mgr, "history -c"), Some(BuiltinOutcome::Code(0)));
        assert!(history.borrow().is_empty());
    }

    #[test]
    fn test_history_rejects_unknown_options() {
        let mgr = manager_with(&[]);
        assert_eq!(
            dispatch(&mgr, "history --frobnicate"),
            Some(BuiltinOutcome::Code(1))
        );
    }
}
