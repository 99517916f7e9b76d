use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::Pipeline;
use crate::config::Config;
use crate::executor::{BuiltinManager, BuiltinOutcome, PipelineExecutor, StageStatus};
use crate::history::HistoryStore;
use crate::parser;
use crate::prompt::{ReadLine, ShellPrompt};

/// The interactive loop: read, record, parse, dispatch or launch,
/// report. Owns the history store and shares it with the built-ins.
pub struct Repl {
    config: Config,
    history: Rc<RefCell<HistoryStore>>,
    builtins: BuiltinManager,
    executor: PipelineExecutor,
    last_status: i32,
}

impl Repl {
    pub fn new(config: Config) -> Self {
        let history = Rc::new(RefCell::new(HistoryStore::load(
            &config.history_file,
            config.history_max,
        )));
        let builtins = BuiltinManager::new(history.clone());
        Repl {
            config,
            history,
            builtins,
            executor: PipelineExecutor::new(),
            last_status: 0,
        }
    }

    /// Runs until `exit` or EOF; returns the interpreter's exit status.
    pub fn run(&mut self) -> i32 {
        let prompt = ShellPrompt::new(&self.config.prompt, self.config.max_line_len);
        let status = loop {
            // Collect background pipelines that finished since the
            // last prompt.
            self.executor.reap_jobs();

            let line = match prompt.read_line() {
                Ok(ReadLine::Line(line)) => line,
                Ok(ReadLine::TooLong(len)) => {
                    eprintln!(
                        "msh: line too long ({} bytes, limit {})",
                        len, self.config.max_line_len
                    );
                    continue;
                }
                // EOF ends the session with the last command's status.
                Ok(ReadLine::Eof) => break self.last_status,
                Err(e) => {
                    eprintln!("msh: cannot read input: {}", e);
                    break 1;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            if let Some(code) = self.handle_line(&line, true) {
                break code;
            }
        };
        self.shutdown();
        status
    }

    /// One accepted line through the whole chain. `Some(code)` asks the
    /// caller to terminate the interpreter with that status.
    fn handle_line(&mut self, line: &str, allow_replay: bool) -> Option<i32> {
        // `!N` lines are recorded in their replayed form instead.
        if !line.trim_start().starts_with('!') {
            self.history.borrow_mut().add(line);
        }

        let pipeline = match parser::parse_line(line) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                eprintln!("msh: {}", e);
                self.last_status = 2;
                return None;
            }
        };

        if pipeline.is_single() {
            if let Some(outcome) = self.builtins.dispatch(&pipeline.stages[0]) {
                return self.apply_outcome(outcome, allow_replay);
            }
        }
        self.execute(&pipeline, line);
        None
    }

    fn apply_outcome(&mut self, outcome: BuiltinOutcome, allow_replay: bool) -> Option<i32> {
        match outcome {
            BuiltinOutcome::Code(code) => {
                self.last_status = code;
                None
            }
            BuiltinOutcome::Exit(code) => Some(code),
            BuiltinOutcome::Replay(stored) => {
                if !allow_replay {
                    eprintln!("msh: history replay is not recursive");
                    self.last_status = 1;
                    return None;
                }
                // Echo the recalled line the way it would have been
                // typed, then run it with further replay disabled.
                println!("{}", stored);
                self.handle_line(&stored, false)
            }
        }
    }

    fn execute(&mut self, pipeline: &Pipeline, line: &str) {
        match self.executor.run(pipeline, line) {
            Ok(Some(statuses)) => {
                for status in &statuses {
                    if let StageStatus::Signaled(signal) = status {
                        eprintln!("msh: terminated by {}", signal);
                    }
                }
                if let Some(last) = statuses.last() {
                    self.last_status = last.code();
                }
            }
            // Background: pids sit in the job table until a later
            // iteration reaps them.
            Ok(None) => {}
            Err(e) => {
                eprintln!("msh: {}", e);
                self.last_status = 1;
            }
        }
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.history.borrow().save() {
            eprintln!("msh: cannot save history: {}", e);
        }
        self.executor.drain_jobs();
    }
}
