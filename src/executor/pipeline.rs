use std::ffi::CString;
use std::fmt;
use std::fs::File;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{self, ForkResult, Pid, fork};

use super::jobs::JobTable;
use super::redirect::{self, RedirectError};
use crate::ast::{Pipeline, Stage};

/// Exit status a child reports when exec fails for any reason other
/// than "not found".
pub const EXIT_NOT_EXECUTABLE: i32 = 126;
/// Exit status a child reports when the program cannot be found.
pub const EXIT_NOT_FOUND: i32 = 127;

/// A failure that aborts the launch or the wait of a pipeline. Never
/// fatal to the interpreter.
#[derive(Debug)]
pub enum ExecError {
    Redirect(RedirectError),
    PipeCreate(Errno),
    Fork(Errno),
    Wait(Errno),
    NulInArgv(String),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::Redirect(e) => write!(f, "{}", e),
            ExecError::PipeCreate(e) => write!(f, "cannot create pipe: {}", e.desc()),
            ExecError::Fork(e) => write!(f, "cannot fork: {}", e.desc()),
            ExecError::Wait(e) => write!(f, "wait failed: {}", e.desc()),
            ExecError::NulInArgv(arg) => write!(f, "argument contains NUL byte: {:?}", arg),
        }
    }
}

impl From<RedirectError> for ExecError {
    fn from(e: RedirectError) -> Self {
        ExecError::Redirect(e)
    }
}

/// Exit state of one stage, collected by a foreground wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Exited(i32),
    Signaled(Signal),
}

impl StageStatus {
    /// Shell-convention status code: the exit code itself, or 128 plus
    /// the signal number for a killed stage.
    pub fn code(&self) -> i32 {
        match self {
            StageStatus::Exited(code) => *code,
            StageStatus::Signaled(signal) => 128 + *signal as i32,
        }
    }
}

pub struct PipelineExecutor {
    jobs: JobTable,
}

impl PipelineExecutor {
    pub fn new() -> Self {
        PipelineExecutor {
            jobs: JobTable::new(),
        }
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    pub fn reap_jobs(&mut self) {
        self.jobs.reap();
    }

    pub fn drain_jobs(&mut self) {
        self.jobs.drain();
    }

    /// Launches every stage of the pipeline connected by anonymous
    /// pipes, then waits for all of them (foreground) or registers
    /// their pids with the job table and returns at once (background).
    ///
    /// Returns one status per stage in index order for a foreground
    /// pipeline, `None` for a background one. On any `Err` no stage is
    /// left running unwaited and no descriptor stays open.
    pub fn run(
        &mut self,
        pipeline: &Pipeline,
        line: &str,
    ) -> Result<Option<Vec<StageStatus>>, ExecError> {
        let stages = &pipeline.stages;
        let n = stages.len();

        // argv goes to CString before anything is spawned, so a bad
        // argument is reported with no cleanup owed and the child
        // never has to allocate.
        let argvs = stages
            .iter()
            .map(stage_argv)
            .collect::<Result<Vec<_>, _>>()?;

        // Redirections resolve before the first fork. Only the outer
        // ends of the pipeline can reach a file; interior stages are
        // pipe-bound on both sides and their stray paths stay unopened.
        let input = match stages[0].input_path.as_deref() {
            Some(path) => Some(redirect::open_input(path)?),
            None => None,
        };
        let output = match stages[n - 1].output_path.as_deref() {
            Some(path) => Some(redirect::open_output(path)?),
            None => None,
        };

        let mut pipes: Vec<(OwnedFd, OwnedFd)> = Vec::with_capacity(n - 1);
        for _ in 1..n {
            pipes.push(unistd::pipe().map_err(ExecError::PipeCreate)?);
        }

        let mut pids: Vec<Pid> = Vec::with_capacity(n);
        for (i, argv) in argvs.iter().enumerate() {
            match unsafe { fork() } {
                Ok(ForkResult::Parent { child }) => pids.push(child),
                Ok(ForkResult::Child) => {
                    exec_stage(i, n, argv, &pipes, input.as_ref(), output.as_ref())
                }
                Err(errno) => {
                    // Stages already spawned keep running. Dropping our
                    // pipe ends gives them EOF; they are then collected
                    // so none is orphaned. Later stages are never
                    // started.
                    drop(pipes);
                    drop(input);
                    drop(output);
                    for pid in &pids {
                        let _ = wait_stage(*pid);
                    }
                    return Err(ExecError::Fork(errno));
                }
            }
        }

        // Every stage is running; the parent must hold no pipe or
        // redirection descriptor past this point or readers would
        // never see EOF.
        drop(pipes);
        drop(input);
        drop(output);

        if pipeline.background() {
            self.jobs.register(pids, line);
            return Ok(None);
        }

        let mut statuses = Vec::with_capacity(n);
        let mut wait_error = None;
        for pid in pids {
            match wait_stage(pid) {
                Ok(status) => statuses.push(status),
                // Keep waiting the remaining stages even when one wait
                // fails; the first error is reported afterwards.
                Err(e) => wait_error = wait_error.or(Some(e)),
            }
        }
        match wait_error {
            Some(e) => Err(e),
            None => Ok(Some(statuses)),
        }
    }
}

fn stage_argv(stage: &Stage) -> Result<Vec<CString>, ExecError> {
    stage
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_str()).map_err(|_| ExecError::NulInArgv(arg.clone())))
        .collect()
}

/// Child side of a fork. Binds stdin/stdout for stage `index` of
/// `count`, closes every descriptor the exec'd program must not
/// inherit, then execs. Never returns to interpreter code: on exec
/// failure the child reports on stderr and leaves with a distinguished
/// status, skipping destructors.
fn exec_stage(
    index: usize,
    count: usize,
    argv: &[CString],
    pipes: &[(OwnedFd, OwnedFd)],
    input: Option<&File>,
    output: Option<&File>,
) -> ! {
    if index == 0 {
        if let Some(file) = input {
            bind(file.as_raw_fd(), libc::STDIN_FILENO);
        }
    } else {
        bind(pipes[index - 1].0.as_raw_fd(), libc::STDIN_FILENO);
    }
    if index == count - 1 {
        if let Some(file) = output {
            bind(file.as_raw_fd(), libc::STDOUT_FILENO);
        }
    } else {
        bind(pipes[index].1.as_raw_fd(), libc::STDOUT_FILENO);
    }

    for (read, write) in pipes {
        let _ = unistd::close(read.as_raw_fd());
        let _ = unistd::close(write.as_raw_fd());
    }
    if let Some(file) = input {
        let _ = unistd::close(file.as_raw_fd());
    }
    if let Some(file) = output {
        let _ = unistd::close(file.as_raw_fd());
    }

    let errno = match unistd::execvp(&argv[0], argv) {
        Err(errno) => errno,
        Ok(never) => match never {},
    };
    let name = argv[0].to_string_lossy();
    let code = match errno {
        Errno::ENOENT => {
            eprintln!("{}: command not found", name);
            EXIT_NOT_FOUND
        }
        other => {
            eprintln!("{}: {}", name, other.desc());
            EXIT_NOT_EXECUTABLE
        }
    };
    unsafe { libc::_exit(code) }
}

fn bind(fd: RawFd, target: RawFd) {
    if unistd::dup2(fd, target).is_err() {
        unsafe { libc::_exit(EXIT_NOT_EXECUTABLE) }
    }
}

fn wait_stage(pid: Pid) -> Result<StageStatus, ExecError> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(StageStatus::Exited(code)),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(StageStatus::Signaled(signal)),
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(ExecError::Wait(errno)),
        }
    }
}
