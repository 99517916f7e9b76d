use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

/// One background pipeline: the pids still owed a wait and the line
/// that started them.
#[derive(Debug)]
pub struct Job {
    pub id: usize,
    pub pids: Vec<Pid>,
    pub line: String,
}

/// Pids of background pipelines, polled non-blockingly once per read
/// loop iteration. Polling is per tracked pid, never pid -1, so a
/// foreground wait running elsewhere is never raced.
#[derive(Debug)]
pub struct JobTable {
    jobs: Vec<Job>,
    next_id: usize,
}

impl JobTable {
    pub fn new() -> Self {
        JobTable {
            jobs: Vec::new(),
            next_id: 1,
        }
    }

    pub fn register(&mut self, pids: Vec<Pid>, line: &str) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.push(Job {
            id,
            pids,
            line: line.to_string(),
        });
        id
    }

    /// Registered jobs, oldest first.
    pub fn entries(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Non-blocking sweep: terminated pids are collected and forgotten,
    /// jobs with no pids left are dropped from the table.
    pub fn reap(&mut self) {
        for job in &mut self.jobs {
            job.pids.retain(|pid| !reaped(*pid));
        }
        self.jobs.retain(|job| !job.pids.is_empty());
    }

    /// Final sweep at interpreter exit. Children still running are
    /// inherited and collected by init once this process is gone, so
    /// none can be left a zombie.
    pub fn drain(&mut self) {
        self.reap();
        self.jobs.clear();
    }
}

fn reaped(pid: Pid) -> bool {
    loop {
        return match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => false,
            Ok(WaitStatus::Exited(..)) | Ok(WaitStatus::Signaled(..)) => true,
            Ok(_) => false,
            Err(Errno::EINTR) => continue,
            // ECHILD: nothing left to collect for this pid.
            Err(_) => true,
        };
    }
}
