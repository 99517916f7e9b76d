mod builtins;
mod jobs;
mod pipeline;
mod redirect;

pub use builtins::{Builtin, BuiltinManager, BuiltinOutcome};
pub use jobs::{Job, JobTable};
pub use pipeline::{
    EXIT_NOT_EXECUTABLE, EXIT_NOT_FOUND, ExecError, PipelineExecutor, StageStatus,
};
pub use redirect::{RedirectError, open_input, open_output};
