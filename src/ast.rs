/// One command of a pipeline.
///
/// `argv` is never empty once a stage has left the parser; `argv[0]` is
/// the program name. Redirection paths are kept as written; they are
/// resolved to descriptors only at launch time, and only for the stages
/// whose side is not pipe-bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    pub argv: Vec<String>,
    pub input_path: Option<String>,
    pub output_path: Option<String>,
    pub background: bool,
}

impl Stage {
    pub fn program(&self) -> &str {
        &self.argv[0]
    }
}

/// An ordered, non-empty list of stages, split at `|`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn is_single(&self) -> bool {
        self.stages.len() == 1
    }

    /// A pipeline runs in the background when its final stage was
    /// marked with `&`.
    pub fn background(&self) -> bool {
        self.stages.last().is_some_and(|s| s.background)
    }
}
