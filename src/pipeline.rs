use std::fmt;

/// One external program invocation; `arguments[0]` is the program name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stage {
    arguments: Vec<String>,
}

impl Stage {
    /// Creates a new, empty stage.
    pub fn new() -> Self {
        Stage::default()
    }

    pub fn push_argument(&mut self, argument: String) {
        self.arguments.push(argument);
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Returns the program name, if any argument has been added.
    pub fn program(&self) -> Option<&str> {
        self.arguments.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }
}

/// The full parsed command line: stages in pipe order plus the redirection
/// and background metadata that applies to the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// Stages, left to right. Never reordered after parsing.
    pub stages: Vec<Stage>,
    /// Input redirection for the first stage, if any.
    pub input_file: Option<String>,
    /// Output redirection for the last stage, if any.
    pub output_file: Option<String>,
    /// Error redirection, if any.
    pub error_file: Option<String>,
    /// Append mode flag for output and error redirection.
    pub append: bool,
    /// Set by `>>&`: stderr of the last stage follows its stdout.
    pub combine_error_with_output: bool,
    /// Do not wait for the last process.
    pub background: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::new()
    }
}

impl Pipeline {
    /// Creates a pipeline holding a single empty stage.
    pub fn new() -> Self {
        Pipeline {
            stages: vec![Stage::new()],
            input_file: None,
            output_file: None,
            error_file: None,
            append: false,
            combine_error_with_output: false,
            background: false,
        }
    }

    /// The stage new arguments are appended to.
    pub fn current_stage_mut(&mut self) -> &mut Stage {
        if self.stages.is_empty() {
            self.stages.push(Stage::new());
        }
        let last = self.stages.len() - 1;
        &mut self.stages[last]
    }

    /// Seals the current stage and starts a new, empty one after it.
    pub fn begin_stage(&mut self) {
        self.stages.push(Stage::new());
    }

    /// True when there is nothing to run: no stages, or a first stage
    /// without a program name.
    pub fn is_empty(&self) -> bool {
        self.stages.first().map_or(true, Stage::is_empty)
    }

    /// Program name of the first stage, used for built-in dispatch.
    pub fn command_name(&self) -> Option<&str> {
        self.stages.first().and_then(Stage::program)
    }
}

/// Renders the command table printed before each execution.
impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = |path: &Option<String>| path.clone().unwrap_or_else(|| "default".to_string());
        let combined = if self.combine_error_with_output {
            target(&self.error_file)
        } else {
            "default".to_string()
        };

        writeln!(f)?;
        writeln!(f)?;
        writeln!(f, "              COMMAND TABLE                ")?;
        writeln!(f)?;
        writeln!(f, "  #   Simple Commands")?;
        writeln!(f, "  --- ----------------------------------------------------------")?;
        for (index, stage) in self.stages.iter().enumerate() {
            write!(f, "  {:<3} ", index)?;
            for argument in stage.arguments() {
                write!(f, "\"{}\" \t", argument)?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;
        writeln!(f, "  Output       Input        Error        Err&Out      Background")?;
        writeln!(f, "  ------------ ------------ ------------ ------------ ------------")?;
        writeln!(
            f,
            "  {:<12} {:<12} {:<12} {:<12} {:<12}",
            target(&self.output_file),
            target(&self.input_file),
            target(&self.error_file),
            combined,
            if self.background { "YES" } else { "NO" }
        )?;
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pipeline_has_one_empty_stage() {
        let pipeline = Pipeline::new();
        assert_eq!(pipeline.stages.len(), 1);
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.command_name(), None);
        assert!(!pipeline.append && !pipeline.background);
    }

    #[test]
    fn test_stage_order_is_insertion_order() {
        let mut pipeline = Pipeline::new();
        pipeline.current_stage_mut().push_argument("ls".into());
        pipeline.begin_stage();
        pipeline.current_stage_mut().push_argument("wc".into());
        pipeline.current_stage_mut().push_argument("-l".into());
        assert_eq!(pipeline.stages[0].arguments(), ["ls"]);
        assert_eq!(pipeline.stages[1].arguments(), ["wc", "-l"]);
        assert_eq!(pipeline.command_name(), Some("ls"));
    }

    #[test]
    fn test_pipeline_without_stages_is_empty() {
        let mut pipeline = Pipeline::new();
        pipeline.stages.clear();
        assert!(pipeline.is_empty());
        pipeline.current_stage_mut().push_argument("true".into());
        assert!(!pipeline.is_empty());
    }

    #[test]
    fn test_command_table_dump() {
        let mut pipeline = Pipeline::new();
        pipeline.current_stage_mut().push_argument("echo".into());
        pipeline.current_stage_mut().push_argument("hi".into());
        pipeline.output_file = Some("out.txt".into());
        pipeline.background = true;
        let table = pipeline.to_string();
        assert!(table.contains("COMMAND TABLE"));
        assert!(table.contains("  0   \"echo\" \t\"hi\" \t"));
        assert!(table.contains("  out.txt      default      default      default      YES"));
    }
}
