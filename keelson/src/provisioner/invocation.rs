use std::{borrow::Cow, fmt};

/// A single external command: program, argument vector and an optional
/// payload piped to standard input.
///
/// Invocations are value objects; they are constructed by the provisioning
/// steps and handed to a [`CommandRunner`](super::CommandRunner) for
/// execution or recording.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Invocation {
    pub program: String,

    pub args: Vec<String>,

    pub stdin: Option<String>,
}

impl Invocation {
    #[must_use]
    pub fn new<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            stdin: None,
        }
    }

    #[must_use]
    pub fn with_stdin<S: Into<String>>(mut self, input: S) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Renders the invocation as a shell-escaped command line.
    #[must_use]
    pub fn render(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|word| shell_escape::escape(Cow::from(word.as_str())))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.render()) }
}
