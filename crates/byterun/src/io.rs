use std::borrow::Cow;

/// Trait for handling output from the interpreter.
///
/// `print()` and `PRINT_EXPR` write program output through `stdout_write`/`stdout_push`;
/// the exception reporter writes its diagnostic report through `stderr_write`.
/// The default implementation `StdPrint` writes to the process streams.
pub trait PrintWriter {
    /// Called once for each formatted argument passed to `print()`.
    ///
    /// This method is responsible for writing only the given argument's text, and must
    /// not add separators or a trailing newline. Separators (such as spaces) and the
    /// final terminator (such as a newline) are emitted via [`PrintWriter::stdout_push`].
    fn stdout_write(&mut self, output: Cow<'_, str>);

    /// Add a single character to stdout.
    ///
    /// Generally called to add spaces and newlines within print output.
    fn stdout_push(&mut self, end: char);

    /// Writes diagnostic text, such as the report of an exception caught by the run loop.
    fn stderr_write(&mut self, output: Cow<'_, str>);
}

/// Default `PrintWriter` that writes to stdout and stderr.
#[derive(Debug)]
pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn stdout_write(&mut self, output: Cow<'_, str>) {
        print!("{output}");
    }

    fn stdout_push(&mut self, end: char) {
        print!("{end}");
    }

    fn stderr_write(&mut self, output: Cow<'_, str>) {
        eprint!("{output}");
    }
}

/// A `PrintWriter` that collects program output and diagnostics into separate strings.
///
/// Useful for testing or capturing print output programmatically.
#[derive(Debug, Default)]
pub struct CollectStringPrint {
    stdout: String,
    stderr: String,
}

impl CollectStringPrint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected program output.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.stdout
    }

    /// Returns the collected diagnostic output.
    #[must_use]
    pub fn diagnostics(&self) -> &str {
        &self.stderr
    }

    /// Consumes the writer and returns the collected program output.
    #[must_use]
    pub fn into_output(self) -> String {
        self.stdout
    }
}

impl PrintWriter for CollectStringPrint {
    fn stdout_write(&mut self, output: Cow<'_, str>) {
        self.stdout.push_str(&output);
    }

    fn stdout_push(&mut self, end: char) {
        self.stdout.push(end);
    }

    fn stderr_write(&mut self, output: Cow<'_, str>) {
        self.stderr.push_str(&output);
    }
}

/// `PrintWriter` that ignores all output.
///
/// Useful for suppressing print output during testing or benchmarking.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn stdout_write(&mut self, _output: Cow<'_, str>) {}

    fn stdout_push(&mut self, _end: char) {}

    fn stderr_write(&mut self, _output: Cow<'_, str>) {}
}
