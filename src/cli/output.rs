//! Console output for CLI commands.
//!
//! [`ConsoleSink`] renders everything a deploy run shows to the user and
//! answers confirmation prompts from an input stream.

use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use colored::Colorize;
use tabled::{Table, Tabled};

use crate::cloudformation::{CallerIdentity, StackEvent, StackOutput, StackStatus};
use crate::deployer::OutputSink;
use crate::planner::{DiffLine, DiffLineKind};

/// Stack output row for table display.
#[derive(Tabled)]
struct OutputRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Export")]
    export: String,
}

impl From<&StackOutput> for OutputRow {
    fn from(output: &StackOutput) -> Self {
        Self {
            key: output.key.clone(),
            value: output.value.clone(),
            description: output.description.clone().unwrap_or_default(),
            export: output.export_name.clone().unwrap_or_default(),
        }
    }
}

/// Writes deploy output to a terminal stream.
#[derive(Debug)]
pub struct ConsoleSink<W: Write, R: BufRead> {
    out: Mutex<W>,
    input: Mutex<R>,
    auto_approve: bool,
}

impl ConsoleSink<io::Stderr, io::StdinLock<'static>> {
    /// Creates a sink writing to stderr and reading answers from stdin.
    #[must_use]
    pub fn stderr(auto_approve: bool) -> Self {
        Self::new(io::stderr(), io::stdin().lock(), auto_approve)
    }
}

impl<W: Write, R: BufRead> ConsoleSink<W, R> {
    /// Creates a sink over the given streams. With `auto_approve`, every
    /// prompt is answered yes without reading input.
    pub const fn new(out: W, input: R, auto_approve: bool) -> Self {
        Self {
            out: Mutex::new(out),
            input: Mutex::new(input),
            auto_approve,
        }
    }

    /// Consumes the sink and returns the output stream.
    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self, text: &str) {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn read_answer(&self) -> bool {
        let mut input = self
            .input
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => false,
            Ok(_) => {
                let answer = line.trim();
                answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
            }
        }
    }

    /// Colors one line of a rendered change set by its marker.
    fn paint_change(line: &str) -> String {
        match line.trim_start().chars().next() {
            Some('+') => line.green().to_string(),
            Some('-') => line.red().to_string(),
            Some('~') => line.yellow().to_string(),
            Some('?') => line.dimmed().to_string(),
            _ => line.to_string(),
        }
    }

    fn paint_status(status: &StackStatus) -> String {
        if status.is_unsuccessful() {
            status.as_str().red().bold().to_string()
        } else if status.is_complete() {
            status.as_str().green().bold().to_string()
        } else {
            status.as_str().yellow().to_string()
        }
    }
}

impl<W: Write, R: BufRead> OutputSink for ConsoleSink<W, R> {
    fn field(&self, name: &str, value: &str) {
        self.write(&format!("{} {value}\n", format!("{name}:").bold()));
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.write(&format!("{prompt} [y/N]: "));
        if self.auto_approve {
            self.write("y\n");
            return true;
        }
        self.read_answer()
    }

    fn change_set(&self, rendered: &str) {
        let mut text = String::new();
        for line in rendered.split_inclusive('\n') {
            let (body, newline) = line
                .strip_suffix('\n')
                .map_or((line, ""), |body| (body, "\n"));
            text.push_str(&Self::paint_change(body));
            text.push_str(newline);
        }
        self.write(&text);
    }

    fn diff_line(&self, line: &DiffLine) {
        let painted = match line.kind {
            DiffLineKind::Header => line.text.cyan().to_string(),
            DiffLineKind::Added => line.text.green().to_string(),
            DiffLineKind::Removed => line.text.red().to_string(),
            DiffLineKind::Context => line.text.clone(),
        };
        self.write(&format!("{painted}\n"));
    }

    fn stack_event(&self, event: &StackEvent) {
        let line = format!(
            "{} {} {} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.logical_resource_id,
            event.resource_type,
            event.resource_status,
        );
        let reason = event
            .resource_status_reason
            .as_deref()
            .map(|r| format!(" {r}"))
            .unwrap_or_default();
        self.write(&format!("\n{}{reason}", line.red()));
    }

    fn status(&self, status: &StackStatus) {
        let painted = Self::paint_status(status);
        if status.is_terminal() {
            self.write(&format!("\n{painted}\n"));
        } else {
            self.write(&format!("\n{painted}..."));
        }
    }

    fn progress(&self) {
        self.write(".");
    }

    fn message(&self, text: &str) {
        self.write(&format!("{text}\n"));
    }

    fn stack_outputs(&self, outputs: &[StackOutput]) {
        if outputs.is_empty() {
            return;
        }
        let rows: Vec<OutputRow> = outputs.iter().map(OutputRow::from).collect();
        self.write(&format!("\n{}\n{}\n", "Outputs:".bold(), Table::new(rows)));
    }

    fn identity(&self, identity: &CallerIdentity, region: Option<&str>) {
        self.field("Account", &identity.account);
        self.field("Arn", &identity.arn);
        self.field("UserId", &identity.user_id);
        self.field("Region", region.unwrap_or("(not set)"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudformation::ChangeSetType;
    use chrono::{TimeZone, Utc};
    use std::io::Cursor;

    type TestSink = ConsoleSink<Vec<u8>, Cursor<Vec<u8>>>;

    fn sink(input: &str, auto_approve: bool) -> TestSink {
        colored::control::set_override(false);
        ConsoleSink::new(Vec::new(), Cursor::new(input.as_bytes().to_vec()), auto_approve)
    }

    fn written(sink: TestSink) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_confirm_reads_answer() {
        let console = sink("yes\n", false);
        assert!(console.confirm("Execute change set?"));
        assert_eq!(written(console), "Execute change set? [y/N]: ");
    }

    #[test]
    fn test_confirm_eof_is_no() {
        let console = sink("", false);
        assert!(!console.confirm("Continue?"));

        let console = sink("n\n", false);
        assert!(!console.confirm("Continue?"));
    }

    #[test]
    fn test_confirm_auto_approve() {
        let console = sink("", true);
        assert!(console.confirm("Continue?"));
        assert_eq!(written(console), "Continue? [y/N]: y\n");
    }

    #[test]
    fn test_status_and_progress() {
        let console = sink("", false);
        console.status(&StackStatus::new("UPDATE_IN_PROGRESS"));
        console.progress();
        console.progress();
        console.status(&StackStatus::new("UPDATE_COMPLETE"));

        assert_eq!(
            written(console),
            "\nUPDATE_IN_PROGRESS.....\nUPDATE_COMPLETE\n"
        );
    }

    #[test]
    fn test_change_set_keeps_layout() {
        let console = sink("", false);
        let rendered = "\n+ AWS::SQS::Queue Queue\n\n~ AWS::S3::Bucket Bucket\n";
        console.change_set(rendered);
        assert_eq!(written(console), rendered);
    }

    #[test]
    fn test_stack_event_line() {
        let console = sink("", false);
        console.stack_event(&StackEvent {
            event_id: String::from("1"),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            logical_resource_id: String::from("Queue"),
            resource_type: String::from("AWS::SQS::Queue"),
            resource_status: String::from("CREATE_FAILED"),
            resource_status_reason: Some(String::from("Access denied")),
        });

        assert_eq!(
            written(console),
            "\n2024-05-01 12:30:00 Queue AWS::SQS::Queue CREATE_FAILED Access denied"
        );
    }

    #[test]
    fn test_outputs_table() {
        let console = sink("", false);
        console.stack_outputs(&[StackOutput {
            key: String::from("QueueUrl"),
            value: String::from("https://sqs.example/queue"),
            description: None,
            export_name: Some(String::from("web-queue")),
        }]);

        let text = written(console);
        assert!(text.starts_with("\nOutputs:\n"));
        assert!(text.contains("QueueUrl"));
        assert!(text.contains("https://sqs.example/queue"));
        assert!(text.contains("web-queue"));
    }

    #[test]
    fn test_no_outputs_prints_nothing() {
        let console = sink("", false);
        console.stack_outputs(&[]);
        assert_eq!(written(console), "");
    }

    #[test]
    fn test_identity_fields() {
        let console = sink("", false);
        console.identity(
            &CallerIdentity {
                account: String::from("123456789012"),
                arn: String::from("arn:aws:iam::123456789012:user/ci"),
                user_id: String::from("AIDA"),
            },
            None,
        );

        assert_eq!(
            written(console),
            "Account: 123456789012\nArn: arn:aws:iam::123456789012:user/ci\nUserId: AIDA\nRegion: (not set)\n"
        );
    }

    #[test]
    fn test_field_uses_change_set_type_display() {
        let console = sink("", false);
        console.field("Operation", &ChangeSetType::Create.to_string());
        assert_eq!(written(console), "Operation: CREATE\n");
    }
}
