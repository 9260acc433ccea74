//! Step-recording helper shared by unit and integration tests.
//!
//! A `TestReport` collects setup/action/assert steps while a test runs and,
//! when `TEST_REPORT_DIR` is set, writes them to one text file per test on
//! drop. Without that variable it only forwards to the std assertions.

use std::fmt::{Debug, Display};
use std::path::PathBuf;
use std::sync::Mutex;

/// Create a `TestReport` named after the enclosing test function.
#[macro_export]
macro_rules! test_report {
    ($title:expr) => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let name = &name[..name.len() - 3];
        let name = name.strip_suffix("::{{closure}}").unwrap_or(name);
        $crate::TestReport::new(name, $title, file!(), line!())
    }};
}

enum Step {
    Setup(String),
    Action(String),
    Pass(String),
    Fail(String),
}

impl Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Setup(msg) => write!(f, "STEP setup: {}", msg),
            Step::Action(msg) => write!(f, "STEP action: {}", msg),
            Step::Pass(msg) => write!(f, "STEP assert_pass: {}", msg),
            Step::Fail(msg) => write!(f, "STEP assert_fail: {}", msg),
        }
    }
}

pub struct TestReport {
    full_path: String,
    title: String,
    source: String,
    steps: Mutex<Vec<Step>>,
    report_dir: Option<PathBuf>,
}

impl TestReport {
    pub fn new(full_path: &str, title: &str, source_file: &str, source_line: u32) -> Self {
        Self {
            full_path: full_path.to_string(),
            title: title.to_string(),
            source: format!("{}:{}", source_file, source_line),
            steps: Mutex::new(Vec::new()),
            report_dir: std::env::var_os("TEST_REPORT_DIR").map(PathBuf::from),
        }
    }

    fn push(&self, step: Step) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push(step);
        }
    }

    fn record(&self, pass: bool, msg: String) {
        self.push(if pass { Step::Pass(msg) } else { Step::Fail(msg) });
    }

    fn shorten(value: String) -> String {
        const MAX: usize = 500;
        if value.len() <= MAX {
            format!("`{}`", value)
        } else {
            let mut end = MAX;
            while !value.is_char_boundary(end) {
                end -= 1;
            }
            format!("`{}…` ({} bytes)", &value[..end], value.len())
        }
    }

    pub fn setup(&self, msg: impl Display) {
        self.push(Step::Setup(msg.to_string()));
    }

    pub fn action(&self, msg: impl Display) {
        self.push(Step::Action(msg.to_string()));
    }

    pub fn assert_eq<A, E>(&self, label: &str, actual: &A, expected: &E)
    where
        A: PartialEq<E> + Debug,
        E: Debug,
    {
        let pass = actual == expected;
        self.record(
            pass,
            format!(
                "{}: {} == {}",
                label,
                Self::shorten(format!("{:?}", actual)),
                Self::shorten(format!("{:?}", expected))
            ),
        );
        assert_eq!(actual, expected, "{}", label);
    }

    pub fn assert_true(&self, label: &str, value: bool) {
        self.record(value, format!("{}: `{}`", label, value));
        assert!(value, "{}", label);
    }

    pub fn assert_contains(&self, label: &str, haystack: &str, needle: &str) {
        let pass = haystack.contains(needle);
        self.record(
            pass,
            format!(
                "{}: {} contains {}",
                label,
                Self::shorten(format!("{:?}", haystack)),
                Self::shorten(format!("{:?}", needle))
            ),
        );
        assert!(
            pass,
            "{}: {:?} does not contain {:?}",
            label, haystack, needle
        );
    }

    fn write_report(&self) {
        let Some(dir) = &self.report_dir else {
            return;
        };

        let result = if std::thread::panicking() {
            "fail"
        } else {
            "pass"
        };

        let mut lines = vec![
            format!("NAME: {}", self.full_path),
            format!("TITLE: {}", self.title),
            format!("SOURCE: {}", self.source),
        ];
        if let Ok(steps) = self.steps.lock() {
            lines.extend(steps.iter().map(|s| s.to_string()));
        }
        lines.push(format!("RESULT: {}", result));
        lines.push(String::new());

        let path = dir.join(format!("{}.txt", self.full_path.replace("::", "__")));
        let _ = std::fs::create_dir_all(dir);
        let _ = std::fs::write(path, lines.join("\n"));
    }
}

impl Drop for TestReport {
    fn drop(&mut self) {
        self.write_report();
    }
}
