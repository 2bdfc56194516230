use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use ecfeed_protocol::TestArguments;

use crate::feedback::{FeedbackHandle, Verdict};

/// A generated test case: its arguments plus the handle for reporting a verdict.
///
/// Dereferences to [`TestArguments`], so typed accessors are available directly.
#[derive(Debug, Clone)]
pub struct TestCase {
    arguments: TestArguments,
    handle: Arc<FeedbackHandle>,
}

impl TestCase {
    pub fn new(arguments: TestArguments, handle: FeedbackHandle) -> Self {
        Self {
            arguments,
            handle: Arc::new(handle),
        }
    }

    pub fn arguments(&self) -> &TestArguments {
        &self.arguments
    }

    pub fn handle(&self) -> &FeedbackHandle {
        &self.handle
    }

    pub fn add_feedback(&self, verdict: Verdict) -> String {
        self.handle.add_feedback(verdict)
    }

    pub fn into_arguments(self) -> TestArguments {
        self.arguments
    }
}

impl Deref for TestCase {
    type Target = TestArguments;

    fn deref(&self) -> &TestArguments {
        &self.arguments
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.arguments, f)
    }
}
