//! Scripted command runner
//!
//! Records every invocation and answers from a table of rules keyed by
//! program and an argument substring. Unmatched invocations succeed with
//! empty output, which is what `ovn-nbctl`/`ovs-vsctl` print for most
//! write commands.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ovnl2_common::{CommandResult, CommandRunner, ExecResult};

/// A captured command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name as passed to the runner
    pub program: String,
    /// Argument vector
    pub args: Vec<String>,
}

impl Invocation {
    /// Space-joined argument vector
    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }

    /// True if the joined arguments contain `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.command_line().contains(needle)
    }

    /// True if one argument is exactly `arg`
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

struct Rule {
    program: String,
    needle: String,
    replies: VecDeque<ExecResult>,
}

#[derive(Default)]
struct FakeState {
    rules: Vec<Rule>,
    invocations: Vec<Invocation>,
}

/// Command runner with scripted replies
///
/// Clones share state, so a clone handed to the code under test still
/// records into the original.
#[derive(Clone, Default)]
pub struct FakeRunner {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRunner {
    /// Create a runner where every command succeeds silently
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `reply` for invocations of `program` whose arguments contain
    /// `needle`
    ///
    /// Replies for a rule are consumed in order; the last one repeats.
    /// Rules are matched in registration order.
    pub fn on(&self, program: &str, needle: &str, reply: ExecResult) -> &Self {
        let mut state = self.state.lock().expect("fake runner lock poisoned");
        if let Some(rule) = state
            .rules
            .iter_mut()
            .find(|r| r.program == program && r.needle == needle)
        {
            rule.replies.push_back(reply);
        } else {
            state.rules.push(Rule {
                program: program.to_string(),
                needle: needle.to_string(),
                replies: VecDeque::from([reply]),
            });
        }
        self
    }

    /// All invocations so far, in order
    pub fn invocations(&self) -> Vec<Invocation> {
        self.state
            .lock()
            .expect("fake runner lock poisoned")
            .invocations
            .clone()
    }

    /// Invocations of a single program, in order
    pub fn invocations_of(&self, program: &str) -> Vec<Invocation> {
        self.invocations()
            .into_iter()
            .filter(|i| i.program == program)
            .collect()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn exec(&self, program: &str, args: &[String]) -> CommandResult<ExecResult> {
        let invocation = Invocation {
            program: program.to_string(),
            args: args.to_vec(),
        };
        let line = invocation.command_line();

        let mut state = self.state.lock().expect("fake runner lock poisoned");
        state.invocations.push(invocation);

        let reply = state
            .rules
            .iter_mut()
            .find(|r| r.program == program && line.contains(&r.needle))
            .map(|rule| {
                if rule.replies.len() > 1 {
                    rule.replies.pop_front().unwrap_or_else(|| ExecResult::success_with(""))
                } else {
                    rule.replies
                        .front()
                        .cloned()
                        .unwrap_or_else(|| ExecResult::success_with(""))
                }
            })
            .unwrap_or_else(|| ExecResult::success_with(""));

        Ok(reply)
    }
}
