//! In-process stand-in for the host tool.

use hostflow_runner::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Answers calls from scripted responses matched by substring of the joined
/// argv, then window and tab listings from fixed lists. A response queue
/// replays in order and then keeps returning its last entry. Unmatched calls
/// succeed with empty output.
pub struct FakeHost {
    windows: Vec<u32>,
    tabs: Vec<String>,
    responses: Mutex<Vec<(String, VecDeque<ProcessOutput>)>>,
    calls: Mutex<Vec<(Vec<String>, Duration)>>,
}

impl FakeHost {
    pub fn new(windows: &[u32], tabs: &[&str]) -> Self {
        Self {
            windows: windows.to_vec(),
            tabs: tabs.iter().map(|t| (*t).to_string()).collect(),
            responses: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(self, needle: &str, outputs: impl IntoIterator<Item = ProcessOutput>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push((needle.to_string(), outputs.into_iter().collect()));
        self
    }

    /// Every call as its joined argv.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(args, _)| args.join(" "))
            .collect()
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    fn listing(&self, args: &[String]) -> Option<ProcessOutput> {
        if args.first().map(String::as_str) != Some("--raw-json") || args.iter().any(|a| a == "-t") {
            return None;
        }
        match args.last().map(String::as_str) {
            Some("windows") => {
                let entries: Vec<_> = self
                    .windows
                    .iter()
                    .map(|id| serde_json::json!({ "windowID": id }))
                    .collect();
                Some(ProcessOutput::exited(0, serde_json::Value::from(entries).to_string(), ""))
            }
            Some("tabs") => {
                let tabs: Vec<_> = self
                    .tabs
                    .iter()
                    .map(|name| serde_json::json!({ "name": name }))
                    .collect();
                Some(ProcessOutput::exited(
                    0,
                    serde_json::json!({ "tabs": tabs }).to_string(),
                    "",
                ))
            }
            _ => None,
        }
    }
}

impl ProcessRunner for FakeHost {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        let args: Vec<String> = cmd
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        self.calls.lock().unwrap().push((args.clone(), timeout));

        let joined = args.join(" ");
        let mut responses = self.responses.lock().unwrap();
        for (needle, queue) in responses.iter_mut() {
            if joined.contains(needle.as_str()) {
                let output = if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                };
                return Ok(output.unwrap_or_else(|| ProcessOutput::exited(0, "", "")));
            }
        }

        Ok(self
            .listing(&args)
            .unwrap_or_else(|| ProcessOutput::exited(0, "", "")))
    }
}
