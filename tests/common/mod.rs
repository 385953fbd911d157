//! An in-memory interpreter that understands the queue's R wrapping and a
//! tiny subset of R, enough to exercise ordering and isolation.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use rsnip::session::{InterpreterSession, SessionError, SessionEvent};

/// Shared view into a [`ScriptedSession`] after it has moved into a queue.
#[derive(Clone, Default)]
pub struct Probe {
    written: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl Probe {
    pub fn written(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct ScriptedSession {
    probe: Probe,
    banner: Vec<SessionEvent>,
    fail_init: bool,
    started: bool,
    broken: bool,
    events: VecDeque<Result<SessionEvent, SessionError>>,
    envs: HashMap<u32, HashMap<String, i64>>,
}

impl ScriptedSession {
    pub fn new() -> (Self, Probe) {
        let probe = Probe::default();
        let session = Self {
            probe: probe.clone(),
            banner: vec![
                SessionEvent::Stdout("R version 4.3.1 (fake)".into()),
                SessionEvent::Stderr("startup notice".into()),
            ],
            fail_init: false,
            started: false,
            broken: false,
            events: VecDeque::new(),
            envs: HashMap::new(),
        };
        (session, probe)
    }

    pub fn failing_init() -> (Self, Probe) {
        let (mut session, probe) = Self::new();
        session.fail_init = true;
        (session, probe)
    }

    fn emit(&mut self, event: SessionEvent) {
        self.events.push_back(Ok(event));
    }

    fn respond(&mut self, line: &str) {
        if let Some(env) = parse_bind(line) {
            self.envs.insert(env, HashMap::new());
        } else if let Some((code, env)) = parse_scoped(line) {
            match self.envs.get(&env).cloned() {
                Some(vars) => {
                    let vars = self.eval(&code, vars);
                    self.envs.insert(env, vars);
                }
                None => self.emit(SessionEvent::Stderr(format!(
                    "Error: object '.rsnip_env_{env}' not found"
                ))),
            }
        } else {
            self.emit(SessionEvent::Stderr(format!("Error: unexpected input {line}")));
        }
        if !std::mem::take(&mut self.broken) {
            self.emit(SessionEvent::Ready);
        }
    }

    fn eval(&mut self, code: &str, mut vars: HashMap<String, i64>) -> HashMap<String, i64> {
        for stmt in code.lines().map(str::trim).filter(|s| !s.is_empty()) {
            if stmt == "break" {
                // The transport dies mid-turn: no Ready follows.
                self.events.push_back(Err(SessionError::Closed));
                self.broken = true;
                return vars;
            }
            if let Some(op) = stmt.strip_prefix("draw ") {
                self.emit(SessionEvent::Graphics(op.to_string()));
            } else if let Some(msg) = stmt.strip_prefix("warn ") {
                self.emit(SessionEvent::Stderr("Warning message:".into()));
                self.emit(SessionEvent::Stderr(msg.to_string()));
            } else if let Some((name, value)) = stmt.split_once("<-") {
                match self.value(value.trim(), &vars) {
                    Some(v) => {
                        vars.insert(name.trim().to_string(), v);
                    }
                    None => return vars,
                }
            } else if let Some(v) = self.value(stmt, &vars) {
                self.emit(SessionEvent::Stdout(format!("[1] {v}")));
            } else {
                return vars;
            }
        }
        vars
    }

    /// Integers, variables, and `a+b`; reports an R-style error otherwise.
    fn value(&mut self, expr: &str, vars: &HashMap<String, i64>) -> Option<i64> {
        let mut total = 0;
        for term in expr.split('+').map(str::trim) {
            let v = match term.parse::<i64>() {
                Ok(v) => Some(v),
                Err(_) => vars.get(term).copied(),
            };
            match v {
                Some(v) => total += v,
                None => {
                    self.emit(SessionEvent::Stderr(format!(
                        "Error in eval(ei, envir) : object '{term}' not found"
                    )));
                    return None;
                }
            }
        }
        Some(total)
    }
}

impl InterpreterSession for ScriptedSession {
    fn init(&mut self) -> BoxFuture<'_, Result<(), SessionError>> {
        Box::pin(async move {
            if self.fail_init {
                return Err(SessionError::Other("R could not be found".into()));
            }
            self.started = true;
            let banner = self.banner.clone();
            for event in banner {
                self.emit(event);
            }
            self.emit(SessionEvent::Ready);
            Ok(())
        })
    }

    fn write(&mut self, line: String) -> BoxFuture<'_, Result<(), SessionError>> {
        Box::pin(async move {
            if !self.started {
                return Err(SessionError::NotStarted);
            }
            self.probe.written.lock().unwrap().push(line.clone());
            self.respond(&line);
            Ok(())
        })
    }

    fn read(&mut self) -> BoxFuture<'_, Result<SessionEvent, SessionError>> {
        Box::pin(async move {
            // Give other tasks a chance to run between events.
            tokio::task::yield_now().await;
            self.events.pop_front().unwrap_or(Err(SessionError::Closed))
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), SessionError>> {
        Box::pin(async move {
            self.probe.closed.store(true, Ordering::SeqCst);
            Ok(())
        })
    }
}

/// `.rsnip_env_N <- new.env(...)`
pub fn parse_bind(line: &str) -> Option<u32> {
    let rest = line.strip_prefix(".rsnip_env_")?;
    let (id, tail) = rest.split_once(' ')?;
    tail.starts_with("<- new.env(").then(|| id.parse().ok())?
}

/// `source(exprs = parse(text = "<code>", ...), local = .rsnip_env_N, ...)`
pub fn parse_scoped(line: &str) -> Option<(String, u32)> {
    let start = line.find("parse(text = \"")? + "parse(text = \"".len();
    let mut code = String::new();
    let mut chars = line[start..].chars();
    loop {
        match chars.next()? {
            '\\' => match chars.next()? {
                'n' => code.push('\n'),
                't' => code.push('\t'),
                'r' => code.push('\r'),
                other => code.push(other),
            },
            '"' => break,
            c => code.push(c),
        }
    }
    let rest: String = chars.collect();
    let env_start = rest.find("local = .rsnip_env_")? + "local = .rsnip_env_".len();
    let digits: String = rest[env_start..].chars().take_while(|c| c.is_ascii_digit()).collect();
    Some((code, digits.parse().ok()?))
}
